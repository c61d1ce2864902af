use serde::{Deserialize, Serialize};
use super::{PipelineId, StageId};

pub type LeadId = i64;

/// Lead priority (presentation only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

/// Lead model
///
/// A prospective customer tracked through the stages of one pipeline.
/// `stage_id` always names exactly one stage of that pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub pipeline_id: PipelineId,
    pub stage_id: StageId,
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub value: f64,
    pub priority: Priority,
    pub created_ts: i64,
    pub modified_ts: i64,
}

impl Lead {
    pub fn new(id: LeadId, pipeline_id: PipelineId, stage_id: StageId, name: impl Into<String>, value: f64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id,
            pipeline_id,
            stage_id,
            name: name.into(),
            company: None,
            email: None,
            phone: None,
            value,
            priority: Priority::default(),
            created_ts: now,
            modified_ts: now,
        }
    }

    /// Monetary value must be a finite, non-negative amount
    pub fn has_valid_value(&self) -> bool {
        self.value.is_finite() && self.value >= 0.0
    }
}

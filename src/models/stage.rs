use serde::{Deserialize, Serialize};
use super::PipelineId;

pub type StageId = i64;

/// Stage model
///
/// A named, ordered slot of a pipeline. `order` is positive and unique within
/// the pipeline; `color_hint` is presentation data only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub pipeline_id: PipelineId,
    pub name: String,
    pub order: i64,
    pub color_hint: Option<String>,
}

impl Stage {
    pub fn new(id: StageId, pipeline_id: PipelineId, name: impl Into<String>, order: i64) -> Self {
        Self {
            id,
            pipeline_id,
            name: name.into(),
            order,
            color_hint: None,
        }
    }

    /// Provisional stages only exist locally while their creation is in flight
    pub fn is_provisional(&self) -> bool {
        self.id < 0
    }
}

/// Item of a replace-order request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageOrder {
    pub id: StageId,
    pub order: i64,
}

impl From<&Stage> for StageOrder {
    fn from(stage: &Stage) -> Self {
        Self {
            id: stage.id,
            order: stage.order,
        }
    }
}

/// Direction of a single-step stage move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

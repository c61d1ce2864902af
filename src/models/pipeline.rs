use serde::{Deserialize, Serialize};

pub type PipelineId = i64;

/// Name of the pipeline created on first use
pub const DEFAULT_PIPELINE: &str = "default";

/// Pipeline model
/// A named sales process owning an ordered set of stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: Option<PipelineId>,
    pub name: String,
    pub created_ts: i64,
    pub modified_ts: i64,
}

impl Pipeline {
    pub fn new(name: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: None,
            name,
            created_ts: now,
            modified_ts: now,
        }
    }
}

//! Pipeline Service contract
//!
//! The remote store the engine persists to. The engine only consumes this
//! trait; `SqlitePipelineService` is the local implementation used by the CLI.
//! Retry and timeout policy belong to implementations, never to the engine.

pub mod sqlite;

pub use sqlite::SqlitePipelineService;

use crate::models::{Lead, LeadId, PipelineId, Stage, StageId, StageOrder};
use thiserror::Error;

/// Failure reported by a Pipeline Service call
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The service refused the change (validation or conflict on its side)
    #[error("rejected by pipeline service: {0}")]
    Rejected(String),
    /// The addressed record does not exist on the service
    #[error("not found on pipeline service: {0}")]
    NotFound(String),
    /// Transport or storage failure
    #[error("pipeline service failure: {0}")]
    Backend(String),
}

impl ServiceError {
    /// Wrap a storage error, keeping its whole context chain in the message
    pub fn backend(err: anyhow::Error) -> Self {
        ServiceError::Backend(format!("{:#}", err))
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Remote CRUD + reorder endpoints for stages, plus lead-stage updates
pub trait PipelineService: Send + Sync {
    fn list_stages(&self, pipeline_id: PipelineId) -> ServiceResult<Vec<Stage>>;

    fn list_leads(&self, pipeline_id: PipelineId) -> ServiceResult<Vec<Lead>>;

    /// Create a stage; the service assigns the final order
    fn create_stage(&self, pipeline_id: PipelineId, name: &str) -> ServiceResult<Stage>;

    fn update_stage(&self, pipeline_id: PipelineId, stage_id: StageId, name: &str) -> ServiceResult<Stage>;

    fn delete_stage(&self, pipeline_id: PipelineId, stage_id: StageId) -> ServiceResult<()>;

    /// Replace the order of every stage of the pipeline
    fn reorder_stages(&self, pipeline_id: PipelineId, orders: &[StageOrder]) -> ServiceResult<()>;

    fn update_lead_stage(&self, lead_id: LeadId, stage_id: StageId) -> ServiceResult<Lead>;
}

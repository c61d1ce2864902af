use crate::models::{LeadId, PipelineId, StageId};
use crate::service::ServiceError;
use thiserror::Error;

/// Class of a pipeline error, deciding how the caller reacts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Precondition failed before any state was touched
    Validation,
    /// Another operation holds the lead or stage; retry once it settles
    Concurrency,
    /// The service rejected an optimistic change, which has been reverted
    Reconciliation,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Lead {0} not found")]
    LeadNotFound(LeadId),

    #[error("Stage {0} not found")]
    StageNotFound(StageId),

    #[error("Stage {stage_id} still has {count} lead(s) assigned")]
    StageHasMembers { stage_id: StageId, count: usize },

    #[error("Invalid stage data: {0}")]
    InvalidStageData(String),

    #[error("Invalid lead data: {0}")]
    InvalidLeadData(String),

    #[error("Lead {0} already has a stage transition in flight")]
    TransitionInProgress(LeadId),

    #[error("Another stage change is still pending")]
    StageMutationInProgress,

    #[error("Stage {0} has a pending change")]
    StageBusy(StageId),

    #[error("Pipeline {0} is reloading")]
    ReloadInProgress(PipelineId),

    /// `restored_stage` is set when a lead transition was undone
    #[error("Failed to persist change, reverted{}: {}", restored_suffix(.restored_stage), .cause)]
    ReconciliationFailed {
        #[source]
        cause: ServiceError,
        restored_stage: Option<StageId>,
    },
}

fn restored_suffix(restored_stage: &Option<StageId>) -> String {
    match restored_stage {
        Some(stage_id) => format!(" (lead kept in stage {})", stage_id),
        None => String::new(),
    }
}

impl PipelineError {
    pub fn reconciliation(cause: ServiceError) -> Self {
        PipelineError::ReconciliationFailed { cause, restored_stage: None }
    }

    /// Record the stage a reverted lead is back in
    pub fn with_restored_stage(self, stage_id: StageId) -> Self {
        match self {
            PipelineError::ReconciliationFailed { cause, .. } => {
                PipelineError::ReconciliationFailed { cause, restored_stage: Some(stage_id) }
            }
            other => other,
        }
    }

    pub fn restored_stage(&self) -> Option<StageId> {
        match self {
            PipelineError::ReconciliationFailed { restored_stage, .. } => *restored_stage,
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::LeadNotFound(_)
            | PipelineError::StageNotFound(_)
            | PipelineError::StageHasMembers { .. }
            | PipelineError::InvalidStageData(_)
            | PipelineError::InvalidLeadData(_) => ErrorKind::Validation,
            PipelineError::TransitionInProgress(_)
            | PipelineError::StageMutationInProgress
            | PipelineError::StageBusy(_)
            | PipelineError::ReloadInProgress(_) => ErrorKind::Concurrency,
            PipelineError::ReconciliationFailed { .. } => ErrorKind::Reconciliation,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

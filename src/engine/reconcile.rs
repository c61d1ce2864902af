use std::sync::Mutex;
use crate::models::Lead;
use crate::service::ServiceResult;
use super::{lock, BoardState, LeadIndex, PipelineError, Result, StageStore};

/// Pre-mutation copy of the state an operation is about to change
///
/// Stage-structure operations capture the whole stage store; a lead
/// transition captures the one lead record it moves, so concurrent
/// transitions of other leads are left untouched by a revert.
#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    Stages(StageStore),
    Lead(Lead),
}

impl Snapshot {
    pub fn of_stages(stages: &StageStore) -> Self {
        Snapshot::Stages(stages.clone())
    }

    pub fn of_lead(lead: &Lead) -> Self {
        Snapshot::Lead(lead.clone())
    }

    /// Put the captured state back verbatim
    pub fn restore(self, stages: &mut StageStore, leads: &mut LeadIndex) {
        match self {
            Snapshot::Stages(saved) => *stages = saved,
            Snapshot::Lead(saved) => leads.restore(saved),
        }
    }
}

/// Confirm or undo an optimistic mutation that has already been applied to
/// `live`.
///
/// `persist` is called exactly once, with no lock held. On success the live
/// state is final and the snapshot is dropped. On failure the snapshot is
/// restored before the error is returned, so no caller can observe the
/// half-applied state afterwards. Failures are never retried here.
pub fn reconcile<T, P>(live: &Mutex<BoardState>, snapshot: Snapshot, persist: P) -> Result<T>
where
    P: FnOnce() -> ServiceResult<T>,
{
    match persist() {
        Ok(value) => {
            log::debug!("Optimistic change confirmed");
            Ok(value)
        }
        Err(cause) => {
            {
                let mut state = lock(live);
                let BoardState { stages, leads, .. } = &mut *state;
                snapshot.restore(stages, leads);
            }
            log::warn!("Reverted optimistic change: {}", cause);
            Err(PipelineError::reconciliation(cause))
        }
    }
}

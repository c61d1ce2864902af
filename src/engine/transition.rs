use crate::models::{LeadId, StageId};
use crate::service::PipelineService;
use super::board::TransitionClaim;
use super::{lock, reconcile, BoardState, Outcome, PipelineBoard, PipelineError, Result, Snapshot};

impl<S: PipelineService> PipelineBoard<S> {
    /// Move a lead to another stage (the drag-and-drop contract).
    ///
    /// Dropping a lead on its own stage is a no-op with no write. Otherwise
    /// the move is applied locally, persisted with `update_lead_stage`, and
    /// reverted if the service rejects it; the error then names the stage the
    /// lead is back in. A lead with a transition already in flight is rejected
    /// with `TransitionInProgress`.
    pub fn transition(&self, lead_id: LeadId, target_stage_id: StageId) -> Result<Outcome> {
        let (snapshot, previous, _claim) = {
            let mut state = lock(&self.state);
            let BoardState { pipeline_id, stages, leads, pending } = &mut *state;
            if pending.loading {
                return Err(PipelineError::ReloadInProgress(*pipeline_id));
            }

            let lead = leads.get(lead_id).ok_or(PipelineError::LeadNotFound(lead_id))?;
            if pending.transitions.contains_key(&lead_id) {
                return Err(PipelineError::TransitionInProgress(lead_id));
            }
            if lead.stage_id == target_stage_id {
                log::debug!("Lead {} already in stage {}", lead_id, target_stage_id);
                return Ok(Outcome::unchanged());
            }
            if pending.busy_stages.contains(&target_stage_id) {
                return Err(PipelineError::StageBusy(target_stage_id));
            }
            if !stages.contains(target_stage_id) {
                return Err(PipelineError::StageNotFound(target_stage_id));
            }

            let snapshot = Snapshot::of_lead(lead);
            let previous = leads.set_stage(lead_id, target_stage_id, stages)?;
            pending.transitions.insert(lead_id, (previous, target_stage_id));
            log::debug!("Lead {} moved {} -> {} (pending)", lead_id, previous, target_stage_id);
            (snapshot, previous, TransitionClaim::new(&self.state, lead_id))
        };

        reconcile(&self.state, snapshot, || {
            self.service.update_lead_stage(lead_id, target_stage_id)
        })
        .map_err(|err| err.with_restored_stage(previous))?;
        Ok(Outcome::changed())
    }
}

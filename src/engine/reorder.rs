use crate::models::{Direction, Stage, StageId};
use crate::service::PipelineService;
use super::board::StructureClaim;
use super::{lock, reconcile, BoardState, Outcome, PipelineBoard, PipelineError, Result, Snapshot};

fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PipelineError::InvalidStageData("stage name cannot be empty".to_string()));
    }
    Ok(name)
}

impl<S: PipelineService> PipelineBoard<S> {
    /// Swap a stage with its neighbour and persist the full new order.
    /// A move past either end returns `changed = false` without a write.
    pub fn move_stage(&self, stage_id: StageId, direction: Direction) -> Result<Outcome> {
        let (snapshot, orders, pipeline_id, _claim) = {
            let mut state = lock(&self.state);
            let BoardState { pipeline_id, stages, pending, .. } = &mut *state;
            pending.check_structure(*pipeline_id)?;

            let snapshot = Snapshot::of_stages(stages);
            if !stages.move_stage(stage_id, direction)? {
                log::debug!("Stage {} already at the {} boundary", stage_id, direction.as_str());
                return Ok(Outcome::unchanged());
            }
            pending.structure = true;
            (snapshot, stages.order_list(), *pipeline_id, StructureClaim::new(&self.state))
        };

        reconcile(&self.state, snapshot, || {
            self.service.reorder_stages(pipeline_id, &orders)
        })?;
        Ok(Outcome::changed())
    }

    /// Append a new stage after the last one.
    ///
    /// A provisional stage is shown immediately and swapped for the service's
    /// record once creation succeeds.
    pub fn add_stage(&self, name: &str) -> Result<Stage> {
        let name = validate_name(name)?;
        let provisional_id = self.provisional_id();

        let (snapshot, pipeline_id, _claim) = {
            let mut state = lock(&self.state);
            let BoardState { pipeline_id, stages, pending, .. } = &mut *state;
            pending.check_structure(*pipeline_id)?;

            let snapshot = Snapshot::of_stages(stages);
            stages.push(Stage::new(provisional_id, *pipeline_id, name, 0))?;
            pending.structure = true;
            pending.busy_stages.insert(provisional_id);
            (snapshot, *pipeline_id, StructureClaim::new(&self.state))
        };

        let created = reconcile(&self.state, snapshot, || {
            self.service.create_stage(pipeline_id, name)
        })?;

        let mut state = lock(&self.state);
        let BoardState { stages, leads, .. } = &mut *state;
        let stage_id = created.id;
        if let Err(err) = stages.replace(provisional_id, created) {
            log::warn!("Dropping provisional stage {}: {}", provisional_id, err);
            stages.remove(provisional_id, leads)?;
            return Err(err);
        }
        stages
            .get(stage_id)
            .cloned()
            .ok_or(PipelineError::StageNotFound(stage_id))
    }

    pub fn rename_stage(&self, stage_id: StageId, name: &str) -> Result<Stage> {
        let name = validate_name(name)?;

        let (snapshot, pipeline_id, _claim) = {
            let mut state = lock(&self.state);
            let BoardState { pipeline_id, stages, pending, .. } = &mut *state;
            pending.check_structure(*pipeline_id)?;

            let snapshot = Snapshot::of_stages(stages);
            stages.rename(stage_id, name)?;
            pending.structure = true;
            (snapshot, *pipeline_id, StructureClaim::new(&self.state))
        };

        let updated = reconcile(&self.state, snapshot, || {
            self.service.update_stage(pipeline_id, stage_id, name)
        })?;

        let mut state = lock(&self.state);
        state.stages.replace(stage_id, updated)?;
        state
            .stages
            .get(stage_id)
            .cloned()
            .ok_or(PipelineError::StageNotFound(stage_id))
    }

    /// Delete a stage no lead occupies.
    ///
    /// Membership and in-flight transitions into or out of the stage are
    /// checked before anything is mutated.
    pub fn delete_stage(&self, stage_id: StageId) -> Result<()> {
        let (snapshot, pipeline_id, _claim) = {
            let mut state = lock(&self.state);
            let BoardState { pipeline_id, stages, leads, pending } = &mut *state;
            pending.check_structure(*pipeline_id)?;
            if !stages.contains(stage_id) {
                return Err(PipelineError::StageNotFound(stage_id));
            }
            let count = leads.count_in_stage(stage_id);
            if count > 0 {
                return Err(PipelineError::StageHasMembers { stage_id, count });
            }
            if pending.touches_stage(stage_id) {
                return Err(PipelineError::StageBusy(stage_id));
            }

            let snapshot = Snapshot::of_stages(stages);
            stages.remove(stage_id, leads)?;
            pending.structure = true;
            pending.busy_stages.insert(stage_id);
            (snapshot, *pipeline_id, StructureClaim::new(&self.state))
        };

        reconcile(&self.state, snapshot, || {
            self.service.delete_stage(pipeline_id, stage_id)
        })
    }
}

use std::collections::HashSet;
use crate::models::{Lead, LeadId, StageId};
use super::{PipelineError, Result, StageStore};

/// Lead membership: which single stage each lead currently occupies
///
/// Leads are kept in insertion order; per-stage views are derived on demand
/// and never re-sorted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadIndex {
    leads: Vec<Lead>,
}

impl LeadIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current state. Every lead must sit in a stage of `stages`.
    pub fn load(&mut self, leads: Vec<Lead>, stages: &StageStore) -> Result<()> {
        let mut ids = HashSet::new();
        for lead in &leads {
            if !ids.insert(lead.id) {
                return Err(PipelineError::InvalidLeadData(format!("duplicate lead id {}", lead.id)));
            }
            if !lead.has_valid_value() {
                return Err(PipelineError::InvalidLeadData(format!(
                    "lead {} has invalid value {}", lead.id, lead.value
                )));
            }
            if !stages.contains(lead.stage_id) {
                return Err(PipelineError::InvalidLeadData(format!(
                    "lead {} references unknown stage {}", lead.id, lead.stage_id
                )));
            }
        }
        self.leads = leads;
        Ok(())
    }

    pub fn all(&self) -> &[Lead] {
        &self.leads
    }

    pub fn get(&self, lead_id: LeadId) -> Option<&Lead> {
        self.leads.iter().find(|l| l.id == lead_id)
    }

    pub fn leads_in_stage(&self, stage_id: StageId) -> Vec<&Lead> {
        self.leads.iter().filter(|l| l.stage_id == stage_id).collect()
    }

    pub fn count_in_stage(&self, stage_id: StageId) -> usize {
        self.leads.iter().filter(|l| l.stage_id == stage_id).count()
    }

    /// Sum of lead values in a stage; 0 for an empty or unknown stage
    pub fn total_value(&self, stage_id: StageId) -> f64 {
        self.leads
            .iter()
            .filter(|l| l.stage_id == stage_id)
            .map(|l| l.value)
            .sum()
    }

    /// Move a lead to `new_stage_id`, returning the stage it left.
    /// Moving to the current stage changes nothing.
    pub fn set_stage(&mut self, lead_id: LeadId, new_stage_id: StageId, stages: &StageStore) -> Result<StageId> {
        let lead = self
            .leads
            .iter_mut()
            .find(|l| l.id == lead_id)
            .ok_or(PipelineError::LeadNotFound(lead_id))?;
        if !stages.contains(new_stage_id) {
            return Err(PipelineError::StageNotFound(new_stage_id));
        }

        let previous = lead.stage_id;
        if previous != new_stage_id {
            lead.stage_id = new_stage_id;
            lead.modified_ts = chrono::Utc::now().timestamp();
        }
        Ok(previous)
    }

    /// Put a lead record back exactly as it was captured
    pub(crate) fn restore(&mut self, lead: Lead) {
        match self.leads.iter_mut().find(|l| l.id == lead.id) {
            Some(slot) => *slot = lead,
            None => self.leads.push(lead),
        }
    }
}

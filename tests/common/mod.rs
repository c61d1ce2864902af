// Scripted in-memory Pipeline Service for engine tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Mutex, MutexGuard};
use salesline::engine::PipelineBoard;
use salesline::models::{Lead, LeadId, PipelineId, Stage, StageId, StageOrder};
use salesline::service::{PipelineService, ServiceError, ServiceResult};

pub const PIPELINE: PipelineId = 1;
pub const NEW: StageId = 1;
pub const CONTACTED: StageId = 2;
pub const WON: StageId = 3;
pub const L1: LeadId = 100;
pub const L2: LeadId = 101;

/// A call the engine made against the service
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListStages,
    ListLeads,
    CreateStage(String),
    UpdateStage(StageId, String),
    DeleteStage(StageId),
    ReorderStages(Vec<StageOrder>),
    UpdateLeadStage(LeadId, StageId),
}

impl Call {
    pub fn is_write(&self) -> bool {
        !matches!(self, Call::ListStages | Call::ListLeads)
    }
}

#[derive(Default)]
struct MockState {
    stages: Vec<Stage>,
    leads: Vec<Lead>,
    calls: Vec<Call>,
    failures: VecDeque<ServiceError>,
    next_id: i64,
}

/// Blocks the next write until released, to hold an operation in flight
pub struct Hold {
    entered: Receiver<()>,
    release: Option<Sender<Option<ServiceError>>>,
}

impl Hold {
    /// Wait until the held write has been issued
    pub fn wait_entered(&self) {
        self.entered.recv().expect("held call never issued");
    }

    /// Let the held write succeed
    pub fn release(mut self) {
        if let Some(tx) = self.release.take() {
            let _ = tx.send(None);
        }
    }

    /// Let the held write fail with `Rejected(message)`
    pub fn fail(mut self, message: &str) {
        if let Some(tx) = self.release.take() {
            let _ = tx.send(Some(ServiceError::Rejected(message.to_string())));
        }
    }
}

impl Drop for Hold {
    fn drop(&mut self) {
        // Never leave a worker blocked when an assertion fails mid-test
        if let Some(tx) = self.release.take() {
            let _ = tx.send(None);
        }
    }
}

type Gate = Mutex<Option<(Sender<()>, Receiver<Option<ServiceError>>)>>;

pub struct MockService {
    state: Mutex<MockState>,
    gate: Gate,
    load_gate: Gate,
}

fn arm(gate: &Gate) -> Hold {
    let (entered_tx, entered_rx) = channel();
    let (release_tx, release_rx) = channel();
    *gate.lock().unwrap() = Some((entered_tx, release_rx));
    Hold { entered: entered_rx, release: Some(release_tx) }
}

/// Block on the gate if armed; the hold decides the outcome
fn pass(gate: &Gate) -> Option<ServiceResult<()>> {
    let armed = gate.lock().unwrap().take();
    armed.map(|(entered, release)| {
        let _ = entered.send(());
        match release.recv() {
            Ok(Some(err)) => Err(err),
            _ => Ok(()),
        }
    })
}

impl MockService {
    pub fn new(stages: Vec<Stage>, leads: Vec<Lead>) -> Self {
        Self {
            state: Mutex::new(MockState {
                stages,
                leads,
                next_id: 1000,
                ..Default::default()
            }),
            gate: Mutex::new(None),
            load_gate: Mutex::new(None),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// The next write fails with `Rejected(message)`
    pub fn fail_next(&self, message: &str) {
        self.state().failures.push_back(ServiceError::Rejected(message.to_string()));
    }

    /// The next write blocks until the returned hold is released
    pub fn hold_next(&self) -> Hold {
        arm(&self.gate)
    }

    /// The next `list_leads` reads its data, then blocks until released
    pub fn hold_next_load(&self) -> Hold {
        arm(&self.load_gate)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    /// Id the next created stage receives
    pub fn set_next_stage_id(&self, stage_id: StageId) {
        self.state().next_id = stage_id - 1;
    }

    /// Server-side copy of a lead
    pub fn stored_lead(&self, lead_id: LeadId) -> Option<Lead> {
        self.state().leads.iter().find(|l| l.id == lead_id).cloned()
    }

    /// Record a write, wait on the gate if armed, then pop a scripted failure
    fn write(&self, call: Call) -> ServiceResult<()> {
        self.state().calls.push(call);
        if let Some(result) = pass(&self.gate) {
            return result;
        }
        match self.state().failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl PipelineService for MockService {
    fn list_stages(&self, _pipeline_id: PipelineId) -> ServiceResult<Vec<Stage>> {
        let mut state = self.state();
        state.calls.push(Call::ListStages);
        Ok(state.stages.clone())
    }

    fn list_leads(&self, _pipeline_id: PipelineId) -> ServiceResult<Vec<Lead>> {
        let leads = {
            let mut state = self.state();
            state.calls.push(Call::ListLeads);
            state.leads.clone()
        };
        if let Some(result) = pass(&self.load_gate) {
            result?;
        }
        Ok(leads)
    }

    fn create_stage(&self, pipeline_id: PipelineId, name: &str) -> ServiceResult<Stage> {
        self.write(Call::CreateStage(name.to_string()))?;
        let mut state = self.state();
        state.next_id += 1;
        let order = state.stages.iter().map(|s| s.order).max().unwrap_or(0) + 1;
        let stage = Stage::new(state.next_id, pipeline_id, name, order);
        state.stages.push(stage.clone());
        Ok(stage)
    }

    fn update_stage(&self, _pipeline_id: PipelineId, stage_id: StageId, name: &str) -> ServiceResult<Stage> {
        self.write(Call::UpdateStage(stage_id, name.to_string()))?;
        let mut state = self.state();
        let stage = state
            .stages
            .iter_mut()
            .find(|s| s.id == stage_id)
            .ok_or_else(|| ServiceError::NotFound(format!("stage {}", stage_id)))?;
        stage.name = name.to_string();
        Ok(stage.clone())
    }

    fn delete_stage(&self, _pipeline_id: PipelineId, stage_id: StageId) -> ServiceResult<()> {
        self.write(Call::DeleteStage(stage_id))?;
        self.state().stages.retain(|s| s.id != stage_id);
        Ok(())
    }

    fn reorder_stages(&self, _pipeline_id: PipelineId, orders: &[StageOrder]) -> ServiceResult<()> {
        self.write(Call::ReorderStages(orders.to_vec()))?;
        let mut state = self.state();
        for item in orders {
            if let Some(stage) = state.stages.iter_mut().find(|s| s.id == item.id) {
                stage.order = item.order;
            }
        }
        Ok(())
    }

    fn update_lead_stage(&self, lead_id: LeadId, stage_id: StageId) -> ServiceResult<Lead> {
        self.write(Call::UpdateLeadStage(lead_id, stage_id))?;
        let mut state = self.state();
        let lead = state
            .leads
            .iter_mut()
            .find(|l| l.id == lead_id)
            .ok_or_else(|| ServiceError::NotFound(format!("lead {}", lead_id)))?;
        lead.stage_id = stage_id;
        Ok(lead.clone())
    }
}

/// Stages New(1) / Contacted(2) / Won(3); L1 in New worth 50000, L2 in Contacted worth 1200
pub fn sample_board() -> PipelineBoard<MockService> {
    let stages = vec![
        Stage::new(NEW, PIPELINE, "New", 1),
        Stage::new(CONTACTED, PIPELINE, "Contacted", 2),
        Stage::new(WON, PIPELINE, "Won", 3),
    ];
    let leads = vec![
        Lead::new(L1, PIPELINE, NEW, "Acme", 50000.0),
        Lead::new(L2, PIPELINE, CONTACTED, "Globex", 1200.0),
    ];
    PipelineBoard::open(MockService::new(stages, leads), PIPELINE).unwrap()
}

pub fn lead_ids(board: &PipelineBoard<MockService>, stage_id: StageId) -> Vec<LeadId> {
    board.leads_for_stage(stage_id).iter().map(|l| l.id).collect()
}

pub fn stage_names(board: &PipelineBoard<MockService>) -> Vec<String> {
    board.ordered_stages().into_iter().map(|s| s.name).collect()
}

/// Orders are unique and strictly increasing
pub fn assert_total_order(board: &PipelineBoard<MockService>) {
    let orders: Vec<i64> = board.ordered_stages().iter().map(|s| s.order).collect();
    assert!(orders.windows(2).all(|w| w[0] < w[1]), "orders not strictly increasing: {:?}", orders);
}

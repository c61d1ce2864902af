use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use crate::models::{Lead, LeadId, PipelineId, Stage, StageId};
use crate::service::PipelineService;
use super::{lock, LeadIndex, PipelineError, Result, StageStore};

/// Result of a mutation that may turn out to be a no-op
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub changed: bool,
}

impl Outcome {
    pub fn changed() -> Self {
        Self { changed: true }
    }

    pub fn unchanged() -> Self {
        Self { changed: false }
    }
}

/// Operations that have applied locally but whose write has not settled
#[derive(Debug, Default)]
pub(crate) struct Pending {
    /// lead -> (stage it left, stage it entered)
    pub(crate) transitions: HashMap<LeadId, (StageId, StageId)>,
    /// A stage-structure mutation is in flight
    pub(crate) structure: bool,
    /// Stages being created or deleted by the in-flight structure mutation
    pub(crate) busy_stages: HashSet<StageId>,
    /// A reload is fetching stages and leads
    pub(crate) loading: bool,
}

impl Pending {
    pub(crate) fn touches_stage(&self, stage_id: StageId) -> bool {
        self.transitions
            .values()
            .any(|(from, to)| *from == stage_id || *to == stage_id)
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.transitions.is_empty() && !self.structure && !self.loading
    }

    /// A stage-structure mutation may start
    pub(crate) fn check_structure(&self, pipeline_id: PipelineId) -> Result<()> {
        if self.loading {
            return Err(PipelineError::ReloadInProgress(pipeline_id));
        }
        if self.structure {
            return Err(PipelineError::StageMutationInProgress);
        }
        Ok(())
    }
}

/// Live state of one pipeline view session
#[derive(Debug, Default)]
pub struct BoardState {
    pub(crate) pipeline_id: PipelineId,
    pub(crate) stages: StageStore,
    pub(crate) leads: LeadIndex,
    pub(crate) pending: Pending,
}

/// Point-in-time copy of the board, for rendering and comparisons
#[derive(Debug, Clone, PartialEq)]
pub struct BoardView {
    pub pipeline_id: PipelineId,
    pub stages: StageStore,
    pub leads: LeadIndex,
}

/// One pipeline view session over a Pipeline Service
///
/// All operations take `&self`; the board can be shared across threads
/// (e.g. behind an `Arc`). No internal lock is held while a service call
/// is outstanding.
///
/// # Example
///
/// ```no_run
/// use salesline::db::DbConnection;
/// use salesline::engine::PipelineBoard;
/// use salesline::models::Direction;
/// use salesline::service::SqlitePipelineService;
///
/// let service = SqlitePipelineService::new(DbConnection::connect().unwrap());
/// let pipeline = service.default_pipeline_id().unwrap();
/// let board = PipelineBoard::open(service, pipeline).unwrap();
/// let stage = board.add_stage("New").unwrap();
/// board.move_stage(stage.id, Direction::Up).unwrap();
/// ```
pub struct PipelineBoard<S: PipelineService> {
    pub(crate) service: S,
    pub(crate) state: Mutex<BoardState>,
    next_provisional: AtomicI64,
}

impl<S: PipelineService> PipelineBoard<S> {
    /// Build a session for `pipeline_id` from the service's current data
    pub fn open(service: S, pipeline_id: PipelineId) -> Result<Self> {
        let board = Self {
            service,
            state: Mutex::new(BoardState::default()),
            next_provisional: AtomicI64::new(-1),
        };
        board.switch_pipeline(pipeline_id)?;
        Ok(board)
    }

    /// Rebuild stages and leads from the service for another pipeline.
    ///
    /// Refused while any mutation is in flight. Until the fetched lists are
    /// installed, new mutations fail with `ReloadInProgress`.
    pub fn switch_pipeline(&self, pipeline_id: PipelineId) -> Result<()> {
        let _claim = {
            let mut state = lock(&self.state);
            if state.pending.loading {
                return Err(PipelineError::ReloadInProgress(state.pipeline_id));
            }
            if !state.pending.is_idle() {
                return Err(PipelineError::StageMutationInProgress);
            }
            state.pending.loading = true;
            LoadClaim::new(&self.state)
        };

        let stages = self
            .service
            .list_stages(pipeline_id)
            .map_err(PipelineError::reconciliation)?;
        let leads = self
            .service
            .list_leads(pipeline_id)
            .map_err(PipelineError::reconciliation)?;

        let mut stage_store = StageStore::new();
        stage_store.load(stages)?;
        let mut lead_index = LeadIndex::new();
        lead_index.load(leads, &stage_store)?;

        let mut state = lock(&self.state);
        log::info!(
            "Loaded pipeline {}: {} stage(s), {} lead(s)",
            pipeline_id,
            stage_store.len(),
            lead_index.all().len()
        );
        state.pipeline_id = pipeline_id;
        state.stages = stage_store;
        state.leads = lead_index;
        Ok(())
    }

    /// Reload the current pipeline
    pub fn refresh(&self) -> Result<()> {
        let pipeline_id = self.pipeline_id();
        self.switch_pipeline(pipeline_id)
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn pipeline_id(&self) -> PipelineId {
        lock(&self.state).pipeline_id
    }

    pub fn ordered_stages(&self) -> Vec<Stage> {
        lock(&self.state).stages.ordered().to_vec()
    }

    pub fn leads_for_stage(&self, stage_id: StageId) -> Vec<Lead> {
        lock(&self.state)
            .leads
            .leads_in_stage(stage_id)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn stage_value_total(&self, stage_id: StageId) -> f64 {
        lock(&self.state).leads.total_value(stage_id)
    }

    pub fn lead(&self, lead_id: LeadId) -> Option<Lead> {
        lock(&self.state).leads.get(lead_id).cloned()
    }

    pub fn view(&self) -> BoardView {
        let state = lock(&self.state);
        BoardView {
            pipeline_id: state.pipeline_id,
            stages: state.stages.clone(),
            leads: state.leads.clone(),
        }
    }

    pub(crate) fn provisional_id(&self) -> StageId {
        self.next_provisional.fetch_sub(1, Ordering::Relaxed)
    }
}

/// Per-lead transition marker, released when the transition settles
pub(crate) struct TransitionClaim<'a> {
    state: &'a Mutex<BoardState>,
    lead_id: LeadId,
}

impl<'a> TransitionClaim<'a> {
    /// The caller must already have recorded the lead in `pending.transitions`
    pub(crate) fn new(state: &'a Mutex<BoardState>, lead_id: LeadId) -> Self {
        Self { state, lead_id }
    }
}

impl Drop for TransitionClaim<'_> {
    fn drop(&mut self) {
        lock(self.state).pending.transitions.remove(&self.lead_id);
    }
}

/// Reload marker, released once the fetched lists are installed or dropped
pub(crate) struct LoadClaim<'a> {
    state: &'a Mutex<BoardState>,
}

impl<'a> LoadClaim<'a> {
    /// The caller must already have set `pending.loading`
    pub(crate) fn new(state: &'a Mutex<BoardState>) -> Self {
        Self { state }
    }
}

impl Drop for LoadClaim<'_> {
    fn drop(&mut self) {
        lock(self.state).pending.loading = false;
    }
}

/// Pipeline-wide stage-structure marker, released when the change settles
pub(crate) struct StructureClaim<'a> {
    state: &'a Mutex<BoardState>,
}

impl<'a> StructureClaim<'a> {
    /// The caller must already have set `pending.structure`
    pub(crate) fn new(state: &'a Mutex<BoardState>) -> Self {
        Self { state }
    }
}

impl Drop for StructureClaim<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        state.pending.structure = false;
        state.pending.busy_stages.clear();
    }
}

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use rusqlite::Connection;
use crate::models::{Lead, LeadId, PipelineId, Stage, StageId, StageOrder, DEFAULT_PIPELINE};
use crate::repo::{LeadRepo, PipelineRepo, StageRepo};
use super::{PipelineService, ServiceError, ServiceResult};

/// Pipeline Service backed by the local SQLite ledger
///
/// Enforces the same rules a remote backend would: a stage can only be
/// deleted once empty, a reorder must list every stage of the pipeline
/// exactly once, and a lead can only move within its own pipeline.
pub struct SqlitePipelineService {
    conn: Mutex<Connection>,
}

impl SqlitePipelineService {
    pub fn new(conn: Connection) -> Self {
        Self { conn: Mutex::new(conn) }
    }

    /// Direct access for operations outside the service contract
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|err| err.into_inner())
    }

    pub fn default_pipeline_id(&self) -> anyhow::Result<PipelineId> {
        self.pipeline_id(DEFAULT_PIPELINE)
    }

    /// Resolve a pipeline by name, creating it on first use
    pub fn pipeline_id(&self, name: &str) -> anyhow::Result<PipelineId> {
        let conn = self.connection();
        let pipeline = PipelineRepo::get_or_create(&conn, name)?;
        pipeline
            .id
            .ok_or_else(|| anyhow::anyhow!("Pipeline '{}' has no id", name))
    }

    /// Set or clear a stage's display color. Presentation only; order and
    /// membership are untouched.
    pub fn set_stage_color(&self, pipeline_id: PipelineId, stage_id: StageId, color: Option<&str>) -> ServiceResult<Stage> {
        let conn = self.connection();
        Self::require_stage(&conn, pipeline_id, stage_id)?;
        StageRepo::set_color(&conn, stage_id, color).map_err(ServiceError::backend)?;
        Self::require_stage(&conn, pipeline_id, stage_id)
    }

    fn require_pipeline(conn: &Connection, pipeline_id: PipelineId) -> ServiceResult<()> {
        match PipelineRepo::get_by_id(conn, pipeline_id).map_err(ServiceError::backend)? {
            Some(_) => Ok(()),
            None => Err(ServiceError::NotFound(format!("pipeline {}", pipeline_id))),
        }
    }

    fn require_stage(conn: &Connection, pipeline_id: PipelineId, stage_id: StageId) -> ServiceResult<Stage> {
        match StageRepo::get_by_id(conn, stage_id).map_err(ServiceError::backend)? {
            Some(stage) if stage.pipeline_id == pipeline_id => Ok(stage),
            _ => Err(ServiceError::NotFound(format!("stage {} in pipeline {}", stage_id, pipeline_id))),
        }
    }
}

impl PipelineService for SqlitePipelineService {
    fn list_stages(&self, pipeline_id: PipelineId) -> ServiceResult<Vec<Stage>> {
        let conn = self.connection();
        Self::require_pipeline(&conn, pipeline_id)?;
        StageRepo::list(&conn, pipeline_id).map_err(ServiceError::backend)
    }

    fn list_leads(&self, pipeline_id: PipelineId) -> ServiceResult<Vec<Lead>> {
        let conn = self.connection();
        Self::require_pipeline(&conn, pipeline_id)?;
        LeadRepo::list(&conn, pipeline_id).map_err(ServiceError::backend)
    }

    fn create_stage(&self, pipeline_id: PipelineId, name: &str) -> ServiceResult<Stage> {
        if name.trim().is_empty() {
            return Err(ServiceError::Rejected("stage name cannot be empty".to_string()));
        }
        let conn = self.connection();
        Self::require_pipeline(&conn, pipeline_id)?;
        let stage = StageRepo::create(&conn, pipeline_id, name.trim(), None).map_err(ServiceError::backend)?;
        PipelineRepo::touch(&conn, pipeline_id).map_err(ServiceError::backend)?;
        Ok(stage)
    }

    fn update_stage(&self, pipeline_id: PipelineId, stage_id: StageId, name: &str) -> ServiceResult<Stage> {
        if name.trim().is_empty() {
            return Err(ServiceError::Rejected("stage name cannot be empty".to_string()));
        }
        let conn = self.connection();
        Self::require_stage(&conn, pipeline_id, stage_id)?;
        StageRepo::rename(&conn, stage_id, name.trim()).map_err(ServiceError::backend)?;
        Self::require_stage(&conn, pipeline_id, stage_id)
    }

    fn delete_stage(&self, pipeline_id: PipelineId, stage_id: StageId) -> ServiceResult<()> {
        let conn = self.connection();
        Self::require_stage(&conn, pipeline_id, stage_id)?;
        let count = StageRepo::count_leads(&conn, stage_id).map_err(ServiceError::backend)?;
        if count > 0 {
            return Err(ServiceError::Rejected(format!("stage {} still holds {} lead(s)", stage_id, count)));
        }
        StageRepo::delete(&conn, stage_id).map_err(ServiceError::backend)?;
        PipelineRepo::touch(&conn, pipeline_id).map_err(ServiceError::backend)
    }

    fn reorder_stages(&self, pipeline_id: PipelineId, orders: &[StageOrder]) -> ServiceResult<()> {
        let conn = self.connection();
        Self::require_pipeline(&conn, pipeline_id)?;

        let current: HashSet<StageId> = StageRepo::list(&conn, pipeline_id)
            .map_err(ServiceError::backend)?
            .into_iter()
            .map(|s| s.id)
            .collect();
        let listed: HashSet<StageId> = orders.iter().map(|o| o.id).collect();
        if listed.len() != orders.len() || listed != current {
            return Err(ServiceError::Rejected(
                "reorder must list every stage of the pipeline exactly once".to_string(),
            ));
        }
        let distinct_orders: HashSet<i64> = orders.iter().map(|o| o.order).collect();
        if distinct_orders.len() != orders.len() || orders.iter().any(|o| o.order < 1) {
            return Err(ServiceError::Rejected("stage orders must be unique positive integers".to_string()));
        }

        StageRepo::replace_order(&conn, pipeline_id, orders).map_err(ServiceError::backend)?;
        PipelineRepo::touch(&conn, pipeline_id).map_err(ServiceError::backend)
    }

    fn update_lead_stage(&self, lead_id: LeadId, stage_id: StageId) -> ServiceResult<Lead> {
        let conn = self.connection();
        let lead = LeadRepo::get_by_id(&conn, lead_id)
            .map_err(ServiceError::backend)?
            .ok_or_else(|| ServiceError::NotFound(format!("lead {}", lead_id)))?;
        Self::require_stage(&conn, lead.pipeline_id, stage_id)
            .map_err(|_| ServiceError::Rejected(format!("stage {} is not in the lead's pipeline", stage_id)))?;

        LeadRepo::set_stage(&conn, lead_id, stage_id).map_err(ServiceError::backend)?;
        LeadRepo::get_by_id(&conn, lead_id)
            .map_err(ServiceError::backend)?
            .ok_or_else(|| ServiceError::NotFound(format!("lead {}", lead_id)))
    }
}

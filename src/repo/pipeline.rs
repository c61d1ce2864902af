use rusqlite::{Connection, OptionalExtension};
use crate::models::{Pipeline, PipelineId};
use anyhow::{Context, Result};

/// Pipeline repository for database operations
///
/// Pipelines are looked up by name from the command line; the `default`
/// pipeline is auto-created on first use.
pub struct PipelineRepo;

impl PipelineRepo {
    /// Create a new pipeline
    pub fn create(conn: &Connection, name: &str) -> Result<Pipeline> {
        let pipeline = Pipeline::new(name.to_string());

        conn.execute(
            "INSERT INTO pipelines (name, created_ts, modified_ts) VALUES (?1, ?2, ?3)",
            rusqlite::params![pipeline.name, pipeline.created_ts, pipeline.modified_ts],
        )
        .with_context(|| format!("Failed to create pipeline: {}", name))?;

        let id = conn.last_insert_rowid();
        Ok(Pipeline {
            id: Some(id),
            ..pipeline
        })
    }

    pub fn get_by_id(conn: &Connection, id: PipelineId) -> Result<Option<Pipeline>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, created_ts, modified_ts FROM pipelines WHERE id = ?1"
        )?;
        let pipeline = stmt.query_row([id], |row| {
            Ok(Pipeline {
                id: Some(row.get(0)?),
                name: row.get(1)?,
                created_ts: row.get(2)?,
                modified_ts: row.get(3)?,
            })
        }).optional()?;
        Ok(pipeline)
    }

    pub fn get_by_name(conn: &Connection, name: &str) -> Result<Option<Pipeline>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, created_ts, modified_ts FROM pipelines WHERE name = ?1"
        )?;
        let pipeline = stmt.query_row([name], |row| {
            Ok(Pipeline {
                id: Some(row.get(0)?),
                name: row.get(1)?,
                created_ts: row.get(2)?,
                modified_ts: row.get(3)?,
            })
        }).optional()?;
        Ok(pipeline)
    }

    /// Get a pipeline by name, creating it if it doesn't exist
    pub fn get_or_create(conn: &Connection, name: &str) -> Result<Pipeline> {
        if let Some(pipeline) = Self::get_by_name(conn, name)? {
            return Ok(pipeline);
        }
        log::info!("Creating pipeline '{}'", name);
        Self::create(conn, name)
    }

    pub fn list(conn: &Connection) -> Result<Vec<Pipeline>> {
        let mut stmt = conn.prepare(
            "SELECT id, name, created_ts, modified_ts FROM pipelines ORDER BY name"
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Pipeline {
                id: Some(row.get(0)?),
                name: row.get(1)?,
                created_ts: row.get(2)?,
                modified_ts: row.get(3)?,
            })
        })?;

        let mut pipelines = Vec::new();
        for row in rows {
            pipelines.push(row?);
        }
        Ok(pipelines)
    }

    pub fn touch(conn: &Connection, id: PipelineId) -> Result<()> {
        conn.execute(
            "UPDATE pipelines SET modified_ts = ?1 WHERE id = ?2",
            rusqlite::params![chrono::Utc::now().timestamp(), id],
        )?;
        Ok(())
    }
}

use rusqlite::{Connection, OptionalExtension, Row};
use crate::models::{Lead, LeadId, PipelineId, Priority, StageId};
use anyhow::{Context, Result};

const LEAD_COLUMNS: &str =
    "id, pipeline_id, stage_id, name, company, email, phone, value, priority, created_ts, modified_ts";

fn lead_from_row(row: &Row) -> rusqlite::Result<Lead> {
    let priority: String = row.get(8)?;
    Ok(Lead {
        id: row.get(0)?,
        pipeline_id: row.get(1)?,
        stage_id: row.get(2)?,
        name: row.get(3)?,
        company: row.get(4)?,
        email: row.get(5)?,
        phone: row.get(6)?,
        value: row.get(7)?,
        priority: Priority::from_str(&priority).unwrap_or_default(),
        created_ts: row.get(9)?,
        modified_ts: row.get(10)?,
    })
}

/// Fields of a lead that is about to be created
#[derive(Debug, Clone, Default)]
pub struct NewLead {
    pub name: String,
    pub company: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub value: f64,
    pub priority: Priority,
}

/// Lead repository for database operations
pub struct LeadRepo;

impl LeadRepo {
    /// Create a lead in `stage_id`, which must belong to `pipeline_id`
    pub fn create(conn: &Connection, pipeline_id: PipelineId, stage_id: StageId, fields: &NewLead) -> Result<Lead> {
        if !fields.value.is_finite() || fields.value < 0.0 {
            anyhow::bail!("Lead value must be a non-negative amount, got {}", fields.value);
        }
        let stage_pipeline: Option<PipelineId> = conn
            .query_row("SELECT pipeline_id FROM stages WHERE id = ?1", [stage_id], |row| row.get(0))
            .optional()?;
        match stage_pipeline {
            Some(p) if p == pipeline_id => {}
            _ => anyhow::bail!("Stage {} not found in pipeline {}", stage_id, pipeline_id),
        }

        let now = chrono::Utc::now().timestamp();
        conn.execute(
            "INSERT INTO leads (pipeline_id, stage_id, name, company, email, phone, value, priority, created_ts, modified_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            rusqlite::params![
                pipeline_id,
                stage_id,
                fields.name,
                fields.company,
                fields.email,
                fields.phone,
                fields.value,
                fields.priority.as_str(),
                now,
                now
            ],
        )
        .with_context(|| format!("Failed to create lead: {}", fields.name))?;

        let id = conn.last_insert_rowid();
        Self::get_by_id(conn, id)?
            .ok_or_else(|| anyhow::anyhow!("Lead {} vanished after insert", id))
    }

    pub fn get_by_id(conn: &Connection, id: LeadId) -> Result<Option<Lead>> {
        let mut stmt = conn.prepare(&format!("SELECT {} FROM leads WHERE id = ?1", LEAD_COLUMNS))?;
        let lead = stmt.query_row([id], lead_from_row).optional()?;
        Ok(lead)
    }

    /// List leads of a pipeline in creation order
    pub fn list(conn: &Connection, pipeline_id: PipelineId) -> Result<Vec<Lead>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM leads WHERE pipeline_id = ?1 ORDER BY id",
            LEAD_COLUMNS
        ))?;
        let rows = stmt.query_map([pipeline_id], lead_from_row)?;

        let mut leads = Vec::new();
        for row in rows {
            leads.push(row?);
        }
        Ok(leads)
    }

    pub fn set_stage(conn: &Connection, id: LeadId, stage_id: StageId) -> Result<()> {
        let updated = conn.execute(
            "UPDATE leads SET stage_id = ?1, modified_ts = ?2 WHERE id = ?3",
            rusqlite::params![stage_id, chrono::Utc::now().timestamp(), id],
        )
        .with_context(|| format!("Failed to move lead {} to stage {}", id, stage_id))?;
        if updated == 0 {
            anyhow::bail!("No lead found with id={}", id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;
    use crate::repo::{PipelineRepo, StageRepo};

    #[test]
    fn test_create_and_list() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let pipeline = PipelineRepo::create(&conn, "default").unwrap().id.unwrap();
        let stage = StageRepo::create(&conn, pipeline, "New", None).unwrap();

        let fields = NewLead {
            name: "Acme".to_string(),
            value: 50000.0,
            priority: Priority::High,
            ..Default::default()
        };
        let lead = LeadRepo::create(&conn, pipeline, stage.id, &fields).unwrap();
        assert_eq!(lead.stage_id, stage.id);
        assert_eq!(lead.priority, Priority::High);

        let leads = LeadRepo::list(&conn, pipeline).unwrap();
        assert_eq!(leads, vec![lead]);
    }

    #[test]
    fn test_create_rejects_foreign_stage() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let a = PipelineRepo::create(&conn, "a").unwrap().id.unwrap();
        let b = PipelineRepo::create(&conn, "b").unwrap().id.unwrap();
        let stage = StageRepo::create(&conn, b, "New", None).unwrap();
        let fields = NewLead { name: "Acme".to_string(), ..Default::default() };
        assert!(LeadRepo::create(&conn, a, stage.id, &fields).is_err());
    }

    #[test]
    fn test_create_rejects_negative_value() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let pipeline = PipelineRepo::create(&conn, "default").unwrap().id.unwrap();
        let stage = StageRepo::create(&conn, pipeline, "New", None).unwrap();
        let fields = NewLead { name: "Debt".to_string(), value: -1.0, ..Default::default() };
        assert!(LeadRepo::create(&conn, pipeline, stage.id, &fields).is_err());
    }
}

use rusqlite::{Connection, OptionalExtension, Row};
use crate::models::{PipelineId, Stage, StageId, StageOrder};
use anyhow::{Context, Result};

const STAGE_COLUMNS: &str = "id, pipeline_id, name, sort_order, color";

fn stage_from_row(row: &Row) -> rusqlite::Result<Stage> {
    Ok(Stage {
        id: row.get(0)?,
        pipeline_id: row.get(1)?,
        name: row.get(2)?,
        order: row.get(3)?,
        color_hint: row.get(4)?,
    })
}

/// Stage repository for database operations
///
/// Stages of a pipeline are ordered by `sort_order`, which is unique per
/// pipeline. Order replacement goes through negative ordinals so the unique
/// index never sees two stages on the same value mid-update.
pub struct StageRepo;

impl StageRepo {
    /// List stages of a pipeline in order
    pub fn list(conn: &Connection, pipeline_id: PipelineId) -> Result<Vec<Stage>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM stages WHERE pipeline_id = ?1 ORDER BY sort_order",
            STAGE_COLUMNS
        ))?;
        let rows = stmt.query_map([pipeline_id], stage_from_row)?;

        let mut stages = Vec::new();
        for row in rows {
            stages.push(row?);
        }
        Ok(stages)
    }

    pub fn get_by_id(conn: &Connection, id: StageId) -> Result<Option<Stage>> {
        let mut stmt = conn.prepare(&format!("SELECT {} FROM stages WHERE id = ?1", STAGE_COLUMNS))?;
        let stage = stmt.query_row([id], stage_from_row).optional()?;
        Ok(stage)
    }

    /// Append a stage after the pipeline's current last stage
    pub fn create(conn: &Connection, pipeline_id: PipelineId, name: &str, color: Option<&str>) -> Result<Stage> {
        let max_order: i64 = conn.query_row(
            "SELECT COALESCE(MAX(sort_order), 0) FROM stages WHERE pipeline_id = ?1",
            [pipeline_id],
            |row| row.get(0),
        )?;
        let order = max_order + 1;
        let now = chrono::Utc::now().timestamp();

        conn.execute(
            "INSERT INTO stages (pipeline_id, name, sort_order, color, created_ts, modified_ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![pipeline_id, name, order, color, now, now],
        )
        .with_context(|| format!("Failed to create stage: {}", name))?;

        Ok(Stage {
            id: conn.last_insert_rowid(),
            pipeline_id,
            name: name.to_string(),
            order,
            color_hint: color.map(str::to_string),
        })
    }

    pub fn rename(conn: &Connection, id: StageId, name: &str) -> Result<()> {
        let updated = conn.execute(
            "UPDATE stages SET name = ?1, modified_ts = ?2 WHERE id = ?3",
            rusqlite::params![name, chrono::Utc::now().timestamp(), id],
        )
        .with_context(|| format!("Failed to rename stage {}", id))?;
        if updated == 0 {
            anyhow::bail!("No stage found with id={}", id);
        }
        Ok(())
    }

    pub fn set_color(conn: &Connection, id: StageId, color: Option<&str>) -> Result<()> {
        let updated = conn.execute(
            "UPDATE stages SET color = ?1, modified_ts = ?2 WHERE id = ?3",
            rusqlite::params![color, chrono::Utc::now().timestamp(), id],
        )?;
        if updated == 0 {
            anyhow::bail!("No stage found with id={}", id);
        }
        Ok(())
    }

    pub fn delete(conn: &Connection, id: StageId) -> Result<()> {
        let deleted = conn.execute("DELETE FROM stages WHERE id = ?1", [id])
            .with_context(|| format!("Failed to delete stage {}", id))?;
        if deleted == 0 {
            anyhow::bail!("No stage found with id={}", id);
        }
        Ok(())
    }

    /// Replace the order of the listed stages in one transaction
    pub fn replace_order(conn: &Connection, pipeline_id: PipelineId, orders: &[StageOrder]) -> Result<()> {
        let tx = conn.unchecked_transaction()?;

        // Park every listed stage on a negative ordinal first
        for item in orders {
            tx.execute(
                "UPDATE stages SET sort_order = -(?1) WHERE id = ?2 AND pipeline_id = ?3",
                rusqlite::params![item.order, item.id, pipeline_id],
            )?;
        }

        let now = chrono::Utc::now().timestamp();
        for item in orders {
            tx.execute(
                "UPDATE stages SET sort_order = ?1, modified_ts = ?2 WHERE id = ?3 AND pipeline_id = ?4",
                rusqlite::params![item.order, now, item.id, pipeline_id],
            )
            .with_context(|| format!("Failed to set order {} for stage {}", item.order, item.id))?;
        }

        tx.commit()?;
        Ok(())
    }

    pub fn count_leads(conn: &Connection, id: StageId) -> Result<usize> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM leads WHERE stage_id = ?1",
            [id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbConnection;
    use crate::repo::PipelineRepo;

    #[test]
    fn test_create_appends() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let pipeline = PipelineRepo::create(&conn, "default").unwrap().id.unwrap();
        let new = StageRepo::create(&conn, pipeline, "New", None).unwrap();
        let won = StageRepo::create(&conn, pipeline, "Won", Some("green")).unwrap();
        assert_eq!(new.order, 1);
        assert_eq!(won.order, 2);
        assert_eq!(won.color_hint.as_deref(), Some("green"));
    }

    #[test]
    fn test_replace_order_swaps_without_clash() {
        let conn = DbConnection::connect_in_memory().unwrap();
        let pipeline = PipelineRepo::create(&conn, "default").unwrap().id.unwrap();
        let new = StageRepo::create(&conn, pipeline, "New", None).unwrap();
        let won = StageRepo::create(&conn, pipeline, "Won", None).unwrap();

        StageRepo::replace_order(
            &conn,
            pipeline,
            &[StageOrder { id: new.id, order: 2 }, StageOrder { id: won.id, order: 1 }],
        )
        .unwrap();

        let names: Vec<String> = StageRepo::list(&conn, pipeline).unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Won", "New"]);
    }
}

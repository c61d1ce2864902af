use std::collections::HashSet;
use crate::models::{Direction, Stage, StageId, StageOrder};
use super::{LeadIndex, PipelineError, Result};

/// Ordered set of stages for one pipeline
///
/// Stages are kept sorted by `order` ascending at all times, so `ordered()`
/// is the canonical read path. Every mutation re-checks that order values are
/// unique and strictly increasing; a violation is a bug and panics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageStore {
    stages: Vec<Stage>,
}

impl StageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current state with `stages`, sorted by order
    pub fn load(&mut self, mut stages: Vec<Stage>) -> Result<()> {
        let mut ids = HashSet::new();
        let mut orders = HashSet::new();
        for stage in &stages {
            if stage.name.trim().is_empty() {
                return Err(PipelineError::InvalidStageData(format!("stage {} has an empty name", stage.id)));
            }
            if stage.order < 1 {
                return Err(PipelineError::InvalidStageData(format!(
                    "stage {} has non-positive order {}", stage.id, stage.order
                )));
            }
            if !ids.insert(stage.id) {
                return Err(PipelineError::InvalidStageData(format!("duplicate stage id {}", stage.id)));
            }
            if !orders.insert(stage.order) {
                return Err(PipelineError::InvalidStageData(format!("duplicate stage order {}", stage.order)));
            }
        }

        stages.sort_by_key(|s| s.order);
        self.stages = stages;
        self.check_order();
        Ok(())
    }

    /// Stages sorted by order ascending
    pub fn ordered(&self) -> &[Stage] {
        &self.stages
    }

    pub fn get(&self, stage_id: StageId) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == stage_id)
    }

    pub fn contains(&self, stage_id: StageId) -> bool {
        self.get(stage_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn max_order(&self) -> i64 {
        self.stages.last().map(|s| s.order).unwrap_or(0)
    }

    /// Current `[{id, order}]` list, the payload of a replace-order request
    pub fn order_list(&self) -> Vec<StageOrder> {
        self.stages.iter().map(StageOrder::from).collect()
    }

    /// Insert `stage` immediately after the last stage whose order is
    /// `<= after_order` (`after_order = 0` inserts at the front).
    ///
    /// The new order is the midpoint of the gap to the next stage. When no
    /// integer gap exists, all stages are renumbered contiguously (1..N+1)
    /// with the new stage in its slot.
    pub fn insert(&mut self, mut stage: Stage, after_order: i64) -> Result<&[Stage]> {
        if stage.name.trim().is_empty() {
            return Err(PipelineError::InvalidStageData("stage name cannot be empty".to_string()));
        }
        if self.contains(stage.id) {
            return Err(PipelineError::InvalidStageData(format!("duplicate stage id {}", stage.id)));
        }

        let position = self.stages.iter().take_while(|s| s.order <= after_order).count();
        let lower = if position == 0 { 0 } else { self.stages[position - 1].order };
        let upper = self.stages.get(position).map(|s| s.order);

        match upper {
            None => stage.order = lower + 1,
            Some(upper) if upper - lower >= 2 => stage.order = lower + (upper - lower) / 2,
            Some(_) => {
                // No gap: renumber 1..N leaving a hole at position + 1
                for (i, existing) in self.stages.iter_mut().enumerate() {
                    let slot = i as i64 + 1;
                    existing.order = if i < position { slot } else { slot + 1 };
                }
                stage.order = position as i64 + 1;
            }
        }

        self.stages.insert(position, stage);
        self.check_order();
        Ok(&self.stages)
    }

    /// Append `stage` after the current last stage
    pub fn push(&mut self, stage: Stage) -> Result<&[Stage]> {
        let after = self.max_order();
        self.insert(stage, after)
    }

    /// Remove a stage that no lead occupies
    pub fn remove(&mut self, stage_id: StageId, leads: &LeadIndex) -> Result<Stage> {
        let position = self.position(stage_id)?;
        let count = leads.count_in_stage(stage_id);
        if count > 0 {
            return Err(PipelineError::StageHasMembers { stage_id, count });
        }
        let removed = self.stages.remove(position);
        self.check_order();
        Ok(removed)
    }

    /// Swap order with the adjacent stage; a move past either end is a no-op.
    /// Returns whether anything changed.
    pub fn move_stage(&mut self, stage_id: StageId, direction: Direction) -> Result<bool> {
        let position = self.position(stage_id)?;
        let neighbour = match direction {
            Direction::Up if position > 0 => position - 1,
            Direction::Down if position + 1 < self.stages.len() => position + 1,
            _ => return Ok(false),
        };

        let order = self.stages[position].order;
        self.stages[position].order = self.stages[neighbour].order;
        self.stages[neighbour].order = order;
        self.stages.swap(position, neighbour);
        self.check_order();
        Ok(true)
    }

    pub fn rename(&mut self, stage_id: StageId, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(PipelineError::InvalidStageData("stage name cannot be empty".to_string()));
        }
        let position = self.position(stage_id)?;
        self.stages[position].name = name.to_string();
        Ok(())
    }

    /// Swap a stage record for the one the service returned.
    ///
    /// The service's order is taken when it is free in this store; otherwise
    /// the local order stays authoritative. An id already held by another
    /// stage is rejected and the store is left untouched.
    pub fn replace(&mut self, stage_id: StageId, mut stage: Stage) -> Result<()> {
        let position = self.position(stage_id)?;
        let duplicate_id = self
            .stages
            .iter()
            .enumerate()
            .any(|(i, s)| i != position && s.id == stage.id);
        if duplicate_id {
            return Err(PipelineError::InvalidStageData(format!(
                "duplicate stage id {} returned for stage {}",
                stage.id, stage_id
            )));
        }
        let local_order = self.stages[position].order;
        let clashes = self
            .stages
            .iter()
            .enumerate()
            .any(|(i, s)| i != position && s.order == stage.order);
        if clashes || stage.order < 1 {
            if stage.order != local_order {
                log::warn!(
                    "Service assigned order {} to stage {}; keeping local order {}",
                    stage.order, stage.id, local_order
                );
            }
            stage.order = local_order;
        }
        self.stages[position] = stage;
        self.stages.sort_by_key(|s| s.order);
        self.check_order();
        Ok(())
    }

    fn position(&self, stage_id: StageId) -> Result<usize> {
        self.stages
            .iter()
            .position(|s| s.id == stage_id)
            .ok_or(PipelineError::StageNotFound(stage_id))
    }

    /// Order values must be positive and strictly increasing
    fn check_order(&self) {
        for pair in self.stages.windows(2) {
            assert!(
                pair[0].order < pair[1].order,
                "OrderInvariantViolated: stage {} (order {}) precedes stage {} (order {})",
                pair[0].id, pair[0].order, pair[1].id, pair[1].order
            );
        }
        if let Some(first) = self.stages.first() {
            assert!(first.order >= 1, "OrderInvariantViolated: stage {} has order {}", first.id, first.order);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Lead;

    fn store(orders: &[(i64, &str, i64)]) -> StageStore {
        let mut store = StageStore::new();
        store
            .load(orders.iter().map(|(id, name, order)| Stage::new(*id, 1, *name, *order)).collect())
            .unwrap();
        store
    }

    fn names(store: &StageStore) -> Vec<&str> {
        store.ordered().iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_load_sorts_by_order() {
        let store = store(&[(3, "Won", 30), (1, "New", 10), (2, "Contacted", 20)]);
        assert_eq!(names(&store), vec!["New", "Contacted", "Won"]);
    }

    #[test]
    fn test_load_rejects_duplicate_order() {
        let mut store = StageStore::new();
        let err = store
            .load(vec![Stage::new(1, 1, "New", 1), Stage::new(2, 1, "Won", 1)])
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidStageData(_)));
    }

    #[test]
    fn test_load_rejects_duplicate_id() {
        let mut store = StageStore::new();
        let err = store
            .load(vec![Stage::new(1, 1, "New", 1), Stage::new(1, 1, "Won", 2)])
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidStageData(_)));
    }

    #[test]
    fn test_insert_into_gap_uses_midpoint() {
        let mut store = store(&[(1, "New", 10), (2, "Won", 20)]);
        store.insert(Stage::new(3, 1, "Contacted", 0), 10).unwrap();
        assert_eq!(names(&store), vec!["New", "Contacted", "Won"]);
        assert_eq!(store.get(3).unwrap().order, 15);
        assert_eq!(store.get(1).unwrap().order, 10);
    }

    #[test]
    fn test_insert_without_gap_renumbers() {
        let mut store = store(&[(1, "New", 1), (2, "Won", 2)]);
        store.insert(Stage::new(3, 1, "Contacted", 0), 1).unwrap();
        let orders: Vec<i64> = store.ordered().iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
        assert_eq!(names(&store), vec!["New", "Contacted", "Won"]);
    }

    #[test]
    fn test_insert_at_front_and_end() {
        let mut store = store(&[(1, "New", 1), (2, "Won", 2)]);
        store.insert(Stage::new(3, 1, "Inbox", 0), 0).unwrap();
        assert_eq!(names(&store), vec!["Inbox", "New", "Won"]);
        store.push(Stage::new(4, 1, "Lost", 0)).unwrap();
        assert_eq!(names(&store), vec!["Inbox", "New", "Won", "Lost"]);
        assert_eq!(store.max_order(), 4);
    }

    #[test]
    fn test_move_swaps_orders() {
        let mut store = store(&[(1, "New", 1), (2, "Contacted", 2), (3, "Won", 3)]);
        assert!(store.move_stage(3, Direction::Up).unwrap());
        assert_eq!(names(&store), vec!["New", "Won", "Contacted"]);
        assert_eq!(store.get(3).unwrap().order, 2);
        assert_eq!(store.get(2).unwrap().order, 3);
    }

    #[test]
    fn test_move_at_boundary_is_noop() {
        let mut store = store(&[(1, "New", 1), (2, "Won", 2)]);
        let before = store.clone();
        assert!(!store.move_stage(1, Direction::Up).unwrap());
        assert!(!store.move_stage(2, Direction::Down).unwrap());
        assert_eq!(store, before);
    }

    #[test]
    fn test_move_unknown_stage() {
        let mut store = store(&[(1, "New", 1)]);
        assert!(matches!(store.move_stage(9, Direction::Up), Err(PipelineError::StageNotFound(9))));
    }

    #[test]
    fn test_remove_requires_empty_stage() {
        let mut store = store(&[(1, "New", 1), (2, "Won", 2)]);
        let mut leads = LeadIndex::new();
        leads.load(vec![Lead::new(10, 1, 1, "Acme", 5.0)], &store).unwrap();

        let err = store.remove(1, &leads).unwrap_err();
        assert!(matches!(err, PipelineError::StageHasMembers { stage_id: 1, count: 1 }));
        assert!(matches!(store.remove(7, &leads), Err(PipelineError::StageNotFound(7))));

        store.remove(2, &leads).unwrap();
        assert_eq!(names(&store), vec!["New"]);
    }

    #[test]
    fn test_replace_keeps_local_order_on_clash() {
        let mut store = store(&[(1, "New", 1), (-1, "Draft", 2)]);
        store.replace(-1, Stage::new(5, 1, "Draft", 1)).unwrap();
        assert_eq!(store.get(5).unwrap().order, 2);
        assert!(!store.contains(-1));
    }

    #[test]
    fn test_replace_rejects_id_of_another_stage() {
        let mut store = store(&[(1, "New", 1), (-1, "Draft", 2)]);
        let before = store.clone();

        let err = store.replace(-1, Stage::new(1, 1, "Draft", 3)).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidStageData(_)));
        assert_eq!(store, before);

        // Keeping its own id is a plain update
        store.replace(1, Stage::new(1, 1, "Fresh", 1)).unwrap();
        assert_eq!(store.get(1).unwrap().name, "Fresh");
    }

    #[test]
    fn test_rename_rejects_empty_name() {
        let mut store = store(&[(1, "New", 1)]);
        assert!(matches!(store.rename(1, "  "), Err(PipelineError::InvalidStageData(_))));
        store.rename(1, "Fresh").unwrap();
        assert_eq!(store.get(1).unwrap().name, "Fresh");
    }
}

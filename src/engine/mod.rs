//! Pipeline stage and lead ordering engine
//!
//! `PipelineBoard` is one pipeline view session. It owns the ordered stages
//! (`StageStore`) and lead membership (`LeadIndex`), applies every mutation
//! optimistically, and routes the remote write through [`reconcile`], which
//! either keeps the new state or restores the pre-mutation snapshot.
//!
//! Concurrency: lead transitions are serialized per lead, stage-structure
//! changes per pipeline. A conflicting call is rejected rather than queued.

pub mod error;
pub mod stage_store;
pub mod lead_index;
pub mod reconcile;
pub mod board;
pub mod transition;
pub mod reorder;

pub use error::*;
pub use stage_store::StageStore;
pub use lead_index::LeadIndex;
pub use reconcile::{reconcile, Snapshot};
pub use board::{BoardState, BoardView, Outcome, PipelineBoard};

use std::sync::{Mutex, MutexGuard};

/// Lock a mutex, recovering the data if a panicking holder poisoned it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|err| err.into_inner())
}

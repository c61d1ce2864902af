//! Salesline - a sales pipeline ledger
//!
//! This library provides the core functionality for Salesline, including:
//! - The pipeline engine: ordered stages, exclusive lead membership, lead
//!   transitions and stage reordering with optimistic updates that revert
//!   when the Pipeline Service rejects a write
//! - The Pipeline Service contract and its SQLite implementation
//! - Database operations and migrations
//! - CLI command parsing and execution
//!
//! # Example
//!
//! ```no_run
//! use salesline::cli::run;
//!
//! fn main() {
//!     if let Err(e) = run() {
//!         eprintln!("Error: {}", e);
//!         std::process::exit(1);
//!     }
//! }
//! ```

pub mod config;
pub mod db;
pub mod models;
pub mod repo;
pub mod service;
pub mod engine;
pub mod cli;

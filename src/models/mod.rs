// Core data models for the sales pipeline
// These structs represent the domain entities

pub mod pipeline;
pub mod stage;
pub mod lead;

pub use pipeline::*;
pub use stage::*;
pub use lead::*;

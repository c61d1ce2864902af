pub mod pipeline;
pub mod stage;
pub mod lead;

pub use pipeline::*;
pub use stage::*;
pub use lead::*;

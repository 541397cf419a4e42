pub mod resolution;

pub use resolution::{classify, PositionStatus, ResolutionEngine};

//! Common types and utilities shared across the wind-tiles workspace.

pub mod cycle;
pub mod error;
pub mod field;
pub mod grid;
pub mod time;

pub use cycle::{resolve_cycle, CyclePolicy, Resolution};
pub use error::{PipelineError, PipelineResult, PipelineStage};
pub use field::{NativeField, ResampledField};
pub use grid::{DestinationGrid, GeoBounds};
pub use time::{parse_valid_time, LeadTime, ModelRun};

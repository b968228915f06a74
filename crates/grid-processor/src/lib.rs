//! Grid processing for wind fields.
//!
//! Resamples wind components from a model's native grid onto a regular
//! geographic grid.
//!
//! ```text
//! NativeField (curvilinear lat/lon per cell)
//!      │
//!      ├─► KdTree over finite (lat, lon)      O(n log n)
//!      │
//!      ├─► per destination row (rayon):
//!      │       nearest native point per cell
//!      │       distance > max_distance_deg ─► masked, u = v = 0
//!      │
//!      ▼
//! ResampledField (u, v, mask)
//! ```

pub mod config;
pub mod error;
pub mod reproject;

pub use config::{ReprojectionConfig, DEFAULT_MAX_DISTANCE_DEG};
pub use error::{GridProcessorError, Result};
pub use reproject::{reproject, resample_with_index};

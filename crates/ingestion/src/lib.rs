//! Native wind field retrieval.
//!
//! Sources turn a (model run, lead time, variables) request into a
//! [`wind_common::NativeField`]:
//!
//! - [`DirectorySource`]: raw arrays on local disk, see [`layout`]
//! - [`SyntheticSource`]: generated fields on the HRRR Lambert grid
//!
//! Variable alias lookup and longitude normalisation happen here and nowhere
//! downstream.

pub mod error;
pub mod layout;
pub mod sources;
pub mod variables;

pub use error::{IngestionError, Result};
pub use layout::{extract_forecast_hour, Manifest};
pub use sources::{normalize_longitudes, write_field, DirectorySource, FieldSource, SyntheticSource};
pub use variables::{Component, VariableSet};

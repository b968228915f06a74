//! Native field sources.
//!
//! A [`FieldSource`] hands back a [`NativeField`] with longitudes already in
//! `[-180, 180)` and `u`/`v` picked out by [`VariableSet`] alias lookup, so
//! nothing downstream deals with source-specific naming.

mod directory;
mod synthetic;

pub use directory::{write_field, DirectorySource};
pub use synthetic::SyntheticSource;

use async_trait::async_trait;
use wind_common::{LeadTime, ModelRun, NativeField};

use crate::error::Result;
use crate::variables::VariableSet;

/// Retrieves one native wind field per (run, lead).
///
/// Implementations report unpublished data as
/// [`IngestionError::Unavailable`](crate::IngestionError::Unavailable) and
/// do not retry.
#[async_trait]
pub trait FieldSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn fetch(
        &self,
        run: &ModelRun,
        lead: LeadTime,
        variables: &VariableSet,
    ) -> Result<NativeField>;
}

/// Map longitudes above 180 into `[-180, 180)`.
pub fn normalize_longitudes(lon: &mut [f64]) {
    for value in lon.iter_mut() {
        if *value > 180.0 {
            *value -= 360.0;
        }
    }
}

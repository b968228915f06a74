//! On-disk layout of native fields.
//!
//! ```text
//! {root}/{model}.{YYYYMMDD}/t{HH}z/f{LL}/manifest.json
//!                                      /lat.f32
//!                                      /lon.f32
//!                                      /{variable file}.f32
//! ```
//!
//! `.f32` files are raw little-endian `f32` arrays, row-major, `nx * ny` long.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use wind_common::{LeadTime, ModelRun};

pub const MANIFEST_FILE: &str = "manifest.json";

/// Contents of `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub nx: usize,
    pub ny: usize,
    #[serde(default = "default_lat_file")]
    pub lat: String,
    #[serde(default = "default_lon_file")]
    pub lon: String,
    /// Variable name -> file name.
    pub variables: BTreeMap<String, String>,
}

impl Manifest {
    /// `nx * ny`, or `None` when the declared shape overflows.
    pub fn cell_count(&self) -> Option<usize> {
        self.nx.checked_mul(self.ny)
    }
}

fn default_lat_file() -> String {
    "lat.f32".to_string()
}

fn default_lon_file() -> String {
    "lon.f32".to_string()
}

/// `{root}/{model}.{YYYYMMDD}/t{HH}z`
pub fn run_directory(root: &Path, model: &str, run: &ModelRun) -> PathBuf {
    root.join(format!("{}.{}", model, run.date_label()))
        .join(format!("t{:02}z", run.cycle_hour()))
}

/// `{root}/{model}.{YYYYMMDD}/t{HH}z/f{LL}`
pub fn lead_directory(root: &Path, model: &str, run: &ModelRun, lead: LeadTime) -> PathBuf {
    run_directory(root, model, run).join(lead.label())
}

/// File name for a variable: lowercase, non-alphanumerics replaced by `_`.
pub fn variable_file_name(variable: &str) -> String {
    let stem: String = variable
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{}.f32", stem)
}

/// Forecast hour of a lead directory name (`f##` or `f###`).
pub fn extract_forecast_hour(name: &str) -> Option<u32> {
    name.strip_prefix('f')?.parse().ok()
}

/// Decode a raw little-endian `f32` buffer.
pub fn decode_f32(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect(),
    )
}

/// Encode values as a raw little-endian `f32` buffer.
pub fn encode_f32<I: IntoIterator<Item = f32>>(values: I) -> Vec<u8> {
    values.into_iter().flat_map(f32::to_le_bytes).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_lead_directory() {
        let run = ModelRun::new(Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap());
        let dir = lead_directory(Path::new("/data"), "hrrr", &run, LeadTime::new(3));
        assert_eq!(dir, PathBuf::from("/data/hrrr.20240115/t09z/f03"));
    }

    #[test]
    fn test_extract_forecast_hour() {
        assert_eq!(extract_forecast_hour("f03"), Some(3));
        assert_eq!(extract_forecast_hour("f120"), Some(120));
        assert_eq!(extract_forecast_hour("fx"), None);
        assert_eq!(extract_forecast_hour("manifest.json"), None);
    }

    #[test]
    fn test_manifest_cell_count() {
        let mut manifest: Manifest =
            serde_json::from_str(r#"{"nx": 4, "ny": 3, "variables": {}}"#).unwrap();
        assert_eq!(manifest.cell_count(), Some(12));
        manifest.nx = 8_589_934_592;
        manifest.ny = 2_147_483_648;
        assert_eq!(manifest.cell_count(), None);
    }

    #[test]
    fn test_variable_file_name() {
        assert_eq!(variable_file_name("UGRD:10 m"), "ugrd_10_m.f32");
    }

    #[test]
    fn test_f32_codec() {
        let bytes = encode_f32([1.5, -2.25, f32::NAN]);
        let back = decode_f32(&bytes).unwrap();
        assert_eq!(&back[..2], &[1.5, -2.25]);
        assert!(back[2].is_nan());
        assert!(decode_f32(&bytes[..5]).is_none());
    }

    #[test]
    fn test_manifest_defaults() {
        let m: Manifest =
            serde_json::from_str(r#"{"nx": 2, "ny": 1, "variables": {"u10": "u.f32"}}"#).unwrap();
        assert_eq!(m.lat, "lat.f32");
        assert_eq!(m.variables["u10"], "u.f32");
    }
}

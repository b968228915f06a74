//! Tiler configuration.
//!
//! Layered lowest to highest: built-in defaults, an optional YAML file
//! (with `${VAR}` / `${VAR:-default}` substitution), `WIND_*` / `S3_*`
//! environment variables, then CLI flags.

use std::collections::BTreeSet;
use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use grid_processor::ReprojectionConfig;
use renderer::{EncodingParams, PyramidConfig, MAX_ZOOM};
use storage::ObjectStorageConfig;
use wind_common::{CyclePolicy, DestinationGrid, GeoBounds, PipelineError, PipelineResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TilerConfig {
    pub model: String,
    pub variables: Vec<String>,
    pub grid: GridConfig,
    pub reprojection: ReprojectionConfig,
    pub encoding: EncodingConfig,
    pub cycle: CyclePolicy,
    pub forecast_offsets: Vec<u32>,
    pub output_dir: PathBuf,
    pub source: SourceConfig,
    pub publish: Option<PublishConfig>,
    pub pyramid: Option<PyramidConfig>,
    pub max_concurrent_offsets: usize,
}

impl Default for TilerConfig {
    fn default() -> Self {
        Self {
            model: "hrrr".to_string(),
            variables: vec!["UGRD:10 m".to_string(), "VGRD:10 m".to_string()],
            grid: GridConfig::default(),
            reprojection: ReprojectionConfig::default(),
            encoding: EncodingConfig::default(),
            cycle: CyclePolicy::default(),
            forecast_offsets: vec![0],
            output_dir: PathBuf::from("/tmp/wind-tiles"),
            source: SourceConfig::default(),
            publish: None,
            pyramid: None,
            max_concurrent_offsets: 4,
        }
    }
}

/// Destination grid, flattened for YAML.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
    pub width: usize,
    pub height: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        let conus = DestinationGrid::conus();
        Self::from(&conus)
    }
}

impl From<&DestinationGrid> for GridConfig {
    fn from(grid: &DestinationGrid) -> Self {
        Self {
            west: grid.bounds.west,
            east: grid.bounds.east,
            south: grid.bounds.south,
            north: grid.bounds.north,
            width: grid.width,
            height: grid.height,
        }
    }
}

impl GridConfig {
    pub fn to_grid(&self) -> DestinationGrid {
        DestinationGrid::new(
            GeoBounds::new(self.west, self.east, self.south, self.north),
            self.width,
            self.height,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    pub value_min: f64,
    pub value_max: f64,
    pub zero_offset: u8,
    /// Write RGBA with the validity mask as alpha.
    pub alpha_mask: bool,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            value_min: -50.0,
            value_max: 50.0,
            zero_offset: 128,
            alpha_mask: false,
        }
    }
}

impl EncodingConfig {
    pub fn params(&self) -> PipelineResult<EncodingParams> {
        EncodingParams::new(self.value_min, self.value_max, self.zero_offset).map_err(Into::into)
    }
}

/// Where native fields come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceConfig {
    Directory {
        root: PathBuf,
    },
    Synthetic {
        #[serde(default = "default_stride")]
        stride: usize,
        #[serde(default)]
        unavailable_leads: Vec<u32>,
    },
}

fn default_stride() -> usize {
    4
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Synthetic {
            stride: default_stride(),
            unavailable_leads: Vec::new(),
        }
    }
}

/// Durable storage for finished runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Key prefix, e.g. `wind`.
    #[serde(default)]
    pub prefix: String,
    pub target: PublishTarget,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PublishTarget {
    S3(S3Target),
    Local { root: PathBuf },
}

/// S3 settings; kept separate so the YAML form mirrors [`ObjectStorageConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct S3Target {
    pub endpoint: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub allow_http: bool,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl From<&S3Target> for ObjectStorageConfig {
    fn from(t: &S3Target) -> Self {
        ObjectStorageConfig {
            endpoint: t.endpoint.clone(),
            bucket: t.bucket.clone(),
            access_key_id: t.access_key_id.clone(),
            secret_access_key: t.secret_access_key.clone(),
            region: t.region.clone(),
            allow_http: t.allow_http,
        }
    }
}

impl From<ObjectStorageConfig> for S3Target {
    fn from(c: ObjectStorageConfig) -> Self {
        S3Target {
            endpoint: c.endpoint,
            bucket: c.bucket,
            access_key_id: c.access_key_id,
            secret_access_key: c.secret_access_key,
            region: c.region,
            allow_http: c.allow_http,
        }
    }
}

impl TilerConfig {
    /// Load a YAML file, expanding `${VAR}` references first.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        Ok(serde_yaml::from_str(&expanded)?)
    }

    /// Defaults, then the file named by `path` or `WIND_CONFIG`, then env.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let from_env = env::var("WIND_CONFIG").ok().map(PathBuf::from);
        let mut config = match path.map(Path::to_path_buf).or(from_env) {
            Some(p) => Self::from_yaml_file(p)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from `WIND_*` and `S3_*` environment variables.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(dir) = env::var("WIND_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Ok(root) = env::var("WIND_SOURCE_DIR") {
            self.source = SourceConfig::Directory {
                root: PathBuf::from(root),
            };
        }
        if let Ok(spec) = env::var("WIND_FORECAST_HOURS") {
            self.forecast_offsets = parse_offsets(&spec)?;
        }
        if let Ok(v) = env::var("WIND_MAX_DISTANCE_DEG") {
            self.reprojection.max_distance_deg = v
                .parse()
                .with_context(|| format!("Invalid WIND_MAX_DISTANCE_DEG: {}", v))?;
        }
        if let Ok(v) = env::var("WIND_MAX_LOOKBACK_HOURS") {
            self.cycle.max_lookback_hours = v
                .parse()
                .with_context(|| format!("Invalid WIND_MAX_LOOKBACK_HOURS: {}", v))?;
        }
        if let Ok(v) = env::var("WIND_MAX_HORIZON_HOURS") {
            self.cycle.max_horizon_hours = v
                .parse()
                .with_context(|| format!("Invalid WIND_MAX_HORIZON_HOURS: {}", v))?;
        }
        if env::var("S3_ENDPOINT").is_ok() || env::var("S3_BUCKET").is_ok() {
            let prefix = env::var("WIND_PUBLISH_PREFIX")
                .ok()
                .or_else(|| self.publish.as_ref().map(|p| p.prefix.clone()))
                .unwrap_or_default();
            self.publish = Some(PublishConfig {
                prefix,
                target: PublishTarget::S3(ObjectStorageConfig::from_env().into()),
            });
        } else if let (Ok(prefix), Some(publish)) =
            (env::var("WIND_PUBLISH_PREFIX"), self.publish.as_mut())
        {
            publish.prefix = prefix;
        }
        Ok(())
    }

    pub fn destination_grid(&self) -> DestinationGrid {
        self.grid.to_grid()
    }

    /// Requested offsets, ascending and deduplicated.
    pub fn offsets(&self) -> Vec<u32> {
        self.forecast_offsets
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.forecast_offsets.is_empty() {
            return Err(PipelineError::config("forecast_offsets must not be empty"));
        }
        self.destination_grid().validate()?;
        if !(self.reprojection.max_distance_deg > 0.0) {
            return Err(PipelineError::config(format!(
                "max_distance_deg must be positive, got {}",
                self.reprojection.max_distance_deg
            )));
        }
        if self.encoding.value_min >= self.encoding.value_max {
            return Err(PipelineError::config(format!(
                "encoding value_min ({}) must be below value_max ({})",
                self.encoding.value_min, self.encoding.value_max
            )));
        }
        if !(1..=254).contains(&self.encoding.zero_offset) {
            return Err(PipelineError::config(format!(
                "zero_offset must be in 1..=254, got {}",
                self.encoding.zero_offset
            )));
        }
        self.encoding.params()?;
        if self.cycle.max_lookback_hours == 0 {
            return Err(PipelineError::config("max_lookback_hours must be at least 1"));
        }
        if self.max_concurrent_offsets == 0 {
            return Err(PipelineError::config("max_concurrent_offsets must be at least 1"));
        }
        if let Some(pyramid) = &self.pyramid {
            if pyramid.min_zoom > pyramid.max_zoom {
                return Err(PipelineError::config(format!(
                    "pyramid min_zoom ({}) exceeds max_zoom ({})",
                    pyramid.min_zoom, pyramid.max_zoom
                )));
            }
            if pyramid.max_zoom > MAX_ZOOM {
                return Err(PipelineError::config(format!(
                    "pyramid max_zoom ({}) exceeds {}",
                    pyramid.max_zoom, MAX_ZOOM
                )));
            }
            if pyramid.tile_size == 0 {
                return Err(PipelineError::config("pyramid tile_size must be positive"));
            }
        }
        Ok(())
    }
}

/// Parse an offset list: `"0,1,2"`, `"0-3"`, or a mix such as `"0-2,6"`.
pub fn parse_offsets(spec: &str) -> Result<Vec<u32>> {
    let mut offsets = BTreeSet::new();
    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start: u32 = start
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid offset range: {}", part))?;
                let end: u32 = end
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid offset range: {}", part))?;
                anyhow::ensure!(start <= end, "Offset range is reversed: {}", part);
                offsets.extend(start..=end);
            }
            None => {
                offsets.insert(
                    part.parse()
                        .with_context(|| format!("Invalid offset: {}", part))?,
                );
            }
        }
    }
    anyhow::ensure!(!offsets.is_empty(), "No forecast offsets in '{}'", spec);
    Ok(offsets.into_iter().collect())
}

/// Expand `${VAR}` and `${VAR:-default}` references.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .with_context(|| format!("Unclosed variable substitution: ${{{}", after))?;
        result.push_str(&resolve_var_expr(&after[..end])?);
        rest = &after[end + 1..];
    }
    result.push_str(rest);

    Ok(result)
}

fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((name, default)) = expr.split_once(":-") {
        match env::var(name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = TilerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.destination_grid(), DestinationGrid::conus());
        assert_eq!(config.reprojection.max_distance_deg, 0.15);
    }

    #[test]
    fn test_parse_offsets() {
        assert_eq!(parse_offsets("0,1,2").unwrap(), vec![0, 1, 2]);
        assert_eq!(parse_offsets("0-3").unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(parse_offsets("6, 0-2, 1").unwrap(), vec![0, 1, 2, 6]);
        assert!(parse_offsets("3-1").is_err());
        assert!(parse_offsets("x").is_err());
        assert!(parse_offsets(" , ").is_err());
    }

    #[test]
    fn test_yaml_overrides_and_defaults() {
        let yaml = r#"
model: hrrr
forecast_offsets: [0, 1, 2]
grid: { west: -100.0, east: -90.0, south: 30.0, north: 40.0, width: 11, height: 11 }
encoding: { alpha_mask: true }
source: { type: directory, root: /data/native }
publish:
  prefix: wind
  target: { type: local, root: /tmp/published }
pyramid: { max_zoom: 4 }
"#;
        let config = TilerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.forecast_offsets, vec![0, 1, 2]);
        assert_eq!(config.grid.width, 11);
        assert!(config.encoding.alpha_mask);
        assert_eq!(config.encoding.zero_offset, 128);
        assert_eq!(
            config.source,
            SourceConfig::Directory {
                root: PathBuf::from("/data/native")
            }
        );
        assert_eq!(config.pyramid.unwrap().tile_size, 256);
        assert_eq!(config.cycle, CyclePolicy::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_substitution_default() {
        let yaml = "output_dir: ${WIND_TEST_UNSET_DIR:-/srv/tiles}\n";
        let config = TilerConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/srv/tiles"));
        assert!(expand_env_vars("${WIND_TEST_REQUIRED_UNSET}").is_err());
        assert!(expand_env_vars("${UNCLOSED").is_err());
    }

    #[test]
    fn test_validate_rejects() {
        let bad = |f: fn(&mut TilerConfig)| {
            let mut c = TilerConfig::default();
            f(&mut c);
            c.validate().unwrap_err()
        };
        assert!(matches!(bad(|c| c.forecast_offsets.clear()), PipelineError::Config(_)));
        assert!(matches!(bad(|c| c.grid.east = c.grid.west), PipelineError::Config(_)));
        assert!(matches!(bad(|c| c.grid.width = 0), PipelineError::Config(_)));
        assert!(matches!(bad(|c| c.reprojection.max_distance_deg = 0.0), PipelineError::Config(_)));
        assert!(matches!(bad(|c| c.encoding.value_min = 60.0), PipelineError::Config(_)));
        assert!(matches!(bad(|c| c.encoding.zero_offset = 0), PipelineError::Config(_)));
        assert!(matches!(bad(|c| c.cycle.max_lookback_hours = 0), PipelineError::Config(_)));
        assert!(matches!(
            bad(|c| c.pyramid = Some(PyramidConfig { min_zoom: 5, max_zoom: 2, tile_size: 256 })),
            PipelineError::Config(_)
        ));
        assert!(matches!(
            bad(|c| c.pyramid = Some(PyramidConfig { min_zoom: 0, max_zoom: 32, tile_size: 256 })),
            PipelineError::Config(_)
        ));
    }

    #[test]
    fn test_offsets_sorted_unique() {
        let config = TilerConfig {
            forecast_offsets: vec![2, 0, 2, 1],
            ..Default::default()
        };
        assert_eq!(config.offsets(), vec![0, 1, 2]);
    }
}

//! Native fields stored as raw arrays on local disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, instrument};
use wind_common::{LeadTime, ModelRun, NativeField};

use super::{normalize_longitudes, FieldSource};
use crate::error::{IngestionError, Result};
use crate::layout::{
    decode_f32, encode_f32, extract_forecast_hour, lead_directory, run_directory,
    variable_file_name, Manifest, MANIFEST_FILE,
};
use crate::variables::{Component, VariableSet};

/// Reads fields laid out as described in [`crate::layout`].
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    model: String,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>, model: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            model: model.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lead times present on disk for `run`, ascending.
    pub async fn available_leads(&self, run: &ModelRun) -> Result<Vec<LeadTime>> {
        let dir = run_directory(&self.root, &self.model, run);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut leads = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if let Some(hour) = entry.file_name().to_str().and_then(extract_forecast_hour) {
                leads.push(LeadTime::new(hour));
            }
        }
        leads.sort();
        Ok(leads)
    }

    async fn read_array(&self, dir: &Path, file: &str, expected: usize) -> Result<Vec<f32>> {
        let bytes = tokio::fs::read(dir.join(file)).await?;
        let values = decode_f32(&bytes).ok_or_else(|| {
            IngestionError::InvalidData(format!("{} is not a whole number of f32 values", file))
        })?;
        if values.len() != expected {
            return Err(IngestionError::InvalidData(format!(
                "{} has {} values, expected {}",
                file,
                values.len(),
                expected
            )));
        }
        Ok(values)
    }

    async fn read_variable(
        &self,
        dir: &Path,
        manifest: &Manifest,
        component: Component,
        variables: &VariableSet,
        run: &ModelRun,
        lead: LeadTime,
    ) -> Result<Vec<f32>> {
        let missing = || IngestionError::MissingVariable {
            variable: variables.requested(component).to_string(),
            run: *run,
            lead,
        };

        let key = variables
            .resolve(component, manifest.variables.keys().map(String::as_str))
            .ok_or_else(missing)?;
        let file = &manifest.variables[key];
        debug!(%component, key, file = %file, "Resolved wind variable");

        match self.read_array(dir, file, cell_count(manifest)?).await {
            Err(IngestionError::FileRead(e)) if e.kind() == ErrorKind::NotFound => Err(missing()),
            other => other,
        }
    }
}

#[async_trait]
impl FieldSource for DirectorySource {
    fn name(&self) -> &str {
        "directory"
    }

    #[instrument(skip(self, variables), fields(model_run = %run, lead_time = %lead))]
    async fn fetch(
        &self,
        run: &ModelRun,
        lead: LeadTime,
        variables: &VariableSet,
    ) -> Result<NativeField> {
        let dir = lead_directory(&self.root, &self.model, run, lead);
        let manifest_bytes = match tokio::fs::read(dir.join(MANIFEST_FILE)).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let published = self.available_leads(run).await.unwrap_or_default();
                return Err(IngestionError::unavailable(
                    run,
                    lead,
                    format!(
                        "{} not found (published leads: {:?})",
                        dir.display(),
                        published.iter().map(|l| l.hours()).collect::<Vec<_>>()
                    ),
                ));
            }
            Err(e) => return Err(e.into()),
        };
        let manifest: Manifest = serde_json::from_slice(&manifest_bytes)?;
        let n = cell_count(&manifest)?;

        let u = self
            .read_variable(&dir, &manifest, Component::U, variables, run, lead)
            .await?;
        let v = self
            .read_variable(&dir, &manifest, Component::V, variables, run, lead)
            .await?;
        let lat = self.read_array(&dir, &manifest.lat, n).await?;
        let lon = self.read_array(&dir, &manifest.lon, n).await?;

        let mut lon: Vec<f64> = lon.into_iter().map(f64::from).collect();
        normalize_longitudes(&mut lon);
        let field = NativeField::new(
            manifest.nx,
            manifest.ny,
            lat.into_iter().map(f64::from).collect(),
            lon,
            u,
            v,
        );
        field
            .check_shape()
            .map_err(|e| IngestionError::InvalidData(e.to_string()))?;

        debug!(nx = field.nx, ny = field.ny, "Read native field");
        Ok(field)
    }
}

fn cell_count(manifest: &Manifest) -> Result<usize> {
    manifest.cell_count().ok_or_else(|| {
        IngestionError::InvalidData(format!(
            "manifest dimensions {}x{} overflow",
            manifest.nx, manifest.ny
        ))
    })
}

/// Write `field` into the directory layout under `root`, returning the
/// lead directory. Variables are stored under their requested names.
pub async fn write_field(
    root: &Path,
    model: &str,
    run: &ModelRun,
    lead: LeadTime,
    field: &NativeField,
    variables: &VariableSet,
) -> Result<PathBuf> {
    field
        .check_shape()
        .map_err(|e| IngestionError::InvalidData(e.to_string()))?;

    let dir = lead_directory(root, model, run, lead);
    tokio::fs::create_dir_all(&dir).await?;

    let u_file = variable_file_name(&variables.u);
    let v_file = variable_file_name(&variables.v);
    let manifest = Manifest {
        nx: field.nx,
        ny: field.ny,
        lat: "lat.f32".to_string(),
        lon: "lon.f32".to_string(),
        variables: [
            (variables.u.clone(), u_file.clone()),
            (variables.v.clone(), v_file.clone()),
        ]
        .into_iter()
        .collect(),
    };

    tokio::fs::write(dir.join(&manifest.lat), encode_f32(field.lat.iter().map(|&x| x as f32)))
        .await?;
    tokio::fs::write(dir.join(&manifest.lon), encode_f32(field.lon.iter().map(|&x| x as f32)))
        .await?;
    tokio::fs::write(dir.join(u_file), encode_f32(field.u.iter().copied())).await?;
    tokio::fs::write(dir.join(v_file), encode_f32(field.v.iter().copied())).await?;
    tokio::fs::write(dir.join(MANIFEST_FILE), serde_json::to_vec_pretty(&manifest)?).await?;

    Ok(dir)
}

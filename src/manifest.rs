//! Batch manifest.
//!
//! A JSON record of what a run produced, with per-asset hashes, so a batch
//! can be checked or reproduced later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::batch::BatchReport;
use crate::config::{Config, ErrorCorrection, OutputFormat};
use crate::error::{BatchError, WriteError};
use crate::ENGINE_VERSION;

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn sorted_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sorted_keys(v))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted_keys).collect()),
        scalar => scalar,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
    pub size: usize,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchManifest {
    pub engine_version: String,
    pub created_at: DateTime<Utc>,
    pub base_url: String,
    pub error_correction: ErrorCorrection,
    pub resolution: u32,
    pub format: OutputFormat,
    pub quality: f64,
    pub archive_sha256: String,
    pub assets: Vec<ManifestEntry>,
    /// SHA-256 of the canonical JSON of every other field.
    #[serde(default)]
    pub manifest_hash: String,
}

impl BatchManifest {
    pub fn build(config: &Config, report: &BatchReport) -> Result<Self, serde_json::Error> {
        let mut manifest = Self {
            engine_version: ENGINE_VERSION.to_string(),
            created_at: Utc::now(),
            base_url: config.base_url().to_string(),
            error_correction: config.error_correction(),
            resolution: config.resolution(),
            format: config.format(),
            quality: config.quality(),
            archive_sha256: sha256_hex(&report.archive_bytes),
            assets: report
                .archive
                .entries()
                .iter()
                .map(|a| ManifestEntry {
                    filename: a.filename.clone(),
                    size: a.bytes.len(),
                    sha256: sha256_hex(&a.bytes),
                })
                .collect(),
            manifest_hash: String::new(),
        };

        manifest.manifest_hash = manifest.compute_hash()?;
        Ok(manifest)
    }

    /// Hash over everything except `manifest_hash` itself, taken on the
    /// compact key-sorted JSON form.
    pub fn compute_hash(&self) -> Result<String, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Some(obj) = value.as_object_mut() {
            obj.remove("manifest_hash");
        }
        let canonical = serde_json::to_string(&sorted_keys(value))?;
        Ok(sha256_hex(canonical.as_bytes()))
    }

    pub fn verify(&self) -> bool {
        matches!(self.compute_hash(), Ok(h) if h == self.manifest_hash)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), BatchError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| WriteError::new(path, e))?;
        tracing::info!(path = %path.display(), "wrote manifest");
        Ok(())
    }
}

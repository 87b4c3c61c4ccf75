//! Batch Driver - Single Entry Point
//!
//! Identifiers are processed strictly in input order. Each asset is on
//! disk before the next identifier starts, and the archive is only built
//! after every asset has been written.

use std::fs;
use std::path::{Path, PathBuf};

use crate::archive::Archive;
use crate::compositor::{Compositor, RenderedAsset};
use crate::config::Config;
use crate::error::{BatchError, RenderError, WriteError};

/// Split an identifier list into trimmed, non-blank lines.
pub fn parse_identifiers(content: &str) -> Vec<&str> {
    content
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Receives progress as the batch advances.
pub trait ProgressReporter {
    /// Called once the asset's file is on disk.
    fn asset_written(&mut self, _asset: &RenderedAsset, _path: &Path) {}

    /// Called as each entry is added to the archive.
    fn archive_entry(&mut self, _filename: &str) {}
}

/// Reporter that discards all progress.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}

#[derive(Debug)]
pub struct BatchReport {
    /// One path per processed identifier, in input order.
    pub written: Vec<PathBuf>,
    pub archive: Archive,
    pub archive_path: PathBuf,
    pub archive_bytes: Vec<u8>,
}

pub struct BatchDriver {
    config: Config,
    compositor: Compositor,
}

impl BatchDriver {
    /// Load overlays for `config`. Fails before any identifier is processed
    /// if the logo or layer cannot be decoded.
    pub fn new(config: Config) -> Result<Self, RenderError> {
        let compositor = Compositor::new(&config)?;
        Ok(Self::with_compositor(config, compositor))
    }

    pub fn with_compositor(config: Config, compositor: Compositor) -> Self {
        Self { config, compositor }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read the configured input list and process it.
    pub fn run(&self, reporter: &mut dyn ProgressReporter) -> Result<BatchReport, BatchError> {
        let path = self.config.input_path();
        let content = fs::read_to_string(path).map_err(|source| BatchError::ReadInput {
            path: path.to_path_buf(),
            source,
        })?;
        self.run_identifiers(parse_identifiers(&content), reporter)
    }

    /// Render, write and archive every identifier. The first failure
    /// aborts the batch; no archive is written in that case.
    pub fn run_identifiers<'i>(
        &self,
        identifiers: impl IntoIterator<Item = &'i str>,
        reporter: &mut dyn ProgressReporter,
    ) -> Result<BatchReport, BatchError> {
        let output_dir = self.config.output_dir();
        let mut archive = Archive::new();
        let mut written = vec![];

        tracing::info!(
            output = %output_dir.display(),
            format = self.config.format().mime_type(),
            "starting batch"
        );

        for identifier in identifiers {
            let payload = self.config.payload_for(identifier);
            tracing::debug!(identifier, payload = %payload, "rendering");

            let asset = self.compositor.render(identifier, &payload)?;
            let path = output_dir.join(&asset.filename);
            fs::write(&path, &asset.bytes).map_err(|e| WriteError::new(&path, e))?;

            reporter.asset_written(&asset, &path);
            written.push(path);
            archive.add(asset);
        }

        let archive_path = self.config.zip_output_path().to_path_buf();
        let archive_bytes = archive.write_to(&archive_path, |name| reporter.archive_entry(name))?;

        tracing::info!(
            assets = written.len(),
            entries = archive.len(),
            "batch complete"
        );

        Ok(BatchReport {
            written,
            archive,
            archive_path,
            archive_bytes,
        })
    }
}

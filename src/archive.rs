//! Archive accumulator.
//!
//! Collects rendered assets during a batch and writes them as one flat zip
//! once the batch is done. The whole archive is assembled in memory.

use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::compositor::RenderedAsset;
use crate::error::{ArchiveError, WriteError};

/// Ordered (filename, bytes) entries. A filename added twice keeps its
/// first position but takes the newest bytes.
#[derive(Debug, Default)]
pub struct Archive {
    entries: Vec<RenderedAsset>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, asset: RenderedAsset) {
        match self.entries.iter_mut().find(|e| e.filename == asset.filename) {
            Some(existing) => {
                tracing::debug!(filename = %asset.filename, "replacing archive entry");
                existing.bytes = asset.bytes;
            }
            None => self.entries.push(asset),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[RenderedAsset] {
        &self.entries
    }

    /// Build the zip in memory, calling `on_entry` for each entry added.
    pub fn to_zip_bytes(&self, mut on_entry: impl FnMut(&str)) -> Result<Vec<u8>, ArchiveError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in &self.entries {
            on_entry(&entry.filename);
            writer
                .start_file(entry.filename.as_str(), options)
                .and_then(|_| writer.write_all(&entry.bytes).map_err(Into::into))
                .map_err(|source| ArchiveError::Entry {
                    filename: entry.filename.clone(),
                    source,
                })?;
        }

        let cursor = writer.finish().map_err(ArchiveError::Finish)?;
        Ok(cursor.into_inner())
    }

    /// Build the zip and write it to `path` in a single write.
    pub fn write_to(&self, path: &Path, on_entry: impl FnMut(&str)) -> Result<Vec<u8>, ArchiveError> {
        let bytes = self.to_zip_bytes(on_entry)?;
        fs::write(path, &bytes).map_err(|e| WriteError::new(path, e))?;
        tracing::info!(path = %path.display(), entries = self.entries.len(), "wrote archive");
        Ok(bytes)
    }
}

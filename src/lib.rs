//! QR Batch Core - branded QR code batch generator
//!
//! One run turns a newline-delimited identifier list into one image per
//! identifier (QR code + centered logo + optional full-frame layer),
//! written to a directory and collected into a single zip archive.
//!
//! ```text
//! Config ─▶ BatchDriver ─┬─▶ qr::encode ─▶ Compositor ─▶ <output>/<id>.<ext>
//!                        │                                   │
//!                        └────────────── Archive ◀───────────┘
//!                                           │
//!                                           ▼
//!                                      archive.zip
//! ```

pub mod archive;
pub mod batch;
pub mod compositor;
pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod qr;
pub mod validation;

pub use archive::Archive;
pub use batch::{parse_identifiers, BatchDriver, BatchReport, ProgressReporter, SilentReporter};
pub use compositor::{Compositor, LogoPlacement, Overlays, RenderedAsset};
pub use config::{Color, Config, ErrorCorrection, OutputFormat, RawConfig};
pub use error::{ArchiveError, BatchError, ConfigError, RenderError, WriteError};
pub use manifest::BatchManifest;
pub use validation::{ValidationViolation, ViolationSeverity};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

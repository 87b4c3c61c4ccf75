//! Compositor: QR bitmap + centered logo + optional full-frame layer.
//!
//! ```text
//! QR bitmap ──── canvas (R x R) at (0,0)
//!                  │
//! logo ──── scaled to R/4 x R/4, centered
//!                  │
//! layer ─── stretched to R x R (optional)
//!                  │
//!                  ▼
//!            JPEG / PNG bytes
//! ```

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use std::fs;
use std::path::Path;

use crate::config::{Config, OutputFormat};
use crate::error::RenderError;
use crate::qr::{self, QrOptions};

const OVERLAY_FILTER: FilterType = FilterType::Lanczos3;

/// Placement of the logo box on an R x R canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogoPlacement {
    pub x: u32,
    pub y: u32,
    pub size: u32,
}

impl LogoPlacement {
    pub fn for_resolution(resolution: u32) -> Self {
        let size = resolution / 4;
        let offset = (resolution - size) / 2;
        Self {
            x: offset,
            y: offset,
            size,
        }
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.size && y >= self.y && y < self.y + self.size
    }
}

/// Logo and layer, decoded once and pre-scaled for the run's resolution.
pub struct Overlays {
    logo: RgbaImage,
    layer: Option<RgbaImage>,
    placement: LogoPlacement,
}

impl Overlays {
    /// Read and decode the overlay files.
    pub fn load(logo: &Path, layer: Option<&Path>, resolution: u32) -> Result<Self, RenderError> {
        let logo = read_image(logo)?;
        let layer = layer.map(read_image).transpose()?;
        Ok(Self::from_images(logo, layer, resolution))
    }

    /// Build overlays from already decoded images.
    pub fn from_images(logo: DynamicImage, layer: Option<DynamicImage>, resolution: u32) -> Self {
        let placement = LogoPlacement::for_resolution(resolution);
        let logo = logo
            .resize_exact(placement.size, placement.size, OVERLAY_FILTER)
            .to_rgba8();
        let layer = layer.map(|l| {
            l.resize_exact(resolution, resolution, OVERLAY_FILTER)
                .to_rgba8()
        });

        Self {
            logo,
            layer,
            placement,
        }
    }

    pub fn placement(&self) -> LogoPlacement {
        self.placement
    }

    pub fn has_layer(&self) -> bool {
        self.layer.is_some()
    }
}

fn read_image(path: &Path) -> Result<DynamicImage, RenderError> {
    let bytes = fs::read(path).map_err(|source| RenderError::ReadOverlay {
        path: path.to_path_buf(),
        source,
    })?;
    image::load_from_memory(&bytes).map_err(|source| RenderError::DecodeOverlay {
        path: path.to_path_buf(),
        source,
    })
}

/// One generated image and its target filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedAsset {
    pub filename: String,
    pub bytes: Vec<u8>,
}

pub struct Compositor {
    qr_options: QrOptions,
    overlays: Overlays,
    format: OutputFormat,
    quality: f64,
}

impl Compositor {
    pub fn new(config: &Config) -> Result<Self, RenderError> {
        let overlays = Overlays::load(config.logo_path(), config.layer_path(), config.resolution())?;
        tracing::debug!(
            logo = %config.logo_path().display(),
            layer = overlays.has_layer(),
            "loaded overlays"
        );
        Ok(Self::with_overlays(config, overlays))
    }

    pub fn with_overlays(config: &Config, overlays: Overlays) -> Self {
        Self {
            qr_options: QrOptions::from_config(config),
            overlays,
            format: config.format(),
            quality: config.quality(),
        }
    }

    /// Compose the canvas for one payload without encoding it.
    pub fn compose(&self, payload: &str) -> Result<RgbaImage, RenderError> {
        let resolution = self.qr_options.resolution;
        let qr = qr::encode(payload, &self.qr_options)?;

        let mut canvas = RgbaImage::from_pixel(resolution, resolution, Rgba([0, 0, 0, 0]));
        imageops::overlay(&mut canvas, &qr, 0, 0);

        let placement = self.overlays.placement();
        imageops::overlay(
            &mut canvas,
            &self.overlays.logo,
            placement.x as i64,
            placement.y as i64,
        );

        if let Some(layer) = &self.overlays.layer {
            imageops::overlay(&mut canvas, layer, 0, 0);
        }

        Ok(canvas)
    }

    /// Render and encode the asset for one identifier.
    pub fn render(&self, identifier: &str, payload: &str) -> Result<RenderedAsset, RenderError> {
        let canvas = self.compose(payload)?;
        let bytes = encode_canvas(canvas, self.format, self.quality).map_err(|source| {
            RenderError::EncodeImage {
                identifier: identifier.to_string(),
                source,
            }
        })?;

        tracing::debug!(identifier, bytes = bytes.len(), "rendered asset");

        Ok(RenderedAsset {
            filename: asset_filename(identifier, self.format),
            bytes,
        })
    }
}

/// Filename for an identifier's asset, always relative so it stays under
/// the output directory and carries no root inside the archive. Root,
/// `.` and `..` segments are dropped; other separators are kept as `/`.
pub fn asset_filename(identifier: &str, format: OutputFormat) -> String {
    let stem = identifier
        .split(['/', '\\'])
        .filter(|segment| !matches!(*segment, "" | "." | ".."))
        .collect::<Vec<_>>()
        .join("/");
    format!("{}.{}", stem, format.extension())
}

/// JPEG quality for a 0.1..=1.0 quality factor.
pub fn jpeg_quality(quality: f64) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Encode a canvas. JPEG has no alpha channel, so the canvas is flattened
/// to RGB first; `quality` is ignored for PNG.
pub fn encode_canvas(
    canvas: RgbaImage,
    format: OutputFormat,
    quality: f64,
) -> Result<Vec<u8>, image::ImageError> {
    let (width, height) = canvas.dimensions();
    let mut buf = Vec::new();

    match format {
        OutputFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
            JpegEncoder::new_with_quality(&mut buf, jpeg_quality(quality)).write_image(
                rgb.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            )?;
        }
        OutputFormat::Png => {
            PngEncoder::new(&mut buf).write_image(
                canvas.as_raw(),
                width,
                height,
                ExtendedColorType::Rgba8,
            )?;
        }
    }

    Ok(buf)
}

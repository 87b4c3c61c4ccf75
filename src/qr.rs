//! QR Encoder
//!
//! Turns a payload into a square RGBA bitmap exactly `resolution` pixels
//! wide, quiet zone included.

use image::RgbaImage;
use qrcode::{Color as Module, QrCode};

use crate::config::{Color, Config, ErrorCorrection};
use crate::error::RenderError;

/// Quiet zone width in modules on each side.
pub const QUIET_ZONE: u32 = 4;

#[derive(Debug, Clone, Copy)]
pub struct QrOptions {
    pub resolution: u32,
    pub error_correction: ErrorCorrection,
    pub dark: Color,
    pub light: Color,
}

impl QrOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            resolution: config.resolution(),
            error_correction: config.error_correction(),
            dark: config.dark(),
            light: config.light(),
        }
    }
}

/// Encode `payload` using the smallest QR version that holds it at the
/// requested error-correction level.
pub fn encode(payload: &str, options: &QrOptions) -> Result<RgbaImage, RenderError> {
    let code = QrCode::with_error_correction_level(
        payload.as_bytes(),
        options.error_correction.ec_level(),
    )
    .map_err(|source| RenderError::Encode {
        payload: payload.to_string(),
        source,
    })?;

    let modules = code.width() as u32;
    let span = modules + 2 * QUIET_ZONE;
    if options.resolution < span {
        return Err(RenderError::ResolutionTooSmall {
            resolution: options.resolution,
            modules,
        });
    }

    let colors = code.to_colors();
    let scale = options.resolution as f64 / span as f64;
    // Module coordinate for each pixel column/row; None inside the quiet zone.
    let axis: Vec<Option<usize>> = (0..options.resolution)
        .map(|p| {
            let m = (p as f64 / scale).floor() as u32;
            (QUIET_ZONE..QUIET_ZONE + modules)
                .contains(&m)
                .then(|| (m - QUIET_ZONE) as usize)
        })
        .collect();

    let dark = options.dark.rgba();
    let light = options.light.rgba();
    let width = modules as usize;

    let img = RgbaImage::from_fn(options.resolution, options.resolution, |x, y| {
        match (axis[x as usize], axis[y as usize]) {
            (Some(mx), Some(my)) if colors[my * width + mx] == Module::Dark => dark,
            _ => light,
        }
    });

    tracing::trace!(payload, modules, "encoded QR bitmap");
    Ok(img)
}

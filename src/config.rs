//! Run Configuration
//!
//! `RawConfig` is what the user handed us (CLI flags, optionally layered
//! over a JSON file). `Config` is the validated, immutable result the
//! batch runs against.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ConfigError;
use crate::validation::{ValidationViolation, Validator};

pub const DEFAULT_ERROR_CORRECTION: ErrorCorrection = ErrorCorrection::Quartile;
pub const DEFAULT_RESOLUTION: u32 = 512;
pub const DEFAULT_QUALITY: f64 = 0.8;
pub const DEFAULT_DARK: &str = "000000";
pub const DEFAULT_LIGHT: &str = "FFFFFF";
pub const DEFAULT_ARCHIVE_NAME: &str = "archive.zip";

/// Unvalidated run parameters. Every field is optional; defaults are
/// applied during validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConfig {
    #[serde(default)]
    pub input: Option<PathBuf>,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub zip_output: Option<PathBuf>,
    #[serde(default)]
    pub logo: Option<PathBuf>,
    #[serde(default)]
    pub layer: Option<PathBuf>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub error_lvl: Option<String>,
    #[serde(default)]
    pub resolution: Option<u32>,
    #[serde(default)]
    pub quality: Option<f64>,
    #[serde(default, rename = "type")]
    pub image_type: Option<String>,
    #[serde(default)]
    pub dark: Option<String>,
    #[serde(default)]
    pub light: Option<String>,
}

impl RawConfig {
    /// Load a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ConfigFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&content).map_err(|e| ConfigError::ConfigFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Layer `overrides` on top of `self`; any field set in `overrides` wins.
    pub fn merged_with(self, overrides: RawConfig) -> Self {
        Self {
            input: overrides.input.or(self.input),
            output: overrides.output.or(self.output),
            zip_output: overrides.zip_output.or(self.zip_output),
            logo: overrides.logo.or(self.logo),
            layer: overrides.layer.or(self.layer),
            url: overrides.url.or(self.url),
            error_lvl: overrides.error_lvl.or(self.error_lvl),
            resolution: overrides.resolution.or(self.resolution),
            quality: overrides.quality.or(self.quality),
            image_type: overrides.image_type.or(self.image_type),
            dark: overrides.dark.or(self.dark),
            light: overrides.light.or(self.light),
        }
    }

    pub(crate) fn input_path(&self) -> Option<&Path> {
        non_empty_path(&self.input)
    }

    pub(crate) fn output_path(&self) -> Option<&Path> {
        non_empty_path(&self.output)
    }

    pub(crate) fn logo_path(&self) -> Option<&Path> {
        non_empty_path(&self.logo)
    }

    pub(crate) fn layer_path(&self) -> Option<&Path> {
        non_empty_path(&self.layer)
    }

    pub(crate) fn url_str(&self) -> Option<&str> {
        non_empty_str(&self.url)
    }

    pub(crate) fn error_lvl_str(&self) -> &str {
        non_empty_str(&self.error_lvl).unwrap_or(DEFAULT_ERROR_CORRECTION.as_str())
    }

    pub(crate) fn quality_value(&self) -> f64 {
        self.quality.unwrap_or(DEFAULT_QUALITY)
    }

    pub(crate) fn resolution_value(&self) -> u32 {
        self.resolution.unwrap_or(DEFAULT_RESOLUTION)
    }

    pub(crate) fn dark_str(&self) -> &str {
        non_empty_str(&self.dark).unwrap_or(DEFAULT_DARK)
    }

    pub(crate) fn light_str(&self) -> &str {
        non_empty_str(&self.light).unwrap_or(DEFAULT_LIGHT)
    }
}

fn non_empty_path(value: &Option<PathBuf>) -> Option<&Path> {
    value
        .as_deref()
        .filter(|p| !p.as_os_str().is_empty())
}

fn non_empty_str(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// QR redundancy class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCorrection {
    #[serde(rename = "L")]
    Low,
    #[serde(rename = "M")]
    Medium,
    #[serde(rename = "Q")]
    Quartile,
    #[serde(rename = "H")]
    High,
}

impl ErrorCorrection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "L",
            Self::Medium => "M",
            Self::Quartile => "Q",
            Self::High => "H",
        }
    }

    pub(crate) fn ec_level(&self) -> qrcode::EcLevel {
        match self {
            Self::Low => qrcode::EcLevel::L,
            Self::Medium => qrcode::EcLevel::M,
            Self::Quartile => qrcode::EcLevel::Q,
            Self::High => qrcode::EcLevel::H,
        }
    }
}

impl FromStr for ErrorCorrection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "l" => Ok(Self::Low),
            "m" => Ok(Self::Medium),
            "q" => Ok(Self::Quartile),
            "h" => Ok(Self::High),
            _ => Err(ConfigError::InvalidErrorCorrection(s.to_string())),
        }
    }
}

impl fmt::Display for ErrorCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    /// `png` selects PNG; anything else falls back to JPEG.
    pub fn from_type(image_type: Option<&str>) -> Self {
        match image_type {
            Some("png") => Self::Png,
            _ => Self::Jpeg,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// An RGBA colour parsed from hex notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub [u8; 4]);

impl Color {
    pub const BLACK: Color = Color([0, 0, 0, 255]);
    pub const WHITE: Color = Color([255, 255, 255, 255]);

    pub fn rgba(&self) -> image::Rgba<u8> {
        image::Rgba(self.0)
    }

    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self.0;
        if a == 255 {
            format!("{:02X}{:02X}{:02X}", r, g, b)
        } else {
            format!("{:02X}{:02X}{:02X}{:02X}", r, g, b, a)
        }
    }
}

impl FromStr for Color {
    type Err = ConfigError;

    /// Accepts `RGB`, `RGBA`, `RRGGBB` and `RRGGBBAA`, with or without `#`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidColor(s.to_string());
        let hex = s.strip_prefix('#').unwrap_or(s);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let expanded: String = match hex.len() {
            3 | 4 => hex.chars().flat_map(|c| [c, c]).collect(),
            6 | 8 => hex.to_string(),
            _ => return Err(invalid()),
        };

        let mut rgba = [255u8; 4];
        for (i, channel) in rgba.iter_mut().enumerate().take(expanded.len() / 2) {
            *channel = u8::from_str_radix(&expanded[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Color(rgba))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Validated run parameters.
#[derive(Debug, Clone)]
pub struct Config {
    input_path: PathBuf,
    output_dir: PathBuf,
    zip_output_path: PathBuf,
    logo_path: PathBuf,
    layer_path: Option<PathBuf>,
    base_url: String,
    error_correction: ErrorCorrection,
    resolution: u32,
    quality: f64,
    format: OutputFormat,
    dark: Color,
    light: Color,
}

impl Config {
    /// Validate raw parameters.
    ///
    /// Returns the config together with any non-fatal warnings, or the
    /// first fatal violation in check order.
    pub fn from_raw(raw: &RawConfig) -> Result<(Self, Vec<ValidationViolation>), ConfigError> {
        let warnings = Validator::new().validate(raw)?;

        let input_path = raw.input_path().ok_or(ConfigError::MissingInput)?.to_path_buf();
        let output_dir = raw.output_path().ok_or(ConfigError::MissingOutput)?.to_path_buf();
        let logo_path = raw
            .logo_path()
            .ok_or(ConfigError::LogoNotFound(None))?
            .to_path_buf();

        // A layer that failed its existence check is dropped, not fatal.
        let layer_path = raw
            .layer_path()
            .filter(|p| p.exists())
            .map(Path::to_path_buf);

        let zip_output_path = non_empty_path(&raw.zip_output)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| output_dir.join(DEFAULT_ARCHIVE_NAME));

        let mut base_url = raw.url_str().ok_or(ConfigError::MissingUrl)?.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let config = Self {
            input_path,
            output_dir,
            zip_output_path,
            logo_path,
            layer_path,
            base_url,
            error_correction: raw.error_lvl_str().parse()?,
            resolution: raw.resolution_value(),
            quality: raw.quality_value(),
            format: OutputFormat::from_type(raw.image_type.as_deref()),
            dark: raw.dark_str().parse()?,
            light: raw.light_str().parse()?,
        };

        Ok((config, warnings))
    }

    pub fn input_path(&self) -> &Path {
        &self.input_path
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn zip_output_path(&self) -> &Path {
        &self.zip_output_path
    }

    pub fn logo_path(&self) -> &Path {
        &self.logo_path
    }

    pub fn layer_path(&self) -> Option<&Path> {
        self.layer_path.as_deref()
    }

    /// Base URL, always ending in `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn error_correction(&self) -> ErrorCorrection {
        self.error_correction
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn quality(&self) -> f64 {
        self.quality
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn dark(&self) -> Color {
        self.dark
    }

    pub fn light(&self) -> Color {
        self.light
    }

    /// The QR payload for one identifier.
    pub fn payload_for(&self, identifier: &str) -> String {
        format!("{}{}", self.base_url, identifier)
    }
}

//! Validation System - Rule/Policy Separation
//!
//! Rules inspect a `RawConfig` and produce structured violations.
//! Policy: the first Error aborts the run, Warnings are carried forward.

use serde::Serialize;

use crate::config::{Color, ErrorCorrection, RawConfig};
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
}

#[derive(Debug)]
pub struct ValidationViolation {
    pub rule: &'static str,
    pub severity: ViolationSeverity,
    pub error: ConfigError,
}

impl ValidationViolation {
    fn error(rule: &'static str, error: ConfigError) -> Self {
        Self {
            rule,
            severity: ViolationSeverity::Error,
            error,
        }
    }

    fn warning(rule: &'static str, error: ConfigError) -> Self {
        Self {
            rule,
            severity: ViolationSeverity::Warning,
            error,
        }
    }

    /// The one-line message shown to the user.
    pub fn message(&self) -> String {
        self.error.to_string()
    }
}

/// Validation rule trait - produces at most one violation per rule
pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn validate(&self, raw: &RawConfig) -> Option<ValidationViolation>;
}

// --- Concrete Rules ---

pub struct ErrorCorrectionRule;

impl ValidationRule for ErrorCorrectionRule {
    fn name(&self) -> &'static str { "error_correction" }

    fn validate(&self, raw: &RawConfig) -> Option<ValidationViolation> {
        raw.error_lvl_str()
            .parse::<ErrorCorrection>()
            .err()
            .map(|e| ValidationViolation::error(self.name(), e))
    }
}

pub struct QualityRule;

impl ValidationRule for QualityRule {
    fn name(&self) -> &'static str { "quality" }

    fn validate(&self, raw: &RawConfig) -> Option<ValidationViolation> {
        let quality = raw.quality_value();
        if (0.1..=1.0).contains(&quality) {
            None
        } else {
            Some(ValidationViolation::error(
                self.name(),
                ConfigError::QualityOutOfRange(quality),
            ))
        }
    }
}

pub struct ResolutionRule;

impl ValidationRule for ResolutionRule {
    fn name(&self) -> &'static str { "resolution" }

    fn validate(&self, raw: &RawConfig) -> Option<ValidationViolation> {
        if raw.resolution_value() == 0 {
            Some(ValidationViolation::error(self.name(), ConfigError::InvalidResolution))
        } else {
            None
        }
    }
}

pub struct ColorRule;

impl ValidationRule for ColorRule {
    fn name(&self) -> &'static str { "color" }

    fn validate(&self, raw: &RawConfig) -> Option<ValidationViolation> {
        [raw.dark_str(), raw.light_str()]
            .into_iter()
            .find_map(|c| c.parse::<Color>().err())
            .map(|e| ValidationViolation::error(self.name(), e))
    }
}

pub struct InputRule;

impl ValidationRule for InputRule {
    fn name(&self) -> &'static str { "input" }

    fn validate(&self, raw: &RawConfig) -> Option<ValidationViolation> {
        match raw.input_path() {
            None => Some(ValidationViolation::error(self.name(), ConfigError::MissingInput)),
            Some(path) if !path.exists() => Some(ValidationViolation::error(
                self.name(),
                ConfigError::InputNotFound(path.to_path_buf()),
            )),
            Some(_) => None,
        }
    }
}

pub struct OutputRule;

impl ValidationRule for OutputRule {
    fn name(&self) -> &'static str { "output" }

    fn validate(&self, raw: &RawConfig) -> Option<ValidationViolation> {
        match raw.output_path() {
            None => Some(ValidationViolation::error(self.name(), ConfigError::MissingOutput)),
            Some(path) if !path.is_dir() => Some(ValidationViolation::error(
                self.name(),
                ConfigError::OutputNotFound(path.to_path_buf()),
            )),
            Some(_) => None,
        }
    }
}

pub struct LogoRule;

impl ValidationRule for LogoRule {
    fn name(&self) -> &'static str { "logo" }

    fn validate(&self, raw: &RawConfig) -> Option<ValidationViolation> {
        match raw.logo_path() {
            Some(path) if path.exists() => None,
            other => Some(ValidationViolation::error(
                self.name(),
                ConfigError::LogoNotFound(other.map(|p| p.to_path_buf())),
            )),
        }
    }
}

/// A missing layer is reported but the run continues without it.
pub struct LayerRule;

impl ValidationRule for LayerRule {
    fn name(&self) -> &'static str { "layer" }

    fn validate(&self, raw: &RawConfig) -> Option<ValidationViolation> {
        match raw.layer_path() {
            Some(path) if !path.exists() => Some(ValidationViolation::warning(
                self.name(),
                ConfigError::LayerNotFound(path.to_path_buf()),
            )),
            _ => None,
        }
    }
}

pub struct UrlRule;

impl ValidationRule for UrlRule {
    fn name(&self) -> &'static str { "url" }

    fn validate(&self, raw: &RawConfig) -> Option<ValidationViolation> {
        match raw.url_str() {
            None => Some(ValidationViolation::error(self.name(), ConfigError::MissingUrl)),
            Some(_) => None,
        }
    }
}

/// Validator orchestrates rules and applies policy
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(ErrorCorrectionRule),
                Box::new(QualityRule),
                Box::new(ResolutionRule),
                Box::new(ColorRule),
                Box::new(InputRule),
                Box::new(OutputRule),
                Box::new(LogoRule),
                Box::new(LayerRule),
                Box::new(UrlRule),
            ],
        }
    }

    /// Run every rule in order. Returns the warnings seen, or the first error.
    pub fn validate(&self, raw: &RawConfig) -> Result<Vec<ValidationViolation>, ConfigError> {
        let mut warnings = vec![];

        for rule in &self.rules {
            match rule.validate(raw) {
                Some(v) if v.severity == ViolationSeverity::Error => return Err(v.error),
                Some(v) => {
                    tracing::warn!(rule = v.rule, "{}", v.message());
                    warnings.push(v);
                }
                None => {}
            }
        }

        Ok(warnings)
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

//! QR Batch CLI
//!
//! Prints one `wrote …` line per asset, one `Adding to zip …` line per
//! archive entry, then `Done!`. Any failure prints a single line and
//! exits with status 1.

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use qrbatch_core::{
    logging::{init_logging, LoggingConfig},
    BatchDriver, BatchError, BatchManifest, Config, ProgressReporter, RawConfig, RenderedAsset,
};

#[derive(Parser)]
#[command(name = "qrbatch", version)]
#[command(about = "QR code generator: one branded QR image per identifier, plus a zip of them all")]
#[command(override_usage = "qrbatch [OPTIONS]...", disable_version_flag = true)]
struct Cli {
    /// Input csv file, one identifier per line
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory (must exist)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output location for the zip [default: <output>/archive.zip]
    #[arg(short = 'z', long, alias = "zo")]
    zip_output: Option<PathBuf>,

    /// Logo to overlay in the center
    #[arg(short, long)]
    logo: Option<PathBuf>,

    /// Layer to overlay over the whole image
    #[arg(short = 'L', long)]
    layer: Option<PathBuf>,

    /// Base URL to use for the QR codes
    #[arg(short, long)]
    url: Option<String>,

    /// Level of error correction [L, M, Q, H] [default: Q]
    #[arg(short, long = "error-lvl")]
    error_lvl: Option<String>,

    /// Image resolution in pixels [default: 512]
    #[arg(short, long)]
    resolution: Option<u32>,

    /// Image quality [0.1 - 1] [default: 0.8]
    #[arg(short, long)]
    quality: Option<f64>,

    /// Image file type [jpg, png] [default: jpg]
    #[arg(short = 't', long = "type")]
    image_type: Option<String>,

    /// Colour to use in hex instead of black [default: 000000]
    #[arg(short = 'b', long)]
    dark: Option<String>,

    /// Colour to use in hex instead of white [default: FFFFFF]
    #[arg(short = 'w', long)]
    light: Option<String>,

    /// JSON file with default values for any of the options above
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write a JSON manifest of the generated assets
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Log filter (overridden by RUST_LOG)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Print version
    #[arg(short = 'v', long, action = clap::ArgAction::Version)]
    version: Option<bool>,
}

impl Cli {
    fn raw_config(&self) -> RawConfig {
        RawConfig {
            input: self.input.clone(),
            output: self.output.clone(),
            zip_output: self.zip_output.clone(),
            logo: self.logo.clone(),
            layer: self.layer.clone(),
            url: self.url.clone(),
            error_lvl: self.error_lvl.clone(),
            resolution: self.resolution,
            quality: self.quality,
            image_type: self.image_type.clone(),
            dark: self.dark.clone(),
            light: self.light.clone(),
        }
    }
}

struct StdoutReporter;

impl ProgressReporter for StdoutReporter {
    fn asset_written(&mut self, asset: &RenderedAsset, _path: &Path) {
        println!("wrote {}", asset.filename);
    }

    fn archive_entry(&mut self, filename: &str) {
        println!("Adding to zip {}", filename);
    }
}

fn fail(message: impl std::fmt::Display) -> ExitCode {
    println!("{}", message);
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    if std::env::args_os().len() < 2 {
        Cli::command().print_help().ok();
        return ExitCode::SUCCESS;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.print().ok();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let rendered = e.to_string();
            return fail(rendered.lines().next().unwrap_or("Invalid arguments"));
        }
    };

    init_logging(&LoggingConfig {
        level: cli.log_level.clone(),
        json: cli.log_json,
    });

    let raw = match &cli.config {
        Some(path) => match RawConfig::load(path) {
            Ok(file) => file.merged_with(cli.raw_config()),
            Err(e) => return fail(e),
        },
        None => cli.raw_config(),
    };

    let (config, warnings) = match Config::from_raw(&raw) {
        Ok(validated) => validated,
        Err(e) => return fail(e),
    };
    for warning in &warnings {
        println!("{}", warning.message());
    }

    let driver = match BatchDriver::new(config) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };

    let report = match driver.run(&mut StdoutReporter) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    if let Some(path) = &cli.manifest {
        let written = BatchManifest::build(driver.config(), &report)
            .map_err(BatchError::from)
            .and_then(|m| m.write_to(path));
        if let Err(e) = written {
            return fail(e);
        }
    }

    println!("Done!");
    ExitCode::SUCCESS
}

//! Contract Invariant Tests
//!
//! End-to-end checks of the batch contract through the library API.

use image::{Rgba, RgbaImage};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use qrbatch_core::{
    BatchDriver, BatchError, BatchManifest, Config, ConfigError, ErrorCorrection, OutputFormat,
    ProgressReporter, RawConfig, RenderError, RenderedAsset, SilentReporter,
};

struct Fixture {
    dir: TempDir,
    out: PathBuf,
    logo: PathBuf,
}

impl Fixture {
    fn new(identifiers: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        fs::write(dir.path().join("names.csv"), identifiers).unwrap();

        let logo = dir.path().join("logo.png");
        RgbaImage::from_pixel(40, 20, Rgba([255, 0, 0, 255]))
            .save(&logo)
            .unwrap();

        Self { dir, out, logo }
    }

    fn raw(&self) -> RawConfig {
        RawConfig {
            input: Some(self.dir.path().join("names.csv")),
            output: Some(self.out.clone()),
            logo: Some(self.logo.clone()),
            url: Some("https://x.test/".into()),
            resolution: Some(128),
            ..Default::default()
        }
    }

    fn config(&self, raw: RawConfig) -> Config {
        Config::from_raw(&raw).unwrap().0
    }
}

#[derive(Default)]
struct Recorder {
    written: Vec<String>,
    zipped: Vec<String>,
}

impl ProgressReporter for Recorder {
    fn asset_written(&mut self, asset: &RenderedAsset, path: &Path) {
        assert!(path.exists(), "reported before {} was on disk", path.display());
        self.written.push(asset.filename.clone());
    }

    fn archive_entry(&mut self, filename: &str) {
        self.zipped.push(filename.to_string());
    }
}

fn zip_names(path: &Path) -> Vec<String> {
    let bytes = fs::read(path).unwrap();
    let zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut names: Vec<_> = zip.file_names().map(str::to_string).collect();
    names.sort();
    names
}

fn dir_names(path: &Path) -> Vec<String> {
    let mut names: Vec<_> = fs::read_dir(path)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn invariant_one_asset_per_non_blank_line() {
    let fx = Fixture::new("alice\nbob\n\ncarol");
    let driver = BatchDriver::new(fx.config(fx.raw())).unwrap();

    let mut recorder = Recorder::default();
    let report = driver.run(&mut recorder).unwrap();

    assert_eq!(recorder.written, vec!["alice.jpg", "bob.jpg", "carol.jpg"]);
    assert_eq!(recorder.zipped, vec!["alice.jpg", "bob.jpg", "carol.jpg"]);
    assert_eq!(report.written.len(), 3);
    assert_eq!(report.archive_path, fx.out.join("archive.zip"));

    assert_eq!(
        dir_names(&fx.out),
        vec!["alice.jpg", "archive.zip", "bob.jpg", "carol.jpg"]
    );

    assert_eq!(
        zip_names(&report.archive_path),
        vec!["alice.jpg", "bob.jpg", "carol.jpg"]
    );
}

#[test]
fn invariant_archive_bytes_match_disk() {
    let fx = Fixture::new("alice\nbob");
    let report = BatchDriver::new(fx.config(fx.raw()))
        .unwrap()
        .run(&mut SilentReporter)
        .unwrap();

    for entry in report.archive.entries() {
        let on_disk = fs::read(fx.out.join(&entry.filename)).unwrap();
        assert_eq!(on_disk, entry.bytes);
    }
    assert_eq!(fs::read(&report.archive_path).unwrap(), report.archive_bytes);
}

#[test]
fn invariant_every_asset_is_full_resolution() {
    let fx = Fixture::new("alice\nbob");
    let raw = RawConfig {
        resolution: Some(200),
        ..fx.raw()
    };
    BatchDriver::new(fx.config(raw))
        .unwrap()
        .run(&mut SilentReporter)
        .unwrap();

    for name in ["alice.jpg", "bob.jpg"] {
        let img = image::open(fx.out.join(name)).unwrap();
        assert_eq!((img.width(), img.height()), (200, 200));
    }
}

#[test]
fn invariant_png_output_with_quality() {
    let fx = Fixture::new("alice\nbob");
    let raw = RawConfig {
        image_type: Some("png".into()),
        quality: Some(0.5),
        ..fx.raw()
    };
    let config = fx.config(raw);
    assert_eq!(config.format(), OutputFormat::Png);

    BatchDriver::new(config)
        .unwrap()
        .run(&mut SilentReporter)
        .unwrap();

    for name in ["alice.png", "bob.png"] {
        let bytes = fs::read(fx.out.join(name)).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}

#[test]
fn invariant_rendering_is_deterministic() {
    let fx = Fixture::new("alice");
    let raw = RawConfig {
        image_type: Some("png".into()),
        ..fx.raw()
    };
    let driver = BatchDriver::new(fx.config(raw)).unwrap();

    let first = driver.run(&mut SilentReporter).unwrap();
    let second = driver.run(&mut SilentReporter).unwrap();
    assert_eq!(first.archive.entries(), second.archive.entries());
}

#[test]
fn invariant_duplicate_identifiers_last_write_wins() {
    let fx = Fixture::new("alice\nbob\nalice");
    let report = BatchDriver::new(fx.config(fx.raw()))
        .unwrap()
        .run(&mut SilentReporter)
        .unwrap();

    assert_eq!(report.written.len(), 3);
    assert_eq!(report.archive.len(), 2);
    assert_eq!(zip_names(&report.archive_path), vec!["alice.jpg", "bob.jpg"]);
}

#[test]
fn invariant_url_gets_trailing_slash() {
    let fx = Fixture::new("dave");
    let raw = RawConfig {
        url: Some("https://x.test".into()),
        ..fx.raw()
    };
    let config = fx.config(raw);
    assert_eq!(config.base_url(), "https://x.test/");
    assert_eq!(config.payload_for("dave"), "https://x.test/dave");
}

#[test]
fn invariant_defaults_applied() {
    let fx = Fixture::new("alice");
    let raw = RawConfig {
        resolution: None,
        ..fx.raw()
    };
    let config = fx.config(raw);
    assert_eq!(config.error_correction(), ErrorCorrection::Quartile);
    assert_eq!(config.resolution(), 512);
    assert_eq!(config.quality(), 0.8);
    assert_eq!(config.format(), OutputFormat::Jpeg);
    assert_eq!(config.dark().to_hex(), "000000");
    assert_eq!(config.light().to_hex(), "FFFFFF");
    assert_eq!(config.zip_output_path(), fx.out.join("archive.zip"));
}

#[test]
fn invariant_quality_boundaries() {
    let fx = Fixture::new("alice");
    for ok in [0.1, 1.0] {
        let raw = RawConfig { quality: Some(ok), ..fx.raw() };
        assert!(Config::from_raw(&raw).is_ok(), "quality {ok} should be accepted");
    }
    for bad in [0.09, 1.01] {
        let raw = RawConfig { quality: Some(bad), ..fx.raw() };
        assert!(matches!(
            Config::from_raw(&raw),
            Err(ConfigError::QualityOutOfRange(_))
        ));
    }
}

#[test]
fn invariant_error_level_case_insensitive() {
    let fx = Fixture::new("alice");
    for level in ["q", "Q"] {
        let raw = RawConfig { error_lvl: Some(level.into()), ..fx.raw() };
        assert_eq!(fx.config(raw).error_correction(), ErrorCorrection::Quartile);
    }
    let raw = RawConfig { error_lvl: Some("x".into()), ..fx.raw() };
    assert!(matches!(
        Config::from_raw(&raw),
        Err(ConfigError::InvalidErrorCorrection(_))
    ));
}

#[test]
fn invariant_missing_required_values() {
    let fx = Fixture::new("alice");

    let raw = RawConfig { input: None, ..fx.raw() };
    assert!(matches!(Config::from_raw(&raw), Err(ConfigError::MissingInput)));

    let raw = RawConfig { input: Some(fx.dir.path().join("nope.csv")), ..fx.raw() };
    assert!(matches!(Config::from_raw(&raw), Err(ConfigError::InputNotFound(_))));

    let raw = RawConfig { output: None, ..fx.raw() };
    assert!(matches!(Config::from_raw(&raw), Err(ConfigError::MissingOutput)));

    let raw = RawConfig { output: Some(fx.dir.path().join("nope")), ..fx.raw() };
    assert!(matches!(Config::from_raw(&raw), Err(ConfigError::OutputNotFound(_))));

    let raw = RawConfig { url: None, ..fx.raw() };
    assert!(matches!(Config::from_raw(&raw), Err(ConfigError::MissingUrl)));
}

#[test]
fn invariant_missing_logo_is_fatal() {
    let fx = Fixture::new("alice");

    let raw = RawConfig { logo: None, ..fx.raw() };
    assert!(matches!(Config::from_raw(&raw), Err(ConfigError::LogoNotFound(None))));

    let raw = RawConfig { logo: Some(fx.dir.path().join("nope.png")), ..fx.raw() };
    assert!(matches!(Config::from_raw(&raw), Err(ConfigError::LogoNotFound(Some(_)))));
    assert!(dir_names(&fx.out).is_empty());
}

#[test]
fn invariant_missing_layer_warns_and_continues() {
    let fx = Fixture::new("alice");
    let raw = RawConfig {
        layer: Some(fx.dir.path().join("nope.png")),
        ..fx.raw()
    };
    let (config, warnings) = Config::from_raw(&raw).unwrap();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].rule, "layer");
    assert!(config.layer_path().is_none());

    let report = BatchDriver::new(config).unwrap().run(&mut SilentReporter).unwrap();
    assert_eq!(report.written.len(), 1);
}

#[test]
fn invariant_layer_covers_canvas() {
    let fx = Fixture::new("alice");
    let layer = fx.dir.path().join("layer.png");
    RgbaImage::from_pixel(10, 10, Rgba([0, 0, 255, 255]))
        .save(&layer)
        .unwrap();

    let raw = RawConfig {
        layer: Some(layer),
        image_type: Some("png".into()),
        ..fx.raw()
    };
    BatchDriver::new(fx.config(raw))
        .unwrap()
        .run(&mut SilentReporter)
        .unwrap();

    let img = image::open(fx.out.join("alice.png")).unwrap().to_rgba8();
    assert!(img.pixels().all(|p| *p == Rgba([0, 0, 255, 255])));
}

#[test]
fn invariant_custom_zip_output() {
    let fx = Fixture::new("alice");
    let zip_path = fx.dir.path().join("bundle.zip");
    let raw = RawConfig {
        zip_output: Some(zip_path.clone()),
        ..fx.raw()
    };
    BatchDriver::new(fx.config(raw))
        .unwrap()
        .run(&mut SilentReporter)
        .unwrap();

    assert_eq!(zip_names(&zip_path), vec!["alice.jpg"]);
    assert_eq!(dir_names(&fx.out), vec!["alice.jpg"]);
}

#[test]
fn invariant_write_failure_aborts_without_archive() {
    let fx = Fixture::new("alice\nmissing-dir/bob\ncarol");
    let err = BatchDriver::new(fx.config(fx.raw()))
        .unwrap()
        .run(&mut SilentReporter)
        .unwrap_err();

    assert!(matches!(err, BatchError::Write(_)));
    assert_eq!(dir_names(&fx.out), vec!["alice.jpg"]);
}

#[test]
fn invariant_absolute_identifier_stays_in_output() {
    let fx = Fixture::new("/alice\nbob");
    let mut recorder = Recorder::default();
    let report = BatchDriver::new(fx.config(fx.raw()))
        .unwrap()
        .run(&mut recorder)
        .unwrap();

    assert_eq!(report.written[0], fx.out.join("alice.jpg"));
    assert_eq!(recorder.zipped, vec!["alice.jpg", "bob.jpg"]);
    assert_eq!(zip_names(&report.archive_path), vec!["alice.jpg", "bob.jpg"]);
    assert_eq!(
        dir_names(&fx.out),
        vec!["alice.jpg", "archive.zip", "bob.jpg"]
    );
}

#[test]
fn invariant_identifier_cannot_escape_output_dir() {
    let outside = tempfile::tempdir().unwrap();
    let target = outside.path().join("pwned");
    let fx = Fixture::new(&format!("{}\n../pwned", target.display()));

    let err = BatchDriver::new(fx.config(fx.raw()))
        .unwrap()
        .run(&mut SilentReporter)
        .unwrap_err();

    // The rooted identifier maps to a nested path under out/ that does not exist.
    match err {
        BatchError::Write(e) => assert!(e.path.starts_with(&fx.out), "{}", e.path.display()),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!outside.path().join("pwned.jpg").exists());
    assert!(!fx.dir.path().join("pwned.jpg").exists());
    assert!(dir_names(&fx.out).is_empty());
}

#[test]
fn invariant_dot_dot_identifier_written_inside_output() {
    let fx = Fixture::new("../pwned");
    BatchDriver::new(fx.config(fx.raw()))
        .unwrap()
        .run(&mut SilentReporter)
        .unwrap();

    assert!(!fx.dir.path().join("pwned.jpg").exists());
    assert_eq!(dir_names(&fx.out), vec!["archive.zip", "pwned.jpg"]);
}

#[test]
fn invariant_undecodable_layer_aborts_before_assets() {
    let fx = Fixture::new("alice\nbob");
    let layer = fx.dir.path().join("layer.png");
    fs::write(&layer, b"definitely not a png").unwrap();

    let raw = RawConfig {
        layer: Some(layer),
        ..fx.raw()
    };
    let (config, warnings) = Config::from_raw(&raw).unwrap();
    assert!(warnings.is_empty());

    let err = BatchDriver::new(config).err().unwrap();
    assert!(matches!(err, RenderError::DecodeOverlay { .. }));
    assert!(dir_names(&fx.out).is_empty());
}

#[test]
fn invariant_render_failure_mid_batch_writes_no_archive() {
    let long = "x".repeat(200);
    let fx = Fixture::new(&format!("alice\n{long}\ncarol"));
    let raw = RawConfig {
        resolution: Some(41),
        ..fx.raw()
    };

    let mut recorder = Recorder::default();
    let err = BatchDriver::new(fx.config(raw))
        .unwrap()
        .run(&mut recorder)
        .unwrap_err();

    assert!(matches!(
        err,
        BatchError::Render(RenderError::ResolutionTooSmall { resolution: 41, .. })
    ));
    assert_eq!(recorder.written, vec!["alice.jpg"]);
    assert!(recorder.zipped.is_empty());
    assert_eq!(dir_names(&fx.out), vec!["alice.jpg"]);
}

#[test]
fn invariant_config_file_overridden_by_flags() {
    let fx = Fixture::new("alice");
    let file = fx.dir.path().join("qrbatch.json");
    fs::write(&file, r#"{"url": "https://file.test", "resolution": 256, "type": "png"}"#).unwrap();

    let cli = RawConfig {
        url: None,
        resolution: Some(300),
        ..fx.raw()
    };
    let raw = RawConfig::load(&file).unwrap().merged_with(cli);
    let config = fx.config(raw);

    assert_eq!(config.base_url(), "https://file.test/");
    assert_eq!(config.resolution(), 300);
    assert_eq!(config.format(), OutputFormat::Png);
}

#[test]
fn invariant_manifest_hashes_assets() {
    let fx = Fixture::new("alice\nbob");
    let driver = BatchDriver::new(fx.config(fx.raw())).unwrap();
    let report = driver.run(&mut SilentReporter).unwrap();

    let manifest = BatchManifest::build(driver.config(), &report).unwrap();
    assert_eq!(manifest.assets.len(), 2);
    assert_eq!(manifest.assets[0].filename, "alice.jpg");
    assert_eq!(manifest.assets[0].size, report.archive.entries()[0].bytes.len());
    assert!(manifest.verify());

    let path = fx.dir.path().join("manifest.json");
    manifest.write_to(&path).unwrap();
    let mut loaded: BatchManifest =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert!(loaded.verify());

    loaded.assets[0].sha256 = "0".repeat(64);
    assert!(!loaded.verify());
}

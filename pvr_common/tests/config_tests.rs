//! Driver configuration loading from files.
//!
//! Covers file discovery errors, defaults for omitted tables, unknown-field
//! rejection and ID-table validation.

use pvr_common::config::{ConfigError, ConfigLoader, LogLevel};
use pvr_common::consts::{IMG_VENDOR_ID, RGX_DEVICE1_ID};
use pvr_common::device::PciDeviceId;
use pvr_common::driver::{DeployMode, DriverConfig, SupportFlags};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("driver.toml");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn missing_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let result = DriverConfig::load(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound)));
}

#[test]
fn full_file_loads() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        r#"
[shared]
log_level = "debug"
service_name = "pvr-rogue-1"

[driver]
name = "pvrsrv"
mode = "external"

[driver.support]
pdump = true
strict_probe = true

[[device_ids]]
vendor = 0x1010
device = 0x1cf1
"#,
    );

    let config = DriverConfig::load(&path).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.shared.log_level, LogLevel::Debug);
    assert_eq!(config.driver.name, "pvrsrv");
    assert_eq!(config.driver.mode, DeployMode::External);
    assert_eq!(
        config.support_flags(),
        SupportFlags::PDUMP | SupportFlags::STRICT_PROBE
    );
    assert_eq!(
        config.device_ids,
        vec![PciDeviceId::new(IMG_VENDOR_ID, RGX_DEVICE1_ID)]
    );
}

#[test]
fn unknown_driver_field_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        r#"
[shared]
service_name = "pvr"

[driver]
name = "pvrsrvkm"
multi_device = true
"#,
    );

    assert!(matches!(
        DriverConfig::load(&path),
        Err(ConfigError::ParseError(_))
    ));
}

#[test]
fn unknown_mode_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        r#"
[shared]
service_name = "pvr"

[driver]
mode = "hybrid"
"#,
    );

    assert!(DriverConfig::load(&path).is_err());
}

#[test]
fn duplicate_ids_load_but_fail_validation() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        r#"
[shared]
service_name = "pvr"

[[device_ids]]
vendor = 0x1010
device = 0x1cf0

[[device_ids]]
vendor = 0x1010
device = 0x1cf0
"#,
    );

    let config = DriverConfig::load(&path).unwrap();
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ValidationError(_))
    ));
}

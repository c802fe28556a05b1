//! Simulator configuration loading from files.

use pvr_common::config::{ConfigError, ConfigLoader};
use pvr_common::driver::DeployMode;
use pvr_common::error::Errno;
use pvr_core::simulation::{Fault, SimConfig, SimPlatform};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("sim.toml");
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");

    assert!(matches!(SimConfig::load(&path), Err(ConfigError::FileNotFound)));

    let (config, defaulted) = SimConfig::load_or_default(&path).unwrap();
    assert!(defaulted);
    assert!(config.validate().is_ok());
    assert_eq!(config.simulation.devices, vec![SimPlatform::rogue_device(0)]);
}

#[test]
fn platform_file_loads() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        r#"
[shared]
service_name = "pvr-sim"

[driver]
mode = "external"

[[simulation.devices]]
bus = 1
slot = 0
vendor = 0x1010
device = 0x1cf0

[[simulation.devices]]
bus = 1
slot = 1
vendor = 0x1010
device = 0x1cf1

[simulation.faults]
bind = { errno = -16, times = 1 }
"#,
    );

    let (config, defaulted) = SimConfig::load_or_default(&path).unwrap();
    assert!(!defaulted);
    assert_eq!(config.driver.driver.mode, DeployMode::External);
    assert_eq!(config.simulation.devices.len(), 2);
    assert_eq!(
        config.simulation.faults.bind,
        Some(Fault::times(Errno::EBUSY, 1))
    );

    let platform = SimPlatform::from_section(&config.simulation);
    assert_eq!(platform.devices()[1], SimPlatform::rogue_device(1));
}

#[test]
fn malformed_file_is_not_defaulted() {
    let dir = TempDir::new().unwrap();
    let path = write(
        dir.path(),
        r#"
[shared]
service_name = "pvr-sim"

[simulation.faults]
suspend = { errno = -5 }
"#,
    );

    assert!(matches!(
        SimConfig::load_or_default(&path),
        Err(ConfigError::ParseError(_))
    ));
}

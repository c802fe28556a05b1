//! Host surface: errno codes, session accounting and residency across threads.

use pvr_common::device::FileHandle;
use pvr_common::driver::DriverConfig;
use pvr_common::error::Errno;
use pvr_core::simulation::{Call, Fault, FaultPlan, SimPlatform};
use pvr_core::{HostDriver, ModulePhase, ResidencyError};
use std::sync::Arc;
use std::thread;

fn host(platform: &SimPlatform) -> HostDriver {
    HostDriver::new(&DriverConfig::default(), platform.collaborators()).unwrap()
}

#[test]
fn two_opens_one_close_keeps_module_pinned() {
    let platform = SimPlatform::single_device(FaultPlan::default());
    let host = host(&platform);
    assert_eq!(host.module_load(), 0);

    assert_eq!(host.open(FileHandle(1)), 0);
    assert_eq!(host.open(FileHandle(2)), 0);
    assert_eq!(host.release(FileHandle(1)), 0);

    assert_eq!(host.snapshot().session_count, 1);
    assert_eq!(host.module_refs(), 1);
    assert!(matches!(
        host.module_unload(),
        Err(ResidencyError::Busy { refs: 1 })
    ));
}

#[test]
fn failed_open_leaves_pin_count_unchanged() {
    let platform = SimPlatform::single_device(FaultPlan {
        open_session: Some(Fault::times(Errno::ENOMEM, 1)),
        ..FaultPlan::default()
    });
    let host = host(&platform);
    assert_eq!(host.module_load(), 0);

    assert_eq!(host.open(FileHandle(1)), Errno::ENOMEM.to_errno());
    assert_eq!(host.module_refs(), 0);
    assert_eq!(host.snapshot().session_count, 0);

    // The fault is spent; the same file can open now.
    assert_eq!(host.open(FileHandle(1)), 0);
    assert_eq!(host.module_refs(), 1);
}

#[test]
fn repeated_module_load_is_busy() {
    let platform = SimPlatform::single_device(FaultPlan::default());
    let host = host(&platform);

    assert_eq!(host.module_load(), 0);
    assert_eq!(host.module_load(), Errno::EBUSY.to_errno());
    assert_eq!(host.snapshot().phase, ModulePhase::Ready);

    let journal = &platform.journal;
    assert_eq!(journal.count(|c| *c == Call::DriverInit), 1);
    assert_eq!(journal.count(|c| *c == Call::Register), 1);
    assert_eq!(journal.count(|c| *c == Call::DeviceInit), 1);
    assert_eq!(journal.count(|c| matches!(c, Call::GlobalInit(_))), 1);

    host.module_unload().unwrap();
    assert_eq!(host.module_load(), 0);
}

#[test]
fn device_init_failure_maps_to_enodev() {
    let platform = SimPlatform::single_device(FaultPlan {
        device_init: Some(Fault::always(Errno::EIO)),
        ..FaultPlan::default()
    });
    let host = host(&platform);

    assert_eq!(host.module_load(), Errno::ENODEV.to_errno());
    assert_eq!(host.snapshot().phase, ModulePhase::Failed);

    let report = host.module_unload().unwrap();
    assert_eq!(report.len(), 4);
}

#[test]
fn hotplug_probe_and_remove_through_host() {
    let platform = SimPlatform::with_devices(Vec::new(), FaultPlan::default());
    let host = host(&platform);
    assert_eq!(host.module_load(), 0);
    assert_eq!(host.snapshot().phase, ModulePhase::Inert);

    let dev = SimPlatform::rogue_device(0);
    assert_eq!(host.probe(&dev, &dev.id()), 0);
    assert_eq!(host.probe(&dev, &dev.id()), Errno::EBUSY.to_errno());
    assert_eq!(host.snapshot().bound_device, Some(dev));

    assert_eq!(host.suspend(&dev), 0);
    assert_eq!(host.resume(&dev), 0);
    host.shutdown(&dev);
    host.remove(&dev);

    assert!(host.snapshot().bound_device.is_none());
    assert_eq!(platform.journal.count(|c| matches!(c, Call::Unbind(_))), 1);
    assert_eq!(platform.journal.count(|c| *c == Call::Shutdown(dev)), 1);
}

#[test]
fn concurrent_sessions_balance() {
    let platform = SimPlatform::single_device(FaultPlan::default());
    let host = Arc::new(host(&platform));
    assert_eq!(host.module_load(), 0);

    let handles: Vec<_> = (0..8u64)
        .map(|t| {
            let host = Arc::clone(&host);
            thread::spawn(move || {
                for i in 0..100u64 {
                    let file = FileHandle(t * 1000 + i);
                    assert_eq!(host.open(file), 0);
                    assert_eq!(host.release(file), 0);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(host.snapshot().session_count, 0);
    assert_eq!(host.module_refs(), 0);
    assert!(host.module_unload().unwrap().is_clean());
}

#[test]
fn unload_waits_for_every_session() {
    let platform = SimPlatform::single_device(FaultPlan::default());
    let host = Arc::new(host(&platform));
    assert_eq!(host.module_load(), 0);

    let files: Vec<_> = (1..=4).map(FileHandle).collect();
    for file in &files {
        assert_eq!(host.open(*file), 0);
    }

    let handles: Vec<_> = files
        .iter()
        .map(|file| {
            let host = Arc::clone(&host);
            let file = *file;
            thread::spawn(move || host.release(file))
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), 0);
    }

    assert!(host.module_unload().is_ok());
    assert_eq!(host.open(FileHandle(9)), Errno::ENOENT.to_errno());
}

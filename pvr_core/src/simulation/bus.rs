//! Simulated bus framework.
//!
//! Registration walks the configured device list in order and probes every
//! device the ID table matches, synchronously, the way a host bus does.
//! Deregistration removes every claimed device in reverse claim order.

use super::fault::{self, Fault};
use super::journal::{Call, Journal};
use pvr_common::device::{IdTable, PciDevice};
use pvr_common::error::Errno;
use pvr_common::services::{BusCallbacks, BusFramework};
use tracing::debug;

/// Bus with a fixed set of present devices.
pub struct SimBus {
    devices: Vec<PciDevice>,
    claimed: Vec<PciDevice>,
    register_fault: Option<Fault>,
    journal: Journal,
}

impl SimBus {
    /// Bus holding `devices`.
    pub fn new(devices: Vec<PciDevice>, register_fault: Option<Fault>, journal: &Journal) -> Self {
        Self {
            devices,
            claimed: Vec::new(),
            register_fault,
            journal: journal.clone(),
        }
    }

    /// Devices currently claimed by the registered driver.
    pub fn claimed(&self) -> &[PciDevice] {
        &self.claimed
    }
}

impl BusFramework for SimBus {
    fn register_driver(
        &mut self,
        name: &str,
        table: &IdTable,
        callbacks: &mut dyn BusCallbacks,
    ) -> Result<(), Errno> {
        self.journal.record(Call::Register);
        fault::check(&mut self.register_fault)?;

        for dev in &self.devices {
            let Some(id) = table.match_device(dev) else {
                debug!("bus: {} not matched by '{}'", dev, name);
                continue;
            };
            self.journal.record(Call::Probe(*dev));
            match callbacks.probe(dev, id) {
                Ok(()) => self.claimed.push(*dev),
                Err(e) => debug!("bus: '{}' declined {} ({})", name, dev, e),
            }
        }
        Ok(())
    }

    fn deregister_driver(&mut self, callbacks: &mut dyn BusCallbacks) {
        self.journal.record(Call::Deregister);
        while let Some(dev) = self.claimed.pop() {
            self.journal.record(Call::Remove(dev));
            callbacks.remove(&dev);
        }
    }
}

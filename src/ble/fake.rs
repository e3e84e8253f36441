//! Scripted in-memory transport for tests.

use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::ble::events::{DeviceRef, EventSender, GattService, LinkEvent, LinkId, SessionEvent};
use crate::ble::transport::{LinkTransport, Scanner};
use crate::ble::uuids::MEDCOOLER;
use crate::error::{Error, Result};

/// Calls observed by the fake.
#[derive(Debug, Default)]
pub(crate) struct FakeLog {
    pub scans_started: usize,
    pub scan_filters: Vec<String>,
    pub scans_stopped: usize,
    pub connects: Vec<LinkId>,
    pub closes: Vec<LinkId>,
    pub discoveries: Vec<LinkId>,
    pub reads: Vec<(LinkId, Uuid)>,
    pub open: BTreeSet<LinkId>,
    pub max_open: usize,
}

/// How the fake answers.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeScript {
    /// Devices reported as soon as a scan starts.
    pub devices: Vec<DeviceRef>,
    /// Reply to connect/discover/read immediately.
    pub auto_reply: bool,
    /// Services reported by discovery when auto-replying.
    pub services: Vec<GattService>,
    /// Payload returned by reads when auto-replying.
    pub payload: Vec<u8>,
    /// Make `start_scan` fail synchronously.
    pub fail_scan_start: bool,
}

impl FakeScript {
    /// A script where the MedCooler answers everything with `celsius`.
    pub fn medcooler(celsius: f32) -> Self {
        Self {
            devices: vec![medcooler_device()],
            auto_reply: true,
            services: vec![medcooler_service()],
            payload: celsius.to_le_bytes().to_vec(),
            fail_scan_start: false,
        }
    }
}

/// Shared-state fake implementing both transport traits.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeTransport {
    log: Arc<Mutex<FakeLog>>,
    script: Arc<Mutex<FakeScript>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(script: FakeScript) -> Self {
        Self {
            log: Arc::default(),
            script: Arc::new(Mutex::new(script)),
        }
    }

    pub fn log(&self) -> parking_lot::MutexGuard<'_, FakeLog> {
        self.log.lock()
    }
}

pub(crate) fn medcooler_device() -> DeviceRef {
    DeviceRef {
        id: "AA:BB:CC:DD:EE:01".to_string(),
        name: Some(MEDCOOLER.name.to_string()),
        rssi: Some(-60),
    }
}

pub(crate) fn other_device() -> DeviceRef {
    DeviceRef {
        id: "AA:BB:CC:DD:EE:02".to_string(),
        name: Some("Thermo".to_string()),
        rssi: Some(-40),
    }
}

pub(crate) fn medcooler_service() -> GattService {
    GattService {
        uuid: MEDCOOLER.service,
        characteristics: vec![MEDCOOLER.characteristic],
    }
}

impl Scanner for FakeTransport {
    fn start_scan(&mut self, name_filter: &str, events: &EventSender) -> Result<()> {
        let script = self.script.lock().clone();
        if script.fail_scan_start {
            return Err(Error::ScanFailed {
                reason: "adapter off".to_string(),
            });
        }

        {
            let mut log = self.log.lock();
            log.scans_started += 1;
            log.scan_filters.push(name_filter.to_string());
        }
        for device in script.devices {
            let _ = events.send(SessionEvent::DeviceFound(device));
        }
        Ok(())
    }

    fn stop_scan(&mut self) {
        self.log.lock().scans_stopped += 1;
    }
}

impl LinkTransport for FakeTransport {
    fn connect(&mut self, link: LinkId, _device: &DeviceRef, events: &EventSender) -> Result<()> {
        {
            let mut log = self.log.lock();
            log.connects.push(link);
            log.open.insert(link);
            log.max_open = log.max_open.max(log.open.len());
        }
        if self.script.lock().auto_reply {
            let _ = events.send(SessionEvent::link(link, LinkEvent::Connected));
        }
        Ok(())
    }

    fn discover_services(&mut self, link: LinkId, events: &EventSender) -> Result<()> {
        self.log.lock().discoveries.push(link);
        let script = self.script.lock();
        if script.auto_reply {
            let _ = events.send(SessionEvent::link(
                link,
                LinkEvent::ServicesFound(script.services.clone()),
            ));
        }
        Ok(())
    }

    fn read_characteristic(
        &mut self,
        link: LinkId,
        read: u64,
        characteristic: Uuid,
        events: &EventSender,
    ) -> Result<()> {
        self.log.lock().reads.push((link, characteristic));
        let script = self.script.lock();
        if script.auto_reply {
            let _ = events.send(SessionEvent::link(
                link,
                LinkEvent::ReadResult {
                    read,
                    data: script.payload.clone(),
                },
            ));
        }
        Ok(())
    }

    fn close(&mut self, link: LinkId) {
        let mut log = self.log.lock();
        log.closes.push(link);
        log.open.remove(&link);
    }
}

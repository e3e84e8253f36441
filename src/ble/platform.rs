//! `btleplug` implementation of the scanner and link transport.
//!
//! Every operation runs on a spawned task and reports back through the
//! session event queue. Tasks belonging to a link are aborted when the link
//! is closed, so nothing from a closed link is posted afterwards.

use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::stream::StreamExt;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::ble::events::{DeviceRef, EventSender, GattService, LinkEvent, LinkId, SessionEvent};
use crate::ble::scheduler::DEFAULT_POLL_INTERVAL;
use crate::ble::transport::{LinkTransport, Scanner};
use crate::error::{Error, Result};

/// A running scan task and the signal that ends it.
struct ScanWorker {
    task: JoinHandle<()>,
    stop: oneshot::Sender<()>,
}

impl ScanWorker {
    /// Spawn `run` once `previous` (a stopping scan, if any) has finished.
    ///
    /// `run` receives the stop signal and is expected to stop the platform
    /// scan itself before returning, so a stop never lands after the next
    /// start.
    fn spawn<F, Fut>(previous: Option<JoinHandle<()>>, run: F) -> Self
    where
        F: FnOnce(oneshot::Receiver<()>) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop, stop_rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            run(stop_rx).await;
        });
        Self { task, stop }
    }

    /// Signal the task to stop and hand back its handle.
    fn stop(self) -> JoinHandle<()> {
        let _ = self.stop.send(());
        self.task
    }
}

/// An open (or opening) link and the tasks working on it.
struct LinkHandle<P = Peripheral> {
    peripheral: P,
    tasks: Vec<JoinHandle<()>>,
}

impl<P> LinkHandle<P> {
    fn track(&mut self, task: JoinHandle<()>) {
        self.tasks.retain(|t| !t.is_finished());
        self.tasks.push(task);
    }

    /// Abort every task on the link and return the peripheral, which the
    /// caller still has to disconnect.
    fn abort(self) -> P {
        for task in self.tasks {
            task.abort();
        }
        self.peripheral
    }
}

/// Scanner and link transport backed by the system Bluetooth adapter.
pub struct BtleplugTransport {
    /// The BLE adapter to use.
    adapter: Adapter,
    /// Peripherals seen by the scanner, by platform identifier.
    discovered: Arc<RwLock<HashMap<String, Peripheral>>>,
    /// The running scan, if any.
    scan: Option<ScanWorker>,
    /// A scan that was told to stop and may still be stopping.
    stopping: Option<JoinHandle<()>>,
    /// Links handed out by the session.
    links: HashMap<LinkId, LinkHandle>,
    /// Longest a characteristic read may take.
    read_timeout: Duration,
}

impl BtleplugTransport {
    /// Use the first Bluetooth adapter on the system.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::BluetoothUnavailable)?;

        let adapters = manager.adapters().await.map_err(Error::Bluetooth)?;

        let adapter = adapters
            .into_iter()
            .next()
            .ok_or(Error::BluetoothUnavailable)?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Ok(Self::with_adapter(adapter))
    }

    /// Use a specific adapter.
    pub fn with_adapter(adapter: Adapter) -> Self {
        Self {
            adapter,
            discovered: Arc::new(RwLock::new(HashMap::new())),
            scan: None,
            stopping: None,
            links: HashMap::new(),
            read_timeout: DEFAULT_POLL_INTERVAL,
        }
    }

    /// A second transport on the same adapter that shares this one's
    /// discovered peripherals.
    ///
    /// Use one as the [`Scanner`] and the other as the [`LinkTransport`];
    /// the link side can then connect to anything the scan side found.
    pub fn sibling(&self) -> Self {
        Self {
            adapter: self.adapter.clone(),
            discovered: self.discovered.clone(),
            scan: None,
            stopping: None,
            links: HashMap::new(),
            read_timeout: self.read_timeout,
        }
    }

    /// Give up on characteristic reads after `timeout`.
    ///
    /// Should not exceed the poll interval, so a hung read is reported
    /// before the next one is issued.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Get the underlying adapter.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// Check if currently scanning.
    pub fn is_scanning(&self) -> bool {
        self.scan.is_some()
    }

    /// Run `task` on the current runtime, if there is one.
    fn spawn_detached<F>(what: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(task);
            }
            Err(_) => debug!("No runtime, skipping {}", what),
        }
    }

    fn link_mut(&mut self, link: LinkId) -> Result<&mut LinkHandle> {
        self.links.get_mut(&link).ok_or(Error::NotConnected)
    }

    /// Resolve a central event to a device matching `name_filter`.
    async fn process_peripheral(
        adapter: &Adapter,
        id: &PeripheralId,
        name_filter: &str,
        discovered: &Arc<RwLock<HashMap<String, Peripheral>>>,
    ) -> Option<DeviceRef> {
        let peripheral = match adapter.peripheral(id).await {
            Ok(p) => p,
            Err(e) => {
                trace!("Failed to get peripheral: {}", e);
                return None;
            }
        };

        let properties = match peripheral.properties().await {
            Ok(Some(p)) => p,
            _ => return None,
        };

        if properties.local_name.as_deref() != Some(name_filter) {
            return None;
        }

        let identifier = id.to_string();
        discovered.write().insert(identifier.clone(), peripheral);

        Some(DeviceRef {
            id: identifier,
            name: properties.local_name,
            rssi: properties.rssi,
        })
    }
}

impl Scanner for BtleplugTransport {
    fn start_scan(&mut self, name_filter: &str, events: &EventSender) -> Result<()> {
        if self.scan.is_some() {
            debug!("Already scanning, ignoring start request");
            return Ok(());
        }

        let adapter = self.adapter.clone();
        let discovered = self.discovered.clone();
        let name_filter = name_filter.to_string();
        let events = events.clone();

        self.scan = Some(ScanWorker::spawn(
            self.stopping.take(),
            move |mut stop| async move {
                let mut central = match adapter.events().await {
                    Ok(stream) => stream,
                    Err(e) => {
                        error!("Failed to get adapter events: {}", e);
                        let _ = events.send(SessionEvent::ScanFailed {
                            reason: e.to_string(),
                        });
                        return;
                    }
                };

                if let Err(e) = adapter.start_scan(ScanFilter::default()).await {
                    error!("Failed to start BLE scan: {}", e);
                    let _ = events.send(SessionEvent::ScanFailed {
                        reason: e.to_string(),
                    });
                    return;
                }

                info!("BLE scan started for {}", name_filter);

                loop {
                    let event = tokio::select! {
                        biased;
                        _ = &mut stop => break,
                        event = central.next() => match event {
                            Some(event) => event,
                            None => break,
                        },
                    };

                    let id = match event {
                        CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                        _ => continue,
                    };

                    if let Some(device) =
                        Self::process_peripheral(&adapter, &id, &name_filter, &discovered).await
                    {
                        if events.send(SessionEvent::DeviceFound(device)).is_err() {
                            break;
                        }
                    }
                }

                if let Err(e) = adapter.stop_scan().await {
                    warn!("Failed to stop BLE scan: {}", e);
                }
                debug!("Scan event loop ended");
            },
        ));

        Ok(())
    }

    fn stop_scan(&mut self) {
        let Some(scan) = self.scan.take() else {
            return;
        };

        info!("Stopping BLE scan");
        self.stopping = Some(scan.stop());
    }
}

impl LinkTransport for BtleplugTransport {
    fn connect(&mut self, link: LinkId, device: &DeviceRef, events: &EventSender) -> Result<()> {
        let peripheral = self
            .discovered
            .read()
            .get(&device.id)
            .cloned()
            .ok_or_else(|| Error::ConnectionFailed {
                reason: format!("unknown device {}", device.id),
            })?;

        let adapter = self.adapter.clone();
        let target = peripheral.clone();
        let events = events.clone();

        let task = tokio::spawn(async move {
            // Listen before connecting so a drop right after connect is seen.
            let mut central = match adapter.events().await {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = events.send(SessionEvent::link(
                        link,
                        LinkEvent::ConnectFailed {
                            reason: e.to_string(),
                        },
                    ));
                    return;
                }
            };

            if let Err(e) = target.connect().await {
                let _ = events.send(SessionEvent::link(
                    link,
                    LinkEvent::ConnectFailed {
                        reason: e.to_string(),
                    },
                ));
                return;
            }

            if events
                .send(SessionEvent::link(link, LinkEvent::Connected))
                .is_err()
            {
                return;
            }

            let id = target.id();
            while let Some(event) = central.next().await {
                if let CentralEvent::DeviceDisconnected(gone) = event {
                    if gone == id {
                        let _ = events.send(SessionEvent::link(link, LinkEvent::Disconnected));
                        break;
                    }
                }
            }
        });

        self.links.insert(
            link,
            LinkHandle {
                peripheral,
                tasks: vec![task],
            },
        );

        Ok(())
    }

    fn discover_services(&mut self, link: LinkId, events: &EventSender) -> Result<()> {
        let handle = self.link_mut(link)?;
        let peripheral = handle.peripheral.clone();
        let events = events.clone();

        handle.track(tokio::spawn(async move {
            let event = match peripheral.discover_services().await {
                Ok(()) => {
                    let services = peripheral
                        .services()
                        .into_iter()
                        .map(|service| {
                            debug!("Found service {}", service.uuid);
                            GattService {
                                uuid: service.uuid,
                                characteristics: service
                                    .characteristics
                                    .iter()
                                    .map(|c| c.uuid)
                                    .collect(),
                            }
                        })
                        .collect();
                    LinkEvent::ServicesFound(services)
                }
                Err(e) => LinkEvent::DiscoveryFailed {
                    reason: e.to_string(),
                },
            };
            let _ = events.send(SessionEvent::link(link, event));
        }));

        Ok(())
    }

    fn read_characteristic(
        &mut self,
        link: LinkId,
        read: u64,
        characteristic: Uuid,
        events: &EventSender,
    ) -> Result<()> {
        let timeout = self.read_timeout;
        let handle = self.link_mut(link)?;
        let peripheral = handle.peripheral.clone();
        let events = events.clone();

        handle.track(tokio::spawn(async move {
            let found = peripheral
                .characteristics()
                .into_iter()
                .find(|c| c.uuid == characteristic);

            let event = match found {
                Some(c) => match tokio::time::timeout(timeout, peripheral.read(&c)).await {
                    Ok(Ok(data)) => {
                        trace!("Read {} bytes from characteristic {}", data.len(), characteristic);
                        LinkEvent::ReadResult { read, data }
                    }
                    Ok(Err(e)) => LinkEvent::ReadFailed {
                        read,
                        reason: e.to_string(),
                    },
                    Err(_) => LinkEvent::ReadFailed {
                        read,
                        reason: format!("read timed out after {:?}", timeout),
                    },
                },
                None => LinkEvent::ReadFailed {
                    read,
                    reason: format!("characteristic {} not found", characteristic),
                },
            };
            let _ = events.send(SessionEvent::link(link, event));
        }));

        Ok(())
    }

    fn close(&mut self, link: LinkId) {
        let Some(handle) = self.links.remove(&link) else {
            return;
        };

        debug!("Releasing {}", link);
        let peripheral = handle.abort();

        // The platform may still complete an aborted connect, so always
        // disconnect rather than checking the link state first.
        Self::spawn_detached("disconnect", async move {
            if let Err(e) = peripheral.disconnect().await {
                debug!("Disconnect on release: {}", e);
            }
        });
    }
}

impl Drop for BtleplugTransport {
    fn drop(&mut self) {
        if let Some(scan) = self.scan.take() {
            scan.stop();
        }
        for (_, link) in self.links.drain() {
            link.abort();
        }
    }
}

//! Orchestrator wiring the device session to conversion, alarms and sinks.
//!
//! Readings flow one way: session -> decode -> data sink and alerter ->
//! alert sink. Control flows the other way through a [`MonitorHandle`]:
//! start scanning, switch display unit, disconnect, shut down.

use std::ops::ControlFlow;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::ble::{
    event_channel, ConnectionEvent, DeviceSession, EventReceiver, LinkTransport, Scanner,
    SessionEvent,
};
use crate::config::MonitorConfig;
use crate::data::{
    decode_temperature, AlertEvent, AlertState, DisplayPreference, RawReading, Temperature,
    TemperatureUnit, ThresholdAlerter,
};
use crate::error::{Error, Result};
use crate::sink::{AlertSink, DataSink};

/// Text shown before the first reading arrives.
pub const NO_DATA_TEXT: &str = "No data";

/// Request sent to a running [`Orchestrator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorCommand {
    /// Begin scanning for the peripheral.
    StartScan,
    /// Switch between Celsius and Fahrenheit.
    ToggleUnit,
    /// Select a display unit.
    SetUnit(TemperatureUnit),
    /// Drop the connection or cancel the scan.
    Disconnect,
    /// Disconnect and stop the run loop.
    Shutdown,
}

/// Cloneable, fire-and-forget control handle for an [`Orchestrator`].
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    tx: mpsc::UnboundedSender<MonitorCommand>,
}

impl MonitorHandle {
    /// Queue a command.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] once the orchestrator has stopped.
    pub fn send(&self, command: MonitorCommand) -> Result<()> {
        self.tx.send(command).map_err(|_| Error::ChannelClosed)
    }

    /// Begin scanning for the peripheral.
    pub fn start_scan(&self) -> Result<()> {
        self.send(MonitorCommand::StartScan)
    }

    /// Switch between Celsius and Fahrenheit.
    pub fn toggle_unit(&self) -> Result<()> {
        self.send(MonitorCommand::ToggleUnit)
    }

    /// Select a display unit.
    pub fn set_unit(&self, unit: TemperatureUnit) -> Result<()> {
        self.send(MonitorCommand::SetUnit(unit))
    }

    /// Drop the connection or cancel the scan.
    pub fn disconnect(&self) -> Result<()> {
        self.send(MonitorCommand::Disconnect)
    }

    /// Disconnect and stop the run loop.
    pub fn shutdown(&self) -> Result<()> {
        self.send(MonitorCommand::Shutdown)
    }
}

/// Owns the session, alerter and display preference, and serializes all
/// events and commands through one loop.
pub struct Orchestrator<S, L, A, D>
where
    S: Scanner,
    L: LinkTransport,
    A: AlertSink,
    D: DataSink,
{
    session: DeviceSession<S, L>,
    alerter: ThresholdAlerter,
    preference: DisplayPreference,
    alert_sink: A,
    data_sink: D,
    events: EventReceiver,
    commands: mpsc::UnboundedReceiver<MonitorCommand>,
    last_reading: Option<Temperature>,
}

impl<S, L, A, D> Orchestrator<S, L, A, D>
where
    S: Scanner,
    L: LinkTransport,
    A: AlertSink,
    D: DataSink,
{
    /// Wire up a monitor.
    ///
    /// # Errors
    ///
    /// Returns an error if `config` does not validate.
    pub fn new(
        scanner: S,
        transport: L,
        alert_sink: A,
        data_sink: D,
        config: MonitorConfig,
    ) -> Result<(Self, MonitorHandle)> {
        config.validate()?;

        let (event_tx, events) = event_channel();
        let (command_tx, commands) = mpsc::unbounded_channel();

        let orchestrator = Self {
            session: DeviceSession::new(scanner, transport, &config, event_tx),
            alerter: ThresholdAlerter::new(config.alert),
            preference: DisplayPreference::default(),
            alert_sink,
            data_sink,
            events,
            commands,
            last_reading: None,
        };

        Ok((orchestrator, MonitorHandle { tx: command_tx }))
    }

    /// The device session.
    pub fn session(&self) -> &DeviceSession<S, L> {
        &self.session
    }

    /// Subscribe to connection state changes.
    pub fn subscribe_connection(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.session.subscribe()
    }

    /// Current display preference.
    pub fn preference(&self) -> DisplayPreference {
        self.preference
    }

    /// Current alarm debouncer state.
    pub fn alert_state(&self) -> AlertState {
        self.alerter.state()
    }

    /// Most recent decoded reading.
    pub fn last_reading(&self) -> Option<Temperature> {
        self.last_reading
    }

    /// Display text for the most recent reading, or [`NO_DATA_TEXT`].
    pub fn display_text(&self) -> String {
        self.last_reading
            .map(|t| t.display(self.preference.unit()))
            .unwrap_or_else(|| NO_DATA_TEXT.to_string())
    }

    /// Process commands and session events until shut down.
    ///
    /// The session is disconnected before this returns.
    pub async fn run(mut self) {
        info!("Monitor started");

        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(command) => {
                        if self.handle_command(command).is_break() {
                            break;
                        }
                    }
                    None => {
                        debug!("All monitor handles dropped");
                        break;
                    }
                },
                Some(event) = self.events.recv() => self.handle_event(event),
            }
        }

        self.session.disconnect();
        info!("Monitor stopped");
    }

    /// Apply one command.
    pub fn handle_command(&mut self, command: MonitorCommand) -> ControlFlow<()> {
        debug!("Command: {:?}", command);

        match command {
            MonitorCommand::StartScan => {
                if let Err(e) = self.session.start_scan() {
                    warn!("Scan not started: {}", e);
                }
            }
            MonitorCommand::ToggleUnit => {
                let unit = self.preference.toggle();
                info!("Display unit set to {}", unit);
            }
            MonitorCommand::SetUnit(unit) => {
                self.preference = DisplayPreference::new(unit);
                info!("Display unit set to {}", unit);
            }
            MonitorCommand::Disconnect => self.session.disconnect(),
            MonitorCommand::Shutdown => return ControlFlow::Break(()),
        }

        ControlFlow::Continue(())
    }

    /// Apply one session event, processing any reading it yields.
    pub fn handle_event(&mut self, event: SessionEvent) {
        if let Some(raw) = self.session.handle(event) {
            self.process_reading(raw);
        }
    }

    /// Decode a reading, publish it, and run it through the alerter.
    ///
    /// Undecodable payloads are dropped. Returns the alert raised, if any.
    pub fn process_reading(&mut self, raw: RawReading) -> Option<AlertEvent> {
        let temperature = match decode_temperature(&raw.data, raw.received_at) {
            Ok(t) => t,
            Err(e) => {
                debug!("Dropping reading: {}", e);
                return None;
            }
        };

        let unit = self.preference.unit();
        debug!("Temperature: {}", temperature.display(unit));

        self.last_reading = Some(temperature);
        self.data_sink.publish(temperature, self.preference);

        let alert = self.alerter.handle_reading(
            temperature.celsius,
            temperature.timestamp.timestamp_millis(),
            unit,
        )?;

        self.alert_sink.deliver(alert);
        Some(alert)
    }
}

impl<S, L, A, D> std::fmt::Debug for Orchestrator<S, L, A, D>
where
    S: Scanner,
    L: LinkTransport,
    A: AlertSink,
    D: DataSink,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("session", &self.session)
            .field("preference", &self.preference)
            .field("alert_state", &self.alerter.state())
            .finish()
    }
}

//! Periodic characteristic polling.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use crate::ble::events::{EventSender, SessionEvent};

/// Default interval between characteristic reads.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Posts a [`SessionEvent::PollTick`] every interval while running.
///
/// The first tick is sent immediately on [`start`](Self::start). After
/// [`stop`](Self::stop) returns, [`is_current`](Self::is_current) rejects
/// every tick of the stopped schedule, including ones already queued.
#[derive(Debug)]
pub struct PollScheduler {
    interval: Duration,
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl PollScheduler {
    /// Create a stopped scheduler.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            generation: 0,
            handle: None,
        }
    }

    /// Poll interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start ticking. Does nothing if already running.
    pub fn start(&mut self, events: &EventSender) {
        if self.handle.is_some() {
            debug!("Poll scheduler already running, ignoring start request");
            return;
        }

        self.generation += 1;
        let generation = self.generation;
        let period = self.interval;
        let events = events.clone();

        debug!("Starting poll scheduler every {:?}", period);

        self.handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                trace!("Poll tick (generation {})", generation);
                if events.send(SessionEvent::PollTick { generation }).is_err() {
                    break;
                }
            }
        }));
    }

    /// Stop ticking.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Poll scheduler stopped");
        }
        self.generation += 1;
    }

    /// Whether the scheduler is running.
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Whether a tick from `generation` belongs to the running schedule.
    pub fn is_current(&self, generation: u64) -> bool {
        self.handle.is_some() && generation == self.generation
    }
}

impl Default for PollScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::events::event_channel;
    use tokio::time::Instant;

    fn tick_generation(event: Option<SessionEvent>) -> u64 {
        match event {
            Some(SessionEvent::PollTick { generation }) => generation,
            other => panic!("expected poll tick, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_is_immediate() {
        let (tx, mut rx) = event_channel();
        let mut scheduler = PollScheduler::default();
        let started = Instant::now();
        scheduler.start(&tx);

        let generation = tick_generation(rx.recv().await);
        assert!(scheduler.is_current(generation));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_follow_interval() {
        let (tx, mut rx) = event_channel();
        let mut scheduler = PollScheduler::default();
        let started = Instant::now();
        scheduler.start(&tx);

        tick_generation(rx.recv().await);
        tick_generation(rx.recv().await);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
        tick_generation(rx.recv().await);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_reentrant() {
        let (tx, mut rx) = event_channel();
        let mut scheduler = PollScheduler::default();
        scheduler.start(&tx);
        let generation = tick_generation(rx.recv().await);

        scheduler.start(&tx);
        assert!(scheduler.is_current(generation));

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        // One tick at t=2s from the only running schedule.
        assert_eq!(tick_generation(rx.try_recv().ok()), generation);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_rejects_queued_ticks() {
        let (tx, mut rx) = event_channel();
        let mut scheduler = PollScheduler::default();
        scheduler.start(&tx);
        tokio::time::sleep(Duration::from_millis(10)).await;

        scheduler.stop();
        let queued = tick_generation(rx.try_recv().ok());
        assert!(!scheduler.is_current(queued));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_uses_new_generation() {
        let (tx, mut rx) = event_channel();
        let mut scheduler = PollScheduler::default();
        scheduler.start(&tx);
        let first = tick_generation(rx.recv().await);
        scheduler.stop();
        scheduler.start(&tx);
        let second = tick_generation(rx.recv().await);

        assert_ne!(first, second);
        assert!(!scheduler.is_current(first));
        assert!(scheduler.is_current(second));
    }
}

//! Cancellable timers that post into the session event queue.
//!
//! A timer never calls back into the session directly. It sends an event
//! tagged with the generation it was armed under; the session drops any
//! event whose generation is no longer current, so a tick that was already
//! queued when the timer was cancelled has no effect.

use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::ble::events::{EventSender, SessionEvent};

/// One-shot deadline used for the scan timeout.
#[derive(Debug, Default)]
pub struct Deadline {
    generation: u64,
    handle: Option<JoinHandle<()>>,
}

impl Deadline {
    /// Create an unarmed deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the deadline, replacing any pending one.
    ///
    /// After `after` elapses a [`SessionEvent::ScanTimeout`] carrying the new
    /// generation is sent.
    pub fn arm(&mut self, after: Duration, events: &EventSender) -> u64 {
        self.cancel();

        let generation = self.generation;
        let events = events.clone();
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            trace!("Scan deadline {} expired", generation);
            let _ = events.send(SessionEvent::ScanTimeout { generation });
        }));

        generation
    }

    /// Cancel the pending deadline, if any.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.generation += 1;
    }

    /// Whether an event from `generation` still belongs to the armed deadline.
    pub fn is_current(&self, generation: u64) -> bool {
        self.handle.is_some() && generation == self.generation
    }

    /// Whether the deadline is armed.
    pub fn is_armed(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for Deadline {
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

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires_once() {
        let (tx, mut rx) = event_channel();
        let mut deadline = Deadline::new();
        let generation = deadline.arm(Duration::from_secs(10), &tx);

        assert_eq!(
            rx.recv().await,
            Some(SessionEvent::ScanTimeout { generation })
        );
        assert!(deadline.is_current(generation));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_deadline_never_fires() {
        let (tx, mut rx) = event_channel();
        let mut deadline = Deadline::new();
        let generation = deadline.arm(Duration::from_secs(10), &tx);
        deadline.cancel();

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(rx.try_recv().is_err());
        assert!(!deadline.is_current(generation));
        assert!(!deadline.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_invalidates_previous_generation() {
        let (tx, _rx) = event_channel();
        let mut deadline = Deadline::new();
        let first = deadline.arm(Duration::from_secs(10), &tx);
        let second = deadline.arm(Duration::from_secs(10), &tx);

        assert_ne!(first, second);
        assert!(!deadline.is_current(first));
        assert!(deadline.is_current(second));
    }
}

//! Heartbeat transports
//!
//! The FT state machine only needs a way to publish bytes on a named channel
//! and to be handed the bytes others publish. [`LoopbackTransport`] does this
//! in-process and backs the tests and the demo runner.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::core::sync::{handle_rwlock_read, handle_rwlock_write};
use crate::ft::error::{FtError, FtResult};
use crate::ft::state::FtMechanism;

/// Receives every payload published on a subscribed channel
pub type HeartbeatSink = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Handle returned by [`FtTransport::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Heartbeat exchange provided to FT members
///
/// Sinks may be called from any thread, including the publisher's, so they
/// must not block.
pub trait FtTransport: Send + Sync {
    fn name(&self) -> &str;

    /// Whether members using `mechanism` can run over this transport
    fn supports(&self, mechanism: FtMechanism) -> bool;

    fn subscribe(&self, channel: &str, sink: HeartbeatSink) -> FtResult<SubscriptionId>;

    fn unsubscribe(&self, id: SubscriptionId) -> FtResult<()>;

    fn publish(&self, channel: &str, payload: &[u8]) -> FtResult<()>;
}

/// In-process transport delivering synchronously to every subscriber
pub struct LoopbackTransport {
    name: String,
    mechanisms: Vec<FtMechanism>,
    subscribers: RwLock<HashMap<String, Vec<(SubscriptionId, HeartbeatSink)>>>,
    next_id: AtomicU64,
    connected: AtomicBool,
}

impl LoopbackTransport {
    /// Transport supporting every mechanism
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Self::with_mechanisms(name, &[FtMechanism::Multicast, FtMechanism::Bridge])
    }

    pub fn with_mechanisms(name: impl Into<String>, mechanisms: &[FtMechanism]) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            mechanisms: mechanisms.to_vec(),
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            connected: AtomicBool::new(true),
        })
    }

    /// Simulate a network partition; while disconnected, publishes are dropped
    pub fn set_connected(&self, connected: bool) {
        log::debug!(
            "Loopback transport '{}' {}",
            self.name,
            if connected { "connected" } else { "disconnected" }
        );
        self.connected.store(connected, Ordering::Release);
    }

    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.subscribers
            .read()
            .map(|subs| subs.get(channel).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

impl FtTransport for LoopbackTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn supports(&self, mechanism: FtMechanism) -> bool {
        self.mechanisms.contains(&mechanism)
    }

    fn subscribe(&self, channel: &str, sink: HeartbeatSink) -> FtResult<SubscriptionId> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        handle_rwlock_write(self.subscribers.write(), FtError::lock_poisoned)?
            .entry(channel.to_string())
            .or_default()
            .push((id, sink));
        log::trace!("Loopback '{}': subscribed {:?} to '{}'", self.name, id, channel);
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> FtResult<()> {
        let mut subscribers = handle_rwlock_write(self.subscribers.write(), FtError::lock_poisoned)?;
        for sinks in subscribers.values_mut() {
            sinks.retain(|(existing, _)| *existing != id);
        }
        subscribers.retain(|_, sinks| !sinks.is_empty());
        Ok(())
    }

    fn publish(&self, channel: &str, payload: &[u8]) -> FtResult<()> {
        if !self.connected.load(Ordering::Acquire) {
            log::trace!("Loopback '{}': dropped publish on '{}'", self.name, channel);
            return Ok(());
        }

        // deliver without holding the subscriber lock so sinks may resubscribe
        let sinks: Vec<HeartbeatSink> =
            handle_rwlock_read(self.subscribers.read(), FtError::lock_poisoned)?
                .get(channel)
                .map(|sinks| sinks.iter().map(|(_, sink)| Arc::clone(sink)).collect())
                .unwrap_or_default();

        for sink in sinks {
            sink(payload);
        }
        Ok(())
    }
}

impl std::fmt::Debug for LoopbackTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackTransport")
            .field("name", &self.name)
            .field("mechanisms", &self.mechanisms)
            .finish_non_exhaustive()
    }
}

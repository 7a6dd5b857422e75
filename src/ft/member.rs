//! FtMember - weighted active/standby election over heartbeats
//!
//! Each member of a group publishes heartbeats carrying its credentials and
//! listens for everyone else's. A member goes `Standby` as soon as it hears
//! a live peer with better credentials, and `Active` when its timeout timer
//! fires (or its weight is raised) with no better peer alive.
//!
//! All heartbeat handling, timer work and state-change callbacks run as
//! events on the member's bound [`EventQueue`], so callbacks for one member
//! arrive on that queue's dispatch thread in transition order. Public calls
//! such as [`FtMember::activate`] or [`FtMember::set_weight`] never invoke the
//! callback themselves; they enqueue the work.
//!
//! Every activation starts a new epoch. Queued member events carry the
//! epoch they were created in and are ignored once it has passed, so nothing
//! scheduled before a `deactivate()` or `destroy()` can fire afterwards.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use crate::core::sync::handle_mutex_poison;
use crate::core::version::ft_protocol_version;
use crate::ft::error::{FtError, FtResult};
use crate::ft::heartbeat::{Credentials, Heartbeat};
use crate::ft::instance::{generate_instance_id, local_ip, local_pid};
use crate::ft::state::{FtMechanism, FtState};
use crate::ft::transport::{FtTransport, HeartbeatSink, SubscriptionId};
use crate::queue::{EventKind, EventQueue, QueueEvent, QueueObjectGuard, Timer};

/// Largest accepted member weight
pub const MAX_WEIGHT: u32 = i32::MAX as u32;
pub const DEFAULT_WEIGHT: u32 = 50;
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);
pub const DEFAULT_TIMEOUT_INTERVAL: Duration = Duration::from_secs(6);

/// Passed to the state-change callback for every transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtStateChange {
    pub group_name: String,
    pub instance_id: String,
    pub previous: FtState,
    pub state: FtState,
}

pub type FtStateCallback = Box<dyn FnMut(&FtStateChange) + Send>;

/// Everything a member is bound to by [`FtMember::setup`]
#[derive(Clone)]
pub struct FtSetup {
    pub mechanism: FtMechanism,
    pub queue: Arc<EventQueue>,
    pub transport: Arc<dyn FtTransport>,
    pub group_name: String,
    pub weight: u32,
    pub heartbeat_interval: Duration,
    pub timeout_interval: Duration,
}

impl FtSetup {
    pub fn new(
        queue: Arc<EventQueue>,
        transport: Arc<dyn FtTransport>,
        group_name: impl Into<String>,
    ) -> Self {
        Self {
            mechanism: FtMechanism::default(),
            queue,
            transport,
            group_name: group_name.into(),
            weight: DEFAULT_WEIGHT,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            timeout_interval: DEFAULT_TIMEOUT_INTERVAL,
        }
    }

    pub fn with_mechanism(mut self, mechanism: FtMechanism) -> Self {
        self.mechanism = mechanism;
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_intervals(mut self, heartbeat: Duration, timeout: Duration) -> Self {
        self.heartbeat_interval = heartbeat;
        self.timeout_interval = timeout;
        self
    }

    fn validate(&self) -> FtResult<()> {
        if self.group_name.is_empty() {
            return Err(FtError::EmptyGroupName);
        }
        check_weight(self.weight)?;
        if self.heartbeat_interval.is_zero() {
            return Err(FtError::InvalidInterval { what: "heartbeat" });
        }
        if self.timeout_interval.is_zero() {
            return Err(FtError::InvalidInterval { what: "timeout" });
        }
        if !self.transport.supports(self.mechanism) {
            return Err(FtError::Unsupported {
                mechanism: self.mechanism,
                transport: self.transport.name().to_string(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for FtSetup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FtSetup")
            .field("mechanism", &self.mechanism)
            .field("queue", &self.queue.name())
            .field("transport", &self.transport.name())
            .field("group_name", &self.group_name)
            .field("weight", &self.weight)
            .field("heartbeat_interval", &self.heartbeat_interval)
            .field("timeout_interval", &self.timeout_interval)
            .finish()
    }
}

fn check_weight(weight: u32) -> FtResult<()> {
    if weight > MAX_WEIGHT {
        return Err(FtError::WeightOutOfRange {
            weight,
            max: MAX_WEIGHT,
        });
    }
    Ok(())
}

struct Binding {
    mechanism: FtMechanism,
    queue: Arc<EventQueue>,
    transport: Arc<dyn FtTransport>,
    group_name: String,
    channel: String,
    heartbeat_interval: Duration,
    timeout_interval: Duration,
    default_instance_id: String,
    _registration: QueueObjectGuard,
}

/// Resources held only while the member is activated
struct Monitoring {
    transport: Arc<dyn FtTransport>,
    subscription: SubscriptionId,
    heartbeat_timer: Timer,
    timeout_timer: Timer,
    activated_at: Instant,
}

impl Drop for Monitoring {
    fn drop(&mut self) {
        if let Err(e) = self.transport.unsubscribe(self.subscription) {
            log::warn!("Failed to unsubscribe FT heartbeats: {}", e);
        }
    }
}

struct PeerRecord {
    credentials: Credentials,
    last_seen: Instant,
}

struct MemberInner {
    binding: Option<Binding>,
    explicit_instance_id: Option<String>,
    weight: u32,
    state: FtState,
    incarnation: u32,
    next_incarnation: u32,
    peers: HashMap<String, PeerRecord>,
    epoch: u64,
    monitoring: Option<Monitoring>,
    destroyed: bool,
}

impl MemberInner {
    fn binding(&self) -> FtResult<&Binding> {
        if self.destroyed {
            return Err(FtError::Destroyed);
        }
        self.binding.as_ref().ok_or(FtError::NotSetUp)
    }

    fn instance_id(&self) -> Option<String> {
        self.explicit_instance_id
            .clone()
            .or_else(|| self.binding.as_ref().map(|b| b.default_instance_id.clone()))
    }

    fn is_current(&self, epoch: u64) -> bool {
        !self.destroyed && self.epoch == epoch && self.monitoring.is_some()
    }

    fn credentials(&self) -> Credentials {
        Credentials {
            weight: self.weight,
            incarnation: self.incarnation,
            ip: local_ip(),
            pid: local_pid(),
            instance_id: self.instance_id().unwrap_or_default(),
        }
    }

    fn forget_stale_peers(&mut self, timeout: Duration) {
        let now = Instant::now();
        self.peers.retain(|id, peer| {
            let live = now.duration_since(peer.last_seen) <= timeout;
            if !live {
                log::debug!("FT peer '{}' timed out", id);
            }
            live
        });
    }

    fn better_peer_alive(&self) -> bool {
        let mine = self.credentials();
        self.peers.values().any(|peer| peer.credentials.beats(&mine))
    }

    fn heartbeat(&self) -> FtResult<Announcement> {
        let binding = self.binding()?;
        let heartbeat = Heartbeat {
            version: ft_protocol_version(),
            group_name: binding.group_name.clone(),
            instance_id: self.instance_id().unwrap_or_default(),
            weight: self.weight,
            incarnation: self.incarnation,
            ip: local_ip(),
            pid: local_pid(),
            primary: self.state == FtState::Active,
        };
        Ok(Announcement {
            transport: Arc::clone(&binding.transport),
            channel: binding.channel.clone(),
            payload: heartbeat.to_bytes()?,
        })
    }

    /// Move to `target`, applying the side effects of entering it
    fn enter(&mut self, target: FtState) -> FtResult<Outcome> {
        if self.state == target {
            log::trace!("FT: no state change ({})", target);
            return Ok(Outcome::default());
        }

        let previous = self.state;
        self.state = target;
        let mut outcome = Outcome::default();

        if let Some(monitoring) = self.monitoring.as_ref() {
            match target {
                FtState::Active => monitoring.heartbeat_timer.reset()?,
                FtState::Standby | FtState::Unknown => monitoring.timeout_timer.reset()?,
            }
        }
        if target == FtState::Active {
            self.incarnation = self.next_incarnation;
            outcome.announce = Some(self.heartbeat()?);
        }

        let change = FtStateChange {
            group_name: self.binding()?.group_name.clone(),
            instance_id: self.instance_id().unwrap_or_default(),
            previous,
            state: target,
        };
        log::info!(
            "FT member '{}' of group '{}': {} -> {}",
            change.instance_id,
            change.group_name,
            previous,
            target
        );
        outcome.change = Some(change);
        Ok(outcome)
    }
}

/// A heartbeat ready to publish once the member lock is released
struct Announcement {
    transport: Arc<dyn FtTransport>,
    channel: String,
    payload: Vec<u8>,
}

impl Announcement {
    fn send(self) {
        log::trace!("FT: sending heartbeat on '{}'", self.channel);
        if let Err(e) = self.transport.publish(&self.channel, &self.payload) {
            log::warn!("FT heartbeat publish on '{}' failed: {}", self.channel, e);
        }
    }
}

/// Work to finish after an election step releases the member lock
#[derive(Default)]
struct Outcome {
    change: Option<FtStateChange>,
    announce: Option<Announcement>,
}

/// One participant in an FT group
pub struct FtMember {
    inner: Mutex<MemberInner>,
    callback: Mutex<Option<FtStateCallback>>,
    callback_thread: Mutex<Option<ThreadId>>,
    self_ref: Weak<FtMember>,
}

impl FtMember {
    /// Create an unbound member in state `Unknown`
    pub fn create() -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            inner: Mutex::new(MemberInner {
                binding: None,
                explicit_instance_id: None,
                weight: 0,
                state: FtState::Unknown,
                incarnation: 0,
                next_incarnation: 0,
                peers: HashMap::new(),
                epoch: 0,
                monitoring: None,
                destroyed: false,
            }),
            callback: Mutex::new(None),
            callback_thread: Mutex::new(None),
            self_ref: self_ref.clone(),
        })
    }

    fn lock_inner(&self) -> FtResult<MutexGuard<'_, MemberInner>> {
        handle_mutex_poison(self.inner.lock(), FtError::lock_poisoned)
    }

    /// Bind the member to a queue, transport and group
    ///
    /// Validation failures leave the member untouched and fire no callback.
    /// Heartbeat exchange does not begin until [`activate`](Self::activate).
    pub fn setup(
        &self,
        setup: FtSetup,
        callback: impl FnMut(&FtStateChange) + Send + 'static,
    ) -> FtResult<()> {
        setup.validate()?;

        {
            let mut inner = self.lock_inner()?;
            if inner.destroyed {
                return Err(FtError::Destroyed);
            }
            if inner.monitoring.is_some() {
                return Err(FtError::MemberActive { operation: "set up" });
            }

            let registration = setup
                .queue
                .register_object(&format!("ft-member:{}", setup.group_name))?;
            let channel = setup.mechanism.channel(&setup.group_name);
            log::debug!(
                "FT member set up: group '{}', weight {}, {} on '{}' via '{}'",
                setup.group_name,
                setup.weight,
                setup.mechanism,
                channel,
                setup.transport.name()
            );

            inner.weight = setup.weight;
            inner.state = FtState::Unknown;
            inner.binding = Some(Binding {
                mechanism: setup.mechanism,
                default_instance_id: generate_instance_id(&setup.group_name),
                queue: setup.queue,
                transport: setup.transport,
                group_name: setup.group_name,
                channel,
                heartbeat_interval: setup.heartbeat_interval,
                timeout_interval: setup.timeout_interval,
                _registration: registration,
            });
        }

        *handle_mutex_poison(self.callback.lock(), FtError::lock_poisoned)? =
            Some(Box::new(callback));
        Ok(())
    }

    /// Begin heartbeat exchange; a no-op if already activated
    ///
    /// Enqueues the `Unknown -> Standby` transition. The member goes active
    /// after a full timeout interval without hearing a better peer.
    pub fn activate(&self) -> FtResult<()> {
        let (queue, epoch, announcement) = {
            let mut inner = self.lock_inner()?;
            let binding = inner.binding()?;
            if inner.monitoring.is_some() {
                return Ok(());
            }

            let queue = Arc::clone(&binding.queue);
            let transport = Arc::clone(&binding.transport);
            let channel = binding.channel.clone();
            let heartbeat_interval = binding.heartbeat_interval;
            let timeout_interval = binding.timeout_interval;
            let label = inner.instance_id().unwrap_or_default();

            let epoch = inner.epoch + 1;
            let subscription =
                transport.subscribe(&channel, self.heartbeat_sink(&queue, epoch))?;

            let timers =
                self.start_timers(&queue, &label, epoch, heartbeat_interval, timeout_interval);
            let (heartbeat_timer, timeout_timer) = match timers {
                Ok(timers) => timers,
                Err(e) => {
                    let _ = transport.unsubscribe(subscription);
                    return Err(e);
                }
            };

            inner.epoch = epoch;
            inner.state = FtState::Unknown;
            inner.incarnation = 0;
            inner.next_incarnation = 1;
            inner.peers.clear();
            inner.monitoring = Some(Monitoring {
                transport,
                subscription,
                heartbeat_timer,
                timeout_timer,
                activated_at: Instant::now(),
            });
            log::info!("FT member '{}' activated on '{}'", label, channel);

            (queue, epoch, inner.heartbeat()?)
        };

        self.enqueue(&queue, epoch, |member, epoch| {
            member.transition_if(epoch, FtState::Unknown, FtState::Standby)
        })?;
        announcement.send();
        Ok(())
    }

    fn heartbeat_sink(&self, queue: &Arc<EventQueue>, epoch: u64) -> HeartbeatSink {
        let member = self.self_ref.clone();
        let queue = Arc::downgrade(queue);
        Arc::new(move |payload: &[u8]| {
            let Some(queue) = queue.upgrade() else {
                return;
            };
            let member = member.clone();
            let payload = payload.to_vec();
            let event = QueueEvent::new(EventKind::Ft, move || {
                if let Some(member) = member.upgrade() {
                    member.on_heartbeat(&payload, epoch);
                }
            });
            if let Err(e) = queue.enqueue_event(event) {
                log::debug!("FT heartbeat dropped: {}", e);
            }
        })
    }

    fn start_timers(
        &self,
        queue: &Arc<EventQueue>,
        label: &str,
        epoch: u64,
        heartbeat_interval: Duration,
        timeout_interval: Duration,
    ) -> FtResult<(Timer, Timer)> {
        let member = self.self_ref.clone();
        let heartbeat_timer = Timer::create(
            queue,
            format!("ft-heartbeat:{label}"),
            heartbeat_interval,
            move || {
                if let Some(member) = member.upgrade() {
                    member.on_heartbeat_timer(epoch);
                }
            },
        )?;

        let member = self.self_ref.clone();
        let timeout_timer = Timer::create(
            queue,
            format!("ft-timeout:{label}"),
            timeout_interval,
            move || {
                if let Some(member) = member.upgrade() {
                    member.on_timeout(epoch);
                }
            },
        )?;
        Ok((heartbeat_timer, timeout_timer))
    }

    fn enqueue(
        &self,
        queue: &EventQueue,
        epoch: u64,
        work: impl FnOnce(&FtMember, u64) + Send + 'static,
    ) -> FtResult<()> {
        let member = self.self_ref.clone();
        queue.enqueue_event(QueueEvent::new(EventKind::Ft, move || {
            if let Some(member) = member.upgrade() {
                work(&member, epoch);
            }
        }))?;
        Ok(())
    }

    /// Stop heartbeat exchange
    ///
    /// Fires no callback: the state silently returns to `Unknown`, peers and
    /// incarnation are forgotten, and member events still queued from this
    /// activation are discarded. A no-op when not activated.
    pub fn deactivate(&self) -> FtResult<()> {
        let monitoring = {
            let mut inner = self.lock_inner()?;
            inner.binding()?;
            let Some(monitoring) = inner.monitoring.take() else {
                return Ok(());
            };
            Self::reset_election(&mut inner);
            log::info!(
                "FT member '{}' deactivated",
                inner.instance_id().unwrap_or_default()
            );
            monitoring
        };
        // unsubscribes and joins the timer threads
        drop(monitoring);
        Ok(())
    }

    fn reset_election(inner: &mut MemberInner) {
        inner.epoch += 1;
        inner.state = FtState::Unknown;
        inner.incarnation = 0;
        inner.next_incarnation = 0;
        inner.peers.clear();
    }

    /// Deactivate, release the queue registration and drop the callback
    ///
    /// Waits for a callback running on another thread to return. No
    /// callback is invoked after this returns. Calling it from inside the
    /// member's own callback is allowed.
    pub fn destroy(&self) -> FtResult<()> {
        let (monitoring, binding) = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            if inner.destroyed {
                return Ok(());
            }
            inner.destroyed = true;
            Self::reset_election(&mut inner);
            (inner.monitoring.take(), inner.binding.take())
        };
        drop(monitoring);
        drop(binding);

        let inside_callback = *self
            .callback_thread
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            == Some(thread::current().id());
        if !inside_callback {
            self.callback
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
        }
        log::debug!("FT member destroyed");
        Ok(())
    }

    /// Change the weight; leadership is re-evaluated on the queue
    ///
    /// An immediate heartbeat advertising the new weight follows.
    pub fn set_weight(&self, weight: u32) -> FtResult<()> {
        check_weight(weight)?;
        let pending = {
            let mut inner = self.lock_inner()?;
            let queue = Arc::clone(&inner.binding()?.queue);
            let previous = inner.weight;
            inner.weight = weight;
            log::debug!("FT weight changed {} -> {}", previous, weight);
            inner.monitoring.as_ref().map(|_| (queue, inner.epoch))
        };

        if let Some((queue, epoch)) = pending {
            self.enqueue(&queue, epoch, |member, epoch| member.reevaluate(epoch))?;
        }
        Ok(())
    }

    /// Override the generated instance id; only before activation
    ///
    /// An empty id restores the generated default.
    pub fn set_instance_id(&self, id: impl Into<String>) -> FtResult<()> {
        let id = id.into();
        let mut inner = self.lock_inner()?;
        if inner.destroyed {
            return Err(FtError::Destroyed);
        }
        if inner.monitoring.is_some() {
            return Err(FtError::MemberActive {
                operation: "set the instance id",
            });
        }
        inner.explicit_instance_id = (!id.is_empty()).then_some(id);
        Ok(())
    }

    /// Report that heartbeat information was lost
    ///
    /// Enqueues a transition to `Unknown` and forgets all peers; the normal
    /// election resumes from there.
    pub fn mark_unknown(&self) -> FtResult<()> {
        let (queue, epoch) = {
            let inner = self.lock_inner()?;
            let queue = Arc::clone(&inner.binding()?.queue);
            if inner.monitoring.is_none() {
                return Ok(());
            }
            (queue, inner.epoch)
        };
        self.enqueue(&queue, epoch, |member, epoch| {
            member.run_election_step(epoch, |inner| {
                inner.peers.clear();
                inner.enter(FtState::Unknown)
            })
        })
    }

    // Queue-thread handlers

    fn run_election_step(
        &self,
        epoch: u64,
        step: impl FnOnce(&mut MemberInner) -> FtResult<Outcome>,
    ) {
        let outcome = {
            let mut inner = match self.inner.lock() {
                Ok(inner) => inner,
                Err(_) => {
                    log::error!("FT member state lock poisoned; ignoring event");
                    return;
                }
            };
            if !inner.is_current(epoch) {
                log::trace!("FT: discarding event from an earlier activation");
                return;
            }
            match step(&mut inner) {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::warn!("FT election step failed: {}", e);
                    return;
                }
            }
        };

        if let Some(announce) = outcome.announce {
            announce.send();
        }
        if let Some(change) = outcome.change {
            self.notify(&change, epoch);
        }
    }

    fn transition_if(&self, epoch: u64, from: FtState, to: FtState) {
        self.run_election_step(epoch, |inner| {
            if inner.state == from {
                inner.enter(to)
            } else {
                Ok(Outcome::default())
            }
        });
    }

    fn on_heartbeat(&self, payload: &[u8], epoch: u64) {
        let heartbeat = match Heartbeat::from_bytes(payload) {
            Ok(heartbeat) => heartbeat,
            Err(e) => {
                log::warn!("FT: dropping heartbeat: {}", e);
                return;
            }
        };

        self.run_election_step(epoch, |inner| {
            if heartbeat.group_name != inner.binding()?.group_name {
                log::trace!("FT: heartbeat from different group '{}'", heartbeat.group_name);
                return Ok(Outcome::default());
            }
            if Some(&heartbeat.instance_id) == inner.instance_id().as_ref() {
                log::trace!("FT: received own heartbeat");
                return Ok(Outcome::default());
            }

            let theirs = heartbeat.credentials();
            let better = theirs.beats(&inner.credentials());
            inner.peers.insert(
                heartbeat.instance_id.clone(),
                PeerRecord {
                    credentials: theirs,
                    last_seen: Instant::now(),
                },
            );

            if !better {
                log::trace!(
                    "FT: heartbeat from lower priority '{}' ignored",
                    heartbeat.instance_id
                );
                return Ok(Outcome::default());
            }

            log::trace!("FT: heartbeat from better peer '{}'", heartbeat.instance_id);
            if heartbeat.incarnation >= inner.next_incarnation {
                // incarnation is peer-supplied; u32::MAX must not wrap
                inner.next_incarnation = heartbeat.incarnation.saturating_add(1);
            }
            let outcome = inner.enter(FtState::Standby)?;
            if let Some(monitoring) = inner.monitoring.as_ref() {
                monitoring.timeout_timer.reset()?;
            }
            Ok(outcome)
        });
    }

    fn on_heartbeat_timer(&self, epoch: u64) {
        let announcement = {
            let Ok(inner) = self.inner.lock() else {
                return;
            };
            if !inner.is_current(epoch) {
                return;
            }
            inner.heartbeat()
        };
        match announcement {
            Ok(announcement) => announcement.send(),
            Err(e) => log::warn!("FT: cannot build heartbeat: {}", e),
        }
    }

    fn on_timeout(&self, epoch: u64) {
        self.run_election_step(epoch, |inner| {
            let timeout = inner.binding()?.timeout_interval;
            inner.forget_stale_peers(timeout);
            if inner.better_peer_alive() {
                inner.enter(FtState::Standby)
            } else {
                log::debug!("FT: timeout with no better peer alive");
                inner.enter(FtState::Active)
            }
        });
    }

    fn reevaluate(&self, epoch: u64) {
        self.run_election_step(epoch, |inner| {
            let timeout = inner.binding()?.timeout_interval;
            inner.forget_stale_peers(timeout);

            let mut outcome = if inner.better_peer_alive() {
                inner.enter(FtState::Standby)?
            } else {
                let settled = inner
                    .monitoring
                    .as_ref()
                    .is_some_and(|m| m.activated_at.elapsed() >= timeout);
                if settled {
                    inner.enter(FtState::Active)?
                } else {
                    Outcome::default()
                }
            };

            // advertise the new weight even without a transition
            if outcome.announce.is_none() {
                outcome.announce = Some(inner.heartbeat()?);
            }
            Ok(outcome)
        });
    }

    fn notify(&self, change: &FtStateChange, epoch: u64) {
        let mut slot = self.callback.lock().unwrap_or_else(PoisonError::into_inner);

        // deactivate/destroy may have run while the lock above was contended
        let still_current = self
            .inner
            .lock()
            .map(|inner| inner.is_current(epoch))
            .unwrap_or(false);
        if !still_current {
            return;
        }

        if let Some(callback) = slot.as_mut() {
            *self
                .callback_thread
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(thread::current().id());
            callback(change);
            *self
                .callback_thread
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = None;
        }

        if self.is_destroyed() {
            slot.take();
        }
    }

    // Accessors

    pub fn group_name(&self) -> FtResult<String> {
        Ok(self.lock_inner()?.binding()?.group_name.clone())
    }

    pub fn mechanism(&self) -> FtResult<FtMechanism> {
        Ok(self.lock_inner()?.binding()?.mechanism)
    }

    pub fn weight(&self) -> FtResult<u32> {
        let inner = self.lock_inner()?;
        inner.binding()?;
        Ok(inner.weight)
    }

    pub fn heartbeat_interval(&self) -> FtResult<Duration> {
        Ok(self.lock_inner()?.binding()?.heartbeat_interval)
    }

    pub fn timeout_interval(&self) -> FtResult<Duration> {
        Ok(self.lock_inner()?.binding()?.timeout_interval)
    }

    /// Explicit id if one was set, otherwise the generated default
    pub fn instance_id(&self) -> FtResult<String> {
        let inner = self.lock_inner()?;
        if inner.destroyed {
            return Err(FtError::Destroyed);
        }
        inner.instance_id().ok_or(FtError::NotSetUp)
    }

    pub fn state(&self) -> FtResult<FtState> {
        let inner = self.lock_inner()?;
        inner.binding()?;
        Ok(inner.state)
    }

    pub fn incarnation(&self) -> FtResult<u32> {
        let inner = self.lock_inner()?;
        inner.binding()?;
        Ok(inner.incarnation)
    }

    /// True while heartbeat exchange is running (not whether the member is
    /// the `Active` one)
    pub fn is_active(&self) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.monitoring.is_some())
            .unwrap_or(false)
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.destroyed)
            .unwrap_or(true)
    }
}

impl Drop for FtMember {
    fn drop(&mut self) {
        if let Ok(inner) = self.inner.get_mut() {
            if !inner.destroyed && inner.monitoring.is_some() {
                log::warn!(
                    "FT member '{}' dropped while active; call destroy() first",
                    inner.instance_id().unwrap_or_default()
                );
            }
        }
    }
}

impl std::fmt::Debug for FtMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("FtMember");
        if let Ok(inner) = self.inner.lock() {
            debug
                .field("instance_id", &inner.instance_id())
                .field("weight", &inner.weight)
                .field("state", &inner.state)
                .field("active", &inner.monitoring.is_some());
        }
        debug.finish_non_exhaustive()
    }
}

//! EventQueue - ordered single-consumer work queue
//!
//! Any number of producer threads append events; exactly one thread at a
//! time drains them, running each handler in enqueue order. Draining is
//! cancelled cooperatively with [`EventQueue::stop_dispatch`], which never
//! drops pending events: whatever is left stays queued for the next
//! dispatcher.
//!
//! A blocked dispatcher waits on a condition variable with a bounded
//! `poll_interval`, so a stop request is observed within one interval even
//! if a wake-up is missed.

use std::collections::VecDeque;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

use crate::core::sync::{handle_mutex_poison, handle_rwlock_read, handle_rwlock_write};
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::event::QueueEvent;

/// Default upper bound on a single condvar wait inside a dispatch loop
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Per-queue configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Longest time a blocked dispatcher sleeps before re-checking its stop flag
    pub poll_interval: Duration,
    /// Queue depth above which `on_high_watermark_exceeded` fires (0 disables)
    pub high_watermark: usize,
    /// Queue depth at or below which `on_low_watermark` fires after a high crossing
    pub low_watermark: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            high_watermark: 0,
            low_watermark: 1,
        }
    }
}

impl QueueConfig {
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_watermarks(mut self, high: usize, low: usize) -> Self {
        self.high_watermark = high;
        self.low_watermark = low;
        self
    }

    pub fn validate(&self) -> QueueResult<()> {
        if self.poll_interval.is_zero() {
            return Err(QueueError::InvalidInterval {
                what: "queue poll interval".to_string(),
            });
        }
        check_watermarks(self.high_watermark, self.low_watermark.max(1))
    }
}

fn check_watermarks(high: usize, low: usize) -> QueueResult<()> {
    if high != 0 && high < low {
        return Err(QueueError::InvalidWatermark {
            message: format!("high watermark [{high}] is less than low watermark [{low}]"),
        });
    }
    Ok(())
}

/// Observer for queue depth crossings
///
/// Purely observational: the queue neither drops nor blocks when a
/// watermark is crossed. Callbacks run on the thread that caused the
/// crossing (a producer for high, the dispatcher for low) with no queue
/// lock held.
pub trait QueueMonitor: Send + Sync {
    fn on_high_watermark_exceeded(&self, queue: &str, size: usize);
    fn on_low_watermark(&self, queue: &str, size: usize);
}

/// Callback invoked on the producer thread after every enqueue
pub type EnqueueCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Result of a bounded dispatch call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The call processed this many events and returned normally
    Processed(usize),
    /// Nothing arrived before the deadline
    TimedOut,
    /// A stop request ended the call after this many events
    Stopped(usize),
    /// Non-blocking call found the queue empty
    Empty,
}

#[derive(Debug, Clone, Copy)]
enum RunMode {
    UntilStopped,
    Single,
    Deadline(Instant),
    NonBlocking,
}

enum Next {
    Event(QueueEvent, Option<usize>),
    Stopped,
    TimedOut,
    Empty,
}

struct QueueState {
    events: VecDeque<QueueEvent>,
    dispatching: bool,
    stop_requested: bool,
    destroyed: bool,
    high_watermark: usize,
    low_watermark: usize,
    above_high_watermark: bool,
    dispatched_total: u64,
}

/// Ordered, single-consumer event queue
pub struct EventQueue {
    name: String,
    poll_interval: Duration,
    state: Mutex<QueueState>,
    available: Condvar,
    monitor: RwLock<Option<Arc<dyn QueueMonitor>>>,
    enqueue_callback: RwLock<Option<EnqueueCallback>>,
    open_objects: AtomicUsize,
}

impl EventQueue {
    /// Create a queue with default configuration
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Self::build(name.into(), &QueueConfig::default())
    }

    /// Create a queue, validating the configuration first
    pub fn create(name: impl Into<String>, config: &QueueConfig) -> QueueResult<Arc<Self>> {
        config.validate()?;
        Ok(Self::build(name.into(), config))
    }

    fn build(name: String, config: &QueueConfig) -> Arc<Self> {
        log::debug!("Creating event queue '{}'", name);
        Arc::new(Self {
            name,
            poll_interval: config.poll_interval,
            state: Mutex::new(QueueState {
                events: VecDeque::new(),
                dispatching: false,
                stop_requested: false,
                destroyed: false,
                high_watermark: config.high_watermark,
                low_watermark: config.low_watermark.max(1),
                above_high_watermark: false,
                dispatched_total: 0,
            }),
            available: Condvar::new(),
            monitor: RwLock::new(None),
            enqueue_callback: RwLock::new(None),
            open_objects: AtomicUsize::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn lock_state(&self) -> QueueResult<MutexGuard<'_, QueueState>> {
        handle_mutex_poison(self.state.lock(), QueueError::lock_poisoned)
    }

    fn destroyed_error(&self) -> QueueError {
        QueueError::Destroyed {
            queue: self.name.clone(),
        }
    }

    /// Number of events waiting to be dispatched
    pub fn event_count(&self) -> QueueResult<usize> {
        Ok(self.lock_state()?.events.len())
    }

    /// Total number of events this queue has dispatched
    pub fn dispatched_total(&self) -> QueueResult<u64> {
        Ok(self.lock_state()?.dispatched_total)
    }

    /// True while some thread is inside a dispatch call on this queue
    pub fn is_dispatching(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.dispatching)
            .unwrap_or(false)
    }

    pub fn is_destroyed(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.destroyed)
            .unwrap_or(true)
    }

    /// Append an application event
    pub fn enqueue(&self, handler: impl FnOnce() + Send + 'static) -> QueueResult<()> {
        self.enqueue_event(QueueEvent::user(handler))
    }

    /// Append an event to the tail of the queue
    ///
    /// Never blocks on the consumer. Fails with `Destroyed` once the queue
    /// has been destroyed.
    pub fn enqueue_event(&self, event: QueueEvent) -> QueueResult<()> {
        let crossed_high = {
            let mut state = self.lock_state()?;
            if state.destroyed {
                return Err(self.destroyed_error());
            }
            log::trace!("Queue '{}': enqueue {} event", self.name, event.kind());
            state.events.push_back(event);

            let size = state.events.len();
            let crossed = state.high_watermark != 0
                && size > state.high_watermark
                && !state.above_high_watermark;
            if crossed {
                state.above_high_watermark = true;
            }
            self.available.notify_one();
            crossed.then_some(size)
        };

        if let Some(size) = crossed_high {
            log::warn!(
                "Queue '{}' exceeded high watermark with {} events",
                self.name,
                size
            );
            if let Some(monitor) = self.current_monitor()? {
                monitor.on_high_watermark_exceeded(&self.name, size);
            }
        }

        let callback = handle_rwlock_read(self.enqueue_callback.read(), QueueError::lock_poisoned)?
            .clone();
        if let Some(callback) = callback {
            callback(&self.name);
        }

        Ok(())
    }

    /// Dispatch events until [`stop_dispatch`](Self::stop_dispatch) is called
    ///
    /// Returns the number of events processed by this call.
    pub fn dispatch(&self) -> QueueResult<usize> {
        match self.run(RunMode::UntilStopped)? {
            DispatchOutcome::Processed(n) | DispatchOutcome::Stopped(n) => Ok(n),
            DispatchOutcome::TimedOut | DispatchOutcome::Empty => Ok(0),
        }
    }

    /// Dispatch exactly one event, blocking until one is available
    ///
    /// Returns `Processed(1)`, or `Stopped(0)` if a stop request arrived
    /// while waiting.
    pub fn dispatch_event(&self) -> QueueResult<DispatchOutcome> {
        self.run(RunMode::Single)
    }

    /// Dispatch one event if one is queued, without blocking
    pub fn try_dispatch_event(&self) -> QueueResult<DispatchOutcome> {
        self.run(RunMode::NonBlocking)
    }

    /// Dispatch events until `timeout` has elapsed or a stop is requested
    ///
    /// Returns `Processed(n)` when at least one event ran before the
    /// deadline, `TimedOut` when none did, and `Stopped(n)` on a stop request.
    pub fn timed_dispatch(&self, timeout: Duration) -> QueueResult<DispatchOutcome> {
        self.run(RunMode::Deadline(Instant::now() + timeout))
    }

    /// Ask the current dispatcher to return
    ///
    /// Cooperative: an in-flight handler runs to completion, then the
    /// dispatch call returns without touching the remaining events. A stop
    /// requested while nobody dispatches is consumed by the next dispatch
    /// call; [`DispatcherThread::start`](super::DispatcherThread::start)
    /// clears it before spawning.
    pub fn stop_dispatch(&self) -> QueueResult<()> {
        let mut state = self.lock_state()?;
        if state.destroyed {
            return Err(self.destroyed_error());
        }
        log::debug!("Queue '{}': stop requested", self.name);
        state.stop_requested = true;
        self.available.notify_all();
        Ok(())
    }

    pub(crate) fn clear_stop_request(&self) -> QueueResult<()> {
        self.lock_state()?.stop_requested = false;
        Ok(())
    }

    fn run(&self, mode: RunMode) -> QueueResult<DispatchOutcome> {
        let _guard = self.begin_dispatch()?;
        let mut processed = 0usize;

        loop {
            match self.next_event(mode, processed)? {
                Next::Event(event, low_crossing) => {
                    if let Some(size) = low_crossing {
                        self.notify_low_watermark(size)?;
                    }
                    event.run();
                    processed += 1;
                    if matches!(mode, RunMode::Single | RunMode::NonBlocking) {
                        return Ok(DispatchOutcome::Processed(processed));
                    }
                }
                Next::Stopped => {
                    log::debug!(
                        "Queue '{}': dispatch stopped after {} events",
                        self.name,
                        processed
                    );
                    return Ok(DispatchOutcome::Stopped(processed));
                }
                Next::TimedOut if processed > 0 => return Ok(DispatchOutcome::Processed(processed)),
                Next::TimedOut => return Ok(DispatchOutcome::TimedOut),
                Next::Empty => return Ok(DispatchOutcome::Empty),
            }
        }
    }

    fn begin_dispatch(&self) -> QueueResult<DispatchGuard<'_>> {
        let mut state = self.lock_state()?;
        if state.destroyed {
            return Err(self.destroyed_error());
        }
        if state.dispatching {
            return Err(QueueError::AlreadyDispatching {
                queue: self.name.clone(),
            });
        }
        state.dispatching = true;
        Ok(DispatchGuard { queue: self })
    }

    fn next_event(&self, mode: RunMode, processed: usize) -> QueueResult<Next> {
        let mut state = self.lock_state()?;
        loop {
            if state.stop_requested {
                state.stop_requested = false;
                return Ok(Next::Stopped);
            }
            if let RunMode::Deadline(deadline) = mode {
                if processed > 0 && Instant::now() >= deadline {
                    return Ok(Next::TimedOut);
                }
            }

            if let Some(event) = state.events.pop_front() {
                state.dispatched_total += 1;
                let size = state.events.len();
                let crossed_low = state.above_high_watermark && size <= state.low_watermark;
                if crossed_low {
                    state.above_high_watermark = false;
                }
                return Ok(Next::Event(event, crossed_low.then_some(size)));
            }

            let wait = match mode {
                RunMode::NonBlocking => return Ok(Next::Empty),
                RunMode::UntilStopped | RunMode::Single => self.poll_interval,
                RunMode::Deadline(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(Next::TimedOut);
                    }
                    (deadline - now).min(self.poll_interval)
                }
            };

            let (guard, _) = handle_mutex_poison(
                self.available.wait_timeout(state, wait),
                QueueError::lock_poisoned,
            )?;
            state = guard;
        }
    }

    fn notify_low_watermark(&self, size: usize) -> QueueResult<()> {
        log::info!(
            "Queue '{}' drained to low watermark with {} events",
            self.name,
            size
        );
        if let Some(monitor) = self.current_monitor()? {
            monitor.on_low_watermark(&self.name, size);
        }
        Ok(())
    }

    fn current_monitor(&self) -> QueueResult<Option<Arc<dyn QueueMonitor>>> {
        Ok(handle_rwlock_read(self.monitor.read(), QueueError::lock_poisoned)?.clone())
    }

    /// Install the watermark observer, replacing any previous one
    pub fn set_monitor(&self, monitor: Arc<dyn QueueMonitor>) -> QueueResult<()> {
        *handle_rwlock_write(self.monitor.write(), QueueError::lock_poisoned)? = Some(monitor);
        Ok(())
    }

    pub fn clear_monitor(&self) -> QueueResult<()> {
        *handle_rwlock_write(self.monitor.write(), QueueError::lock_poisoned)? = None;
        Ok(())
    }

    /// Set the high watermark; 0 disables high watermark monitoring
    pub fn set_high_watermark(&self, high: usize) -> QueueResult<()> {
        let mut state = self.lock_state()?;
        check_watermarks(high, state.low_watermark)?;
        state.high_watermark = high;
        if high == 0 {
            state.above_high_watermark = false;
        }
        Ok(())
    }

    /// Set the low watermark; 0 is treated as 1
    pub fn set_low_watermark(&self, low: usize) -> QueueResult<()> {
        let low = low.max(1);
        let mut state = self.lock_state()?;
        check_watermarks(state.high_watermark, low)?;
        state.low_watermark = low;
        Ok(())
    }

    pub fn high_watermark(&self) -> QueueResult<usize> {
        Ok(self.lock_state()?.high_watermark)
    }

    pub fn low_watermark(&self) -> QueueResult<usize> {
        Ok(self.lock_state()?.low_watermark)
    }

    pub fn set_enqueue_callback(&self, callback: EnqueueCallback) -> QueueResult<()> {
        *handle_rwlock_write(self.enqueue_callback.write(), QueueError::lock_poisoned)? =
            Some(callback);
        Ok(())
    }

    pub fn remove_enqueue_callback(&self) -> QueueResult<()> {
        *handle_rwlock_write(self.enqueue_callback.write(), QueueError::lock_poisoned)? = None;
        Ok(())
    }

    /// Register an object (timer, FT member) that must be released before destroy
    pub fn register_object(self: &Arc<Self>, owner: &str) -> QueueResult<QueueObjectGuard> {
        let state = self.lock_state()?;
        if state.destroyed {
            return Err(self.destroyed_error());
        }
        let count = self.open_objects.fetch_add(1, Ordering::AcqRel) + 1;
        log::trace!(
            "Queue '{}': '{}' registered ({} open objects)",
            self.name,
            owner,
            count
        );
        Ok(QueueObjectGuard {
            queue: Arc::clone(self),
            owner: owner.to_string(),
        })
    }

    pub fn open_objects(&self) -> usize {
        self.open_objects.load(Ordering::Acquire)
    }

    /// Destroy the queue, discarding any events still pending
    ///
    /// Fails with `AlreadyDispatching` while a dispatcher is draining and
    /// with `OpenObjects` while timers or FT members are still registered.
    /// Destroying an already destroyed queue is a no-op.
    pub fn destroy(&self) -> QueueResult<()> {
        let discarded = {
            let mut state = self.lock_state()?;
            if state.destroyed {
                return Ok(());
            }
            if state.dispatching {
                return Err(QueueError::AlreadyDispatching {
                    queue: self.name.clone(),
                });
            }
            let open = self.open_objects.load(Ordering::Acquire);
            if open > 0 {
                return Err(QueueError::OpenObjects {
                    queue: self.name.clone(),
                    count: open,
                });
            }
            state.destroyed = true;
            state.stop_requested = false;
            self.available.notify_all();
            mem::take(&mut state.events)
        };

        if !discarded.is_empty() {
            log::debug!(
                "Queue '{}' destroyed with {} undispatched events",
                self.name,
                discarded.len()
            );
        } else {
            log::debug!("Queue '{}' destroyed", self.name);
        }
        Ok(())
    }

    /// Destroy the queue, dispatching until every open object is released
    ///
    /// Blocks indefinitely if an open object is never released.
    pub fn destroy_wait(&self) -> QueueResult<()> {
        loop {
            match self.destroy() {
                Err(QueueError::OpenObjects { .. }) => {
                    self.timed_dispatch(self.poll_interval)?;
                }
                other => return other,
            }
        }
    }

    /// Like [`destroy_wait`](Self::destroy_wait) but gives up after `timeout`
    pub fn destroy_timed_wait(&self, timeout: Duration) -> QueueResult<()> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.destroy() {
                Err(QueueError::OpenObjects { .. }) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(QueueError::Timeout {
                            operation: "destroy".to_string(),
                            queue: self.name.clone(),
                            timeout_ms: timeout.as_millis(),
                        });
                    }
                    self.timed_dispatch((deadline - now).min(self.poll_interval))?;
                }
                other => return other,
            }
        }
    }
}

impl std::fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue")
            .field("name", &self.name)
            .field("open_objects", &self.open_objects())
            .finish_non_exhaustive()
    }
}

/// Clears the `dispatching` flag even when a handler unwinds
struct DispatchGuard<'a> {
    queue: &'a EventQueue,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        let mut state = self
            .queue
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        state.dispatching = false;
    }
}

/// Registration of an object against a queue; released on drop
pub struct QueueObjectGuard {
    queue: Arc<EventQueue>,
    owner: String,
}

impl QueueObjectGuard {
    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }
}

impl Drop for QueueObjectGuard {
    fn drop(&mut self) {
        let remaining = self.queue.open_objects.fetch_sub(1, Ordering::AcqRel) - 1;
        log::trace!(
            "Queue '{}': '{}' released ({} open objects)",
            self.queue.name,
            self.owner,
            remaining
        );
    }
}

impl std::fmt::Debug for QueueObjectGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueObjectGuard")
            .field("queue", &self.queue.name)
            .field("owner", &self.owner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[test]
    fn test_new_queue_is_empty_and_idle() {
        let queue = EventQueue::new("q");
        assert_eq!(queue.name(), "q");
        assert_eq!(queue.event_count().unwrap(), 0);
        assert!(!queue.is_dispatching());
        assert!(!queue.is_destroyed());
        assert_eq!(queue.poll_interval(), DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn test_try_dispatch_on_empty_queue() {
        let queue = EventQueue::new("q");
        assert_eq!(queue.try_dispatch_event().unwrap(), DispatchOutcome::Empty);
    }

    #[test]
    fn test_single_event_dispatch() {
        let queue = EventQueue::new("q");
        let hits = Arc::new(AtomicU32::new(0));
        for _ in 0..2 {
            let hits = Arc::clone(&hits);
            queue
                .enqueue(move || {
                    hits.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }

        assert_eq!(queue.dispatch_event().unwrap(), DispatchOutcome::Processed(1));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(queue.event_count().unwrap(), 1);
        assert_eq!(queue.dispatched_total().unwrap(), 1);
    }

    #[test]
    fn test_config_validation() {
        assert!(QueueConfig::default().validate().is_ok());
        assert!(matches!(
            QueueConfig::default()
                .with_poll_interval(Duration::ZERO)
                .validate(),
            Err(QueueError::InvalidInterval { .. })
        ));
        assert!(matches!(
            QueueConfig::default().with_watermarks(2, 5).validate(),
            Err(QueueError::InvalidWatermark { .. })
        ));
        assert!(EventQueue::create("q", &QueueConfig::default().with_watermarks(10, 2)).is_ok());
    }

    #[test]
    fn test_watermark_setters_validate_ordering() {
        let queue = EventQueue::new("q");
        queue.set_high_watermark(10).unwrap();
        queue.set_low_watermark(0).unwrap();
        assert_eq!(queue.low_watermark().unwrap(), 1);

        assert!(matches!(
            queue.set_low_watermark(11),
            Err(QueueError::InvalidWatermark { .. })
        ));
        queue.set_low_watermark(5).unwrap();
        assert!(matches!(
            queue.set_high_watermark(4),
            Err(QueueError::InvalidWatermark { .. })
        ));
        queue.set_high_watermark(0).unwrap();
        assert_eq!(queue.high_watermark().unwrap(), 0);
    }

    #[test]
    fn test_destroyed_queue_rejects_work() {
        let queue = EventQueue::new("q");
        queue.enqueue(|| {}).unwrap();
        queue.destroy().unwrap();

        assert!(queue.is_destroyed());
        assert!(matches!(queue.enqueue(|| {}), Err(QueueError::Destroyed { .. })));
        assert!(matches!(queue.dispatch(), Err(QueueError::Destroyed { .. })));
        assert!(matches!(queue.stop_dispatch(), Err(QueueError::Destroyed { .. })));
        // second destroy is a no-op
        assert!(queue.destroy().is_ok());
    }

    #[test]
    fn test_open_objects_block_destroy() {
        let queue = EventQueue::new("q");
        let guard = queue.register_object("timer").unwrap();
        assert_eq!(queue.open_objects(), 1);

        match queue.destroy() {
            Err(QueueError::OpenObjects { count, .. }) => assert_eq!(count, 1),
            other => panic!("expected OpenObjects, got {other:?}"),
        }

        drop(guard);
        assert_eq!(queue.open_objects(), 0);
        assert!(queue.destroy().is_ok());
    }

    #[test]
    fn test_destroy_timed_wait_times_out_on_leaked_object() {
        let queue = EventQueue::new("q");
        let _guard = queue.register_object("leak").unwrap();

        match queue.destroy_timed_wait(Duration::from_millis(30)) {
            Err(QueueError::Timeout { timeout_ms, .. }) => assert_eq!(timeout_ms, 30),
            other => panic!("expected Timeout, got {other:?}"),
        }
        assert!(!queue.is_destroyed());
    }

    #[test]
    fn test_enqueue_callback_runs_per_enqueue() {
        let queue = EventQueue::new("cb");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        queue
            .set_enqueue_callback(Arc::new(move |name: &str| {
                sink.lock().unwrap().push(name.to_string());
            }))
            .unwrap();

        queue.enqueue(|| {}).unwrap();
        queue.enqueue(|| {}).unwrap();
        queue.remove_enqueue_callback().unwrap();
        queue.enqueue(|| {}).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["cb".to_string(), "cb".to_string()]);
    }
}

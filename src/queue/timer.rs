//! Repeating timers that deliver onto an EventQueue
//!
//! A timer counts down on its own thread and enqueues a `Timer` event when
//! the interval elapses, so the callback always runs on the queue's
//! dispatch thread. Each timer holds an open-object registration on its
//! queue until destroyed.

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::core::sync::handle_mutex_poison;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::event::{EventKind, QueueEvent};
use crate::queue::event_queue::{EventQueue, QueueObjectGuard};

type TimerCallback = Arc<dyn Fn() + Send + Sync>;

struct TimerState {
    next_fire: Instant,
    cancelled: bool,
}

struct TimerShared {
    state: Mutex<TimerState>,
    signal: Condvar,
}

impl TimerShared {
    fn is_cancelled(&self) -> bool {
        self.state
            .lock()
            .map(|state| state.cancelled)
            .unwrap_or(true)
    }
}

pub struct Timer {
    name: String,
    interval: Duration,
    shared: Arc<TimerShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    registration: Mutex<Option<QueueObjectGuard>>,
}

impl Timer {
    /// Start a repeating timer firing every `interval` on `queue`
    pub fn create(
        queue: &Arc<EventQueue>,
        name: impl Into<String>,
        interval: Duration,
        callback: impl Fn() + Send + Sync + 'static,
    ) -> QueueResult<Self> {
        let name = name.into();
        if interval.is_zero() {
            return Err(QueueError::InvalidInterval {
                what: format!("timer '{name}'"),
            });
        }

        let registration = queue.register_object(&name)?;
        let shared = Arc::new(TimerShared {
            state: Mutex::new(TimerState {
                next_fire: Instant::now() + interval,
                cancelled: false,
            }),
            signal: Condvar::new(),
        });

        let thread_name = format!("ftqueue-timer:{name}");
        let handle = {
            let shared = Arc::clone(&shared);
            let queue = Arc::clone(queue);
            let name = name.clone();
            let callback: TimerCallback = Arc::new(callback);
            thread::Builder::new()
                .name(thread_name.clone())
                .spawn(move || timer_loop(shared, queue, name, interval, callback))
                .map_err(|e| QueueError::ThreadSpawn {
                    name: thread_name,
                    message: e.to_string(),
                })?
        };

        log::trace!("Timer '{}' created ({:?})", name, interval);
        Ok(Self {
            name,
            interval,
            shared,
            worker: Mutex::new(Some(handle)),
            registration: Mutex::new(Some(registration)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_destroyed(&self) -> bool {
        self.shared.is_cancelled()
    }

    fn lock_state(&self) -> QueueResult<MutexGuard<'_, TimerState>> {
        handle_mutex_poison(self.shared.state.lock(), QueueError::lock_poisoned)
    }

    /// Restart the countdown from now
    pub fn reset(&self) -> QueueResult<()> {
        let mut state = self.lock_state()?;
        if state.cancelled {
            return Ok(());
        }
        state.next_fire = Instant::now() + self.interval;
        self.shared.signal.notify_all();
        Ok(())
    }

    /// Cancel the timer, join its thread and release the queue registration
    ///
    /// A fire that was already enqueued is skipped when dispatched.
    pub fn destroy(&self) -> QueueResult<()> {
        {
            let mut state = self.lock_state()?;
            state.cancelled = true;
            self.shared.signal.notify_all();
        }

        let handle = handle_mutex_poison(self.worker.lock(), QueueError::lock_poisoned)?.take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("Timer '{}' thread panicked", self.name);
            }
        }

        if handle_mutex_poison(self.registration.lock(), QueueError::lock_poisoned)?
            .take()
            .is_some()
        {
            log::trace!("Timer '{}' destroyed", self.name);
        }
        Ok(())
    }
}

fn timer_loop(
    shared: Arc<TimerShared>,
    queue: Arc<EventQueue>,
    name: String,
    interval: Duration,
    callback: TimerCallback,
) {
    let mut state = shared
        .state
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    loop {
        if state.cancelled {
            return;
        }

        let now = Instant::now();
        if now < state.next_fire {
            let wait = state.next_fire - now;
            state = match shared.signal.wait_timeout(state, wait) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
            continue;
        }

        state.next_fire = now + interval;
        drop(state);

        let fire_shared = Arc::clone(&shared);
        let fire_callback = Arc::clone(&callback);
        let event = QueueEvent::new(EventKind::Timer, move || {
            if !fire_shared.is_cancelled() {
                fire_callback();
            }
        });
        if let Err(e) = queue.enqueue_event(event) {
            log::warn!("Timer '{}' stopped: {}", name, e);
            return;
        }

        state = shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if let Err(e) = self.destroy() {
            log::warn!("Timer '{}' teardown failed: {}", self.name, e);
        }
    }
}

impl std::fmt::Debug for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timer")
            .field("name", &self.name)
            .field("interval", &self.interval)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::event_queue::DispatchOutcome;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_zero_interval_is_rejected() {
        let queue = EventQueue::new("timers");
        assert!(matches!(
            Timer::create(&queue, "zero", Duration::ZERO, || {}),
            Err(QueueError::InvalidInterval { .. })
        ));
        assert_eq!(queue.open_objects(), 0);
    }

    #[test]
    fn test_timer_fires_on_queue() {
        let queue = EventQueue::new("timers");
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let timer = Timer::create(&queue, "tick", Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while fired.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
            queue.timed_dispatch(Duration::from_millis(20)).unwrap();
        }
        assert!(fired.load(Ordering::SeqCst) >= 3);

        timer.destroy().unwrap();
        queue.destroy_wait().unwrap();
    }

    #[test]
    fn test_timer_registration_blocks_destroy() {
        let queue = EventQueue::new("timers");
        let timer = Timer::create(&queue, "held", Duration::from_secs(60), || {}).unwrap();
        assert_eq!(queue.open_objects(), 1);
        assert!(matches!(
            queue.destroy(),
            Err(QueueError::OpenObjects { .. })
        ));

        timer.destroy().unwrap();
        timer.destroy().unwrap();
        assert_eq!(queue.open_objects(), 0);
        queue.destroy().unwrap();
    }

    #[test]
    fn test_cancelled_fire_is_skipped() {
        let queue = EventQueue::new("timers");
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        let timer = Timer::create(&queue, "late", Duration::from_millis(5), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while queue.event_count().unwrap() == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        timer.destroy().unwrap();

        while queue.try_dispatch_event().unwrap() != DispatchOutcome::Empty {}
        assert_eq!(fired.load(Ordering::SeqCst), 0);
        queue.destroy().unwrap();
    }

    #[test]
    fn test_reset_postpones_fire() {
        let queue = EventQueue::new("timers");
        let timer = Timer::create(&queue, "reset", Duration::from_millis(250), || {}).unwrap();

        for _ in 0..4 {
            thread::sleep(Duration::from_millis(40));
            timer.reset().unwrap();
        }
        assert_eq!(queue.event_count().unwrap(), 0);

        timer.destroy().unwrap();
        queue.destroy().unwrap();
    }
}

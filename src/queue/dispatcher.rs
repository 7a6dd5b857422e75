//! DispatcherThread - one OS thread draining one EventQueue
//!
//! The thread's only job is to call [`EventQueue::dispatch`]. Stopping is
//! cooperative: [`DispatcherThread::stop`] raises the queue's stop flag and
//! joins. There is no join timeout and no forced termination; a handler that
//! never returns keeps `stop` blocked.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use crate::core::sync::handle_mutex_poison;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::event_queue::EventQueue;

const WORKER_RUNNING: u8 = 0;
const WORKER_DESTROY_ON_EXIT: u8 = 1;
const WORKER_EXITED: u8 = 2;

struct Worker {
    handle: JoinHandle<QueueResult<usize>>,
    exit: Arc<AtomicU8>,
}

/// Counts one live dispatch thread for as long as it is held
struct LiveThread(Arc<AtomicUsize>);

impl LiveThread {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(counter))
    }
}

impl Drop for LiveThread {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Owns the thread that dispatches a single queue
pub struct DispatcherThread {
    queue: Arc<EventQueue>,
    worker: Mutex<Option<Worker>>,
    live_threads: Arc<AtomicUsize>,
}

impl DispatcherThread {
    /// Bind a dispatcher to `queue` without starting it
    pub fn new(queue: Arc<EventQueue>) -> Self {
        Self::with_thread_counter(queue, Arc::new(AtomicUsize::new(0)))
    }

    /// Bind a dispatcher whose thread is counted in `live_threads`
    ///
    /// The count rises when the thread is started and falls only when the
    /// thread itself exits, including threads detached by [`destroy`](Self::destroy).
    pub fn with_thread_counter(queue: Arc<EventQueue>, live_threads: Arc<AtomicUsize>) -> Self {
        Self {
            queue,
            worker: Mutex::new(None),
            live_threads,
        }
    }

    /// Bind and start in one step
    pub fn spawn(queue: Arc<EventQueue>) -> QueueResult<Self> {
        let dispatcher = Self::new(queue);
        dispatcher.start()?;
        Ok(dispatcher)
    }

    pub fn queue(&self) -> &Arc<EventQueue> {
        &self.queue
    }

    fn lock_worker(&self) -> QueueResult<MutexGuard<'_, Option<Worker>>> {
        handle_mutex_poison(self.worker.lock(), QueueError::lock_poisoned)
    }

    /// True while the dispatch thread is alive
    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .map(|worker| {
                worker
                    .as_ref()
                    .is_some_and(|worker| !worker.handle.is_finished())
            })
            .unwrap_or(false)
    }

    /// Start dispatching; a no-op if the thread is already running
    pub fn start(&self) -> QueueResult<()> {
        let mut slot = self.lock_worker()?;

        if let Some(worker) = slot.as_ref() {
            if !worker.handle.is_finished() {
                return Ok(());
            }
        }
        if let Some(finished) = slot.take() {
            self.reap(finished)?;
        }

        if self.queue.is_destroyed() {
            return Err(QueueError::Destroyed {
                queue: self.queue.name().to_string(),
            });
        }
        self.queue.clear_stop_request()?;

        let name = format!("ftqueue-dispatch:{}", self.queue.name());
        let queue = Arc::clone(&self.queue);
        let exit = Arc::new(AtomicU8::new(WORKER_RUNNING));
        let exit_flag = Arc::clone(&exit);
        let live = LiveThread::enter(&self.live_threads);

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let _live = live;
                dispatch_loop(queue, exit_flag)
            })
            .map_err(|e| QueueError::ThreadSpawn {
                name,
                message: e.to_string(),
            })?;

        log::debug!("Started dispatcher for queue '{}'", self.queue.name());
        *slot = Some(Worker { handle, exit });
        Ok(())
    }

    /// Stop dispatching and wait for the thread to exit
    ///
    /// Events still queued stay queued. Stopping a dispatcher that is not
    /// running is a no-op.
    pub fn stop(&self) -> QueueResult<()> {
        let worker = {
            let mut slot = self.lock_worker()?;
            match slot.as_ref() {
                None => return Ok(()),
                Some(worker) if worker.handle.thread().id() == thread::current().id() => {
                    return Err(QueueError::SelfJoin {
                        queue: self.queue.name().to_string(),
                    });
                }
                Some(worker) => {
                    if !worker.handle.is_finished() {
                        self.queue.stop_dispatch()?;
                    }
                }
            }
            slot.take()
        };

        match worker {
            Some(worker) => self.reap(worker),
            None => Ok(()),
        }
    }

    fn reap(&self, worker: Worker) -> QueueResult<()> {
        match worker.handle.join() {
            Ok(Ok(processed)) => {
                log::debug!(
                    "Dispatcher for queue '{}' exited after {} events",
                    self.queue.name(),
                    processed
                );
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                log::error!("Dispatcher for queue '{}' panicked", self.queue.name());
                Err(QueueError::DispatcherPanicked {
                    queue: self.queue.name().to_string(),
                })
            }
        }
    }

    /// Request teardown without waiting
    ///
    /// The running thread is detached and destroys its queue once its
    /// dispatch loop returns. With no thread running the queue is destroyed
    /// immediately.
    pub fn destroy(&self) -> QueueResult<()> {
        let worker = self.lock_worker()?.take();

        let Some(worker) = worker else {
            return self.queue.destroy();
        };

        let handed_off = worker
            .exit
            .compare_exchange(
                WORKER_RUNNING,
                WORKER_DESTROY_ON_EXIT,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();

        if handed_off {
            log::debug!(
                "Detaching dispatcher for queue '{}' pending destroy",
                self.queue.name()
            );
            self.queue.stop_dispatch()
        } else {
            // already out of its loop
            let _ = self.reap(worker);
            self.queue.destroy()
        }
    }

    /// Stop the thread, then destroy the queue once its open objects drain
    ///
    /// A thread that died in a handler still has its queue destroyed; the
    /// join error is returned afterwards.
    pub fn destroy_wait(&self) -> QueueResult<()> {
        match self.stop() {
            Ok(()) => self.queue.destroy_wait(),
            Err(e @ QueueError::SelfJoin { .. }) => Err(e),
            Err(e) => {
                if let Err(destroy) = self.queue.destroy_wait() {
                    log::warn!(
                        "Destroy of queue '{}' after failed stop also failed: {}",
                        self.queue.name(),
                        destroy
                    );
                }
                Err(e)
            }
        }
    }
}

fn dispatch_loop(queue: Arc<EventQueue>, exit: Arc<AtomicU8>) -> QueueResult<usize> {
    log::trace!("Dispatch thread for queue '{}' running", queue.name());
    let result = queue.dispatch();

    let destroy_requested = exit
        .compare_exchange(
            WORKER_RUNNING,
            WORKER_EXITED,
            Ordering::AcqRel,
            Ordering::Acquire,
        )
        .is_err();

    if destroy_requested {
        if let Err(e) = queue.destroy_wait() {
            log::warn!("Deferred destroy of queue '{}' failed: {}", queue.name(), e);
        }
    }
    result
}

impl Drop for DispatcherThread {
    fn drop(&mut self) {
        let running = match self.worker.get_mut() {
            Ok(slot) => slot.as_ref().is_some_and(|w| !w.handle.is_finished()),
            Err(_) => false,
        };
        if running {
            log::warn!(
                "Dispatcher for queue '{}' dropped while running; call stop() or destroy() first",
                self.queue.name()
            );
            let _ = self.queue.stop_dispatch();
            if !thread::panicking() {
                debug_assert!(
                    false,
                    "DispatcherThread for queue '{}' leaked without stop/destroy",
                    self.queue.name()
                );
            }
        }
    }
}

impl std::fmt::Debug for DispatcherThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherThread")
            .field("queue", &self.queue.name())
            .field("running", &self.is_running())
            .finish()
    }
}

//! QueueGroup - a fixed pool of dispatched queues handed out round-robin

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::core::sync::handle_mutex_poison;
use crate::queue::dispatcher::DispatcherThread;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::event_queue::{EventQueue, QueueConfig};

/// Group construction parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupConfig {
    /// Prefix for queue names; queue `i` is named `<name>-<i>`
    pub name: String,
    /// Applied to every queue in the group
    pub queue: QueueConfig,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            name: "ftqueue".to_string(),
            queue: QueueConfig::default(),
        }
    }
}

impl GroupConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_queue_config(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }
}

struct GroupInner {
    pairs: Vec<Arc<DispatcherThread>>,
    cursor: usize,
    destroyed: bool,
}

/// Fixed-size set of (queue, dispatcher) pairs
///
/// The cursor and pair list share one mutex. Assignment is strictly
/// sequential with no regard for queue depth.
pub struct QueueGroup {
    name: String,
    count: usize,
    inner: Mutex<GroupInner>,
    live_threads: Arc<AtomicUsize>,
}

impl QueueGroup {
    /// Create `count` queues and start a dispatcher on each
    pub fn new(count: usize, config: GroupConfig) -> QueueResult<Self> {
        if count < 1 {
            return Err(QueueError::InvalidCount { count });
        }
        config.queue.validate()?;

        let live_threads = Arc::new(AtomicUsize::new(0));
        let mut pairs: Vec<Arc<DispatcherThread>> = Vec::with_capacity(count);
        for index in 0..count {
            let queue = EventQueue::create(format!("{}-{}", config.name, index), &config.queue)?;
            let dispatcher =
                DispatcherThread::with_thread_counter(queue, Arc::clone(&live_threads));
            match dispatcher.start() {
                Ok(()) => pairs.push(Arc::new(dispatcher)),
                Err(e) => {
                    log::error!(
                        "Queue group '{}': failed to start queue {}: {}",
                        config.name,
                        index,
                        e
                    );
                    for started in &pairs {
                        let _ = started.destroy_wait();
                    }
                    return Err(e);
                }
            }
        }

        log::info!("Queue group '{}' started with {} queues", config.name, count);
        Ok(Self {
            name: config.name,
            count,
            inner: Mutex::new(GroupInner {
                pairs,
                cursor: 0,
                destroyed: false,
            }),
            live_threads,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn queue_count(&self) -> usize {
        self.count
    }

    fn lock_inner(&self) -> QueueResult<MutexGuard<'_, GroupInner>> {
        handle_mutex_poison(self.inner.lock(), QueueError::lock_poisoned)
    }

    fn live_pairs(&self) -> QueueResult<Vec<Arc<DispatcherThread>>> {
        let inner = self.lock_inner()?;
        if inner.destroyed {
            return Err(QueueError::GroupDestroyed {
                group: self.name.clone(),
            });
        }
        Ok(inner.pairs.clone())
    }

    /// Next queue in round-robin order, or `None` once the group is destroyed
    pub fn next_queue(&self) -> Option<Arc<EventQueue>> {
        let mut inner = self.inner.lock().ok()?;
        if inner.destroyed || inner.pairs.is_empty() {
            return None;
        }
        let queue = Arc::clone(inner.pairs[inner.cursor].queue());
        inner.cursor = (inner.cursor + 1) % inner.pairs.len();
        Some(queue)
    }

    /// Queue at `index` in construction order
    pub fn queue(&self, index: usize) -> Option<Arc<EventQueue>> {
        let inner = self.inner.lock().ok()?;
        if inner.destroyed {
            return None;
        }
        inner.pairs.get(index).map(|pair| Arc::clone(pair.queue()))
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.destroyed)
            .unwrap_or(true)
    }

    /// Number of dispatcher threads currently alive
    ///
    /// Threads detached by [`destroy`](Self::destroy) are counted until they
    /// actually exit.
    pub fn running_dispatchers(&self) -> usize {
        self.live_threads.load(Ordering::Acquire)
    }

    /// Start every dispatcher that is not already running
    pub fn start(&self) -> QueueResult<()> {
        for pair in self.live_pairs()? {
            pair.start()?;
        }
        Ok(())
    }

    /// Stop every dispatcher, blocking until all threads have exited
    pub fn stop(&self) -> QueueResult<()> {
        let mut first_error = None;
        for pair in self.live_pairs()? {
            if let Err(e) = pair.stop() {
                log::warn!("Queue group '{}': stop failed: {}", self.name, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn take_pairs(&self) -> QueueResult<Option<Vec<Arc<DispatcherThread>>>> {
        let mut inner = self.lock_inner()?;
        if inner.destroyed {
            return Ok(None);
        }
        inner.destroyed = true;
        inner.cursor = 0;
        Ok(Some(std::mem::take(&mut inner.pairs)))
    }

    /// Tear the group down without waiting for dispatchers to exit
    ///
    /// Each running dispatcher is detached and destroys its own queue when
    /// it leaves its loop. A second call is a no-op.
    pub fn destroy(&self) -> QueueResult<()> {
        let Some(pairs) = self.take_pairs()? else {
            return Ok(());
        };
        log::debug!("Queue group '{}': destroying {} queues", self.name, pairs.len());

        let mut first_error = None;
        for pair in pairs {
            if let Err(e) = pair.destroy() {
                log::warn!(
                    "Queue group '{}': destroy of '{}' failed: {}",
                    self.name,
                    pair.queue().name(),
                    e
                );
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Tear the group down, returning only after every dispatcher has exited
    /// and every queue is destroyed
    pub fn destroy_wait(&self) -> QueueResult<()> {
        let Some(pairs) = self.take_pairs()? else {
            return Ok(());
        };
        log::debug!(
            "Queue group '{}': destroying {} queues (waiting)",
            self.name,
            pairs.len()
        );

        let mut first_error = None;
        for pair in pairs {
            if let Err(e) = pair.destroy_wait() {
                log::warn!(
                    "Queue group '{}': destroy of '{}' failed: {}",
                    self.name,
                    pair.queue().name(),
                    e
                );
                first_error.get_or_insert(e);
            }
        }
        log::info!("Queue group '{}' destroyed", self.name);
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for QueueGroup {
    fn drop(&mut self) {
        let Ok(inner) = self.inner.get_mut() else {
            return;
        };
        if inner.destroyed {
            return;
        }
        log::warn!(
            "Queue group '{}' dropped without destroy(); detaching {} dispatchers",
            self.name,
            inner.pairs.len()
        );
        inner.destroyed = true;
        for pair in inner.pairs.drain(..) {
            let _ = pair.destroy();
        }
        if !std::thread::panicking() {
            debug_assert!(
                false,
                "QueueGroup '{}' leaked without destroy/destroy_wait",
                self.name
            );
        }
    }
}

impl std::fmt::Debug for QueueGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueGroup")
            .field("name", &self.name)
            .field("count", &self.count)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

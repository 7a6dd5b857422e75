//! Lifecycle Tests - teardown ordering and open-object draining

#[cfg(test)]
mod tests {
    use crate::queue::api::{
        DispatcherThread, EventQueue, GroupConfig, QueueError, QueueGroup, Timer,
    };
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn test_group_destroy_wait_returns_after_all_threads_exit() {
        let group = QueueGroup::new(3, GroupConfig::named("slow")).unwrap();
        let finished = Arc::new(AtomicBool::new(false));

        let queue = group.next_queue().unwrap();
        let flag = Arc::clone(&finished);
        queue
            .enqueue(move || {
                thread::sleep(Duration::from_millis(150));
                flag.store(true, Ordering::SeqCst);
            })
            .unwrap();
        while !queue.is_dispatching() || queue.event_count().unwrap() > 0 {
            thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(group.running_dispatchers(), 3);

        group.destroy_wait().unwrap();

        // the in-flight handler completed before destroy_wait returned
        assert!(finished.load(Ordering::SeqCst));
        assert_eq!(group.running_dispatchers(), 0);
        for index in 0..3 {
            assert!(group.queue(index).is_none());
        }
        assert!(queue.is_destroyed());
    }

    #[test]
    fn test_group_non_blocking_destroy() {
        let group = QueueGroup::new(2, GroupConfig::named("fast")).unwrap();
        let queues: Vec<_> = (0..2).map(|_| group.next_queue().unwrap()).collect();
        queues[0]
            .enqueue(|| thread::sleep(Duration::from_millis(300)))
            .unwrap();
        while !queues[0].is_dispatching() || queues[0].event_count().unwrap() > 0 {
            thread::sleep(Duration::from_millis(1));
        }

        group.destroy().unwrap();
        assert!(group.is_destroyed());
        assert!(group.next_queue().is_none());
        // the thread running the slow handler is detached, not gone
        assert!(group.running_dispatchers() >= 1);

        let deadline = Instant::now() + Duration::from_secs(2);
        while group.running_dispatchers() > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(group.running_dispatchers(), 0);
        assert!(queues.iter().all(|q| q.is_destroyed()));
    }

    #[test]
    fn test_destroy_wait_dispatches_until_timer_released() {
        let queue = EventQueue::new("drain");
        let dispatcher = DispatcherThread::spawn(Arc::clone(&queue)).unwrap();

        // the timer tears itself down from its own callback
        let slot: Arc<Mutex<Option<Timer>>> = Arc::new(Mutex::new(None));
        let inner = Arc::clone(&slot);
        let timer = Timer::create(&queue, "self-destruct", Duration::from_millis(20), move || {
            if let Some(timer) = inner.lock().unwrap().take() {
                timer.destroy().unwrap();
            }
        })
        .unwrap();
        *slot.lock().unwrap() = Some(timer);

        dispatcher.stop().unwrap();
        assert_eq!(queue.open_objects(), 1);

        // stop() leaves the timer registered; destroy_wait keeps dispatching
        dispatcher.destroy_wait().unwrap();
        assert!(queue.is_destroyed());
        assert_eq!(queue.open_objects(), 0);
    }

    #[test]
    fn test_work_after_destroy_is_rejected() {
        let group = QueueGroup::new(1, GroupConfig::default()).unwrap();
        let queue = group.next_queue().unwrap();
        group.destroy_wait().unwrap();

        assert!(matches!(
            queue.enqueue(|| {}),
            Err(QueueError::Destroyed { .. })
        ));
        assert!(matches!(
            Timer::create(&queue, "late", Duration::from_millis(10), || {}),
            Err(QueueError::Destroyed { .. })
        ));
    }
}

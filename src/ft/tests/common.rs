//! Shared harness for FT scenario tests

use crate::ft::api::{FtMechanism, FtMember, FtSetup, FtState, FtStateChange, LoopbackTransport};
use crate::queue::api::{DispatcherThread, EventQueue};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

pub(crate) const HEARTBEAT: Duration = Duration::from_millis(20);
pub(crate) const TIMEOUT: Duration = Duration::from_millis(120);

/// Poll `condition` until it holds or `limit` passes
pub(crate) fn wait_until(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + limit;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

/// One member on its own dispatched queue, recording every callback
pub(crate) struct Node {
    pub member: Arc<FtMember>,
    pub dispatcher: DispatcherThread,
    pub changes: Arc<Mutex<Vec<FtStateChange>>>,
    pub callback_threads: Arc<Mutex<Vec<Option<String>>>>,
}

impl Node {
    pub fn set_up(
        name: &str,
        transport: &Arc<LoopbackTransport>,
        group: &str,
        weight: u32,
    ) -> Node {
        Self::set_up_with(name, transport, group, weight, FtMechanism::Multicast)
    }

    pub fn set_up_with(
        name: &str,
        transport: &Arc<LoopbackTransport>,
        group: &str,
        weight: u32,
        mechanism: FtMechanism,
    ) -> Node {
        let dispatcher = DispatcherThread::spawn(EventQueue::new(name)).unwrap();
        let changes = Arc::new(Mutex::new(Vec::new()));
        let callback_threads = Arc::new(Mutex::new(Vec::new()));

        let member = FtMember::create();
        let record = Arc::clone(&changes);
        let threads = Arc::clone(&callback_threads);
        member
            .setup(
                FtSetup::new(Arc::clone(dispatcher.queue()), transport.clone(), group)
                    .with_mechanism(mechanism)
                    .with_weight(weight)
                    .with_intervals(HEARTBEAT, TIMEOUT),
                move |change: &FtStateChange| {
                    threads
                        .lock()
                        .unwrap()
                        .push(thread::current().name().map(str::to_string));
                    record.lock().unwrap().push(change.clone());
                },
            )
            .unwrap();

        Node {
            member,
            dispatcher,
            changes,
            callback_threads,
        }
    }

    pub fn start(name: &str, transport: &Arc<LoopbackTransport>, group: &str, weight: u32) -> Node {
        let node = Self::set_up(name, transport, group, weight);
        node.member.activate().unwrap();
        node
    }

    pub fn state(&self) -> FtState {
        self.member.state().unwrap()
    }

    /// States reported through the callback, in delivery order
    pub fn reported(&self) -> Vec<FtState> {
        self.changes.lock().unwrap().iter().map(|c| c.state).collect()
    }

    pub fn last_reported(&self) -> Option<FtState> {
        self.changes.lock().unwrap().last().map(|c| c.state)
    }

    pub fn shutdown(self) {
        self.member.destroy().unwrap();
        self.dispatcher.destroy_wait().unwrap();
    }
}

//! Demo runner: a queue group hosting one FT group of in-process members
//!
//! Each member is bound to the next queue of the group, so with enough
//! queues every member's callbacks run on a different dispatch thread.
//! Heartbeats travel over a [`LoopbackTransport`].

use std::sync::{Arc, Mutex};

use crate::app::cli::config::AppConfig;
use crate::core::error_handling::ContextualError;
use crate::core::status::{HasStatus, Status};
use crate::core::sync::handle_mutex_poison;
use crate::ft::{FtError, FtMember, FtSetup, FtState, FtStateChange, LoopbackTransport};
use crate::queue::{QueueError, QueueGroup};

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Ft(#[from] FtError),

    #[error("Queue group has no queue to bind member {index} to")]
    NoQueue { index: usize },
}

impl HasStatus for RunnerError {
    fn status(&self) -> Status {
        match self {
            RunnerError::Queue(inner) => inner.status(),
            RunnerError::Ft(inner) => inner.status(),
            RunnerError::NoQueue { .. } => Status::InvalidState,
        }
    }
}

impl ContextualError for RunnerError {
    fn is_user_actionable(&self) -> bool {
        match self {
            RunnerError::Queue(inner) => inner.is_user_actionable(),
            RunnerError::Ft(inner) => inner.is_user_actionable(),
            RunnerError::NoQueue { .. } => false,
        }
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            RunnerError::Queue(inner) => inner.user_message(),
            RunnerError::Ft(inner) => inner.user_message(),
            RunnerError::NoQueue { .. } => None,
        }
    }
}

struct RunnerMember {
    member: Arc<FtMember>,
    weight: u32,
    queue: String,
}

/// Running queue group plus FT members
pub struct DemoRunner {
    group: QueueGroup,
    transport: Arc<LoopbackTransport>,
    members: Vec<RunnerMember>,
    transitions: Arc<Mutex<Vec<FtStateChange>>>,
}

impl DemoRunner {
    /// Start the queue group and activate one member per configured weight
    ///
    /// On failure everything started so far is torn down.
    pub fn start(config: &AppConfig) -> Result<Self, RunnerError> {
        let group = QueueGroup::new(config.queues.count, config.group_config())?;
        let mut runner = Self {
            group,
            transport: LoopbackTransport::new(format!("{}-loopback", config.ft.group)),
            members: Vec::with_capacity(config.ft.members.len()),
            transitions: Arc::new(Mutex::new(Vec::new())),
        };

        for (index, &weight) in config.ft.members.iter().enumerate() {
            if let Err(e) = runner.add_member(config, index, weight) {
                if let Err(teardown) = runner.teardown() {
                    log::warn!("Teardown after failed start also failed: {}", teardown);
                }
                return Err(e);
            }
        }

        log::info!(
            "FT group '{}' running {} member(s) on {} queue(s) via {}",
            config.ft.group,
            runner.members.len(),
            runner.group.queue_count(),
            config.ft.mechanism
        );
        Ok(runner)
    }

    fn add_member(
        &mut self,
        config: &AppConfig,
        index: usize,
        weight: u32,
    ) -> Result<(), RunnerError> {
        let queue = self.group.next_queue().ok_or(RunnerError::NoQueue { index })?;
        let queue_name = queue.name().to_string();
        let setup = FtSetup::new(queue, self.transport.clone(), config.ft.group.clone())
            .with_mechanism(config.ft.mechanism)
            .with_weight(weight)
            .with_intervals(config.heartbeat_interval(), config.timeout_interval());

        let member = FtMember::create();
        let transitions = Arc::clone(&self.transitions);
        member.setup(setup, move |change: &FtStateChange| {
            log::info!(
                "FT group '{}': {} {} -> {}",
                change.group_name,
                change.instance_id,
                change.previous,
                change.state
            );
            if let Ok(mut history) = transitions.lock() {
                history.push(change.clone());
            }
        })?;

        log::debug!(
            "Member {} (weight {}) bound to queue '{}'",
            member.instance_id()?,
            weight,
            queue_name
        );

        // tracked before activation so a failure still destroys it
        self.members.push(RunnerMember {
            member: Arc::clone(&member),
            weight,
            queue: queue_name,
        });
        member.activate()?;
        Ok(())
    }

    pub fn transport(&self) -> &Arc<LoopbackTransport> {
        &self.transport
    }

    pub fn members(&self) -> Vec<Arc<FtMember>> {
        self.members.iter().map(|m| Arc::clone(&m.member)).collect()
    }

    /// Weights of the members currently in the Active state
    pub fn active_weights(&self) -> Vec<u32> {
        self.members
            .iter()
            .filter(|m| matches!(m.member.state(), Ok(FtState::Active)))
            .map(|m| m.weight)
            .collect()
    }

    /// Every reported transition so far, in delivery order
    pub fn transitions(&self) -> Result<Vec<FtStateChange>, RunnerError> {
        let history = handle_mutex_poison(self.transitions.lock(), QueueError::lock_poisoned)?;
        Ok(history.clone())
    }

    /// Log one line per member with its state and queue
    pub fn log_summary(&self) {
        for m in &self.members {
            let state = m
                .member
                .state()
                .map(|s| s.to_string())
                .unwrap_or_else(|e| e.to_string());
            log::info!("  weight {:>10}  {:<8} on {}", m.weight, state, m.queue);
        }
    }

    /// Destroy every member, then the queue group, waiting for all dispatchers
    pub fn shutdown(mut self) -> Result<(), RunnerError> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<(), RunnerError> {
        let mut first_error: Option<RunnerError> = None;

        for m in self.members.drain(..) {
            if let Err(e) = m.member.destroy() {
                log::warn!("Destroying FT member failed: {}", e);
                first_error.get_or_insert(e.into());
            }
        }
        if !self.group.is_destroyed() {
            if let Err(e) = self.group.destroy_wait() {
                first_error.get_or_insert(e.into());
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

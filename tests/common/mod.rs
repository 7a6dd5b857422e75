//! Common test utilities and helpers

use std::time::{Duration, Instant};

use ftqueue::app::cli::config::AppConfig;

/// Poll `condition` until it holds or `limit` elapses
pub fn wait_until(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Runner configuration with short FT intervals
#[allow(dead_code)]
pub fn fast_config(group: &str, queues: usize, weights: &[u32]) -> AppConfig {
    let mut config = AppConfig::default();
    config.queues.count = queues;
    config.queues.poll_interval_ms = 20;
    config.ft.group = group.to_string();
    config.ft.heartbeat_interval_ms = 20;
    config.ft.timeout_interval_ms = 120;
    config.ft.members = weights.to_vec();
    config
}

//! FT failover integration tests
//!
//! Whole demo runner scenarios: one queue group, several members of one FT
//! group exchanging heartbeats over the loopback transport.

mod common;

use std::time::Duration;

use common::{fast_config, wait_until};
use ftqueue::app::runner::DemoRunner;
use ftqueue::ft::{FtMechanism, FtState};

const SETTLE: Duration = Duration::from_secs(3);

#[test]
fn test_heaviest_member_becomes_the_only_active() {
    let runner = DemoRunner::start(&fast_config("heaviest", 3, &[5, 10, 7])).unwrap();

    assert!(wait_until(SETTLE, || runner.active_weights() == vec![10]));
    // remains stable over several timeout intervals
    std::thread::sleep(Duration::from_millis(400));
    assert_eq!(runner.active_weights(), vec![10]);

    let transitions = runner.transitions().unwrap();
    assert!(transitions.iter().all(|change| change.group_name == "heaviest"));
    assert_eq!(
        transitions
            .iter()
            .filter(|change| change.state == FtState::Active)
            .count(),
        1
    );

    runner.shutdown().unwrap();
}

#[test]
fn test_failover_to_next_heaviest() {
    let runner = DemoRunner::start(&fast_config("failover", 3, &[5, 10, 7])).unwrap();
    assert!(wait_until(SETTLE, || runner.active_weights() == vec![10]));

    runner.members()[1].destroy().unwrap();

    assert!(wait_until(SETTLE, || runner.active_weights() == vec![7]));
    runner.shutdown().unwrap();
}

#[test]
fn test_members_sharing_one_queue() {
    let runner = DemoRunner::start(&fast_config("shared", 1, &[1, 2])).unwrap();
    assert!(wait_until(SETTLE, || runner.active_weights() == vec![2]));
    runner.shutdown().unwrap();
}

#[test]
fn test_bridge_mechanism() {
    let mut config = fast_config("bridged", 2, &[3, 9]);
    config.ft.mechanism = FtMechanism::Bridge;
    let runner = DemoRunner::start(&config).unwrap();

    assert!(wait_until(SETTLE, || runner.active_weights() == vec![9]));
    assert_eq!(runner.transport().subscriber_count("FT.bridged"), 2);
    runner.shutdown().unwrap();
}

#[test]
fn test_partition_heals_to_single_active() {
    let runner = DemoRunner::start(&fast_config("split", 2, &[4, 8])).unwrap();
    assert!(wait_until(SETTLE, || runner.active_weights() == vec![8]));

    runner.transport().set_connected(false);
    assert!(wait_until(SETTLE, || runner.active_weights().len() == 2));

    runner.transport().set_connected(true);
    assert!(wait_until(SETTLE, || runner.active_weights() == vec![8]));
    runner.shutdown().unwrap();
}

#[test]
fn test_empty_group_name_fails_start_cleanly() {
    let mut config = fast_config("broken", 2, &[5]);
    config.ft.group = String::new();

    let err = DemoRunner::start(&config).err().expect("empty group must fail");
    assert_eq!(
        ftqueue::core::status::HasStatus::status(&err),
        ftqueue::core::status::Status::InvalidArgument
    );
}

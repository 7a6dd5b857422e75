//! Setup Validation Tests

#[cfg(test)]
mod tests {
    use crate::core::status::{HasStatus, Status};
    use crate::ft::api::{
        FtError, FtMechanism, FtMember, FtSetup, FtState, LoopbackTransport, MAX_WEIGHT,
    };
    use crate::ft::tests::common::Node;
    use crate::queue::api::EventQueue;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_empty_group_name_is_rejected_without_transition() {
        let queue = EventQueue::new("setup");
        let transport = LoopbackTransport::new("bus");
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let member = FtMember::create();
        let err = member
            .setup(FtSetup::new(Arc::clone(&queue), transport, ""), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap_err();

        assert!(matches!(err, FtError::EmptyGroupName));
        assert_eq!(err.status(), Status::InvalidArgument);
        assert!(matches!(member.state(), Err(FtError::NotSetUp)));
        assert!(matches!(member.activate(), Err(FtError::NotSetUp)));

        // nothing was queued and nothing registered
        assert_eq!(queue.event_count().unwrap(), 0);
        assert_eq!(queue.open_objects(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        queue.destroy().unwrap();
    }

    #[test]
    fn test_weight_and_interval_validation() {
        let queue = EventQueue::new("setup");
        let transport = LoopbackTransport::new("bus");
        let member = FtMember::create();
        let base = FtSetup::new(Arc::clone(&queue), transport, "g");

        let err = member
            .setup(base.clone().with_weight(MAX_WEIGHT + 1), |_| {})
            .unwrap_err();
        assert!(matches!(err, FtError::WeightOutOfRange { .. }));

        let err = member
            .setup(
                base.clone()
                    .with_intervals(Duration::ZERO, Duration::from_secs(1)),
                |_| {},
            )
            .unwrap_err();
        assert!(matches!(err, FtError::InvalidInterval { what: "heartbeat" }));

        let err = member
            .setup(
                base.with_intervals(Duration::from_secs(1), Duration::ZERO),
                |_| {},
            )
            .unwrap_err();
        assert_eq!(err.status(), Status::InvalidArgument);
        queue.destroy().unwrap();
    }

    #[test]
    fn test_unsupported_mechanism() {
        let queue = EventQueue::new("setup");
        let transport = LoopbackTransport::with_mechanisms("bridge-only", &[FtMechanism::Bridge]);
        let member = FtMember::create();

        let err = member
            .setup(
                FtSetup::new(Arc::clone(&queue), transport.clone(), "g")
                    .with_mechanism(FtMechanism::Multicast),
                |_| {},
            )
            .unwrap_err();
        assert_eq!(err.status(), Status::Unsupported);

        member
            .setup(
                FtSetup::new(Arc::clone(&queue), transport, "g")
                    .with_mechanism(FtMechanism::Bridge),
                |_| {},
            )
            .unwrap();
        assert_eq!(member.mechanism().unwrap(), FtMechanism::Bridge);
        member.destroy().unwrap();
        queue.destroy().unwrap();
    }

    #[test]
    fn test_getters_reflect_setup() {
        let transport = LoopbackTransport::new("bus");
        let node = Node::set_up("getters", &transport, "quotes", 7);
        let member = &node.member;

        assert_eq!(member.group_name().unwrap(), "quotes");
        assert_eq!(member.weight().unwrap(), 7);
        assert_eq!(
            member.heartbeat_interval().unwrap(),
            Duration::from_millis(20)
        );
        assert_eq!(
            member.timeout_interval().unwrap(),
            Duration::from_millis(120)
        );
        assert_eq!(member.mechanism().unwrap(), FtMechanism::Multicast);
        assert_eq!(member.state().unwrap(), FtState::Unknown);
        assert!(member.instance_id().unwrap().starts_with("quotes."));
        assert!(!member.is_active());
        node.shutdown();
    }

    #[test]
    fn test_instance_id_only_before_activation() {
        let transport = LoopbackTransport::new("bus");
        let node = Node::set_up("ids", &transport, "quotes", 1);
        let generated = node.member.instance_id().unwrap();

        node.member.set_instance_id("primary-feed").unwrap();
        assert_eq!(node.member.instance_id().unwrap(), "primary-feed");
        node.member.set_instance_id("").unwrap();
        assert_eq!(node.member.instance_id().unwrap(), generated);

        node.member.activate().unwrap();
        assert!(matches!(
            node.member.set_instance_id("too-late"),
            Err(FtError::MemberActive { .. })
        ));
        assert!(matches!(
            node.member.setup(
                FtSetup::new(Arc::clone(node.dispatcher.queue()), transport.clone(), "other"),
                |_| {}
            ),
            Err(FtError::MemberActive { .. })
        ));
        node.shutdown();
    }
}

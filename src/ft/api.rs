//! Public API for fault tolerance

// Members
pub use crate::ft::member::{
    FtMember, FtSetup, FtStateCallback, FtStateChange, DEFAULT_HEARTBEAT_INTERVAL,
    DEFAULT_TIMEOUT_INTERVAL, DEFAULT_WEIGHT, MAX_WEIGHT,
};
pub use crate::ft::state::{FtMechanism, FtState, MULTICAST_CHANNEL};

// Heartbeats and identity
pub use crate::ft::heartbeat::{Credentials, Heartbeat};
pub use crate::ft::instance::{generate_instance_id, local_ip, local_pid};

// Transports
pub use crate::ft::transport::{FtTransport, HeartbeatSink, LoopbackTransport, SubscriptionId};

// Error handling
pub use crate::ft::error::{FtError, FtResult};

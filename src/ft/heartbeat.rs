//! Heartbeat payloads and credential ordering
//!
//! Every member publishes a heartbeat each heartbeat interval. A receiver
//! compares the sender's [`Credentials`] with its own; the member holding
//! the greatest credentials among live members is the one that goes active.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::core::version::ft_protocol_version;
use crate::ft::error::{FtError, FtResult};

/// Wire form of a heartbeat, encoded as JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Heartbeat {
    pub version: u32,
    pub group_name: String,
    pub instance_id: String,
    pub weight: u32,
    pub incarnation: u32,
    pub ip: u32,
    pub pid: u32,
    /// Sender believed itself active when this was sent
    pub primary: bool,
}

impl Heartbeat {
    pub fn to_bytes(&self) -> FtResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode and check the protocol version
    pub fn from_bytes(bytes: &[u8]) -> FtResult<Self> {
        let heartbeat: Heartbeat = serde_json::from_slice(bytes)?;
        let expected = ft_protocol_version();
        if heartbeat.version != expected {
            return Err(FtError::ProtocolMismatch {
                received: heartbeat.version,
                expected,
            });
        }
        Ok(heartbeat)
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            weight: self.weight,
            incarnation: self.incarnation,
            ip: self.ip,
            pid: self.pid,
            instance_id: self.instance_id.clone(),
        }
    }
}

/// Election ordering key
///
/// Compared by weight, then incarnation, then IP address, then PID. The
/// instance id breaks the remaining tie between members of one process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub weight: u32,
    pub incarnation: u32,
    pub ip: u32,
    pub pid: u32,
    pub instance_id: String,
}

impl Ord for Credentials {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .cmp(&other.weight)
            .then(self.incarnation.cmp(&other.incarnation))
            .then(self.ip.cmp(&other.ip))
            .then(self.pid.cmp(&other.pid))
            .then_with(|| self.instance_id.cmp(&other.instance_id))
    }
}

impl PartialOrd for Credentials {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Credentials {
    /// True when `self` should win an election against `other`
    pub fn beats(&self, other: &Credentials) -> bool {
        self > other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(weight: u32, incarnation: u32, ip: u32, pid: u32, id: &str) -> Credentials {
        Credentials {
            weight,
            incarnation,
            ip,
            pid,
            instance_id: id.to_string(),
        }
    }

    fn heartbeat() -> Heartbeat {
        Heartbeat {
            version: ft_protocol_version(),
            group_name: "prices".to_string(),
            instance_id: "prices.7f000001.10.0".to_string(),
            weight: 10,
            incarnation: 3,
            ip: 0x7f00_0001,
            pid: 16,
            primary: true,
        }
    }

    #[test]
    fn test_weight_dominates() {
        assert!(creds(10, 0, 0, 0, "a").beats(&creds(5, 99, 99, 99, "z")));
    }

    #[test]
    fn test_tie_breaks_in_order() {
        assert!(creds(5, 2, 0, 0, "a").beats(&creds(5, 1, 9, 9, "z")));
        assert!(creds(5, 1, 9, 0, "a").beats(&creds(5, 1, 8, 9, "z")));
        assert!(creds(5, 1, 9, 9, "a").beats(&creds(5, 1, 9, 8, "z")));
        assert!(creds(5, 1, 9, 9, "b").beats(&creds(5, 1, 9, 9, "a")));
        assert!(!creds(5, 1, 9, 9, "a").beats(&creds(5, 1, 9, 9, "a")));
    }

    #[test]
    fn test_wire_format_uses_camel_case() {
        let bytes = heartbeat().to_bytes().unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("\"groupName\":\"prices\""));
        assert!(text.contains("\"instanceId\""));
        assert_eq!(Heartbeat::from_bytes(&bytes).unwrap(), heartbeat());
    }

    #[test]
    fn test_rejects_garbage_and_foreign_versions() {
        assert!(matches!(
            Heartbeat::from_bytes(b"\x00\x01"),
            Err(FtError::MalformedHeartbeat { .. })
        ));

        let mut foreign = heartbeat();
        foreign.version += 1;
        let bytes = serde_json::to_vec(&foreign).unwrap();
        assert!(matches!(
            Heartbeat::from_bytes(&bytes),
            Err(FtError::ProtocolMismatch { .. })
        ));
    }
}

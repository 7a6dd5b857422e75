//! FT states and mechanisms

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Member state within its FT group
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, AsRefStr, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum FtState {
    Standby,
    Active,
    #[default]
    Unknown,
}

/// How heartbeats travel between members
///
/// Multicast members share one channel and filter by group name; bridge
/// members publish on a per-group channel.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum FtMechanism {
    #[default]
    Multicast,
    Bridge,
}

/// Channel shared by every multicast member
pub const MULTICAST_CHANNEL: &str = "FT.MULTICAST";

impl FtMechanism {
    /// Heartbeat channel for `group` under this mechanism
    pub fn channel(self, group: &str) -> String {
        match self {
            FtMechanism::Multicast => MULTICAST_CHANNEL.to_string(),
            FtMechanism::Bridge => format!("FT.{group}"),
        }
    }
}

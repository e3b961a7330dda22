//! Where, and in what thread state, a read happened.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classifies the origin and context of a read event.
///
/// Closed set. Every consumer matches exhaustively so that adding a variant
/// is a compile error everywhere the distinction matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadCircumstance {
    /// Read on another device of this account, in an ordinary thread.
    OnLinkedDevice,
    /// Read on another device while the thread was an unapproved message request.
    OnLinkedDeviceWhilePendingMessageRequest,
    /// Read on this device, in an ordinary thread.
    OnThisDevice,
    /// Read on this device while the thread was an unapproved message request.
    OnThisDeviceWhilePendingMessageRequest,
}

impl ReadCircumstance {
    /// All circumstances.
    pub const ALL: [ReadCircumstance; 4] = [
        ReadCircumstance::OnLinkedDevice,
        ReadCircumstance::OnLinkedDeviceWhilePendingMessageRequest,
        ReadCircumstance::OnThisDevice,
        ReadCircumstance::OnThisDeviceWhilePendingMessageRequest,
    ];

    /// Combine the two axes into a circumstance.
    pub fn from_parts(on_linked_device: bool, pending_message_request: bool) -> Self {
        match (on_linked_device, pending_message_request) {
            (true, false) => Self::OnLinkedDevice,
            (true, true) => Self::OnLinkedDeviceWhilePendingMessageRequest,
            (false, false) => Self::OnThisDevice,
            (false, true) => Self::OnThisDeviceWhilePendingMessageRequest,
        }
    }

    /// True if the read was observed on a linked device.
    pub fn is_on_linked_device(&self) -> bool {
        match self {
            Self::OnLinkedDevice | Self::OnLinkedDeviceWhilePendingMessageRequest => true,
            Self::OnThisDevice | Self::OnThisDeviceWhilePendingMessageRequest => false,
        }
    }

    /// True if the thread was still an unapproved message request.
    pub fn is_pending_message_request(&self) -> bool {
        match self {
            Self::OnLinkedDeviceWhilePendingMessageRequest
            | Self::OnThisDeviceWhilePendingMessageRequest => true,
            Self::OnLinkedDevice | Self::OnThisDevice => false,
        }
    }

    /// Stable kebab-case name, as used in config files and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnLinkedDevice => "on-linked-device",
            Self::OnLinkedDeviceWhilePendingMessageRequest => {
                "on-linked-device-while-pending-message-request"
            }
            Self::OnThisDevice => "on-this-device",
            Self::OnThisDeviceWhilePendingMessageRequest => {
                "on-this-device-while-pending-message-request"
            }
        }
    }
}

impl fmt::Display for ReadCircumstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown circumstance name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown read circumstance: {0}")]
pub struct UnknownCircumstance(pub String);

impl FromStr for ReadCircumstance {
    type Err = UnknownCircumstance;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCircumstance(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_parts_covers_all_variants() {
        assert_eq!(
            ReadCircumstance::from_parts(true, false),
            ReadCircumstance::OnLinkedDevice
        );
        assert_eq!(
            ReadCircumstance::from_parts(true, true),
            ReadCircumstance::OnLinkedDeviceWhilePendingMessageRequest
        );
        assert_eq!(
            ReadCircumstance::from_parts(false, false),
            ReadCircumstance::OnThisDevice
        );
        assert_eq!(
            ReadCircumstance::from_parts(false, true),
            ReadCircumstance::OnThisDeviceWhilePendingMessageRequest
        );
    }

    #[test]
    fn axes_roundtrip_through_from_parts() {
        for c in ReadCircumstance::ALL {
            let rebuilt =
                ReadCircumstance::from_parts(c.is_on_linked_device(), c.is_pending_message_request());
            assert_eq!(rebuilt, c);
        }
    }

    #[test]
    fn names_parse_back() {
        for c in ReadCircumstance::ALL {
            assert_eq!(c.to_string().parse::<ReadCircumstance>().unwrap(), c);
        }
    }

    #[test]
    fn unknown_name_fails() {
        let err = "on-the-moon".parse::<ReadCircumstance>().unwrap_err();
        assert_eq!(err.to_string(), "unknown read circumstance: on-the-moon");
    }

    #[test]
    fn serde_name_matches_display() {
        let json = serde_json::to_string(&ReadCircumstance::OnThisDeviceWhilePendingMessageRequest)
            .unwrap();
        assert_eq!(json, "\"on-this-device-while-pending-message-request\"");
    }
}

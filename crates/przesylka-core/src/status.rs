use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Canonical shipment lifecycle states shared by all couriers.
///
/// `Delivered`, `Returned` and `Cancelled` are terminal: a parcel in one of
/// those states leaves the active set at the end of the cycle that observed
/// it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalStatus {
    Created,
    InTransport,
    HandedOutForDelivery,
    WaitingForPickup,
    Delivered,
    Returned,
    Cancelled,
    Exception,
    Unknown,
}

impl CanonicalStatus {
    pub const ALL: [Self; 9] = [
        Self::Created,
        Self::InTransport,
        Self::HandedOutForDelivery,
        Self::WaitingForPickup,
        Self::Delivered,
        Self::Returned,
        Self::Cancelled,
        Self::Exception,
        Self::Unknown,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::InTransport => "in_transport",
            Self::HandedOutForDelivery => "handed_out_for_delivery",
            Self::WaitingForPickup => "waiting_for_pickup",
            Self::Delivered => "delivered",
            Self::Returned => "returned",
            Self::Cancelled => "cancelled",
            Self::Exception => "exception",
            Self::Unknown => "unknown",
        }
    }

    /// A terminal parcel is no longer tracked as active.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Returned | Self::Cancelled)
    }
}

impl Display for CanonicalStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| ValidationError::UnknownStatusKey {
                value: value.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_three_states_are_terminal() {
        let terminal: Vec<_> = CanonicalStatus::ALL
            .into_iter()
            .filter(|status| status.is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![
                CanonicalStatus::Delivered,
                CanonicalStatus::Returned,
                CanonicalStatus::Cancelled,
            ]
        );
    }

    #[test]
    fn status_keys_round_trip() {
        for status in CanonicalStatus::ALL {
            assert_eq!(status.as_str().parse::<CanonicalStatus>().ok(), Some(status));
        }
    }
}

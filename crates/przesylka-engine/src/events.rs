//! Events and signals emitted toward the host platform.

use serde::Serialize;

use przesylka_core::{CanonicalStatus, Courier};

use crate::record::ParcelRecord;

/// Notification events fired on the platform bus.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShipmentEvent {
    /// A tracking id appeared that was not in the active set.
    NewShipment {
        courier: Courier,
        shipment_id: String,
        status_raw: Option<String>,
        status_key: CanonicalStatus,
    },
    /// A previously observed shipment changed canonical status.
    StatusChanged {
        courier: Courier,
        shipment_id: String,
        old_status_raw: Option<String>,
        old_status_key: CanonicalStatus,
        new_status_raw: Option<String>,
        new_status_key: CanonicalStatus,
    },
}

impl ShipmentEvent {
    pub fn shipment_id(&self) -> &str {
        match self {
            Self::NewShipment { shipment_id, .. } | Self::StatusChanged { shipment_id, .. } => {
                shipment_id
            }
        }
    }
}

/// Tracked-representation lifecycle signals, keyed by `(courier,
/// tracking_id)` on the platform side.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntitySignal {
    /// Create a tracked representation for a newly active shipment.
    Create { record: ParcelRecord },
    /// Remove the representation: the shipment went terminal or vanished
    /// from the courier's response. Both cases are treated identically.
    Remove {
        courier: Courier,
        shipment_id: String,
    },
}

impl EntitySignal {
    pub fn shipment_id(&self) -> &str {
        match self {
            Self::Create { record } => &record.tracking_id,
            Self::Remove { shipment_id, .. } => shipment_id,
        }
    }
}

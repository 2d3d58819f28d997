//! Per-courier response quirks, colocated.
//!
//! Each courier wraps its parcel list in a different envelope and spells
//! identity and status differently. A [`CourierProfile`] bundles those
//! extraction rules so they are selected once per account and reused, instead
//! of branching on the courier at every call site.

use serde_json::Value;

use crate::courier::Courier;

/// Capability set describing how to read one courier's responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CourierProfile {
    courier: Courier,
}

impl CourierProfile {
    pub const fn for_courier(courier: Courier) -> Self {
        Self { courier }
    }

    pub const fn courier(&self) -> Courier {
        self.courier
    }

    /// Only Pocztex omits status detail from its list endpoint; its summary
    /// records need a per-item detail fetch.
    pub const fn needs_detail_enrichment(&self) -> bool {
        matches!(self.courier, Courier::Pocztex)
    }

    /// Unwrap the courier's list envelope. `None` means the shape was not
    /// recognized; callers treat that as an empty (recoverable) poll.
    pub fn unwrap_list(&self, response: &Value) -> Option<Vec<Value>> {
        if let Value::Array(items) = response {
            // DHL never returns a bare list; everyone else may.
            if self.courier != Courier::Dhl {
                return Some(items.clone());
            }
        }

        let keys: &[&str] = match self.courier {
            Courier::Inpost => &["parcels"],
            Courier::Dpd => &["packages", "parcelList", "shipments"],
            Courier::Dhl => &["shipments"],
            Courier::Pocztex => &["packages", "items", "tracking", "data", "content"],
        };
        let object = response.as_object()?;
        for key in keys {
            if let Some(Value::Array(items)) = object.get(*key) {
                return Some(items.clone());
            }
        }
        None
    }

    /// Derive the tracking id. A record without one cannot be tracked and is
    /// skipped by the reconciliation loop.
    pub fn extract_id(&self, record: &Value) -> Option<String> {
        match self.courier {
            Courier::Inpost | Courier::Dhl => string_field(record, "shipmentNumber"),
            Courier::Dpd => string_field(record, "waybill"),
            Courier::Pocztex => first_present(
                record,
                &[
                    "trackingId",
                    "trackingNumber",
                    "trackingNo",
                    "parcelNumber",
                    "consignmentNumber",
                    "shipmentNumber",
                    "number",
                    "id",
                ],
            ),
        }
    }

    /// Derive the raw status string, or `None` when the record carries none.
    pub fn extract_raw_status(&self, record: &Value) -> Option<String> {
        match self.courier {
            Courier::Inpost | Courier::Dhl => string_field(record, "status"),
            Courier::Dpd => record
                .get("main_status")
                .and_then(|nested| string_field(nested, "status")),
            Courier::Pocztex => pocztex_raw_status(record),
        }
    }
}

fn string_field(record: &Value, key: &str) -> Option<String> {
    record.get(key)?.as_str().map(str::to_owned)
}

/// First non-null field among `keys`, coerced to a string.
fn first_present(record: &Value, keys: &[&str]) -> Option<String> {
    let object = record.as_object()?;
    for key in keys {
        match object.get(*key) {
            None | Some(Value::Null) => continue,
            Some(Value::String(text)) => return Some(text.clone()),
            Some(other) => return Some(other.to_string()),
        }
    }
    None
}

fn pocztex_raw_status(record: &Value) -> Option<String> {
    let status = record.get("status");
    if let Some(Value::String(text)) = status {
        return Some(text.clone());
    }
    if let Some(Value::String(text)) = record.get("state") {
        return Some(text.clone());
    }
    match record.get("stateCode") {
        None | Some(Value::Null) => {}
        Some(Value::String(text)) => return Some(text.clone()),
        Some(other) => return Some(other.to_string()),
    }
    if let Some(object @ Value::Object(_)) = status {
        if let Some(text) = first_present(object, &["name", "label", "description", "code"]) {
            return Some(text);
        }
    }
    first_present(
        record,
        &[
            "statusName",
            "statusText",
            "statusLabel",
            "statusDescription",
            "statusCode",
            "state",
            "stateCode",
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inpost_unwraps_bare_list_and_parcels_object() {
        let profile = CourierProfile::for_courier(Courier::Inpost);
        let bare = json!([{"shipmentNumber": "1"}]);
        assert_eq!(profile.unwrap_list(&bare).map(|v| v.len()), Some(1));

        let wrapped = json!({"parcels": [{"shipmentNumber": "1"}, {"shipmentNumber": "2"}]});
        assert_eq!(profile.unwrap_list(&wrapped).map(|v| v.len()), Some(2));
    }

    #[test]
    fn dpd_envelope_keys_are_checked_in_priority_order() {
        let profile = CourierProfile::for_courier(Courier::Dpd);
        let both = json!({
            "packages": [{"waybill": "a"}],
            "shipments": [{"waybill": "b"}, {"waybill": "c"}],
        });
        let items = profile.unwrap_list(&both).expect("recognized shape");
        assert_eq!(items.len(), 1);
        assert_eq!(profile.extract_id(&items[0]).as_deref(), Some("a"));
    }

    #[test]
    fn dhl_requires_the_shipments_object() {
        let profile = CourierProfile::for_courier(Courier::Dhl);
        assert!(profile.unwrap_list(&json!([{"shipmentNumber": "x"}])).is_none());
        assert!(profile.unwrap_list(&json!({"data": []})).is_none());
        assert_eq!(
            profile.unwrap_list(&json!({"shipments": [{}]})).map(|v| v.len()),
            Some(1)
        );
    }

    #[test]
    fn unrecognized_envelope_is_none() {
        let profile = CourierProfile::for_courier(Courier::Pocztex);
        assert!(profile.unwrap_list(&json!({"unexpected": true})).is_none());
        assert!(profile.unwrap_list(&json!("text")).is_none());
    }

    #[test]
    fn pocztex_id_falls_back_through_the_key_list() {
        let profile = CourierProfile::for_courier(Courier::Pocztex);
        assert_eq!(
            profile.extract_id(&json!({"trackingNumber": "PX1"})).as_deref(),
            Some("PX1")
        );
        assert_eq!(
            profile.extract_id(&json!({"id": 981})).as_deref(),
            Some("981")
        );
        assert_eq!(profile.extract_id(&json!({})), None);
    }

    #[test]
    fn dpd_status_is_nested_under_main_status() {
        let profile = CourierProfile::for_courier(Courier::Dpd);
        let record = json!({"waybill": "W1", "main_status": {"status": "IN_TRANSPORT"}});
        assert_eq!(
            profile.extract_raw_status(&record).as_deref(),
            Some("IN_TRANSPORT")
        );
        assert_eq!(profile.extract_raw_status(&json!({"waybill": "W1"})), None);
    }

    #[test]
    fn pocztex_status_prefers_plain_string_fields() {
        let profile = CourierProfile::for_courier(Courier::Pocztex);
        assert_eq!(
            profile
                .extract_raw_status(&json!({"status": "NADANA", "stateCode": 4}))
                .as_deref(),
            Some("NADANA")
        );
        assert_eq!(
            profile
                .extract_raw_status(&json!({"state": "W TRANSPORCIE"}))
                .as_deref(),
            Some("W TRANSPORCIE")
        );
        assert_eq!(
            profile.extract_raw_status(&json!({"stateCode": 7})).as_deref(),
            Some("7")
        );
    }

    #[test]
    fn pocztex_status_object_yields_its_label() {
        let profile = CourierProfile::for_courier(Courier::Pocztex);
        let record = json!({"status": {"code": "P_KWD", "name": "Awizowana"}});
        assert_eq!(profile.extract_raw_status(&record).as_deref(), Some("Awizowana"));

        let fallback = json!({"statusDescription": "W doręczeniu"});
        assert_eq!(
            profile.extract_raw_status(&fallback).as_deref(),
            Some("W doręczeniu")
        );
    }
}

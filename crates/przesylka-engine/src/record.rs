//! Classified parcel records and their display attributes.

use serde::Serialize;
use serde_json::{json, Map, Value};

use przesylka_core::{CanonicalStatus, Courier};

/// One parcel as observed in a poll cycle: the courier's payload plus the
/// derived identity and status. Only the identity and last status survive
/// across cycles; the payload is rebuilt from each poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParcelRecord {
    pub courier: Courier,
    pub tracking_id: String,
    pub raw_status: Option<String>,
    pub status: CanonicalStatus,
    /// Courier payload, with detail fields merged over the summary where
    /// enrichment applies.
    pub payload: Value,
    /// Raw detail response, kept for display when enrichment ran.
    pub detail: Option<Value>,
}

impl ParcelRecord {
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Raw response JSON for dashboard cards: the detail payload when the
    /// record was enriched, the summary payload otherwise.
    pub fn raw_response_json(&self) -> String {
        self.detail.as_ref().unwrap_or(&self.payload).to_string()
    }

    /// Attribute bag published alongside the status value.
    pub fn attributes(&self) -> Map<String, Value> {
        let mut attrs = Map::new();
        attrs.insert(String::from("courier"), json!(self.courier));
        attrs.insert(String::from("tracking_number"), json!(self.tracking_id));
        attrs.insert(String::from("status_raw"), json!(self.raw_status));
        attrs.insert(String::from("status_key"), json!(self.status));
        attrs.insert(String::from("raw_response"), json!(self.raw_response_json()));

        match self.courier {
            Courier::Inpost => self.add_inpost_attributes(&mut attrs),
            Courier::Dpd => self.add_dpd_attributes(&mut attrs),
            Courier::Dhl => {}
            Courier::Pocztex => self.add_pocztex_attributes(&mut attrs),
        }
        attrs
    }

    // The courier-specific scalar keys keep a stable shape: once their
    // parent structure exists (or unconditionally, for the fixed keys) they
    // are published as null rather than omitted.

    fn add_inpost_attributes(&self, attrs: &mut Map<String, Value>) {
        if let Some(sender) = self.payload.get("sender").and_then(Value::as_object) {
            attrs.insert(
                String::from("sender"),
                sender.get("name").cloned().unwrap_or(Value::Null),
            );
        }
        if self.payload.get("pickUpPoint").is_some_and(Value::is_object) {
            let address = self.payload.pointer("/pickUpPoint/addressDetails");
            let parts: Vec<&str> = ["street", "buildingNumber", "city"]
                .iter()
                .filter_map(|key| address.and_then(|a| a.get(*key)).and_then(Value::as_str))
                .filter(|part| !part.is_empty())
                .collect();
            attrs.insert(String::from("location"), json!(parts.join(", ")));
        }
        attrs.insert(
            String::from("open_code"),
            self.payload.get("openCode").cloned().unwrap_or(Value::Null),
        );
        if let Some(phone) = self
            .payload
            .pointer("/receiver/phoneNumber")
            .and_then(Value::as_object)
        {
            attrs.insert(
                String::from("phone_number"),
                phone.get("value").cloned().unwrap_or(Value::Null),
            );
        }
    }

    fn add_dpd_attributes(&self, attrs: &mut Map<String, Value>) {
        if let Some(sender) = self.payload.get("sender").and_then(Value::as_object) {
            attrs.insert(
                String::from("sender"),
                sender.get("name").cloned().unwrap_or(Value::Null),
            );
        }
    }

    fn add_pocztex_attributes(&self, attrs: &mut Map<String, Value>) {
        for key in ["senderName", "recipientName", "stateDate", "direction", "pickupDate"] {
            attrs.insert(
                snake_case(key),
                self.payload.get(key).cloned().unwrap_or(Value::Null),
            );
        }
        if let Some(history @ Value::Array(_)) = self.payload.get("history") {
            attrs.insert(String::from("history"), history.clone());
        }
    }
}

fn snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 2);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

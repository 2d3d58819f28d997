//! Status normalization.
//!
//! Couriers report shipment state in four different vocabularies: InPost and
//! DPD use enumerated uppercase codes, DHL uses squashed English words, and
//! Pocztex mixes Polish display strings with opaque state codes. The
//! classifier maps all of them onto [`CanonicalStatus`] in two tiers: an
//! exact uppercase table lookup per courier, then an ordered heuristic
//! cascade over the lowercased string and its ASCII-folded variant.

use std::collections::HashMap;

use crate::courier::Courier;
use crate::status::CanonicalStatus;

use CanonicalStatus::{
    Cancelled, Created, Delivered, Exception, HandedOutForDelivery, InTransport, Returned,
    Unknown, WaitingForPickup,
};

const INPOST_TABLE: &[(&str, CanonicalStatus)] = &[
    ("CREATED", Created),
    ("CONFIRMED", Created),
    ("OFFER_SELECTED", Created),
    ("OFFERS_PREPARED", Created),
    ("DISPATCHED_BY_SENDER", InTransport),
    ("DISPATCHED_BY_SENDER_TO_POK", InTransport),
    ("TAKEN_BY_COURIER", InTransport),
    ("TAKEN_BY_COURIER_FROM_POK", InTransport),
    ("COLLECTED_FROM_SENDER", InTransport),
    ("ADOPTED_AT_SOURCE_BRANCH", InTransport),
    ("ADOPTED_AT_SORTING_CENTER", InTransport),
    ("SENT_FROM_SOURCE_BRANCH", InTransport),
    ("SENT_FROM_SORTING_CENTER", InTransport),
    ("ADOPTED_AT_TARGET_BRANCH", InTransport),
    ("READDRESSED", InTransport),
    ("REDIRECT_TO_BOX", InTransport),
    ("PERMANENTLY_REDIRECTED_TO_BOX_MACHINE", InTransport),
    ("PERMANENTLY_REDIRECTED_TO_CUSTOMER_SERVICE_POINT", InTransport),
    ("UNSTACK_FROM_BOX_MACHINE", InTransport),
    ("AVIZO", InTransport),
    ("OUT_FOR_DELIVERY", HandedOutForDelivery),
    ("OUT_FOR_DELIVERY_TO_ADDRESS", HandedOutForDelivery),
    ("UNSTACK_FROM_CUSTOMER_SERVICE_POINT", HandedOutForDelivery),
    ("PICKUP_REMINDER_SENT_ADDRESS", HandedOutForDelivery),
    ("READY_TO_PICKUP", WaitingForPickup),
    ("READY_FOR_COLLECTION", WaitingForPickup),
    ("READY_TO_PICKUP_FROM_BRANCH", WaitingForPickup),
    ("READY_TO_PICKUP_FROM_POK", WaitingForPickup),
    ("READY_TO_PICKUP_FROM_POK_REGISTERED", WaitingForPickup),
    ("PICKUP_REMINDER_SENT", WaitingForPickup),
    ("STACK_IN_BOX_MACHINE", WaitingForPickup),
    ("STACK_IN_CUSTOMER_SERVICE_POINT", WaitingForPickup),
    ("AVIZO_COMPLETED", WaitingForPickup),
    ("DELIVERED", Delivered),
    ("COLLECTED_BY_CUSTOMER", Delivered),
    ("RETURNED_TO_SENDER", Returned),
    ("RETURN_PICKUP_CONFIRMATION_TO_SENDER", Returned),
    ("NOT_COLLECTED", Returned),
    ("PICKUP_TIME_EXPIRED", Returned),
    ("STACK_PARCEL_PICKUP_TIME_EXPIRED", Returned),
    ("STACK_PARCEL_IN_BOX_MACHINE_PICKUP_TIME_EXPIRED", Returned),
    ("CANCELED", Cancelled),
    ("CANCELLED", Cancelled),
    ("CANCELED_REDIRECT_TO_BOX", Cancelled),
    ("DELAY_IN_DELIVERY", Exception),
    ("DELIVERY_ATTEMPT_FAILED", Exception),
    ("UNDELIVERED", Exception),
    ("UNDELIVERED_COD_CASH_RECEIVER", Exception),
    ("UNDELIVERED_INCOMPLETE_ADDRESS", Exception),
    ("UNDELIVERED_LACK_OF_ACCESS_LETTERBOX", Exception),
    ("UNDELIVERED_NO_MAILBOX", Exception),
    ("UNDELIVERED_NOT_LIVE_ADDRESS", Exception),
    ("UNDELIVERED_UNKNOWN_RECEIVER", Exception),
    ("UNDELIVERED_WRONG_ADDRESS", Exception),
    ("REJECTED_BY_RECEIVER", Exception),
    ("MISSING", Exception),
    ("OVERSIZED", Exception),
    ("CLAIMED", Exception),
    ("COD_REJECTED", Exception),
    ("C2X_REJECTED", Exception),
    ("AVIZO_REJECTED", Exception),
    ("COD_COMPLETED", InTransport),
    ("C2X_COMPLETED", InTransport),
    ("OTHER", Unknown),
];

const DPD_TABLE: &[(&str, CanonicalStatus)] = &[
    ("READY_TO_SEND", Created),
    ("RECEIVED_FROM_SENDER", InTransport),
    ("SENT", InTransport),
    ("IN_TRANSPORT", InTransport),
    ("RECEIVED_IN_DEPOT", InTransport),
    ("REDIRECTED", InTransport),
    ("RESCHEDULED", InTransport),
    ("HANDED_OVER_FOR_DELIVERY", HandedOutForDelivery),
    ("READY_TO_PICK_UP", WaitingForPickup),
    ("SELF_PICKUP", WaitingForPickup),
    ("HARD_RESERVED", WaitingForPickup),
    ("DELIVERED", Delivered),
    ("PICKED_UP", Delivered),
    ("RETURNED_TO_SENDER", Returned),
    ("EXPIRED_PICKUP", Returned),
    ("UNSUCCESSFUL_DELIVERY", Exception),
];

const DHL_TABLE: &[(&str, CanonicalStatus)] = &[
    ("NONE", Created),
    ("SHIPMENTINPREPARATION", Created),
    ("INPREPARATION", Created),
    ("WAITINGFORCOURIERPICKUP", Created),
    ("POSTED", InTransport),
    ("SENT", InTransport),
    ("POSTEDATPOINT", InTransport),
    ("PICKEDUPBYCOURIER", InTransport),
    ("ROUTE", InTransport),
    ("REDIRECTED", InTransport),
    ("REDIRECTEDTOPOINT", InTransport),
    ("DELIVERY", HandedOutForDelivery),
    ("FOR_DELIVERY", HandedOutForDelivery),
    ("DELIVERYTOPOINT", HandedOutForDelivery),
    ("DELIVERYTOLOCKER", HandedOutForDelivery),
    ("READY", WaitingForPickup),
    ("DELIVEREDTOPOINT", WaitingForPickup),
    ("DELIVEREDTOLOCKER", WaitingForPickup),
    ("DELIVEREDTOPARCELLOCKER", WaitingForPickup),
    ("DELIVEREDTOPICKUPPOINT", WaitingForPickup),
    ("RETRIEVEDFROMPOINT", Delivered),
    ("RETRIEVEDFROMLOCKER", Delivered),
    ("DELIVERED", Delivered),
    ("ROUTETOSENDER", Returned),
    ("PARCELRETURNSTOSENDER", Returned),
    ("PARCELRETURNEDTOSENDER", Returned),
    ("RETURN", Returned),
    ("RESIGNATED", Cancelled),
    ("ERROR", Exception),
    ("DELIVERYDELAY", Exception),
    ("DELIVERYPROBLEM", Exception),
    ("UNSUCCESSFULATTEMPTATDELIVERY", Exception),
    ("SECONDUNSUCCESSFULATTEMPTATDELIVERY", Exception),
    ("REFUSAL", Exception),
    ("LOST", Exception),
    ("DISPOSED", Exception),
];

const POCZTEX_TABLE: &[(&str, CanonicalStatus)] = &[
    ("PRZYGOTOWANA", Created),
    ("NADANA", InTransport),
    ("W TRANSPORCIE", InTransport),
    ("W DORĘCZENIU", HandedOutForDelivery),
    ("W DORECZENIU", HandedOutForDelivery),
    ("AWIZOWANA", WaitingForPickup),
    ("P_KWD", WaitingForPickup),
    ("ODEBRANA W PUNKCIE", Delivered),
    ("P_OWU", Delivered),
];

/// Immutable per-courier exact-match tables, built once at startup and
/// shared by reference. Keys are the exact uppercase raw statuses.
#[derive(Debug)]
pub struct StatusTables {
    tables: HashMap<Courier, HashMap<&'static str, CanonicalStatus>>,
}

impl StatusTables {
    pub fn new() -> Self {
        let mut tables = HashMap::with_capacity(Courier::ALL.len());
        tables.insert(Courier::Inpost, INPOST_TABLE.iter().copied().collect());
        tables.insert(Courier::Dpd, DPD_TABLE.iter().copied().collect());
        tables.insert(Courier::Dhl, DHL_TABLE.iter().copied().collect());
        tables.insert(Courier::Pocztex, POCZTEX_TABLE.iter().copied().collect());
        Self { tables }
    }

    pub fn lookup(&self, courier: Courier, status_upper: &str) -> Option<CanonicalStatus> {
        self.tables
            .get(&courier)
            .and_then(|table| table.get(status_upper))
            .copied()
    }

    /// Exact-match entries for one courier, used by table-coverage tests.
    pub fn entries(&self, courier: Courier) -> &[(&'static str, CanonicalStatus)] {
        match courier {
            Courier::Inpost => INPOST_TABLE,
            Courier::Dpd => DPD_TABLE,
            Courier::Dhl => DHL_TABLE,
            Courier::Pocztex => POCZTEX_TABLE,
        }
    }
}

impl Default for StatusTables {
    fn default() -> Self {
        Self::new()
    }
}

/// Replace Polish diacritics with their base Latin letters.
///
/// Couriers mix encodings, so heuristic roots are matched against both the
/// raw lowercase string and this folded form.
pub fn fold_polish(input: &str) -> String {
    input
        .chars()
        .map(|ch| match ch {
            'ą' => 'a',
            'ć' => 'c',
            'ę' => 'e',
            'ł' => 'l',
            'ń' => 'n',
            'ó' => 'o',
            'ś' => 's',
            'ż' | 'ź' => 'z',
            other => other,
        })
        .collect()
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Two-tier status classifier: exact table, then heuristic cascade.
#[derive(Debug, Default)]
pub struct Classifier {
    tables: StatusTables,
}

impl Classifier {
    pub fn new() -> Self {
        Self {
            tables: StatusTables::new(),
        }
    }

    pub fn with_tables(tables: StatusTables) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &StatusTables {
        &self.tables
    }

    /// Map a raw courier status onto the canonical taxonomy.
    ///
    /// Exact table hits win; otherwise an ordered substring cascade runs
    /// over the lowercase string and its ASCII-folded variant. Rule order
    /// matters: pickup-point phrasing must resolve before the broader
    /// "delivered" rule, and Polish roots before their English cousins.
    pub fn classify(&self, raw_status: Option<&str>, courier: Courier) -> CanonicalStatus {
        let Some(raw) = raw_status else {
            return Unknown;
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Unknown;
        }

        if let Some(mapped) = self.tables.lookup(courier, &trimmed.to_uppercase()) {
            return mapped;
        }

        let lower = trimmed.to_lowercase();
        let folded = fold_polish(&lower);

        if lower == "ready"
            || contains_any(
                &lower,
                &[
                    "ready for collection",
                    "ready to pick",
                    "ready for pick",
                    "pickup",
                    "collection",
                    "locker",
                    "delivered to point",
                    "delivered to pickup point",
                ],
            )
        {
            return WaitingForPickup;
        }
        if contains_any(&lower, &["picked up", "collected by", "collected"]) {
            return Delivered;
        }
        if lower.contains("delivered") {
            return Delivered;
        }
        if folded.contains("awizo") {
            return WaitingForPickup;
        }
        if contains_any(&folded, &["odebr", "wydan"]) {
            return Delivered;
        }
        if contains_any(&folded, &["dorecz", "dostarcz"]) {
            return Delivered;
        }
        if contains_any(&folded, &["zwrot", "odesl"]) {
            return Returned;
        }
        if contains_any(&folded, &["anul", "rezygn"]) {
            return Cancelled;
        }
        if contains_any(&folded, &["problem", "niedorecz", "odmow"]) {
            return Exception;
        }
        if contains_any(&lower, &["out for delivery", "handed over for delivery"]) {
            return HandedOutForDelivery;
        }
        if lower.contains("return") {
            return Returned;
        }
        if lower.contains("cancel") {
            return Cancelled;
        }
        if contains_any(
            &lower,
            &["fail", "delay", "exception", "undeliver", "missing", "rejected"],
        ) {
            return Exception;
        }
        if contains_any(
            &lower,
            &[
                "transit",
                "in transport",
                "departed",
                "arrived",
                "processed",
                "received",
                "adopted",
            ],
        ) {
            return InTransport;
        }
        if contains_any(
            &lower,
            &[
                "created",
                "pre-transit",
                "label",
                "confirmed",
                "info received",
                "ready to send",
            ],
        ) {
            return Created;
        }

        Unknown
    }
}

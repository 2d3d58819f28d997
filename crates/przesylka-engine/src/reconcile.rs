//! Per-account reconciliation.
//!
//! One cycle polls the courier, enriches where the courier needs it,
//! classifies every record, diffs the result against the previous active
//! set and emits events/signals. A failed cycle applies nothing: the active
//! set and any tracked representations stay as they were, and the next
//! timer tick retries.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{info, warn};

use przesylka_core::{
    now_unix, Classifier, ClientError, Courier, CourierClient, CourierProfile, Session, TokenState,
};

use crate::aggregate::ActiveShipmentsAggregate;
use crate::config::AccountId;
use crate::events::{EntitySignal, ShipmentEvent};
use crate::record::ParcelRecord;

/// A cycle failure. Nothing from the failed cycle was applied.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("{courier} poll failed: {source}")]
    Poll {
        courier: Courier,
        #[source]
        source: ClientError,
    },
    #[error("{courier} session refresh failed: {source}")]
    Refresh {
        courier: Courier,
        #[source]
        source: ClientError,
    },
}

/// Everything one successful cycle produced for the platform.
#[derive(Debug)]
pub struct CycleOutcome {
    pub events: Vec<ShipmentEvent>,
    pub signals: Vec<EntitySignal>,
    /// Every classified record from this poll, terminal ones included.
    pub records: Vec<ParcelRecord>,
    /// Set iff credentials were refreshed this cycle; the platform should
    /// persist this snapshot. At most one per cycle.
    pub persist_session: Option<Session>,
}

#[derive(Debug, Clone, PartialEq)]
struct Observation {
    raw_status: Option<String>,
    status: przesylka_core::CanonicalStatus,
}

/// Reconciliation loop state for one courier account.
pub struct Reconciler {
    account_id: AccountId,
    client: Arc<dyn CourierClient>,
    classifier: Arc<Classifier>,
    profile: CourierProfile,
    active: HashMap<String, Observation>,
    aggregate: Option<Arc<ActiveShipmentsAggregate>>,
}

impl Reconciler {
    pub fn new(
        account_id: AccountId,
        client: Arc<dyn CourierClient>,
        classifier: Arc<Classifier>,
    ) -> Self {
        let profile = client.profile();
        Self {
            account_id,
            client,
            classifier,
            profile,
            active: HashMap::new(),
            aggregate: None,
        }
    }

    /// Publish active counts to `aggregate` after each successful cycle and
    /// detach on teardown.
    pub fn with_aggregate(mut self, aggregate: Arc<ActiveShipmentsAggregate>) -> Self {
        self.aggregate = Some(aggregate);
        self
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn courier(&self) -> Courier {
        self.profile.courier()
    }

    /// Tracking ids currently believed non-terminal.
    pub fn active_ids(&self) -> BTreeSet<String> {
        self.active.keys().cloned().collect()
    }

    /// Run one poll-classify-diff-notify pass.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, CycleError> {
        let mut persist_session = None;

        self.ensure_fresh_session(&mut persist_session).await?;
        let parcels = self.fetch_parcels(&mut persist_session).await?;

        let enriched = if self.profile.needs_detail_enrichment() {
            self.enrich(parcels).await
        } else {
            parcels.into_iter().map(|payload| (payload, None)).collect()
        };

        let records = self.build_records(enriched);
        let outcome = self.apply_diff(records, persist_session);

        if let Some(aggregate) = &self.aggregate {
            aggregate.publish(self.account_id, self.active.len());
        }
        Ok(outcome)
    }

    /// Proactive half of the token lifecycle: refresh before a request when
    /// the known expiry is close, instead of waiting for the 401.
    async fn ensure_fresh_session(
        &self,
        persist: &mut Option<Session>,
    ) -> Result<(), CycleError> {
        let session = self.client.session();
        if session.token_state(now_unix()) == TokenState::Valid || !session.has_refresh_token() {
            return Ok(());
        }
        info!(courier = %self.courier(), "token near or past expiry, refreshing proactively");
        let refreshed = self
            .client
            .refresh_session()
            .await
            .map_err(|source| CycleError::Refresh {
                courier: self.courier(),
                source,
            })?;
        *persist = Some(refreshed);
        Ok(())
    }

    /// Poll the list endpoint, applying the single-retry policy: one
    /// refresh-then-retry for auth rejections, unrecognized envelopes
    /// degrade to an empty poll, everything else fails the cycle.
    async fn fetch_parcels(
        &self,
        persist: &mut Option<Session>,
    ) -> Result<Vec<Value>, CycleError> {
        match self.client.list_parcels().await {
            Ok(parcels) => Ok(parcels),
            Err(error) if error.is_api_shape() => {
                warn!(courier = %self.courier(), error = %error, "treating unrecognized response as empty");
                Ok(Vec::new())
            }
            Err(error) if error.is_auth() => {
                info!(courier = %self.courier(), "session rejected, refreshing token");
                let refreshed =
                    self.client
                        .refresh_session()
                        .await
                        .map_err(|source| CycleError::Refresh {
                            courier: self.courier(),
                            source,
                        })?;
                *persist = Some(refreshed);

                match self.client.list_parcels().await {
                    Ok(parcels) => Ok(parcels),
                    Err(error) if error.is_api_shape() => Ok(Vec::new()),
                    Err(source) => Err(CycleError::Poll {
                        courier: self.courier(),
                        source,
                    }),
                }
            }
            Err(source) => Err(CycleError::Poll {
                courier: self.courier(),
                source,
            }),
        }
    }

    /// Scatter/gather detail enrichment. Each task's outcome is tagged with
    /// its position; one failure never aborts the gather, the affected item
    /// just keeps its summary record.
    async fn enrich(&self, parcels: Vec<Value>) -> Vec<(Value, Option<Value>)> {
        let mut tasks: JoinSet<(usize, Option<Value>)> = JoinSet::new();
        for (index, parcel) in parcels.iter().enumerate() {
            let Some(detail_id) = detail_fetch_id(parcel) else {
                continue;
            };
            let client = Arc::clone(&self.client);
            tasks.spawn(async move {
                match client.parcel_detail(&detail_id).await {
                    Ok(detail) => (index, Some(detail)),
                    Err(error) => {
                        warn!(
                            parcel = %detail_id,
                            error = %error,
                            "detail fetch failed, keeping summary record"
                        );
                        (index, None)
                    }
                }
            });
        }

        let mut details: Vec<Option<Value>> = vec![None; parcels.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, detail)) => details[index] = detail,
                Err(join_error) => warn!(error = %join_error, "detail task aborted"),
            }
        }

        parcels
            .into_iter()
            .zip(details)
            .map(|(payload, detail)| merge_detail(payload, detail))
            .collect()
    }

    fn build_records(&self, items: Vec<(Value, Option<Value>)>) -> Vec<ParcelRecord> {
        let mut records = Vec::with_capacity(items.len());
        for (payload, detail) in items {
            let Some(tracking_id) = self.profile.extract_id(&payload) else {
                // Untrackable without an id; nothing to reconcile against.
                warn!(courier = %self.courier(), "skipping record without a tracking id");
                continue;
            };
            let raw_status = self.profile.extract_raw_status(&payload);
            let status = self.classifier.classify(raw_status.as_deref(), self.courier());
            records.push(ParcelRecord {
                courier: self.courier(),
                tracking_id,
                raw_status,
                status,
                payload,
                detail,
            });
        }
        records
    }

    fn apply_diff(
        &mut self,
        records: Vec<ParcelRecord>,
        persist_session: Option<Session>,
    ) -> CycleOutcome {
        let mut events = Vec::new();
        let mut signals = Vec::new();

        // Status changes are reported for anything previously active that
        // is still present, including shipments that just went terminal.
        for record in &records {
            if let Some(previous) = self.active.get(&record.tracking_id) {
                if previous.status != record.status {
                    events.push(ShipmentEvent::StatusChanged {
                        courier: record.courier,
                        shipment_id: record.tracking_id.clone(),
                        old_status_raw: previous.raw_status.clone(),
                        old_status_key: previous.status,
                        new_status_raw: record.raw_status.clone(),
                        new_status_key: record.status,
                    });
                }
            }
        }

        let mut next_active: HashMap<String, Observation> = HashMap::new();
        for record in &records {
            if record.is_terminal() {
                continue;
            }
            let seen_before = self.active.contains_key(&record.tracking_id)
                || next_active.contains_key(&record.tracking_id);
            if !seen_before {
                events.push(ShipmentEvent::NewShipment {
                    courier: record.courier,
                    shipment_id: record.tracking_id.clone(),
                    status_raw: record.raw_status.clone(),
                    status_key: record.status,
                });
                signals.push(EntitySignal::Create {
                    record: record.clone(),
                });
            }
            next_active.insert(
                record.tracking_id.clone(),
                Observation {
                    raw_status: record.raw_status.clone(),
                    status: record.status,
                },
            );
        }

        // Terminal and vanished shipments leave the same way.
        for tracking_id in self.active.keys() {
            if !next_active.contains_key(tracking_id) {
                signals.push(EntitySignal::Remove {
                    courier: self.courier(),
                    shipment_id: tracking_id.clone(),
                });
            }
        }

        self.active = next_active;
        CycleOutcome {
            events,
            signals,
            records,
            persist_session,
        }
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        if let Some(aggregate) = &self.aggregate {
            aggregate.detach(self.account_id);
        }
    }
}

/// Detail-endpoint id for a Pocztex summary record. Distinct from the
/// tracking id: the detail endpoint keys on the courier's internal id when
/// one is present.
fn detail_fetch_id(parcel: &Value) -> Option<String> {
    for key in ["id", "trackingId", "trackingID"] {
        match parcel.get(key) {
            None | Some(Value::Null) => continue,
            Some(Value::String(text)) => return Some(text.clone()),
            Some(other) => return Some(other.to_string()),
        }
    }
    None
}

/// Merge detail fields over the summary record, keeping the raw detail
/// payload for display. Merge is by identity only; ordering of the gather
/// never matters.
fn merge_detail(mut payload: Value, detail: Option<Value>) -> (Value, Option<Value>) {
    if let Some(detail_value) = &detail {
        if let (Some(target), Some(fields)) = (payload.as_object_mut(), detail_value.as_object()) {
            for (key, value) in fields {
                target.insert(key.clone(), value.clone());
            }
        }
    }
    (payload, detail)
}

//! Reconciliation engine over the courier clients in `przesylka-core`.
//!
//! One account is one [`Reconciler`]: a poll-classify-diff loop that turns
//! courier responses into status events and tracked-representation signals
//! for the host platform. [`spawn_poller`] wraps a loop in a scheduled
//! tokio task, and [`ActiveShipmentsAggregate`] sums active shipments
//! across accounts.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use przesylka_core::{Classifier, Courier, ReqwestHttpClient};
//! use przesylka_engine::{
//!     spawn_poller, AccountConfig, AccountId, Reconciler, DEFAULT_POLL_INTERVAL,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = AccountConfig::new(Courier::Inpost);
//! config.access_token = Some(std::env::var("INPOST_TOKEN")?);
//!
//! let client = config.build_client(Arc::new(ReqwestHttpClient::new()))?;
//! let reconciler = Reconciler::new(AccountId::new(), client, Arc::new(Classifier::new()));
//!
//! let handle = spawn_poller(reconciler, DEFAULT_POLL_INTERVAL, |outcome| {
//!     for event in outcome.events {
//!         println!("{}", serde_json::to_string(&event).unwrap_or_default());
//!     }
//! });
//! handle.refresh_now().await;
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod config;
pub mod events;
pub mod poller;
pub mod reconcile;
pub mod record;

pub use aggregate::ActiveShipmentsAggregate;
pub use config::{AccountConfig, AccountId};
pub use events::{EntitySignal, ShipmentEvent};
pub use poller::{spawn_poller, PollerHandle, DEFAULT_POLL_INTERVAL};
pub use reconcile::{CycleError, CycleOutcome, Reconciler};
pub use record::ParcelRecord;

//! # Przesylka Core
//!
//! Courier clients and status normalization for the przesylka shipment
//! tracker.
//!
//! ## Overview
//!
//! This crate provides the courier-facing half of the system:
//!
//! - **Canonical status taxonomy** shared by all couriers, with a fixed
//!   terminal subset (delivered, returned, cancelled)
//! - **Two-tier classifier**: exact per-courier tables plus an ordered
//!   heuristic cascade with Polish diacritic folding
//! - **Courier profiles** bundling each courier's envelope/identity/status
//!   extraction quirks
//! - **Client adapters** for InPost, DPD, DHL and Pocztex over an
//!   injectable HTTP transport
//! - **Session state** with the token lifecycle (valid / expiring soon /
//!   expired) and refresh semantics
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Courier adapters (InPost, DPD, DHL, Pocztex) |
//! | [`classify`] | Status tables and the heuristic classifier |
//! | [`client`] | `CourierClient` trait |
//! | [`courier`] | Courier identifiers |
//! | [`error`] | Error taxonomy |
//! | [`profile`] | Per-courier extraction profiles |
//! | [`session`] | Credential state and token lifecycle |
//! | [`status`] | Canonical lifecycle states |
//! | [`transport`] | HTTP client abstraction |
//!
//! ## Error Handling
//!
//! Client calls return [`ClientError`]; the reconciliation loop maps the
//! variants onto its retry policy:
//!
//! ```rust
//! use przesylka_core::ClientError;
//!
//! fn handle_error(error: ClientError) {
//!     match error {
//!         ClientError::Auth { .. } => {
//!             // Refresh the session, retry once
//!         }
//!         ClientError::ApiShape { .. } => {
//!             // Treat the poll as empty
//!         }
//!         _ => {
//!             // Fail the cycle; the next timer tick retries
//!         }
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! Tokens and cookies live only in the in-memory session mirror and the
//! platform's config store; they are never logged.

pub mod adapters;
pub mod classify;
pub mod client;
pub mod courier;
pub mod error;
pub mod profile;
pub mod session;
pub mod status;
pub mod transport;

pub use adapters::{DhlAdapter, DpdAdapter, InpostAdapter, PocztexAdapter};

pub use classify::{fold_polish, Classifier, StatusTables};

pub use client::CourierClient;

pub use courier::Courier;

pub use error::{ClientError, ValidationError};

pub use profile::CourierProfile;

pub use session::{now_unix, Session, TokenState, REFRESH_MARGIN_SECS};

pub use status::CanonicalStatus;

pub use transport::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, NoopHttpClient,
    ReqwestHttpClient,
};

//! Courier client contract.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::courier::Courier;
use crate::error::ClientError;
use crate::profile::CourierProfile;
use crate::session::Session;

/// Courier client contract implemented by each adapter.
///
/// All implementations must be `Send + Sync`; the reconciliation loop shares
/// them behind an `Arc` and the Pocztex enrichment fans detail calls out
/// across tasks.
pub trait CourierClient: Send + Sync {
    /// The courier this client talks to.
    fn courier(&self) -> Courier;

    /// Extraction rules for this courier's responses.
    fn profile(&self) -> CourierProfile {
        CourierProfile::for_courier(self.courier())
    }

    /// Snapshot of the current credential state.
    fn session(&self) -> Session;

    /// Fetch the account's parcel list, already unwrapped from the
    /// courier's envelope.
    ///
    /// # Errors
    ///
    /// `Auth` when the session is rejected (the caller refreshes and retries
    /// once), `ApiShape` when the envelope is unrecognized (the caller
    /// treats the poll as empty), `Transport` otherwise.
    fn list_parcels<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Value>, ClientError>> + Send + 'a>>;

    /// Fetch one parcel's detail record. Only meaningful for couriers whose
    /// profile reports [`CourierProfile::needs_detail_enrichment`].
    fn parcel_detail<'a>(
        &'a self,
        parcel_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ClientError>> + Send + 'a>> {
        let courier = self.courier().as_str();
        let _ = parcel_id;
        Box::pin(async move {
            Err(ClientError::api_shape(
                courier,
                "courier has no per-parcel detail endpoint",
            ))
        })
    }

    /// Exchange the refresh credential for a new access token, mutate the
    /// in-memory session and return the refreshed snapshot so the caller can
    /// request persistence.
    ///
    /// # Errors
    ///
    /// `Refresh` on any failure; the previous credentials are left
    /// unchanged.
    fn refresh_session<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Session, ClientError>> + Send + 'a>>;
}

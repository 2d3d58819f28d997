//! Pocztex (Poczta Polska) mobile API client.
//!
//! Password-grant login with rotating refresh tokens and explicit expiries
//! for both. The list endpoint omits status detail, so the reconciliation
//! loop enriches each summary record through [`parcel_detail`].
//!
//! [`parcel_detail`]: crate::client::CourierClient::parcel_detail

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tracing::info;

use crate::client::CourierClient;
use crate::courier::Courier;
use crate::error::ClientError;
use crate::session::{now_unix, Session};
use crate::transport::{HttpClient, HttpRequest};

const API_URL: &str = "https://mobile-api.pocztex.pl";
const TOKEN_URL: &str = "https://mobile-api.pocztex.pl/auth/token";
const CLIENT_ID: &str = "pocztex-mobile";
const COURIER: &str = Courier::Pocztex.as_str();

pub struct PocztexAdapter {
    http_client: Arc<dyn HttpClient>,
    session: Mutex<Session>,
}

impl PocztexAdapter {
    pub fn new(http_client: Arc<dyn HttpClient>, session: Session) -> Self {
        Self {
            http_client,
            session: Mutex::new(session),
        }
    }

    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn send(&self, request: HttpRequest) -> Result<Value, ClientError> {
        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|error| ClientError::transport(COURIER, error.message()))?;
        if response.is_unauthorized() {
            return Err(ClientError::auth(COURIER, "upstream returned status 401"));
        }
        if !response.is_success() {
            return Err(ClientError::transport(
                COURIER,
                format!("upstream returned status {}", response.status),
            ));
        }
        response
            .json()
            .map_err(|error| ClientError::api_shape(COURIER, error.to_string()))
    }

    /// Password-grant login; stores the token pair and both expiries.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let request = HttpRequest::post(TOKEN_URL).with_form(&[
            ("grant_type", "password"),
            ("client_id", CLIENT_ID),
            ("username", email),
            ("password", password),
        ]);
        let body = self.send(request).await?;
        self.store_token_grant(&body)
            .ok_or_else(|| ClientError::auth(COURIER, "login returned no access_token"))
    }

    fn store_token_grant(&self, body: &Value) -> Option<Session> {
        let access_token = body.get("access_token")?.as_str()?.to_owned();
        let now = now_unix();

        let mut session = self.lock_session();
        session.access_token = Some(access_token);
        if let Some(refresh) = body.get("refresh_token").and_then(Value::as_str) {
            session.refresh_token = Some(refresh.to_owned());
        }
        if let Some(expires_in) = body.get("expires_in").and_then(Value::as_i64) {
            session.expires_at = Some(Session::absolute_expiry(now, expires_in));
        }
        if let Some(refresh_expires_in) = body.get("refresh_expires_in").and_then(Value::as_i64) {
            session.refresh_expires_at = Some(Session::absolute_expiry(now, refresh_expires_in));
        }
        Some(session.clone())
    }
}

impl CourierClient for PocztexAdapter {
    fn courier(&self) -> Courier {
        Courier::Pocztex
    }

    fn session(&self) -> Session {
        self.lock_session().clone()
    }

    fn list_parcels<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Value>, ClientError>> + Send + 'a>> {
        Box::pin(async move {
            let auth = self.lock_session().bearer_auth();
            let request = HttpRequest::get(format!("{API_URL}/api/parcels")).with_auth(&auth);
            let body = self.send(request).await?;
            self.profile()
                .unwrap_list(&body)
                .ok_or_else(|| ClientError::api_shape(COURIER, "parcel list envelope not recognized"))
        })
    }

    fn parcel_detail<'a>(
        &'a self,
        parcel_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ClientError>> + Send + 'a>> {
        Box::pin(async move {
            let auth = self.lock_session().bearer_auth();
            let request = HttpRequest::get(format!(
                "{API_URL}/api/parcels/{}",
                urlencoding::encode(parcel_id)
            ))
            .with_auth(&auth);
            self.send(request).await
        })
    }

    fn refresh_session<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Session, ClientError>> + Send + 'a>> {
        Box::pin(async move {
            let refresh_token = self
                .lock_session()
                .refresh_token
                .clone()
                .ok_or_else(|| ClientError::refresh(COURIER, "no refresh token on session"))?;

            let request = HttpRequest::post(TOKEN_URL).with_form(&[
                ("grant_type", "refresh_token"),
                ("client_id", CLIENT_ID),
                ("refresh_token", refresh_token.as_str()),
            ]);
            let body = self
                .send(request)
                .await
                .map_err(|error| ClientError::refresh(COURIER, error.to_string()))?;

            let session = self
                .store_token_grant(&body)
                .ok_or_else(|| ClientError::refresh(COURIER, "response carried no access_token"))?;
            info!(courier = COURIER, "access token refreshed");
            Ok(session)
        })
    }
}

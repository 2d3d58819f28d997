//! DPD Poland mobile API client.
//!
//! Keycloak-backed SSO: SMS registration yields an authorization code that
//! is exchanged for a token pair, and refreshes use the standard
//! `refresh_token` grant with an `expires_in` window.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{json, Value};
use tracing::info;

use crate::client::CourierClient;
use crate::courier::Courier;
use crate::error::ClientError;
use crate::session::{now_unix, Session};
use crate::transport::{HttpClient, HttpRequest};

const SSO_URL: &str = "https://dpdsso.dpd.com.pl";
const API_URL: &str = "https://mobapp.dpd.com.pl";
const CLIENT_ID: &str = "DPDClientMDU";
const COURIER: &str = Courier::Dpd.as_str();

/// Fallback when the token grant omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: i64 = 300;

pub struct DpdAdapter {
    http_client: Arc<dyn HttpClient>,
    session: Mutex<Session>,
}

impl DpdAdapter {
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

    fn base_request(request: HttpRequest) -> HttpRequest {
        request
            .with_header("accept", "application/json")
            .with_header("user-agent", "DPD Mobile")
    }

    /// Trigger SMS verification for `phone` (digits only, country prefix
    /// stripped by the caller).
    pub async fn send_sms_code(&self, phone: &str) -> Result<(), ClientError> {
        let request =
            Self::base_request(HttpRequest::put(format!("{SSO_URL}/api/phone-verifications/{phone}")));
        self.send(request).await?;
        Ok(())
    }

    /// Complete phone registration and exchange the returned authorization
    /// code for a token pair.
    pub async fn register_with_code(&self, phone: &str, code: &str) -> Result<Session, ClientError> {
        let redirect =
            "https://dpdsso.dpd.com.pl/landing-page?messageType=activeAccount";
        let url = format!(
            "{SSO_URL}/api/users?redirect_uri={}&client_id={}",
            urlencoding::encode(redirect),
            CLIENT_ID
        );
        let request = Self::base_request(HttpRequest::post(url)).with_json(&json!({
            "emailRegistration": null,
            "phoneRegistration": { "phone": phone, "code": code },
            "type": "PhoneBasedUserRegistrationModel",
        }));
        let body = self.send(request).await?;
        let auth_code = body
            .get("code")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::auth(COURIER, "registration returned no code"))?;

        let token_request = Self::base_request(HttpRequest::post(format!(
            "{SSO_URL}/auth/realms/DPD/protocol/openid-connect/token"
        )))
        .with_form(&[
            ("code", auth_code),
            ("grant_type", "authorization_code"),
            ("client_id", CLIENT_ID),
        ]);
        let token_body = self.send(token_request).await?;
        self.store_token_grant(&token_body)
            .ok_or_else(|| ClientError::auth(COURIER, "token grant carried no access_token"))
    }

    fn store_token_grant(&self, body: &Value) -> Option<Session> {
        let access_token = body.get("access_token")?.as_str()?.to_owned();
        let expires_in = body
            .get("expires_in")
            .and_then(Value::as_i64)
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS);

        let mut session = self.lock_session();
        session.access_token = Some(access_token);
        if let Some(refresh) = body.get("refresh_token").and_then(Value::as_str) {
            session.refresh_token = Some(refresh.to_owned());
        }
        session.expires_at = Some(Session::absolute_expiry(now_unix(), expires_in));
        Some(session.clone())
    }
}

impl CourierClient for DpdAdapter {
    fn courier(&self) -> Courier {
        Courier::Dpd
    }

    fn session(&self) -> Session {
        self.lock_session().clone()
    }

    fn list_parcels<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Value>, ClientError>> + Send + 'a>> {
        Box::pin(async move {
            let auth = self.lock_session().bearer_auth();
            let request = Self::base_request(HttpRequest::post(format!(
                "{API_URL}/mdupackageservices/api/v1/packages?userContext=RECEIVER"
            )))
            .with_header("x-mobile-platform", "android")
            .with_header("x-mobile-version", "2.10.2")
            .with_auth(&auth)
            .with_json(&json!({ "alias": null, "sent": null }));

            let body = self.send(request).await?;
            self.profile()
                .unwrap_list(&body)
                .ok_or_else(|| ClientError::api_shape(COURIER, "package list envelope not recognized"))
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

            let request = Self::base_request(HttpRequest::post(format!(
                "{SSO_URL}/auth/realms/DPD/protocol/openid-connect/token"
            )))
            .with_form(&[
                ("refresh_token", refresh_token.as_str()),
                ("grant_type", "refresh_token"),
                ("client_id", CLIENT_ID),
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

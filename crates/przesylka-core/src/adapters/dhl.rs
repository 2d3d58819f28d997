//! DHL Parcel mobile API client.
//!
//! The only courier with a cookie-authenticated session: requests carry both
//! a bearer token and the session cookies, and a refresh may rotate the
//! cookie set alongside the access token.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{json, Value};
use tracing::info;

use crate::client::CourierClient;
use crate::courier::Courier;
use crate::error::ClientError;
use crate::session::Session;
use crate::transport::{HttpClient, HttpRequest, HttpResponse};

const API_URL: &str = "https://moj.dhlparcel.pl/api";
const COURIER: &str = Courier::Dhl.as_str();

pub struct DhlAdapter {
    http_client: Arc<dyn HttpClient>,
    session: Mutex<Session>,
}

impl DhlAdapter {
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

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
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
        Ok(response)
    }

    fn parse_json(response: &HttpResponse) -> Result<Value, ClientError> {
        response
            .json()
            .map_err(|error| ClientError::api_shape(COURIER, error.to_string()))
    }

    fn authed(&self, request: HttpRequest) -> HttpRequest {
        let session = self.lock_session();
        request
            .with_auth(&session.bearer_auth())
            .with_auth(&session.cookie_auth())
    }

    /// Request an SMS verification code for `phone`.
    pub async fn generate_code(&self, phone: &str) -> Result<(), ClientError> {
        let request = HttpRequest::post(format!("{API_URL}/auth/generate-code"))
            .with_json(&json!({ "phoneNumber": phone }));
        self.send(request).await?;
        Ok(())
    }

    /// Validate the SMS code; stores the access token and whatever session
    /// cookies the endpoint sets.
    pub async fn validate_code(
        &self,
        phone: &str,
        code: &str,
        device_id: &str,
    ) -> Result<Session, ClientError> {
        let request = HttpRequest::post(format!("{API_URL}/auth/validate-code")).with_json(&json!({
            "phoneNumber": phone,
            "code": code,
            "deviceId": device_id,
        }));
        let response = self.send(request).await?;
        let body = Self::parse_json(&response)?;
        self.store_auth_response(&body, &response.set_cookies)
            .ok_or_else(|| ClientError::auth(COURIER, "validate-code returned no accessToken"))
    }

    /// The access token appears either at the top level or under `data`.
    fn extract_access_token(body: &Value) -> Option<String> {
        body.get("accessToken")
            .or_else(|| body.get("data").and_then(|data| data.get("accessToken")))
            .and_then(Value::as_str)
            .map(str::to_owned)
    }

    fn store_auth_response(&self, body: &Value, set_cookies: &[(String, String)]) -> Option<Session> {
        let access_token = Self::extract_access_token(body)?;
        let mut session = self.lock_session();
        session.access_token = Some(access_token);
        for (name, value) in set_cookies {
            session.cookies.insert(name.clone(), value.clone());
        }
        Some(session.clone())
    }
}

impl CourierClient for DhlAdapter {
    fn courier(&self) -> Courier {
        Courier::Dhl
    }

    fn session(&self) -> Session {
        self.lock_session().clone()
    }

    fn list_parcels<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Value>, ClientError>> + Send + 'a>> {
        Box::pin(async move {
            let request = self.authed(HttpRequest::get(format!("{API_URL}/shipments")));
            let response = self.send(request).await?;
            let body = Self::parse_json(&response)?;
            self.profile()
                .unwrap_list(&body)
                .ok_or_else(|| ClientError::api_shape(COURIER, "shipments envelope not recognized"))
        })
    }

    fn refresh_session<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Session, ClientError>> + Send + 'a>> {
        Box::pin(async move {
            let device_id = self.lock_session().device_uid.clone();
            let request = self
                .authed(HttpRequest::post(format!("{API_URL}/auth/refresh")))
                .with_json(&json!({ "deviceId": device_id }));
            let response = self
                .send(request)
                .await
                .map_err(|error| ClientError::refresh(COURIER, error.to_string()))?;
            let body = Self::parse_json(&response)
                .map_err(|error| ClientError::refresh(COURIER, error.to_string()))?;

            let session = self
                .store_auth_response(&body, &response.set_cookies)
                .ok_or_else(|| ClientError::refresh(COURIER, "response carried no accessToken"))?;
            info!(courier = COURIER, "access token and cookies refreshed");
            Ok(session)
        })
    }
}

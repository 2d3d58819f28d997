//! InPost mobile API client.
//!
//! Bearer-token sessions established over an SMS code flow. The parcel list
//! comes back either as a bare array or wrapped in `{"parcels": [...]}`.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{json, Value};
use tracing::info;

use crate::client::CourierClient;
use crate::courier::Courier;
use crate::error::ClientError;
use crate::session::Session;
use crate::transport::{HttpClient, HttpRequest};

const API_URL: &str = "https://api-inpost.pl";
const COURIER: &str = Courier::Inpost.as_str();

pub struct InpostAdapter {
    http_client: Arc<dyn HttpClient>,
    session: Mutex<Session>,
}

impl InpostAdapter {
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

    /// Request an SMS verification code for `phone`.
    pub async fn send_sms_code(&self, phone: &str) -> Result<(), ClientError> {
        let request = HttpRequest::post(format!("{API_URL}/v1/sendSMSCode"))
            .with_json(&json!({ "phoneNumber": phone }));
        self.send(request).await?;
        Ok(())
    }

    /// Exchange the SMS code for a token pair and store it on the session.
    pub async fn confirm_sms_code(&self, phone: &str, code: &str) -> Result<Session, ClientError> {
        let device_uid = self.lock_session().device_uid.clone();
        let request = HttpRequest::post(format!("{API_URL}/v1/confirmSMSCode")).with_json(&json!({
            "phoneNumber": phone,
            "smsCode": code,
            "phoneOS": "Android",
            "deviceUid": device_uid,
        }));
        let body = self.send(request).await?;
        self.store_token_pair(&body)
            .ok_or_else(|| ClientError::auth(COURIER, "confirmSMSCode returned no authToken"))
    }

    fn store_token_pair(&self, body: &Value) -> Option<Session> {
        let auth_token = body.get("authToken")?.as_str()?.to_owned();
        let mut session = self.lock_session();
        session.access_token = Some(auth_token);
        if let Some(refresh) = body.get("refreshToken").and_then(Value::as_str) {
            session.refresh_token = Some(refresh.to_owned());
        }
        Some(session.clone())
    }
}

impl CourierClient for InpostAdapter {
    fn courier(&self) -> Courier {
        Courier::Inpost
    }

    fn session(&self) -> Session {
        self.lock_session().clone()
    }

    fn list_parcels<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Value>, ClientError>> + Send + 'a>> {
        Box::pin(async move {
            let auth = self.lock_session().bearer_auth();
            let request = HttpRequest::get(format!("{API_URL}/v1/parcels")).with_auth(&auth);
            let body = self.send(request).await?;
            self.profile()
                .unwrap_list(&body)
                .ok_or_else(|| ClientError::api_shape(COURIER, "parcel list envelope not recognized"))
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

            let request = HttpRequest::post(format!("{API_URL}/v1/authenticate")).with_json(&json!({
                "refreshToken": refresh_token,
                "phoneOS": "Android",
            }));
            let body = self
                .send(request)
                .await
                .map_err(|error| ClientError::refresh(COURIER, error.to_string()))?;

            let session = self
                .store_token_pair(&body)
                .ok_or_else(|| ClientError::refresh(COURIER, "response carried no authToken"))?;
            info!(courier = COURIER, "access token refreshed");
            Ok(session)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{HttpError, HttpResponse};

    struct CannedHttpClient {
        responses: Mutex<Vec<Result<HttpResponse, HttpError>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl CannedHttpClient {
        fn new(responses: Vec<Result<HttpResponse, HttpError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl HttpClient for CannedHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.requests.lock().expect("lock").push(request);
            let response = self.responses.lock().expect("lock").remove(0);
            Box::pin(async move { response })
        }
    }

    #[tokio::test]
    async fn list_sends_bearer_token_and_unwraps_parcels() {
        let client = Arc::new(CannedHttpClient::new(vec![Ok(HttpResponse::ok_json(
            r#"{"parcels": [{"shipmentNumber": "660"}]}"#,
        ))]));
        let adapter = InpostAdapter::new(client.clone(), Session::with_access_token("tok"));

        let parcels = adapter.list_parcels().await.expect("list succeeds");
        assert_eq!(parcels.len(), 1);

        let requests = client.requests.lock().expect("lock");
        assert_eq!(
            requests[0].headers.get("authorization").map(String::as_str),
            Some("Bearer tok")
        );
    }

    #[tokio::test]
    async fn sms_confirmation_stores_the_token_pair() {
        let client = Arc::new(CannedHttpClient::new(vec![Ok(HttpResponse::ok_json(
            r#"{"authToken": "fresh-a", "refreshToken": "fresh-r"}"#,
        ))]));
        let session = Session {
            device_uid: Some(String::from("dev-9")),
            ..Session::default()
        };
        let adapter = InpostAdapter::new(client.clone(), session);

        let confirmed = adapter
            .confirm_sms_code("48123123123", "0000")
            .await
            .expect("confirmation succeeds");
        assert_eq!(confirmed.access_token.as_deref(), Some("fresh-a"));
        assert_eq!(confirmed.refresh_token.as_deref(), Some("fresh-r"));
        assert_eq!(adapter.session(), confirmed);

        let requests = client.requests.lock().expect("lock");
        assert!(requests[0].url.ends_with("/v1/confirmSMSCode"));
        let body = requests[0].body.as_deref().expect("json body");
        assert!(body.contains(r#""phoneNumber":"48123123123""#));
        assert!(body.contains(r#""smsCode":"0000""#));
        assert!(body.contains(r#""phoneOS":"Android""#));
        assert!(body.contains(r#""deviceUid":"dev-9""#));
    }

    #[tokio::test]
    async fn sms_confirmation_without_auth_token_fails_without_touching_session() {
        let client = Arc::new(CannedHttpClient::new(vec![Ok(HttpResponse::ok_json(
            r#"{"status": "PENDING"}"#,
        ))]));
        let adapter = InpostAdapter::new(client, Session::default());

        let error = adapter
            .confirm_sms_code("48123123123", "0000")
            .await
            .expect_err("must fail");
        assert!(error.is_auth());
        assert_eq!(adapter.session().access_token, None);
    }

    #[tokio::test]
    async fn rejected_session_maps_to_auth_error() {
        let client = Arc::new(CannedHttpClient::new(vec![Ok(HttpResponse::with_status(
            401, "",
        ))]));
        let adapter = InpostAdapter::new(client, Session::with_access_token("stale"));

        let error = adapter.list_parcels().await.expect_err("must fail");
        assert!(error.is_auth());
    }

    #[tokio::test]
    async fn refresh_rotates_both_tokens() {
        let client = Arc::new(CannedHttpClient::new(vec![Ok(HttpResponse::ok_json(
            r#"{"authToken": "new-a", "refreshToken": "new-r"}"#,
        ))]));
        let session = Session {
            refresh_token: Some(String::from("old-r")),
            ..Session::with_access_token("old-a")
        };
        let adapter = InpostAdapter::new(client, session);

        let refreshed = adapter.refresh_session().await.expect("refresh succeeds");
        assert_eq!(refreshed.access_token.as_deref(), Some("new-a"));
        assert_eq!(refreshed.refresh_token.as_deref(), Some("new-r"));
        assert_eq!(adapter.session(), refreshed);
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_fails_without_touching_session() {
        let client = Arc::new(CannedHttpClient::new(vec![]));
        let adapter = InpostAdapter::new(client, Session::with_access_token("only-access"));

        let error = adapter.refresh_session().await.expect_err("must fail");
        assert!(matches!(error, ClientError::Refresh { .. }));
        assert_eq!(adapter.session().access_token.as_deref(), Some("only-access"));
    }
}

//! Per-account configuration, as handed over by the host platform.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use przesylka_core::{
    Courier, CourierClient, DhlAdapter, DpdAdapter, HttpClient, InpostAdapter, PocztexAdapter,
    Session, ValidationError,
};

/// Stable identity of one courier account (one config entry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(Uuid);

impl AccountId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Configuration record for one courier account.
///
/// Mirrors what the platform persists: identity of the account plus the
/// credential fields captured at login. Refreshed credentials flow back to
/// the store through the cycle outcome's persistence request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountConfig {
    pub courier: Courier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_uid: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub cookies: BTreeMap<String, String>,
}

impl AccountConfig {
    pub fn new(courier: Courier) -> Self {
        Self {
            courier,
            phone: None,
            email: None,
            access_token: None,
            refresh_token: None,
            token_expires_at: None,
            refresh_expires_at: None,
            device_uid: None,
            cookies: BTreeMap::new(),
        }
    }

    /// Phone or email, whichever identifies the account.
    pub fn account_label(&self) -> &str {
        self.phone
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("unknown")
    }

    pub fn session(&self) -> Session {
        Session {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires_at: self.token_expires_at,
            refresh_expires_at: self.refresh_expires_at,
            device_uid: self.device_uid.clone(),
            cookies: self.cookies.clone(),
        }
    }

    /// Build the courier client for this account over the given transport.
    ///
    /// # Errors
    ///
    /// [`ValidationError::MissingAccessToken`] when the entry was persisted
    /// without a token; such an account needs a manual re-authentication.
    pub fn build_client(
        &self,
        http_client: Arc<dyn HttpClient>,
    ) -> Result<Arc<dyn CourierClient>, ValidationError> {
        if self.access_token.is_none() {
            return Err(ValidationError::MissingAccessToken);
        }
        let session = self.session();
        Ok(match self.courier {
            Courier::Inpost => Arc::new(InpostAdapter::new(http_client, session)),
            Courier::Dpd => Arc::new(DpdAdapter::new(http_client, session)),
            Courier::Dhl => Arc::new(DhlAdapter::new(http_client, session)),
            Courier::Pocztex => Arc::new(PocztexAdapter::new(http_client, session)),
        })
    }

    /// Fold a refreshed session back into the config record, producing what
    /// the platform should persist.
    pub fn with_session(&self, session: &Session) -> Self {
        Self {
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            token_expires_at: session.expires_at,
            refresh_expires_at: session.refresh_expires_at,
            device_uid: session.device_uid.clone().or_else(|| self.device_uid.clone()),
            cookies: session.cookies.clone(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use przesylka_core::NoopHttpClient;

    #[test]
    fn config_without_token_cannot_build_a_client() {
        let config = AccountConfig::new(Courier::Inpost);
        let result = config.build_client(Arc::new(NoopHttpClient));
        assert!(matches!(result, Err(ValidationError::MissingAccessToken)));
    }

    #[test]
    fn refreshed_session_folds_back_into_the_config() {
        let mut config = AccountConfig::new(Courier::Dpd);
        config.phone = Some(String::from("48123123123"));
        config.access_token = Some(String::from("old"));

        let mut session = config.session();
        session.access_token = Some(String::from("new"));
        session.expires_at = Some(1_000);

        let updated = config.with_session(&session);
        assert_eq!(updated.access_token.as_deref(), Some("new"));
        assert_eq!(updated.token_expires_at, Some(1_000));
        assert_eq!(updated.phone.as_deref(), Some("48123123123"));
    }

    #[test]
    fn serde_round_trip_skips_absent_fields() {
        let config = AccountConfig {
            access_token: Some(String::from("t")),
            ..AccountConfig::new(Courier::Pocztex)
        };
        let json = serde_json::to_string(&config).expect("serializes");
        assert!(!json.contains("device_uid"));
        let back: AccountConfig = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(back, config);
    }
}

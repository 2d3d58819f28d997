//! Per-account credential state.
//!
//! The session is an in-memory mirror of what the platform persists in its
//! config store. Adapters mutate it on refresh; the engine snapshots it and
//! raises a persistence request whenever it changed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::transport::HttpAuth;

/// Proactive refreshes start this many seconds before the known expiry.
pub const REFRESH_MARGIN_SECS: i64 = 60;

/// Token lifecycle state for one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Valid,
    /// Within [`REFRESH_MARGIN_SECS`] of the known expiry.
    ExpiringSoon,
    /// Past expiry, rejected upstream, or no token at all.
    Expired,
}

/// Credential/session state for one courier account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Unix seconds; absent for couriers that expose no expiry.
    pub expires_at: Option<i64>,
    pub refresh_expires_at: Option<i64>,
    pub device_uid: Option<String>,
    pub cookies: BTreeMap<String, String>,
}

impl Session {
    pub fn with_access_token(token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn bearer_auth(&self) -> HttpAuth {
        match &self.access_token {
            Some(token) => HttpAuth::BearerToken(token.clone()),
            None => HttpAuth::None,
        }
    }

    pub fn cookie_auth(&self) -> HttpAuth {
        if self.cookies.is_empty() {
            HttpAuth::None
        } else {
            HttpAuth::Cookies(self.cookies.clone())
        }
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Lifecycle state at `now_unix`. Couriers without an expiry timestamp
    /// stay `Valid` until a request is rejected.
    pub fn token_state(&self, now_unix: i64) -> TokenState {
        if self.access_token.is_none() {
            return TokenState::Expired;
        }
        match self.expires_at {
            None => TokenState::Valid,
            Some(expires_at) if now_unix >= expires_at => TokenState::Expired,
            Some(expires_at) if now_unix > expires_at - REFRESH_MARGIN_SECS => {
                TokenState::ExpiringSoon
            }
            Some(_) => TokenState::Valid,
        }
    }

    /// Absolute expiry from a relative `expires_in`, as token grants report.
    pub fn absolute_expiry(now_unix: i64, expires_in_secs: i64) -> i64 {
        now_unix.saturating_add(expires_in_secs)
    }
}

pub fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_is_expired() {
        assert_eq!(Session::default().token_state(0), TokenState::Expired);
    }

    #[test]
    fn no_expiry_stays_valid() {
        let session = Session::with_access_token("t");
        assert_eq!(session.token_state(i64::MAX), TokenState::Valid);
    }

    #[test]
    fn expiry_margin_drives_the_state_machine() {
        let session = Session {
            expires_at: Some(1_000),
            ..Session::with_access_token("t")
        };
        assert_eq!(session.token_state(900), TokenState::Valid);
        assert_eq!(session.token_state(941), TokenState::ExpiringSoon);
        assert_eq!(session.token_state(1_000), TokenState::Expired);
        assert_eq!(session.token_state(1_500), TokenState::Expired);
    }

    #[test]
    fn boundary_at_exactly_the_margin_is_still_valid() {
        let session = Session {
            expires_at: Some(1_000),
            ..Session::with_access_token("t")
        };
        assert_eq!(session.token_state(940), TokenState::Valid);
    }
}

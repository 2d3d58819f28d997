use thiserror::Error;

/// Validation errors for config and domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown courier '{value}', expected one of inpost, dpd, dhl, pocztex")]
    UnknownCourier { value: String },

    #[error("unknown status key '{value}'")]
    UnknownStatusKey { value: String },

    #[error("account is missing an access token")]
    MissingAccessToken,
}

/// Errors surfaced by courier client calls.
///
/// The reconciliation loop maps these onto its single retry policy:
/// `Auth` triggers one refresh followed by one retry, `ApiShape` degrades to
/// an empty result, everything else fails the cycle.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The courier rejected the session (HTTP 401 / unauthorized).
    #[error("{courier} rejected the session: {message}")]
    Auth { courier: &'static str, message: String },

    /// Network failure or a non-auth HTTP error status.
    #[error("{courier} transport failure: {message}")]
    Transport { courier: &'static str, message: String },

    /// The response envelope did not match any known shape. Recoverable;
    /// callers treat the poll as empty.
    #[error("{courier} returned an unrecognized response shape: {message}")]
    ApiShape { courier: &'static str, message: String },

    /// The token refresh call itself failed. Previous credentials are left
    /// unchanged.
    #[error("{courier} token refresh failed: {message}")]
    Refresh { courier: &'static str, message: String },
}

impl ClientError {
    pub fn auth(courier: &'static str, message: impl Into<String>) -> Self {
        Self::Auth {
            courier,
            message: message.into(),
        }
    }

    pub fn transport(courier: &'static str, message: impl Into<String>) -> Self {
        Self::Transport {
            courier,
            message: message.into(),
        }
    }

    pub fn api_shape(courier: &'static str, message: impl Into<String>) -> Self {
        Self::ApiShape {
            courier,
            message: message.into(),
        }
    }

    pub fn refresh(courier: &'static str, message: impl Into<String>) -> Self {
        Self::Refresh {
            courier,
            message: message.into(),
        }
    }

    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    pub const fn is_api_shape(&self) -> bool {
        matches!(self, Self::ApiShape { .. })
    }
}

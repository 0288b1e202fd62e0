//! Error taxonomy for REST calls.
//!
//! Every failure from the request gateway resolves to one of these variants;
//! callers branch on them instead of catching transport exceptions. The
//! mapping rules:
//!
//! | Variant | Trigger | Caller reaction |
//! |---------|---------|-----------------|
//! | `Unauthenticated` | missing token or HTTP 401 | redirect to login |
//! | `Network` | DNS/timeout/connection refused | "backend offline", keep cached data |
//! | `Http` | any other non-2xx | surface message near the triggering view |
//! | `Decode` | 2xx with a malformed body | treated like `Http` by the UI |

use thiserror::Error;

/// Error returned by the request gateway and everything built on it.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No token is held, or the backend rejected the one we sent (401).
    ///
    /// By the time a caller sees this the session store has already been
    /// cleared; the only thing left to do is redirect to login.
    #[error("not authenticated")]
    Unauthenticated,

    /// Transport-level failure before an HTTP status was received.
    #[error("backend unreachable: {message}")]
    Network {
        /// Transport error details.
        message: String,
    },

    /// Non-2xx response other than 401.
    #[error("request failed ({status}): {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Message extracted from the JSON error body, or a generic
        /// status-derived fallback when the body was not parseable.
        message: String,
    },

    /// The response claimed success but the body did not match the schema.
    #[error("failed to decode response: {message}")]
    Decode {
        /// Deserialization error details.
        message: String,
    },
}

impl ApiError {
    /// Whether this failure must be resolved by redirecting to login.
    #[must_use]
    pub const fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::Unauthenticated)
    }

    /// Whether this failure indicates the backend is unreachable.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Human-readable text suitable for display next to the failed view.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthenticated => "Session expired. Please log in again.".to_string(),
            Self::Network { .. } => "Backend is offline. Retry when it is reachable.".to_string(),
            Self::Http { message, .. } => message.clone(),
            Self::Decode { .. } => "Unexpected response from the backend.".to_string(),
        }
    }
}

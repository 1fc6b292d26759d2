//! # Tagged Response Envelope
//!
//! Every read-path operation returns an [`ApiResponse`] labelling its payload
//! with where the data came from. Callers never see a raw error: total
//! failure is a `Fallback`-tagged response with a human-readable reason.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a response payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Provenance {
    /// Fresh data from the live downstream call
    Live,
    /// Stale-but-real data served from the cache
    Cache,
    /// Synthesized default, no usable data source remained
    Fallback,
}

impl Provenance {
    /// Check whether this provenance carries usable (non-synthesized) data
    pub fn is_usable(&self) -> bool {
        matches!(self, Self::Live | Self::Cache)
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => write!(f, "LIVE"),
            Self::Cache => write!(f, "CACHE"),
            Self::Fallback => write!(f, "FALLBACK"),
        }
    }
}

/// Response envelope tagging a payload with its provenance.
///
/// Invariant: `ok == true` exactly when `provenance` is `Live` or `Cache`.
/// The constructors are the only way to build one, so the invariant cannot
/// be violated; instances are never mutated after construction.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub payload: T,
    pub message: String,
    pub provenance: Provenance,
}

impl<T> ApiResponse<T> {
    /// Successful response from the live downstream source
    pub fn live(payload: T) -> Self {
        Self {
            ok: true,
            payload,
            message: "Success".to_string(),
            provenance: Provenance::Live,
        }
    }

    /// Successful response served from the cache
    pub fn cached(payload: T) -> Self {
        Self {
            ok: true,
            payload,
            message: "Success".to_string(),
            provenance: Provenance::Cache,
        }
    }

    /// Degraded response carrying a synthesized default and the reason
    pub fn fallback(payload: T, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            payload,
            message: message.into(),
            provenance: Provenance::Fallback,
        }
    }

    /// Check whether the payload is real data (live or cached)
    pub fn is_usable(&self) -> bool {
        self.ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provenance_invariant() {
        let live = ApiResponse::live(42);
        assert!(live.ok);
        assert_eq!(live.provenance, Provenance::Live);

        let cached = ApiResponse::cached(42);
        assert!(cached.ok);
        assert_eq!(cached.provenance, Provenance::Cache);

        let fallback = ApiResponse::fallback(0, "Service temporarily unavailable");
        assert!(!fallback.ok);
        assert_eq!(fallback.provenance, Provenance::Fallback);
        assert_eq!(fallback.message, "Service temporarily unavailable");
    }

    #[test]
    fn test_provenance_usable() {
        assert!(Provenance::Live.is_usable());
        assert!(Provenance::Cache.is_usable());
        assert!(!Provenance::Fallback.is_usable());
    }

    #[test]
    fn test_provenance_serde() {
        let json = serde_json::to_string(&Provenance::Fallback).unwrap();
        assert_eq!(json, "\"FALLBACK\"");

        let parsed: Provenance = serde_json::from_str("\"CACHE\"").unwrap();
        assert_eq!(parsed, Provenance::Cache);
    }

    #[test]
    fn test_display() {
        assert_eq!(Provenance::Live.to_string(), "LIVE");
        assert_eq!(Provenance::Cache.to_string(), "CACHE");
        assert_eq!(Provenance::Fallback.to_string(), "FALLBACK");
    }
}

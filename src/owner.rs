//! The identity of the account that owns a wallet.
//!
//! Authentication happens upstream. The gateway in front of this service resolves the caller
//! and forwards the owner ID in the [OWNER_ID_HEADER] header.

use std::fmt::Display;

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};

use crate::Error;

/// The request header carrying the authenticated owner ID.
pub const OWNER_ID_HEADER: &str = "x-owner-id";

/// A newtype wrapper for integer owner (account) IDs.
///
/// This helps disambiguate owner IDs from wallet and entry IDs, which are also integers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OwnerId(i64);

impl OwnerId {
    /// Create a new owner ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the owner ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl<S> FromRequestParts<S> for OwnerId
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(OWNER_ID_HEADER)
            .ok_or(Error::MissingOwnerIdentity)?;

        header
            .to_str()
            .ok()
            .and_then(|text| text.trim().parse::<i64>().ok())
            .map(OwnerId::new)
            .ok_or_else(|| {
                tracing::warn!("rejected request with malformed {OWNER_ID_HEADER} header: {header:?}");
                Error::MissingOwnerIdentity
            })
    }
}

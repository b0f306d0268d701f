//! Defines the app level error type and its conversion to JSON responses.
use std::{collections::BTreeMap, fmt::Display};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;

use crate::{money::AmountError, owner::OwnerId};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The request failed validation, e.g. a non-positive or malformed amount.
    ///
    /// No state was changed.
    #[error("invalid request: {0}")]
    Validation(ValidationErrors),

    /// A withdrawal asked for more than the wallet holds.
    ///
    /// No state was changed and no ledger entry was created.
    #[error("insufficient funds: balance {balance} is less than {requested}")]
    InsufficientFunds {
        /// The wallet balance when the withdrawal was checked.
        balance: Decimal,
        /// The amount the caller tried to withdraw.
        requested: Decimal,
    },

    /// Creating the wallet for this owner kept colliding with concurrent creations.
    #[error("could not provision a wallet for owner {0} after repeated conflicts")]
    Conflict(OwnerId),

    /// Another operation held the wallet for longer than the configured lock timeout.
    ///
    /// Nothing was changed, so the caller may retry.
    #[error("timed out waiting for the wallet of owner {0}")]
    WalletBusy(OwnerId),

    /// The request did not carry a usable owner identity.
    #[error("missing or invalid owner identity")]
    MissingOwnerIdentity,

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    ///
    /// Any atomic unit that hit this error was rolled back.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// The blocking task running a ledger operation panicked or was cancelled.
    #[error("a background task failed: {0}")]
    BackgroundTaskFailed(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<ValidationErrors> for Error {
    fn from(errors: ValidationErrors) -> Self {
        Error::Validation(errors)
    }
}

impl From<AmountError> for Error {
    fn from(error: AmountError) -> Self {
        Error::Validation(ValidationErrors::single("amount", error.to_string()))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
            }
            Error::InsufficientFunds { .. } => {
                error_response(StatusCode::BAD_REQUEST, "Insufficient balance")
            }
            Error::MissingOwnerIdentity => {
                error_response(StatusCode::UNAUTHORIZED, "Missing or invalid owner identity")
            }
            Error::NotFound => error_response(StatusCode::NOT_FOUND, "Not found"),
            Error::Conflict(owner_id) => {
                tracing::warn!("wallet provisioning for owner {owner_id} kept conflicting");
                error_response(
                    StatusCode::CONFLICT,
                    "The wallet is being created by another request, try again",
                )
            }
            Error::WalletBusy(_) => error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "The wallet is busy, try again",
            ),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

fn error_response(status_code: StatusCode, message: &str) -> Response {
    (status_code, Json(json!({ "error": message }))).into_response()
}

/// A set of validation messages keyed by the name of the offending field.
///
/// Serializes to a JSON object such as `{"amount": ["A valid number is required."]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    /// The key used for errors that do not belong to a single field.
    pub const NON_FIELD: &'static str = "non_field_errors";

    /// Create an empty error set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an error set holding one message for `field`.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record `message` against `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_owned())
            .or_default()
            .push(message.into());
    }

    /// Whether no errors have been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The messages recorded for `field`, if any.
    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, messages)| format!("{field}: {}", messages.join(" ")))
            .collect();

        write!(f, "{}", parts.join("; "))
    }
}

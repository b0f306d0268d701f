//! Defines the route handler for explicitly creating a wallet.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::{Error, error::ValidationErrors, ledger::WalletLedger, owner::OwnerId};

/// The optional body of a provisioning request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionRequest {
    /// The currency of the new wallet, e.g. "USD". Defaults to the configured currency.
    #[serde(default)]
    pub currency: Option<String>,
}

/// A route handler for creating the caller's wallet.
///
/// The body is optional and an empty body asks for the default currency. Responds with
/// 201 Created and the new wallet, or 200 OK and the existing wallet unchanged if the caller
/// already has one.
pub async fn provision_wallet_endpoint(
    State(ledger): State<WalletLedger>,
    owner_id: OwnerId,
    body: Bytes,
) -> Result<Response, Error> {
    let currency = parse_request(&body)?.currency;

    let provisioned = ledger
        .run(move |ledger| ledger.provision_wallet(owner_id, currency.as_deref()))
        .await?;

    let status_code = if provisioned.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status_code, Json(provisioned.wallet)).into_response())
}

fn parse_request(body: &[u8]) -> Result<ProvisionRequest, Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ProvisionRequest::default());
    }

    serde_json::from_slice(body).map_err(|error| {
        tracing::warn!("rejected malformed provisioning request: {error}");
        ValidationErrors::single(ValidationErrors::NON_FIELD, error.to_string()).into()
    })
}

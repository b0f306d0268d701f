//! Defines the route handlers for depositing and withdrawing money.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    error::ValidationErrors,
    ledger::{
        WalletLedger,
        validation::{TransactionCommand, TransactionRequest, validate_transaction_request},
    },
    owner::OwnerId,
};

/// The response to a successful deposit or withdrawal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionResponse {
    /// A human readable confirmation.
    pub message: String,
    /// The wallet balance after the change.
    pub balance: Decimal,
}

/// A route handler for depositing money into the caller's wallet.
pub async fn deposit_endpoint(
    State(ledger): State<WalletLedger>,
    owner_id: OwnerId,
    request: Result<Json<TransactionRequest>, JsonRejection>,
) -> Result<Json<TransactionResponse>, Error> {
    let TransactionCommand {
        amount,
        description,
    } = parse_request(request)?;

    let receipt = ledger
        .run(move |ledger| ledger.deposit(owner_id, amount, description.as_deref()))
        .await?;

    Ok(Json(TransactionResponse {
        message: "Deposit successful".to_owned(),
        balance: receipt.balance,
    }))
}

/// A route handler for withdrawing money from the caller's wallet.
///
/// Responds with a 400 status and `{"error": "Insufficient balance"}` if the wallet does not
/// hold enough money.
pub async fn withdraw_endpoint(
    State(ledger): State<WalletLedger>,
    owner_id: OwnerId,
    request: Result<Json<TransactionRequest>, JsonRejection>,
) -> Result<Json<TransactionResponse>, Error> {
    let TransactionCommand {
        amount,
        description,
    } = parse_request(request)?;

    let receipt = ledger
        .run(move |ledger| ledger.withdraw(owner_id, amount, description.as_deref()))
        .await?;

    Ok(Json(TransactionResponse {
        message: "Withdrawal successful".to_owned(),
        balance: receipt.balance,
    }))
}

fn parse_request(
    request: Result<Json<TransactionRequest>, JsonRejection>,
) -> Result<TransactionCommand, Error> {
    let Json(request) = request.map_err(|rejection| {
        tracing::warn!("rejected malformed transaction request: {rejection}");
        ValidationErrors::single(ValidationErrors::NON_FIELD, rejection.body_text())
    })?;

    validate_transaction_request(&request).map_err(|errors| {
        tracing::debug!("rejected invalid transaction request: {errors}");
        Error::Validation(errors)
    })
}

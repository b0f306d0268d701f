//! Defines the route handler for reading the caller's wallet.

use axum::{Json, extract::State};

use crate::{Error, ledger::WalletLedger, owner::OwnerId, wallet::Wallet};

/// A route handler for the caller's wallet, creating it on first access.
pub async fn get_balance_endpoint(
    State(ledger): State<WalletLedger>,
    owner_id: OwnerId,
) -> Result<Json<Wallet>, Error> {
    ledger
        .run(move |ledger| ledger.get_balance(owner_id))
        .await
        .map(Json)
}

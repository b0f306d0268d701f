//! Defines the route handler for checking a wallet balance against its ledger.

use axum::{Json, extract::State};

use crate::{
    Error,
    ledger::{Reconciliation, WalletLedger},
    owner::OwnerId,
};

/// A route handler for recomputing the caller's balance from the ledger.
pub async fn reconcile_endpoint(
    State(ledger): State<WalletLedger>,
    owner_id: OwnerId,
) -> Result<Json<Reconciliation>, Error> {
    ledger
        .run(move |ledger| ledger.reconcile(owner_id))
        .await
        .map(Json)
}

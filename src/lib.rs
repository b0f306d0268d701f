//! A wallet ledger service.
//!
//! Every owner has one wallet. Money moves in and out of a wallet through deposits and
//! withdrawals, and each one is recorded in an append-only ledger in the same SQLite
//! transaction as the balance change, so a wallet's balance always equals the sum of its
//! ledger entries.
//!
//! This library provides [WalletLedger], which applies those operations atomically and one at
//! a time per wallet, and a JSON REST API on top of it. Authentication happens upstream: the
//! API trusts the owner ID given in the [OWNER_ID_HEADER] header.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod app_state;
mod config;
mod database_id;
mod db;
mod endpoints;
mod error;
mod ledger;
mod ledger_entry;
mod logging;
mod money;
mod owner;
mod routing;
mod wallet;

pub use app_state::AppState;
pub use config::LedgerConfig;
pub use database_id::{DatabaseId, EntryId, WalletId};
pub use db::initialize as initialize_db;
pub use error::{Error, ValidationErrors};
pub use ledger::{
    Reconciliation, TransactionCommand, TransactionReceipt, TransactionRequest,
    TransactionResponse, WalletLedger, validate_transaction_request,
};
pub use ledger_entry::{EntryKind, LedgerEntry};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use money::{Amount, AmountError};
pub use owner::{OWNER_ID_HEADER, OwnerId};
pub use routing::build_router;
pub use wallet::{DEFAULT_CURRENCY, ProvisionedWallet, Wallet};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

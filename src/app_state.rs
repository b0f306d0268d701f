//! Implements a struct that holds the state of the REST server.

use std::sync::Arc;

use axum::extract::FromRef;
use parking_lot::Mutex;
use rusqlite::Connection;

use crate::{Error, config::LedgerConfig, db::initialize, ledger::WalletLedger};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The ledger that every wallet route goes through.
    pub ledger: WalletLedger,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the wallet and ledger tables.
    ///
    /// # Errors
    /// Returns an error if `config` is invalid or the database cannot be initialized.
    pub fn new(db_connection: Connection, config: LedgerConfig) -> Result<Self, Error> {
        let config = config.validated()?;
        initialize(&db_connection)?;

        let connection = Arc::new(Mutex::new(db_connection));

        Ok(Self {
            ledger: WalletLedger::new(connection, config),
        })
    }
}

impl FromRef<AppState> for WalletLedger {
    fn from_ref(state: &AppState) -> Self {
        state.ledger.clone()
    }
}

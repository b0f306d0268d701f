//! Tunable settings for the wallet ledger.

use std::time::Duration;

use crate::{
    Error,
    error::ValidationErrors,
    wallet::{DEFAULT_CURRENCY, validate_currency},
};

/// The config for the wallet ledger.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// How many ledger entries to return when the caller does not ask for a specific number.
    pub default_history_limit: u64,
    /// The most ledger entries a single history request may return.
    pub max_history_limit: u64,
    /// How long an operation waits for a busy wallet or for the shared storage handle.
    pub lock_timeout: Duration,
    /// The currency given to wallets that are created without one.
    pub default_currency: String,
    /// How many times to retry wallet creation after losing a uniqueness race.
    pub creation_retries: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_history_limit: 20,
            max_history_limit: 100,
            lock_timeout: Duration::from_secs(5),
            default_currency: DEFAULT_CURRENCY.to_owned(),
            creation_retries: 3,
        }
    }
}

impl LedgerConfig {
    /// Resolve the number of history entries to return for a `requested` limit.
    ///
    /// Falls back to the default and clamps to `1..=max_history_limit`.
    pub fn history_limit(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_history_limit)
            .clamp(1, self.max_history_limit.max(1))
    }

    /// Check that wallets can be created with these settings and normalize the currency code.
    ///
    /// # Errors
    /// Returns [Error::Validation] keyed by `default_currency` if it is not a three letter code.
    pub fn validated(mut self) -> Result<Self, Error> {
        self.default_currency = validate_currency(&self.default_currency)
            .map_err(|message| ValidationErrors::single("default_currency", message))?;

        Ok(self)
    }
}

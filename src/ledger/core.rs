//! The transactional engine that keeps wallet balances and the ledger in step.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::Decimal;
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    Error,
    config::LedgerConfig,
    database_id::EntryId,
    error::ValidationErrors,
    ledger::locks::WalletLocks,
    ledger_entry::{
        EntryKind, HistoryQuery, LedgerEntry, NewLedgerEntry, append_entry, count_entries,
        list_entries, sum_entries,
    },
    money::{Amount, MAX_MINOR_UNITS, to_decimal},
    owner::OwnerId,
    wallet::{
        ProvisionedWallet, Wallet, credit_wallet, debit_wallet, get_or_create_wallet,
        validate_currency,
    },
};

/// The outcome of a successful deposit or withdrawal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionReceipt {
    /// The wallet balance after the change.
    pub balance: Decimal,
    /// The ledger entry recording the change.
    pub entry: LedgerEntry,
}

/// A comparison of a wallet's stored balance against the sum of its ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reconciliation {
    /// The owner of the wallet.
    pub owner_id: OwnerId,
    /// The balance stored on the wallet.
    pub balance: Decimal,
    /// The sum of deposits minus the sum of withdrawals.
    pub ledger_sum: Decimal,
    /// The number of ledger entries.
    pub entry_count: u64,
    /// Whether `balance` equals `ledger_sum`.
    pub consistent: bool,
}

/// Owns the write path to wallet balances and the ledger.
///
/// Deposits and withdrawals take the wallet's lock from [WalletLocks] and then run the balance
/// change and the ledger append in one immediate SQLite transaction. Either both are committed
/// or neither is. Reads only ever see committed state.
///
/// Cloning is cheap, clones share the same connection and locks.
#[derive(Debug, Clone)]
pub struct WalletLedger {
    connection: Arc<Mutex<Connection>>,
    locks: WalletLocks,
    config: Arc<LedgerConfig>,
}

impl WalletLedger {
    /// Create a ledger that stores its data through `connection`.
    ///
    /// The database must already have been initialized with [initialize_db](crate::initialize_db).
    pub fn new(connection: Arc<Mutex<Connection>>, config: LedgerConfig) -> Self {
        Self {
            connection,
            locks: WalletLocks::new(),
            config: Arc::new(config),
        }
    }

    /// Take the storage handle on behalf of `owner_id`, waiting at most the lock timeout.
    fn connection(&self, owner_id: OwnerId) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection
            .try_lock_for(self.config.lock_timeout)
            .ok_or_else(|| {
                tracing::warn!(
                    "timed out after {:?} waiting for storage on behalf of owner {owner_id}",
                    self.config.lock_timeout
                );
                Error::WalletBusy(owner_id)
            })
    }

    /// Get the wallet for `owner_id`, creating an empty one in the default currency if needed.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::Conflict] if the wallet could not be created due to repeated creation races,
    /// - [Error::WalletBusy] if the storage stayed busy for longer than the lock timeout,
    /// - or [Error::SqlError] if there is some other SQL error.
    pub fn get_or_create_wallet(&self, owner_id: OwnerId) -> Result<Wallet, Error> {
        let connection = self.connection(owner_id)?;

        get_or_create_wallet(
            owner_id,
            &self.config.default_currency,
            self.config.creation_retries,
            &connection,
        )
        .map(|provisioned| provisioned.wallet)
    }

    /// Create the wallet for `owner_id` in `currency`, or return the existing wallet unchanged.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::Validation] if `currency` is not a three letter code,
    /// - or the same errors as [WalletLedger::get_or_create_wallet].
    pub fn provision_wallet(
        &self,
        owner_id: OwnerId,
        currency: Option<&str>,
    ) -> Result<ProvisionedWallet, Error> {
        let currency = match currency {
            Some(code) => validate_currency(code)
                .map_err(|message| ValidationErrors::single("currency", message))?,
            None => self.config.default_currency.clone(),
        };

        let connection = self.connection(owner_id)?;

        get_or_create_wallet(
            owner_id,
            &currency,
            self.config.creation_retries,
            &connection,
        )
    }

    /// Add `amount` to the wallet of `owner_id` and record a deposit entry.
    ///
    /// The wallet is created first if the owner does not have one yet.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::Validation] if the deposit would take the balance above the maximum balance,
    /// - [Error::WalletBusy] if another operation held the wallet for too long,
    /// - or [Error::SqlError] if there is an SQL error.
    ///
    /// Nothing is changed when an error is returned.
    pub fn deposit(
        &self,
        owner_id: OwnerId,
        amount: Amount,
        description: Option<&str>,
    ) -> Result<TransactionReceipt, Error> {
        self.apply(owner_id, EntryKind::Deposit, amount, description)
    }

    /// Take `amount` from the wallet of `owner_id` and record a withdrawal entry.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::InsufficientFunds] if the balance is less than `amount`,
    /// - [Error::WalletBusy] if another operation held the wallet for too long,
    /// - or [Error::SqlError] if there is an SQL error.
    ///
    /// Nothing is changed when an error is returned.
    pub fn withdraw(
        &self,
        owner_id: OwnerId,
        amount: Amount,
        description: Option<&str>,
    ) -> Result<TransactionReceipt, Error> {
        self.apply(owner_id, EntryKind::Withdrawal, amount, description)
    }

    fn apply(
        &self,
        owner_id: OwnerId,
        kind: EntryKind,
        amount: Amount,
        description: Option<&str>,
    ) -> Result<TransactionReceipt, Error> {
        self.locks
            .with_lock(owner_id, self.config.lock_timeout, || {
                let mut connection = self.connection(owner_id)?;
                let transaction =
                    connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

                let wallet = get_or_create_wallet(
                    owner_id,
                    &self.config.default_currency,
                    self.config.creation_retries,
                    &transaction,
                )?
                .wallet;

                // Entry timestamps must not go backwards within a wallet.
                let now = OffsetDateTime::now_utc().max(wallet.updated_at);

                let new_balance = match kind {
                    EntryKind::Deposit => credit_wallet(wallet.id, amount, now, &transaction)?
                        .ok_or_else(|| {
                            tracing::warn!(
                                "rejected deposit of {amount} for owner {owner_id}: balance would exceed the maximum"
                            );
                            ValidationErrors::single(
                                "amount",
                                format!(
                                    "Ensure the balance does not exceed {}.",
                                    to_decimal(MAX_MINOR_UNITS)
                                ),
                            )
                        })?,
                    EntryKind::Withdrawal => debit_wallet(wallet.id, amount, now, &transaction)?
                        .ok_or_else(|| {
                            tracing::warn!(
                                "rejected withdrawal of {amount} for owner {owner_id}: balance is {}",
                                wallet.balance
                            );
                            Error::InsufficientFunds {
                                balance: wallet.balance,
                                requested: amount.to_decimal(),
                            }
                        })?,
                };

                let entry = append_entry(
                    NewLedgerEntry {
                        wallet_id: wallet.id,
                        kind,
                        amount,
                        description: description.map(str::to_owned),
                        created_at: now,
                    },
                    &transaction,
                )?;

                transaction.commit()?;

                Ok(TransactionReceipt {
                    balance: to_decimal(new_balance),
                    entry,
                })
            })
            .inspect(|receipt| {
                tracing::info!(
                    "{kind} of {amount} for owner {owner_id}, new balance {}",
                    receipt.balance
                );
            })
    }

    /// Get the latest committed snapshot of the wallet for `owner_id`.
    ///
    /// The wallet is created first if the owner does not have one yet.
    ///
    /// # Errors
    /// Returns the same errors as [WalletLedger::get_or_create_wallet].
    pub fn get_balance(&self, owner_id: OwnerId) -> Result<Wallet, Error> {
        self.get_or_create_wallet(owner_id)
    }

    /// Get the ledger entries for the wallet of `owner_id`, most recent first.
    ///
    /// `limit` defaults to and is clamped by the [LedgerConfig]. When `before` is given only
    /// entries older than that entry are returned.
    ///
    /// # Errors
    /// Returns the same errors as [WalletLedger::get_or_create_wallet].
    pub fn list_history(
        &self,
        owner_id: OwnerId,
        limit: Option<u64>,
        before: Option<EntryId>,
    ) -> Result<Vec<LedgerEntry>, Error> {
        let query = HistoryQuery {
            limit: self.config.history_limit(limit),
            before,
        };
        let connection = self.connection(owner_id)?;

        let wallet = get_or_create_wallet(
            owner_id,
            &self.config.default_currency,
            self.config.creation_retries,
            &connection,
        )?
        .wallet;

        list_entries(wallet.id, query, &connection)
    }

    /// Recompute the balance of the wallet for `owner_id` from its ledger.
    ///
    /// # Errors
    /// Returns the same errors as [WalletLedger::get_or_create_wallet].
    pub fn reconcile(&self, owner_id: OwnerId) -> Result<Reconciliation, Error> {
        let mut connection = self.connection(owner_id)?;
        let transaction = connection.transaction()?;

        let wallet = get_or_create_wallet(
            owner_id,
            &self.config.default_currency,
            self.config.creation_retries,
            &transaction,
        )?
        .wallet;
        let ledger_sum = to_decimal(sum_entries(wallet.id, &transaction)?);
        let entry_count = count_entries(wallet.id, &transaction)?;

        transaction.commit()?;

        let consistent = wallet.balance == ledger_sum;
        if !consistent {
            tracing::error!(
                "wallet {} of owner {owner_id} has balance {} but its ledger sums to {ledger_sum}",
                wallet.id,
                wallet.balance
            );
        }

        Ok(Reconciliation {
            owner_id,
            balance: wallet.balance,
            ledger_sum,
            entry_count,
            consistent,
        })
    }

    /// Run a ledger `operation` on the blocking thread pool.
    ///
    /// Once started the operation runs to completion even if the caller's future is dropped,
    /// so a client disconnect never interrupts a unit of work.
    ///
    /// # Errors
    /// Returns [Error::BackgroundTaskFailed] if the task panicked, otherwise whatever
    /// `operation` returns.
    pub async fn run<T, F>(&self, operation: F) -> Result<T, Error>
    where
        F: FnOnce(&WalletLedger) -> Result<T, Error> + Send + 'static,
        T: Send + 'static,
    {
        let ledger = self.clone();

        tokio::task::spawn_blocking(move || operation(&ledger))
            .await
            .map_err(|error| {
                tracing::error!("ledger task failed: {error}");
                Error::BackgroundTaskFailed(error.to_string())
            })?
    }
}

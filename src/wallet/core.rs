//! Defines the wallet model and the database queries for the wallet table.

use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::WalletId,
    money::{Amount, MAX_MINOR_UNITS, to_decimal},
    owner::OwnerId,
};

/// The currency given to new wallets unless configured otherwise.
pub const DEFAULT_CURRENCY: &str = "GHS";

const WALLET_COLUMNS: &str = "id, owner_id, balance_cents, currency, created_at, updated_at";

// ============================================================================
// MODELS
// ============================================================================

/// The balance-holding record for one owner.
///
/// There is exactly one wallet per owner. The balance only changes through
/// [WalletLedger](crate::WalletLedger) deposits and withdrawals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    /// The ID of the wallet.
    pub id: WalletId,
    /// The account that owns the wallet.
    pub owner_id: OwnerId,
    /// The current balance, never negative.
    pub balance: Decimal,
    /// The ISO 4217 style currency code, fixed at creation.
    pub currency: String,
    /// When the wallet was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the balance last changed.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// The result of looking up a wallet that may have just been created.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvisionedWallet {
    /// The owner's wallet.
    pub wallet: Wallet,
    /// Whether this call created the wallet.
    pub created: bool,
}

/// Check that `code` is a three letter currency code and normalize it to upper case.
///
/// # Errors
/// Returns a message suitable for a validation error if `code` is malformed.
pub fn validate_currency(code: &str) -> Result<String, String> {
    let code = code.trim();

    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code.to_ascii_uppercase())
    } else {
        Err(format!(
            "\"{code}\" is not a valid currency code, expected three letters such as \"{DEFAULT_CURRENCY}\"."
        ))
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the wallet table in the database.
///
/// The `CHECK` constraint means the database itself refuses a negative balance.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn create_wallet_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS wallet (
            id INTEGER PRIMARY KEY,
            owner_id INTEGER NOT NULL UNIQUE,
            balance_cents INTEGER NOT NULL DEFAULT 0 CHECK (balance_cents >= 0),
            currency TEXT NOT NULL CHECK (length(currency) = 3),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
            )",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [Wallet].
pub fn map_wallet_row(row: &Row) -> Result<Wallet, rusqlite::Error> {
    let id = row.get(0)?;
    let owner_id = OwnerId::new(row.get(1)?);
    let balance_cents: i64 = row.get(2)?;
    let currency = row.get(3)?;
    let created_at = row.get(4)?;
    let updated_at = row.get(5)?;

    Ok(Wallet {
        id,
        owner_id,
        balance: to_decimal(balance_cents),
        currency,
        created_at,
        updated_at,
    })
}

/// Retrieve the wallet belonging to `owner_id`, if it exists.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn find_wallet(owner_id: OwnerId, connection: &Connection) -> Result<Option<Wallet>, Error> {
    let wallet = connection
        .prepare(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallet WHERE owner_id = :owner_id"
        ))?
        .query_row(&[(":owner_id", &owner_id.as_i64())], map_wallet_row)
        .optional()?;

    Ok(wallet)
}

/// Insert a new, empty wallet for `owner_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::Conflict] if the owner already has a wallet,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_wallet(
    owner_id: OwnerId,
    currency: &str,
    created_at: OffsetDateTime,
    connection: &Connection,
) -> Result<Wallet, Error> {
    connection
        .prepare(&format!(
            "INSERT INTO wallet (owner_id, balance_cents, currency, created_at, updated_at)
             VALUES (?1, 0, ?2, ?3, ?3)
             RETURNING {WALLET_COLUMNS}"
        ))?
        .query_row(
            params![owner_id.as_i64(), currency, created_at],
            map_wallet_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::Conflict(owner_id),
            error => error.into(),
        })
}

/// Get the wallet for `owner_id`, creating an empty one with `currency` if there is none.
///
/// The unique constraint on `owner_id` decides concurrent creations. The loser of a race sees
/// [Error::Conflict], and the lookup is retried up to `retries` more times.
///
/// # Errors
/// This function will return a:
/// - [Error::Conflict] if every attempt lost a creation race,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_or_create_wallet(
    owner_id: OwnerId,
    currency: &str,
    retries: u32,
    connection: &Connection,
) -> Result<ProvisionedWallet, Error> {
    get_or_create_with(owner_id, retries, connection, |connection| {
        create_wallet(owner_id, currency, OffsetDateTime::now_utc(), connection)
    })
}

fn get_or_create_with(
    owner_id: OwnerId,
    retries: u32,
    connection: &Connection,
    mut create: impl FnMut(&Connection) -> Result<Wallet, Error>,
) -> Result<ProvisionedWallet, Error> {
    for attempt in 0..=retries {
        if let Some(wallet) = find_wallet(owner_id, connection)? {
            return Ok(ProvisionedWallet {
                wallet,
                created: false,
            });
        }

        match create(connection) {
            Ok(wallet) => {
                tracing::info!("created wallet {} for owner {owner_id}", wallet.id);
                return Ok(ProvisionedWallet {
                    wallet,
                    created: true,
                });
            }
            Err(Error::Conflict(_)) => {
                tracing::debug!(
                    "wallet creation for owner {owner_id} lost a race on attempt {}",
                    attempt + 1
                );
            }
            Err(error) => return Err(error),
        }
    }

    Err(Error::Conflict(owner_id))
}

/// Add `amount` to the balance of wallet `wallet_id` and stamp it with `updated_at`.
///
/// Returns the new balance in minor units, or `None` if the credit would push the balance
/// past [MAX_MINOR_UNITS] (nothing is written in that case).
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn credit_wallet(
    wallet_id: WalletId,
    amount: Amount,
    updated_at: OffsetDateTime,
    connection: &Connection,
) -> Result<Option<i64>, Error> {
    let balance = connection
        .prepare(
            "UPDATE wallet
             SET balance_cents = balance_cents + ?1, updated_at = ?2
             WHERE id = ?3 AND balance_cents <= ?4 - ?1
             RETURNING balance_cents",
        )?
        .query_row(
            params![amount.minor_units(), updated_at, wallet_id, MAX_MINOR_UNITS],
            |row| row.get(0),
        )
        .optional()?;

    Ok(balance)
}

/// Subtract `amount` from the balance of wallet `wallet_id` and stamp it with `updated_at`.
///
/// The check and the update are one statement. Returns the new balance in minor units, or
/// `None` if the balance is smaller than `amount` (nothing is written in that case).
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn debit_wallet(
    wallet_id: WalletId,
    amount: Amount,
    updated_at: OffsetDateTime,
    connection: &Connection,
) -> Result<Option<i64>, Error> {
    let balance = connection
        .prepare(
            "UPDATE wallet
             SET balance_cents = balance_cents - ?1, updated_at = ?2
             WHERE id = ?3 AND balance_cents >= ?1
             RETURNING balance_cents",
        )?
        .query_row(params![amount.minor_units(), updated_at, wallet_id], |row| {
            row.get(0)
        })
        .optional()?;

    Ok(balance)
}

/// Get the total number of wallets in the database.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
#[cfg(test)]
pub fn count_wallets(connection: &Connection) -> Result<u64, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM wallet;", [], crate::db::read_count)
        .map_err(|error| error.into())
}

// ============================================================================
// TESTS
// ============================================================================

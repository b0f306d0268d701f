//! Defines the append-only ledger entry model and its database queries.

use std::fmt::Display;

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    database_id::{EntryId, WalletId},
    db::read_count,
    money::{Amount, to_decimal},
};

/// The longest description, in characters, that is stored with an entry.
pub const MAX_DESCRIPTION_LENGTH: usize = 255;

const ENTRY_COLUMNS: &str = "id, wallet_id, kind, amount_cents, description, created_at";

// ============================================================================
// MODELS
// ============================================================================

/// Whether an entry added money to or took money from a wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Money paid into the wallet.
    Deposit,
    /// Money paid out of the wallet.
    Withdrawal,
}

impl EntryKind {
    /// The name stored in the database and used in JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Deposit => "deposit",
            EntryKind::Withdrawal => "withdrawal",
        }
    }

    /// The description used when the caller does not give one.
    pub fn default_description(&self) -> &'static str {
        match self {
            EntryKind::Deposit => "Deposit",
            EntryKind::Withdrawal => "Withdrawal",
        }
    }
}

impl Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for EntryKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for EntryKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "deposit" => Ok(EntryKind::Deposit),
            "withdrawal" => Ok(EntryKind::Withdrawal),
            other => Err(FromSqlError::Other(
                format!("unknown ledger entry kind \"{other}\"").into(),
            )),
        }
    }
}

/// An immutable record of one change to a wallet's balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// The ID of the entry. IDs increase in the order entries were committed.
    pub id: EntryId,
    /// The wallet whose balance changed.
    pub wallet_id: WalletId,
    /// Whether money went in or out.
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// How much money moved. Always positive, the direction is given by `kind`.
    pub amount: Decimal,
    /// A note describing the entry.
    pub description: String,
    /// When the entry was recorded.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The data needed to append an entry to the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    /// The wallet whose balance changed.
    pub wallet_id: WalletId,
    /// Whether money went in or out.
    pub kind: EntryKind,
    /// How much money moved.
    pub amount: Amount,
    /// The description as given by the caller. Blank descriptions get the default for `kind`.
    pub description: Option<String>,
    /// When the entry was recorded.
    pub created_at: OffsetDateTime,
}

/// Which slice of a wallet's history to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    /// The most entries to return.
    pub limit: u64,
    /// Only return entries with an ID smaller than this one.
    pub before: Option<EntryId>,
}

/// Resolve the description to store for an entry of `kind`.
///
/// Whitespace is trimmed, blank or missing descriptions fall back to
/// [EntryKind::default_description] and long descriptions are cut to
/// [MAX_DESCRIPTION_LENGTH] characters.
pub fn effective_description(kind: EntryKind, description: Option<&str>) -> String {
    match description.map(str::trim) {
        Some(text) if !text.is_empty() => text.chars().take(MAX_DESCRIPTION_LENGTH).collect(),
        _ => kind.default_description().to_owned(),
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the ledger entry table, its history index and the triggers that make it append-only.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn create_ledger_entry_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS ledger_entry (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            wallet_id INTEGER NOT NULL REFERENCES wallet(id),
            kind TEXT NOT NULL CHECK (kind IN ('deposit', 'withdrawal')),
            amount_cents INTEGER NOT NULL CHECK (amount_cents > 0),
            description TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_ledger_entry_wallet_history
            ON ledger_entry(wallet_id, id DESC);

        CREATE TRIGGER IF NOT EXISTS ledger_entry_no_update
            BEFORE UPDATE ON ledger_entry
        BEGIN
            SELECT RAISE(ABORT, 'ledger entries cannot be changed');
        END;

        CREATE TRIGGER IF NOT EXISTS ledger_entry_no_delete
            BEFORE DELETE ON ledger_entry
        BEGIN
            SELECT RAISE(ABORT, 'ledger entries cannot be deleted');
        END;",
    )
}

/// Map a database row to a [LedgerEntry].
pub fn map_entry_row(row: &Row) -> Result<LedgerEntry, rusqlite::Error> {
    let id = row.get(0)?;
    let wallet_id = row.get(1)?;
    let kind = row.get(2)?;
    let amount_cents: i64 = row.get(3)?;
    let description = row.get(4)?;
    let created_at = row.get(5)?;

    Ok(LedgerEntry {
        id,
        wallet_id,
        kind,
        amount: to_decimal(amount_cents),
        description,
        created_at,
    })
}

/// Append `entry` to the ledger.
///
/// Callers must append in the same database transaction as the matching balance change.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error, e.g. the wallet does not exist.
pub fn append_entry(entry: NewLedgerEntry, connection: &Connection) -> Result<LedgerEntry, Error> {
    let description = effective_description(entry.kind, entry.description.as_deref());

    let ledger_entry = connection
        .prepare(&format!(
            "INSERT INTO ledger_entry (wallet_id, kind, amount_cents, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING {ENTRY_COLUMNS}"
        ))?
        .query_row(
            (
                entry.wallet_id,
                entry.kind,
                entry.amount.minor_units(),
                description,
                entry.created_at,
            ),
            map_entry_row,
        )?;

    Ok(ledger_entry)
}

/// Get the entries of wallet `wallet_id`, most recent first.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn list_entries(
    wallet_id: WalletId,
    query: HistoryQuery,
    connection: &Connection,
) -> Result<Vec<LedgerEntry>, Error> {
    connection
        .prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entry
             WHERE wallet_id = :wallet_id AND (:before IS NULL OR id < :before)
             ORDER BY id DESC
             LIMIT {}",
            query.limit
        ))?
        .query_map(
            rusqlite::named_params! {
                ":wallet_id": wallet_id,
                ":before": query.before,
            },
            map_entry_row,
        )?
        .map(|maybe_entry| maybe_entry.map_err(Error::from))
        .collect()
}

/// Get the number of entries recorded for wallet `wallet_id`.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn count_entries(wallet_id: WalletId, connection: &Connection) -> Result<u64, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM ledger_entry WHERE wallet_id = ?1",
            [wallet_id],
            read_count,
        )
        .map_err(|error| error.into())
}

/// Get the sum of deposits minus the sum of withdrawals for wallet `wallet_id`, in minor units.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn sum_entries(wallet_id: WalletId, connection: &Connection) -> Result<i64, Error> {
    connection
        .query_row(
            "SELECT COALESCE(SUM(CASE kind
                WHEN 'deposit' THEN amount_cents
                ELSE -amount_cents
             END), 0)
             FROM ledger_entry WHERE wallet_id = ?1",
            [wallet_id],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

// ============================================================================
// TESTS
// ============================================================================

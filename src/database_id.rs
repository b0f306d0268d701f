//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;
/// The primary key of a row in the wallet table.
pub type WalletId = DatabaseId;
/// The primary key of a row in the ledger entry table.
///
/// Entry IDs increase in commit order, which makes them usable as a history cursor.
pub type EntryId = DatabaseId;

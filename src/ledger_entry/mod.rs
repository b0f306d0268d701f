//! The append-only ledger of balance changes.
//!
//! This module contains the `LedgerEntry` model, the database functions for appending and
//! reading entries, and the route handler for listing a wallet's history.

mod core;
mod history_endpoint;

pub use core::{
    EntryKind, HistoryQuery, LedgerEntry, MAX_DESCRIPTION_LENGTH, NewLedgerEntry, append_entry,
    count_entries, create_ledger_entry_table, list_entries, sum_entries,
};
pub use history_endpoint::get_history_endpoint;

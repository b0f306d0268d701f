//! The wallet ledger core.
//!
//! This module contains everything related to moving money:
//! - [WalletLedger], which applies deposits and withdrawals atomically and one at a time per
//!   wallet
//! - The per-wallet lock registry
//! - Request validation and the deposit, withdraw and reconcile route handlers

mod core;
mod locks;
mod reconcile_endpoint;
mod transaction_endpoint;
mod validation;

pub use core::{Reconciliation, TransactionReceipt, WalletLedger};
pub use reconcile_endpoint::reconcile_endpoint;
pub use transaction_endpoint::{TransactionResponse, deposit_endpoint, withdraw_endpoint};
pub use validation::{TransactionCommand, TransactionRequest, validate_transaction_request};

#[cfg(test)]
pub(crate) use core::test_utils;

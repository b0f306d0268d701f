//! Wallet management.
//!
//! This module contains everything related to wallets:
//! - The `Wallet` model and currency validation
//! - Database functions for creating wallets and changing their balance
//! - The route handlers for provisioning a wallet and reading its balance

mod balance_endpoint;
mod core;
mod provision_endpoint;

pub use balance_endpoint::get_balance_endpoint;
pub use core::{
    DEFAULT_CURRENCY, ProvisionedWallet, Wallet, create_wallet_table, credit_wallet,
    debit_wallet, get_or_create_wallet, validate_currency,
};
pub use provision_endpoint::provision_wallet_endpoint;

#[cfg(test)]
pub use core::{count_wallets, create_wallet};

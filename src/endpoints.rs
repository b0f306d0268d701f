//! The API endpoints URIs.
//!
//! Every wallet route acts on the wallet of the owner named in the
//! [OWNER_ID_HEADER](crate::OWNER_ID_HEADER) header.

/// The route for explicitly provisioning a wallet.
pub const WALLETS: &str = "/api/wallets";
/// The route for reading the wallet balance.
pub const BALANCE: &str = "/api/wallets/balance";
/// The route for depositing money.
pub const DEPOSIT: &str = "/api/wallets/deposit";
/// The route for withdrawing money.
pub const WITHDRAW: &str = "/api/wallets/withdraw";
/// The route for listing ledger entries, most recent first.
pub const TRANSACTIONS: &str = "/api/wallets/transactions";
/// The route for checking the balance against the ledger.
pub const RECONCILE: &str = "/api/wallets/reconcile";
/// The route for liveness checks.
pub const HEALTH: &str = "/api/health";

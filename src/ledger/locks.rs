//! The per-wallet serialization tokens.

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::{Error, owner::OwnerId};

/// A registry of one exclusive lock per wallet owner.
///
/// Operations on different owners never contend. Cloning the registry is cheap and every clone
/// shares the same locks.
#[derive(Debug, Clone, Default)]
pub struct WalletLocks {
    locks: Arc<DashMap<OwnerId, Arc<Mutex<()>>>>,
}

impl WalletLocks {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the lock for `owner_id`, creating it on first use.
    pub fn lock_for(&self, owner_id: OwnerId) -> Arc<Mutex<()>> {
        // Clone out of the map so the shard is not held while waiting on the lock.
        self.locks.entry(owner_id).or_default().value().clone()
    }

    /// Run `operation` while holding the lock for `owner_id`, waiting at most `timeout` for it.
    ///
    /// The owner's entry is dropped from the registry once nobody else is using it.
    ///
    /// # Errors
    /// Returns [Error::WalletBusy] if the lock was not acquired in time, otherwise whatever
    /// `operation` returns.
    pub fn with_lock<T>(
        &self,
        owner_id: OwnerId,
        timeout: Duration,
        operation: impl FnOnce() -> Result<T, Error>,
    ) -> Result<T, Error> {
        let lock = self.lock_for(owner_id);

        let result = match lock.try_lock_for(timeout) {
            Some(_guard) => {
                tracing::debug!("acquired wallet lock for owner {owner_id}");
                operation()
            }
            None => {
                tracing::warn!(
                    "timed out after {timeout:?} waiting for the wallet of owner {owner_id}"
                );
                Err(Error::WalletBusy(owner_id))
            }
        };

        drop(lock);
        self.evict_if_idle(owner_id);

        result
    }

    /// Remove the lock for `owner_id` if the registry holds the only reference to it.
    fn evict_if_idle(&self, owner_id: OwnerId) {
        // Runs under the shard lock, so no other thread can clone the entry meanwhile.
        self.locks
            .remove_if(&owner_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use crate::{Error, ledger::locks::WalletLocks, owner::OwnerId};

    #[test]
    fn same_owner_shares_one_lock() {
        let locks = WalletLocks::new();

        let first = locks.lock_for(OwnerId::new(1));
        let second = locks.lock_for(OwnerId::new(1));
        let other = locks.lock_for(OwnerId::new(2));

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &other));
    }

    #[test]
    fn times_out_while_lock_is_held() {
        let locks = WalletLocks::new();
        let owner_id = OwnerId::new(1);
        let lock = locks.lock_for(owner_id);
        let _held = lock.lock();

        let result = locks.with_lock(owner_id, Duration::from_millis(10), || Ok(()));

        assert_eq!(result, Err(Error::WalletBusy(owner_id)));
    }

    #[test]
    fn other_owners_do_not_contend() {
        let locks = WalletLocks::new();
        let lock = locks.lock_for(OwnerId::new(1));
        let _held = lock.lock();

        let result = locks.with_lock(OwnerId::new(2), Duration::from_millis(10), || Ok(42));

        assert_eq!(result, Ok(42));
    }

    #[test]
    fn releases_lock_after_operation() {
        let locks = WalletLocks::new();
        let owner_id = OwnerId::new(1);

        locks
            .with_lock(owner_id, Duration::from_millis(10), || Ok(()))
            .unwrap();

        assert!(locks.lock_for(owner_id).try_lock().is_some());
    }

    #[test]
    fn idle_locks_are_evicted() {
        let locks = WalletLocks::new();

        for id in 0..100 {
            let owner_id = OwnerId::new(id);
            let _ = locks.with_lock(owner_id, Duration::from_millis(10), || {
                Err::<(), _>(Error::InsufficientFunds {
                    balance: rust_decimal::Decimal::ZERO,
                    requested: rust_decimal::Decimal::ONE,
                })
            });
            locks
                .with_lock(owner_id, Duration::from_millis(10), || Ok(()))
                .unwrap();
        }

        assert!(locks.locks.is_empty());
    }

    #[test]
    fn lock_in_use_is_kept() {
        let locks = WalletLocks::new();
        let owner_id = OwnerId::new(1);
        let waiting = locks.lock_for(owner_id);

        locks
            .with_lock(owner_id, Duration::from_millis(10), || Ok(()))
            .unwrap();

        assert_eq!(locks.locks.len(), 1);
        assert!(Arc::ptr_eq(&waiting, &locks.lock_for(owner_id)));
        drop(waiting);
    }

    #[test]
    fn timed_out_owner_keeps_holder_lock() {
        let locks = WalletLocks::new();
        let owner_id = OwnerId::new(1);
        let lock = locks.lock_for(owner_id);
        let held = lock.lock();

        let _ = locks.with_lock(owner_id, Duration::from_millis(10), || Ok(()));

        assert!(Arc::ptr_eq(&lock, &locks.lock_for(owner_id)));
        drop(held);
    }
}

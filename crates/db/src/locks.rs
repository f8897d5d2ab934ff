//! In-process keyed locks.
//!
//! Ledger writes hold the lock of every bank account they touch and voucher
//! numbering holds the lock of its company, for the whole database
//! transaction. Locks are taken before the transaction begins.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A map of async mutexes keyed by row id.
#[derive(Debug, Clone, Default)]
pub struct KeyedLocks {
    inner: Arc<DashMap<i64, Arc<Mutex<()>>>>,
}

/// Guards held for the duration of one logical operation.
#[derive(Debug, Default)]
pub struct LockSet {
    guards: Vec<OwnedMutexGuard<()>>,
}

impl LockSet {
    /// Number of locks held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// Returns true when nothing is locked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    fn extend(&mut self, other: Self) {
        self.guards.extend(other.guards);
    }
}

impl KeyedLocks {
    /// Creates an empty lock map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: i64) -> Arc<Mutex<()>> {
        // Clone the mutex out so the shard guard is released before awaiting.
        Arc::clone(self.inner.entry(key).or_default().value())
    }

    /// Locks `key`.
    pub async fn lock(&self, key: i64) -> OwnedMutexGuard<()> {
        self.slot(key).lock_owned().await
    }

    /// Locks every key once, in ascending order.
    pub async fn lock_all<I>(&self, keys: I) -> LockSet
    where
        I: IntoIterator<Item = i64>,
    {
        let mut keys: Vec<i64> = keys.into_iter().collect();
        keys.sort_unstable();
        keys.dedup();

        let mut guards = Vec::with_capacity(keys.len());
        for key in keys {
            guards.push(self.lock(key).await);
        }
        LockSet { guards }
    }
}

/// Account and company locks shared by every repository.
#[derive(Debug, Clone, Default)]
pub struct LedgerLocks {
    /// Per bank account.
    pub accounts: KeyedLocks,
    /// Per company, for voucher numbering.
    pub companies: KeyedLocks,
}

impl LedgerLocks {
    /// Creates an empty lock registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the given accounts in ascending id order.
    pub async fn accounts<I>(&self, ids: I) -> LockSet
    where
        I: IntoIterator<Item = i64>,
    {
        self.accounts.lock_all(ids).await
    }

    /// Locks a company.
    pub async fn company(&self, company_id: i64) -> LockSet {
        self.companies.lock_all([company_id]).await
    }

    /// Locks a company, then the given accounts.
    ///
    /// Company locks always come first so the two maps never deadlock.
    pub async fn company_and_accounts<I>(&self, company_id: i64, accounts: I) -> LockSet
    where
        I: IntoIterator<Item = i64>,
    {
        let mut set = self.company(company_id).await;
        set.extend(self.accounts.lock_all(accounts).await);
        set
    }
}

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use solvault_core::config::PersistenceConfig;
use solvault_core::{Account, PendingTransaction, WalletError};

use crate::composite::CompositeAccountRepository;
use crate::sled_store::SledAccountRepository;
use crate::solana::SolanaAccountRepository;

/// Persistent repository for derived accounts plus the TTL cache for
/// pending transactions.
///
/// Accounts are keyed by subject; pending transactions by their UUID.
/// Transaction entries live in the cache tier only and are consumed at most
/// once: a successful `remove_transaction_by_id` deletes the entry
/// atomically.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Persist an account by subject, overwriting any previous record.
    async fn save(&self, account: &Account) -> Result<(), WalletError>;

    /// Look up an account by subject.
    async fn find(&self, subject: &str) -> Result<Account, WalletError>;

    /// Park a pending transaction for `ttl`; an entry with the same id is
    /// overwritten.
    async fn cache_transaction(
        &self,
        transaction: &PendingTransaction,
        ttl: Duration,
    ) -> Result<(), WalletError>;

    /// Atomically read and delete the pending transaction with `id`.
    async fn remove_transaction_by_id(
        &self,
        id: &Uuid,
    ) -> Result<PendingTransaction, WalletError>;

    /// Flush and release the underlying store.
    async fn close(&self) -> Result<(), WalletError>;
}

/// Build the repository described by the persistence config: cache-only,
/// main-only, or a composite of both (main authoritative for accounts,
/// cache handling pending transactions).
pub async fn build_repository(
    cfg: &PersistenceConfig,
) -> Result<Arc<dyn AccountRepository>, WalletError> {
    let cache: Option<Arc<dyn AccountRepository>> = if cfg.cache.enabled {
        Some(Arc::new(SledAccountRepository::open(&cfg.cache)?))
    } else {
        None
    };

    let main: Option<Arc<dyn AccountRepository>> = if cfg.main.enabled {
        Some(Arc::new(SolanaAccountRepository::connect(&cfg.main)?))
    } else {
        None
    };

    match (main, cache) {
        (Some(main), Some(cache)) => {
            Ok(Arc::new(CompositeAccountRepository::new(main, cache)))
        }
        (Some(main), None) => Ok(main),
        (None, Some(cache)) => Ok(cache),
        (None, None) => Err(WalletError::Input(
            "no persistence driver enabled".into(),
        )),
    }
}

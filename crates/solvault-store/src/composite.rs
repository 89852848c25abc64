use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use solvault_core::{Account, PendingTransaction, WalletError};

use crate::repository::AccountRepository;

/// Write-through cache repository: main is authoritative for accounts, the
/// cache absorbs reads and holds pending transactions.
///
/// Cache population is fire-and-forget; a mirror failure is logged and never
/// surfaced, and never masks a prior main-store failure.
pub struct CompositeAccountRepository {
    main: Arc<dyn AccountRepository>,
    cache: Arc<dyn AccountRepository>,
}

impl CompositeAccountRepository {
    pub fn new(main: Arc<dyn AccountRepository>, cache: Arc<dyn AccountRepository>) -> Self {
        Self { main, cache }
    }

    fn mirror(&self, account: &Account) {
        let cache = Arc::clone(&self.cache);
        let account = account.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.save(&account).await {
                warn!(subject = %account.subject, error = %e, "cache mirror failed");
            }
        });
    }
}

#[async_trait]
impl AccountRepository for CompositeAccountRepository {
    async fn save(&self, account: &Account) -> Result<(), WalletError> {
        self.main.save(account).await?;
        self.mirror(account);
        Ok(())
    }

    async fn find(&self, subject: &str) -> Result<Account, WalletError> {
        // Any cache failure, not just a miss, falls through to main.
        if let Ok(account) = self.cache.find(subject).await {
            return Ok(account);
        }

        let account = self.main.find(subject).await?;
        self.mirror(&account);
        Ok(account)
    }

    async fn cache_transaction(
        &self,
        transaction: &PendingTransaction,
        ttl: Duration,
    ) -> Result<(), WalletError> {
        self.cache.cache_transaction(transaction, ttl).await
    }

    async fn remove_transaction_by_id(
        &self,
        id: &Uuid,
    ) -> Result<PendingTransaction, WalletError> {
        // Pending transactions never fall through to main.
        self.cache.remove_transaction_by_id(id).await
    }

    async fn close(&self) -> Result<(), WalletError> {
        let main = self.main.close().await;
        if let Err(e) = self.cache.close().await {
            warn!(error = %e, "closing cache store");
        }
        main
    }
}

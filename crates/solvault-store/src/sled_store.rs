use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use solvault_core::config::CacheConfig;
use solvault_core::{Account, PendingTransaction, WalletError};

use crate::repository::AccountRepository;

const TX_PREFIX: &str = "tx:";
const SUB_PREFIX: &str = "sub:";

/// How often expired `tx:` entries are purged in the background. Expiry is
/// also checked on every read, so this only bounds how long dead entries
/// occupy disk.
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Embedded cache store backed by sled.
///
/// Keyspace:
///   sub:<subject> — JSON `Account`
///   tx:<uuid>     — JSON `{expires_at_ms, transaction}`
///
/// sled has no per-entry TTL, so pending transactions carry their deadline
/// in the stored envelope; reads treat an expired entry as absent and a
/// sweeper task deletes them shortly after the deadline.
pub struct SledAccountRepository {
    db: sled::Db,
    sweeper: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

#[derive(Serialize, Deserialize)]
struct PendingEnvelope {
    expires_at_ms: i64,
    transaction: PendingTransaction,
}

fn account_key(subject: &str) -> Vec<u8> {
    format!("{SUB_PREFIX}{subject}").into_bytes()
}

fn tx_key(id: &Uuid) -> Vec<u8> {
    format!("{TX_PREFIX}{id}").into_bytes()
}

impl SledAccountRepository {
    /// Open (or create) the store described by the cache config.
    ///
    /// Must be called from within a tokio runtime: the TTL sweeper is
    /// spawned here and aborted again by `close`.
    pub fn open(cfg: &CacheConfig) -> Result<Self, WalletError> {
        let db = if cfg.inmem {
            sled::Config::new()
                .temporary(true)
                .open()
                .map_err(|e| WalletError::Storage(e.to_string()))?
        } else {
            sled::open(Path::new(&cfg.path).join(&cfg.name))
                .map_err(|e| WalletError::Storage(e.to_string()))?
        };

        Ok(Self {
            sweeper: Mutex::new(Some(Self::spawn_sweeper(db.clone()))),
            db,
        })
    }

    /// Ephemeral in-memory store.
    pub fn in_memory() -> Result<Self, WalletError> {
        Self::open(&CacheConfig {
            enabled: true,
            name: String::new(),
            path: String::new(),
            inmem: true,
        })
    }

    fn spawn_sweeper(db: sled::Db) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(SWEEP_INTERVAL);
            loop {
                tick.tick().await;
                let now = Utc::now().timestamp_millis();
                for item in db.scan_prefix(TX_PREFIX) {
                    let Ok((key, value)) = item else { break };
                    match serde_json::from_slice::<PendingEnvelope>(&value) {
                        Ok(env) if env.expires_at_ms <= now => {
                            let _ = db.remove(key);
                        }
                        Ok(_) => {}
                        // Undecodable entries can never be consumed; drop them.
                        Err(_) => {
                            let _ = db.remove(key);
                        }
                    }
                }
            }
        })
    }
}

#[async_trait]
impl AccountRepository for SledAccountRepository {
    async fn save(&self, account: &Account) -> Result<(), WalletError> {
        let bytes = serde_json::to_vec(account)
            .map_err(|e| WalletError::Serialization(e.to_string()))?;
        self.db
            .insert(account_key(&account.subject), bytes)
            .map_err(|e| WalletError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn find(&self, subject: &str) -> Result<Account, WalletError> {
        match self
            .db
            .get(account_key(subject))
            .map_err(|e| WalletError::Storage(e.to_string()))?
        {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| WalletError::Serialization(e.to_string())),
            None => Err(WalletError::AccountNotFound),
        }
    }

    async fn cache_transaction(
        &self,
        transaction: &PendingTransaction,
        ttl: Duration,
    ) -> Result<(), WalletError> {
        let envelope = PendingEnvelope {
            expires_at_ms: Utc::now().timestamp_millis() + ttl.as_millis() as i64,
            transaction: transaction.clone(),
        };

        let bytes = serde_json::to_vec(&envelope)
            .map_err(|e| WalletError::Serialization(e.to_string()))?;
        self.db
            .insert(tx_key(&transaction.id), bytes)
            .map_err(|e| WalletError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn remove_transaction_by_id(
        &self,
        id: &Uuid,
    ) -> Result<PendingTransaction, WalletError> {
        // sled's single-key remove is the atomic read-and-delete; a replay
        // with the same id sees None here.
        let old = self
            .db
            .remove(tx_key(id))
            .map_err(|e| WalletError::Storage(e.to_string()))?;

        let Some(bytes) = old else {
            return Err(WalletError::TransactionNotFound);
        };

        let envelope: PendingEnvelope = serde_json::from_slice(&bytes)
            .map_err(|e| WalletError::Serialization(e.to_string()))?;

        if envelope.expires_at_ms <= Utc::now().timestamp_millis() {
            return Err(WalletError::TransactionNotFound);
        }

        Ok(envelope.transaction)
    }

    async fn close(&self) -> Result<(), WalletError> {
        if let Some(handle) = self
            .sweeper
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }

        self.db
            .flush_async()
            .await
            .map_err(|e| WalletError::Storage(e.to_string()))?;
        Ok(())
    }
}

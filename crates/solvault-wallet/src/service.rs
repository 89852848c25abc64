use std::collections::HashMap;
use std::sync::Arc;

use solana_sdk::signature::Signature;
use tokio::sync::{mpsc, Mutex};
use tracing::info;

use solvault_core::{Account, WalletError};
use solvault_keys::{derive_account, KeyRing};
use solvault_passkey::{Passkeys, TokenVerifier};
use solvault_session::{SessionPayload, SessionRendezvous};
use solvault_store::AccountRepository;

use crate::signer::WireTransaction;

/// The wallet service façade: orchestrates the key ring, the account store,
/// the passkey provider, and the session rendezvous behind one surface.
pub struct WalletService {
    pub(crate) repo: Arc<dyn AccountRepository>,
    pub(crate) keyring: Arc<KeyRing>,
    pub(crate) passkeys: Arc<dyn Passkeys>,
    pub(crate) verifier: Arc<TokenVerifier>,
    sessions: SessionRendezvous,
    /// Per-subject guards around derive-on-miss, so two concurrent first
    /// reads of the same subject cannot write two different salts.
    derive_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl WalletService {
    pub fn new(
        repo: Arc<dyn AccountRepository>,
        keyring: Arc<KeyRing>,
        passkeys: Arc<dyn Passkeys>,
        verifier: Arc<TokenVerifier>,
        sessions: SessionRendezvous,
    ) -> Self {
        Self {
            repo,
            keyring,
            passkeys,
            verifier,
            sessions,
            derive_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Look up the wallet for `subject`, deriving and persisting a fresh one
    /// on the first request. Only `account not found` triggers derivation;
    /// every other store error aborts.
    pub async fn wallet(&self, subject: &str) -> Result<Account, WalletError> {
        match self.repo.find(subject).await {
            Ok(account) => Ok(account),
            Err(WalletError::AccountNotFound) => self.find_or_create(subject).await,
            Err(e) => Err(e),
        }
    }

    async fn find_or_create(&self, subject: &str) -> Result<Account, WalletError> {
        let guard = {
            let mut locks = self.derive_locks.lock().await;
            Arc::clone(
                locks
                    .entry(subject.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        let _held = guard.lock().await;

        // A racing request may have derived and saved while we waited.
        match self.repo.find(subject).await {
            Ok(account) => return Ok(account),
            Err(WalletError::AccountNotFound) => {}
            Err(e) => return Err(e),
        }

        let account = derive_account(&self.keyring, subject).await?;
        self.repo.save(&account).await?;
        info!(subject, key_version = account.key_version, "derived new wallet");

        self.derive_locks.lock().await.remove(subject);
        Ok(account)
    }

    /// Sign raw bytes with the subject's derived key.
    pub async fn sign_message(
        &self,
        subject: &str,
        message: &[u8],
    ) -> Result<Signature, WalletError> {
        let account = self.repo.find(subject).await?;
        account.sign(message)
    }

    /// Sign a Solana transaction: only the required-signer slots matching
    /// the subject's wallet are filled.
    pub async fn sign_transaction(
        &self,
        subject: &str,
        wire: &mut WireTransaction,
    ) -> Result<Vec<Signature>, WalletError> {
        let account = self.repo.find(subject).await?;
        Ok(wire.sign_with(&account))
    }

    // ── Sessions ─────────────────────────────────────────────────────────────

    pub fn create_session(
        &self,
        data: Vec<u8>,
    ) -> Result<(String, mpsc::Receiver<SessionPayload>), WalletError> {
        self.sessions.create_session(data)
    }

    pub fn session_data(&self, session: &str) -> Result<Vec<u8>, WalletError> {
        self.sessions.session_data(session)
    }

    pub fn ack_session(&self, session: &str, data: Vec<u8>) -> Result<(), WalletError> {
        self.sessions.ack_session(session, data)
    }

    /// Flush and release the backing store.
    pub async fn close(&self) -> Result<(), WalletError> {
        self.repo.close().await
    }
}

//! The two-phase signing pipeline.
//!
//! Initialize computes the signature up front and parks it in the cache
//! under the caller's transaction id; the passkey challenge returned to the
//! client is bound to the SHA-256 digest of the payload. Finalize exchanges
//! the user's assertion for the provider's JWT, checks the `trans` claim,
//! and releases the parked artifact — exactly once.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use solvault_core::constants::PENDING_TRANSACTION_TTL_SECS;
use solvault_core::{b64, PendingKind, PendingTransaction, WalletError};
use solvault_passkey::{InitializeTransactionRequest, ParsedAssertion};

use crate::service::WalletService;
use crate::signer::WireTransaction;

// ── Requests and responses ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeSignMessageRequest {
    #[serde(skip)]
    pub subject: String,
    pub user_id: String,
    pub transaction_id: Uuid,
    #[serde(with = "b64")]
    pub message: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeSignTransactionRequest {
    #[serde(skip)]
    pub subject: String,
    pub user_id: String,
    pub transaction_id: Uuid,
    #[serde(with = "b64")]
    pub transaction: Vec<u8>,
    #[serde(default)]
    pub versioned: bool,
}

/// Assertion options relayed verbatim from the provider, plus its mediation
/// hint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeSignResponse {
    #[serde(rename = "publicKey")]
    pub public_key: serde_json::Value,
    pub mediation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeSignMessageResponse {
    pub token: String,
    /// base58 64-byte ed25519 signature over the original message.
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeSignTransactionResponse {
    #[serde(with = "b64")]
    pub transaction: Vec<u8>,
    pub versioned: bool,
    pub signatures: Vec<String>,
}

/// The digest bound into the passkey challenge: SHA-256 of the payload,
/// base64-encoded. One helper for both tracks so they cannot diverge.
fn challenge_digest(payload: &[u8]) -> String {
    b64::encode(&Sha256::digest(payload))
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

impl WalletService {
    pub async fn initialize_sign_message(
        &self,
        req: &InitializeSignMessageRequest,
    ) -> Result<InitializeSignResponse, WalletError> {
        let (options, mediation) = self
            .passkeys
            .initialize_transaction(&InitializeTransactionRequest {
                user_id: req.user_id.clone(),
                transaction_id: req.transaction_id,
                transaction_data: challenge_digest(&req.message),
            })
            .await?;

        let account = self.repo.find(&req.subject).await?;
        let signature = account.sign(&req.message)?;

        let pending = PendingTransaction::message(
            req.transaction_id,
            req.message.clone(),
            signature.to_string(),
        );
        self.repo
            .cache_transaction(&pending, Duration::from_secs(PENDING_TRANSACTION_TTL_SECS))
            .await?;

        Ok(InitializeSignResponse {
            public_key: options.public_key,
            mediation,
        })
    }

    pub async fn initialize_sign_transaction(
        &self,
        req: &InitializeSignTransactionRequest,
    ) -> Result<InitializeSignResponse, WalletError> {
        let mut wire = WireTransaction::decode(&req.transaction, req.versioned)?;

        let (options, mediation) = self
            .passkeys
            .initialize_transaction(&InitializeTransactionRequest {
                user_id: req.user_id.clone(),
                transaction_id: req.transaction_id,
                transaction_data: challenge_digest(&req.transaction),
            })
            .await?;

        let account = self.repo.find(&req.subject).await?;
        let signatures = wire.sign_with(&account);

        let pending = PendingTransaction::transaction(
            req.transaction_id,
            wire.encode()?,
            req.versioned,
            signatures.iter().map(|s| s.to_string()).collect(),
        );
        self.repo
            .cache_transaction(&pending, Duration::from_secs(PENDING_TRANSACTION_TTL_SECS))
            .await?;

        Ok(InitializeSignResponse {
            public_key: options.public_key,
            mediation,
        })
    }

    pub async fn finalize_sign_message(
        &self,
        assertion: &ParsedAssertion,
    ) -> Result<FinalizeSignMessageResponse, WalletError> {
        let (token, pending) = self.consume_pending(assertion).await?;

        if pending.kind != PendingKind::Message {
            return Err(WalletError::Internal("cached entry of wrong kind".into()));
        }
        let signature = pending
            .signature
            .ok_or_else(|| WalletError::Internal("parked entry missing signature".into()))?;

        Ok(FinalizeSignMessageResponse { token, signature })
    }

    pub async fn finalize_sign_transaction(
        &self,
        assertion: &ParsedAssertion,
    ) -> Result<FinalizeSignTransactionResponse, WalletError> {
        let (_, pending) = self.consume_pending(assertion).await?;

        if pending.kind != PendingKind::Transaction {
            return Err(WalletError::Internal("cached entry of wrong kind".into()));
        }
        let transaction = pending
            .transaction
            .ok_or_else(|| WalletError::Internal("parked entry missing transaction".into()))?;

        Ok(FinalizeSignTransactionResponse {
            transaction,
            versioned: pending.versioned,
            signatures: pending.signatures,
        })
    }

    /// Shared finalize steps: provider exchange, token verification, `trans`
    /// claim extraction, and the atomic consume of the parked entry.
    async fn consume_pending(
        &self,
        assertion: &ParsedAssertion,
    ) -> Result<(String, PendingTransaction), WalletError> {
        let token = self.passkeys.finalize_transaction(assertion).await?;

        let claims = self
            .verifier
            .verify(&token)
            .await
            .map_err(|e| WalletError::Provider(format!("token verification: {e}")))?;

        let trans = match claims.get("trans") {
            Some(serde_json::Value::String(trans)) => trans,
            _ => return Err(WalletError::InvalidType),
        };
        let id = Uuid::parse_str(trans)
            .map_err(|e| WalletError::Input(format!("invalid transaction id: {e}")))?;

        let pending = self.repo.remove_transaction_by_id(&id).await?;
        Ok((token, pending))
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;
use zeroize::Zeroize;

use crate::constants::ED25519_KEYPAIR_LEN;
use crate::error::WalletError;

/// A derived custodial wallet for one subject.
///
/// `private_key` holds the full 64-byte ed25519 keypair (seed ‖ public key),
/// recoverable from (subject, salt, key_version) and the KMS root key. The
/// bytes are wiped on drop and never appear in `Debug` output or logs.
#[derive(Clone, Serialize, Deserialize)]
pub struct Account {
    pub subject: String,
    pub salt: String,
    pub key_version: u32,
    #[serde(with = "crate::b64")]
    private_key: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Build an account around a 64-byte ed25519 keypair.
    pub fn new(
        subject: impl Into<String>,
        salt: impl Into<String>,
        key_version: u32,
        private_key: Vec<u8>,
    ) -> Result<Self, WalletError> {
        if private_key.len() != ED25519_KEYPAIR_LEN {
            return Err(WalletError::Input(format!(
                "private key must be {ED25519_KEYPAIR_LEN} bytes, got {}",
                private_key.len()
            )));
        }

        let now = Utc::now();
        Ok(Self {
            subject: subject.into(),
            salt: salt.into(),
            key_version,
            private_key,
            created_at: now,
            updated_at: now,
        })
    }

    /// The wallet address: the public half of the derived keypair.
    pub fn wallet(&self) -> Result<Pubkey, WalletError> {
        Pubkey::try_from(&self.private_key[32..])
            .map_err(|_| WalletError::Internal("invalid private key".into()))
    }

    /// Reconstruct the Solana keypair for signing.
    pub fn keypair(&self) -> Result<Keypair, WalletError> {
        Keypair::from_bytes(&self.private_key)
            .map_err(|_| WalletError::Internal("invalid private key".into()))
    }

    /// Sign raw bytes with the derived key (64-byte ed25519 signature).
    pub fn sign(&self, data: &[u8]) -> Result<Signature, WalletError> {
        self.keypair()?
            .try_sign_message(data)
            .map_err(|e| WalletError::Internal(format!("signing failed: {e}")))
    }
}

impl Drop for Account {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Account {{ subject: {:?}, salt: {:?}, key_version: {} }}",
            self.subject, self.salt, self.key_version
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_account() -> (Keypair, Account) {
        let kp = Keypair::new();
        let account = Account::new("alice", "salt-1", 1, kp.to_bytes().to_vec())
            .expect("valid keypair bytes");
        (kp, account)
    }

    #[test]
    fn wallet_matches_keypair_pubkey() {
        let (kp, account) = test_account();
        assert_eq!(account.wallet().unwrap(), kp.pubkey());
    }

    #[test]
    fn sign_verifies_against_wallet() {
        let (_, account) = test_account();
        let sig = account.sign(b"hello").unwrap();
        let wallet = account.wallet().unwrap();
        assert!(sig.verify(wallet.as_ref(), b"hello"));
        assert!(!sig.verify(wallet.as_ref(), b"other"));
    }

    #[test]
    fn rejects_short_private_key() {
        let err = Account::new("alice", "salt-1", 1, vec![0u8; 32]).unwrap_err();
        assert!(matches!(err, WalletError::Input(_)));
    }

    #[test]
    fn json_round_trip_preserves_key() {
        let (kp, account) = test_account();
        let json = serde_json::to_string(&account).unwrap();
        let back: Account = serde_json::from_str(&json).unwrap();
        assert_eq!(back.wallet().unwrap(), kp.pubkey());
        assert_eq!(back.subject, "alice");
        assert_eq!(back.salt, "salt-1");
    }

    #[test]
    fn debug_hides_private_key() {
        let (kp, account) = test_account();
        let rendered = format!("{account:?}");
        assert!(!rendered.contains(&bs58::encode(kp.to_bytes()).into_string()));
        assert!(rendered.contains("alice"));
    }
}

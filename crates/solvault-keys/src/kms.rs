use async_trait::async_trait;
use ed25519_dalek::pkcs8::EncodePublicKey;
use pkcs8::LineEnding;
use ed25519_dalek::{Signer, SigningKey};

use solvault_core::WalletError;

/// Signing algorithm attached to a KMS key version. Only Ed25519 keys are
/// usable for wallet derivation; everything else is carried opaquely so the
/// ring can report `unsupported algorithm` instead of misusing the key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Ed25519,
    Other(String),
}

/// One enumerated key version inside the remote KMS.
#[derive(Debug, Clone)]
pub struct KmsKeyVersion {
    /// Fully-qualified resource name of the version.
    pub name: String,
    pub algorithm: KeyAlgorithm,
}

/// Result of an asymmetric sign call. The resource name is echoed back by
/// the KMS and must match the key the caller asked for.
#[derive(Debug, Clone)]
pub struct KmsSignature {
    pub name: String,
    pub signature: Vec<u8>,
}

/// Transport to a key-management service holding the root signing keys.
/// Private material never crosses this boundary; only signatures and
/// PKIX-encoded public keys do.
#[async_trait]
pub trait KmsClient: Send + Sync {
    /// Enumerate the versions of the crypto key under `parent`, oldest first.
    async fn list_key_versions(&self, parent: &str)
        -> Result<Vec<KmsKeyVersion>, WalletError>;

    /// Sign `data` with the key version `name` (no pre-hashing).
    async fn asymmetric_sign(&self, name: &str, data: &[u8])
        -> Result<KmsSignature, WalletError>;

    /// Fetch the PKIX PEM public key for the version `name`.
    async fn get_public_key(&self, name: &str) -> Result<String, WalletError>;
}

// ── Software driver ──────────────────────────────────────────────────────────

/// In-process KMS driver: key versions held as ed25519 seeds in memory.
///
/// Speaks the exact same contract as the remote driver, which makes
/// derivation deterministic for tests and usable on developer machines
/// without cloud credentials.
pub struct SoftwareKms {
    parent: String,
    versions: Vec<SigningKey>,
}

impl SoftwareKms {
    pub fn new(parent: impl Into<String>, seeds: Vec<[u8; 32]>) -> Self {
        Self {
            parent: parent.into(),
            versions: seeds.iter().map(SigningKey::from_bytes).collect(),
        }
    }

    /// Single-version ring from one seed.
    pub fn from_seed(parent: impl Into<String>, seed: [u8; 32]) -> Self {
        Self::new(parent, vec![seed])
    }

    fn version_name(&self, index: usize) -> String {
        format!("{}/cryptoKeyVersions/{}", self.parent, index + 1)
    }

    fn key_by_name(&self, name: &str) -> Result<&SigningKey, WalletError> {
        (0..self.versions.len())
            .find(|&i| self.version_name(i) == name)
            .map(|i| &self.versions[i])
            .ok_or_else(|| WalletError::Kms(format!("unknown key version: {name}")))
    }
}

#[async_trait]
impl KmsClient for SoftwareKms {
    async fn list_key_versions(
        &self,
        parent: &str,
    ) -> Result<Vec<KmsKeyVersion>, WalletError> {
        if parent != self.parent {
            return Err(WalletError::Kms(format!("unknown key: {parent}")));
        }

        Ok((0..self.versions.len())
            .map(|i| KmsKeyVersion {
                name: self.version_name(i),
                algorithm: KeyAlgorithm::Ed25519,
            })
            .collect())
    }

    async fn asymmetric_sign(
        &self,
        name: &str,
        data: &[u8],
    ) -> Result<KmsSignature, WalletError> {
        let key = self.key_by_name(name)?;
        Ok(KmsSignature {
            name: name.to_string(),
            signature: key.sign(data).to_bytes().to_vec(),
        })
    }

    async fn get_public_key(&self, name: &str) -> Result<String, WalletError> {
        let key = self.key_by_name(name)?;
        key.verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| WalletError::Kms(format!("encoding public key: {e}")))
    }
}

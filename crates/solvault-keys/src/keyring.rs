use std::sync::{Arc, PoisonError, RwLock};

use ed25519_dalek::pkcs8::DecodePublicKey;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use solvault_core::constants::ED25519_SIGNATURE_LEN;
use solvault_core::WalletError;

use crate::kms::{KeyAlgorithm, KmsClient, KmsKeyVersion};

/// A resolved key version: what callers hold while signing or verifying.
#[derive(Debug, Clone)]
pub struct KeyHandle {
    /// 1-indexed version number in external identifiers.
    pub version: u32,
    pub name: String,
    pub algorithm: KeyAlgorithm,
}

/// Versioned root keys held in a remote KMS.
///
/// The ordered version list is snapshot at construction and stable for the
/// life of the ring; lookups take the read lock. Re-enumeration would need a
/// new ring.
pub struct KeyRing {
    client: Arc<dyn KmsClient>,
    versions: RwLock<Vec<KmsKeyVersion>>,
}

impl KeyRing {
    /// Enumerate the key versions under `parent` and snapshot them.
    pub async fn connect(
        client: Arc<dyn KmsClient>,
        parent: &str,
    ) -> Result<Self, WalletError> {
        let versions = client.list_key_versions(parent).await?;
        Ok(Self {
            client,
            versions: RwLock::new(versions),
        })
    }

    /// Resolve a key version. Versions are 1-indexed; `None` selects the
    /// latest (highest).
    pub fn key(&self, version: Option<u32>) -> Result<KeyHandle, WalletError> {
        let versions = self
            .versions
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        let count = versions.len() as u32;
        if count == 0 {
            return Err(WalletError::KeyRingEmpty);
        }

        let ver = version.unwrap_or(count);
        if ver == 0 || ver > count {
            return Err(WalletError::KeyVersionNotFound);
        }

        let entry = &versions[(ver - 1) as usize];
        Ok(KeyHandle {
            version: ver,
            name: entry.name.clone(),
            algorithm: entry.algorithm.clone(),
        })
    }

    /// Number of enumerated versions.
    pub fn len(&self) -> usize {
        self.versions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Produce a deterministic 64-byte Ed25519 signature over `data`.
    pub async fn sign(
        &self,
        data: &[u8],
        version: Option<u32>,
    ) -> Result<Vec<u8>, WalletError> {
        let key = self.key(version)?;
        if key.algorithm != KeyAlgorithm::Ed25519 {
            return Err(WalletError::UnsupportedAlgorithm);
        }

        let reply = self.client.asymmetric_sign(&key.name, data).await?;

        // The KMS echoes the resource it signed with; anything else means the
        // request was served by the wrong key.
        if reply.name != key.name {
            return Err(WalletError::KeyNameMismatch);
        }
        if reply.signature.len() != ED25519_SIGNATURE_LEN {
            return Err(WalletError::Kms(format!(
                "unexpected signature length: {}",
                reply.signature.len()
            )));
        }

        Ok(reply.signature)
    }

    /// Verify `signature` over `data` against the version's public key.
    pub async fn verify(
        &self,
        data: &[u8],
        signature: &[u8],
        version: Option<u32>,
    ) -> Result<bool, WalletError> {
        let key = self.key(version)?;
        if key.algorithm != KeyAlgorithm::Ed25519 {
            return Err(WalletError::UnsupportedAlgorithm);
        }

        let pem = self.client.get_public_key(&key.name).await?;
        let public_key = VerifyingKey::from_public_key_pem(&pem)
            .map_err(|_| WalletError::InvalidPublicKey)?;

        let Ok(bytes) = <[u8; ED25519_SIGNATURE_LEN]>::try_from(signature) else {
            return Ok(false);
        };

        Ok(public_key.verify(data, &Signature::from_bytes(&bytes)).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kms::{KmsSignature, SoftwareKms};
    use async_trait::async_trait;

    const PARENT: &str = "projects/p/locations/l/keyRings/r/cryptoKeys/k";

    async fn two_version_ring() -> KeyRing {
        let kms = SoftwareKms::new(PARENT, vec![[1u8; 32], [2u8; 32]]);
        KeyRing::connect(Arc::new(kms), PARENT).await.unwrap()
    }

    #[tokio::test]
    async fn empty_ring_fails() {
        let kms = SoftwareKms::new(PARENT, vec![]);
        let ring = KeyRing::connect(Arc::new(kms), PARENT).await.unwrap();
        assert!(matches!(ring.key(None), Err(WalletError::KeyRingEmpty)));
    }

    #[tokio::test]
    async fn version_selection_is_one_indexed() {
        let ring = two_version_ring().await;

        assert_eq!(ring.key(None).unwrap().version, 2);
        assert_eq!(ring.key(Some(1)).unwrap().version, 1);
        assert!(matches!(ring.key(Some(0)), Err(WalletError::KeyVersionNotFound)));
        assert!(matches!(ring.key(Some(3)), Err(WalletError::KeyVersionNotFound)));
    }

    #[tokio::test]
    async fn sign_and_verify_round_trip() {
        let ring = two_version_ring().await;

        let sig = ring.sign(b"payload", None).await.unwrap();
        assert_eq!(sig.len(), ED25519_SIGNATURE_LEN);
        assert!(ring.verify(b"payload", &sig, None).await.unwrap());
        assert!(!ring.verify(b"tampered", &sig, None).await.unwrap());

        // A signature from v2 must not verify under v1.
        assert!(!ring.verify(b"payload", &sig, Some(1)).await.unwrap());
    }

    #[tokio::test]
    async fn signatures_are_deterministic_per_version() {
        let ring = two_version_ring().await;

        let a = ring.sign(b"payload", Some(1)).await.unwrap();
        let b = ring.sign(b"payload", Some(1)).await.unwrap();
        let c = ring.sign(b"payload", Some(2)).await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    // ── Non-Ed25519 and misbehaving backends ─────────────────────────────────

    struct WrongAlgorithmKms;

    #[async_trait]
    impl KmsClient for WrongAlgorithmKms {
        async fn list_key_versions(
            &self,
            _parent: &str,
        ) -> Result<Vec<KmsKeyVersion>, WalletError> {
            Ok(vec![KmsKeyVersion {
                name: "v1".into(),
                algorithm: KeyAlgorithm::Other("RSA_SIGN_PKCS1_2048_SHA256".into()),
            }])
        }

        async fn asymmetric_sign(
            &self,
            name: &str,
            _data: &[u8],
        ) -> Result<KmsSignature, WalletError> {
            Ok(KmsSignature {
                name: name.to_string(),
                signature: vec![0; 64],
            })
        }

        async fn get_public_key(&self, _name: &str) -> Result<String, WalletError> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn non_ed25519_key_is_unsupported() {
        let ring = KeyRing::connect(Arc::new(WrongAlgorithmKms), "k").await.unwrap();
        let err = ring.sign(b"x", None).await.unwrap_err();
        assert!(matches!(err, WalletError::UnsupportedAlgorithm));
        let err = ring.verify(b"x", &[0; 64], None).await.unwrap_err();
        assert!(matches!(err, WalletError::UnsupportedAlgorithm));
    }

    struct RenamingKms(SoftwareKms);

    #[async_trait]
    impl KmsClient for RenamingKms {
        async fn list_key_versions(
            &self,
            parent: &str,
        ) -> Result<Vec<KmsKeyVersion>, WalletError> {
            self.0.list_key_versions(parent).await
        }

        async fn asymmetric_sign(
            &self,
            name: &str,
            data: &[u8],
        ) -> Result<KmsSignature, WalletError> {
            let mut reply = self.0.asymmetric_sign(name, data).await?;
            reply.name = format!("{name}-rotated");
            Ok(reply)
        }

        async fn get_public_key(&self, name: &str) -> Result<String, WalletError> {
            self.0.get_public_key(name).await
        }
    }

    #[tokio::test]
    async fn resource_name_mismatch_is_rejected() {
        let kms = RenamingKms(SoftwareKms::from_seed(PARENT, [3u8; 32]));
        let ring = KeyRing::connect(Arc::new(kms), PARENT).await.unwrap();
        let err = ring.sign(b"x", None).await.unwrap_err();
        assert!(matches!(err, WalletError::KeyNameMismatch));
    }
}

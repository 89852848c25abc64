use async_trait::async_trait;
use serde::Deserialize;

use solvault_core::config::GoogleKmsConfig;
use solvault_core::{b64, WalletError};

use crate::kms::{KeyAlgorithm, KmsClient, KmsKeyVersion, KmsSignature};

const KMS_ENDPOINT: &str = "https://cloudkms.googleapis.com/v1";

/// Google Cloud KMS driver over its REST surface.
///
/// Authenticates with the bearer token from config; the service account
/// needs `cloudkms.cryptoKeyVersions.useToSign` and `.viewPublicKey`.
pub struct GoogleKmsClient {
    http: reqwest::Client,
    endpoint: String,
    auth_token: Option<String>,
}

impl GoogleKmsClient {
    pub fn new(cfg: &GoogleKmsConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: KMS_ENDPOINT.to_string(),
            auth_token: cfg.auth_token.clone(),
        }
    }

    /// Point the driver at a different endpoint (test doubles).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn get(&self, url: String) -> reqwest::RequestBuilder {
        self.authorized(self.http.get(url))
    }

    fn post(&self, url: String) -> reqwest::RequestBuilder {
        self.authorized(self.http.post(url))
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

// ── Wire shapes ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListKeyVersionsReply {
    #[serde(default)]
    crypto_key_versions: Vec<WireKeyVersion>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireKeyVersion {
    name: String,
    #[serde(default)]
    algorithm: String,
}

#[derive(Debug, Deserialize)]
struct AsymmetricSignReply {
    name: String,
    #[serde(with = "b64")]
    signature: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct PublicKeyReply {
    pem: String,
}

fn map_algorithm(raw: &str) -> KeyAlgorithm {
    match raw {
        "EC_SIGN_ED25519" => KeyAlgorithm::Ed25519,
        other => KeyAlgorithm::Other(other.to_string()),
    }
}

async fn decode<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, WalletError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(WalletError::Kms(format!("kms returned {status}: {body}")));
    }
    resp.json::<T>()
        .await
        .map_err(|e| WalletError::Kms(format!("decoding kms response: {e}")))
}

#[async_trait]
impl KmsClient for GoogleKmsClient {
    async fn list_key_versions(
        &self,
        parent: &str,
    ) -> Result<Vec<KmsKeyVersion>, WalletError> {
        let url = format!("{}/{}/cryptoKeyVersions", self.endpoint, parent);
        let mut versions = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut req = self.get(url.clone());
            if let Some(token) = &page_token {
                req = req.query(&[("pageToken", token.as_str())]);
            }

            let resp = req
                .send()
                .await
                .map_err(|e| WalletError::Kms(format!("listing key versions: {e}")))?;
            let reply: ListKeyVersionsReply = decode(resp).await?;

            versions.extend(reply.crypto_key_versions.into_iter().map(|v| {
                KmsKeyVersion {
                    algorithm: map_algorithm(&v.algorithm),
                    name: v.name,
                }
            }));

            match reply.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(versions)
    }

    async fn asymmetric_sign(
        &self,
        name: &str,
        data: &[u8],
    ) -> Result<KmsSignature, WalletError> {
        let url = format!("{}/{}:asymmetricSign", self.endpoint, name);
        let body = serde_json::json!({ "data": b64::encode(data) });

        let resp = self
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| WalletError::Kms(format!("asymmetric sign: {e}")))?;
        let reply: AsymmetricSignReply = decode(resp).await?;

        Ok(KmsSignature {
            name: reply.name,
            signature: reply.signature,
        })
    }

    async fn get_public_key(&self, name: &str) -> Result<String, WalletError> {
        let url = format!("{}/{}/publicKey", self.endpoint, name);

        let resp = self
            .get(url)
            .send()
            .await
            .map_err(|e| WalletError::Kms(format!("fetching public key: {e}")))?;
        let reply: PublicKeyReply = decode(resp).await?;

        Ok(reply.pem)
    }
}

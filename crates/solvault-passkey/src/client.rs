use async_trait::async_trait;
use serde::Deserialize;

use solvault_core::config::PasskeysConfig;
use solvault_core::WalletError;

use crate::types::{
    CredentialAssertion, FailureResult, InitializeTransactionRequest, ParsedAssertion,
};

/// Contract to the external passkey relying party. The provider owns the
/// WebAuthn ceremony end to end; this service only initiates transactions,
/// relays assertions, and consumes the resulting token.
#[async_trait]
pub trait Passkeys: Send + Sync {
    /// Ask the provider for assertion options bound to the transaction id.
    /// Returns the options and the provider's mediation hint.
    async fn initialize_transaction(
        &self,
        req: &InitializeTransactionRequest,
    ) -> Result<(CredentialAssertion, String), WalletError>;

    /// Exchange the user's assertion for the provider's release token
    /// (a compact JWT carrying the bound transaction id).
    async fn finalize_transaction(
        &self,
        assertion: &ParsedAssertion,
    ) -> Result<String, WalletError>;
}

/// REST client for the provider's tenant-scoped transaction API.
pub struct RestPasskeyClient {
    http: reqwest::Client,
    base_url: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
struct InitializeReply {
    #[serde(rename = "publicKey")]
    public_key: serde_json::Value,
    #[serde(default)]
    mediation: String,
}

#[derive(Debug, Deserialize)]
struct TokenReply {
    token: String,
}

impl RestPasskeyClient {
    pub fn new(cfg: &PasskeysConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("{}/{}", cfg.base_url.trim_end_matches('/'), cfg.tenant_id),
            api_secret: cfg.api.secret.clone(),
        }
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, WalletError>
    where
        B: serde::Serialize + Sync,
        T: serde::de::DeserializeOwned,
    {
        let resp = self
            .http
            .post(format!("{}{path}", self.base_url))
            .header("apiKey", &self.api_secret)
            .json(body)
            .send()
            .await
            .map_err(|e| WalletError::Provider(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(match resp.json::<FailureResult>().await {
                Ok(failure) => WalletError::Provider(failure.message()),
                Err(_) => WalletError::Provider(format!("provider returned {status}")),
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| WalletError::Provider(format!("decoding provider response: {e}")))
    }
}

#[async_trait]
impl Passkeys for RestPasskeyClient {
    async fn initialize_transaction(
        &self,
        req: &InitializeTransactionRequest,
    ) -> Result<(CredentialAssertion, String), WalletError> {
        let reply: InitializeReply = self.post("/transaction/initialize", req).await?;
        Ok((
            CredentialAssertion {
                public_key: reply.public_key,
            },
            reply.mediation,
        ))
    }

    async fn finalize_transaction(
        &self,
        assertion: &ParsedAssertion,
    ) -> Result<String, WalletError> {
        let reply: TokenReply = self.post("/transaction/finalize", assertion).await?;
        Ok(reply.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initialize_reply_parses_options_and_mediation() {
        let reply: InitializeReply = serde_json::from_str(
            r#"{"publicKey":{"challenge":"YWJj","timeout":60000},"mediation":"conditional"}"#,
        )
        .unwrap();
        assert_eq!(reply.mediation, "conditional");
        assert_eq!(reply.public_key["timeout"], 60000);
    }

    #[test]
    fn mediation_defaults_to_empty() {
        let reply: InitializeReply =
            serde_json::from_str(r#"{"publicKey":{"challenge":"YWJj"}}"#).unwrap();
        assert!(reply.mediation.is_empty());
    }
}

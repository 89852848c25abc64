use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use tracing::info;
use uuid::Uuid;

use solvault_core::config::MainConfig;
use solvault_core::{b64, Account, PendingTransaction, WalletError};

use crate::repository::AccountRepository;

/// Seed prefix for the per-subject program-derived address.
const ACCOUNT_SEED: &[u8] = b"wallet";

/// Authoritative on-chain store: account records live in program-derived
/// accounts under the configured program id, fetched over the node's
/// JSON-RPC endpoint.
///
/// Writing requires submitting a program transaction signed by the payer;
/// that path is not wired yet and reports `not implemented`. Pending
/// transactions never live here.
pub struct SolanaAccountRepository {
    http: reqwest::Client,
    rpc_url: String,
    payer: Keypair,
    program: Pubkey,
}

impl SolanaAccountRepository {
    pub fn connect(cfg: &MainConfig) -> Result<Self, WalletError> {
        let payer = read_keygen_file(&Path::new(&cfg.path).join(&cfg.account))?;
        let program = Pubkey::from_str(&cfg.program)
            .map_err(|e| WalletError::Input(format!("invalid program id: {e}")))?;

        info!(payer = %payer.pubkey(), %program, rpc = %cfg.rpc, "solana store connected");

        Ok(Self {
            http: reqwest::Client::new(),
            rpc_url: cfg.rpc.clone(),
            payer,
            program,
        })
    }

    /// The fee payer for future on-chain writes.
    pub fn payer(&self) -> Pubkey {
        self.payer.pubkey()
    }

    /// Derived address holding the record for `subject`.
    pub fn account_address(&self, subject: &str) -> Pubkey {
        Pubkey::find_program_address(&[ACCOUNT_SEED, subject.as_bytes()], &self.program).0
    }

    async fn rpc_call(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, WalletError> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let resp = self
            .http
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| WalletError::Storage(format!("rpc {method}: {e}")))?;

        let json: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| WalletError::Storage(format!("rpc {method}: {e}")))?;

        if let Some(err) = json.get("error") {
            return Err(WalletError::Storage(format!("rpc {method}: {err}")));
        }

        Ok(json["result"].clone())
    }
}

/// Load a Solana keygen file (a JSON array of 64 key bytes).
fn read_keygen_file(path: &Path) -> Result<Keypair, WalletError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| WalletError::Input(format!("reading {}: {e}", path.display())))?;
    let bytes: Vec<u8> = serde_json::from_str(&raw)
        .map_err(|e| WalletError::Input(format!("parsing {}: {e}", path.display())))?;
    Keypair::from_bytes(&bytes)
        .map_err(|e| WalletError::Input(format!("invalid keypair in {}: {e}", path.display())))
}

#[async_trait]
impl AccountRepository for SolanaAccountRepository {
    async fn save(&self, _account: &Account) -> Result<(), WalletError> {
        Err(WalletError::NotImplemented)
    }

    async fn find(&self, subject: &str) -> Result<Account, WalletError> {
        let address = self.account_address(subject);
        let result = self
            .rpc_call(
                "getAccountInfo",
                serde_json::json!([address.to_string(), {"encoding": "base64"}]),
            )
            .await?;

        let value = &result["value"];
        if value.is_null() {
            return Err(WalletError::AccountNotFound);
        }

        let encoded = value["data"][0]
            .as_str()
            .ok_or_else(|| WalletError::Storage("malformed account data".into()))?;
        let data = b64::decode(encoded)
            .map_err(|e| WalletError::Storage(format!("decoding account data: {e}")))?;

        serde_json::from_slice(&data)
            .map_err(|e| WalletError::Serialization(e.to_string()))
    }

    async fn cache_transaction(
        &self,
        _transaction: &PendingTransaction,
        _ttl: Duration,
    ) -> Result<(), WalletError> {
        Err(WalletError::NotImplemented)
    }

    async fn remove_transaction_by_id(
        &self,
        _id: &Uuid,
    ) -> Result<PendingTransaction, WalletError> {
        Err(WalletError::NotImplemented)
    }

    async fn close(&self) -> Result<(), WalletError> {
        Ok(())
    }
}

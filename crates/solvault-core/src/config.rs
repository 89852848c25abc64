use std::path::Path;

use serde::Deserialize;

use crate::error::WalletError;

/// Service configuration, loaded from `<base>/config.yaml`.
///
/// Path-valued fields that are left empty resolve to the base directory the
/// config was loaded from.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub keys: KeysConfig,
    pub session: SessionConfig,
    #[serde(rename = "persistences")]
    pub persistence: PersistenceConfig,
    pub jwt: JwtConfig,
    pub passkeys: PasskeysConfig,
}

impl Config {
    /// Read and resolve the configuration under `base`.
    pub fn load(base: &Path) -> Result<Self, WalletError> {
        let path = base.join("config.yaml");
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            WalletError::Input(format!("reading {}: {e}", path.display()))
        })?;

        let mut cfg: Config = serde_yaml::from_str(&raw)
            .map_err(|e| WalletError::Input(format!("parsing {}: {e}", path.display())))?;
        cfg.resolve_paths(base);
        Ok(cfg)
    }

    /// Fill empty path fields with the base directory.
    pub fn resolve_paths(&mut self, base: &Path) {
        let base = base.display().to_string();
        if self.persistence.cache.path.is_empty() {
            self.persistence.cache.path = base.clone();
        }
        if self.persistence.main.path.is_empty() {
            self.persistence.main.path = base;
        }
    }
}

// ── Keys ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct KeysConfig {
    pub driver: KeyDriver,
    #[serde(default)]
    pub google: Option<GoogleKmsConfig>,
    #[serde(default)]
    pub software: Option<SoftwareKeyConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyDriver {
    Google,
    Software,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleKmsConfig {
    #[serde(rename = "projectID")]
    pub project_id: String,
    pub location: String,
    #[serde(rename = "keyRing")]
    pub key_ring: String,
    pub key: String,
    /// Bearer token for the KMS REST API. Ambient credential discovery is
    /// outside this service's scope.
    #[serde(rename = "authToken", default)]
    pub auth_token: Option<String>,
}

impl GoogleKmsConfig {
    /// The fully-qualified crypto-key resource name.
    pub fn path(&self) -> String {
        format!(
            "projects/{}/locations/{}/keyRings/{}/cryptoKeys/{}",
            self.project_id, self.location, self.key_ring, self.key
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SoftwareKeyConfig {
    /// 32-byte ed25519 seed for the in-process root key, base64-encoded.
    #[serde(with = "crate::b64")]
    pub seed: Vec<u8>,
}

// ── Session ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// 32-byte seed for the process session key, base64-encoded.
    #[serde(with = "crate::b64")]
    pub key: Vec<u8>,
}

// ── Persistence ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    pub cache: CacheConfig,
    pub main: MainConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub inmem: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MainConfig {
    pub enabled: bool,
    #[serde(default)]
    pub rpc: String,
    #[serde(default)]
    pub program: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub account: String,
}

// ── JWT ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub issuer: String,
    pub audience: String,
    #[serde(rename = "jwksURL")]
    pub jwks_url: String,
}

// ── Passkeys ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct PasskeysConfig {
    #[serde(rename = "baseURL")]
    pub base_url: String,
    #[serde(rename = "tenantID")]
    pub tenant_id: String,
    pub api: PasskeyApiConfig,
    #[serde(default)]
    pub origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasskeyApiConfig {
    #[serde(default)]
    pub id: String,
    pub secret: String,
}

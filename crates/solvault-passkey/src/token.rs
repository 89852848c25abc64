use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::warn;

use solvault_core::config::JwtConfig;
use solvault_core::constants::{JWKS_REFRESH_SECS, JWT_LEEWAY_SECS};
use solvault_core::WalletError;

/// Verified JWT claims as a plain map.
pub type Claims = serde_json::Map<String, serde_json::Value>;

/// Ed25519 JWT verifier with a periodically refreshed JWKS.
///
/// One instance is constructed at startup and shared by the HTTP bearer
/// check and the pipeline's provider-token verification; the refresh loop is
/// a background task the binary owns and aborts on shutdown.
pub struct TokenVerifier {
    issuer: String,
    audience: String,
    jwks_url: String,
    http: reqwest::Client,
    keys: RwLock<HashMap<String, DecodingKey>>,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    #[serde(default)]
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    #[serde(default)]
    kty: String,
    #[serde(default)]
    crv: String,
    #[serde(default)]
    x: String,
    #[serde(default)]
    kid: String,
}

fn build_keys(set: JwkSet) -> HashMap<String, DecodingKey> {
    let mut keys = HashMap::new();
    for jwk in set.keys {
        if jwk.kty != "OKP" || jwk.crv != "Ed25519" || jwk.x.is_empty() {
            continue;
        }
        match DecodingKey::from_ed_components(&jwk.x) {
            Ok(key) => {
                keys.insert(jwk.kid, key);
            }
            Err(e) => warn!(kid = %jwk.kid, error = %e, "skipping malformed JWK"),
        }
    }
    keys
}

impl TokenVerifier {
    /// Fetch the JWKS once and build the verifier; fails when the document
    /// yields no usable Ed25519 keys.
    pub async fn fetch(cfg: &JwtConfig) -> Result<Arc<Self>, WalletError> {
        if cfg.jwks_url.is_empty() {
            return Err(WalletError::Input(
                "jwksURL is required for JWT verification".into(),
            ));
        }

        let verifier = Self {
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            jwks_url: cfg.jwks_url.clone(),
            http: reqwest::Client::new(),
            keys: RwLock::new(HashMap::new()),
        };
        verifier.refresh().await?;
        Ok(Arc::new(verifier))
    }

    /// Verifier over a fixed key set; no JWKS endpoint involved.
    pub fn with_static_keys(
        issuer: impl Into<String>,
        audience: impl Into<String>,
        keys: HashMap<String, DecodingKey>,
    ) -> Arc<Self> {
        Arc::new(Self {
            issuer: issuer.into(),
            audience: audience.into(),
            jwks_url: String::new(),
            http: reqwest::Client::new(),
            keys: RwLock::new(keys),
        })
    }

    /// Re-fetch the JWKS and swap the key set.
    pub async fn refresh(&self) -> Result<(), WalletError> {
        let resp = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| WalletError::Internal(format!("fetching JWKS: {e}")))?;
        let set: JwkSet = resp
            .json()
            .await
            .map_err(|e| WalletError::Internal(format!("parsing JWKS: {e}")))?;

        let keys = build_keys(set);
        if keys.is_empty() {
            return Err(WalletError::JwksUnavailable);
        }

        *self.keys.write().await = keys;
        Ok(())
    }

    /// Spawn the periodic refresh loop (every 5 minutes). The caller owns
    /// the handle and aborts it on shutdown.
    pub fn spawn_refresh(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(JWKS_REFRESH_SECS));
            // The first tick fires immediately; the key set is already fresh.
            tick.tick().await;
            loop {
                tick.tick().await;
                if let Err(e) = this.refresh().await {
                    warn!(error = %e, "JWKS refresh failed");
                }
            }
        })
    }

    /// Verify a compact JWT and return its claims. Issuer and audience must
    /// match; only EdDSA is accepted.
    pub async fn verify(&self, token: &str) -> Result<Claims, WalletError> {
        let header = decode_header(token)
            .map_err(|e| WalletError::Unauthorized(format!("invalid token: {e}")))?;
        if header.alg != Algorithm::EdDSA {
            return Err(WalletError::UnsupportedAlgorithm);
        }

        let keys = self.keys.read().await;
        if keys.is_empty() {
            return Err(WalletError::JwksUnavailable);
        }

        // Pick by kid when present; otherwise any key may match.
        let key = header
            .kid
            .as_deref()
            .and_then(|kid| keys.get(kid))
            .or_else(|| keys.values().next())
            .ok_or(WalletError::JwksUnavailable)?;

        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);
        validation.leeway = JWT_LEEWAY_SECS;

        let data = decode::<Claims>(token, key, &validation)
            .map_err(|e| WalletError::Unauthorized(format!("invalid token: {e}")))?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use ed25519_dalek::pkcs8::EncodePrivateKey;
    use ed25519_dalek::SigningKey;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn test_keys() -> (EncodingKey, HashMap<String, DecodingKey>) {
        let sk = SigningKey::from_bytes(&[42u8; 32]);
        let der = sk.to_pkcs8_der().unwrap();
        let encoding = EncodingKey::from_ed_der(der.as_bytes());

        let x = URL_SAFE_NO_PAD.encode(sk.verifying_key().as_bytes());
        let decoding = DecodingKey::from_ed_components(&x).unwrap();

        let mut keys = HashMap::new();
        keys.insert("k1".to_string(), decoding);
        (encoding, keys)
    }

    fn claims(issuer: &str, audience: &str) -> serde_json::Value {
        serde_json::json!({
            "iss": issuer,
            "aud": audience,
            "sub": "alice",
            "exp": chrono::Utc::now().timestamp() + 300,
            "trans": "6f5bd795-3e3b-4f5c-b02f-7a2f4d1c8e01",
        })
    }

    fn mint(encoding: &EncodingKey, claims: &serde_json::Value) -> String {
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some("k1".to_string());
        encode(&header, claims, encoding).unwrap()
    }

    #[tokio::test]
    async fn verifies_a_well_formed_token() {
        let (encoding, keys) = test_keys();
        let verifier = TokenVerifier::with_static_keys("iss", "aud", keys);

        let token = mint(&encoding, &claims("iss", "aud"));
        let claims = verifier.verify(&token).await.unwrap();

        assert_eq!(claims["sub"], "alice");
        assert_eq!(
            claims["trans"].as_str().unwrap(),
            "6f5bd795-3e3b-4f5c-b02f-7a2f4d1c8e01"
        );
    }

    #[tokio::test]
    async fn rejects_wrong_audience_and_issuer() {
        let (encoding, keys) = test_keys();
        let verifier = TokenVerifier::with_static_keys("iss", "aud", keys);

        let wrong_aud = mint(&encoding, &claims("iss", "other"));
        assert!(matches!(
            verifier.verify(&wrong_aud).await,
            Err(WalletError::Unauthorized(_))
        ));

        let wrong_iss = mint(&encoding, &claims("other", "aud"));
        assert!(matches!(
            verifier.verify(&wrong_iss).await,
            Err(WalletError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn rejects_expired_tokens() {
        let (encoding, keys) = test_keys();
        let verifier = TokenVerifier::with_static_keys("iss", "aud", keys);

        let mut expired = claims("iss", "aud");
        expired["exp"] = serde_json::json!(chrono::Utc::now().timestamp() - 300);
        let token = mint(&encoding, &expired);

        assert!(matches!(
            verifier.verify(&token).await,
            Err(WalletError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn rejects_non_eddsa_algorithms() {
        let (_, keys) = test_keys();
        let verifier = TokenVerifier::with_static_keys("iss", "aud", keys);

        let hs256 = encode(
            &Header::default(),
            &claims("iss", "aud"),
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert!(matches!(
            verifier.verify(&hs256).await,
            Err(WalletError::UnsupportedAlgorithm)
        ));
    }

    #[test]
    fn jwks_filtering_keeps_only_ed25519_keys() {
        let sk = SigningKey::from_bytes(&[7u8; 32]);
        let x = URL_SAFE_NO_PAD.encode(sk.verifying_key().as_bytes());

        let set: JwkSet = serde_json::from_value(serde_json::json!({
            "keys": [
                {"kty": "OKP", "crv": "Ed25519", "x": x, "kid": "good"},
                {"kty": "RSA", "n": "...", "e": "AQAB", "kid": "rsa"},
                {"kty": "OKP", "crv": "X25519", "x": x, "kid": "ecdh"},
            ]
        }))
        .unwrap();

        let keys = build_keys(set);
        assert_eq!(keys.len(), 1);
        assert!(keys.contains_key("good"));
    }
}

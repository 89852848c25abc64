use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    // ── Input errors ─────────────────────────────────────────────────────────
    #[error("invalid input: {0}")]
    Input(String),

    #[error("invalid type")]
    InvalidType,

    // ── Not-found errors ─────────────────────────────────────────────────────
    #[error("account not found")]
    AccountNotFound,

    #[error("transaction not found")]
    TransactionNotFound,

    #[error("session not found")]
    SessionNotFound,

    #[error("session already exists")]
    SessionExists,

    // ── Key errors ───────────────────────────────────────────────────────────
    #[error("key empty")]
    KeyRingEmpty,

    #[error("key version not found")]
    KeyVersionNotFound,

    #[error("unsupported algorithm")]
    UnsupportedAlgorithm,

    #[error("invalid key name")]
    KeyNameMismatch,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("kms error: {0}")]
    Kms(String),

    // ── Auth errors ──────────────────────────────────────────────────────────
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("access denied")]
    AccessDenied,

    #[error("no verification keys available")]
    JwksUnavailable,

    // ── Provider errors ──────────────────────────────────────────────────────
    #[error("passkey provider: {0}")]
    Provider(String),

    // ── Serialization / storage ──────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("not implemented")]
    NotImplemented,

    // ── General ──────────────────────────────────────────────────────────────
    #[error("{0}")]
    Internal(String),
}

/// How long a parked signing intent survives between initialize and finalize.
/// Roughly one user gesture; afterwards the cache silently drops the entry.
pub const PENDING_TRANSACTION_TTL_SECS: u64 = 120;

/// Lifetime of an unacknowledged rendezvous session.
pub const SESSION_TTL_SECS: u64 = 120;

/// Interval between JWKS refreshes for passkey-provider token verification.
pub const JWKS_REFRESH_SECS: u64 = 300;

/// Clock-skew leeway applied when validating JWT time claims.
pub const JWT_LEEWAY_SECS: u64 = 10;

/// Ed25519 seed length; the first 32 bytes of the root-key signature.
pub const ED25519_SEED_LEN: usize = 32;

/// Full ed25519 keypair length (seed ‖ public key).
pub const ED25519_KEYPAIR_LEN: usize = 64;

/// Ed25519 signature length.
pub const ED25519_SIGNATURE_LEN: usize = 64;

//! Signature-indexed rendezvous between two concurrent requests.
//!
//! One request commits data and blocks on the returned channel (typically
//! relayed as an SSE stream); a second request acknowledges the session by
//! id and hands over a payload. The session id is the base58 Ed25519
//! signature of the committed data under the process session key, so ids
//! are unforgeable and deterministic per payload.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use ed25519_dalek::{Signer, SigningKey};
use tokio::sync::{mpsc, oneshot};

use solvault_core::constants::SESSION_TTL_SECS;
use solvault_core::WalletError;

/// Payload delivered on a session channel: `Some(data)` on ack, `None` when
/// the watchdog fires.
pub type SessionPayload = Option<Vec<u8>>;

struct SessionEntry {
    signature: String,
    data: Vec<u8>,
    tx: mpsc::Sender<SessionPayload>,
    // Dropped together with the entry, which cancels the watchdog.
    _cancel: oneshot::Sender<()>,
}

struct Inner {
    signing_key: SigningKey,
    ttl: Duration,
    shards: Mutex<HashMap<String, Vec<SessionEntry>>>,
}

/// In-process session index, sharded by the first two characters of the
/// base58 signature. A single mutex guards the map; critical sections are
/// append, search, and remove only.
#[derive(Clone)]
pub struct SessionRendezvous {
    inner: Arc<Inner>,
}

impl SessionRendezvous {
    /// Build the rendezvous around the 32-byte session key seed from config.
    pub fn new(seed: &[u8]) -> Result<Self, WalletError> {
        let seed: [u8; 32] = seed
            .try_into()
            .map_err(|_| WalletError::Input("session key must be 32 bytes".into()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                signing_key: SigningKey::from_bytes(&seed),
                ttl: Duration::from_secs(SESSION_TTL_SECS),
                shards: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// Override the watchdog timeout (tests).
    pub fn with_ttl(self, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                signing_key: self.inner.signing_key.clone(),
                ttl,
                shards: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Commit `data` and open a session. Returns the session id and the
    /// single-consumer channel the acknowledgement will arrive on. The
    /// watchdog delivers `None` and removes the session after the TTL.
    pub fn create_session(
        &self,
        data: Vec<u8>,
    ) -> Result<(String, mpsc::Receiver<SessionPayload>), WalletError> {
        let signature = self.inner.signing_key.sign(&data);
        let session = bs58::encode(signature.to_bytes()).into_string();
        let shard = session[..2].to_string();

        let (tx, rx) = mpsc::channel(1);
        let (cancel_tx, cancel_rx) = oneshot::channel();

        {
            let mut shards = self
                .inner
                .shards
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let bucket = shards.entry(shard).or_default();
            if bucket.iter().any(|e| e.signature == session) {
                return Err(WalletError::SessionExists);
            }
            bucket.push(SessionEntry {
                signature: session.clone(),
                data,
                tx,
                _cancel: cancel_tx,
            });
        }

        let inner = Arc::clone(&self.inner);
        let watched = session.clone();
        let ttl = self.inner.ttl;
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(ttl) => {
                    if let Some(entry) = inner.remove_entry(&watched) {
                        let _ = entry.tx.try_send(None);
                    }
                }
                _ = cancel_rx => {}
            }
        });

        Ok((session, rx))
    }

    /// Return the data committed at session creation.
    pub fn session_data(&self, session: &str) -> Result<Vec<u8>, WalletError> {
        if session.len() < 2 {
            return Err(WalletError::SessionNotFound);
        }

        let shards = self
            .inner
            .shards
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        shards
            .get(&session[..2])
            .and_then(|bucket| bucket.iter().find(|e| e.signature == session))
            .map(|e| e.data.clone())
            .ok_or(WalletError::SessionNotFound)
    }

    /// Deliver `data` to the waiting side and retire the session. The
    /// watchdog is cancelled by the entry drop; later operations against the
    /// same id see `session not found`.
    pub fn ack_session(&self, session: &str, data: Vec<u8>) -> Result<(), WalletError> {
        let entry = self
            .inner
            .remove_entry(session)
            .ok_or(WalletError::SessionNotFound)?;
        // The receiver may already be gone (request cancelled); nothing to
        // roll back in that case.
        let _ = entry.tx.try_send(Some(data));
        Ok(())
    }
}

impl Inner {
    fn remove_entry(&self, session: &str) -> Option<SessionEntry> {
        if session.len() < 2 {
            return None;
        }

        let mut shards = self.shards.lock().unwrap_or_else(PoisonError::into_inner);
        let bucket = shards.get_mut(&session[..2])?;
        let index = bucket.iter().position(|e| e.signature == session)?;
        let entry = bucket.swap_remove(index);
        if bucket.is_empty() {
            shards.remove(&session[..2]);
        }
        Some(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendezvous(ttl: Duration) -> SessionRendezvous {
        SessionRendezvous::new(&[5u8; 32]).unwrap().with_ttl(ttl)
    }

    #[tokio::test]
    async fn ack_delivers_the_payload_exactly_once() {
        let rv = rendezvous(Duration::from_secs(120));
        let (session, mut rx) = rv.create_session(b"x".to_vec()).unwrap();

        assert_eq!(rv.session_data(&session).unwrap(), b"x");

        rv.ack_session(&session, b"y".to_vec()).unwrap();
        assert_eq!(rx.recv().await, Some(Some(b"y".to_vec())));

        // Retired: lookups and replays both miss.
        assert!(matches!(
            rv.session_data(&session),
            Err(WalletError::SessionNotFound)
        ));
        assert!(matches!(
            rv.ack_session(&session, b"z".to_vec()),
            Err(WalletError::SessionNotFound)
        ));
    }

    #[tokio::test]
    async fn duplicate_sessions_are_rejected() {
        let rv = rendezvous(Duration::from_secs(120));
        let (_session, _rx) = rv.create_session(b"x".to_vec()).unwrap();

        // Identical data signs identically, landing on the same id.
        assert!(matches!(
            rv.create_session(b"x".to_vec()),
            Err(WalletError::SessionExists)
        ));
    }

    #[tokio::test]
    async fn watchdog_delivers_none_then_retires_the_session() {
        let rv = rendezvous(Duration::from_millis(80));
        let (session, mut rx) = rv.create_session(b"x".to_vec()).unwrap();

        assert_eq!(rx.recv().await, Some(None));
        assert!(matches!(
            rv.session_data(&session),
            Err(WalletError::SessionNotFound)
        ));
    }

    #[tokio::test]
    async fn ack_before_timeout_wins() {
        let rv = rendezvous(Duration::from_millis(200));
        let (session, mut rx) = rv.create_session(b"x".to_vec()).unwrap();

        rv.ack_session(&session, b"y".to_vec()).unwrap();
        assert_eq!(rx.recv().await, Some(Some(b"y".to_vec())));

        // The channel closes without a timeout payload following the ack.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn session_ids_are_deterministic_per_payload() {
        let rv = rendezvous(Duration::from_secs(120));
        let (a, _rx_a) = rv.create_session(b"x".to_vec()).unwrap();
        rv.ack_session(&a, vec![]).unwrap();

        // Re-creating with the same payload lands on the same id.
        let (b, _rx_b) = rv.create_session(b"x".to_vec()).unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let rv = rendezvous(Duration::from_secs(120));
        assert!(matches!(
            rv.session_data("definitely-missing"),
            Err(WalletError::SessionNotFound)
        ));
        assert!(matches!(
            rv.ack_session("definitely-missing", vec![]),
            Err(WalletError::SessionNotFound)
        ));
    }
}

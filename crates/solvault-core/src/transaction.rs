use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which signing track parked this entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingKind {
    Message,
    Transaction,
}

/// The parked result of an initialize step, held in the cache store under
/// `tx:<id>` until finalize consumes it or the TTL drops it.
///
/// Signatures are stored base58-encoded (Solana convention).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub id: Uuid,
    pub kind: PendingKind,

    /// Message track: the raw message bytes and their signature.
    #[serde(with = "crate::b64::option", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    /// Transaction track: the signed wire bytes and the signatures applied.
    #[serde(with = "crate::b64::option", default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<Vec<u8>>,
    #[serde(default)]
    pub versioned: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signatures: Vec<String>,
}

impl PendingTransaction {
    pub fn message(id: Uuid, message: Vec<u8>, signature: String) -> Self {
        Self {
            id,
            kind: PendingKind::Message,
            message: Some(message),
            signature: Some(signature),
            transaction: None,
            versioned: false,
            signatures: Vec::new(),
        }
    }

    pub fn transaction(
        id: Uuid,
        transaction: Vec<u8>,
        versioned: bool,
        signatures: Vec<String>,
    ) -> Self {
        Self {
            id,
            kind: PendingKind::Transaction,
            message: None,
            signature: None,
            transaction: Some(transaction),
            versioned,
            signatures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_entry_round_trips_as_json() {
        let id = Uuid::new_v4();
        let entry = PendingTransaction::message(id, b"hello".to_vec(), "sig".into());
        let json = serde_json::to_string(&entry).unwrap();
        let back: PendingTransaction = serde_json::from_str(&json).unwrap();

        assert_eq!(back.id, id);
        assert_eq!(back.kind, PendingKind::Message);
        assert_eq!(back.message.as_deref(), Some(b"hello".as_ref()));
        assert_eq!(back.signature.as_deref(), Some("sig"));
        assert!(back.transaction.is_none());
    }

    #[test]
    fn transaction_entry_keeps_versioned_flag() {
        let id = Uuid::new_v4();
        let entry =
            PendingTransaction::transaction(id, vec![1, 2, 3], true, vec!["s1".into()]);
        let json = serde_json::to_string(&entry).unwrap();
        let back: PendingTransaction = serde_json::from_str(&json).unwrap();

        assert_eq!(back.kind, PendingKind::Transaction);
        assert!(back.versioned);
        assert_eq!(back.transaction.as_deref(), Some([1, 2, 3].as_ref()));
        assert_eq!(back.signatures, vec!["s1".to_string()]);
    }
}

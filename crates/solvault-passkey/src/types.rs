use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// WebAuthn credential-request options issued by the provider. The service
/// never interprets these; the `publicKey` request (challenge included) is
/// carried verbatim to the browser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialAssertion {
    #[serde(rename = "publicKey")]
    pub public_key: serde_json::Value,
}

/// The client's parsed WebAuthn assertion, forwarded verbatim to the
/// provider's finalize endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParsedAssertion(pub serde_json::Value);

/// Parameters for the provider's transaction-initialize call. The
/// `transaction_data` is the base64 SHA-256 digest the provider binds into
/// its challenge.
#[derive(Debug, Clone, Serialize)]
pub struct InitializeTransactionRequest {
    pub user_id: String,
    pub transaction_id: Uuid,
    pub transaction_data: String,
}

/// Error body the provider returns on non-200 responses.
#[derive(Debug, Clone, Deserialize)]
pub struct FailureResult {
    #[serde(default)]
    pub title: Vec<String>,
    #[serde(default)]
    pub details: Vec<String>,
    #[serde(default)]
    pub status: u16,
}

impl FailureResult {
    pub fn message(&self) -> String {
        match self.title.first() {
            Some(title) => title.clone(),
            None => format!("provider returned status {}", self.status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_result_prefers_the_first_title() {
        let failure: FailureResult = serde_json::from_str(
            r#"{"title":["user not found"],"details":["no such user"],"status":404}"#,
        )
        .unwrap();
        assert_eq!(failure.message(), "user not found");
    }

    #[test]
    fn failure_result_tolerates_sparse_bodies() {
        let failure: FailureResult = serde_json::from_str(r#"{"status":500}"#).unwrap();
        assert_eq!(failure.message(), "provider returned status 500");
    }

    #[test]
    fn assertion_passes_through_unmodified() {
        let raw = serde_json::json!({
            "id": "credential-id",
            "rawId": "credential-id",
            "type": "public-key",
            "response": {"clientDataJSON": "...", "signature": "..."}
        });
        let assertion: ParsedAssertion = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&assertion).unwrap(), raw);
    }
}

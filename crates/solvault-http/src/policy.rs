use async_trait::async_trait;

use solvault_core::WalletError;
use solvault_passkey::Claims;

/// Relationship flags between the caller and the object of a request,
/// combined bitwise into `who_flags`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Who {
    Owner = 1,
    Group = 2,
    Others = 4,
    Admin = 8,
    All = 16,
}

pub fn flags(who: &[Who]) -> u8 {
    who.iter().fold(0, |acc, w| acc | *w as u8)
}

/// Input handed to the policy engine for every protected request.
#[derive(Debug, Clone)]
pub struct PolicyInput {
    pub domain: String,
    pub action: String,
    pub who_flags: u8,
    /// The `:user` path parameter, when the route carries one.
    pub object: Option<String>,
    pub claims: Claims,
}

/// The access-control engine. The real evaluator is an external
/// collaborator; this crate defines the contract and ships two small
/// evaluators for development and tests.
#[async_trait]
pub trait Policy: Send + Sync {
    async fn eval(&self, input: &PolicyInput) -> Result<bool, WalletError>;
}

/// Permits everything. Development only.
pub struct AllowAll;

#[async_trait]
impl Policy for AllowAll {
    async fn eval(&self, _input: &PolicyInput) -> Result<bool, WalletError> {
        Ok(true)
    }
}

/// Owner-or-admin evaluator: the token subject may act on its own object
/// when the route grants `Owner`; callers with an `admin` role pass when the
/// route grants `Admin`.
pub struct SubjectPolicy;

#[async_trait]
impl Policy for SubjectPolicy {
    async fn eval(&self, input: &PolicyInput) -> Result<bool, WalletError> {
        let subject = input.claims.get("sub").and_then(|v| v.as_str());

        if input.who_flags & Who::Admin as u8 != 0 {
            let is_admin = input
                .claims
                .get("roles")
                .and_then(|v| v.as_array())
                .map(|roles| roles.iter().any(|r| r.as_str() == Some("admin")))
                .unwrap_or(false);
            if is_admin {
                return Ok(true);
            }
        }

        if input.who_flags & Who::Owner as u8 != 0 {
            if let (Some(subject), Some(object)) = (subject, input.object.as_deref()) {
                if subject == object {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }
}

pub mod client;
pub mod token;
pub mod types;

pub use client::{Passkeys, RestPasskeyClient};
pub use token::{Claims, TokenVerifier};
pub use types::{
    CredentialAssertion, FailureResult, InitializeTransactionRequest, ParsedAssertion,
};

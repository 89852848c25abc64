use std::sync::Arc;

use solvault_passkey::TokenVerifier;
use solvault_wallet::WalletService;

use crate::policy::Policy;

/// Shared state handed to every handler and the auth middleware.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<WalletService>,
    pub verifier: Arc<TokenVerifier>,
    pub policy: Arc<dyn Policy>,
}

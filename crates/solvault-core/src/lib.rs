pub mod account;
pub mod b64;
pub mod config;
pub mod constants;
pub mod error;
pub mod transaction;

pub use account::Account;
pub use config::Config;
pub use error::WalletError;
pub use transaction::{PendingKind, PendingTransaction};

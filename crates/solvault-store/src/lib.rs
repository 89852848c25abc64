pub mod composite;
pub mod repository;
pub mod sled_store;
pub mod solana;

pub use composite::CompositeAccountRepository;
pub use repository::{build_repository, AccountRepository};
pub use sled_store::SledAccountRepository;
pub use solana::SolanaAccountRepository;

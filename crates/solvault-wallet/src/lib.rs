pub mod pipeline;
pub mod service;
pub mod signer;

pub use pipeline::{
    FinalizeSignMessageResponse, FinalizeSignTransactionResponse,
    InitializeSignMessageRequest, InitializeSignResponse, InitializeSignTransactionRequest,
};
pub use service::WalletService;
pub use signer::{SignerLookup, WireTransaction};

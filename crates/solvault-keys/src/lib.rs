pub mod derive;
pub mod google;
pub mod kms;
pub mod keyring;

pub use derive::{derive_account, derive_with_salt};
pub use google::GoogleKmsClient;
pub use kms::{KeyAlgorithm, KmsClient, KmsKeyVersion, KmsSignature, SoftwareKms};
pub use keyring::{KeyHandle, KeyRing};

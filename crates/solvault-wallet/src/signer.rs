use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::{Transaction, VersionedTransaction};

use solvault_core::{Account, WalletError};

/// Signer-getter: hands back a signature when it recognizes the requested
/// public key, `None` otherwise. This is the seam the Solana signing step
/// uses to fill only the signer slots belonging to the derived wallet.
pub trait SignerLookup {
    fn sign_for(&self, pubkey: &Pubkey, message: &[u8]) -> Option<Signature>;
}

impl SignerLookup for Account {
    fn sign_for(&self, pubkey: &Pubkey, message: &[u8]) -> Option<Signature> {
        let wallet = self.wallet().ok()?;
        if *pubkey != wallet {
            return None;
        }
        self.sign(message).ok()
    }
}

/// A Solana transaction in either wire encoding.
pub enum WireTransaction {
    Legacy(Transaction),
    Versioned(VersionedTransaction),
}

impl WireTransaction {
    /// Decode wire bytes according to the request's `versioned` flag.
    pub fn decode(bytes: &[u8], versioned: bool) -> Result<Self, WalletError> {
        if versioned {
            bincode::deserialize::<VersionedTransaction>(bytes)
                .map(Self::Versioned)
                .map_err(|e| WalletError::Input(format!("invalid transaction: {e}")))
        } else {
            bincode::deserialize::<Transaction>(bytes)
                .map(Self::Legacy)
                .map_err(|e| WalletError::Input(format!("invalid transaction: {e}")))
        }
    }

    /// Serialize back to wire bytes.
    pub fn encode(&self) -> Result<Vec<u8>, WalletError> {
        match self {
            Self::Legacy(tx) => bincode::serialize(tx),
            Self::Versioned(tx) => bincode::serialize(tx),
        }
        .map_err(|e| WalletError::Serialization(e.to_string()))
    }

    /// Sign every required-signer slot the lookup recognizes, writing the
    /// signatures into the transaction and returning the ones produced.
    pub fn sign_with(&mut self, signer: &dyn SignerLookup) -> Vec<Signature> {
        let mut produced = Vec::new();

        match self {
            Self::Legacy(tx) => {
                let message = tx.message_data();
                let required = tx.message.header.num_required_signatures as usize;
                if tx.signatures.len() < required {
                    tx.signatures.resize(required, Signature::default());
                }
                for i in 0..required {
                    let Some(key) = tx.message.account_keys.get(i) else { continue };
                    if let Some(sig) = signer.sign_for(key, &message) {
                        tx.signatures[i] = sig;
                        produced.push(sig);
                    }
                }
            }
            Self::Versioned(tx) => {
                let message = tx.message.serialize();
                let required = tx.message.header().num_required_signatures as usize;
                if tx.signatures.len() < required {
                    tx.signatures.resize(required, Signature::default());
                }
                for i in 0..required {
                    let Some(key) = tx.message.static_account_keys().get(i) else {
                        continue;
                    };
                    if let Some(sig) = signer.sign_for(key, &message) {
                        tx.signatures[i] = sig;
                        produced.push(sig);
                    }
                }
            }
        }

        produced
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::hash::Hash;
    use solana_sdk::message::{Message, VersionedMessage};
    use solana_sdk::signature::Keypair;
    use solana_sdk::signer::Signer;
    use solana_sdk::system_instruction;

    fn account_with_keypair() -> (Keypair, Account) {
        let kp = Keypair::new();
        let account =
            Account::new("alice", "salt-1", 1, kp.to_bytes().to_vec()).unwrap();
        (kp, account)
    }

    fn transfer_message(payer: &Pubkey) -> Message {
        let ix = system_instruction::transfer(payer, &Pubkey::new_unique(), 1);
        Message::new_with_blockhash(&[ix], Some(payer), &Hash::default())
    }

    #[test]
    fn signs_the_matching_required_signer_slot() {
        let (kp, account) = account_with_keypair();
        let tx = Transaction::new_unsigned(transfer_message(&kp.pubkey()));
        let mut wire = WireTransaction::Legacy(tx);

        let produced = wire.sign_with(&account);
        assert_eq!(produced.len(), 1);

        let WireTransaction::Legacy(signed) = wire else { unreachable!() };
        assert!(signed.verify().is_ok());
    }

    #[test]
    fn foreign_transactions_are_left_unsigned() {
        let (_, account) = account_with_keypair();
        let other = Keypair::new();
        let tx = Transaction::new_unsigned(transfer_message(&other.pubkey()));
        let mut wire = WireTransaction::Legacy(tx);

        assert!(wire.sign_with(&account).is_empty());

        let WireTransaction::Legacy(unsigned) = wire else { unreachable!() };
        assert_eq!(unsigned.signatures[0], Signature::default());
    }

    #[test]
    fn versioned_round_trip_signs_and_verifies() {
        let (kp, account) = account_with_keypair();
        let message = VersionedMessage::Legacy(transfer_message(&kp.pubkey()));
        let tx = VersionedTransaction {
            signatures: vec![Signature::default()],
            message,
        };

        let bytes = bincode::serialize(&tx).unwrap();
        let mut wire = WireTransaction::decode(&bytes, true).unwrap();
        let produced = wire.sign_with(&account);
        assert_eq!(produced.len(), 1);

        let WireTransaction::Versioned(signed) = wire else { unreachable!() };
        let serialized = signed.message.serialize();
        assert!(signed.signatures[0].verify(kp.pubkey().as_ref(), &serialized));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            WireTransaction::decode(b"not a transaction", false),
            Err(WalletError::Input(_))
        ));
    }
}

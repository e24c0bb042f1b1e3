use privacy_crypto::utils::{hash_h, HASH_SIZE};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, TxError};
use crate::message::TxType;

/// Payload attached to a privacy message, one variant per transaction kind
/// that carries extra data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Metadata {
    /// Moves `amount` out of the shielded pool to a public account.
    Unshield { to_address: String, amount: u64 },
}

impl Metadata {
    pub fn tx_type(&self) -> TxType {
        match self {
            Metadata::Unshield { .. } => TxType::Unshield,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn hash(&self) -> Result<[u8; HASH_SIZE]> {
        Ok(hash_h(&self.to_bytes()?))
    }

    pub fn validate_sanity(&self) -> Result<()> {
        match self {
            Metadata::Unshield { to_address, amount } => {
                if to_address.trim().is_empty() {
                    return Err(TxError::sanity("unshield: empty destination address"));
                }
                if *amount == 0 {
                    return Err(TxError::sanity("unshield: zero amount"));
                }
                Ok(())
            }
        }
    }

    pub fn validate_by_itself(&self, tx_type: TxType) -> Result<()> {
        if self.tx_type() != tx_type {
            return Err(TxError::sanity(format!(
                "metadata of {:?} attached to a {:?} transaction",
                self.tx_type(),
                tx_type
            )));
        }
        self.validate_sanity()
    }
}

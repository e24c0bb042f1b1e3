use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use privacy_crypto::utils::{hash_h, HASH_SIZE};
use privacy_types::hex_serde;
use privacy_types::PaymentProof;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, TxError};
use crate::metadata::Metadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum TxType {
    Mint = 1,
    Transfer = 2,
    Unshield = 3,
}

impl TxType {
    /// Whether the message spends shielded inputs under a ring signature.
    pub fn is_private_spend(self) -> bool {
        matches!(self, TxType::Transfer | TxType::Unshield)
    }
}

impl TryFrom<u8> for TxType {
    type Error = TxError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(TxType::Mint),
            2 => Ok(TxType::Transfer),
            3 => Ok(TxType::Unshield),
            other => Err(TxError::sanity(format!("unknown tx type {}", other))),
        }
    }
}

impl From<TxType> for u8 {
    fn from(t: TxType) -> u8 {
        t as u8
    }
}

/// Signed privacy transaction as submitted to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivacyMessage {
    #[serde(with = "hex_serde")]
    pub hash: Vec<u8>,
    pub lock_time: u64,
    pub fee: u64,
    #[serde(with = "hex_serde")]
    pub info: Vec<u8>,
    #[serde(with = "hex_serde")]
    pub sig_pub_key: Vec<u8>,
    #[serde(with = "hex_serde")]
    pub sig: Vec<u8>,
    #[serde(with = "hex_serde")]
    pub proof: Vec<u8>,
    pub tx_type: TxType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl PrivacyMessage {
    pub fn payment_proof(&self) -> Result<PaymentProof> {
        Ok(PaymentProof::from_bytes(&self.proof)?)
    }

    pub fn compute_hash(&self) -> Result<[u8; HASH_SIZE]> {
        let proof = self.payment_proof()?;
        msg_hash(self.lock_time, self.fee, Some(&proof), self.metadata.as_ref())
    }

    /// Size of the JSON form in started kB.
    pub fn size_in_kb(&self) -> Result<u64> {
        let len = serde_json::to_vec(self)?.len() as u64;
        Ok(len.div_ceil(1024))
    }
}

/// Deposit from a public account into a single plaintext shielded output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgShield {
    #[serde(with = "hex_serde")]
    pub hash: Vec<u8>,
    pub from: String,
    pub amount: u64,
    pub lock_time: u64,
    #[serde(with = "hex_serde")]
    pub proof: Vec<u8>,
}

impl MsgShield {
    pub fn payment_proof(&self) -> Result<PaymentProof> {
        Ok(PaymentProof::from_bytes(&self.proof)?)
    }
}

/// `HashH(lockTime || fee || base64(proof) || hex(metadata hash))`, with the
/// integers in decimal.
pub fn msg_hash(
    lock_time: u64,
    fee: u64,
    proof: Option<&PaymentProof>,
    metadata: Option<&Metadata>,
) -> Result<[u8; HASH_SIZE]> {
    let mut record = lock_time.to_string();
    record.push_str(&fee.to_string());
    if let Some(proof) = proof {
        record.push_str(&STANDARD.encode(proof.to_bytes()?));
    }
    if let Some(md) = metadata {
        record.push_str(&hex::encode(md.hash()?));
    }
    Ok(hash_h(record.as_bytes()))
}

pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

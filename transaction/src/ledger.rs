//! Ledger lookups consumed by ring reconstruction and the double-spend
//! guard, and the records an accepted proof adds to the ledger.

use std::collections::HashMap;

use curve25519_dalek::ristretto::RistrettoPoint;
use privacy_crypto::operation::point_to_bytes;
use privacy_crypto::utils::hash_h;
use privacy_types::hex_serde;
use privacy_types::{Coin, PaymentProof};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{Result, TxError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialNumberRecord {
    pub index: String,
    #[serde(with = "hex_serde")]
    pub value: Vec<u8>,
    pub is_confidential_asset: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentRecord {
    pub index: String,
    #[serde(with = "hex_serde")]
    pub value: Vec<u8>,
    pub is_confidential_asset: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputCoinRecord {
    pub index: String,
    /// Running output count when the coin was accepted.
    pub position: u64,
    pub is_confidential_asset: bool,
    #[serde(with = "hex_serde")]
    pub public_key: Vec<u8>,
    #[serde(with = "hex_serde")]
    pub value: Vec<u8>,
}

/// Maps a decimal output position to the output coin stored there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtaCoinRecord {
    pub index: String,
    pub output_coin_index: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnetimeAddressRecord {
    pub index: String,
    pub is_confidential_asset: bool,
    #[serde(with = "hex_serde")]
    pub public_key: Vec<u8>,
}

/// Read side of the ledger. A single verification must observe one
/// consistent snapshot through these methods.
pub trait LedgerReader {
    fn get_serial_number(&self, index: &str) -> Option<SerialNumberRecord>;

    fn get_onetime_address(&self, index: &str) -> Option<OnetimeAddressRecord>;

    fn get_ota_coin(&self, index: &str) -> Option<OtaCoinRecord>;

    fn get_output_coin(&self, index: &str) -> Option<OutputCoinRecord>;

    fn output_coin_count(&self) -> u64;

    /// Every stored output coin, ordered by position.
    fn output_coins(&self) -> Vec<OutputCoinRecord>;
}

/// `hex(HashH(flag || key image))`
pub fn serial_number_index(is_confidential_asset: bool, key_image: &RistrettoPoint) -> String {
    let mut b = Vec::with_capacity(33);
    b.push(u8::from(is_confidential_asset));
    b.extend_from_slice(&point_to_bytes(key_image));
    hex::encode(hash_h(&b))
}

/// `hex(HashH(flag || public key || coin bytes))`
pub fn onetime_address_index(coin: &Coin) -> Result<String> {
    let public_key = coin
        .public_key()
        .ok_or_else(|| TxError::sanity("output coin has no public key"))?;
    let mut b = vec![u8::from(coin.is_confidential_asset())];
    b.extend_from_slice(&point_to_bytes(public_key));
    b.extend_from_slice(&coin.to_bytes());
    Ok(hex::encode(hash_h(&b)))
}

/// Serial-number index of an input coin's key image.
pub fn coin_serial_number_index(coin: &Coin) -> Result<String> {
    let key_image = coin
        .key_image()
        .ok_or_else(|| TxError::sanity("input coin has no key image"))?;
    Ok(serial_number_index(coin.is_confidential_asset(), key_image))
}

/// Records derived from one accepted proof.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerUpdate {
    pub serial_numbers: Vec<SerialNumberRecord>,
    pub commitments: Vec<CommitmentRecord>,
    pub output_coins: Vec<OutputCoinRecord>,
    pub ota_coins: Vec<OtaCoinRecord>,
    pub onetime_addresses: Vec<OnetimeAddressRecord>,
    pub next_output_count: u64,
}

pub fn fetch_data_from_tx(proof_bytes: &[u8], output_coin_count: u64) -> Result<LedgerUpdate> {
    let proof = PaymentProof::from_bytes(proof_bytes)?;
    fetch_data_from_proof(&proof, output_coin_count)
}

pub fn fetch_data_from_proof(proof: &PaymentProof, output_coin_count: u64) -> Result<LedgerUpdate> {
    let mut update = LedgerUpdate {
        next_output_count: output_coin_count,
        ..LedgerUpdate::default()
    };

    for coin in proof.input_coins() {
        let key_image = coin
            .key_image()
            .ok_or_else(|| TxError::sanity("input coin has no key image"))?;
        let is_ca = coin.is_confidential_asset();
        update.serial_numbers.push(SerialNumberRecord {
            index: serial_number_index(is_ca, key_image),
            value: point_to_bytes(key_image).to_vec(),
            is_confidential_asset: is_ca,
        });
    }

    for coin in proof.output_coins() {
        let is_ca = coin.is_confidential_asset();
        let public_key = coin
            .public_key()
            .ok_or_else(|| TxError::sanity("output coin has no public key"))?;
        let commitment = coin
            .commitment()
            .ok_or_else(|| TxError::sanity("output coin has no commitment"))?;

        let mut cm_preimage = vec![u8::from(is_ca)];
        cm_preimage.extend_from_slice(&point_to_bytes(commitment));
        update.commitments.push(CommitmentRecord {
            index: hex::encode(hash_h(&cm_preimage)),
            value: point_to_bytes(commitment).to_vec(),
            is_confidential_asset: is_ca,
        });

        let index = onetime_address_index(coin)?;
        let position = update.next_output_count;
        update.output_coins.push(OutputCoinRecord {
            index: index.clone(),
            position,
            is_confidential_asset: is_ca,
            public_key: point_to_bytes(public_key).to_vec(),
            value: coin.to_bytes(),
        });
        update.ota_coins.push(OtaCoinRecord {
            index: position.to_string(),
            output_coin_index: index.clone(),
        });
        update.onetime_addresses.push(OnetimeAddressRecord {
            index,
            is_confidential_asset: is_ca,
            public_key: point_to_bytes(public_key).to_vec(),
        });
        update.next_output_count += 1;
    }

    Ok(update)
}

/// Map-backed ledger for tests and the simulator.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    serial_numbers: HashMap<String, SerialNumberRecord>,
    commitments: HashMap<String, CommitmentRecord>,
    output_coins: HashMap<String, OutputCoinRecord>,
    ota_coins: HashMap<String, OtaCoinRecord>,
    onetime_addresses: HashMap<String, OnetimeAddressRecord>,
    output_coin_count: u64,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commitment_count(&self) -> usize {
        self.commitments.len()
    }

    pub fn serial_number_count(&self) -> usize {
        self.serial_numbers.len()
    }

    /// Applies every record of `update` or none of them.
    pub fn apply(&mut self, update: LedgerUpdate) -> Result<()> {
        if update.next_output_count != self.output_coin_count + update.output_coins.len() as u64 {
            return Err(TxError::ledger(format!(
                "update was derived at output count {}, ledger is at {}",
                update
                    .next_output_count
                    .saturating_sub(update.output_coins.len() as u64),
                self.output_coin_count
            )));
        }
        for sn in &update.serial_numbers {
            if self.serial_numbers.contains_key(&sn.index) {
                return Err(TxError::Duplicate {
                    kind: "serial number",
                    index: sn.index.clone(),
                });
            }
        }
        for ota in &update.onetime_addresses {
            if self.onetime_addresses.contains_key(&ota.index) {
                return Err(TxError::Duplicate {
                    kind: "onetime address",
                    index: ota.index.clone(),
                });
            }
        }

        debug!(
            serial_numbers = update.serial_numbers.len(),
            output_coins = update.output_coins.len(),
            "applying ledger update"
        );
        for r in update.serial_numbers {
            self.serial_numbers.insert(r.index.clone(), r);
        }
        for r in update.commitments {
            self.commitments.insert(r.index.clone(), r);
        }
        for r in update.output_coins {
            self.output_coins.insert(r.index.clone(), r);
        }
        for r in update.ota_coins {
            self.ota_coins.insert(r.index.clone(), r);
        }
        for r in update.onetime_addresses {
            self.onetime_addresses.insert(r.index.clone(), r);
        }
        self.output_coin_count = update.next_output_count;
        Ok(())
    }

    pub fn apply_proof(&mut self, proof_bytes: &[u8]) -> Result<()> {
        let update = fetch_data_from_tx(proof_bytes, self.output_coin_count)?;
        self.apply(update)
    }
}

impl LedgerReader for MemoryLedger {
    fn get_serial_number(&self, index: &str) -> Option<SerialNumberRecord> {
        self.serial_numbers.get(index).cloned()
    }

    fn get_onetime_address(&self, index: &str) -> Option<OnetimeAddressRecord> {
        self.onetime_addresses.get(index).cloned()
    }

    fn get_ota_coin(&self, index: &str) -> Option<OtaCoinRecord> {
        self.ota_coins.get(index).cloned()
    }

    fn get_output_coin(&self, index: &str) -> Option<OutputCoinRecord> {
        self.output_coins.get(index).cloned()
    }

    fn output_coin_count(&self) -> u64 {
        self.output_coin_count
    }

    fn output_coins(&self) -> Vec<OutputCoinRecord> {
        let mut coins: Vec<_> = self.output_coins.values().cloned().collect();
        coins.sort_by_key(|c| c.position);
        coins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use privacy_crypto::operation::random_point;
    use privacy_types::{KeySet, PaymentInfo};

    fn output_coin(seed: &[u8], amount: u64) -> Coin {
        let ks = KeySet::from_seed(seed);
        let mut coin =
            Coin::new_from_payment_info(&PaymentInfo::new(*ks.payment_address(), amount, Vec::new()));
        coin.conceal_output_coin(ks.payment_address().public_view());
        coin
    }

    fn spent_input() -> Coin {
        let mut coin = Coin::default();
        coin.set_key_image(Some(random_point()));
        coin.conceal_input_coin();
        coin
    }

    #[test]
    fn test_fetch_data_from_proof() {
        let outputs = vec![output_coin(b"a", 1), output_coin(b"b", 2)];
        let input = spent_input();
        let proof = PaymentProof::new(None, vec![input.clone()], outputs.clone());

        let update = fetch_data_from_tx(&proof.to_bytes().unwrap(), 7).unwrap();
        assert_eq!(update.serial_numbers.len(), 1);
        assert_eq!(
            update.serial_numbers[0].index,
            coin_serial_number_index(&input).unwrap()
        );
        assert_eq!(update.output_coins.len(), 2);
        assert_eq!(update.output_coins[0].position, 7);
        assert_eq!(update.output_coins[1].position, 8);
        assert_eq!(update.ota_coins[1].index, "8");
        assert_eq!(
            update.ota_coins[1].output_coin_index,
            onetime_address_index(&outputs[1]).unwrap()
        );
        assert_eq!(update.next_output_count, 9);
    }

    #[test]
    fn test_index_depends_on_asset_flag() {
        let ki = random_point();
        assert_ne!(serial_number_index(false, &ki), serial_number_index(true, &ki));
        assert_eq!(serial_number_index(false, &ki).len(), 64);
    }

    #[test]
    fn test_memory_ledger_apply() {
        let mut ledger = MemoryLedger::new();
        let proof = PaymentProof::new(None, vec![spent_input()], vec![output_coin(b"a", 5)]);
        ledger.apply_proof(&proof.to_bytes().unwrap()).unwrap();

        assert_eq!(ledger.output_coin_count(), 1);
        assert_eq!(ledger.serial_number_count(), 1);
        assert_eq!(ledger.commitment_count(), 1);

        let ota = ledger.get_ota_coin("0").unwrap();
        let stored = ledger.get_output_coin(&ota.output_coin_index).unwrap();
        assert_eq!(Coin::from_bytes(&stored.value).unwrap(), proof.output_coins()[0]);
        assert!(ledger.get_onetime_address(&ota.output_coin_index).is_some());
        assert_eq!(ledger.output_coins().len(), 1);
    }

    #[test]
    fn test_memory_ledger_rejects_replay_atomically() {
        let mut ledger = MemoryLedger::new();
        let proof = PaymentProof::new(None, vec![spent_input()], vec![output_coin(b"a", 5)]);
        ledger.apply_proof(&proof.to_bytes().unwrap()).unwrap();

        let err = ledger.apply_proof(&proof.to_bytes().unwrap()).unwrap_err();
        assert!(matches!(err, TxError::Duplicate { kind: "serial number", .. }));
        assert_eq!(ledger.output_coin_count(), 1);
        assert_eq!(ledger.output_coins().len(), 1);
    }

    #[test]
    fn test_memory_ledger_rejects_stale_update() {
        let mut ledger = MemoryLedger::new();
        let proof = PaymentProof::new(None, Vec::new(), vec![output_coin(b"a", 5)]);
        let stale = fetch_data_from_proof(&proof, 3).unwrap();
        assert!(matches!(ledger.apply(stale), Err(TxError::Ledger(_))));
    }
}

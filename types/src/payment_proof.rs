use std::collections::HashSet;

use privacy_crypto::bulletproofs::AggregatedRangeProof;
use privacy_crypto::operation::point_to_bytes;
use privacy_crypto::reader::ByteReader;
use privacy_crypto::{CryptoError, Result};

use crate::coin::Coin;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::hex_serde;

/// Coin counts are written as a single byte.
pub const MAX_COIN_COUNT: usize = 255;

/// Range proof plus the input and output coins of one transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentProof {
    aggregated_range_proof: Option<AggregatedRangeProof>,
    input_coins: Vec<Coin>,
    output_coins: Vec<Coin>,
}

impl PaymentProof {
    pub fn new(
        aggregated_range_proof: Option<AggregatedRangeProof>,
        input_coins: Vec<Coin>,
        output_coins: Vec<Coin>,
    ) -> Self {
        Self {
            aggregated_range_proof,
            input_coins,
            output_coins,
        }
    }

    pub fn aggregated_range_proof(&self) -> Option<&AggregatedRangeProof> {
        self.aggregated_range_proof.as_ref()
    }

    pub fn input_coins(&self) -> &[Coin] {
        &self.input_coins
    }

    pub fn output_coins(&self) -> &[Coin] {
        &self.output_coins
    }

    pub fn set_aggregated_range_proof(&mut self, proof: Option<AggregatedRangeProof>) {
        self.aggregated_range_proof = proof;
    }

    pub fn set_input_coins(&mut self, coins: Vec<Coin>) {
        self.input_coins = coins;
    }

    pub fn set_output_coins(&mut self, coins: Vec<Coin>) {
        self.output_coins = coins;
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut b = Vec::new();

        let range_proof = self
            .aggregated_range_proof
            .as_ref()
            .map(AggregatedRangeProof::to_bytes)
            .unwrap_or_default();
        b.extend_from_slice(&(range_proof.len() as u32).to_be_bytes());
        b.extend_from_slice(&range_proof);

        push_coins(&mut b, &self.input_coins, "input")?;
        push_coins(&mut b, &self.output_coins, "output")?;
        Ok(b)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(CryptoError::parse("payment proof bytes are empty"));
        }
        let mut reader = ByteReader::new(bytes);

        let range_len = reader.read_u32_be("range proof length")? as usize;
        let aggregated_range_proof = if range_len > 0 {
            let raw = reader.read_bytes(range_len, "range proof")?;
            Some(AggregatedRangeProof::from_bytes(raw)?)
        } else {
            None
        };

        let input_coins = read_coins(&mut reader, "input coin")?;
        let output_coins = read_coins(&mut reader, "output coin")?;
        reader.finish("payment proof")?;

        Ok(Self {
            aggregated_range_proof,
            input_coins,
            output_coins,
        })
    }

    pub fn validate_sanity(&self) -> Result<()> {
        if self.input_coins.len() > MAX_COIN_COUNT {
            return Err(CryptoError::invalid_input(format!(
                "too many input coins: {}",
                self.input_coins.len()
            )));
        }
        if self.output_coins.len() > MAX_COIN_COUNT {
            return Err(CryptoError::invalid_input(format!(
                "too many output coins: {}",
                self.output_coins.len()
            )));
        }
        if let Some(range_proof) = &self.aggregated_range_proof {
            if !range_proof.validate_sanity() {
                return Err(CryptoError::proof_invalid(
                    "aggregated range proof failed sanity check",
                ));
            }
        }

        let mut public_keys = HashSet::with_capacity(self.output_coins.len());
        for coin in &self.output_coins {
            let public_key = coin.public_key().ok_or_else(|| {
                CryptoError::GroupValidation("output coin has no public key".into())
            })?;
            if !public_keys.insert(point_to_bytes(public_key)) {
                return Err(CryptoError::invalid_input(
                    "duplicate output coin public key",
                ));
            }
            if coin.commitment().is_none() {
                return Err(CryptoError::GroupValidation(
                    "output coin has no commitment".into(),
                ));
            }
        }
        Ok(())
    }

    /// Input key images must be distinct, and a present range proof must
    /// cover exactly the output commitments.
    pub fn verify(&self) -> Result<()> {
        let mut key_images = HashSet::with_capacity(self.input_coins.len());
        for coin in &self.input_coins {
            let key_image = coin
                .key_image()
                .ok_or_else(|| CryptoError::invalid_input("input coin has no key image"))?;
            if !key_images.insert(point_to_bytes(key_image)) {
                return Err(CryptoError::invalid_input("duplicate input coin in proof"));
            }
        }

        if let Some(range_proof) = &self.aggregated_range_proof {
            let outputs: Vec<_> = self
                .output_coins
                .iter()
                .map(|c| c.commitment().copied())
                .collect();
            let committed: Vec<_> = range_proof.commitments().iter().copied().map(Some).collect();
            if outputs != committed {
                return Err(CryptoError::proof_invalid(
                    "range proof commitments do not match output coins",
                ));
            }
            range_proof.verify()?;
        }
        Ok(())
    }
}

fn push_coins(b: &mut Vec<u8>, coins: &[Coin], kind: &str) -> Result<()> {
    if coins.len() > MAX_COIN_COUNT {
        return Err(CryptoError::invalid_input(format!(
            "too many {} coins to encode: {}",
            kind,
            coins.len()
        )));
    }
    b.push(coins.len() as u8);
    for coin in coins {
        let raw = coin.to_bytes();
        if raw.len() < 256 {
            b.push(raw.len() as u8);
        } else {
            let len = u16::try_from(raw.len()).map_err(|_| {
                CryptoError::invalid_input(format!("{} coin is {} bytes long", kind, raw.len()))
            })?;
            b.extend_from_slice(&len.to_be_bytes());
        }
        b.extend_from_slice(&raw);
    }
    Ok(())
}

/// Coin lengths are one byte unless that reading fails to decode, in which
/// case the byte and its successor form a big-endian two-byte length.
fn read_coins(reader: &mut ByteReader<'_>, field: &str) -> Result<Vec<Coin>> {
    let count = reader.read_u8(field)? as usize;
    let mut coins = Vec::with_capacity(count);
    for _ in 0..count {
        let checkpoint = reader.clone();
        let short_len = reader.read_u8(field)? as usize;
        let short = reader
            .read_bytes(short_len, field)
            .and_then(Coin::from_bytes);
        match short {
            Ok(coin) => coins.push(coin),
            Err(_) => {
                *reader = checkpoint;
                let long_len = reader.read_u16_be(field)? as usize;
                let raw = reader.read_bytes(long_len, field)?;
                coins.push(Coin::from_bytes(raw)?);
            }
        }
    }
    Ok(coins)
}

impl Serialize for PaymentProof {
    fn serialize<S: Serializer>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error> {
        use serde::ser::Error;
        let bytes = self.to_bytes().map_err(S::Error::custom)?;
        hex_serde::serialize(&bytes, serializer)
    }
}

impl<'de> Deserialize<'de> for PaymentProof {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> core::result::Result<Self, D::Error> {
        use serde::de::Error;
        let bytes = hex_serde::deserialize(deserializer)?;
        Self::from_bytes(&bytes).map_err(D::Error::custom)
    }
}

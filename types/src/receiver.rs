use std::fmt;
use std::str::FromStr;

use curve25519_dalek::ristretto::RistrettoPoint;
use privacy_crypto::operation::{
    is_identity, point_to_bytes, random_scalar, scalar_mult_base, POINT_SIZE,
};
use privacy_crypto::reader::ByteReader;
use privacy_crypto::{CryptoError, Result};

use crate::coin::one_time_public_key;
use crate::impl_hex_serde;
use crate::key::PaymentAddress;
use crate::tx_random::{TxRandom, TX_RANDOM_SIZE};

pub const PRIVATE_RECEIVING_ADDRESS_TYPE: u8 = 0x04;
pub const MAX_ATTEMPTS: u32 = 50_000;

/// Shareable "pay me privately" token: a one-time public key plus the
/// `TxRandom` the owner needs to recognise and spend the coin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtaReceiver {
    public_key: RistrettoPoint,
    tx_random: TxRandom,
}

impl OtaReceiver {
    pub fn from_address(address: &PaymentAddress) -> Result<Self> {
        let ota_random = random_scalar();
        let conceal_random = random_scalar();
        let ota_point = scalar_mult_base(&ota_random);
        let conceal_point = scalar_mult_base(&conceal_random);

        for index in 1..=MAX_ATTEMPTS {
            let public_key = one_time_public_key(&ota_random, address, index);
            if is_identity(&public_key) {
                continue;
            }
            return Ok(Self {
                public_key,
                tx_random: TxRandom::new(&ota_point, index, &conceal_point),
            });
        }
        Err(CryptoError::invalid_input(format!(
            "cannot derive ota receiver after {} attempts",
            MAX_ATTEMPTS
        )))
    }

    pub fn public_key(&self) -> &RistrettoPoint {
        &self.public_key
    }

    pub fn tx_random(&self) -> &TxRandom {
        &self.tx_random
    }

    pub fn is_valid(&self) -> bool {
        self.tx_random.ota_random_point().is_ok() && self.tx_random.conceal_random_point().is_ok()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut b = Vec::with_capacity(1 + POINT_SIZE + TX_RANDOM_SIZE);
        b.push(PRIVATE_RECEIVING_ADDRESS_TYPE);
        b.extend_from_slice(&point_to_bytes(&self.public_key));
        b.extend_from_slice(&self.tx_random.to_bytes());
        b
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        if reader.read_u8("ota receiver type")? != PRIVATE_RECEIVING_ADDRESS_TYPE {
            return Err(CryptoError::parse("unrecognized prefix for ota receiver"));
        }
        let public_key = reader.read_point("ota receiver public key")?;
        let tx_random = TxRandom::from_bytes(reader.read_bytes(TX_RANDOM_SIZE, "ota receiver tx random")?)?;
        reader.finish("ota receiver")?;
        Ok(Self {
            public_key,
            tx_random,
        })
    }
}

impl fmt::Display for OtaReceiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

impl FromStr for OtaReceiver {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim_start_matches("0x"))
            .map_err(|e| CryptoError::parse(format!("ota receiver hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }
}

impl_hex_serde!(OtaReceiver);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coin::Coin;
    use crate::key::KeySet;

    #[test]
    fn test_receiver_from_address() {
        let ks = KeySet::from_seed(b"receiver");
        let recv = OtaReceiver::from_address(ks.payment_address()).unwrap();
        assert!(recv.is_valid());
        assert_eq!(recv.tx_random().index(), 1);

        let coin = Coin::new_from_amount_and_tx_random(10, *recv.public_key(), *recv.tx_random(), Vec::new());
        assert!(coin.belongs_to(&ks));
        assert!(!coin.belongs_to(&KeySet::from_seed(b"someone else")));
    }

    #[test]
    fn test_receivers_are_unlinkable() {
        let ks = KeySet::from_seed(b"unlinkable");
        let a = OtaReceiver::from_address(ks.payment_address()).unwrap();
        let b = OtaReceiver::from_address(ks.payment_address()).unwrap();
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_receiver_encoding() {
        let ks = KeySet::from_seed(b"encoding");
        let recv = OtaReceiver::from_address(ks.payment_address()).unwrap();
        let bytes = recv.to_bytes();
        assert_eq!(bytes.len(), 1 + 32 + TX_RANDOM_SIZE);
        assert_eq!(bytes[0], PRIVATE_RECEIVING_ADDRESS_TYPE);
        assert_eq!(OtaReceiver::from_bytes(&bytes).unwrap(), recv);
        assert_eq!(recv.to_string().parse::<OtaReceiver>().unwrap(), recv);

        let mut bad = bytes.clone();
        bad[0] = 0x01;
        assert!(OtaReceiver::from_bytes(&bad).is_err());
        assert!(OtaReceiver::from_bytes(&bytes[..bytes.len() - 1]).is_err());
    }
}

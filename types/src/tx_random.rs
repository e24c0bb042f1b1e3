use curve25519_dalek::ristretto::RistrettoPoint;
use privacy_crypto::operation::{identity, point_from_bytes, point_to_bytes, POINT_SIZE};
use privacy_crypto::{CryptoError, Result};

use crate::impl_hex_serde;

pub const TX_RANDOM_SIZE: usize = 2 * POINT_SIZE + 4;

const INDEX_OFFSET: usize = POINT_SIZE;
const CONCEAL_OFFSET: usize = POINT_SIZE + 4;

/// `OTARandomPoint(32) || Index(u32 BE) || ConcealRandomPoint(32)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxRandom([u8; TX_RANDOM_SIZE]);

impl Default for TxRandom {
    fn default() -> Self {
        Self::new(&identity(), 0, &identity())
    }
}

impl TxRandom {
    pub fn new(ota_random: &RistrettoPoint, index: u32, conceal_random: &RistrettoPoint) -> Self {
        let mut b = [0u8; TX_RANDOM_SIZE];
        b[..INDEX_OFFSET].copy_from_slice(&point_to_bytes(ota_random));
        b[INDEX_OFFSET..CONCEAL_OFFSET].copy_from_slice(&index.to_be_bytes());
        b[CONCEAL_OFFSET..].copy_from_slice(&point_to_bytes(conceal_random));
        Self(b)
    }

    pub fn ota_random_point(&self) -> Result<RistrettoPoint> {
        point_from_bytes(&self.0[..INDEX_OFFSET])
    }

    pub fn conceal_random_point(&self) -> Result<RistrettoPoint> {
        point_from_bytes(&self.0[CONCEAL_OFFSET..])
    }

    pub fn index(&self) -> u32 {
        let mut b = [0u8; 4];
        b.copy_from_slice(&self.0[INDEX_OFFSET..CONCEAL_OFFSET]);
        u32::from_be_bytes(b)
    }

    pub fn to_bytes(&self) -> [u8; TX_RANDOM_SIZE] {
        self.0
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let b: [u8; TX_RANDOM_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::parse(format!(
                "tx random must be {} bytes, got {}",
                TX_RANDOM_SIZE,
                bytes.len()
            ))
        })?;
        let tx_random = Self(b);
        tx_random.ota_random_point()?;
        tx_random.conceal_random_point()?;
        Ok(tx_random)
    }
}

impl_hex_serde!(TxRandom);

use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};

use crate::errors::{CryptoError, Result};
use crate::operation::{point_to_bytes, SCALAR_SIZE};
use crate::reader::ByteReader;

use super::{MAX_SIZE_BYTE, MLSAG_PREFIX};

/// Ring signature carried by a transfer. An empty key image list means the
/// verifier rebuilds the key images from the proof's input coins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MlsagSig {
    c: Scalar,
    key_images: Vec<RistrettoPoint>,
    r: Vec<Vec<Scalar>>,
}

impl MlsagSig {
    pub fn new(c: Scalar, key_images: Vec<RistrettoPoint>, r: Vec<Vec<Scalar>>) -> Result<Self> {
        if r.is_empty() {
            return Err(CryptoError::invalid_input("mlsag signature: r is empty"));
        }
        if key_images.len() != r[0].len() {
            return Err(CryptoError::invalid_input(format!(
                "mlsag signature: {} key images for {} columns",
                key_images.len(),
                r[0].len()
            )));
        }
        Ok(Self { c, key_images, r })
    }

    pub fn c(&self) -> &Scalar {
        &self.c
    }

    pub fn key_images(&self) -> &[RistrettoPoint] {
        &self.key_images
    }

    pub fn r(&self) -> &[Vec<Scalar>] {
        &self.r
    }

    pub fn set_key_images(&mut self, key_images: Vec<RistrettoPoint>) {
        self.key_images = key_images;
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut b = vec![MLSAG_PREFIX, SCALAR_SIZE as u8];
        b.extend_from_slice(self.c.as_bytes());

        if self.key_images.len() > MAX_SIZE_BYTE {
            return Err(CryptoError::invalid_input(
                "mlsag signature: more than 255 key images",
            ));
        }
        b.push(self.key_images.len() as u8);
        for ki in &self.key_images {
            b.extend_from_slice(&point_to_bytes(ki));
        }

        let n = self.r.len();
        let m = self.r.first().map_or(0, Vec::len);
        if n > MAX_SIZE_BYTE || m > MAX_SIZE_BYTE {
            return Err(CryptoError::invalid_input(
                "mlsag signature: r is larger than 255",
            ));
        }
        b.push(n as u8);
        b.push(m as u8);
        for row in &self.r {
            if row.len() != m {
                return Err(CryptoError::invalid_input(
                    "mlsag signature: r is not rectangular",
                ));
            }
            for s in row {
                b.extend_from_slice(s.as_bytes());
            }
        }
        Ok(b)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        if reader.read_u8("mlsag signature prefix")? != MLSAG_PREFIX {
            return Err(CryptoError::parse("mlsag signature: wrong prefix"));
        }
        let c_len = reader.read_u8("mlsag c length")? as usize;
        if c_len != SCALAR_SIZE {
            return Err(CryptoError::parse(format!(
                "mlsag signature: c length {} is not {}",
                c_len, SCALAR_SIZE
            )));
        }
        let c = reader.read_scalar("mlsag c")?;

        let ki_count = reader.read_u8("mlsag key image count")? as usize;
        let mut key_images = Vec::with_capacity(ki_count);
        for _ in 0..ki_count {
            key_images.push(reader.read_point("mlsag key image")?);
        }

        let n = reader.read_u8("mlsag r rows")? as usize;
        let m = reader.read_u8("mlsag r columns")? as usize;
        let mut r = Vec::with_capacity(n);
        for _ in 0..n {
            let mut row = Vec::with_capacity(m);
            for _ in 0..m {
                row.push(reader.read_scalar("mlsag r")?);
            }
            r.push(row);
        }
        reader.finish("mlsag signature")?;

        Ok(Self { c, key_images, r })
    }
}

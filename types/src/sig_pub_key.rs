use privacy_crypto::reader::ByteReader;
use privacy_crypto::utils::{u64_from_minimal_be, u64_to_minimal_be};
use privacy_crypto::{CryptoError, Result};

const MAX_SIZE_BYTE: usize = 255;

/// Ledger positions (OTA coin indexes) of every cell in a transfer's ring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigPubKey {
    pub indexes: Vec<Vec<u64>>,
}

impl SigPubKey {
    pub fn new(indexes: Vec<Vec<u64>>) -> Self {
        Self { indexes }
    }

    pub fn rows(&self) -> usize {
        self.indexes.len()
    }

    pub fn columns(&self) -> usize {
        self.indexes.first().map_or(0, Vec::len)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let n = self.rows();
        if n == 0 {
            return Err(CryptoError::invalid_input("sig pub key: indexes are empty"));
        }
        if n > MAX_SIZE_BYTE {
            return Err(CryptoError::invalid_input("sig pub key: too many rows"));
        }
        let m = self.columns();
        if m > MAX_SIZE_BYTE {
            return Err(CryptoError::invalid_input("sig pub key: too many columns"));
        }
        if self.indexes.iter().any(|row| row.len() != m) {
            return Err(CryptoError::invalid_input(
                "sig pub key: indexes are not rectangular",
            ));
        }

        let mut b = Vec::with_capacity(2 + n * m * 9);
        b.push(n as u8);
        b.push(m as u8);
        for row in &self.indexes {
            for index in row {
                let cell = u64_to_minimal_be(*index);
                b.push(cell.len() as u8);
                b.extend_from_slice(&cell);
            }
        }
        Ok(b)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        let n = reader.read_u8("sig pub key rows")? as usize;
        let m = reader.read_u8("sig pub key columns")? as usize;
        if n == 0 {
            return Err(CryptoError::parse("sig pub key: indexes are empty"));
        }

        let mut indexes = Vec::with_capacity(n);
        for _ in 0..n {
            let mut row = Vec::with_capacity(m);
            for _ in 0..m {
                let len = reader.read_u8("sig pub key index length")? as usize;
                let cell = reader.read_bytes(len, "sig pub key index")?;
                let index = u64_from_minimal_be(cell).ok_or_else(|| {
                    CryptoError::parse(format!("sig pub key: index of {} bytes overflows u64", len))
                })?;
                row.push(index);
            }
            indexes.push(row);
        }
        reader.finish("sig pub key")?;
        Ok(Self { indexes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sig_pub_key_bytes() {
        let spk = SigPubKey::new(vec![vec![0, 255], vec![256, u64::MAX]]);
        let bytes = spk.to_bytes().unwrap();
        assert_eq!(
            bytes,
            [
                vec![2, 2, 0, 1, 255, 2, 1, 0, 8],
                vec![0xff; 8],
            ]
            .concat()
        );
        assert_eq!(SigPubKey::from_bytes(&bytes).unwrap(), spk);
    }

    #[test]
    fn test_sig_pub_key_rejects_bad_shape() {
        assert!(SigPubKey::default().to_bytes().is_err());
        assert!(SigPubKey::new(vec![vec![1, 2], vec![3]]).to_bytes().is_err());
        assert!(SigPubKey::new(vec![vec![0; 256]]).to_bytes().is_err());
    }

    #[test]
    fn test_sig_pub_key_rejects_bad_bytes() {
        let bytes = SigPubKey::new(vec![vec![7, 8]]).to_bytes().unwrap();
        assert!(SigPubKey::from_bytes(&bytes[..bytes.len() - 1]).is_err());
        assert!(SigPubKey::from_bytes(&[0, 0]).is_err());
        assert!(SigPubKey::from_bytes(&[1, 1, 9, 1, 1, 1, 1, 1, 1, 1, 1, 1]).is_err());

        let mut trailing = bytes;
        trailing.push(0);
        assert!(SigPubKey::from_bytes(&trailing).is_err());
    }
}

use sha3::{Digest, Keccak256, Sha3_256};

pub const HASH_SIZE: usize = 32;

fn digest<D: Digest>(data: &[u8]) -> [u8; HASH_SIZE] {
    let mut hasher = D::new();
    hasher.update(data);
    let mut output = [0u8; HASH_SIZE];
    output.copy_from_slice(&hasher.finalize()[..HASH_SIZE]);
    output
}

/// SHA3-256, used for ledger indexes and transaction hashes.
pub fn hash_h(data: &[u8]) -> [u8; HASH_SIZE] {
    digest::<Sha3_256>(data)
}

/// Pre-standard Keccak-256, the base of `HashToScalar`.
pub fn keccak_256(data: &[u8]) -> [u8; HASH_SIZE] {
    digest::<Keccak256>(data)
}

/// Big-endian bytes of `value` with leading zeros stripped; zero encodes as empty.
pub fn u64_to_minimal_be(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[first..].to_vec()
}

pub fn u64_from_minimal_be(bytes: &[u8]) -> Option<u64> {
    if bytes.len() > 8 {
        return None;
    }
    let mut buf = [0u8; 8];
    buf[8 - bytes.len()..].copy_from_slice(bytes);
    Some(u64::from_be_bytes(buf))
}

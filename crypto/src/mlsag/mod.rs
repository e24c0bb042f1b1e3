mod signature;

pub use signature::MlsagSig;

use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};

use crate::errors::{CryptoError, Result};
use crate::operation::{
    hash_to_point, hash_to_scalar, is_identity, point_to_bytes, random_point, random_scalar,
    scalar_mult_base, POINT_SIZE,
};
use crate::pedersen::randomness_generator;
use crate::reader::ByteReader;
use crate::utils::HASH_SIZE;

pub const MLSAG_PREFIX: u8 = 0x03;
pub(crate) const MAX_SIZE_BYTE: usize = 255;

/// `n × m` matrix of public keys. One row holds the real inputs plus the
/// commitment-to-zero column; the others are decoys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ring {
    keys: Vec<Vec<RistrettoPoint>>,
}

impl Ring {
    pub fn new(keys: Vec<Vec<RistrettoPoint>>) -> Result<Self> {
        check_shape(&keys)?;
        Ok(Self { keys })
    }

    /// Ring of random points with the signer's public keys at row `pi`.
    pub fn random(private_keys: &[Scalar], rows: usize, pi: usize) -> Result<Self> {
        if pi >= rows {
            return Err(CryptoError::invalid_input("ring: signer row out of range"));
        }
        let m = private_keys.len();
        let keys = (0..rows)
            .map(|i| {
                if i == pi {
                    parse_public_keys(private_keys)
                } else {
                    (0..m).map(|_| random_point()).collect()
                }
            })
            .collect();
        Self::new(keys)
    }

    pub fn keys(&self) -> &[Vec<RistrettoPoint>] {
        &self.keys
    }

    pub fn rows(&self) -> usize {
        self.keys.len()
    }

    pub fn columns(&self) -> usize {
        self.keys.first().map_or(0, Vec::len)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let n = self.rows();
        let m = self.columns();
        let mut b = Vec::with_capacity(3 + n * m * POINT_SIZE);
        b.push(MLSAG_PREFIX);
        b.push(n as u8);
        b.push(m as u8);
        for row in &self.keys {
            for key in row {
                b.extend_from_slice(&point_to_bytes(key));
            }
        }
        b
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 3 {
            return Err(CryptoError::parse("ring: input is too short"));
        }
        if bytes[0] != MLSAG_PREFIX {
            return Err(CryptoError::parse("ring: wrong prefix"));
        }
        let n = bytes[1] as usize;
        let m = bytes[2] as usize;
        if bytes.len() != 3 + n * m * POINT_SIZE {
            return Err(CryptoError::parse(format!(
                "ring: {} bytes do not hold a {}x{} ring",
                bytes.len(),
                n,
                m
            )));
        }

        let mut reader = ByteReader::new(&bytes[3..]);
        let mut keys = Vec::with_capacity(n);
        for _ in 0..n {
            let mut row = Vec::with_capacity(m);
            for _ in 0..m {
                row.push(reader.read_point("ring key")?);
            }
            keys.push(row);
        }
        Self::new(keys)
    }
}

fn check_shape<T>(matrix: &[Vec<T>]) -> Result<()> {
    let Some(first) = matrix.first() else {
        return Err(CryptoError::invalid_input("ring is empty"));
    };
    if first.is_empty() {
        return Err(CryptoError::invalid_input("ring has no columns"));
    }
    if matrix.iter().any(|row| row.len() != first.len()) {
        return Err(CryptoError::invalid_input("ring is not rectangular"));
    }
    if matrix.len() > MAX_SIZE_BYTE || first.len() > MAX_SIZE_BYTE {
        return Err(CryptoError::invalid_input("ring is larger than 255"));
    }
    Ok(())
}

/// Public keys for a signer row: `sk·G` for every input column and
/// `sk·G[Randomness]` for the trailing commitment-to-zero column.
pub fn parse_public_keys(private_keys: &[Scalar]) -> Vec<RistrettoPoint> {
    let m = private_keys.len();
    private_keys
        .iter()
        .enumerate()
        .map(|(j, sk)| parse_public_key(sk, j + 1 == m))
        .collect()
}

fn parse_public_key(private_key: &Scalar, is_last: bool) -> RistrettoPoint {
    if is_last {
        private_key * randomness_generator()
    } else {
        scalar_mult_base(private_key)
    }
}

pub fn parse_key_images(private_keys: &[Scalar]) -> Vec<RistrettoPoint> {
    let m = private_keys.len();
    private_keys
        .iter()
        .enumerate()
        .map(|(j, sk)| {
            let public_key = parse_public_key(sk, j + 1 == m);
            hash_to_point(&point_to_bytes(&public_key)) * sk
        })
        .collect()
}

fn message_digest(message: &[u8]) -> Result<[u8; HASH_SIZE]> {
    message.try_into().map_err(|_| {
        CryptoError::invalid_input(format!(
            "mlsag message must be a {}-byte hash, got {} bytes",
            HASH_SIZE,
            message.len()
        ))
    })
}

fn calculate_first_c(
    digest: &[u8; HASH_SIZE],
    alpha: &[Scalar],
    keys: &[RistrettoPoint],
) -> Result<Scalar> {
    if alpha.len() != keys.len() {
        return Err(CryptoError::invalid_input(
            "mlsag: alpha and ring row lengths differ",
        ));
    }
    let last = keys.len() - 1;
    let mut b = Vec::with_capacity(HASH_SIZE + POINT_SIZE * (2 * last + 1));
    b.extend_from_slice(digest);

    for j in 0..last {
        let alpha_g = scalar_mult_base(&alpha[j]);
        let alpha_h = hash_to_point(&point_to_bytes(&keys[j])) * alpha[j];
        b.extend_from_slice(&point_to_bytes(&alpha_g));
        b.extend_from_slice(&point_to_bytes(&alpha_h));
    }
    let alpha_g = alpha[last] * randomness_generator();
    b.extend_from_slice(&point_to_bytes(&alpha_g));

    Ok(hash_to_scalar(&b))
}

fn calculate_next_c(
    digest: &[u8; HASH_SIZE],
    r: &[Scalar],
    c: &Scalar,
    keys: &[RistrettoPoint],
    key_images: &[RistrettoPoint],
) -> Result<Scalar> {
    if r.len() != keys.len() || r.len() != key_images.len() {
        return Err(CryptoError::invalid_input(
            "mlsag: r, ring row and key image lengths differ",
        ));
    }
    let last = keys.len() - 1;
    let mut b = Vec::with_capacity(HASH_SIZE + POINT_SIZE * (2 * last + 1));
    b.extend_from_slice(digest);

    for j in 0..last {
        let rg_ck = scalar_mult_base(&r[j]) + c * keys[j];
        let rh_cki = hash_to_point(&point_to_bytes(&keys[j])) * r[j] + c * key_images[j];
        b.extend_from_slice(&point_to_bytes(&rg_ck));
        b.extend_from_slice(&point_to_bytes(&rh_cki));
    }
    let rg_ck = r[last] * randomness_generator() + c * keys[last];
    b.extend_from_slice(&point_to_bytes(&rg_ck));

    Ok(hash_to_scalar(&b))
}

/// Signing state for one ring: the signer's row `pi` and its private keys.
pub struct Mlsag {
    ring: Ring,
    pi: usize,
    key_images: Vec<RistrettoPoint>,
    private_keys: Vec<Scalar>,
}

impl Mlsag {
    pub fn new(private_keys: Vec<Scalar>, ring: Ring, pi: usize) -> Result<Self> {
        if pi >= ring.rows() {
            return Err(CryptoError::invalid_input("mlsag: signer row out of range"));
        }
        if private_keys.is_empty() || private_keys.len() != ring.columns() {
            return Err(CryptoError::invalid_input(format!(
                "mlsag: {} private keys for {} ring columns",
                private_keys.len(),
                ring.columns()
            )));
        }
        let key_images = parse_key_images(&private_keys);
        Ok(Self {
            ring,
            pi,
            key_images,
            private_keys,
        })
    }

    pub fn ring(&self) -> &Ring {
        &self.ring
    }

    pub fn key_images(&self) -> &[RistrettoPoint] {
        &self.key_images
    }

    pub fn sign(&self, message: &[u8]) -> Result<MlsagSig> {
        let digest = message_digest(message)?;
        let n = self.ring.rows();
        let m = self.private_keys.len();

        let alpha: Vec<Scalar> = (0..m).map(|_| random_scalar()).collect();
        let mut r: Vec<Vec<Scalar>> = (0..n)
            .map(|i| {
                if i == self.pi {
                    vec![Scalar::ZERO; m]
                } else {
                    (0..m).map(|_| random_scalar()).collect()
                }
            })
            .collect();

        let keys = self.ring.keys();
        let mut c = vec![Scalar::ZERO; n];
        c[(self.pi + 1) % n] = calculate_first_c(&digest, &alpha, &keys[self.pi])?;

        let mut i = (self.pi + 1) % n;
        while i != self.pi {
            let next = (i + 1) % n;
            c[next] = calculate_next_c(&digest, &r[i], &c[i], &keys[i], &self.key_images)?;
            i = next;
        }

        for j in 0..m {
            r[self.pi][j] = alpha[j] - c[self.pi] * self.private_keys[j];
        }

        MlsagSig::new(c[0], self.key_images.clone(), r)
    }
}

/// Key images must be present and non-identity.
fn verify_key_images(key_images: &[RistrettoPoint]) -> bool {
    !key_images.is_empty() && key_images.iter().all(|ki| !is_identity(ki))
}

pub fn verify(sig: &MlsagSig, ring: &Ring, message: &[u8]) -> Result<bool> {
    let digest = message_digest(message)?;
    if !verify_key_images(sig.key_images()) {
        return Err(CryptoError::proof_invalid("mlsag: invalid key images"));
    }
    if sig.r().len() != ring.rows() {
        return Err(CryptoError::proof_invalid("mlsag: malformed ring"));
    }

    let mut c = *sig.c();
    for (r_row, keys) in sig.r().iter().zip(ring.keys()) {
        c = calculate_next_c(&digest, r_row, &c, keys, sig.key_images())?;
    }
    Ok(c == *sig.c())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::hash_h;

    fn signer_keys(m: usize) -> Vec<Scalar> {
        (0..m).map(|_| random_scalar()).collect()
    }

    #[test]
    fn test_mlsag_sign_verify() {
        let message = hash_h(b"transfer");
        for (n, m) in [(1usize, 1usize), (2, 2), (2, 3), (8, 2), (16, 4)] {
            let keys = signer_keys(m);
            let pi = n / 2;
            let ring = Ring::random(&keys, n, pi).unwrap();
            let mlsag = Mlsag::new(keys, ring.clone(), pi).unwrap();

            let sig = mlsag.sign(&message).unwrap();
            assert!(verify(&sig, &ring, &message).unwrap(), "n={} m={}", n, m);
        }
    }

    #[test]
    fn test_mlsag_wrong_message_fails() {
        let keys = signer_keys(2);
        let ring = Ring::random(&keys, 4, 1).unwrap();
        let sig = Mlsag::new(keys, ring.clone(), 1)
            .unwrap()
            .sign(&hash_h(b"a"))
            .unwrap();
        assert!(!verify(&sig, &ring, &hash_h(b"b")).unwrap());
        assert!(verify(&sig, &ring, b"not hashed").is_err());
    }

    #[test]
    fn test_mlsag_random_decoy_entry_verifies() {
        let message = hash_h(b"decoys");
        let keys = signer_keys(2);
        let ring = Ring::random(&keys, 2, 0).unwrap();

        let mut replaced = ring.keys().to_vec();
        replaced[1][0] = random_point();
        let replaced = Ring::new(replaced).unwrap();

        let sig = Mlsag::new(keys, replaced.clone(), 0)
            .unwrap()
            .sign(&message)
            .unwrap();
        assert!(verify(&sig, &replaced, &message).unwrap());
    }

    #[test]
    fn test_mlsag_tampered_ring_fails() {
        let message = hash_h(b"tamper");
        let keys = signer_keys(2);
        let ring = Ring::random(&keys, 2, 1).unwrap();
        let sig = Mlsag::new(keys, ring.clone(), 1)
            .unwrap()
            .sign(&message)
            .unwrap();

        let mut signer_row = ring.keys().to_vec();
        signer_row[1][0] = random_point();
        assert!(!verify(&sig, &Ring::new(signer_row).unwrap(), &message).unwrap());

        let mut decoy_row = ring.keys().to_vec();
        decoy_row[0][1] = random_point();
        assert!(!verify(&sig, &Ring::new(decoy_row).unwrap(), &message).unwrap());
    }

    #[test]
    fn test_mlsag_wrong_private_key_fails() {
        let message = hash_h(b"forgery");
        let keys = signer_keys(2);
        let ring = Ring::random(&keys, 3, 2).unwrap();

        let forged = Mlsag::new(signer_keys(2), ring.clone(), 2)
            .unwrap()
            .sign(&message)
            .unwrap();
        assert!(!verify(&forged, &ring, &message).unwrap());
    }

    #[test]
    fn test_mlsag_rejects_identity_key_image() {
        let message = hash_h(b"ki");
        let keys = signer_keys(2);
        let ring = Ring::random(&keys, 2, 0).unwrap();
        let mut sig = Mlsag::new(keys, ring.clone(), 0)
            .unwrap()
            .sign(&message)
            .unwrap();

        let mut kis = sig.key_images().to_vec();
        kis[0] = crate::operation::identity();
        sig.set_key_images(kis);
        assert!(verify(&sig, &ring, &message).is_err());

        sig.set_key_images(Vec::new());
        assert!(verify(&sig, &ring, &message).is_err());
    }

    #[test]
    fn test_key_images_deterministic() {
        let keys = signer_keys(3);
        assert_eq!(parse_key_images(&keys), parse_key_images(&keys));
        assert_ne!(parse_key_images(&keys), parse_key_images(&signer_keys(3)));
    }

    #[test]
    fn test_ring_bytes() {
        let keys = signer_keys(3);
        let ring = Ring::random(&keys, 4, 2).unwrap();
        let bytes = ring.to_bytes();
        assert_eq!(bytes.len(), 3 + 4 * 3 * 32);
        assert_eq!(Ring::from_bytes(&bytes).unwrap(), ring);

        assert!(Ring::from_bytes(&bytes[..bytes.len() - 1]).is_err());
        let mut bad_prefix = bytes.clone();
        bad_prefix[0] = 0;
        assert!(Ring::from_bytes(&bad_prefix).is_err());
        assert!(Ring::from_bytes(&[MLSAG_PREFIX, 0, 0]).is_err());
    }

    #[test]
    fn test_ring_shape_checks() {
        assert!(Ring::new(Vec::new()).is_err());
        assert!(Ring::new(vec![vec![random_point()], vec![random_point(), random_point()]]).is_err());
        assert!(Ring::random(&signer_keys(1), 2, 2).is_err());
        assert!(Mlsag::new(signer_keys(3), Ring::random(&signer_keys(2), 2, 0).unwrap(), 0).is_err());
    }
}

use curve25519_dalek::{
    constants::{RISTRETTO_BASEPOINT_POINT, RISTRETTO_BASEPOINT_TABLE},
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
    traits::{Identity, IsIdentity, MultiscalarMul, VartimeMultiscalarMul},
};
use rand::RngCore;
use rand_core::OsRng;
use sha2::{Digest, Sha512};

use crate::errors::{CryptoError, Result};
use crate::utils::keccak_256;

pub const POINT_SIZE: usize = 32;
pub const SCALAR_SIZE: usize = 32;

const HASH_TO_POINT_DOMAIN: &[u8] = b"PRIVACY_HASH_TO_POINT_V1";

pub fn scalar_from_bytes(bytes: &[u8]) -> Result<Scalar> {
    let arr: [u8; SCALAR_SIZE] = bytes.try_into().map_err(|_| {
        CryptoError::parse(format!("scalar must be {} bytes, got {}", SCALAR_SIZE, bytes.len()))
    })?;
    Option::<Scalar>::from(Scalar::from_canonical_bytes(arr))
        .ok_or_else(|| CryptoError::GroupValidation("scalar is not reduced mod l".into()))
}

pub fn scalar_from_u64(value: u64) -> Scalar {
    Scalar::from(value)
}

/// Low 64 bits of the little-endian encoding.
pub fn scalar_to_u64(scalar: &Scalar) -> u64 {
    let bytes = scalar.as_bytes();
    let mut low = [0u8; 8];
    low.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(low)
}

pub fn point_from_bytes(bytes: &[u8]) -> Result<RistrettoPoint> {
    let compressed = CompressedRistretto::from_slice(bytes).map_err(|_| {
        CryptoError::parse(format!("point must be {} bytes, got {}", POINT_SIZE, bytes.len()))
    })?;
    compressed
        .decompress()
        .ok_or_else(|| CryptoError::GroupValidation("bytes are not a valid group element".into()))
}

pub fn point_to_bytes(point: &RistrettoPoint) -> [u8; POINT_SIZE] {
    point.compress().to_bytes()
}

pub fn is_point_valid(bytes: &[u8]) -> bool {
    point_from_bytes(bytes).is_ok()
}

pub fn is_scalar_valid(bytes: &[u8]) -> bool {
    scalar_from_bytes(bytes).is_ok()
}

pub fn is_identity(point: &RistrettoPoint) -> bool {
    point.is_identity()
}

pub fn identity() -> RistrettoPoint {
    RistrettoPoint::identity()
}

pub fn scalar_mult_base(scalar: &Scalar) -> RistrettoPoint {
    scalar * RISTRETTO_BASEPOINT_TABLE
}

pub fn base_point() -> RistrettoPoint {
    RISTRETTO_BASEPOINT_POINT
}

/// `a * b + c`
pub fn mul_add(a: &Scalar, b: &Scalar, c: &Scalar) -> Scalar {
    a * b + c
}

pub fn invert(scalar: &Scalar) -> Result<Scalar> {
    if scalar == &Scalar::ZERO {
        return Err(CryptoError::invalid_input("cannot invert zero scalar"));
    }
    Ok(scalar.invert())
}

pub fn hash_to_scalar(data: &[u8]) -> Scalar {
    Scalar::from_bytes_mod_order(keccak_256(data))
}

pub fn hash_to_point(data: &[u8]) -> RistrettoPoint {
    let mut hasher = Sha512::new();
    hasher.update(HASH_TO_POINT_DOMAIN);
    hasher.update(data);
    let hash = hasher.finalize();

    RistrettoPoint::from_uniform_bytes(&hash.into())
}

pub fn hash_to_point_from_index(index: u32, pad: &str) -> RistrettoPoint {
    let mut msg = Vec::with_capacity(POINT_SIZE + pad.len() + 4);
    msg.extend_from_slice(RISTRETTO_BASEPOINT_POINT.compress().as_bytes());
    msg.extend_from_slice(pad.as_bytes());
    msg.extend_from_slice(&index.to_be_bytes());
    hash_to_point(&msg)
}

pub fn random_scalar() -> Scalar {
    let mut bytes = [0u8; 64];
    OsRng.fill_bytes(&mut bytes);
    Scalar::from_bytes_mod_order_wide(&bytes)
}

pub fn random_point() -> RistrettoPoint {
    let mut bytes = [0u8; 64];
    OsRng.fill_bytes(&mut bytes);
    RistrettoPoint::from_uniform_bytes(&bytes)
}

/// Constant-time `Σ scalars[i]·points[i]`, for secret scalars.
pub fn multi_scalar_mult(scalars: &[Scalar], points: &[RistrettoPoint]) -> Result<RistrettoPoint> {
    check_lengths(scalars, points)?;
    Ok(RistrettoPoint::multiscalar_mul(scalars, points))
}

/// Variable-time `Σ scalars[i]·points[i]`, for public data only.
pub fn vartime_multi_scalar_mult(
    scalars: &[Scalar],
    points: &[RistrettoPoint],
) -> Result<RistrettoPoint> {
    check_lengths(scalars, points)?;
    Ok(RistrettoPoint::vartime_multiscalar_mul(scalars, points))
}

fn check_lengths(scalars: &[Scalar], points: &[RistrettoPoint]) -> Result<()> {
    if scalars.len() != points.len() {
        return Err(CryptoError::invalid_input(format!(
            "multi-scalar-mult: {} scalars for {} points",
            scalars.len(),
            points.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_encoding() {
        let s = random_scalar();
        let recovered = scalar_from_bytes(s.as_bytes()).unwrap();
        assert_eq!(s, recovered);

        assert!(matches!(
            scalar_from_bytes(&[1u8; 31]),
            Err(CryptoError::Parse(_))
        ));
        assert!(matches!(
            scalar_from_bytes(&[0xffu8; 32]),
            Err(CryptoError::GroupValidation(_))
        ));
    }

    #[test]
    fn test_scalar_u64_conversion() {
        assert_eq!(scalar_to_u64(&scalar_from_u64(100_000)), 100_000);
        assert_eq!(scalar_to_u64(&scalar_from_u64(u64::MAX)), u64::MAX);
    }

    #[test]
    fn test_point_encoding() {
        let p = random_point();
        let bytes = point_to_bytes(&p);
        assert_eq!(point_from_bytes(&bytes).unwrap(), p);
        assert!(is_point_valid(&bytes));

        assert!(matches!(point_from_bytes(&bytes[..31]), Err(CryptoError::Parse(_))));

        let identity_bytes = point_to_bytes(&identity());
        assert_eq!(identity_bytes, [0u8; 32]);
        assert!(is_identity(&point_from_bytes(&identity_bytes).unwrap()));
    }

    #[test]
    fn test_invalid_point_rejected() {
        // Non-canonical field element encodings are not valid ristretto points.
        let bad = [0xffu8; 32];
        assert!(!is_point_valid(&bad));
        assert!(matches!(
            point_from_bytes(&bad),
            Err(CryptoError::GroupValidation(_))
        ));
    }

    #[test]
    fn test_hash_functions_deterministic() {
        assert_eq!(hash_to_scalar(b"abc"), hash_to_scalar(b"abc"));
        assert_ne!(hash_to_scalar(b"abc"), hash_to_scalar(b"abd"));

        assert_eq!(hash_to_point(b"abc"), hash_to_point(b"abc"));
        assert_ne!(hash_to_point(b"abc"), hash_to_point(b"abd"));

        let g1 = hash_to_point_from_index(1, "bulletproof");
        let g2 = hash_to_point_from_index(2, "bulletproof");
        assert_ne!(g1, g2);
        assert_eq!(g1, hash_to_point_from_index(1, "bulletproof"));
    }

    #[test]
    fn test_scalar_arithmetic() {
        let a = random_scalar();
        let b = random_scalar();
        let c = random_scalar();

        assert_eq!(mul_add(&a, &b, &c), a * b + c);
        assert_eq!(a - a, Scalar::ZERO);
        assert_eq!(-a + a, Scalar::ZERO);

        let inv = invert(&a).unwrap();
        assert_eq!(a * inv, Scalar::ONE);
        assert!(invert(&Scalar::ZERO).is_err());
    }

    #[test]
    fn test_scalar_mult_base_matches_point_mult() {
        let s = random_scalar();
        assert_eq!(scalar_mult_base(&s), s * base_point());
    }

    #[test]
    fn test_multi_scalar_mult_matches_naive() {
        let scalars: Vec<Scalar> = (0..6).map(|_| random_scalar()).collect();
        let points: Vec<RistrettoPoint> = (0..6).map(|_| random_point()).collect();

        let naive = scalars
            .iter()
            .zip(points.iter())
            .fold(identity(), |acc, (s, p)| acc + s * p);

        assert_eq!(multi_scalar_mult(&scalars, &points).unwrap(), naive);
        assert_eq!(vartime_multi_scalar_mult(&scalars, &points).unwrap(), naive);
        assert!(multi_scalar_mult(&scalars[..5], &points).is_err());
    }
}

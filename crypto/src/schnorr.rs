use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};

use crate::errors::{CryptoError, Result};
use crate::operation::{hash_to_scalar, point_from_bytes, point_to_bytes, random_scalar, scalar_from_bytes};
use crate::pedersen::{GeneratorIndex, PED_COM};

pub const SCHNORR_SIGNATURE_SIZE: usize = 64;

#[derive(Debug, Clone)]
pub struct SchnorrPrivateKey {
    sk: Scalar,
    public_key: SchnorrPublicKey,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchnorrPublicKey {
    pk: RistrettoPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchnorrSignature {
    e: Scalar,
    z: Scalar,
}

fn challenge(pk: &RistrettoPoint, r: &RistrettoPoint, message: &[u8]) -> Scalar {
    let mut b = Vec::with_capacity(64 + message.len());
    b.extend_from_slice(&point_to_bytes(pk));
    b.extend_from_slice(&point_to_bytes(r));
    b.extend_from_slice(message);
    hash_to_scalar(&b)
}

impl SchnorrPrivateKey {
    pub fn new(sk: Scalar) -> Self {
        let pk = sk * PED_COM.get(GeneratorIndex::PrivateKey);
        Self {
            sk,
            public_key: SchnorrPublicKey { pk },
        }
    }

    pub fn generate() -> Self {
        Self::new(random_scalar())
    }

    pub fn public_key(&self) -> &SchnorrPublicKey {
        &self.public_key
    }

    pub fn sign(&self, message: &[u8]) -> SchnorrSignature {
        let g = PED_COM.get(GeneratorIndex::PrivateKey);
        let k = random_scalar();
        let r = k * g;
        let e = challenge(&self.public_key.pk, &r, message);
        SchnorrSignature {
            e,
            z: k - e * self.sk,
        }
    }
}

impl SchnorrPublicKey {
    pub fn verify(&self, signature: &SchnorrSignature, message: &[u8]) -> bool {
        let g = PED_COM.get(GeneratorIndex::PrivateKey);
        let r = signature.z * g + signature.e * self.pk;
        challenge(&self.pk, &r, message) == signature.e
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        point_to_bytes(&self.pk)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            pk: point_from_bytes(bytes)?,
        })
    }
}

impl SchnorrSignature {
    pub fn to_bytes(&self) -> [u8; SCHNORR_SIGNATURE_SIZE] {
        let mut out = [0u8; SCHNORR_SIGNATURE_SIZE];
        out[..32].copy_from_slice(self.e.as_bytes());
        out[32..].copy_from_slice(self.z.as_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != SCHNORR_SIGNATURE_SIZE {
            return Err(CryptoError::parse(format!(
                "schnorr signature must be {} bytes, got {}",
                SCHNORR_SIGNATURE_SIZE,
                bytes.len()
            )));
        }
        Ok(Self {
            e: scalar_from_bytes(&bytes[..32])?,
            z: scalar_from_bytes(&bytes[32..])?,
        })
    }
}

#![cfg_attr(not(feature = "std"), no_std)]

// Declare modules
pub mod bulletproofs;
pub mod errors;
pub mod mlsag;
pub mod operation;
pub mod pedersen;
pub mod reader;
pub mod schnorr;
pub mod utils;

// Re-export commonly used items
pub use errors::{add_u64, sub_u64, CryptoError, Result};

pub use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};

// Pedersen commitment exports
pub use pedersen::{commit, verify_commitment, GeneratorIndex, PED_COM};

// Range proof exports
pub use bulletproofs::{AggregatedRangeProof, AggregatedRangeWitness, MAX_EXP, MAX_OUTPUT_COIN};

// Ring signature exports
pub use mlsag::{Mlsag, MlsagSig, Ring};

pub use reader::ByteReader;
pub use schnorr::{SchnorrPrivateKey, SchnorrPublicKey, SchnorrSignature};

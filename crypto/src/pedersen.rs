use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_POINT, ristretto::RistrettoPoint, scalar::Scalar,
};
use lazy_static::lazy_static;

use crate::operation::{hash_to_point_from_index, scalar_from_u64};

pub const NUM_BASE: usize = 5;
pub const CSTRING_BULLETPROOF: &str = "bulletproof";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorIndex {
    PrivateKey = 0,
    Value = 1,
    Snd = 2,
    ShardId = 3,
    Randomness = 4,
}

#[derive(Debug, Clone)]
pub struct PedersenParams {
    g: [RistrettoPoint; NUM_BASE],
}

lazy_static! {
    pub static ref PED_COM: PedersenParams = PedersenParams::new();
}

impl PedersenParams {
    fn new() -> Self {
        let mut g = [RISTRETTO_BASEPOINT_POINT; NUM_BASE];
        for (i, gen) in g.iter_mut().enumerate().skip(1) {
            *gen = hash_to_point_from_index(i as u32, CSTRING_BULLETPROOF);
        }
        Self { g }
    }

    pub fn get(&self, index: GeneratorIndex) -> RistrettoPoint {
        self.g[index as usize]
    }

    pub fn generators(&self) -> &[RistrettoPoint; NUM_BASE] {
        &self.g
    }

    /// `value·G[index] + rand·G[Randomness]`
    pub fn commit_at_index(
        &self,
        value: &Scalar,
        rand: &Scalar,
        index: GeneratorIndex,
    ) -> RistrettoPoint {
        value * self.get(index) + rand * self.get(GeneratorIndex::Randomness)
    }
}

pub fn value_generator() -> RistrettoPoint {
    PED_COM.get(GeneratorIndex::Value)
}

pub fn randomness_generator() -> RistrettoPoint {
    PED_COM.get(GeneratorIndex::Randomness)
}

pub fn commit(amount: u64, blinding: &Scalar) -> RistrettoPoint {
    commit_scalar(&scalar_from_u64(amount), blinding)
}

pub fn commit_scalar(amount: &Scalar, blinding: &Scalar) -> RistrettoPoint {
    PED_COM.commit_at_index(amount, blinding, GeneratorIndex::Value)
}

pub fn verify_commitment(commitment: &RistrettoPoint, amount: u64, blinding: &Scalar) -> bool {
    commit(amount, blinding) == *commitment
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::random_scalar;

    #[test]
    fn test_pedersen_commitment_basic() {
        let amount = 100u64;
        let blinding = random_scalar();

        let commitment = commit(amount, &blinding);

        assert!(verify_commitment(&commitment, amount, &blinding));
        assert!(!verify_commitment(&commitment, 99, &blinding));

        let wrong_blinding = random_scalar();
        assert!(!verify_commitment(&commitment, amount, &wrong_blinding));
    }

    #[test]
    fn test_commitment_homomorphic_addition() {
        let blinding1 = random_scalar();
        let blinding2 = random_scalar();

        let c1 = commit(50, &blinding1);
        let c2 = commit(30, &blinding2);

        assert_eq!(c1 + c2, commit(80, &(blinding1 + blinding2)));
        assert_eq!(c1 - c2, commit(20, &(blinding1 - blinding2)));
    }

    #[test]
    fn test_generators_independent_and_stable() {
        let gens = PED_COM.generators();
        assert_eq!(gens[0], RISTRETTO_BASEPOINT_POINT);
        for i in 0..NUM_BASE {
            for j in (i + 1)..NUM_BASE {
                assert_ne!(gens[i], gens[j]);
            }
        }

        let fresh = PedersenParams::new();
        assert_eq!(fresh.generators(), gens);
    }

    #[test]
    fn test_commit_at_index_uses_selected_base() {
        let v = random_scalar();
        let r = random_scalar();
        let expected = v * PED_COM.get(GeneratorIndex::Snd) + r * randomness_generator();
        assert_eq!(PED_COM.commit_at_index(&v, &r, GeneratorIndex::Snd), expected);
        assert_ne!(
            PED_COM.commit_at_index(&v, &r, GeneratorIndex::Value),
            expected
        );
    }
}

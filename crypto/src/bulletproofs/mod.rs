mod helpers;
mod inner_product;

pub use inner_product::InnerProductProof;

use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};
use lazy_static::lazy_static;

use crate::errors::{CryptoError, Result};
use crate::operation::{
    hash_to_point, hash_to_point_from_index, hash_to_scalar, is_identity, multi_scalar_mult,
    point_to_bytes, random_scalar, scalar_from_u64, vartime_multi_scalar_mult,
};
use crate::pedersen::{
    randomness_generator, value_generator, GeneratorIndex, CSTRING_BULLETPROOF, NUM_BASE, PED_COM,
};
use crate::reader::ByteReader;

use helpers::{
    compute_delta_yz, hadamard_product, inner_product, inverse_power_vector, power_vector,
    round_up_pow_two, uint64_to_binary, vector_add, vector_add_scalar, vector_mul_scalar,
};
use inner_product::InnerProductWitness;

pub const MAX_EXP: usize = 64;
pub const MAX_OUTPUT_COIN: usize = 32;
pub(crate) const MAX_IPA_ROUNDS: usize = 11;

/// Generator vectors shared by every aggregated range proof.
pub struct BulletproofParams {
    g: Vec<RistrettoPoint>,
    h: Vec<RistrettoPoint>,
    u: RistrettoPoint,
    cs: [u8; 32],
}

lazy_static! {
    pub static ref AGG_PARAM: BulletproofParams = BulletproofParams::new(MAX_OUTPUT_COIN);
}

impl BulletproofParams {
    fn new(max_outputs: usize) -> Self {
        let capacity = MAX_EXP * max_outputs;
        let mut g = Vec::with_capacity(capacity);
        let mut h = Vec::with_capacity(capacity);
        let mut cs_bytes = Vec::with_capacity(32 * (2 * capacity + 1));

        for i in 0..capacity {
            let gi = hash_to_point_from_index((NUM_BASE + i) as u32, CSTRING_BULLETPROOF);
            let hi = hash_to_point_from_index((NUM_BASE + i + capacity) as u32, CSTRING_BULLETPROOF);
            cs_bytes.extend_from_slice(&point_to_bytes(&gi));
            cs_bytes.extend_from_slice(&point_to_bytes(&hi));
            g.push(gi);
            h.push(hi);
        }

        let u = hash_to_point_from_index((NUM_BASE + 2 * capacity) as u32, CSTRING_BULLETPROOF);
        cs_bytes.extend_from_slice(&point_to_bytes(&u));
        let cs = point_to_bytes(&hash_to_point(&cs_bytes));

        Self { g, h, u, cs }
    }
}

pub(crate) fn generate_challenge(hash_cache: &[u8], values: &[RistrettoPoint]) -> Scalar {
    let mut bytes = Vec::with_capacity(hash_cache.len() + 32 * values.len());
    bytes.extend_from_slice(hash_cache);
    for v in values {
        bytes.extend_from_slice(&point_to_bytes(v));
    }
    hash_to_scalar(&bytes)
}

fn transcript_seed(commitments: &[RistrettoPoint]) -> Vec<u8> {
    let mut seed = AGG_PARAM.cs.to_vec();
    for c in commitments {
        seed.extend_from_slice(&point_to_bytes(c));
    }
    seed
}

/// `vector_sum[j*64 + i] = 2^i · z^(j+2)`
fn compute_vector_sum(z: &Scalar, num_values: usize) -> Vec<Scalar> {
    let two_vector = power_vector(&scalar_from_u64(2), MAX_EXP);
    let mut out = Vec::with_capacity(num_values * MAX_EXP);
    let mut z_tmp = *z;
    for _ in 0..num_values {
        z_tmp *= z;
        out.extend(two_vector.iter().map(|t| t * z_tmp));
    }
    out
}

fn check_output_count(count: usize) -> Result<()> {
    if count == 0 || count > MAX_OUTPUT_COIN {
        return Err(CryptoError::invalid_input(format!(
            "range proof needs between 1 and {} values, got {}",
            MAX_OUTPUT_COIN, count
        )));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct AggregatedRangeWitness {
    values: Vec<u64>,
    rands: Vec<Scalar>,
}

impl AggregatedRangeWitness {
    pub fn new(values: Vec<u64>, rands: Vec<Scalar>) -> Result<Self> {
        if values.len() != rands.len() {
            return Err(CryptoError::invalid_input(
                "range witness: one blinding per value is required",
            ));
        }
        check_output_count(values.len())?;
        Ok(Self { values, rands })
    }

    pub fn prove(&self) -> Result<AggregatedRangeProof> {
        let num_value = self.values.len();
        let num_value_pad = round_up_pow_two(num_value);
        let n = MAX_EXP * num_value_pad;

        let g = &AGG_PARAM.g[..n];
        let h = &AGG_PARAM.h[..n];
        let h_base = randomness_generator();

        let mut values = self.values.clone();
        let mut rands = self.rands.clone();
        values.resize(num_value_pad, 0);
        rands.resize(num_value_pad, Scalar::ZERO);

        let cms_value: Vec<RistrettoPoint> = (0..num_value)
            .map(|i| {
                PED_COM.commit_at_index(&scalar_from_u64(values[i]), &rands[i], GeneratorIndex::Value)
            })
            .collect();

        let mut a_l = Vec::with_capacity(n);
        for v in &values {
            a_l.extend(uint64_to_binary(*v, MAX_EXP));
        }
        let a_r = vector_add_scalar(&a_l, &-Scalar::ONE);
        let s_l: Vec<Scalar> = (0..n).map(|_| random_scalar()).collect();
        let s_r: Vec<Scalar> = (0..n).map(|_| random_scalar()).collect();

        let alpha = random_scalar();
        let rho = random_scalar();
        let a = commit_vectors(&a_l, &a_r, g, h, &alpha, &h_base)?;
        let s = commit_vectors(&s_l, &s_r, g, h, &rho, &h_base)?;

        let y = generate_challenge(&transcript_seed(&cms_value), &[a, s]);
        let z = generate_challenge(y.as_bytes(), &[a, s]);

        let y_inv_vector = inverse_power_vector(&y, n)?;
        let h_prime: Vec<RistrettoPoint> =
            h.iter().zip(&y_inv_vector).map(|(hi, yi)| hi * yi).collect();

        // l(X) = (aL - z·1) + sL·X ; r(X) = y^n ∘ (aR + z·1 + sR·X) + vector_sum
        let y_vector = power_vector(&y, n);
        let vector_sum = compute_vector_sum(&z, num_value_pad);
        let l0 = vector_add_scalar(&a_l, &-z);
        let l1 = &s_l;
        let r0 = vector_add(&hadamard_product(&y_vector, &vector_add_scalar(&a_r, &z))?, &vector_sum)?;
        let r1 = hadamard_product(&y_vector, &s_r)?;

        let t1 = inner_product(l1, &r0)? + inner_product(&l0, &r1)?;
        let t2 = inner_product(l1, &r1)?;

        let tau1 = random_scalar();
        let tau2 = random_scalar();
        let t1_point = PED_COM.commit_at_index(&t1, &tau1, GeneratorIndex::Value);
        let t2_point = PED_COM.commit_at_index(&t2, &tau2, GeneratorIndex::Value);

        let x = generate_challenge(z.as_bytes(), &[t1_point, t2_point]);
        let x_square = x * x;

        let l_vector = vector_add(&l0, &vector_mul_scalar(&s_l, &x))?;
        let r_vector = vector_add(
            &hadamard_product(&y_vector, &vector_add(&vector_add_scalar(&a_r, &z), &vector_mul_scalar(&s_r, &x))?)?,
            &vector_sum,
        )?;
        let t_hat = inner_product(&l_vector, &r_vector)?;

        let mut tau_x = tau2 * x_square + tau1 * x;
        let mut z_tmp = z;
        for rand in &rands {
            z_tmp *= z;
            tau_x += z_tmp * rand;
        }
        let mu = alpha + rho * x;

        let u_prime = AGG_PARAM.u * hash_to_scalar(x.as_bytes());
        let p = multi_scalar_mult(
            &[l_vector.clone(), r_vector.clone(), vec![t_hat]].concat(),
            &[g.to_vec(), h_prime.clone(), vec![u_prime]].concat(),
        )?;

        let witness = InnerProductWitness {
            a: l_vector,
            b: r_vector,
            p,
        };
        let inner_product_proof = witness.prove(g, &h_prime, &u_prime, x.as_bytes())?;

        Ok(AggregatedRangeProof {
            cms_value,
            a,
            s,
            t1: t1_point,
            t2: t2_point,
            tau_x,
            t_hat,
            mu,
            inner_product_proof,
        })
    }
}

fn commit_vectors(
    left: &[Scalar],
    right: &[Scalar],
    g: &[RistrettoPoint],
    h: &[RistrettoPoint],
    blind: &Scalar,
    h_base: &RistrettoPoint,
) -> Result<RistrettoPoint> {
    let scalars = [left.to_vec(), right.to_vec(), vec![*blind]].concat();
    let points = [g.to_vec(), h.to_vec(), vec![*h_base]].concat();
    multi_scalar_mult(&scalars, &points)
}

/// Aggregated Bulletproofs transcript proving every committed value is in `[0, 2^64)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedRangeProof {
    cms_value: Vec<RistrettoPoint>,
    a: RistrettoPoint,
    s: RistrettoPoint,
    t1: RistrettoPoint,
    t2: RistrettoPoint,
    tau_x: Scalar,
    t_hat: Scalar,
    mu: Scalar,
    inner_product_proof: InnerProductProof,
}

impl AggregatedRangeProof {
    pub fn commitments(&self) -> &[RistrettoPoint] {
        &self.cms_value
    }

    pub fn set_commitments(&mut self, cms_value: Vec<RistrettoPoint>) {
        self.cms_value = cms_value;
    }

    pub fn validate_sanity(&self) -> bool {
        let count = self.cms_value.len();
        if check_output_count(count).is_err() {
            return false;
        }
        if !self.inner_product_proof.validate_sanity() {
            return false;
        }
        let n = MAX_EXP * round_up_pow_two(count);
        self.inner_product_proof.rounds() == n.trailing_zeros() as usize
    }

    pub fn verify(&self) -> Result<()> {
        if !self.validate_sanity() {
            return Err(CryptoError::proof_invalid("range proof failed sanity check"));
        }

        let num_value = self.cms_value.len();
        let num_value_pad = round_up_pow_two(num_value);
        let n = MAX_EXP * num_value_pad;
        let g = &AGG_PARAM.g[..n];
        let h = &AGG_PARAM.h[..n];
        let g_value = value_generator();
        let h_base = randomness_generator();

        let y = generate_challenge(&transcript_seed(&self.cms_value), &[self.a, self.s]);
        let z = generate_challenge(y.as_bytes(), &[self.a, self.s]);
        let x = generate_challenge(z.as_bytes(), &[self.t1, self.t2]);
        let x_square = x * x;

        // tHat·G + tauX·H == Σ z^(j+2)·V_j + δ(y,z)·G + x·T1 + x²·T2
        let y_vector = power_vector(&y, n);
        let delta = compute_delta_yz(&z, &y_vector);

        let mut scalars = vec![self.t_hat - delta, self.tau_x, -x, -x_square];
        let mut points = vec![g_value, h_base, self.t1, self.t2];
        let mut z_tmp = z;
        for v in &self.cms_value {
            z_tmp *= z;
            scalars.push(-z_tmp);
            points.push(*v);
        }
        if !is_identity(&vartime_multi_scalar_mult(&scalars, &points)?) {
            return Err(CryptoError::proof_invalid("range proof polynomial check failed"));
        }

        // P = A + x·S - z·<1,g> + <z + vector_sum ∘ y^-n, h> - mu·H + tHat·u'
        let y_inv_vector = inverse_power_vector(&y, n)?;
        let vector_sum = compute_vector_sum(&z, num_value_pad);
        let u_prime = AGG_PARAM.u * hash_to_scalar(x.as_bytes());

        let mut scalars = Vec::with_capacity(2 * n + 4);
        let mut points = Vec::with_capacity(2 * n + 4);
        scalars.extend([Scalar::ONE, x, -self.mu, self.t_hat]);
        points.extend([self.a, self.s, h_base, u_prime]);
        scalars.extend(std::iter::repeat(-z).take(n));
        points.extend_from_slice(g);
        scalars.extend(
            vector_sum
                .iter()
                .zip(&y_inv_vector)
                .map(|(vs, yi)| z + vs * yi),
        );
        points.extend_from_slice(h);
        let expected_p = vartime_multi_scalar_mult(&scalars, &points)?;

        if &expected_p != self.inner_product_proof.p() {
            return Err(CryptoError::proof_invalid(
                "inner product statement does not match range proof",
            ));
        }

        let h_prime: Vec<RistrettoPoint> =
            h.iter().zip(&y_inv_vector).map(|(hi, yi)| hi * yi).collect();
        self.inner_product_proof
            .verify(g, &h_prime, &u_prime, x.as_bytes())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut res = Vec::new();
        res.push(self.cms_value.len() as u8);
        for c in &self.cms_value {
            res.extend_from_slice(&point_to_bytes(c));
        }
        for p in [&self.a, &self.s, &self.t1, &self.t2] {
            res.extend_from_slice(&point_to_bytes(p));
        }
        for sc in [&self.tau_x, &self.t_hat, &self.mu] {
            res.extend_from_slice(sc.as_bytes());
        }
        res.extend(self.inner_product_proof.to_bytes());
        res
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        let count = reader.read_u8("range proof commitment count")? as usize;
        if count > MAX_OUTPUT_COIN {
            return Err(CryptoError::parse(format!(
                "range proof commits to {} values, max {}",
                count, MAX_OUTPUT_COIN
            )));
        }
        let mut cms_value = Vec::with_capacity(count);
        for _ in 0..count {
            cms_value.push(reader.read_point("range proof commitment")?);
        }
        let a = reader.read_point("range proof A")?;
        let s = reader.read_point("range proof S")?;
        let t1 = reader.read_point("range proof T1")?;
        let t2 = reader.read_point("range proof T2")?;
        let tau_x = reader.read_scalar("range proof tauX")?;
        let t_hat = reader.read_scalar("range proof tHat")?;
        let mu = reader.read_scalar("range proof mu")?;
        let inner_product_proof = InnerProductProof::read_from(&mut reader)?;
        reader.finish("range proof")?;

        Ok(Self {
            cms_value,
            a,
            s,
            t1,
            t2,
            tau_x,
            t_hat,
            mu,
            inner_product_proof,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prove_values(values: &[u64]) -> (AggregatedRangeProof, Vec<Scalar>) {
        let rands: Vec<Scalar> = values.iter().map(|_| random_scalar()).collect();
        let wit = AggregatedRangeWitness::new(values.to_vec(), rands.clone()).unwrap();
        (wit.prove().unwrap(), rands)
    }

    #[test]
    fn test_range_proof_single_value() {
        let (proof, rands) = prove_values(&[100_000]);
        assert!(proof.validate_sanity());
        assert!(proof.verify().is_ok());

        let expected = PED_COM.commit_at_index(&scalar_from_u64(100_000), &rands[0], GeneratorIndex::Value);
        assert_eq!(proof.commitments(), &[expected]);
    }

    #[test]
    fn test_range_proof_aggregated_non_power_of_two() {
        let (proof, _) = prove_values(&[0, 1, u64::MAX]);
        assert_eq!(proof.commitments().len(), 3);
        assert!(proof.verify().is_ok());
    }

    #[test]
    fn test_range_proof_bytes() {
        let (proof, _) = prove_values(&[42, 7]);
        let bytes = proof.to_bytes();
        // count + 2 commitments + 4 points + 3 scalars + ipa(7 rounds)
        assert_eq!(bytes.len(), 1 + 32 * 2 + 32 * 4 + 32 * 3 + 1 + 32 * (2 * 7 + 3));

        let recovered = AggregatedRangeProof::from_bytes(&bytes).unwrap();
        assert_eq!(recovered, proof);
        assert!(recovered.verify().is_ok());
    }

    #[test]
    fn test_range_proof_byte_flip_fails() {
        let (proof, _) = prove_values(&[100_000]);
        let bytes = proof.to_bytes();

        for pos in [0usize, 1, 40, 70, 140, 170, 200, 240, 300, bytes.len() - 40, bytes.len() - 1] {
            let mut tampered = bytes.clone();
            tampered[pos] ^= 0x01;
            match AggregatedRangeProof::from_bytes(&tampered) {
                Ok(p) => assert!(p.verify().is_err(), "flip at {} still verified", pos),
                Err(_) => {}
            }
        }
    }

    #[test]
    fn test_range_proof_wrong_commitment_fails() {
        let (mut proof, _) = prove_values(&[500]);
        let other = PED_COM.commit_at_index(&scalar_from_u64(501), &random_scalar(), GeneratorIndex::Value);
        proof.set_commitments(vec![other]);
        assert!(proof.verify().is_err());
    }

    #[test]
    fn test_witness_rejects_bad_shapes() {
        assert!(AggregatedRangeWitness::new(vec![], vec![]).is_err());
        assert!(AggregatedRangeWitness::new(vec![1, 2], vec![random_scalar()]).is_err());
        let too_many = vec![1u64; MAX_OUTPUT_COIN + 1];
        let rands = vec![Scalar::ONE; MAX_OUTPUT_COIN + 1];
        assert!(AggregatedRangeWitness::new(too_many, rands).is_err());
    }

    #[test]
    fn test_params_deterministic() {
        let fresh = BulletproofParams::new(1);
        assert_eq!(fresh.g[..MAX_EXP], AGG_PARAM.g[..MAX_EXP]);
        assert_ne!(fresh.u, AGG_PARAM.u);
    }
}

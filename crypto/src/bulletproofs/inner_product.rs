use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};

use crate::errors::{CryptoError, Result};
use crate::operation::{
    invert, is_identity, multi_scalar_mult, point_to_bytes, vartime_multi_scalar_mult,
};
use crate::reader::ByteReader;

use super::helpers::inner_product;
use super::{generate_challenge, MAX_IPA_ROUNDS};

/// Logarithmic-size argument that `p = <a,G> + <b,H> + <a,b>·u`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerProductProof {
    l: Vec<RistrettoPoint>,
    r: Vec<RistrettoPoint>,
    a: Scalar,
    b: Scalar,
    p: RistrettoPoint,
}

pub(crate) struct InnerProductWitness {
    pub a: Vec<Scalar>,
    pub b: Vec<Scalar>,
    pub p: RistrettoPoint,
}

impl InnerProductWitness {
    pub(crate) fn prove(
        &self,
        g: &[RistrettoPoint],
        h: &[RistrettoPoint],
        u: &RistrettoPoint,
        hash_cache: &[u8],
    ) -> Result<InnerProductProof> {
        let mut n = self.a.len();
        if n == 0 || !n.is_power_of_two() || self.b.len() != n || g.len() != n || h.len() != n {
            return Err(CryptoError::invalid_input(
                "inner product witness: vectors must share a power-of-two length",
            ));
        }

        let mut a = self.a.clone();
        let mut b = self.b.clone();
        let mut g = g.to_vec();
        let mut h = h.to_vec();
        let mut cache = hash_cache.to_vec();

        let mut l_points = Vec::new();
        let mut r_points = Vec::new();

        while n > 1 {
            let half = n / 2;
            let (a_lo, a_hi) = a.split_at(half);
            let (b_lo, b_hi) = b.split_at(half);
            let (g_lo, g_hi) = g.split_at(half);
            let (h_lo, h_hi) = h.split_at(half);

            let c_l = inner_product(a_lo, b_hi)?;
            let c_r = inner_product(a_hi, b_lo)?;

            let l = cross_term(a_lo, g_hi, b_hi, h_lo, &c_l, u)?;
            let r = cross_term(a_hi, g_lo, b_lo, h_hi, &c_r, u)?;

            let x = generate_challenge(&cache, &[l, r]);
            cache = x.to_bytes().to_vec();
            let x_inv = invert(&x)?;

            let mut a_next = Vec::with_capacity(half);
            let mut b_next = Vec::with_capacity(half);
            let mut g_next = Vec::with_capacity(half);
            let mut h_next = Vec::with_capacity(half);
            for i in 0..half {
                a_next.push(a_lo[i] * x + a_hi[i] * x_inv);
                b_next.push(b_lo[i] * x_inv + b_hi[i] * x);
                g_next.push(g_lo[i] * x_inv + g_hi[i] * x);
                h_next.push(h_lo[i] * x + h_hi[i] * x_inv);
            }

            a = a_next;
            b = b_next;
            g = g_next;
            h = h_next;
            l_points.push(l);
            r_points.push(r);
            n = half;
        }

        Ok(InnerProductProof {
            l: l_points,
            r: r_points,
            a: a[0],
            b: b[0],
            p: self.p,
        })
    }
}

/// `<a,G> + <b,H> + c·u`
fn cross_term(
    a: &[Scalar],
    g: &[RistrettoPoint],
    b: &[Scalar],
    h: &[RistrettoPoint],
    c: &Scalar,
    u: &RistrettoPoint,
) -> Result<RistrettoPoint> {
    let mut scalars = Vec::with_capacity(a.len() + b.len() + 1);
    scalars.extend_from_slice(a);
    scalars.extend_from_slice(b);
    scalars.push(*c);

    let mut points = Vec::with_capacity(g.len() + h.len() + 1);
    points.extend_from_slice(g);
    points.extend_from_slice(h);
    points.push(*u);

    multi_scalar_mult(&scalars, &points)
}

impl InnerProductProof {
    pub fn p(&self) -> &RistrettoPoint {
        &self.p
    }

    pub fn rounds(&self) -> usize {
        self.l.len()
    }

    pub fn validate_sanity(&self) -> bool {
        self.l.len() == self.r.len() && self.l.len() <= MAX_IPA_ROUNDS
    }

    pub fn verify(
        &self,
        g: &[RistrettoPoint],
        h: &[RistrettoPoint],
        u: &RistrettoPoint,
        hash_cache: &[u8],
    ) -> Result<()> {
        let n = g.len();
        if !self.validate_sanity() || h.len() != n || n != 1usize << self.rounds() {
            return Err(CryptoError::proof_invalid(
                "inner product: round count does not match generator length",
            ));
        }

        let mut cache = hash_cache.to_vec();
        let mut challenges = Vec::with_capacity(self.rounds());
        for (l, r) in self.l.iter().zip(&self.r) {
            let x = generate_challenge(&cache, &[*l, *r]);
            cache = x.to_bytes().to_vec();
            challenges.push(x);
        }
        let inverses = challenges
            .iter()
            .map(invert)
            .collect::<Result<Vec<Scalar>>>()?;

        // s_i selects x_j when bit j of i (from the top) picked the upper half.
        let k = self.rounds();
        let mut s = Vec::with_capacity(n);
        let mut s_inv = Vec::with_capacity(n);
        for i in 0..n {
            let mut acc = Scalar::ONE;
            let mut acc_inv = Scalar::ONE;
            for j in 0..k {
                if (i >> (k - 1 - j)) & 1 == 1 {
                    acc *= challenges[j];
                    acc_inv *= inverses[j];
                } else {
                    acc *= inverses[j];
                    acc_inv *= challenges[j];
                }
            }
            s.push(acc * self.a);
            s_inv.push(acc_inv * self.b);
        }

        let mut scalars = Vec::with_capacity(2 * n + 2 * k + 2);
        let mut points = Vec::with_capacity(2 * n + 2 * k + 2);
        scalars.extend(s);
        points.extend_from_slice(g);
        scalars.extend(s_inv);
        points.extend_from_slice(h);
        scalars.push(self.a * self.b);
        points.push(*u);
        scalars.push(-Scalar::ONE);
        points.push(self.p);
        for j in 0..k {
            let x_sq = challenges[j] * challenges[j];
            let x_inv_sq = inverses[j] * inverses[j];
            scalars.push(-x_sq);
            points.push(self.l[j]);
            scalars.push(-x_inv_sq);
            points.push(self.r[j]);
        }

        let check = vartime_multi_scalar_mult(&scalars, &points)?;
        if !is_identity(&check) {
            return Err(CryptoError::proof_invalid("inner product argument does not hold"));
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut res = Vec::with_capacity(1 + 32 * (2 * self.l.len() + 3));
        res.push(self.l.len() as u8);
        for l in &self.l {
            res.extend_from_slice(&point_to_bytes(l));
        }
        for r in &self.r {
            res.extend_from_slice(&point_to_bytes(r));
        }
        res.extend_from_slice(self.a.as_bytes());
        res.extend_from_slice(self.b.as_bytes());
        res.extend_from_slice(&point_to_bytes(&self.p));
        res
    }

    pub fn read_from(reader: &mut ByteReader<'_>) -> Result<Self> {
        let rounds = reader.read_u8("inner product rounds")? as usize;
        if rounds > MAX_IPA_ROUNDS {
            return Err(CryptoError::parse(format!(
                "inner product rounds {} exceed {}",
                rounds, MAX_IPA_ROUNDS
            )));
        }
        let mut l = Vec::with_capacity(rounds);
        for _ in 0..rounds {
            l.push(reader.read_point("inner product L")?);
        }
        let mut r = Vec::with_capacity(rounds);
        for _ in 0..rounds {
            r.push(reader.read_point("inner product R")?);
        }
        let a = reader.read_scalar("inner product a")?;
        let b = reader.read_scalar("inner product b")?;
        let p = reader.read_point("inner product p")?;
        Ok(Self { l, r, a, b, p })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        let proof = Self::read_from(&mut reader)?;
        reader.finish("inner product proof")?;
        Ok(proof)
    }
}

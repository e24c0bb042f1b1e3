use curve25519_dalek::scalar::Scalar;

use crate::errors::{CryptoError, Result};
use crate::operation::{invert, scalar_from_u64};

use super::MAX_EXP;

pub(crate) fn inner_product(a: &[Scalar], b: &[Scalar]) -> Result<Scalar> {
    check_same_len(a.len(), b.len())?;
    Ok(a.iter().zip(b).fold(Scalar::ZERO, |acc, (x, y)| x * y + acc))
}

pub(crate) fn vector_add(a: &[Scalar], b: &[Scalar]) -> Result<Vec<Scalar>> {
    check_same_len(a.len(), b.len())?;
    Ok(a.iter().zip(b).map(|(x, y)| x + y).collect())
}

pub(crate) fn hadamard_product(a: &[Scalar], b: &[Scalar]) -> Result<Vec<Scalar>> {
    check_same_len(a.len(), b.len())?;
    Ok(a.iter().zip(b).map(|(x, y)| x * y).collect())
}

pub(crate) fn vector_add_scalar(v: &[Scalar], s: &Scalar) -> Vec<Scalar> {
    v.iter().map(|x| x + s).collect()
}

pub(crate) fn vector_mul_scalar(v: &[Scalar], s: &Scalar) -> Vec<Scalar> {
    v.iter().map(|x| x * s).collect()
}

/// `[1, base, base^2, ..., base^(n-1)]`
pub(crate) fn power_vector(base: &Scalar, n: usize) -> Vec<Scalar> {
    let mut result = Vec::with_capacity(n);
    let mut acc = Scalar::ONE;
    for _ in 0..n {
        result.push(acc);
        acc *= base;
    }
    result
}

/// Little-endian bit decomposition of `number` into `n` scalars.
pub(crate) fn uint64_to_binary(number: u64, n: usize) -> Vec<Scalar> {
    (0..n)
        .map(|i| {
            if i < 64 {
                scalar_from_u64((number >> i) & 1)
            } else {
                Scalar::ZERO
            }
        })
        .collect()
}

pub(crate) fn round_up_pow_two(v: usize) -> usize {
    if v == 0 {
        1
    } else {
        v.next_power_of_two()
    }
}

/// `(z - z^2)·<1, y^N> - Σ_j z^(j+3)·<1, 2^64>`
pub(crate) fn compute_delta_yz(z: &Scalar, y_vector: &[Scalar]) -> Scalar {
    let z_square = z * z;
    let sum_y: Scalar = y_vector.iter().sum();
    let sum_two: Scalar = power_vector(&scalar_from_u64(2), MAX_EXP).iter().sum();

    let mut delta = (z - z_square) * sum_y;
    let mut z_tmp = z_square;
    for _ in 0..(y_vector.len() / MAX_EXP) {
        z_tmp *= z;
        delta -= z_tmp * sum_two;
    }
    delta
}

/// `y^(-i)` for `i` in `0..n`.
pub(crate) fn inverse_power_vector(y: &Scalar, n: usize) -> Result<Vec<Scalar>> {
    let y_inv = invert(y)?;
    Ok(power_vector(&y_inv, n))
}

fn check_same_len(a: usize, b: usize) -> Result<()> {
    if a != b {
        return Err(CryptoError::invalid_input(format!(
            "incompatible vector sizes {} and {}",
            a, b
        )));
    }
    Ok(())
}

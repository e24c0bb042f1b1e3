//! MLSAG rings over ledger coins. Row `pi` of a signer's ring holds the real
//! inputs; every other row holds decoys drawn uniformly from the output
//! coin positions. The last column is the commitment-to-zero point
//! `Σ input commitments - (Σ output commitments + fee·G[Value])`.

use curve25519_dalek::ristretto::RistrettoPoint;
use privacy_crypto::operation::{identity, scalar_from_u64};
use privacy_crypto::pedersen::value_generator;
use privacy_crypto::Ring;
use privacy_types::{Coin, SigPubKey};
use rand::Rng;
use tracing::debug;

use crate::balance::OwnedCoin;
use crate::errors::{Result, TxError};
use crate::ledger::LedgerReader;

pub fn calculate_sum_outputs_with_fee(outputs: &[Coin], fee: u64) -> Result<RistrettoPoint> {
    let mut sum = identity();
    for coin in outputs {
        let commitment = coin
            .commitment()
            .ok_or_else(|| TxError::sanity("output coin has no commitment"))?;
        sum += commitment;
    }
    Ok(sum + scalar_from_u64(fee) * value_generator())
}

/// Output coin stored at ledger `position`.
pub fn coin_at_position<L: LedgerReader>(ledger: &L, position: u64) -> Result<Coin> {
    let ota = ledger
        .get_ota_coin(&position.to_string())
        .ok_or_else(|| TxError::ledger(format!("no ota coin at position {}", position)))?;
    let record = ledger
        .get_output_coin(&ota.output_coin_index)
        .ok_or_else(|| TxError::ledger(format!("no output coin {}", ota.output_coin_index)))?;
    Ok(Coin::from_bytes(&record.value)?)
}

fn public_key_and_commitment(coin: &Coin) -> Result<(RistrettoPoint, RistrettoPoint)> {
    match (coin.public_key(), coin.commitment()) {
        (Some(pk), Some(cm)) => Ok((*pk, *cm)),
        _ => Err(TxError::sanity("ring coin is missing its public key or commitment")),
    }
}

/// Ring of `ring_size` rows with the real inputs at row `pi`. Returns the
/// ring, the ledger positions of every cell and the signer's
/// commitment-to-zero point.
pub fn generate_ring_with_indexes<L: LedgerReader>(
    ledger: &L,
    inputs: &[OwnedCoin],
    sum_outputs_with_fee: &RistrettoPoint,
    pi: usize,
    ring_size: usize,
    max_attempts: u32,
) -> Result<(Ring, SigPubKey, RistrettoPoint)> {
    let count = ledger.output_coin_count();
    if count == 0 {
        return Err(TxError::ledger("ledger has no output coins to sample decoys from"));
    }

    let mut rng = rand::thread_rng();
    let mut attempts = 0u32;
    let mut keys = Vec::with_capacity(ring_size);
    let mut indexes = Vec::with_capacity(ring_size);
    let mut commitment_to_zero = identity();

    for i in 0..ring_size {
        let mut sum_inputs = -sum_outputs_with_fee;
        let mut row = Vec::with_capacity(inputs.len() + 1);
        let mut row_indexes = Vec::with_capacity(inputs.len());

        if i == pi {
            for input in inputs {
                let (pk, cm) = public_key_and_commitment(&input.coin)?;
                row.push(pk);
                row_indexes.push(input.position);
                sum_inputs += cm;
            }
        } else {
            for _ in inputs {
                let (position, coin) = loop {
                    if attempts >= max_attempts {
                        return Err(TxError::ledger(format!(
                            "cannot form decoys after {} attempts",
                            attempts
                        )));
                    }
                    attempts += 1;
                    let position = rng.gen_range(0..count);
                    match coin_at_position(ledger, position) {
                        Ok(coin) => break (position, coin),
                        Err(TxError::Ledger(_)) => continue,
                        Err(e) => return Err(e),
                    }
                };
                let (pk, cm) = public_key_and_commitment(&coin)?;
                row.push(pk);
                row_indexes.push(position);
                sum_inputs += cm;
            }
        }

        if i == pi {
            commitment_to_zero = sum_inputs;
        }
        row.push(sum_inputs);
        keys.push(row);
        indexes.push(row_indexes);
    }

    debug!(rows = ring_size, columns = inputs.len() + 1, attempts, "ring generated");
    Ok((Ring::new(keys)?, SigPubKey::new(indexes), commitment_to_zero))
}

/// Rebuilds a transfer's ring purely from ledger lookups.
pub fn get_ring_from_sig_pub_key<L: LedgerReader>(
    ledger: &L,
    sum_outputs_with_fee: &RistrettoPoint,
    sig_pub_key: &[u8],
) -> Result<Ring> {
    let sig_pub_key = SigPubKey::from_bytes(sig_pub_key)?;
    let mut keys = Vec::with_capacity(sig_pub_key.rows());
    for row_indexes in &sig_pub_key.indexes {
        let mut sum_commitment = -sum_outputs_with_fee;
        let mut row = Vec::with_capacity(row_indexes.len() + 1);
        for position in row_indexes {
            let coin = coin_at_position(ledger, *position)?;
            let (pk, cm) = public_key_and_commitment(&coin)?;
            row.push(pk);
            sum_commitment += cm;
        }
        row.push(sum_commitment);
        keys.push(row);
    }
    Ok(Ring::new(keys)?)
}

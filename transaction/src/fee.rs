use privacy_crypto::operation::POINT_SIZE;
use privacy_types::tx_random::TX_RANDOM_SIZE;

pub const RING_SIZE: usize = 2;
pub const DEFAULT_FEE_PER_KB: u64 = 1;

const KB: u64 = 1024;

/// Length of the base64 encoding of `n` bytes.
fn to_b64_len(n: u64) -> u64 {
    let l = (n * 4 + 2) / 3;
    ((l + 3) / 4) * 4
}

fn floor_log2(n: u64) -> u64 {
    if n == 0 {
        0
    } else {
        63 - u64::from(n.leading_zeros())
    }
}

fn estimate_proof_size(num_in: u64, num_out: u64) -> u64 {
    let point = POINT_SIZE as u64;
    let coin_size_bound = 257 + (point + 1) * 7 + TX_RANDOM_SIZE as u64 + 1;
    let ip_rounds = floor_log2(num_out) + 1;
    let agg_proof_size_bound =
        4 + 1 + point * (7 + num_out) + 1 + (2 * ip_rounds + 3) * point;
    // 10 bytes of rounding slack
    to_b64_len(1 + (coin_size_bound + 1) * (num_in + num_out) + 2 + agg_proof_size_bound + 10)
}

/// Upper bound on the serialized size of a transaction, in bytes.
pub fn estimate_tx_size(
    num_input_coins: usize,
    num_payments: usize,
    metadata: Option<&[u8]>,
    ring_size: usize,
) -> u64 {
    let json_keys_size_bound = 20 * 10 + 2;
    let size_version = 1;
    let size_type = 5;
    let size_lock_time = 8 * 3;
    let size_fee = 8 * 3;
    let size_info = to_b64_len(512);

    let num_in = num_input_coins as u64;
    let num_out = num_payments as u64;
    let ring = ring_size as u64;

    let size_sig_pub_key = to_b64_len(num_in * ring * 9 + 2);
    let size_sig = (1 + num_in + (num_in + 2) * ring) * 33 + 3;
    let size_proof = estimate_proof_size(num_in, num_out);
    let size_last_byte = 3;
    let size_metadata = metadata.map_or(0, |md| md.len() as u64);

    json_keys_size_bound
        + size_version
        + size_type
        + size_lock_time
        + size_fee
        + size_info
        + size_sig_pub_key
        + size_sig
        + size_proof
        + size_last_byte
        + size_metadata
}

pub fn estimate_fee(
    fee_per_kb: u64,
    num_input_coins: usize,
    num_payments: usize,
    metadata: Option<&[u8]>,
) -> u64 {
    estimate_fee_with_ring_size(fee_per_kb, num_input_coins, num_payments, metadata, RING_SIZE)
}

/// `max(fee_per_kb, 1) * ceil(size / 1 kB)`
pub fn estimate_fee_with_ring_size(
    fee_per_kb: u64,
    num_input_coins: usize,
    num_payments: usize,
    metadata: Option<&[u8]>,
    ring_size: usize,
) -> u64 {
    let fee_per_kb = fee_per_kb.max(DEFAULT_FEE_PER_KB);
    let size = estimate_tx_size(num_input_coins, num_payments, metadata, ring_size);
    fee_per_kb.saturating_mul(size.div_ceil(KB))
}

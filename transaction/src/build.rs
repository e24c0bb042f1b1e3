//! Transaction construction for the three kinds of privacy message.

use curve25519_dalek::scalar::Scalar;
use privacy_crypto::{add_u64, sub_u64, AggregatedRangeWitness, Mlsag, SchnorrPrivateKey};
use privacy_crypto::pedersen::randomness_generator;
use privacy_types::{Coin, KeySet, OtaReceiver, PaymentInfo, PaymentProof, MAX_SIZE_INFO_COIN};
use rand::Rng;
use tracing::{debug, info};

use crate::balance::unspent_coins;
use crate::config::TxConfig;
use crate::errors::{Result, TxError};
use crate::ledger::LedgerReader;
use crate::message::{msg_hash, unix_now, MsgShield, PrivacyMessage, TxType};
use crate::metadata::Metadata;
use crate::ring::{calculate_sum_outputs_with_fee, generate_ring_with_indexes};
use crate::selection::choose_coins_with_fee;

fn check_info(info: &[u8]) -> Result<()> {
    if info.len() > MAX_SIZE_INFO_COIN {
        return Err(TxError::sanity(format!(
            "coin info is {} bytes, at most {} allowed",
            info.len(),
            MAX_SIZE_INFO_COIN
        )));
    }
    Ok(())
}

fn plaintext_output(receiver: &OtaReceiver, amount: u64, info: Vec<u8>) -> Result<Coin> {
    if !receiver.is_valid() {
        return Err(TxError::sanity("receiver one-time key is not valid"));
    }
    check_info(&info)?;
    Ok(Coin::new_from_amount_and_tx_random(
        amount,
        *receiver.public_key(),
        *receiver.tx_random(),
        info,
    ))
}

/// Deposits `amount` from the public account `from` into one plaintext
/// output for `receiver`.
pub fn build_shield_tx(
    from: impl Into<String>,
    receiver: &OtaReceiver,
    amount: u64,
    info: Vec<u8>,
) -> Result<MsgShield> {
    if amount == 0 {
        return Err(TxError::sanity("shield amount must be positive"));
    }
    let coin = plaintext_output(receiver, amount, info)?;
    let proof = PaymentProof::new(None, Vec::new(), vec![coin]);
    let lock_time = unix_now();
    let hash = msg_hash(lock_time, 0, Some(&proof), None)?;

    let from = from.into();
    info!(%from, amount, "shield tx built");
    Ok(MsgShield {
        hash: hash.to_vec(),
        from,
        amount,
        lock_time,
        proof: proof.to_bytes()?,
    })
}

/// Mints a plaintext coin for `receiver`, signed with a fresh Schnorr key.
/// The hash covers `metadata`; `info` rides on the coin and the message info stays empty.
pub fn build_mint_tx(
    receiver: &OtaReceiver,
    amount: u64,
    info: Vec<u8>,
    metadata: Option<Metadata>,
) -> Result<PrivacyMessage> {
    let coin = plaintext_output(receiver, amount, info)?;
    let proof = PaymentProof::new(None, Vec::new(), vec![coin]);
    let lock_time = unix_now();
    let hash = msg_hash(lock_time, 0, Some(&proof), metadata.as_ref())?;

    let sk = SchnorrPrivateKey::generate();
    let sig = sk.sign(&hash);

    info!(amount, "mint tx built");
    Ok(PrivacyMessage {
        hash: hash.to_vec(),
        lock_time,
        fee: 0,
        info: Vec::new(),
        sig_pub_key: sk.public_key().to_bytes().to_vec(),
        sig: sig.to_bytes().to_vec(),
        proof: proof.to_bytes()?,
        tx_type: TxType::Mint,
        metadata,
    })
}

/// Spends unspent coins of `key_set` to `payments`, returning change to the
/// sender. With unshield metadata the public amount is burned alongside the
/// payments.
pub fn build_transfer_tx<L: LedgerReader>(
    ledger: &L,
    key_set: &KeySet,
    payments: Vec<PaymentInfo>,
    metadata: Option<Metadata>,
    config: &TxConfig,
) -> Result<PrivacyMessage> {
    config.validate()?;
    let tx_type = metadata.as_ref().map_or(TxType::Transfer, Metadata::tx_type);
    if let Some(md) = &metadata {
        md.validate_sanity()?;
    }
    if payments.is_empty() && metadata.is_none() {
        return Err(TxError::sanity("transfer needs at least one payment"));
    }

    let mut amount = burned_amount(metadata.as_ref());
    for p in &payments {
        check_info(&p.message)?;
        amount = add_u64(amount, p.amount)?;
    }

    let md_bytes = metadata.as_ref().map(Metadata::to_bytes).transpose()?;
    let coins = unspent_coins(ledger, key_set)?;
    let (selection, fee) =
        choose_coins_with_fee(coins, amount, payments.len(), md_bytes.as_deref(), config)?;
    let change = sub_u64(sub_u64(selection.total, amount)?, fee)?;

    let mut payments = payments;
    // A pure unshield keeps a zero-value change coin so the range proof has
    // something to cover.
    if change > 0 || payments.is_empty() {
        payments.push(PaymentInfo::new(*key_set.payment_address(), change, Vec::new()));
    }
    let public_value = add_u64(fee, burned_amount(metadata.as_ref()))?;

    let mut outputs: Vec<Coin> = payments.iter().map(Coin::new_from_payment_info).collect();
    let output_masks = outputs
        .iter()
        .map(|c| c.mask().copied())
        .collect::<Option<Vec<Scalar>>>()
        .ok_or_else(|| TxError::sanity("output coin has no mask"))?;
    let values: Vec<u64> = outputs.iter().map(Coin::value).collect();
    let range_proof = AggregatedRangeWitness::new(values, output_masks.clone())?.prove()?;

    for (coin, payment) in outputs.iter_mut().zip(&payments) {
        coin.conceal_output_coin(payment.payment_address.public_view());
    }
    let inputs: Vec<Coin> = selection
        .selected
        .iter()
        .map(|owned| {
            let mut coin = owned.coin.clone();
            coin.conceal_input_coin();
            coin
        })
        .collect();
    let proof = PaymentProof::new(Some(range_proof), inputs, outputs);
    let lock_time = unix_now();
    let hash = msg_hash(lock_time, fee, Some(&proof), metadata.as_ref())?;

    let sum_outputs = calculate_sum_outputs_with_fee(proof.output_coins(), public_value)?;
    let pi = rand::thread_rng().gen_range(0..config.ring_size);
    let (ring, sig_pub_key, commitment_to_zero) = generate_ring_with_indexes(
        ledger,
        &selection.selected,
        &sum_outputs,
        pi,
        config.ring_size,
        config.max_decoy_attempts,
    )?;

    let mut private_keys = Vec::with_capacity(selection.selected.len() + 1);
    let mut sum_rand = Scalar::ZERO;
    for owned in &selection.selected {
        private_keys.push(owned.coin.private_key_of_coin(key_set)?);
        let mask = owned
            .coin
            .mask()
            .ok_or_else(|| TxError::sanity("input coin has no mask"))?;
        sum_rand += mask;
    }
    for mask in &output_masks {
        sum_rand -= mask;
    }
    if sum_rand * randomness_generator() != commitment_to_zero {
        return Err(TxError::sanity("inputs do not balance outputs and fee"));
    }
    private_keys.push(sum_rand);

    let mut sig = Mlsag::new(private_keys, ring, pi)?.sign(&hash)?;
    sig.set_key_images(Vec::new());

    info!(
        inputs = selection.selected.len(),
        outputs = proof.output_coins().len(),
        fee,
        ?tx_type,
        "transfer tx built"
    );
    debug!(pi, ring_size = config.ring_size, "signed at ring row");

    Ok(PrivacyMessage {
        hash: hash.to_vec(),
        lock_time,
        fee,
        info: Vec::new(),
        sig_pub_key: sig_pub_key.to_bytes()?,
        sig: sig.to_bytes()?,
        proof: proof.to_bytes()?,
        tx_type,
        metadata,
    })
}

/// Value leaving the shielded pool in the clear besides the fee.
pub fn burned_amount(metadata: Option<&Metadata>) -> u64 {
    match metadata {
        Some(Metadata::Unshield { amount, .. }) => *amount,
        None => 0,
    }
}

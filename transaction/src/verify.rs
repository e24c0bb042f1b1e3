//! Admission checks for incoming messages. Stateless sanity runs first, then
//! the double-spend guard against the ledger, then the cryptographic checks.

use privacy_crypto::mlsag;
use privacy_crypto::operation::random_point;
use privacy_crypto::{add_u64, MlsagSig, SchnorrPublicKey, SchnorrSignature};
use privacy_types::PaymentProof;
use tracing::{debug, warn};

use crate::build::burned_amount;
use crate::config::TxConfig;
use crate::errors::{Result, TxError};
use crate::ledger::{onetime_address_index, serial_number_index, LedgerReader};
use crate::message::{msg_hash, MsgShield, PrivacyMessage, TxType};
use crate::ring::{calculate_sum_outputs_with_fee, get_ring_from_sig_pub_key};

/// Checks the ring signature of a transfer. `public_value` is the fee plus
/// any value leaving the pool in the clear.
pub fn verify_sig<L: LedgerReader>(
    ledger: &L,
    sig: &[u8],
    sig_pub_key: &[u8],
    proof: &PaymentProof,
    public_value: u64,
    message_hash: &[u8],
) -> Result<bool> {
    let sum_outputs = calculate_sum_outputs_with_fee(proof.output_coins(), public_value)?;
    let ring = get_ring_from_sig_pub_key(ledger, &sum_outputs, sig_pub_key)?;

    let parsed = MlsagSig::from_bytes(sig)?;
    let mut key_images = Vec::with_capacity(proof.input_coins().len() + 1);
    for coin in proof.input_coins() {
        let ki = coin
            .key_image()
            .ok_or_else(|| TxError::sanity("input coin has no key image"))?;
        key_images.push(*ki);
    }
    // The commitment-to-zero column has no key image of its own.
    key_images.push(random_point());

    let sig = MlsagSig::new(*parsed.c(), key_images, parsed.r().to_vec())?;
    Ok(mlsag::verify(&sig, &ring, message_hash)?)
}

/// Checks the Schnorr signature carried by a mint.
pub fn verify_sig_no_privacy(sig: &[u8], sig_pub_key: &[u8], message_hash: &[u8]) -> Result<bool> {
    let pk = SchnorrPublicKey::from_bytes(sig_pub_key)?;
    let sig = SchnorrSignature::from_bytes(sig)?;
    Ok(pk.verify(&sig, message_hash))
}

/// Rejects proofs whose serial numbers or one-time addresses already exist.
pub fn check_double_spend<L: LedgerReader>(ledger: &L, proof: &PaymentProof) -> Result<()> {
    for coin in proof.input_coins() {
        let ki = coin
            .key_image()
            .ok_or_else(|| TxError::sanity("input coin has no key image"))?;
        let index = serial_number_index(coin.is_confidential_asset(), ki);
        if ledger.get_serial_number(&index).is_some() {
            return Err(TxError::Duplicate {
                kind: "serial number",
                index,
            });
        }
    }
    for coin in proof.output_coins() {
        let index = onetime_address_index(coin)?;
        if ledger.get_onetime_address(&index).is_some() {
            return Err(TxError::Duplicate {
                kind: "onetime address",
                index,
            });
        }
    }
    Ok(())
}

fn check_plaintext_outputs(proof: &PaymentProof) -> Result<()> {
    if !proof.input_coins().is_empty() {
        return Err(TxError::sanity("plaintext deposit must not spend inputs"));
    }
    if proof.output_coins().iter().any(|c| c.is_encrypted()) {
        return Err(TxError::sanity("deposit outputs must open to their amount and mask"));
    }
    Ok(())
}

/// Stateless checks. Returns the decoded proof for the later stages.
pub fn validate_sanity(msg: &PrivacyMessage, config: &TxConfig, now: u64) -> Result<PaymentProof> {
    if msg.lock_time > now {
        return Err(TxError::sanity(format!(
            "lock time {} is in the future (now {})",
            msg.lock_time, now
        )));
    }
    let size = msg.size_in_kb()?;
    if size > config.max_tx_size_kb {
        return Err(TxError::sanity(format!(
            "message is {} kB, limit is {} kB",
            size, config.max_tx_size_kb
        )));
    }
    if msg.info.len() > config.max_info_size {
        return Err(TxError::sanity(format!(
            "info is {} bytes, limit is {}",
            msg.info.len(),
            config.max_info_size
        )));
    }

    let proof = msg.payment_proof()?;
    proof.validate_sanity()?;

    let hash = msg_hash(msg.lock_time, msg.fee, Some(&proof), msg.metadata.as_ref())?;
    if hash.as_slice() != msg.hash.as_slice() {
        return Err(TxError::sanity("message hash does not match its contents"));
    }

    match (&msg.metadata, msg.tx_type) {
        (Some(md), tx_type) => md.validate_by_itself(tx_type)?,
        (None, TxType::Unshield) => {
            return Err(TxError::sanity("unshield message carries no metadata"))
        }
        (None, _) => {}
    }

    if msg.tx_type.is_private_spend() {
        if proof.input_coins().is_empty() {
            return Err(TxError::sanity("transfer spends no inputs"));
        }
        if proof.aggregated_range_proof().is_none() {
            return Err(TxError::sanity("transfer carries no range proof"));
        }
    } else {
        check_plaintext_outputs(&proof)?;
    }
    Ok(proof)
}

/// Cryptographic checks that need only the ledger's coin history.
pub fn validate_by_itself<L: LedgerReader>(
    ledger: &L,
    msg: &PrivacyMessage,
    proof: &PaymentProof,
) -> Result<()> {
    let valid = match msg.tx_type {
        TxType::Mint => verify_sig_no_privacy(&msg.sig, &msg.sig_pub_key, &msg.hash)?,
        TxType::Transfer | TxType::Unshield => {
            proof.verify()?;
            let public_value = add_u64(msg.fee, burned_amount(msg.metadata.as_ref()))?;
            verify_sig(ledger, &msg.sig, &msg.sig_pub_key, proof, public_value, &msg.hash)?
        }
    };
    if !valid {
        return Err(TxError::Crypto(privacy_crypto::CryptoError::proof_invalid(
            "signature does not verify",
        )));
    }
    Ok(())
}

/// Full admission of `msg` against `ledger` at time `now`.
pub fn verify_transaction<L: LedgerReader>(
    ledger: &L,
    msg: &PrivacyMessage,
    config: &TxConfig,
    now: u64,
) -> Result<()> {
    let proof = validate_sanity(msg, config, now).inspect_err(|e| {
        warn!(stage = "sanity", tx_type = ?msg.tx_type, error = %e, "rejected");
    })?;
    check_double_spend(ledger, &proof).inspect_err(|e| {
        warn!(stage = "double spend", tx_type = ?msg.tx_type, error = %e, "rejected");
    })?;
    validate_by_itself(ledger, msg, &proof).inspect_err(|e| {
        warn!(stage = "crypto", tx_type = ?msg.tx_type, error = %e, "rejected");
    })?;
    debug!(tx_type = ?msg.tx_type, hash = %hex::encode(&msg.hash), "accepted");
    Ok(())
}

pub fn verify_shield<L: LedgerReader>(ledger: &L, msg: &MsgShield) -> Result<()> {
    if msg.from.trim().is_empty() {
        return Err(TxError::sanity("shield: empty sender"));
    }
    let proof = msg.payment_proof()?;
    proof.validate_sanity()?;
    check_plaintext_outputs(&proof)?;
    match proof.output_coins() {
        [coin] if coin.value() == msg.amount => {}
        [_] => return Err(TxError::sanity("shield output does not carry the stated amount")),
        _ => return Err(TxError::sanity("shield must have exactly one output")),
    }
    let hash = msg_hash(msg.lock_time, 0, Some(&proof), None)?;
    if hash.as_slice() != msg.hash.as_slice() {
        return Err(TxError::sanity("shield hash does not match its contents"));
    }
    check_double_spend(ledger, &proof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{build_mint_tx, build_shield_tx, build_transfer_tx};
    use crate::ledger::MemoryLedger;
    use crate::message::unix_now;
    use crate::metadata::Metadata;
    use privacy_types::{KeySet, OtaReceiver, PaymentInfo};

    fn mint_to(ledger: &mut MemoryLedger, owner: &KeySet, amount: u64) -> PrivacyMessage {
        let receiver = OtaReceiver::from_address(owner.payment_address()).unwrap();
        let msg = build_mint_tx(&receiver, amount, Vec::new(), None).unwrap();
        ledger.apply_proof(&msg.proof).unwrap();
        msg
    }

    fn transfer(ledger: &MemoryLedger, from: &KeySet, to: &KeySet, amount: u64) -> PrivacyMessage {
        let payment = PaymentInfo::new(*to.payment_address(), amount, Vec::new());
        build_transfer_tx(ledger, from, vec![payment], None, &TxConfig::default()).unwrap()
    }

    fn later() -> u64 {
        unix_now() + 10
    }

    #[test]
    fn test_verify_mint() {
        let ks = KeySet::from_seed(b"mint");
        let receiver = OtaReceiver::from_address(ks.payment_address()).unwrap();
        let msg = build_mint_tx(&receiver, 10, Vec::new(), None).unwrap();
        let ledger = MemoryLedger::new();
        assert!(verify_transaction(&ledger, &msg, &TxConfig::default(), later()).is_ok());

        let mut forged = msg.clone();
        forged.sig = build_mint_tx(&receiver, 10, Vec::new(), None).unwrap().sig;
        assert!(matches!(
            verify_transaction(&ledger, &forged, &TxConfig::default(), later()),
            Err(TxError::Crypto(_))
        ));
    }

    #[test]
    fn test_verify_transfer() {
        let alice = KeySet::from_seed(b"alice");
        let bob = KeySet::from_seed(b"bob");
        let mut ledger = MemoryLedger::new();
        mint_to(&mut ledger, &alice, 1000);
        mint_to(&mut ledger, &bob, 5);

        let msg = transfer(&ledger, &alice, &bob, 100);
        let proof = msg.payment_proof().unwrap();
        assert!(verify_sig(&ledger, &msg.sig, &msg.sig_pub_key, &proof, msg.fee, &msg.hash).unwrap());
        assert!(!verify_sig(&ledger, &msg.sig, &msg.sig_pub_key, &proof, msg.fee + 1, &msg.hash).unwrap());
        assert!(verify_transaction(&ledger, &msg, &TxConfig::default(), later()).is_ok());
    }

    #[test]
    fn test_sanity_rejections() {
        let alice = KeySet::from_seed(b"alice");
        let mut ledger = MemoryLedger::new();
        mint_to(&mut ledger, &alice, 1000);
        let msg = transfer(&ledger, &alice, &KeySet::from_seed(b"bob"), 1);
        let config = TxConfig::default();

        assert!(validate_sanity(&msg, &config, msg.lock_time.saturating_sub(1)).is_err());

        let mut tampered = msg.clone();
        tampered.fee += 1;
        assert!(matches!(validate_sanity(&tampered, &config, later()), Err(TxError::Sanity(_))));

        let mut long_info = msg.clone();
        long_info.info = vec![0u8; config.max_info_size + 1];
        assert!(validate_sanity(&long_info, &config, later()).is_err());

        let tight = TxConfig {
            max_tx_size_kb: 1,
            ..TxConfig::default()
        };
        assert!(validate_sanity(&msg, &tight, later()).is_err());

        let mut as_mint = msg.clone();
        as_mint.tx_type = TxType::Mint;
        assert!(validate_sanity(&as_mint, &config, later()).is_err());

        let mut as_unshield = msg;
        as_unshield.tx_type = TxType::Unshield;
        assert!(validate_sanity(&as_unshield, &config, later()).is_err());
    }

    #[test]
    fn test_double_spend_guard() {
        let alice = KeySet::from_seed(b"alice");
        let bob = KeySet::from_seed(b"bob");
        let mut ledger = MemoryLedger::new();
        let mint = mint_to(&mut ledger, &alice, 1000);

        let replay = check_double_spend(&ledger, &mint.payment_proof().unwrap());
        assert!(matches!(replay, Err(TxError::Duplicate { kind: "onetime address", .. })));

        let first = transfer(&ledger, &alice, &bob, 10);
        let second = transfer(&ledger, &alice, &bob, 20);
        assert!(verify_transaction(&ledger, &first, &TxConfig::default(), later()).is_ok());
        ledger.apply_proof(&first.proof).unwrap();

        assert!(matches!(
            verify_transaction(&ledger, &second, &TxConfig::default(), later()),
            Err(TxError::Duplicate { kind: "serial number", .. })
        ));
    }

    #[test]
    fn test_verify_unshield() {
        let alice = KeySet::from_seed(b"alice");
        let mut ledger = MemoryLedger::new();
        mint_to(&mut ledger, &alice, 1000);
        let md = Metadata::Unshield {
            to_address: "cosmos1dest".into(),
            amount: 250,
        };
        let msg = build_transfer_tx(&ledger, &alice, Vec::new(), Some(md), &TxConfig::default()).unwrap();
        assert!(verify_transaction(&ledger, &msg, &TxConfig::default(), later()).is_ok());

        let proof = msg.payment_proof().unwrap();
        assert!(!verify_sig(&ledger, &msg.sig, &msg.sig_pub_key, &proof, msg.fee, &msg.hash).unwrap());
    }

    #[test]
    fn test_verify_shield() {
        let ks = KeySet::from_seed(b"shield");
        let receiver = OtaReceiver::from_address(ks.payment_address()).unwrap();
        let msg = build_shield_tx("cosmos1from", &receiver, 42, Vec::new()).unwrap();
        let mut ledger = MemoryLedger::new();
        assert!(verify_shield(&ledger, &msg).is_ok());

        let mut wrong_amount = msg.clone();
        wrong_amount.amount = 43;
        assert!(verify_shield(&ledger, &wrong_amount).is_err());

        ledger.apply_proof(&msg.proof).unwrap();
        assert!(matches!(verify_shield(&ledger, &msg), Err(TxError::Duplicate { .. })));
    }
}

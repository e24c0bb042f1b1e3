pub mod balance;
pub mod build;
pub mod config;
pub mod errors;
pub mod fee;
pub mod ledger;
pub mod message;
pub mod metadata;
pub mod ring;
pub mod selection;
pub mod verify;

pub use balance::{balance_by_key_set, get_coins_by_key_set, ledger_balance, unspent_coins, OwnedCoin};
pub use build::{build_mint_tx, build_shield_tx, build_transfer_tx};
pub use config::TxConfig;
pub use errors::{Result, TxError};
pub use fee::{estimate_fee, estimate_tx_size};
pub use ledger::{LedgerReader, MemoryLedger};
pub use message::{msg_hash, MsgShield, PrivacyMessage, TxType};
pub use metadata::Metadata;
pub use selection::{choose_best_coins_to_spend, choose_coins_with_fee};
pub use verify::{check_double_spend, verify_shield, verify_sig, verify_sig_no_privacy, verify_transaction};

#[cfg(test)]
mod tests {
    use super::*;
    use privacy_types::{KeySet, OtaReceiver, PaymentInfo};

    fn admit(ledger: &mut MemoryLedger, msg: &PrivacyMessage, config: &TxConfig) -> Result<()> {
        verify_transaction(ledger, msg, config, message::unix_now() + 60)?;
        ledger.apply_proof(&msg.proof)
    }

    #[test]
    fn test_mint_transfer_double_spend() {
        let config = TxConfig::default();
        let r1 = KeySet::from_seed(b"first receiver");
        let r2 = KeySet::from_seed(b"second receiver");
        let mut ledger = MemoryLedger::new();

        let receiver = OtaReceiver::from_address(r1.payment_address()).unwrap();
        let mint = build_mint_tx(&receiver, 100_000, Vec::new(), None).unwrap();
        admit(&mut ledger, &mint, &config).unwrap();
        assert_eq!(ledger_balance(&ledger, &r1).unwrap(), 100_000);

        let send = |amount| {
            let payment = PaymentInfo::new(*r2.payment_address(), amount, Vec::new());
            build_transfer_tx(&ledger, &r1, vec![payment], None, &config).unwrap()
        };
        let first = send(100);
        let second = send(200);

        let fee = estimate_fee(config.fee_per_kb, 1, 2, None);
        assert_eq!(first.fee, fee);

        admit(&mut ledger, &first, &config).unwrap();
        assert_eq!(ledger_balance(&ledger, &r2).unwrap(), 100);
        assert_eq!(ledger_balance(&ledger, &r1).unwrap(), 100_000 - 100 - fee);
        assert_eq!(ledger.serial_number_count(), 1);

        let err = admit(&mut ledger, &second, &config).unwrap_err();
        assert!(matches!(err, TxError::Duplicate { kind: "serial number", .. }));
        assert_eq!(ledger_balance(&ledger, &r2).unwrap(), 100);
    }

    #[test]
    fn test_change_is_spendable() {
        let config = TxConfig::default();
        let r1 = KeySet::from_seed(b"first receiver");
        let r2 = KeySet::from_seed(b"second receiver");
        let mut ledger = MemoryLedger::new();

        let receiver = OtaReceiver::from_address(r1.payment_address()).unwrap();
        admit(&mut ledger, &build_mint_tx(&receiver, 10_000, Vec::new(), None).unwrap(), &config).unwrap();

        for amount in [1_000, 2_000] {
            let payment = PaymentInfo::new(*r2.payment_address(), amount, Vec::new());
            let msg = build_transfer_tx(&ledger, &r1, vec![payment], None, &config).unwrap();
            admit(&mut ledger, &msg, &config).unwrap();
        }
        assert_eq!(ledger_balance(&ledger, &r2).unwrap(), 3_000);

        // r2 now holds two coins and must spend both.
        let payment = PaymentInfo::new(*r1.payment_address(), 2_500, Vec::new());
        let msg = build_transfer_tx(&ledger, &r2, vec![payment], None, &config).unwrap();
        assert_eq!(msg.payment_proof().unwrap().input_coins().len(), 2);
        admit(&mut ledger, &msg, &config).unwrap();
        assert_eq!(ledger_balance(&ledger, &r2).unwrap(), 3_000 - 2_500 - msg.fee);
    }
}

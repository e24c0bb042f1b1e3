use privacy_crypto::add_u64;
use privacy_types::{Coin, KeySet};
use tracing::warn;

use crate::errors::{Result, TxError};
use crate::ledger::{coin_serial_number_index, LedgerReader, OutputCoinRecord};

/// A decrypted coin owned by the scanning key set, with its ledger location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedCoin {
    pub index: String,
    pub position: u64,
    pub coin: Coin,
}

impl OwnedCoin {
    pub fn value(&self) -> u64 {
        self.coin.value()
    }
}

/// Decodes `records`, keeps the coins addressed to `key_set` and decrypts
/// them. Records that fail to decode and owned coins that fail to decrypt
/// are skipped.
pub fn get_coins_by_key_set(records: &[OutputCoinRecord], key_set: &KeySet) -> Result<Vec<OwnedCoin>> {
    let mut owned = Vec::new();
    for record in records {
        let coin = match Coin::from_bytes(&record.value) {
            Ok(coin) => coin,
            Err(e) => {
                warn!(index = %record.index, error = %e, "skipping undecodable ledger record");
                continue;
            }
        };
        if !coin.belongs_to(key_set) {
            continue;
        }
        match coin.decrypt(key_set) {
            Ok(coin) => owned.push(OwnedCoin {
                index: record.index.clone(),
                position: record.position,
                coin,
            }),
            Err(e) => warn!(index = %record.index, error = %e, "skipping undecryptable coin"),
        }
    }
    Ok(owned)
}

/// Sum of owned coin values whose serial number `is_spent` does not report.
pub fn balance_by_key_set<F>(records: &[OutputCoinRecord], key_set: &KeySet, is_spent: F) -> Result<u64>
where
    F: Fn(&str) -> bool,
{
    let mut balance = 0u64;
    for owned in get_coins_by_key_set(records, key_set)? {
        let index = coin_serial_number_index(&owned.coin)?;
        if !is_spent(&index) {
            balance = add_u64(balance, owned.value())?;
        }
    }
    Ok(balance)
}

/// Owned coins in `ledger` whose serial numbers are not yet recorded.
pub fn unspent_coins<L: LedgerReader>(ledger: &L, key_set: &KeySet) -> Result<Vec<OwnedCoin>> {
    if key_set.private_key().is_none() {
        return Err(TxError::sanity("key set without a private key cannot tell spent coins"));
    }
    let mut unspent = Vec::new();
    for owned in get_coins_by_key_set(&ledger.output_coins(), key_set)? {
        let index = coin_serial_number_index(&owned.coin)?;
        if ledger.get_serial_number(&index).is_none() {
            unspent.push(owned);
        }
    }
    Ok(unspent)
}

pub fn ledger_balance<L: LedgerReader>(ledger: &L, key_set: &KeySet) -> Result<u64> {
    balance_by_key_set(&ledger.output_coins(), key_set, |index| {
        ledger.get_serial_number(index).is_some()
    })
}

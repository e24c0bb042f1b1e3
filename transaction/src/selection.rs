use privacy_crypto::{add_u64, sub_u64};
use privacy_types::payment_proof::MAX_COIN_COUNT;
use tracing::debug;

use crate::balance::OwnedCoin;
use crate::config::TxConfig;
use crate::errors::{Result, TxError};
use crate::fee::estimate_fee_with_ring_size;

#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub selected: Vec<OwnedCoin>,
    pub remaining: Vec<OwnedCoin>,
    pub total: u64,
}

fn check_input_count(selection: &Selection) -> Result<()> {
    if selection.selected.len() > MAX_COIN_COUNT {
        return Err(TxError::sanity(format!(
            "{} input coins selected, at most {} allowed",
            selection.selected.len(),
            MAX_COIN_COUNT
        )));
    }
    Ok(())
}

fn sum_values(coins: &[OwnedCoin]) -> Result<u64> {
    coins
        .iter()
        .try_fold(0u64, |acc, c| Ok(add_u64(acc, c.value())?))
}

/// Takes the smallest coins below `amount` until they cover it. The smallest
/// single coin of at least `amount` is used only when those fall short.
pub fn choose_best_coins_to_spend(coins: Vec<OwnedCoin>, amount: u64) -> Result<Selection> {
    let mut remaining = Vec::new();
    let mut over_limit: Option<OwnedCoin> = None;
    let mut under_limit = Vec::new();

    for coin in coins {
        if coin.value() < amount {
            under_limit.push(coin);
            continue;
        }
        match over_limit.take() {
            None => over_limit = Some(coin),
            Some(current) if current.value() > coin.value() => {
                remaining.push(current);
                over_limit = Some(coin);
            }
            Some(current) => {
                remaining.push(coin);
                over_limit = Some(current);
            }
        }
    }

    under_limit.sort_by_key(OwnedCoin::value);
    let mut selected = Vec::new();
    let mut total = 0u64;
    for coin in under_limit {
        if total < amount {
            total = add_u64(total, coin.value())?;
            selected.push(coin);
        } else {
            remaining.push(coin);
        }
    }

    if let Some(single) = over_limit {
        if total < amount {
            remaining.append(&mut selected);
            total = single.value();
            selected.push(single);
        } else {
            remaining.push(single);
        }
    }

    if total < amount {
        return Err(TxError::InsufficientFunds {
            required: amount,
            available: total,
        });
    }
    Ok(Selection {
        selected,
        remaining,
        total,
    })
}

/// Selects coins for `amount` plus the estimated fee, re-estimating the fee
/// for the input count each time more coins are pulled in.
pub fn choose_coins_with_fee(
    coins: Vec<OwnedCoin>,
    amount: u64,
    num_payments: usize,
    metadata: Option<&[u8]>,
    config: &TxConfig,
) -> Result<(Selection, u64)> {
    let available = sum_values(&coins)?;
    let mut selection = choose_best_coins_to_spend(coins, amount).map_err(|e| match e {
        TxError::InsufficientFunds { required, .. } => TxError::InsufficientFunds {
            required,
            available,
        },
        other => other,
    })?;

    // The change output is counted whether or not it ends up being needed.
    let num_outputs = num_payments + 1;
    for round in 0..=config.fee_refinement_rounds {
        check_input_count(&selection)?;
        let fee = estimate_fee_with_ring_size(
            config.fee_per_kb,
            selection.selected.len(),
            num_outputs,
            metadata,
            config.ring_size,
        );
        let required = add_u64(amount, fee)?;
        if selection.total >= required {
            debug!(
                inputs = selection.selected.len(),
                total = selection.total,
                fee,
                round,
                "coins selected"
            );
            return Ok((selection, fee));
        }
        if round == config.fee_refinement_rounds || selection.remaining.is_empty() {
            return Err(TxError::InsufficientFunds {
                required,
                available,
            });
        }

        let shortfall = sub_u64(required, selection.total)?;
        let extra = choose_best_coins_to_spend(std::mem::take(&mut selection.remaining), shortfall)
            .map_err(|_| TxError::InsufficientFunds {
                required,
                available,
            })?;
        selection.total = add_u64(selection.total, extra.total)?;
        selection.selected.extend(extra.selected);
        selection.remaining = extra.remaining;
    }

    Err(TxError::InsufficientFunds {
        required: amount,
        available,
    })
}

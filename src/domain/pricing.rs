//! Price decay computation for intents.
//!
//! The variable side of an intent interpolates linearly between a
//! bps-derived amount at `start_time` and `end_amount` at `end_time`. Buy
//! intents bound the maximum the maker pays (increasing over the window),
//! sell intents bound the minimum the maker receives (decaying over the
//! window).

use crate::domain::{eth::U256, intent::Intent};

pub const BPS_UNIT: u128 = 10_000;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("amount arithmetic overflows 128 bits")]
    Overflow,
}

/// The window anchors derived from an intent's bps fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchors {
    /// The variable-side limit at `start_time`.
    pub start_amount: u128,
    /// The "fair" amount used for surplus accounting.
    pub expected_amount: u128,
}

/// `amount * bps / 10000`, computed without intermediate overflow.
fn bps_part(amount: u128, bps: u16) -> Result<u128, Error> {
    let wide = U256::from(amount) * U256::from(bps) / U256::from(BPS_UNIT);
    wide.try_into().map_err(|_| Error::Overflow)
}

pub fn anchors(intent: &Intent) -> Result<Anchors, Error> {
    let start_part = bps_part(intent.end_amount, intent.start_amount_bps)?;
    let expected_part = bps_part(intent.end_amount, intent.expected_amount_bps)?;
    Ok(if intent.is_buy {
        Anchors {
            start_amount: intent.end_amount.checked_sub(start_part).ok_or(Error::Overflow)?,
            expected_amount: intent
                .end_amount
                .checked_sub(expected_part)
                .ok_or(Error::Overflow)?,
        }
    } else {
        Anchors {
            start_amount: intent.end_amount.checked_add(start_part).ok_or(Error::Overflow)?,
            expected_amount: intent
                .end_amount
                .checked_add(expected_part)
                .ok_or(Error::Overflow)?,
        }
    })
}

/// The raw interpolated variable-side limit at the specified timestamp.
/// Timestamps outside the window clamp to the respective anchor.
pub fn limit_at(intent: &Intent, timestamp: u64) -> Result<u128, Error> {
    let Anchors { start_amount, .. } = anchors(intent)?;
    let (start, end) = (u64::from(intent.start_time), u64::from(intent.end_time));
    if timestamp <= start || end <= start {
        return Ok(start_amount);
    }
    if timestamp >= end {
        return Ok(intent.end_amount);
    }

    let elapsed = U256::from(timestamp - start);
    let duration = U256::from(end - start);
    let (low, high) = if intent.is_buy {
        (start_amount, intent.end_amount)
    } else {
        (intent.end_amount, start_amount)
    };
    let range = U256::from(high - low) * elapsed / duration;
    let range: u128 = range.try_into().map_err(|_| Error::Overflow)?;

    Ok(if intent.is_buy {
        // The maximum the maker pays loosens toward `end_amount`.
        start_amount + range
    } else {
        // The minimum the maker receives decays toward `end_amount`.
        start_amount - range
    })
}

/// The fill bound at the specified timestamp with the intent's fee deducted
/// and the surplus share applied: the maximum amount the solver may take
/// (buy) or the minimum it must provide (sell).
pub fn fill_bound(intent: &Intent, timestamp: u64) -> Result<u128, Error> {
    let bound = limit_at(intent, timestamp)?;
    let Anchors { expected_amount, .. } = anchors(intent)?;

    // Fees come out of the maker-favorable side.
    let fee = bps_part(bound, intent.fee_bps)?;
    let bound = if intent.is_buy {
        bound.checked_sub(fee).ok_or(Error::Overflow)?
    } else {
        bound.checked_add(fee).ok_or(Error::Overflow)?
    };

    // When the current bound already beats the expected amount, the maker is
    // additionally owed a share of that surplus.
    Ok(if intent.is_buy && bound < expected_amount {
        bound
            .checked_sub(bps_part(expected_amount - bound, intent.surplus_bps)?)
            .ok_or(Error::Overflow)?
    } else if !intent.is_buy && bound > expected_amount {
        bound
            .checked_add(bps_part(bound - expected_amount, intent.surplus_bps)?)
            .ok_or(Error::Overflow)?
    } else {
        bound
    })
}

#[cfg(test)]
mod tests {
    use {super::*, crate::domain::eth};

    fn intent(is_buy: bool) -> Intent {
        Intent {
            is_buy,
            buy_token: eth::Address::repeat_byte(1),
            sell_token: eth::Address::repeat_byte(2),
            maker: eth::Address::repeat_byte(3),
            solver: eth::Address::ZERO,
            source: eth::Address::ZERO,
            fee_bps: 0,
            surplus_bps: 0,
            start_time: 1000,
            end_time: 2000,
            nonce: eth::U256::from(1),
            is_partially_fillable: false,
            is_smart_order: false,
            is_incentivized: false,
            amount: 10_u128.pow(18),
            end_amount: 120,
            start_amount_bps: 0,
            expected_amount_bps: 0,
            signature: Default::default(),
            nft: None,
        }
    }

    #[test]
    fn buy_limit_at_window_midpoint() {
        // With a 120 end amount, 1666 bps puts the start amount at 100.
        let intent = Intent {
            start_amount_bps: 1667,
            ..intent(true)
        };
        assert_eq!(anchors(&intent).unwrap().start_amount, 100);
        assert_eq!(limit_at(&intent, 1500).unwrap(), 110);
    }

    #[test]
    fn limits_clamp_outside_the_window() {
        let intent = Intent {
            start_amount_bps: 1667,
            ..intent(true)
        };
        assert_eq!(limit_at(&intent, 0).unwrap(), 100);
        assert_eq!(limit_at(&intent, 5000).unwrap(), 120);
    }

    #[test]
    fn limits_are_monotonic_and_bounded() {
        for is_buy in [true, false] {
            let intent = Intent {
                end_amount: 3_000_000,
                start_amount_bps: 2500,
                ..intent(is_buy)
            };
            let anchors = anchors(&intent).unwrap();
            let (min, max) = (
                anchors.start_amount.min(intent.end_amount),
                anchors.start_amount.max(intent.end_amount),
            );
            let mut previous = limit_at(&intent, 1000).unwrap();
            for timestamp in 1000..=2000 {
                let limit = limit_at(&intent, timestamp).unwrap();
                assert!((min..=max).contains(&limit));
                if is_buy {
                    assert!(limit >= previous);
                } else {
                    assert!(limit <= previous);
                }
                previous = limit;
            }
            assert_eq!(previous, intent.end_amount);
        }
    }

    #[test]
    fn buy_fee_is_deducted_from_the_bound() {
        let plain = Intent {
            end_amount: 1_000_000,
            ..intent(true)
        };
        let with_fee = Intent {
            fee_bps: 250,
            ..plain.clone()
        };
        let bound = fill_bound(&plain, 1500).unwrap();
        assert_eq!(fill_bound(&with_fee, 1500).unwrap(), bound * 9750 / 10_000);
    }

    #[test]
    fn surplus_narrows_a_favorable_buy_bound() {
        let intent = Intent {
            end_amount: 1_000_000,
            start_amount_bps: 2000,
            expected_amount_bps: 1000,
            surplus_bps: 5000,
            ..intent(true)
        };
        // At the window start the bound (800_000) beats the expected amount
        // (900_000), so half of the 100_000 surplus narrows it further.
        assert_eq!(fill_bound(&intent, 1000).unwrap(), 750_000);
    }

    #[test]
    fn sell_bound_mirrors_the_buy_rules() {
        let intent = Intent {
            end_amount: 1_000_000,
            start_amount_bps: 2000,
            expected_amount_bps: 1000,
            surplus_bps: 5000,
            ..intent(false)
        };
        // Start bound 1_200_000 exceeds the expected 1_100_000; the maker is
        // owed half of the difference on top.
        assert_eq!(fill_bound(&intent, 1000).unwrap(), 1_250_000);
    }
}

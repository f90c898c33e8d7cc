//! Profit accounting and fee/tip optimization for fills.

use crate::domain::{eth, pricing};

/// Gas consumed by the settlement contract itself on top of the swap.
pub const MEMSWAP_GAS: u64 = 150_000;

/// Fallback swap gas when the adapter reports no estimate.
pub const DEFAULT_SWAP_GAS: u64 = 200_000;

/// Gas the matchmaker's authorization transaction consumes.
pub const AUTHORIZATION_GAS: u64 = 100_000;

/// The granularity of priority fee bumps, 0.01 gwei.
pub const MIN_TIP_INCREMENT: u128 = 10_000_000;

/// The baseline priority fee attached to fill transactions, 1 gwei.
pub const DEFAULT_PRIORITY_FEE: u128 = 1_000_000_000;

/// The priority fee floor incentivized intents require, 1 gwei.
pub const MIN_INCENTIVIZED_PRIORITY_FEE: u128 = 1_000_000_000;

/// The tip range for incentivized intents, in wei.
pub const MIN_INCENTIVIZATION_TIP: u128 = 50_000_000_000_000;
pub const MAX_INCENTIVIZATION_TIP: u128 = 1_000_000_000_000_000;

/// Safety margin on the matchmaker's gas reimbursement, in bps.
pub const MATCHMAKER_GAS_SAFETY_BPS: u128 = 300;

/// The profit split applied by the tip auction, in percent:
/// block builder / maker / solver.
pub const TIP_PROFIT_SPLIT: (u64, u64, u64) = (40, 50, 10);

/// A conservative estimate of the base fee at inclusion time: the pending
/// base fee plus a 30% safety margin.
pub fn estimated_base_fee(pending: eth::GasPrice) -> eth::GasPrice {
    eth::GasPrice(pending.0 * eth::U256::from(13) / eth::U256::from(10))
}

/// The gas a fill transaction is expected to consume.
pub fn swap_gas(adapter_estimate: eth::Gas) -> eth::Gas {
    let swap = if adapter_estimate.0.is_zero() {
        eth::Gas::new(DEFAULT_SWAP_GAS)
    } else {
        adapter_estimate
    };
    eth::Gas::new(MEMSWAP_GAS) + swap
}

/// The matchmaker's gas reimbursement in native wei, including the safety
/// margin.
pub fn matchmaker_reimbursement(gas_price: eth::GasPrice) -> eth::Ether {
    let fee = gas_price.fee(eth::Gas::new(AUTHORIZATION_GAS));
    eth::Ether(fee.0 * eth::U256::from(10_000 + MATCHMAKER_GAS_SAFETY_BPS) / eth::U256::from(10_000_u64))
}

/// The protocol-enforced tip an incentivized fill must attach as transaction
/// value. The tip scales linearly with how much of the expected surplus
/// window the fill leaves to the maker.
pub fn incentivization_tip(
    is_buy: bool,
    expected_amount: u128,
    expected_amount_bps: u16,
    execute_amount: u128,
) -> eth::Ether {
    let surplus = if is_buy {
        expected_amount.saturating_sub(execute_amount)
    } else {
        execute_amount.saturating_sub(expected_amount)
    };
    let window = eth::U256::from(expected_amount) * eth::U256::from(expected_amount_bps)
        / eth::U256::from(pricing::BPS_UNIT);
    if window.is_zero() {
        return eth::Ether(eth::U256::from(MIN_INCENTIVIZATION_TIP));
    }
    let surplus = eth::U256::from(surplus).min(window);
    let range = eth::U256::from(MAX_INCENTIVIZATION_TIP - MIN_INCENTIVIZATION_TIP);
    eth::Ether(eth::U256::from(MIN_INCENTIVIZATION_TIP) + range * surplus / window)
}

/// The outcome of splitting net profit between the block builder, the maker,
/// and the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TipAuction {
    /// Additional priority fee bidding for inclusion.
    pub priority_fee_bump: eth::GasPrice,
    /// The maker's share in native wei, returned by widening the execute
    /// amount in their favor.
    pub maker_share: eth::Ether,
    /// What remains with the solver after the bump and the maker share.
    pub solver_keep: eth::Ether,
}

/// Splits positive net profit 40/50/10: 40% converts into priority fee
/// increments of 0.01 gwei, 50% flows back to the maker, the rest stays with
/// the solver.
pub fn tip_auction(net_profit: eth::Ether, gas: eth::Gas) -> TipAuction {
    let builder_share = net_profit.0 * eth::U256::from(TIP_PROFIT_SPLIT.0) / eth::U256::from(100_u64);
    let unit = eth::U256::from(MIN_TIP_INCREMENT) * gas.0;
    let bump = if unit.is_zero() {
        eth::GasPrice::default()
    } else {
        eth::GasPrice(eth::U256::from(MIN_TIP_INCREMENT) * (builder_share / unit))
    };
    let maker_share =
        eth::Ether(net_profit.0 * eth::U256::from(TIP_PROFIT_SPLIT.1) / eth::U256::from(100_u64));
    let spent = bump.fee(gas).0 + maker_share.0;
    TipAuction {
        priority_fee_bump: bump,
        maker_share,
        solver_keep: eth::Ether(net_profit.0.saturating_sub(spent)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ether(wei: u128) -> eth::Ether {
        eth::Ether(eth::U256::from(wei))
    }

    #[test]
    fn auction_splits_profit_forty_fifty_ten() {
        // 1 gwei of margin over a 200k gas fill.
        let net = ether(200_000_000_000_000);
        let auction = tip_auction(net, eth::Gas::new(200_000));

        // 40% buys 40 increments of 0.01 gwei.
        assert_eq!(
            auction.priority_fee_bump,
            eth::GasPrice(eth::U256::from(400_000_000_u64))
        );
        assert_eq!(auction.maker_share, ether(100_000_000_000_000));
        assert_eq!(auction.solver_keep, ether(20_000_000_000_000));
    }

    #[test]
    fn auction_keep_never_exceeds_the_profit() {
        for (net, gas) in [
            (1_u128, 200_000_u64),
            (999, 1),
            (10_u128.pow(15), 350_000),
            (3_333_333_333, 121_212),
        ] {
            let net = ether(net);
            let auction = tip_auction(net, eth::Gas::new(gas));
            assert!(auction.solver_keep.0 <= net.0);
            let spent = auction.priority_fee_bump.fee(eth::Gas::new(gas)).0
                + auction.maker_share.0
                + auction.solver_keep.0;
            assert_eq!(spent, net.0);
        }
    }

    #[test]
    fn incentivization_tip_scales_with_surplus() {
        // No surplus left: the minimum tip.
        assert_eq!(
            incentivization_tip(true, 1_000_000, 1000, 1_000_000),
            ether(MIN_INCENTIVIZATION_TIP)
        );
        // The full expected window captured: the maximum tip.
        assert_eq!(
            incentivization_tip(true, 1_000_000, 1000, 900_000),
            ether(MAX_INCENTIVIZATION_TIP)
        );
        // Halfway through the window.
        assert_eq!(
            incentivization_tip(true, 1_000_000, 1000, 950_000),
            ether((MIN_INCENTIVIZATION_TIP + MAX_INCENTIVIZATION_TIP) / 2)
        );
        // Sells mirror the direction.
        assert_eq!(
            incentivization_tip(false, 1_000_000, 1000, 1_100_000),
            ether(MAX_INCENTIVIZATION_TIP)
        );
    }

    #[test]
    fn matchmaker_reimbursement_includes_the_safety_margin() {
        let price = eth::GasPrice(eth::U256::from(10_000_000_000_u64));
        assert_eq!(
            matchmaker_reimbursement(price),
            ether(1_030_000_000_000_000)
        );
    }
}

//! Tests for the swap aggregator adapter.

use {
    crate::{
        domain::{eth, intent::Intent},
        infra::{codec, contracts::Contracts, quote::aggregator},
        tests::mock,
    },
    alloy::sol_types::SolCall,
    serde_json::json,
};

fn intent(is_buy: bool) -> Intent {
    Intent {
        is_buy,
        // DAI
        buy_token: "0x6B175474E89094C44Da98b954EedeAC495271d0F".parse().unwrap(),
        // USDC
        sell_token: "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48".parse().unwrap(),
        maker: eth::Address::repeat_byte(3),
        solver: eth::Address::ZERO,
        source: eth::Address::ZERO,
        fee_bps: 0,
        surplus_bps: 0,
        start_time: 0,
        end_time: u32::MAX,
        nonce: eth::U256::from(1),
        is_partially_fillable: false,
        is_smart_order: false,
        is_incentivized: false,
        amount: 1_000_000_000,
        end_amount: 1_100_000_000,
        start_amount_bps: 0,
        expected_amount_bps: 0,
        signature: Default::default(),
        nft: None,
    }
}

fn config(api: &std::net::SocketAddr) -> aggregator::Config {
    let contracts = Contracts::for_chain(eth::ChainId::Mainnet);
    aggregator::Config {
        endpoint: format!("http://{api}/swap").parse().unwrap(),
        api_key: "SUPER_SECRET_API_KEY".to_owned(),
        chain_id: eth::ChainId::Mainnet,
        settlement: contracts.settlement_erc20,
        wrapped_native: contracts.wrapped_native,
        block_watcher: None,
    }
}

#[tokio::test]
async fn sell_plan_approves_and_swaps() {
    let api = mock::http::setup(vec![mock::http::Expectation::Get {
        path: "swap/quote?chainId=1\
               &sellToken=0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48\
               &buyToken=0x6b175474e89094c44da98b954eedeac495271d0f\
               &amount=1000000000&side=sell\
               &taker=0x7d84e3b74c8a4c1062507ed34cbc6ef8fc962b5f"
            .to_owned(),
        res: json!({
            "sellAmount": "1000000000",
            "buyAmount": "999000000000000000000",
            "to": "0xdef1c0ded9bec7f1a1670819833240f027b25eff",
            "data": "0xd9627aa4",
            "allowanceTarget": "0xdef1c0ded9bec7f1a1670819833240f027b25eff",
            "estimatedGas": "111000",
            "sellTokenPrice": "500000000000",
            "buyTokenPrice": "500000000000000",
            "sellTokenDecimals": 6,
            "buyTokenDecimals": 18,
        }),
    }])
    .await;

    let adapter = aggregator::Aggregator::new(config(&api.address)).unwrap();
    let intent = intent(false);
    let plan = adapter.plan(&intent, 1_000_000_000).await.unwrap();

    assert_eq!(plan.fill_amount, 1_000_000_000);
    assert_eq!(plan.execute_amount, 999_000_000_000_000_000_000);
    assert_eq!(plan.execute_token_decimals, 18);
    assert_eq!(plan.gas, eth::Gas::new(111_000));
    assert!(plan.pre_txs.is_empty());

    // First an exact allowance for the router, then the swap itself.
    assert_eq!(plan.calls.len(), 2);
    assert_eq!(plan.calls[0].to, intent.sell_token);
    let approve = codec::sol::tokens::approveCall::abi_decode(&plan.calls[0].data).unwrap();
    assert_eq!(approve.amount, eth::U256::from(1_000_000_000_u64));
    assert_eq!(
        plan.calls[1].to,
        "0xDef1C0ded9bec7F1a1670819833240f027b25EfF"
            .parse::<crate::domain::eth::Address>()
            .unwrap()
    );
    assert_eq!(plan.calls[1].value, eth::U256::ZERO);
}

#[tokio::test]
async fn buy_plans_bump_the_sell_side_for_slippage() {
    let api = mock::http::setup(vec![mock::http::Expectation::Get {
        path: "swap/quote?chainId=1\
               &sellToken=0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48\
               &buyToken=0x6b175474e89094c44da98b954eedeac495271d0f\
               &amount=1000000000&side=buy\
               &taker=0x7d84e3b74c8a4c1062507ed34cbc6ef8fc962b5f"
            .to_owned(),
        res: json!({
            "sellAmount": "1000000000",
            "buyAmount": "1000000000",
            "to": "0xdef1c0ded9bec7f1a1670819833240f027b25eff",
            "data": "0xd9627aa4",
            "allowanceTarget": "0xdef1c0ded9bec7f1a1670819833240f027b25eff",
            "estimatedGas": "111000",
            "sellTokenPrice": "500000000000",
            "buyTokenPrice": "500000000000000",
            "sellTokenDecimals": 6,
            "buyTokenDecimals": 18,
        }),
    }])
    .await;

    let adapter = aggregator::Aggregator::new(config(&api.address)).unwrap();
    let plan = adapter.plan(&intent(true), 1_000_000_000).await.unwrap();

    // The committed maximum is 1% above the quoted sell amount, and the
    // allowance covers the bump.
    assert_eq!(plan.execute_amount, 1_010_000_000);
    let approve = codec::sol::tokens::approveCall::abi_decode(&plan.calls[0].data).unwrap();
    assert_eq!(approve.amount, eth::U256::from(1_010_000_000_u64));
    assert_eq!(plan.execute_token_decimals, 6);
}

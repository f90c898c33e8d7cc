//! Tests for the NFT routing API adapter.

use {
    crate::{
        domain::{eth, intent::{Intent, NftExtension}},
        infra::{codec, contracts::Contracts, quote::marketplace},
        tests::mock,
    },
    alloy::{signers::local::PrivateKeySigner, sol_types::SolCall},
    serde_json::json,
};

fn intent() -> Intent {
    Intent {
        is_buy: true,
        // The collection being bought.
        buy_token: eth::Address::repeat_byte(0xaa),
        // Paid in USDC, which forces the multi-transaction shape.
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
        amount: 2,
        end_amount: 2_000_000_000,
        start_amount_bps: 0,
        expected_amount_bps: 0,
        signature: Default::default(),
        nft: Some(NftExtension {
            is_criteria_order: true,
            token_id_or_criteria: eth::U256::ZERO,
        }),
    }
}

#[tokio::test]
async fn restricted_routes_become_multi_transaction_plans() {
    let purchase = |taker: &str, restricted: bool| mock::http::Expectation::Post {
        path: "nft/purchase".to_owned(),
        req: mock::http::RequestBody::Any,
        res: json!({
            "totalPrice": "1500000000",
            "restricted": restricted,
            "requiresApproval": true,
            "tokenIds": ["11", "12"],
            "steps": [
                {
                    "kind": "signature",
                    "challenge": {"id": "ch-1", "message": format!("login as {taker}")},
                },
                {
                    "kind": "transaction",
                    "to": "0x00000000000000adc04c56bf30ac9d3c0aaf14dc",
                    "data": "0x9a1fc3a7",
                    "value": "0",
                },
            ],
            "estimatedGas": "400000",
            "currencyPrice": "500000000000",
            "currencyDecimals": 6,
        }),
    };

    let api = mock::http::setup(vec![
        // The relayed attempt comes back restricted, so the purchase is
        // re-planned from the solver wallet and the challenge answered.
        purchase("settlement", true),
        purchase("solver", true),
        mock::http::Expectation::Post {
            path: "nft/auth".to_owned(),
            req: mock::http::RequestBody::Any,
            res: json!({"success": true}),
        },
    ])
    .await;

    let contracts = Contracts::for_chain(eth::ChainId::Mainnet);
    let solver = PrivateKeySigner::random();
    let adapter = marketplace::Marketplace::new(marketplace::Config {
        endpoint: format!("http://{}/nft", api.address).parse().unwrap(),
        api_key: "SUPER_SECRET_API_KEY".to_owned(),
        api_secret_key: "SUPER_SECRET_SECRET".to_owned(),
        chain_id: eth::ChainId::Mainnet,
        settlement: contracts.settlement_erc721,
        wrapped_native: contracts.wrapped_native,
        solver: solver.clone(),
        block_watcher: None,
    })
    .unwrap();

    let intent = intent();
    let plan = adapter.plan(&intent, 2).await.unwrap();

    assert_eq!(plan.execute_amount, 1_500_000_000);
    assert_eq!(plan.execute_token_decimals, 6);

    // The purchase and the collection approval run from the solver wallet
    // ahead of the settlement call.
    assert_eq!(plan.pre_txs.len(), 2);
    assert_eq!(
        plan.pre_txs[0].to,
        "0x00000000000000adc04c56bf30ac9d3c0aaf14dc"
            .parse::<crate::domain::eth::Address>()
            .unwrap()
    );
    let approval =
        codec::sol::tokens::setApprovalForAllCall::abi_decode(&plan.pre_txs[1].data).unwrap();
    assert_eq!(approval.operator, contracts.settlement_erc721);
    assert!(approval.approved);

    // The callback forwards each purchased token to the maker.
    assert_eq!(plan.calls.len(), 2);
    for (call, token_id) in plan.calls.iter().zip([11_u64, 12]) {
        assert_eq!(call.to, intent.buy_token);
        let transfer = codec::sol::tokens::transferFromCall::abi_decode(&call.data).unwrap();
        assert_eq!(transfer.from, solver.address());
        assert_eq!(transfer.to, intent.maker);
        assert_eq!(transfer.tokenId, eth::U256::from(token_id));
    }
}

//! Tests driving the HTTP surface of a running service against a mock node.

use {
    crate::tests::{mock, Service},
    serde_json::json,
};

fn intent_body(end_time: u32) -> serde_json::Value {
    json!({
        "intent": {
            "isBuy": false,
            "buyToken": "0x6b175474e89094c44da98b954eedeac495271d0f",
            "sellToken": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
            "maker": "0x5b1e2c2762667331bc91648052f646d1b0d35984",
            "solver": "0x0000000000000000000000000000000000000000",
            "source": "0x0000000000000000000000000000000000000000",
            "feeBps": 0,
            "surplusBps": 0,
            "startTime": 0,
            "endTime": end_time,
            "nonce": "1",
            "isPartiallyFillable": false,
            "isSmartOrder": false,
            "isIncentivized": false,
            "amount": "1000000000",
            "endAmount": "1100000000",
            "startAmountBps": 0,
            "expectedAmountBps": 0,
            "signature": "0x0101",
        }
    })
}

#[tokio::test]
async fn liveness_and_queue_inspection() {
    let node = mock::node::setup().await;
    let service = Service::new(Service::config(&node.address)).await;

    let response = service.get("lives").await.unwrap();
    assert_eq!(response.status, 200);

    let response = service.get("admin/queues").await.unwrap();
    assert_eq!(response.status, 200);
    let names: Vec<_> = response.body["queues"]
        .as_array()
        .unwrap()
        .iter()
        .map(|queue| queue["name"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(names, ["solve-erc20", "solve-erc721", "inventory"]);
}

#[tokio::test]
async fn expired_intents_are_dropped_without_consuming_attempts() {
    let node = mock::node::setup().await;
    // The status read reports unvalidated, uncancelled, nothing filled.
    node.respond(
        "eth_call",
        serde_json::Value::String(format!("0x{}", "00".repeat(96))),
    );

    let service = Service::new(Service::config(&node.address)).await;
    let response = service
        .post("erc20/intents", intent_body(1_600_000_000))
        .await
        .unwrap();
    assert_eq!(response.status, 200);

    // The job completes on its first attempt; an expired intent is a
    // business outcome, not a failure.
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        let response = service.get("admin/queues").await.unwrap();
        let queue = &response.body["queues"][0];
        assert_eq!(queue["name"], "solve-erc20");
        if queue["completed"] == 1 {
            assert_eq!(queue["failed"], 0);
            assert_eq!(queue["retried"], 0);
            break;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "solve job did not finish: {:?}",
            response.body
        );
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn duplicate_intent_submissions_deduplicate() {
    let node = mock::node::setup().await;
    node.respond(
        "eth_call",
        serde_json::Value::String(format!("0x{}", "00".repeat(96))),
    );

    let service = Service::new(Service::config(&node.address)).await;
    let body = intent_body(u32::MAX);
    service.post("erc20/intents", body.clone()).await.unwrap();
    service.post("erc20/intents", body).await.unwrap();

    let response = service.get("admin/queues").await.unwrap();
    let queue = &response.body["queues"][0];
    assert_eq!(queue["submitted"], 1);
    assert_eq!(queue["deduplicated"], 1);
}

#[tokio::test]
async fn authorization_callbacks_are_validated() {
    let node = mock::node::setup().await;
    let service = Service::new(Service::config(&node.address)).await;

    let authorization = json!({
        "intentHash": format!("0x{}", "11".repeat(32)),
        "solver": "0x5b1e2c2762667331bc91648052f646d1b0d35984",
        "fillAmountToCheck": "1000000000",
        "executeAmountToCheck": "1100000000",
        "blockDeadline": 18_000_001,
        "signature": "0x0202",
    });

    // Neither uuid nor intent.
    let response = service
        .post("erc20/authorizations", json!({ "authorization": authorization }))
        .await
        .unwrap();
    assert_eq!(response.status, 400);

    // Both uuid and intent.
    let intent = intent_body(u32::MAX)["intent"].clone();
    let both = json!({
        "uuid": "00000000-0000-0000-0000-000000000000",
        "intent": intent,
        "authorization": authorization,
    });
    let response = service.post("erc20/authorizations", both).await.unwrap();
    assert_eq!(response.status, 400);

    // A uuid cannot come with an approval carrier.
    let with_approval = json!({
        "uuid": "00000000-0000-0000-0000-000000000000",
        "approvalTxOrTxHash": format!("0x{}", "22".repeat(32)),
        "authorization": authorization,
    });
    let response = service
        .post("erc20/authorizations", with_approval)
        .await
        .unwrap();
    assert_eq!(response.status, 400);

    // An unknown uuid means the cached solution is gone.
    let unknown = json!({
        "uuid": "00000000-0000-0000-0000-000000000000",
        "authorization": authorization,
    });
    let response = service.post("erc20/authorizations", unknown).await.unwrap();
    assert_eq!(response.status, 404);
}

//! A canned JSON-RPC node answering by method name.

use {
    serde_json::json,
    std::{
        collections::HashMap,
        net::SocketAddr,
        sync::{Arc, Mutex},
    },
    tokio::task::JoinHandle,
};

pub struct NodeHandle {
    pub address: SocketAddr,
    responses: Arc<Mutex<HashMap<String, serde_json::Value>>>,
    handle: JoinHandle<()>,
}

impl NodeHandle {
    /// Replaces the canned result for the specified method.
    pub fn respond(&self, method: &str, result: serde_json::Value) {
        self.responses
            .lock()
            .unwrap()
            .insert(method.to_string(), result);
    }
}

impl Drop for NodeHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Starts a node that answers `eth_getBlockByNumber` with a fixed block and
/// any further configured methods with their canned results.
pub async fn setup() -> NodeHandle {
    let responses: Arc<Mutex<HashMap<String, serde_json::Value>>> =
        Arc::new(Mutex::new(HashMap::from([(
            "eth_getBlockByNumber".to_string(),
            block(18_000_000, 1_700_000_000),
        )])));

    let app = axum::Router::new().route(
        "/",
        axum::routing::post(
            |axum::extract::State(state): axum::extract::State<
                Arc<Mutex<HashMap<String, serde_json::Value>>>,
            >,
             axum::extract::Json(req): axum::extract::Json<serde_json::Value>| async move {
                let method = req["method"].as_str().unwrap_or_default().to_string();
                let id = req["id"].clone();
                let result = state.lock().unwrap().get(&method).cloned();
                axum::response::Json(match result {
                    Some(result) => json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "result": result,
                    }),
                    None => json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "error": {
                            "code": -32601,
                            "message": format!("method {method} not mocked"),
                        },
                    }),
                })
            },
        ),
    )
    .with_state(responses.clone());

    let server = axum::Server::bind(&"0.0.0.0:0".parse().unwrap()).serve(app.into_make_service());
    let address = server.local_addr();
    let handle = tokio::spawn(async move { server.await.unwrap() });

    NodeHandle {
        address,
        responses,
        handle,
    }
}

/// A minimal but well-formed block at the specified height and timestamp.
pub fn block(number: u64, timestamp: u64) -> serde_json::Value {
    json!({
        "hash": "0x5fe48e3e9d1e20ebb6cb4e4530ed18fcfa99db8ca53fccef1a2f0cf6bb578dc2",
        "parentHash": "0x0000000000000000000000000000000000000000000000000000000000000000",
        "sha3Uncles": "0x1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347",
        "miner": "0x0000000000000000000000000000000000000000",
        "stateRoot": "0x0000000000000000000000000000000000000000000000000000000000000000",
        "transactionsRoot": "0x0000000000000000000000000000000000000000000000000000000000000000",
        "receiptsRoot": "0x0000000000000000000000000000000000000000000000000000000000000000",
        "logsBloom": format!("0x{}", "00".repeat(256)),
        "difficulty": "0x0",
        "number": format!("{number:#x}"),
        "gasLimit": "0x1c9c380",
        "gasUsed": "0xf4240",
        "timestamp": format!("{timestamp:#x}"),
        "extraData": "0x",
        "mixHash": "0x0000000000000000000000000000000000000000000000000000000000000000",
        "nonce": "0x0000000000000000",
        "baseFeePerGas": "0x3b9aca00",
        "totalDifficulty": "0x0",
        "size": "0x220",
        "transactions": [],
        "uncles": [],
    })
}

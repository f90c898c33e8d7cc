//! Private bundle relay speaking the flashbots JSON-RPC dialect with signed
//! request payloads.

use {
    super::{Bundle, Error},
    crate::{domain::eth::PESSIMISTIC_BLOCK_TIME, infra::blockchain::Rpc},
    alloy::{
        primitives::keccak256,
        rpc::types::TransactionReceipt,
        signers::{local::PrivateKeySigner, SignerSync},
    },
    serde::Deserialize,
    serde_json::json,
    std::time::Duration,
};

pub struct Flashbots {
    client: reqwest::Client,
    url: reqwest::Url,
    /// The relay identity key. Only used for authenticating payloads, never
    /// holds funds.
    signer: PrivateKeySigner,
    rpc: Rpc,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct CallBundleResult {
    #[serde(default)]
    results: Vec<CallBundleTx>,
}

#[derive(Debug, Deserialize)]
struct CallBundleTx {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    revert: Option<String>,
}

impl Flashbots {
    pub fn new(url: reqwest::Url, signer: PrivateKeySigner, rpc: Rpc) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            signer,
            rpc,
        }
    }

    /// Simulates the bundle at the target block. Nonce complaints about the
    /// leading user transactions surface as [`Error::StaleNonce`].
    pub async fn simulate(&self, bundle: &Bundle, target_block: u64) -> Result<(), Error> {
        let result = self
            .request(
                "eth_callBundle",
                json!({
                    "txs": bundle.raw_txs(),
                    "blockNumber": format!("{target_block:#x}"),
                    "stateBlockNumber": "latest",
                }),
            )
            .await?;
        let result: CallBundleResult =
            serde_json::from_value(result).map_err(|err| Error::Transport(err.into()))?;

        for (index, tx) in result.results.iter().enumerate() {
            let failure = tx.error.as_deref().or(tx.revert.as_deref());
            if let Some(reason) = failure {
                if is_nonce_error(reason) && index < bundle.user_txs.len() {
                    return Err(Error::StaleNonce);
                }
                return Err(Error::Simulation(reason.to_string()));
            }
        }
        Ok(())
    }

    pub async fn submit(&self, bundle: &Bundle, target_block: u64) -> Result<(), Error> {
        self.request(
            "eth_sendBundle",
            json!({
                "txs": bundle.raw_txs(),
                "blockNumber": format!("{target_block:#x}"),
            }),
        )
        .await?;
        Ok(())
    }

    /// Waits until the target block has passed and resolves inclusion by the
    /// settlement transaction's receipt.
    pub async fn wait(
        &self,
        bundle: &Bundle,
        target_block: u64,
    ) -> Result<TransactionReceipt, Error> {
        let settlement = bundle.settlement_tx().ok_or(Error::NotIncluded)?;

        let deadline = tokio::time::Instant::now()
            + wait_budget(self.rpc.latest_block().await?.number, target_block);
        loop {
            let head = self.rpc.latest_block().await?;
            if head.number >= target_block {
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(Error::NotIncluded);
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        match self.rpc.receipt(settlement.hash).await? {
            Some(receipt) if receipt.status() => Ok(receipt),
            _ => Err(Error::NotIncluded),
        }
    }

    async fn request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, Error> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": [params],
        })
        .to_string();

        // The relay authenticates payloads with an EIP-191 signature over the
        // hex digest of the body.
        let digest = format!("0x{}", hex::encode(keccak256(body.as_bytes())));
        let signature = self
            .signer
            .sign_message_sync(digest.as_bytes())
            .map_err(|err| Error::Transport(err.into()))?;
        let header = format!(
            "{}:0x{}",
            self.signer.address(),
            hex::encode(signature.as_bytes())
        );

        let response = self
            .client
            .post(self.url.clone())
            .header("X-Flashbots-Signature", header)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|err| Error::Transport(err.into()))?;
        let response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|err| Error::Transport(err.into()))?;

        if let Some(err) = response.error {
            if is_nonce_error(&err.message) {
                return Err(Error::StaleNonce);
            }
            return Err(Error::Simulation(err.message));
        }
        Ok(response.result.unwrap_or_default())
    }
}

fn is_nonce_error(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("nonce too low") || message.contains("nonce too high")
}

/// How long to keep polling for the target block before declaring a miss.
fn wait_budget(current_block: u64, target_block: u64) -> Duration {
    let blocks = target_block.saturating_sub(current_block) + 1;
    PESSIMISTIC_BLOCK_TIME * u32::try_from(blocks).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_complaints_are_recognized() {
        for message in [
            "err: nonce too low: address 0x5b1e, tx: 5 state: 6",
            "account nonce too high",
            "Nonce too LOW",
        ] {
            assert!(is_nonce_error(message));
        }
        assert!(!is_nonce_error("execution reverted: TRANSFER_FROM_FAILED"));
    }

    #[test]
    fn wait_budget_covers_the_remaining_blocks() {
        assert_eq!(wait_budget(99, 100), PESSIMISTIC_BLOCK_TIME * 2);
        // A stale view of the chain never makes the budget go negative.
        assert_eq!(wait_budget(100, 100), PESSIMISTIC_BLOCK_TIME);
        assert_eq!(wait_budget(105, 100), PESSIMISTIC_BLOCK_TIME);
    }
}

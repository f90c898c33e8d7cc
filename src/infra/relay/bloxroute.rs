//! Private bundle relay submitting through bloxroute with a fan-out to all
//! major builders.

use {
    super::{flashbots::Flashbots, Bundle, Error},
    crate::domain::eth::PESSIMISTIC_BLOCK_TIME,
    alloy::rpc::types::TransactionReceipt,
    serde::Deserialize,
    serde_json::json,
    std::time::Duration,
};

/// How long to back off when hitting the per-second bundle submission cap.
const RATE_LIMIT_BACKOFF: Duration = Duration::from_millis(1100);

pub struct Bloxroute {
    client: reqwest::Client,
    url: reqwest::Url,
    auth_token: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    message: String,
}

impl Bloxroute {
    pub fn new(url: reqwest::Url, auth_token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            auth_token,
        }
    }

    /// Submits the bundle, retrying in-line through the submission rate cap.
    pub async fn submit(&self, bundle: &Bundle, target_block: u64) -> Result<(), Error> {
        loop {
            match self.submit_once(bundle, target_block).await {
                Err(Error::RateLimited) => {
                    tracing::debug!("bundle submission rate limited; backing off");
                    tokio::time::sleep(RATE_LIMIT_BACKOFF).await;
                }
                result => return result,
            }
        }
    }

    async fn submit_once(&self, bundle: &Bundle, target_block: u64) -> Result<(), Error> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "blxr_submit_bundle",
            "params": {
                "transaction": bundle
                    .txs()
                    .map(|tx| hex::encode(&tx.raw))
                    .collect::<Vec<_>>(),
                "block_number": format!("{target_block:#x}"),
                "mev_builders": {"all": ""},
            },
        });
        let response = self
            .client
            .post(self.url.clone())
            .header(reqwest::header::AUTHORIZATION, &self.auth_token)
            .json(&body)
            .send()
            .await
            .map_err(|err| Error::Transport(err.into()))?;
        let response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|err| Error::Transport(err.into()))?;

        match response.error {
            Some(err) if err.message.contains("bundle submissions per second") => {
                Err(Error::RateLimited)
            }
            Some(err) => Err(Error::Simulation(err.message)),
            None => Ok(()),
        }
    }

    /// Races the inclusion wait against the pessimistic block time; bloxroute
    /// offers no resolution signal of its own.
    pub async fn wait(
        &self,
        simulator: &Flashbots,
        bundle: &Bundle,
        target_block: u64,
    ) -> Result<TransactionReceipt, Error> {
        tokio::select! {
            result = simulator.wait(bundle, target_block) => result,
            _ = tokio::time::sleep(PESSIMISTIC_BLOCK_TIME) => Err(Error::NotIncluded),
        }
    }
}

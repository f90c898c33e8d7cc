//! Service end-to-end tests.
//!
//! Note that this is setup as a "unit test" in that it is part of the `src/`
//! directory. This is done intentionally as Cargo builds separate binaries
//! for each file in `tests/`, which makes `cargo test` slower.

use {
    anyhow::Context,
    reqwest::Url,
    std::{io::Write, net::SocketAddr},
    tokio::{sync::oneshot, task::JoinHandle},
};

mod aggregator;
mod ingress;
mod marketplace;
mod mock;

/// A running solver service handle for E2E testing.
pub struct Service {
    url: Url,
    #[allow(dead_code)] // only needed for Drop handling
    tempfile: tempfile::TempPath,
    handle: JoinHandle<()>,
}

impl Service {
    /// Boots the service with the specified TOML configuration.
    pub async fn new(config: String) -> Self {
        let (bind, bind_receiver) = oneshot::channel();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.as_bytes()).unwrap();
        let path = file.into_temp_path();

        let args = vec![
            "/test/memswap-solver/path".to_owned(),
            "--addr=0.0.0.0:0".to_owned(),
            "--log=solver=trace".to_owned(),
            format!("--config={}", path.display()),
        ];
        let handle = tokio::spawn(crate::run(args, Some(bind)));

        let addr = bind_receiver.await.unwrap();
        let url = format!("http://{addr}/").parse().unwrap();

        Self {
            url,
            tempfile: path,
            handle,
        }
    }

    /// A baseline configuration wired up against the specified mock node.
    pub fn config(node: &SocketAddr) -> String {
        format!(
            r"
node-url = 'http://{node}'
node-ws-url = 'ws://{node}'
chain-id = '1'
solver-key = '0x0101010101010101010101010101010101010101010101010101010101010101'
relay-identity-key = '0x0202020202020202020202020202020202020202020202020202020202020202'
matchmaker-url = 'http://localhost:1'
[aggregator]
endpoint = 'http://localhost:1/swap'
api-key = 'SUPER_SECRET_API_KEY'
[marketplace]
endpoint = 'http://localhost:1/nft'
api-key = 'SUPER_SECRET_API_KEY'
api-secret-key = 'SUPER_SECRET_SECRET'
            "
        )
    }

    pub async fn post(&self, path: &str, body: serde_json::Value) -> anyhow::Result<Response> {
        let url = self.url.join(path)?;
        let response = reqwest::Client::new().post(url).json(&body).send().await?;
        let status = response.status().as_u16();
        let body = response.json().await.context("non-JSON response body")?;
        Ok(Response { status, body })
    }

    pub async fn get(&self, path: &str) -> anyhow::Result<Response> {
        let url = self.url.join(path)?;
        let response = reqwest::Client::new().get(url).send().await?;
        let status = response.status().as_u16();
        let body = response
            .json()
            .await
            .unwrap_or(serde_json::Value::String(Default::default()));
        Ok(Response { status, body })
    }
}

#[derive(Debug)]
pub struct Response {
    pub status: u16,
    pub body: serde_json::Value,
}

impl Drop for Service {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

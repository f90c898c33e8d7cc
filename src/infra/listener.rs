//! Pending-transaction listener: decodes intents piggybacked on approval
//! calldata and enqueues solve jobs.

use {
    crate::{
        domain::{eth, intent::Protocol, solver},
        infra::{blockchain::Rpc, codec, contracts::Contracts, metrics},
    },
    alloy::{consensus::Transaction as _, providers::Provider},
    futures::StreamExt,
    std::sync::Arc,
};

/// How many pending transactions are decoded concurrently.
const CONCURRENCY: usize = 500;

pub struct Listener {
    chain: eth::ChainId,
    contracts: Contracts,
    rpc: Rpc,
    queues: solver::Queues,
}

impl Listener {
    pub fn new(
        chain: eth::ChainId,
        contracts: Contracts,
        rpc: Rpc,
        queues: solver::Queues,
    ) -> Arc<Self> {
        Arc::new(Self {
            chain,
            contracts,
            rpc,
            queues,
        })
    }

    /// Consumes the node's pending-transaction notification stream until the
    /// subscription ends. This stream is untrusted: nothing in it may
    /// propagate an error.
    pub async fn run(self: Arc<Self>, ws: Rpc) -> Result<(), crate::infra::blockchain::Error> {
        let subscription = ws.provider().subscribe_pending_transactions().await?;
        tracing::info!("listening for pending transactions");
        subscription
            .into_stream()
            .for_each_concurrent(CONCURRENCY, |hash| {
                let listener = self.clone();
                async move {
                    listener.process(hash).await;
                }
            })
            .await;
        Ok(())
    }

    async fn process(&self, hash: eth::B256) {
        let Ok(Some(tx)) = self.rpc.transaction(hash).await else {
            return;
        };
        let Some(decoded) = codec::match_entry(tx.to(), tx.input(), &self.contracts) else {
            return;
        };

        let origin = match decoded.origin {
            codec::Origin::Approval => "approval",
            codec::Origin::DepositAndApprove => "deposit_and_approve",
            codec::Origin::Direct => "direct",
        };
        metrics::intent_seen(origin);

        let intent = decoded.intent;
        let intent_hash = codec::intent_hash(&intent, self.chain, &self.contracts);
        tracing::debug!(intent = %intent_hash, origin, "decoded pending intent");

        let queue = match intent.protocol() {
            Protocol::Erc20 => &self.queues.erc20,
            Protocol::Erc721 => &self.queues.erc721,
        };
        let approval = match decoded.origin {
            codec::Origin::Direct => None,
            _ => Some(crate::infra::store::Approval::Hash(hash)),
        };
        let now = chrono::Utc::now().timestamp().max(0) as u32;
        let ttl = intent
            .remaining_validity(now)
            .max(std::time::Duration::from_secs(1));
        queue.submit(
            solver::job_id(&intent_hash, None),
            ttl,
            solver::SolveJob {
                intent,
                approval,
                plan: None,
                authorization: None,
            },
        );
    }
}

/// Convenience for wiring: spawns the listener and reconnect loop.
pub fn spawn(listener: Arc<Listener>, ws_url: reqwest::Url) {
    tokio::spawn(async move {
        loop {
            match Rpc::ws(&ws_url).await {
                Ok(ws) => {
                    if let Err(err) = listener.clone().run(ws).await {
                        tracing::warn!(?err, "pending transaction stream ended");
                    }
                }
                Err(err) => tracing::warn!(?err, "websocket connection failed"),
            }
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        }
    });
}

//! The matchmaker-side authorization submitter: posts the on-chain
//! authorization transaction right in front of the chosen solver's bundle
//! for a target block.

use {
    crate::{
        domain::{auth, eth::{self, BLOCK_TIME}, solver::economics},
        infra::{
            blockchain::{self, Rpc, SignedTx},
            codec,
            contracts::Contracts,
            queue,
            relay,
            store::{MatchSolution, Store},
        },
    },
    alloy::{
        network::TransactionBuilder,
        primitives::keccak256,
        rpc::types::TransactionRequest,
        signers::local::PrivateKeySigner,
    },
    futures::FutureExt,
    std::sync::Arc,
};

#[derive(Clone, Debug)]
pub struct AuthJob {
    pub solution_key: String,
    pub target_block: u64,
}

#[derive(Clone)]
pub struct Authorizer {
    inner: Arc<Inner>,
    queue: queue::Queue<AuthJob>,
}

struct Inner {
    chain: eth::ChainId,
    contracts: Contracts,
    rpc: Rpc,
    signer: PrivateKeySigner,
    private: Arc<relay::PrivateRelay>,
    store: Store,
}

impl Authorizer {
    pub fn new(
        chain: eth::ChainId,
        contracts: Contracts,
        rpc: Rpc,
        signer: PrivateKeySigner,
        private: Arc<relay::PrivateRelay>,
        store: Store,
    ) -> Self {
        let inner = Arc::new(Inner {
            chain,
            contracts,
            rpc,
            signer,
            private,
            store,
        });
        let queue = queue::Queue::new(
            "authorizations",
            queue::Options {
                concurrency: 500,
                attempts: 5,
                retry_delay: std::time::Duration::from_secs(1),
            },
            {
                let inner = inner.clone();
                Arc::new(move |job: queue::Job<AuthJob>| {
                    let inner = inner.clone();
                    async move { inner.dispatch(job.payload).await }.boxed()
                })
            },
        );
        Self { inner, queue }
    }

    /// Registers a competing solution and queues the submission for its
    /// target block. Jobs are keyed by solution set and block, so several
    /// solutions for the same set collapse into one submission.
    pub fn register(&self, solution_key: &str, target_block: u64, solution: MatchSolution) {
        self.inner.store.add_match_solution(solution_key, solution);
        self.queue.submit(
            format!("{solution_key}:{target_block}"),
            BLOCK_TIME * 5,
            AuthJob {
                solution_key: solution_key.to_string(),
                target_block,
            },
        );
    }

    pub fn snapshot(&self) -> queue::Snapshot {
        self.queue.snapshot()
    }
}

impl Inner {
    async fn dispatch(&self, job: AuthJob) -> anyhow::Result<()> {
        let head = self.rpc.latest_block().await?;
        anyhow::ensure!(
            head.number < job.target_block,
            "target block {} already passed",
            job.target_block
        );

        // One submission per solution set at a time.
        let Some(_lock) = self
            .store
            .try_lock(format!("{}:locked", job.solution_key))
        else {
            tracing::debug!(key = %job.solution_key, "solution set already being submitted");
            return Ok(());
        };

        let Some(solution) = self.store.top_match_solution(&job.solution_key) else {
            tracing::debug!(key = %job.solution_key, "no solution to authorize");
            return Ok(());
        };

        let protocol = solution.intent.protocol();
        let authorization = auth::Authorization {
            intent_hash: codec::intent_hash(&solution.intent, self.chain, &self.contracts),
            solver: solution.solver,
            fill_amount_to_check: solution.fill_amount,
            execute_amount_to_check: solution.execute_amount,
            block_deadline: u32::try_from(job.target_block)
                .map_err(|_| anyhow::anyhow!("target block out of range"))?,
        };
        let calldata = codec::encode_authorize(
            protocol,
            std::slice::from_ref(&solution.intent),
            std::slice::from_ref(&authorization),
            solution.solver,
        )?;

        let base_fee = self.rpc.pending_base_fee().await?;
        let priority: u128 = 1_000_000_000;
        let max_fee: u128 = (economics::estimated_base_fee(base_fee).0 + eth::U256::from(priority))
            .try_into()
            .map_err(|_| anyhow::anyhow!("base fee out of range"))?;
        let nonce = self.rpc.pending_nonce(self.signer.address()).await?;
        let request = TransactionRequest::default()
            .with_from(self.signer.address())
            .with_to(self.contracts.settlement(protocol))
            .with_input(calldata)
            .with_nonce(nonce)
            .with_chain_id(self.chain.value())
            .with_gas_limit(economics::AUTHORIZATION_GAS * 5 / 4)
            .with_max_fee_per_gas(max_fee)
            .with_max_priority_fee_per_gas(priority);
        let auth_tx = blockchain::sign_transaction(&self.signer, request).await?;

        // The authorization leads the solver's transactions in the bundle.
        let mut solver_txs = vec![auth_tx];
        solver_txs.extend(solution.txs.iter().map(|raw| SignedTx {
            hash: keccak256(raw),
            raw: raw.clone(),
        }));
        let bundle = relay::Bundle {
            user_txs: vec![],
            solver_txs,
        };
        self.private.relay(bundle, job.target_block).await?;

        tracing::info!(
            key = %job.solution_key,
            block = job.target_block,
            solver = %solution.solver,
            "authorization submitted"
        );
        self.store.clear_match_solutions(&job.solution_key);
        Ok(())
    }
}

//! Periodic liquidation of accumulated non-base-token inventory back into
//! the base native token.

use {
    crate::{
        domain::eth::{self, BLOCK_TIME},
        infra::{
            blockchain::{self, Rpc},
            codec,
            contracts::Contracts,
            queue,
            quote::aggregator::Aggregator,
        },
        util::conv,
    },
    alloy::{
        network::TransactionBuilder,
        rpc::types::TransactionRequest,
        signers::local::PrivateKeySigner,
        sol_types::SolCall,
    },
    futures::FutureExt,
    std::{
        collections::HashSet,
        sync::{Arc, Mutex},
        time::Duration,
    },
};

/// Inventory below this value in base units is left alone, 0.01 native.
const MIN_VALUE: u128 = 10_000_000_000_000_000;

/// Liquidations only run while the base fee stays at or below 25 gwei.
const MAX_BASE_FEE: u128 = 25_000_000_000;

/// How often each tracked token is revisited.
const INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Clone)]
pub struct Inventory {
    inner: Arc<Inner>,
    queue: queue::Queue<eth::Address>,
}

struct Inner {
    chain: eth::ChainId,
    contracts: Contracts,
    rpc: Rpc,
    signer: PrivateKeySigner,
    aggregator: Arc<Aggregator>,
    tokens: Mutex<HashSet<eth::Address>>,
}

impl Inventory {
    pub fn new(
        chain: eth::ChainId,
        contracts: Contracts,
        rpc: Rpc,
        signer: PrivateKeySigner,
        aggregator: Arc<Aggregator>,
    ) -> Self {
        let inner = Arc::new(Inner {
            chain,
            contracts,
            rpc,
            signer,
            aggregator,
            tokens: Default::default(),
        });
        let queue = queue::Queue::new(
            "inventory",
            queue::Options {
                concurrency: 2000,
                attempts: 5,
                retry_delay: BLOCK_TIME,
            },
            {
                let inner = inner.clone();
                Arc::new(move |job: queue::Job<eth::Address>| {
                    let inner = inner.clone();
                    async move { inner.liquidate(job.payload).await }.boxed()
                })
            },
        );
        Self { inner, queue }
    }

    /// Registers a token the solver has started accumulating.
    pub async fn track(&self, token: eth::Address) {
        if token == eth::NATIVE_TOKEN {
            return;
        }
        if self.inner.tokens.lock().unwrap().insert(token) {
            tracing::debug!(%token, "tracking inventory token");
        }
    }

    pub fn snapshot(&self) -> queue::Snapshot {
        self.queue.snapshot()
    }

    /// Spawns the hourly scheduler enqueueing a liquidation job per tracked
    /// token.
    pub fn spawn_scheduler(&self) {
        let inventory = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let tokens: Vec<_> = inventory
                    .inner
                    .tokens
                    .lock()
                    .unwrap()
                    .iter()
                    .copied()
                    .collect();
                for token in tokens {
                    inventory
                        .queue
                        .submit(format!("inventory:{token}"), INTERVAL, token);
                }
            }
        });
    }
}

impl Inner {
    async fn liquidate(&self, token: eth::Address) -> anyhow::Result<()> {
        let block = self.rpc.latest_block().await?;
        if block.base_fee.0 > eth::U256::from(MAX_BASE_FEE) {
            tracing::debug!(%token, "base fee too high for liquidation");
            return Ok(());
        }

        let owner = self.signer.address();
        let balance = self.rpc.erc20_balance_of(token, owner).await?;
        if balance.is_zero() {
            return Ok(());
        }

        // The protocol's wrapped native unwraps one-to-one.
        if token == self.contracts.wrapped_native || token == self.contracts.weth9 {
            if balance < eth::U256::from(MIN_VALUE) {
                return Ok(());
            }
            let data = codec::sol::tokens::withdrawCall { amount: balance }.abi_encode();
            self.send(token, data, eth::U256::ZERO, 60_000, block.base_fee)
                .await?;
            tracing::info!(%token, %balance, "unwrapped inventory");
            return Ok(());
        }

        let swap = self.aggregator.direct_swap(token, balance, owner).await?;
        let value = conv::token_to_native(&balance, &swap.sell_token_price, swap.sell_token_decimals)
            .unwrap_or_default();
        if value < eth::U256::from(MIN_VALUE) {
            tracing::debug!(%token, %value, "inventory not worth liquidating");
            return Ok(());
        }

        // The aggregator pulls through an allowance; grant an unbounded one
        // once.
        let spender = swap.allowance_target.unwrap_or(swap.to);
        let allowance = self.rpc.erc20_allowance(token, owner, spender).await?;
        if allowance < balance {
            let data = codec::sol::tokens::approveCall {
                spender,
                amount: eth::U256::MAX,
            }
            .abi_encode();
            self.send(token, data, eth::U256::ZERO, 60_000, block.base_fee)
                .await?;
        }

        let gas: u64 = (swap.estimated_gas * eth::U256::from(5) / eth::U256::from(4))
            .try_into()
            .unwrap_or(300_000);
        self.send(swap.to, swap.data, swap.value, gas, block.base_fee)
            .await?;
        tracing::info!(%token, %balance, %value, "liquidated inventory");
        Ok(())
    }

    async fn send(
        &self,
        to: eth::Address,
        data: Vec<u8>,
        value: eth::U256,
        gas: u64,
        base_fee: eth::GasPrice,
    ) -> anyhow::Result<()> {
        let priority: u128 = 1_000_000_000;
        let max_fee: u128 = (base_fee.0 * eth::U256::from(13) / eth::U256::from(10))
            .try_into()
            .map_err(|_| anyhow::anyhow!("base fee out of range"))?;
        let nonce = self.rpc.pending_nonce(self.signer.address()).await?;
        let request = TransactionRequest::default()
            .with_from(self.signer.address())
            .with_to(to)
            .with_input(data)
            .with_value(value)
            .with_nonce(nonce)
            .with_chain_id(self.chain.value())
            .with_gas_limit(gas)
            .with_max_fee_per_gas(max_fee + priority)
            .with_max_priority_fee_per_gas(priority);
        let signed = blockchain::sign_transaction(&self.signer, request).await?;
        self.rpc.send_raw(&signed.raw).await?;
        let receipt = self
            .rpc
            .wait_for_receipt(signed.hash, BLOCK_TIME * 5)
            .await?;
        anyhow::ensure!(
            receipt.is_some_and(|receipt| receipt.status()),
            "liquidation transaction did not confirm"
        );
        Ok(())
    }
}

//! Thin wrapper around the node JSON-RPC/WS providers. The provider instances
//! are long-lived singletons created on boot and shared by reference through
//! the component graph.

use {
    crate::{domain::eth, infra::codec},
    alloy::{
        eips::{eip2718::Encodable2718, BlockId, BlockNumberOrTag},
        network::{EthereumWallet, TransactionBuilder, TransactionResponse},
        providers::{DynProvider, Provider, ProviderBuilder, WsConnect},
        rpc::types::{Transaction, TransactionReceipt, TransactionRequest},
        signers::local::PrivateKeySigner,
        sol_types::SolCall,
        transports::{RpcError, TransportError},
    },
    std::time::Duration,
    tokio::sync::watch,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("node has no {0} block")]
    MissingBlock(&'static str),
    #[error("execution reverted: {0}")]
    Revert(String),
    #[error("transaction building failed: {0}")]
    Sign(String),
    #[error("unexpected response shape")]
    Decode,
}

/// The subset of a block header the solver works with.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlockInfo {
    pub number: u64,
    pub timestamp: u64,
    pub base_fee: eth::GasPrice,
    pub hash: eth::B256,
}

/// A signed, ready-to-broadcast transaction.
#[derive(Clone, Debug)]
pub struct SignedTx {
    pub raw: eth::Bytes,
    pub hash: eth::B256,
}

#[derive(Clone)]
pub struct Rpc {
    provider: DynProvider,
}

impl Rpc {
    /// Connects over HTTP.
    pub fn new(url: &reqwest::Url) -> Self {
        Self {
            provider: ProviderBuilder::new().connect_http(url.clone()).erased(),
        }
    }

    /// Connects over WebSocket, for subscriptions.
    pub async fn ws(url: &reqwest::Url) -> Result<Self, Error> {
        let provider = ProviderBuilder::new()
            .connect_ws(WsConnect::new(url.as_str()))
            .await?
            .erased();
        Ok(Self { provider })
    }

    pub fn provider(&self) -> &DynProvider {
        &self.provider
    }

    pub async fn latest_block(&self) -> Result<BlockInfo, Error> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await?
            .ok_or(Error::MissingBlock("latest"))?;
        Ok(BlockInfo {
            number: block.header.number,
            timestamp: block.header.timestamp,
            base_fee: eth::GasPrice(eth::U256::from(
                block.header.base_fee_per_gas.unwrap_or_default(),
            )),
            hash: block.header.hash,
        })
    }

    /// The base fee of the block currently being built.
    pub async fn pending_base_fee(&self) -> Result<eth::GasPrice, Error> {
        let pending = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Pending)
            .await;
        match pending {
            Ok(Some(block)) => Ok(eth::GasPrice(eth::U256::from(
                block.header.base_fee_per_gas.unwrap_or_default(),
            ))),
            // Not all nodes serve the pending tag.
            _ => Ok(self.latest_block().await?.base_fee),
        }
    }

    pub async fn transaction(&self, hash: eth::B256) -> Result<Option<Transaction>, Error> {
        Ok(self.provider.get_transaction_by_hash(hash).await?)
    }

    /// Fetches a pending transaction and re-serializes it into raw bytes for
    /// bundle inclusion. Also reports whether it is already mined.
    pub async fn raw_transaction(
        &self,
        hash: eth::B256,
    ) -> Result<Option<(SignedTx, bool)>, Error> {
        let Some(tx) = self.transaction(hash).await? else {
            return Ok(None);
        };
        let mined = tx.block_number.is_some();
        Ok(Some((
            SignedTx {
                raw: tx.inner.encoded_2718().into(),
                hash: tx.tx_hash(),
            },
            mined,
        )))
    }

    pub async fn receipt(&self, hash: eth::B256) -> Result<Option<TransactionReceipt>, Error> {
        Ok(self.provider.get_transaction_receipt(hash).await?)
    }

    pub async fn pending_nonce(&self, address: eth::Address) -> Result<u64, Error> {
        Ok(self
            .provider
            .get_transaction_count(address)
            .block_id(BlockId::pending())
            .await?)
    }

    pub async fn nonce(&self, address: eth::Address) -> Result<u64, Error> {
        Ok(self.provider.get_transaction_count(address).await?)
    }

    pub async fn balance(&self, address: eth::Address) -> Result<eth::U256, Error> {
        Ok(self.provider.get_balance(address).await?)
    }

    /// Executes an `eth_call`, mapping node-reported reverts into
    /// [`Error::Revert`].
    pub async fn call(&self, tx: TransactionRequest) -> Result<eth::Bytes, Error> {
        match self.provider.call(tx).await {
            Ok(output) => Ok(output),
            Err(RpcError::ErrorResp(payload)) => Err(Error::Revert(payload.message.to_string())),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn send_raw(&self, raw: &[u8]) -> Result<eth::B256, Error> {
        let pending = self.provider.send_raw_transaction(raw).await?;
        Ok(*pending.tx_hash())
    }

    /// Polls for a receipt until the deadline elapses.
    pub async fn wait_for_receipt(
        &self,
        hash: eth::B256,
        timeout: Duration,
    ) -> Result<Option<TransactionReceipt>, Error> {
        let poll = Duration::from_secs(1);
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(receipt) = self.receipt(hash).await? {
                return Ok(Some(receipt));
            }
            if tokio::time::Instant::now() + poll > deadline {
                return Ok(None);
            }
            tokio::time::sleep(poll).await;
        }
    }

    pub async fn erc20_balance_of(
        &self,
        token: eth::Address,
        owner: eth::Address,
    ) -> Result<eth::U256, Error> {
        let call = codec::sol::tokens::balanceOfCall { owner };
        let output = self
            .call(
                TransactionRequest::default()
                    .with_to(token)
                    .with_input(call.abi_encode()),
            )
            .await?;
        codec::sol::tokens::balanceOfCall::abi_decode_returns(&output).map_err(|_| Error::Decode)
    }

    pub async fn erc20_allowance(
        &self,
        token: eth::Address,
        owner: eth::Address,
        spender: eth::Address,
    ) -> Result<eth::U256, Error> {
        let call = codec::sol::tokens::allowanceCall { owner, spender };
        let output = self
            .call(
                TransactionRequest::default()
                    .with_to(token)
                    .with_input(call.abi_encode()),
            )
            .await?;
        codec::sol::tokens::allowanceCall::abi_decode_returns(&output).map_err(|_| Error::Decode)
    }
}

/// Signs a fully-populated transaction request into raw bytes.
pub async fn sign_transaction(
    signer: &PrivateKeySigner,
    tx: TransactionRequest,
) -> Result<SignedTx, Error> {
    let wallet = EthereumWallet::from(signer.clone());
    let envelope = tx
        .build(&wallet)
        .await
        .map_err(|err| Error::Sign(err.to_string()))?;
    let raw = envelope.encoded_2718();
    Ok(SignedTx {
        hash: alloy::primitives::keccak256(&raw),
        raw: raw.into(),
    })
}

/// Spawns a task that keeps a watch channel updated with the latest block.
pub async fn current_block_watcher(
    rpc: Rpc,
    poll_interval: Duration,
) -> Result<watch::Receiver<BlockInfo>, Error> {
    let initial = rpc.latest_block().await?;
    let (sender, receiver) = watch::channel(initial);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match rpc.latest_block().await {
                Ok(block) => {
                    if block.hash != sender.borrow().hash {
                        tracing::trace!(number = block.number, "new block");
                        let _ = sender.send(block);
                    }
                }
                Err(err) => tracing::warn!(?err, "failed to poll current block"),
            }
            if sender.is_closed() {
                break;
            }
        }
    });
    Ok(receiver)
}

//! Public mempool relaying with a local pre-simulation.

use {
    super::Error,
    crate::{
        domain::eth::PESSIMISTIC_BLOCK_TIME,
        infra::{
            blockchain::{self, Rpc, SignedTx},
            metrics,
        },
    },
    alloy::rpc::types::{TransactionReceipt, TransactionRequest},
};

pub struct Public {
    rpc: Rpc,
}

impl Public {
    pub fn new(rpc: Rpc) -> Self {
        Self { rpc }
    }

    /// Simulates the transaction, broadcasts it, and waits for its receipt.
    ///
    /// For incentivized intents a failing simulation does not abort: the tip
    /// requirement routinely makes local simulations fail spuriously.
    pub async fn relay(
        &self,
        request: TransactionRequest,
        signed: &SignedTx,
        incentivized: bool,
    ) -> Result<TransactionReceipt, Error> {
        let result = self.relay_inner(request, signed, incentivized).await;
        metrics::relay(
            "public",
            match &result {
                Ok(_) => "included",
                Err(Error::Simulation(_)) => "simulation",
                Err(Error::NotIncluded) => "not_included",
                Err(_) => "transport",
            },
        );
        result
    }

    async fn relay_inner(
        &self,
        request: TransactionRequest,
        signed: &SignedTx,
        incentivized: bool,
    ) -> Result<TransactionReceipt, Error> {
        match self.rpc.call(request).await {
            Ok(_) => (),
            Err(blockchain::Error::Revert(reason)) => {
                if incentivized {
                    tracing::info!(%reason, "simulation failed for incentivized intent");
                } else {
                    return Err(Error::Simulation(reason));
                }
            }
            Err(err) => return Err(err.into()),
        }

        self.rpc.send_raw(&signed.raw).await?;
        match self
            .rpc
            .wait_for_receipt(signed.hash, PESSIMISTIC_BLOCK_TIME * 4)
            .await?
        {
            Some(receipt) if receipt.status() => Ok(receipt),
            _ => Err(Error::NotIncluded),
        }
    }
}

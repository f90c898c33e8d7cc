//! Block-targeted transaction relaying.
//!
//! Three strategies share one contract: relay a bundle (or single
//! transaction) so it lands in a specific block, and only report success once
//! the settlement transaction has a confirmed receipt. The private bundle
//! strategies additionally share the nonce-staleness retry: when simulation
//! rejects an embedded user transaction because its nonce is out of date
//! (almost always because the user's approval landed in a prior block), the
//! same relay call transparently repeats without the user transactions.

use {
    crate::infra::{blockchain::SignedTx, metrics},
    alloy::rpc::types::TransactionReceipt,
};

pub mod bloxroute;
pub mod flashbots;
pub mod public;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("bundle simulation failed: {0}")]
    Simulation(String),
    #[error("user transaction nonce is stale")]
    StaleNonce,
    #[error("bundle was not included in the target block")]
    NotIncluded,
    #[error("rate limited")]
    RateLimited,
    #[error(transparent)]
    Transport(anyhow::Error),
}

impl From<crate::infra::blockchain::Error> for Error {
    fn from(err: crate::infra::blockchain::Error) -> Self {
        Self::Transport(err.into())
    }
}

/// An ordered list of signed transactions submitted atomically for inclusion
/// in one block: the user's carrier transactions first, then the solver's
/// own transactions ending with the settlement call.
#[derive(Clone, Debug)]
pub struct Bundle {
    pub user_txs: Vec<SignedTx>,
    pub solver_txs: Vec<SignedTx>,
}

impl Bundle {
    pub fn txs(&self) -> impl Iterator<Item = &SignedTx> {
        self.user_txs.iter().chain(self.solver_txs.iter())
    }

    pub fn raw_txs(&self) -> Vec<String> {
        self.txs()
            .map(|tx| format!("0x{}", hex::encode(&tx.raw)))
            .collect()
    }

    /// The transaction whose receipt decides inclusion.
    pub fn settlement_tx(&self) -> Option<&SignedTx> {
        self.solver_txs.last()
    }

    fn without_user_txs(&self) -> Self {
        Self {
            user_txs: vec![],
            solver_txs: self.solver_txs.clone(),
        }
    }
}

/// The configured private bundle relay.
pub enum PrivateRelay {
    Flashbots(flashbots::Flashbots),
    /// Submits through bloxroute but simulates through flashbots first.
    Bloxroute {
        simulator: flashbots::Flashbots,
        submitter: bloxroute::Bloxroute,
    },
}

impl PrivateRelay {
    fn strategy(&self) -> &'static str {
        match self {
            Self::Flashbots(_) => "flashbots",
            Self::Bloxroute { .. } => "bloxroute",
        }
    }

    /// Simulates, submits, and waits for the bundle to resolve at the target
    /// block.
    pub async fn relay(
        &self,
        bundle: Bundle,
        target_block: u64,
    ) -> Result<TransactionReceipt, Error> {
        let result = self.relay_inner(bundle, target_block).await;
        metrics::relay(
            self.strategy(),
            match &result {
                Ok(_) => "included",
                Err(Error::Simulation(_)) => "simulation",
                Err(Error::StaleNonce) => "stale_nonce",
                Err(Error::NotIncluded) => "not_included",
                Err(Error::RateLimited) => "rate_limited",
                Err(Error::Transport(_)) => "transport",
            },
        );
        result
    }

    async fn relay_inner(
        &self,
        bundle: Bundle,
        target_block: u64,
    ) -> Result<TransactionReceipt, Error> {
        let bundle = match self.simulate(&bundle, target_block).await {
            Ok(()) => bundle,
            Err(Error::StaleNonce) if !bundle.user_txs.is_empty() => {
                tracing::debug!("stale user transaction nonce; retrying without it");
                let bundle = bundle.without_user_txs();
                self.simulate(&bundle, target_block).await?;
                bundle
            }
            Err(err) => return Err(err),
        };
        self.submit_and_wait(bundle, target_block).await
    }

    async fn simulate(&self, bundle: &Bundle, target_block: u64) -> Result<(), Error> {
        match self {
            Self::Flashbots(flashbots) => flashbots.simulate(bundle, target_block).await,
            Self::Bloxroute { simulator, .. } => simulator.simulate(bundle, target_block).await,
        }
    }

    async fn submit_and_wait(
        &self,
        bundle: Bundle,
        target_block: u64,
    ) -> Result<TransactionReceipt, Error> {
        match self {
            Self::Flashbots(flashbots) => {
                flashbots.submit(&bundle, target_block).await?;
                flashbots.wait(&bundle, target_block).await
            }
            Self::Bloxroute {
                simulator,
                submitter,
            } => {
                submitter.submit(&bundle, target_block).await?;
                submitter.wait(simulator, &bundle, target_block).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, alloy::primitives::B256};

    fn tx(byte: u8) -> SignedTx {
        SignedTx {
            raw: vec![byte; 4].into(),
            hash: B256::repeat_byte(byte),
        }
    }

    #[test]
    fn stripping_keeps_the_solver_transactions() {
        let bundle = Bundle {
            user_txs: vec![tx(1)],
            solver_txs: vec![tx(2), tx(3)],
        };
        assert_eq!(bundle.txs().count(), 3);
        assert_eq!(bundle.settlement_tx().unwrap().hash, B256::repeat_byte(3));

        let stripped = bundle.without_user_txs();
        assert!(stripped.user_txs.is_empty());
        assert_eq!(stripped.settlement_tx().unwrap().hash, B256::repeat_byte(3));
        assert_eq!(stripped.raw_txs(), ["0x02020202", "0x03030303"]);
    }
}

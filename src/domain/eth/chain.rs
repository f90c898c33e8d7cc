use std::time::Duration;

/// The average block time used when scheduling work relative to block
/// production.
pub const BLOCK_TIME: Duration = Duration::from_secs(12);

/// A conservative upper bound on when the next block will appear, used when
/// estimating the decay timestamp at inclusion and when waiting for bundle
/// resolution.
pub const PESSIMISTIC_BLOCK_TIME: Duration = Duration::from_secs(13);

/// A supported Ethereum Chain ID.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChainId {
    Mainnet = 1,
    Goerli = 5,
}

impl ChainId {
    pub fn new(value: u64) -> Result<Self, UnsupportedChain> {
        match value {
            1 => Ok(Self::Mainnet),
            5 => Ok(Self::Goerli),
            _ => Err(UnsupportedChain),
        }
    }

    /// Returns the chain ID as a numeric value.
    pub fn value(self) -> u64 {
        self as u64
    }

    /// Whether fills on this chain are required to clear a positive net
    /// profit. Testnets fill regardless to keep the pipeline exercised.
    pub fn enforces_profit_floor(self) -> bool {
        matches!(self, Self::Mainnet)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported chain")]
pub struct UnsupportedChain;

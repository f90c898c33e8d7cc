mod file;

pub use file::load;

use {
    crate::{domain::eth, infra::contracts::Contracts},
    alloy::signers::local::PrivateKeySigner,
    std::time::Duration,
};

/// Fully resolved service configuration.
pub struct Config {
    pub node_url: reqwest::Url,
    pub node_ws_url: reqwest::Url,
    pub chain: eth::ChainId,
    pub contracts: Contracts,

    /// The solver's signing key. Holds funds; never leaves the process.
    pub solver: PrivateKeySigner,
    /// The matchmaker's signing key, present only on deployments that also
    /// run the authorization submitter.
    pub matchmaker_signer: Option<PrivateKeySigner>,
    /// Identity key authenticating payloads towards the private relay.
    pub relay_identity: PrivateKeySigner,

    pub flashbots_url: reqwest::Url,
    pub bloxroute_url: reqwest::Url,
    /// Presence selects the bloxroute submission strategy.
    pub bloxroute_auth_token: Option<String>,

    pub matchmaker_url: reqwest::Url,

    /// Prefer the public mempool whenever a fill doesn't need a bundle.
    pub relay_directly_when_possible: bool,

    pub block_poll_interval: Duration,

    pub aggregator: AggregatorConfig,
    /// Presence selects the smart-order router as the ERC-20 quoter.
    pub sor: Option<SorConfig>,
    pub marketplace: MarketplaceConfig,
}

pub struct AggregatorConfig {
    pub endpoint: reqwest::Url,
    pub api_key: String,
}

pub struct SorConfig {
    pub endpoint: reqwest::Url,
}

pub struct MarketplaceConfig {
    pub endpoint: reqwest::Url,
    pub api_key: String,
    pub api_secret_key: String,
}

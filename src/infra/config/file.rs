//! TOML configuration loading.

use {
    crate::{domain::eth, infra::contracts::Contracts},
    serde::Deserialize,
    serde_with::serde_as,
    std::{fmt::Debug, path::Path, time::Duration},
    tokio::fs,
};

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Config {
    /// The node JSON-RPC URL.
    #[serde_as(as = "serde_with::DisplayFromStr")]
    node_url: reqwest::Url,

    /// The node WebSocket URL for subscriptions.
    #[serde_as(as = "serde_with::DisplayFromStr")]
    node_ws_url: reqwest::Url,

    /// The chain to operate on.
    #[serde_as(as = "serde_with::DisplayFromStr")]
    chain_id: u64,

    /// The solver's signing key.
    solver_key: String,

    /// The matchmaker's signing key. Only set on deployments that also run
    /// the authorization submitter.
    matchmaker_key: Option<String>,

    /// The identity key authenticating payloads towards the private relay.
    relay_identity_key: String,

    #[serde(default = "default_flashbots_url")]
    #[serde_as(as = "serde_with::DisplayFromStr")]
    flashbots_url: reqwest::Url,

    #[serde(default = "default_bloxroute_url")]
    #[serde_as(as = "serde_with::DisplayFromStr")]
    bloxroute_url: reqwest::Url,

    /// Presence selects the bloxroute submission strategy.
    bloxroute_auth_token: Option<String>,

    /// The matchmaker service base URL.
    #[serde_as(as = "serde_with::DisplayFromStr")]
    matchmaker_url: reqwest::Url,

    /// Prefer the public mempool whenever a fill doesn't need a bundle.
    #[serde(default)]
    relay_directly_when_possible: bool,

    /// How often the current block watcher polls the node.
    #[serde(with = "humantime_serde", default = "default_block_poll_interval")]
    block_poll_interval: Duration,

    /// Optional overrides for the per-chain contract addresses.
    #[serde(default)]
    contracts: ContractOverrides,

    aggregator: Aggregator,

    /// Presence selects the smart-order router as the ERC-20 quoter.
    sor: Option<Sor>,

    marketplace: Marketplace,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ContractOverrides {
    settlement_erc20: Option<eth::Address>,
    settlement_erc721: Option<eth::Address>,
    wrapped_native: Option<eth::Address>,
    weth9: Option<eth::Address>,
    permit2: Option<eth::Address>,
    matchmaker: Option<eth::Address>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Aggregator {
    #[serde_as(as = "serde_with::DisplayFromStr")]
    endpoint: reqwest::Url,
    api_key: String,
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Sor {
    #[serde_as(as = "serde_with::DisplayFromStr")]
    endpoint: reqwest::Url,
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Marketplace {
    #[serde_as(as = "serde_with::DisplayFromStr")]
    endpoint: reqwest::Url,
    api_key: String,
    api_secret_key: String,
}

fn default_flashbots_url() -> reqwest::Url {
    "https://relay.flashbots.net".parse().unwrap()
}

fn default_bloxroute_url() -> reqwest::Url {
    "https://mev.api.blxrbdn.com".parse().unwrap()
}

fn default_block_poll_interval() -> Duration {
    Duration::from_secs(2)
}

/// Loads the service configuration from a TOML file.
///
/// # Panics
///
/// This method panics if the config is invalid or on I/O errors.
pub async fn load(path: &Path) -> super::Config {
    let data = fs::read_to_string(path)
        .await
        .unwrap_or_else(|e| panic!("I/O error while reading {path:?}: {e:?}"));

    // Not printing detailed error because it could potentially leak secrets.
    let config = unwrap_or_log(toml::de::from_str::<Config>(&data), &path);

    let chain = eth::ChainId::new(config.chain_id)
        .unwrap_or_else(|_| panic!("unsupported chain id {}", config.chain_id));

    let mut contracts = Contracts::for_chain(chain);
    let overrides = config.contracts;
    if let Some(address) = overrides.settlement_erc20 {
        contracts.settlement_erc20 = address;
    }
    if let Some(address) = overrides.settlement_erc721 {
        contracts.settlement_erc721 = address;
    }
    if let Some(address) = overrides.wrapped_native {
        contracts.wrapped_native = address;
    }
    if let Some(address) = overrides.weth9 {
        contracts.weth9 = address;
    }
    if let Some(address) = overrides.permit2 {
        contracts.permit2 = address;
    }
    if let Some(address) = overrides.matchmaker {
        contracts.matchmaker = address;
    }

    super::Config {
        node_url: config.node_url,
        node_ws_url: config.node_ws_url,
        chain,
        contracts,
        solver: parse_key(&config.solver_key, "solver-key"),
        matchmaker_signer: config
            .matchmaker_key
            .as_deref()
            .map(|key| parse_key(key, "matchmaker-key")),
        relay_identity: parse_key(&config.relay_identity_key, "relay-identity-key"),
        flashbots_url: config.flashbots_url,
        bloxroute_url: config.bloxroute_url,
        bloxroute_auth_token: config.bloxroute_auth_token,
        matchmaker_url: config.matchmaker_url,
        relay_directly_when_possible: config.relay_directly_when_possible,
        block_poll_interval: config.block_poll_interval,
        aggregator: super::AggregatorConfig {
            endpoint: config.aggregator.endpoint,
            api_key: config.aggregator.api_key,
        },
        sor: config.sor.map(|sor| super::SorConfig {
            endpoint: sor.endpoint,
        }),
        marketplace: super::MarketplaceConfig {
            endpoint: config.marketplace.endpoint,
            api_key: config.marketplace.api_key,
            api_secret_key: config.marketplace.api_secret_key,
        },
    }
}

fn parse_key(key: &str, name: &str) -> alloy::signers::local::PrivateKeySigner {
    key.parse()
        .unwrap_or_else(|_| panic!("{name} is not a valid private key"))
}

/// Unwraps result or logs a `TOML` parsing error.
fn unwrap_or_log<T, E, P>(result: Result<T, E>, path: &P) -> T
where
    E: Debug,
    P: Debug,
{
    result.unwrap_or_else(|err| {
        if std::env::var("TOML_TRACE_ERROR").is_ok_and(|v| v == "1") {
            panic!("failed to parse TOML config at {path:?}: {err:#?}")
        } else {
            panic!(
                "failed to parse TOML config at: {path:?}. Set TOML_TRACE_ERROR=1 to print \
                 parsing error but this may leak secrets."
            )
        }
    })
}

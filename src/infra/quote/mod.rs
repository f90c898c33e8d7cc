//! Uniform interface over the external liquidity APIs: the ERC-20 swap
//! aggregator, the smart-order router, and the NFT routing API. Each adapter
//! turns an intent and a fill amount into a [`crate::domain::solution::Plan`].

use {
    crate::domain::{intent::Intent, solution},
    reqwest::RequestBuilder,
    std::sync::Arc,
    tokio::sync::watch,
};

pub mod aggregator;
pub mod marketplace;
pub mod sor;

/// The configured ERC-20 liquidity source.
pub enum Erc20Quoter {
    Aggregator(Arc<aggregator::Aggregator>),
    Sor(sor::Sor),
}

impl Erc20Quoter {
    /// Computes a plan filling the specified amount of the intent's fixed
    /// side.
    pub async fn plan(&self, intent: &Intent, fill_amount: u128) -> Result<solution::Plan, Error> {
        let plan = match self {
            Self::Aggregator(aggregator) => aggregator.plan(intent, fill_amount).await?,
            Self::Sor(sor) => sor.plan(intent, fill_amount).await?,
        };
        super::metrics::quote_request();
        Ok(plan)
    }
}

/// A categorized error that occurred building a plan with an external
/// liquidity API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("order type is not supported")]
    OrderNotSupported,
    #[error("no valid route could be found")]
    NotFound,
    #[error("rate limited")]
    RateLimited,
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// for instrumentization purposes
    pub fn format_variant(&self) -> &'static str {
        match self {
            Self::OrderNotSupported => "OrderNotSupported",
            Self::NotFound => "NotFound",
            Self::RateLimited => "RateLimited",
            Self::Other(_) => "Other",
        }
    }
}

/// A wrapper around [`reqwest::Client`] to pre-set commonly used headers
/// and other properties on each request.
pub struct Client {
    /// Client to send requests.
    client: reqwest::Client,

    /// Watcher yielding the current block hash.
    block_watcher: Option<watch::Receiver<crate::infra::blockchain::BlockInfo>>,
}

impl Client {
    pub fn new(
        client: reqwest::Client,
        block_watcher: Option<watch::Receiver<crate::infra::blockchain::BlockInfo>>,
    ) -> Self {
        Self {
            client,
            block_watcher,
        }
    }

    /// Prepares a request builder which already has additional headers set.
    pub fn request(&self, method: reqwest::Method, url: reqwest::Url) -> RequestBuilder {
        let request = self.client.request(method, url);
        if let Some(watcher) = &self.block_watcher {
            // Set this header to easily support caching in an egress proxy.
            request.header("X-CURRENT-BLOCK-HASH", watcher.borrow().hash.to_string())
        } else {
            request
        }
    }
}

impl From<aggregator::Error> for Error {
    fn from(err: aggregator::Error) -> Self {
        match err {
            aggregator::Error::OrderNotSupported => Self::OrderNotSupported,
            aggregator::Error::NotFound => Self::NotFound,
            aggregator::Error::RateLimited => Self::RateLimited,
            _ => Self::Other(Box::new(err)),
        }
    }
}

impl From<sor::Error> for Error {
    fn from(err: sor::Error) -> Self {
        match err {
            sor::Error::NotFound => Self::NotFound,
            sor::Error::RateLimited => Self::RateLimited,
            _ => Self::Other(Box::new(err)),
        }
    }
}

impl From<marketplace::Error> for Error {
    fn from(err: marketplace::Error) -> Self {
        match err {
            marketplace::Error::OrderNotSupported => Self::OrderNotSupported,
            marketplace::Error::NotFound => Self::NotFound,
            marketplace::Error::RateLimited => Self::RateLimited,
            _ => Self::Other(Box::new(err)),
        }
    }
}

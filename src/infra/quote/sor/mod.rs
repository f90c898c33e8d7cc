//! Bindings to the smart-order router service. Routes execute through the
//! same settlement contract, with allowances managed through the canonical
//! permit-2 singleton.

use {
    crate::{
        domain::{eth, intent::Intent, solution},
        infra::codec,
        util,
    },
    alloy::{
        primitives::aliases::{U160, U48},
        sol_types::SolCall,
    },
    hyper::StatusCode,
};

pub mod dto;

/// How long the permit-2 allowance stays valid. Routes are executed in the
/// next block, so an hour is already generous.
const ALLOWANCE_VALIDITY: u64 = 3600;

pub struct Sor {
    client: super::Client,
    endpoint: reqwest::Url,
    chain_id: u64,
    settlement: eth::Address,
    permit2: eth::Address,
}

pub struct Config {
    /// The URL of the smart-order router service.
    pub endpoint: reqwest::Url,

    pub chain_id: eth::ChainId,

    pub settlement: eth::Address,

    /// The canonical permit-2 singleton.
    pub permit2: eth::Address,

    pub block_watcher: Option<tokio::sync::watch::Receiver<crate::infra::blockchain::BlockInfo>>,
}

impl Sor {
    pub fn new(config: Config) -> Self {
        Self {
            client: super::Client::new(reqwest::Client::new(), config.block_watcher),
            endpoint: config.endpoint,
            chain_id: config.chain_id.value(),
            settlement: config.settlement,
            permit2: config.permit2,
        }
    }

    pub async fn plan(&self, intent: &Intent, fill_amount: u128) -> Result<solution::Plan, Error> {
        let query = dto::Query {
            chain_id: self.chain_id,
            token_in: intent.sell_token,
            token_out: intent.buy_token,
            amount: eth::U256::from(fill_amount),
            exact_out: intent.is_buy,
            recipient: self.settlement,
        };
        let request = self
            .client
            .request(reqwest::Method::POST, self.endpoint.clone())
            .json(&query);
        let route = util::http::roundtrip::<dto::Route, dto::Error>(request).await?;

        let quote_amount: u128 = route
            .quote_amount
            .try_into()
            .map_err(|_| Error::AmountOverflow)?;
        let amount_in = if intent.is_buy { quote_amount } else { fill_amount };

        let expiration = u64::from(intent.end_time).saturating_add(ALLOWANCE_VALIDITY);
        let calls = vec![
            solution::Call {
                to: intent.sell_token,
                data: codec::sol::tokens::approveCall {
                    spender: self.permit2,
                    amount: eth::U256::from(amount_in),
                }
                .abi_encode(),
                value: eth::U256::ZERO,
            },
            solution::Call {
                to: self.permit2,
                data: codec::sol::permit2::approveCall {
                    token: intent.sell_token,
                    spender: route.router,
                    amount: U160::from(amount_in),
                    expiration: U48::from(expiration),
                }
                .abi_encode(),
                value: eth::U256::ZERO,
            },
            solution::Call {
                to: route.router,
                data: route.data,
                value: eth::U256::ZERO,
            },
        ];

        Ok(solution::Plan {
            fill_amount,
            execute_amount: quote_amount,
            calls,
            pre_txs: vec![],
            execute_token_price: route.quote_token_price,
            execute_token_decimals: route.quote_token_decimals,
            gas: eth::Gas(route.estimated_gas),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unable to find a route")]
    NotFound,
    #[error("rate limited")]
    RateLimited,
    #[error("routed amount overflows 128 bits")]
    AmountOverflow,
    #[error("api error code {code}: {reason}")]
    Api { code: i64, reason: String },
    #[error(transparent)]
    Http(util::http::Error),
}

impl From<util::http::RoundtripError<dto::Error>> for Error {
    fn from(err: util::http::RoundtripError<dto::Error>) -> Self {
        match err {
            util::http::RoundtripError::Http(err) => {
                if let util::http::Error::Status(code, _) = err {
                    match code {
                        StatusCode::TOO_MANY_REQUESTS => Self::RateLimited,
                        StatusCode::NOT_FOUND => Self::NotFound,
                        _ => Self::Http(err),
                    }
                } else {
                    Self::Http(err)
                }
            }
            util::http::RoundtripError::Api(err) => match err.code {
                100 => Self::NotFound,
                429 => Self::RateLimited,
                _ => Self::Api {
                    code: err.code,
                    reason: err.reason,
                },
            },
        }
    }
}

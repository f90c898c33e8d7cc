//! Bindings to the ERC-20 swap aggregator API.

use {
    crate::{
        domain::{eth, intent::Intent, solution},
        infra::codec,
        util,
    },
    alloy::{primitives::address, sol_types::SolCall},
    hyper::StatusCode,
    std::sync::atomic::{self, AtomicU64},
    tracing::Instrument,
};

pub mod dto;

/// The placeholder the aggregator uses for the native token.
const NATIVE_PLACEHOLDER: eth::Address = address!("eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee");

/// The slippage bump applied to the sell side of buy intents, in bps.
const BUY_SLIPPAGE_BPS: u128 = 100;

pub struct Aggregator {
    client: super::Client,
    endpoint: reqwest::Url,
    chain_id: u64,
    settlement: eth::Address,
    wrapped_native: eth::Address,
}

pub struct Config {
    /// The base URL for the aggregator API.
    pub endpoint: reqwest::Url,

    /// Authentication header value for the gated API.
    pub api_key: String,

    pub chain_id: eth::ChainId,

    /// The settlement contract executing the returned calls.
    pub settlement: eth::Address,

    /// The protocol's wrapped-native token.
    pub wrapped_native: eth::Address,

    /// The watcher that yields every new block.
    pub block_watcher: Option<tokio::sync::watch::Receiver<crate::infra::blockchain::BlockInfo>>,
}

impl Aggregator {
    pub fn new(config: Config) -> Result<Self, CreationError> {
        let client = {
            let mut key = reqwest::header::HeaderValue::from_str(&config.api_key)?;
            key.set_sensitive(true);

            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert("x-api-key", key);

            let client = reqwest::Client::builder()
                .default_headers(headers)
                .build()?;
            super::Client::new(client, config.block_watcher)
        };

        Ok(Self {
            client,
            endpoint: config.endpoint,
            chain_id: config.chain_id.value(),
            settlement: config.settlement,
            wrapped_native: config.wrapped_native,
        })
    }

    /// Builds a plan that swaps the maker's sell token into the buy token
    /// inside the settlement callback.
    pub async fn plan(&self, intent: &Intent, fill_amount: u128) -> Result<solution::Plan, Error> {
        let query = dto::Query {
            chain_id: self.chain_id,
            sell_token: self.to_placeholder(intent.sell_token),
            buy_token: self.to_placeholder(intent.buy_token),
            amount: eth::U256::from(fill_amount),
            side: match intent.is_buy {
                true => dto::Side::Buy,
                false => dto::Side::Sell,
            },
            taker: self.settlement,
        };
        let quote = {
            // Set up a tracing span to make debugging of API requests easier.
            static ID: AtomicU64 = AtomicU64::new(0);
            let id = ID.fetch_add(1, atomic::Ordering::Relaxed);
            self.quote(&query)
                .instrument(tracing::trace_span!("quote", id = %id))
                .await?
        };

        // For buy intents the variable side is the sell amount; bump it so
        // the committed maximum absorbs aggregator slippage.
        let (execute_amount, amount_in) = if intent.is_buy {
            let bumped = quote.sell_amount * eth::U256::from(10_000 + BUY_SLIPPAGE_BPS)
                / eth::U256::from(10_000_u64);
            let bumped: u128 = bumped.try_into().map_err(|_| Error::AmountOverflow)?;
            (bumped, bumped)
        } else {
            (
                quote.buy_amount.try_into().map_err(|_| Error::AmountOverflow)?,
                fill_amount,
            )
        };

        let mut calls = Vec::new();
        if intent.sell_token == self.wrapped_native {
            // Paying with the protocol's wrapped native: unwrap first and
            // attach the value to the swap call.
            calls.push(solution::Call {
                to: self.wrapped_native,
                data: codec::sol::tokens::withdrawCall {
                    amount: eth::U256::from(amount_in),
                }
                .abi_encode(),
                value: eth::U256::ZERO,
            });
            calls.push(solution::Call {
                to: quote.to,
                data: quote.data.clone(),
                value: eth::U256::from(amount_in),
            });
        } else {
            calls.push(solution::Call {
                to: intent.sell_token,
                data: codec::sol::tokens::approveCall {
                    spender: quote.allowance_target.unwrap_or(quote.to),
                    amount: eth::U256::from(amount_in),
                }
                .abi_encode(),
                value: eth::U256::ZERO,
            });
            calls.push(solution::Call {
                to: quote.to,
                data: quote.data.clone(),
                value: quote.value.unwrap_or_default(),
            });
        }

        // The execute token is the variable side of the swap.
        let (price, decimals) = if intent.is_buy {
            (quote.sell_token_price, quote.sell_token_decimals)
        } else {
            (quote.buy_token_price, quote.buy_token_decimals)
        };

        Ok(solution::Plan {
            fill_amount,
            execute_amount,
            calls,
            pre_txs: vec![],
            execute_token_price: price,
            execute_token_decimals: decimals,
            gas: eth::Gas(quote.estimated_gas),
        })
    }

    /// Quotes a plain sell of `amount` of `token` into native, executed
    /// directly by `taker`. Used for liquidating accumulated inventory.
    pub async fn direct_swap(
        &self,
        token: eth::Address,
        amount: eth::U256,
        taker: eth::Address,
    ) -> Result<DirectSwap, Error> {
        let quote = self
            .quote(&dto::Query {
                chain_id: self.chain_id,
                sell_token: token,
                buy_token: NATIVE_PLACEHOLDER,
                amount,
                side: dto::Side::Sell,
                taker,
            })
            .await?;
        Ok(DirectSwap {
            to: quote.to,
            data: quote.data,
            value: quote.value.unwrap_or_default(),
            buy_amount: quote.buy_amount,
            allowance_target: quote.allowance_target,
            estimated_gas: quote.estimated_gas,
            sell_token_price: quote.sell_token_price,
            sell_token_decimals: quote.sell_token_decimals,
        })
    }

    /// Maps the protocol's token addresses to what the aggregator expects.
    fn to_placeholder(&self, token: eth::Address) -> eth::Address {
        if token == eth::NATIVE_TOKEN || token == self.wrapped_native {
            NATIVE_PLACEHOLDER
        } else {
            token
        }
    }

    async fn quote(&self, query: &dto::Query) -> Result<dto::Quote, Error> {
        let request = self
            .client
            .request(reqwest::Method::GET, join(&self.endpoint, "quote"))
            .query(query);
        let quote = util::http::roundtrip::<dto::Quote, dto::Error>(request).await?;
        Ok(quote)
    }
}

fn join(endpoint: &reqwest::Url, path: &str) -> reqwest::Url {
    let mut url = endpoint.clone();
    url.path_segments_mut()
        .expect("aggregator endpoint is a valid base URL")
        .pop_if_empty()
        .push(path);
    url
}

/// A quote for a swap sent straight from a wallet.
#[derive(Debug)]
pub struct DirectSwap {
    pub to: eth::Address,
    pub data: Vec<u8>,
    pub value: eth::U256,
    pub buy_amount: eth::U256,
    pub allowance_target: Option<eth::Address>,
    pub estimated_gas: eth::U256,
    pub sell_token_price: bigdecimal::BigDecimal,
    pub sell_token_decimals: u8,
}

#[derive(Debug, thiserror::Error)]
pub enum CreationError {
    #[error(transparent)]
    Header(#[from] reqwest::header::InvalidHeaderValue),
    #[error(transparent)]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("order type is not supported")]
    OrderNotSupported,
    #[error("unable to find a quote")]
    NotFound,
    #[error("rate limited")]
    RateLimited,
    #[error("quoted amount overflows 128 bits")]
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

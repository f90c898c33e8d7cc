//! Bindings to the NFT routing API.
//!
//! The API builds purchase plans for a collection and quantity. Two
//! execution shapes come back:
//!
//! - *Single hop*: the purchase routes through the settlement contract as
//!   relayer and the whole call sequence executes inside the settlement
//!   callback.
//! - *Multi transaction*: restricted marketplaces or non-native currencies
//!   force the purchase to be sent from the solver wallet itself. The plan
//!   then carries pre-transactions (authentication, purchase, collection
//!   approval) and the callback merely forwards each purchased token to the
//!   maker.

use {
    crate::{
        domain::{eth, intent::Intent, solution},
        infra::codec,
        util,
    },
    alloy::{
        signers::{local::PrivateKeySigner, SignerSync},
        sol_types::SolCall,
    },
    base64::prelude::*,
    chrono::SecondsFormat,
    hmac::{Hmac, Mac},
    hyper::StatusCode,
    sha2::Sha256,
};

pub mod dto;

pub struct Marketplace {
    client: super::Client,
    endpoint: reqwest::Url,
    api_secret_key: String,
    chain_id: u64,
    settlement: eth::Address,
    wrapped_native: eth::Address,
    /// Signs marketplace authentication challenges and sends the
    /// pre-transactions, so purchases settle to this wallet.
    solver: PrivateKeySigner,
}

pub struct Config {
    /// The base URL of the NFT routing API.
    pub endpoint: reqwest::Url,

    /// Credentials used to access the API.
    pub api_key: String,
    pub api_secret_key: String,

    pub chain_id: eth::ChainId,

    /// The ERC-721 settlement contract.
    pub settlement: eth::Address,

    pub wrapped_native: eth::Address,

    pub solver: PrivateKeySigner,

    pub block_watcher: Option<tokio::sync::watch::Receiver<crate::infra::blockchain::BlockInfo>>,
}

impl Marketplace {
    pub fn new(config: Config) -> Result<Self, CreationError> {
        let client = {
            let mut key = reqwest::header::HeaderValue::from_str(&config.api_key)?;
            key.set_sensitive(true);

            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert("X-API-KEY", key);

            let client = reqwest::Client::builder()
                .default_headers(headers)
                .build()?;
            super::Client::new(client, config.block_watcher)
        };

        Ok(Self {
            client,
            endpoint: config.endpoint,
            api_secret_key: config.api_secret_key,
            chain_id: config.chain_id.value(),
            settlement: config.settlement,
            wrapped_native: config.wrapped_native,
            solver: config.solver,
        })
    }

    pub async fn plan(&self, intent: &Intent, fill_amount: u128) -> Result<solution::Plan, Error> {
        if !intent.is_buy {
            return Err(Error::OrderNotSupported);
        }
        let quantity = u64::try_from(fill_amount).map_err(|_| Error::OrderNotSupported)?;

        // Prefer the single-transaction shape with the settlement contract
        // relaying the purchase.
        let relayed = self
            .purchase(&dto::PurchaseRequest {
                chain_id: self.chain_id,
                collection: intent.buy_token,
                quantity,
                taker: intent.maker,
                currency: intent.sell_token,
                relayer: Some(self.settlement),
            })
            .await?;

        if !relayed.restricted && self.is_base_currency(intent.sell_token) {
            return self.single_hop_plan(fill_amount, relayed);
        }

        // The purchase has to come from the solver wallet itself.
        let direct = self
            .purchase(&dto::PurchaseRequest {
                chain_id: self.chain_id,
                collection: intent.buy_token,
                quantity,
                taker: self.solver.address(),
                currency: intent.sell_token,
                relayer: None,
            })
            .await?;
        self.multi_tx_plan(intent, fill_amount, direct).await
    }

    fn single_hop_plan(
        &self,
        fill_amount: u128,
        plan: dto::PurchasePlan,
    ) -> Result<solution::Plan, Error> {
        let calls = plan
            .steps
            .iter()
            .map(|step| match step {
                dto::Step::Transaction { to, data, value } => Ok(solution::Call {
                    to: *to,
                    data: data.clone(),
                    value: *value,
                }),
                // A relayed route never requires authentication.
                dto::Step::Signature { .. } => Err(Error::UnexpectedChallenge),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(solution::Plan {
            fill_amount,
            execute_amount: plan
                .total_price
                .try_into()
                .map_err(|_| Error::AmountOverflow)?,
            calls,
            pre_txs: vec![],
            execute_token_price: plan.currency_price,
            execute_token_decimals: plan.currency_decimals,
            gas: eth::Gas(plan.estimated_gas),
        })
    }

    async fn multi_tx_plan(
        &self,
        intent: &Intent,
        fill_amount: u128,
        plan: dto::PurchasePlan,
    ) -> Result<solution::Plan, Error> {
        let mut pre_txs = Vec::new();
        for step in &plan.steps {
            match step {
                dto::Step::Signature { challenge } => {
                    self.answer_challenge(challenge).await?;
                }
                dto::Step::Transaction { to, data, value } => {
                    pre_txs.push(solution::PreTx {
                        to: *to,
                        data: data.clone(),
                        value: *value,
                    });
                }
            }
        }
        if plan.requires_approval {
            pre_txs.push(solution::PreTx {
                to: intent.buy_token,
                data: codec::sol::tokens::setApprovalForAllCall {
                    operator: self.settlement,
                    approved: true,
                }
                .abi_encode(),
                value: eth::U256::ZERO,
            });
        }

        // Inside the callback each purchased token moves from the solver to
        // the maker.
        let calls = plan
            .token_ids
            .iter()
            .map(|token_id| solution::Call {
                to: intent.buy_token,
                data: codec::sol::tokens::transferFromCall {
                    from: self.solver.address(),
                    to: intent.maker,
                    tokenId: *token_id,
                }
                .abi_encode(),
                value: eth::U256::ZERO,
            })
            .collect();

        Ok(solution::Plan {
            fill_amount,
            execute_amount: plan
                .total_price
                .try_into()
                .map_err(|_| Error::AmountOverflow)?,
            calls,
            pre_txs,
            execute_token_price: plan.currency_price,
            execute_token_decimals: plan.currency_decimals,
            gas: eth::Gas(plan.estimated_gas),
        })
    }

    /// Signs a marketplace authentication challenge with the solver key and
    /// posts it back.
    async fn answer_challenge(&self, challenge: &dto::Challenge) -> Result<(), Error> {
        let signature = self
            .solver
            .sign_message_sync(challenge.message.as_bytes())
            .map_err(|_| Error::Challenge)?;
        let body = dto::ChallengeResponse {
            id: challenge.id.clone(),
            signature: format!("0x{}", hex::encode(signature.as_bytes())),
        };
        let request = self
            .signed_request(reqwest::Method::POST, "auth")
            .json(&body);
        let ack = util::http::roundtrip::<dto::Acknowledgement, dto::Error>(request).await?;
        if !ack.success {
            return Err(Error::Challenge);
        }
        Ok(())
    }

    async fn purchase(
        &self,
        request: &dto::PurchaseRequest,
    ) -> Result<dto::PurchasePlan, Error> {
        let request = self
            .signed_request(reqwest::Method::POST, "purchase")
            .json(request);
        let plan = util::http::roundtrip::<dto::PurchasePlan, dto::Error>(request).await?;
        Ok(plan)
    }

    /// Prepares a request carrying the timestamped HMAC the API requires.
    fn signed_request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = {
            let mut url = self.endpoint.clone();
            url.path_segments_mut()
                .expect("marketplace endpoint is a valid base URL")
                .pop_if_empty()
                .push(path);
            url
        };
        let timestamp = chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let payload = format!("{timestamp}{method}{}", url.path());
        let mut mac = Hmac::<Sha256>::new_from_slice(self.api_secret_key.as_bytes())
            .expect("HMAC accepts keys of any size");
        mac.update(payload.as_bytes());
        let signature = BASE64_STANDARD.encode(mac.finalize().into_bytes());

        self.client
            .request(method, url)
            .header("X-TIMESTAMP", timestamp)
            .header("X-SIGNATURE", signature)
    }

    fn is_base_currency(&self, token: eth::Address) -> bool {
        token == eth::NATIVE_TOKEN || token == self.wrapped_native
    }
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
    #[error("no purchase route could be found")]
    NotFound,
    #[error("rate limited")]
    RateLimited,
    #[error("purchase price overflows 128 bits")]
    AmountOverflow,
    #[error("relayed route came back with an authentication challenge")]
    UnexpectedChallenge,
    #[error("failed to answer the authentication challenge")]
    Challenge,
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

//! HTTP client for the matchmaker peer. Solutions are posted together with
//! the transactions that fill them; the matchmaker answers out-of-band by
//! calling the solver's authorization endpoint back.

use {
    crate::{
        domain::intent::Intent,
        infra::blockchain::SignedTx,
        util::{self, serialize},
    },
    serde::{Deserialize, Serialize},
    serde_with::serde_as,
    uuid::Uuid,
};

pub struct Matchmaker {
    client: reqwest::Client,
    base_url: reqwest::Url,
}

/// A solution submission: the intent being filled and the signed
/// transactions that fill it, identified by a UUID for the callback.
#[serde_as]
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission<'a> {
    pub uuid: Uuid,
    #[serde(serialize_with = "serialize_intent")]
    pub intent: &'a Intent,
    pub txs: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Acknowledgement {
    #[serde(default)]
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub code: i64,
    pub reason: String,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("matchmaker rejected the solution: {0}")]
    Rejected(String),
    #[error("api error code {code}: {reason}")]
    Api { code: i64, reason: String },
    #[error(transparent)]
    Http(util::http::Error),
}

impl Matchmaker {
    pub fn new(base_url: reqwest::Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Posts a solution for the specified intent. The matchmaker answers
    /// later, if at all, through the authorization callback endpoint.
    pub async fn submit(
        &self,
        uuid: Uuid,
        intent: &Intent,
        txs: &[SignedTx],
    ) -> Result<(), Error> {
        let path = format!("{}/solutions", intent.protocol().label());
        let submission = Submission {
            uuid,
            intent,
            txs: txs
                .iter()
                .map(|tx| format!("0x{}", hex::encode(&tx.raw)))
                .collect(),
        };
        let request = self
            .client
            .post(self.url(&path))
            .json(&submission);
        let ack = util::http::roundtrip::<Acknowledgement, ApiError>(request).await?;
        if !ack.success {
            return Err(Error::Rejected("solution not accepted".to_string()));
        }
        Ok(())
    }

    fn url(&self, path: &str) -> reqwest::Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(path.split('/'));
        }
        url
    }
}

impl From<util::http::RoundtripError<ApiError>> for Error {
    fn from(err: util::http::RoundtripError<ApiError>) -> Self {
        match err {
            util::http::RoundtripError::Http(err) => Self::Http(err),
            util::http::RoundtripError::Api(err) => Self::Api {
                code: err.code,
                reason: err.reason,
            },
        }
    }
}

/// Serializes an intent in the wire shape the matchmaker expects.
fn serialize_intent<S: serde::Serializer>(
    intent: &Intent,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    #[serde_as]
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Dto<'a> {
        is_buy: bool,
        buy_token: &'a crate::domain::eth::Address,
        sell_token: &'a crate::domain::eth::Address,
        maker: &'a crate::domain::eth::Address,
        solver: &'a crate::domain::eth::Address,
        source: &'a crate::domain::eth::Address,
        fee_bps: u16,
        surplus_bps: u16,
        start_time: u32,
        end_time: u32,
        #[serde_as(as = "serialize::U256")]
        nonce: crate::domain::eth::U256,
        is_partially_fillable: bool,
        is_smart_order: bool,
        is_incentivized: bool,
        #[serde_as(as = "serialize::U128")]
        amount: u128,
        #[serde_as(as = "serialize::U128")]
        end_amount: u128,
        start_amount_bps: u16,
        expected_amount_bps: u16,
        signature: &'a crate::domain::eth::Bytes,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_criteria_order: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        #[serde_as(as = "Option<serialize::U256>")]
        token_id_or_criteria: Option<crate::domain::eth::U256>,
    }

    let nft = intent.nft;
    Dto {
        is_buy: intent.is_buy,
        buy_token: &intent.buy_token,
        sell_token: &intent.sell_token,
        maker: &intent.maker,
        solver: &intent.solver,
        source: &intent.source,
        fee_bps: intent.fee_bps,
        surplus_bps: intent.surplus_bps,
        start_time: intent.start_time,
        end_time: intent.end_time,
        nonce: intent.nonce,
        is_partially_fillable: intent.is_partially_fillable,
        is_smart_order: intent.is_smart_order,
        is_incentivized: intent.is_incentivized,
        amount: intent.amount,
        end_amount: intent.end_amount,
        start_amount_bps: intent.start_amount_bps,
        expected_amount_bps: intent.expected_amount_bps,
        signature: &intent.signature,
        is_criteria_order: nft.map(|nft| nft.is_criteria_order),
        token_id_or_criteria: nft.map(|nft| nft.token_id_or_criteria),
    }
    .serialize(serializer)
}

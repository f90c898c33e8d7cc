//! DTOs for the smart-order router service.

use {
    crate::util::serialize,
    alloy::primitives::{Address, U256},
    bigdecimal::BigDecimal,
    serde::{Deserialize, Serialize},
    serde_with::serde_as,
};

#[serde_as]
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub chain_id: u64,
    pub token_in: Address,
    pub token_out: Address,
    #[serde_as(as = "serialize::U256")]
    pub amount: U256,
    /// `true` fixes `token_out`, `false` fixes `token_in`.
    pub exact_out: bool,
    pub recipient: Address,
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// The amount on the non-fixed side of the route.
    #[serde_as(as = "serialize::U256")]
    pub quote_amount: U256,

    /// The router contract to call.
    pub router: Address,

    #[serde_as(as = "serialize::Hex")]
    pub data: Vec<u8>,

    #[serde_as(as = "serialize::U256")]
    pub estimated_gas: U256,

    /// Price of one whole quote-side token in native wei.
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub quote_token_price: BigDecimal,

    pub quote_token_decimals: u8,
}

#[derive(Debug, Deserialize)]
pub struct Error {
    pub code: i64,
    pub reason: String,
}

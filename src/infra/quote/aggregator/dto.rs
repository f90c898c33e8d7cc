//! DTOs for the ERC-20 swap aggregator API.

use {
    crate::util::serialize,
    alloy::primitives::{Address, U256},
    bigdecimal::BigDecimal,
    serde::{Deserialize, Serialize},
    serde_with::serde_as,
};

/// Query parameters for a swap quote.
#[serde_as]
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    /// The chain ID of the network the query is prepared for.
    pub chain_id: u64,

    /// Contract address of the token to sell.
    pub sell_token: Address,

    /// Contract address of the token to buy.
    pub buy_token: Address,

    /// The fixed amount, in atoms. Which side it fixes depends on `side`.
    #[serde_as(as = "serialize::U256")]
    pub amount: U256,

    /// Whether `amount` fixes the buy or the sell side.
    pub side: Side,

    /// The address that executes the returned call.
    pub taker: Address,
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

/// A quote response.
#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    #[serde_as(as = "serialize::U256")]
    pub sell_amount: U256,

    #[serde_as(as = "serialize::U256")]
    pub buy_amount: U256,

    /// The address of the contract to call in order to execute the swap.
    pub to: Address,

    /// The swap calldata.
    #[serde_as(as = "serialize::Hex")]
    pub data: Vec<u8>,

    /// The native value to attach to the call.
    #[serde_as(as = "Option<serialize::U256>")]
    #[serde(default)]
    pub value: Option<U256>,

    /// The spender that needs an allowance on the sell token.
    #[serde(default)]
    pub allowance_target: Option<Address>,

    #[serde_as(as = "serialize::U256")]
    pub estimated_gas: U256,

    /// Price of one whole sell token in native wei.
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub sell_token_price: BigDecimal,

    /// Price of one whole buy token in native wei.
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub buy_token_price: BigDecimal,

    pub sell_token_decimals: u8,
    pub buy_token_decimals: u8,
}

#[derive(Debug, Deserialize)]
pub struct Error {
    pub code: i64,
    pub reason: String,
}

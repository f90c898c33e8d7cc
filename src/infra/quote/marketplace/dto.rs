//! DTOs for the NFT routing API.

use {
    crate::util::serialize,
    alloy::primitives::{Address, U256},
    bigdecimal::BigDecimal,
    serde::{Deserialize, Serialize},
    serde_with::serde_as,
};

/// A request for a purchase plan targeting a collection.
#[serde_as]
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub chain_id: u64,
    pub collection: Address,
    pub quantity: u64,
    /// The address the purchased tokens settle to.
    pub taker: Address,
    /// The currency the purchase is paid in.
    pub currency: Address,
    /// When set, the purchase is routed so that this contract can execute it
    /// on the taker's behalf within a single transaction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relayer: Option<Address>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasePlan {
    /// The total purchase price in currency atoms.
    #[serde_as(as = "serialize::U256")]
    pub total_price: U256,

    /// Whether the route includes a marketplace that restricts fills to the
    /// buyer itself. Such routes cannot execute through a relayer.
    pub restricted: bool,

    /// Whether the taker must approve the relayer for transferring the
    /// purchased tokens afterwards.
    #[serde(default)]
    pub requires_approval: bool,

    /// The token ids this plan purchases.
    #[serde_as(as = "Vec<serialize::U256>")]
    pub token_ids: Vec<U256>,

    pub steps: Vec<Step>,

    #[serde_as(as = "serialize::U256")]
    pub estimated_gas: U256,

    /// Price of one whole currency token in native wei.
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub currency_price: BigDecimal,

    pub currency_decimals: u8,
}

#[serde_as]
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Step {
    /// A marketplace authentication challenge that must be signed and posted
    /// back before the purchase transactions are valid.
    #[serde(rename = "signature")]
    Signature { challenge: Challenge },

    /// An on-chain transaction.
    #[serde(rename = "transaction")]
    Transaction {
        to: Address,
        #[serde_as(as = "serialize::Hex")]
        data: Vec<u8>,
        #[serde_as(as = "serialize::U256")]
        value: U256,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Challenge {
    pub id: String,
    /// The message to sign with the taker's key.
    pub message: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeResponse {
    pub id: String,
    pub signature: String,
}

#[derive(Debug, Deserialize)]
pub struct Acknowledgement {
    pub success: bool,
}

#[derive(Debug, Deserialize)]
pub struct Error {
    pub code: i64,
    pub reason: String,
}

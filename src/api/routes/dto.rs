//! Data transfer objects for the HTTP surface.

use {
    crate::{
        domain::{auth, eth, intent},
        util::serialize,
    },
    serde::{Deserialize, Serialize},
    serde_with::serde_as,
};

/// The wire representation of an intent.
#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Intent {
    pub is_buy: bool,
    pub buy_token: eth::Address,
    pub sell_token: eth::Address,
    pub maker: eth::Address,
    pub solver: eth::Address,
    pub source: eth::Address,
    pub fee_bps: u16,
    pub surplus_bps: u16,
    pub start_time: u32,
    pub end_time: u32,
    #[serde_as(as = "serialize::U256")]
    pub nonce: eth::U256,
    pub is_partially_fillable: bool,
    pub is_smart_order: bool,
    pub is_incentivized: bool,
    #[serde_as(as = "serialize::U128")]
    pub amount: u128,
    #[serde_as(as = "serialize::U128")]
    pub end_amount: u128,
    pub start_amount_bps: u16,
    pub expected_amount_bps: u16,
    pub signature: eth::Bytes,
    #[serde(default)]
    pub is_criteria_order: Option<bool>,
    #[serde_as(as = "Option<serialize::U256>")]
    #[serde(default)]
    pub token_id_or_criteria: Option<eth::U256>,
}

/// Converts the wire intent into its domain representation for the expected
/// protocol variant.
pub fn to_domain(
    intent: &Intent,
    protocol: intent::Protocol,
) -> Result<intent::Intent, &'static str> {
    let nft = match protocol {
        intent::Protocol::Erc20 => {
            if intent.is_criteria_order.is_some() || intent.token_id_or_criteria.is_some() {
                return Err("unexpected criteria fields");
            }
            None
        }
        intent::Protocol::Erc721 => Some(intent::NftExtension {
            is_criteria_order: intent.is_criteria_order.ok_or("missing isCriteriaOrder")?,
            token_id_or_criteria: intent
                .token_id_or_criteria
                .ok_or("missing tokenIdOrCriteria")?,
        }),
    };
    Ok(intent::Intent {
        is_buy: intent.is_buy,
        buy_token: intent.buy_token,
        sell_token: intent.sell_token,
        maker: intent.maker,
        solver: intent.solver,
        source: intent.source,
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
        signature: intent.signature.clone(),
        nft,
    })
}

/// A matchmaker authorization as it travels in callback payloads.
#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Authorization {
    pub intent_hash: eth::B256,
    pub solver: eth::Address,
    #[serde_as(as = "serialize::U128")]
    pub fill_amount_to_check: u128,
    #[serde_as(as = "serialize::U128")]
    pub execute_amount_to_check: u128,
    pub block_deadline: u32,
    pub signature: eth::Bytes,
}

pub fn authorization_to_domain(authorization: &Authorization) -> auth::Signed {
    auth::Signed {
        authorization: auth::Authorization {
            intent_hash: crate::domain::intent::Hash(authorization.intent_hash),
            solver: authorization.solver,
            fill_amount_to_check: authorization.fill_amount_to_check,
            execute_amount_to_check: authorization.execute_amount_to_check,
            block_deadline: authorization.block_deadline,
        },
        signature: authorization.signature.clone(),
    }
}

//! The ERC-721 side of the solver: purchase plans come from the NFT routing
//! API and may require transactions from the solver wallet ahead of the
//! settlement call.

use crate::{
    domain::{eth, intent::Intent, solution},
    infra::quote::{self, marketplace::Marketplace},
};

pub struct Erc721 {
    marketplace: Marketplace,
}

impl Erc721 {
    pub fn new(marketplace: Marketplace) -> Self {
        Self { marketplace }
    }

    /// Only collection-wide buy intents are supported.
    pub fn check(&self, intent: &Intent) -> Result<(), &'static str> {
        if !intent.is_buy {
            return Err("nft sell intent");
        }
        match intent.nft {
            Some(nft) if nft.token_id_or_criteria.is_zero() => Ok(()),
            _ => Err("token-specific intent"),
        }
    }

    pub async fn build_plan(
        &self,
        intent: &Intent,
        fill_amount: u128,
    ) -> Result<solution::Plan, quote::Error> {
        Ok(self.marketplace.plan(intent, fill_amount).await?)
    }

    /// The purchase currency accumulates with the solver.
    pub fn post_fill_token(&self, intent: &Intent) -> eth::Address {
        intent.sell_token
    }
}

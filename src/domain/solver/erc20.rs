//! The ERC-20 side of the solver: plans come from the configured swap
//! aggregator or the smart-order router.

use {
    crate::{
        domain::{eth, intent::Intent, solution},
        infra::quote,
    },
    std::sync::Arc,
};

pub struct Erc20 {
    quoter: Arc<quote::Erc20Quoter>,
}

impl Erc20 {
    pub fn new(quoter: Arc<quote::Erc20Quoter>) -> Self {
        Self { quoter }
    }

    pub fn check(&self, _intent: &Intent) -> Result<(), &'static str> {
        Ok(())
    }

    pub async fn build_plan(
        &self,
        intent: &Intent,
        fill_amount: u128,
    ) -> Result<solution::Plan, quote::Error> {
        self.quoter.plan(intent, fill_amount).await
    }

    /// The fill leaves the maker's sell token with the solver.
    pub fn post_fill_token(&self, intent: &Intent) -> eth::Address {
        intent.sell_token
    }
}

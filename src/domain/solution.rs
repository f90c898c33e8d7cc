//! Solution plans produced by the quote adapters and the fill variants they
//! are settled through.

use {
    crate::{domain::eth, util},
    bigdecimal::BigDecimal,
    std::fmt::{self, Debug, Formatter},
};

/// An on-chain call executed by the settlement contract inside the fill
/// callback.
#[derive(Clone)]
pub struct Call {
    pub to: eth::Address,
    pub data: Vec<u8>,
    pub value: eth::U256,
}

impl Debug for Call {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Call")
            .field("to", &self.to)
            .field("data", &util::fmt::Hex(&self.data))
            .field("value", &self.value)
            .finish()
    }
}

/// A transaction the solver must send from its own wallet before the
/// settlement call lands (marketplace authentication, purchases that settle
/// to the solver).
#[derive(Clone)]
pub struct PreTx {
    pub to: eth::Address,
    pub data: Vec<u8>,
    pub value: eth::U256,
}

impl Debug for PreTx {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("PreTx")
            .field("to", &self.to)
            .field("data", &util::fmt::Hex(&self.data))
            .field("value", &self.value)
            .finish()
    }
}

/// A plan for filling an intent: the calls the settlement contract will
/// execute, any transactions the solver must send first, and the economic
/// metrics needed for profit accounting.
#[derive(Debug, Clone)]
pub struct Plan {
    /// The amount of the intent's fixed side this plan fills.
    pub fill_amount: u128,
    /// What the solver commits to on the variable side: the maximum sell
    /// amount for buy intents, the minimum buy amount for sell intents.
    pub execute_amount: u128,
    pub calls: Vec<Call>,
    pub pre_txs: Vec<PreTx>,
    /// Price of one whole execute-side token in native wei.
    pub execute_token_price: BigDecimal,
    pub execute_token_decimals: u8,
    /// Indicative gas estimate for executing the plan.
    pub gas: eth::Gas,
}

impl Plan {
    /// The execute amount expressed in native wei.
    pub fn execute_amount_in_native(&self) -> Option<eth::Ether> {
        util::conv::token_to_native(
            &eth::U256::from(self.execute_amount),
            &self.execute_token_price,
            self.execute_token_decimals,
        )
        .map(eth::Ether)
    }
}

/// The settlement entrypoint variant a fill goes through. Selects both the
/// function selector and the argument layout from a closed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillVariant {
    /// Plain fill, no matchmaker involvement.
    Direct,
    /// Matchmaker fill relying on a prior on-chain authorization.
    OnChainAuthCheck,
    /// Matchmaker fill carrying a signed authorization.
    SignedAuth,
}

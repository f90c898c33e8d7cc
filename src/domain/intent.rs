//! The domain object representing a signed, time-decaying swap intent.

use {
    crate::{domain::eth, util},
    std::fmt::{self, Debug, Display, Formatter},
};

/// A maker-signed intent. The maker commits to a fixed amount on one side of
/// the swap and a limit on the other side that decays linearly over the
/// `[start_time, end_time]` window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    /// Direction: `true` fixes the buy amount, `false` the sell amount.
    pub is_buy: bool,
    /// May be the native zero address.
    pub buy_token: eth::Address,
    /// Never the native zero address.
    pub sell_token: eth::Address,
    pub maker: eth::Address,
    /// A specific solver, the zero address (any solver), or the matchmaker.
    pub solver: eth::Address,
    /// Optional fee beneficiary.
    pub source: eth::Address,
    pub fee_bps: u16,
    pub surplus_bps: u16,
    pub start_time: u32,
    pub end_time: u32,
    /// Replay guard.
    pub nonce: eth::U256,
    pub is_partially_fillable: bool,
    /// The signature is validated dynamically by a contract.
    pub is_smart_order: bool,
    /// Requires a minimum priority fee and a tip payment to the block
    /// builder, attached as transaction value.
    pub is_incentivized: bool,
    /// The fixed side of the swap.
    pub amount: u128,
    /// The limit on the variable side at `end_time`.
    pub end_amount: u128,
    /// Derives the variable-side limit at `start_time` from `end_amount`.
    pub start_amount_bps: u16,
    /// Derives the "fair" amount used for surplus accounting.
    pub expected_amount_bps: u16,
    /// EIP-712 signature over the fields above.
    pub signature: eth::Bytes,
    /// Present for ERC-721 intents only.
    pub nft: Option<NftExtension>,
}

/// The additional fields carried by ERC-721 intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NftExtension {
    pub is_criteria_order: bool,
    /// Zero means any token of the collection.
    pub token_id_or_criteria: eth::U256,
}

/// The protocol variant an intent settles against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Erc20,
    Erc721,
}

impl Protocol {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Erc20 => "erc20",
            Self::Erc721 => "erc721",
        }
    }
}

impl Intent {
    pub fn protocol(&self) -> Protocol {
        match self.nft {
            Some(_) => Protocol::Erc721,
            None => Protocol::Erc20,
        }
    }

    /// Whether the specified address is allowed to fill this intent.
    pub fn allows_solver(&self, solver: eth::Address, matchmaker: eth::Address) -> bool {
        self.solver == eth::Address::ZERO || self.solver == solver || self.solver == matchmaker
    }

    /// Whether this intent is routed through the matchmaker.
    pub fn is_matchmade(&self, matchmaker: eth::Address) -> bool {
        self.solver == matchmaker
    }

    /// The amount this intent can still be filled for, given the amount
    /// already filled on-chain.
    pub fn remaining(&self, amount_filled: u128) -> u128 {
        self.amount.saturating_sub(amount_filled)
    }

    /// How much longer this intent stays valid relative to the specified
    /// timestamp.
    pub fn remaining_validity(&self, now: u32) -> std::time::Duration {
        std::time::Duration::from_secs(u64::from(self.end_time.saturating_sub(now)))
    }
}

/// The 32-byte EIP-712 hash identifying an intent.
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct Hash(pub eth::B256);

impl Debug for Hash {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_tuple("Hash")
            .field(&util::fmt::Hex(self.0.as_slice()))
            .finish()
    }
}

impl Display for Hash {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Display::fmt(&util::fmt::Hex(self.0.as_slice()), f)
    }
}

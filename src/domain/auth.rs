//! Single-use, block-bound fill authorizations issued by the matchmaker.

use crate::domain::{eth, intent};

/// An authorization naming a solver, an intent, fill caps, and the last block
/// in which it may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authorization {
    pub intent_hash: intent::Hash,
    pub solver: eth::Address,
    pub fill_amount_to_check: u128,
    pub execute_amount_to_check: u128,
    pub block_deadline: u32,
}

impl Authorization {
    /// Whether the authorization can still be used for the specified target
    /// block.
    pub fn covers(&self, target_block: u64) -> bool {
        target_block <= u64::from(self.block_deadline)
    }
}

/// An authorization together with the matchmaker's EIP-712 signature over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signed {
    pub authorization: Authorization,
    pub signature: eth::Bytes,
}

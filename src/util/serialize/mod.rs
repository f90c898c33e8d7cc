mod hex;
mod u128;
mod u256;

pub use self::{hex::Hex, u128::U128, u256::U256};

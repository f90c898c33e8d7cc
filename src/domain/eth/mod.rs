mod chain;

pub use {
    self::chain::{ChainId, BLOCK_TIME, PESSIMISTIC_BLOCK_TIME},
    alloy::primitives::{Address, B256, Bytes, U256},
};

/// The placeholder address conventionally used for the native token.
pub const NATIVE_TOKEN: Address = Address::ZERO;

/// A contract address.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ContractAddress(pub Address);

/// An ERC20 token address.
///
/// https://eips.ethereum.org/EIPS/eip-20
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TokenAddress(pub Address);

impl From<Address> for TokenAddress {
    fn from(inner: Address) -> Self {
        Self(inner)
    }
}

/// An asset on the Ethereum blockchain. Represents a particular amount of a
/// particular token.
#[derive(Debug, Clone, Copy)]
pub struct Asset {
    pub amount: U256,
    pub token: TokenAddress,
}

/// An Ether amount in wei.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Ether(pub U256);

impl From<U256> for Ether {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl std::ops::Add for Ether {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Ether {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

/// Gas amount.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Gas(pub U256);

impl Gas {
    pub fn new(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl std::ops::Add for Gas {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

/// A gas price in wei per gas unit.
#[derive(Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd)]
pub struct GasPrice(pub U256);

impl GasPrice {
    /// The total fee paid for the specified amount of gas.
    pub fn fee(&self, gas: Gas) -> Ether {
        Ether(self.0 * gas.0)
    }
}

impl std::ops::Add for GasPrice {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

//! Well-known per-chain contract addresses.

use {
    crate::domain::{eth, intent::Protocol},
    alloy::primitives::address,
};

#[derive(Clone, Copy, Debug)]
pub struct Contracts {
    /// The ERC-20 settlement contract.
    pub settlement_erc20: eth::Address,
    /// The ERC-721 settlement contract.
    pub settlement_erc721: eth::Address,
    /// The protocol's wrapped-native helper, which supports wrapping and
    /// approving in a single call.
    pub wrapped_native: eth::Address,
    /// The canonical wrapped-native token.
    pub weth9: eth::Address,
    /// The canonical permit-2 singleton.
    pub permit2: eth::Address,
    /// The matchmaker's signer address.
    pub matchmaker: eth::Address,
}

impl Contracts {
    pub fn for_chain(chain: eth::ChainId) -> Self {
        match chain {
            eth::ChainId::Mainnet => Self {
                settlement_erc20: address!("7d84e3b74c8a4c1062507ed34cbc6ef8fc962b5f"),
                settlement_erc721: address!("dde5d1b298d30dcdea5fd42ccba5b8eff1d11aa9"),
                wrapped_native: address!("e2e08b3ba90f5bbb1bd695d5ff41bfbc1069f5f8"),
                weth9: address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"),
                permit2: address!("000000000022d473030f116ddee9f6b43ac78ba3"),
                matchmaker: address!("f4f6f2a9fe2991b8ed01dea0f468a3b4c8ab990e"),
            },
            eth::ChainId::Goerli => Self {
                settlement_erc20: address!("5e3c342a4d9a0e4f4e0e34948e93e5dd76b032c2"),
                settlement_erc721: address!("a267adb85c1c47eb958da7195a5f4de4b68f69b4"),
                wrapped_native: address!("6b5fd7cb8cfd4902c858882fc9a0ffdbd5d1d6b1"),
                weth9: address!("b4fbf271143f4fbf7b91a5ded31805e42b2208d6"),
                permit2: address!("000000000022d473030f116ddee9f6b43ac78ba3"),
                matchmaker: address!("41fc3332a9bd70772bfc71b3d12fbd5b0bbf4a75"),
            },
        }
    }

    pub fn settlement(&self, protocol: Protocol) -> eth::Address {
        match protocol {
            Protocol::Erc20 => self.settlement_erc20,
            Protocol::Erc721 => self.settlement_erc721,
        }
    }

    /// Whether the specified address is one of the settlement contracts.
    pub fn is_settlement(&self, address: eth::Address) -> bool {
        address == self.settlement_erc20 || address == self.settlement_erc721
    }

    /// Whether swapping between the two tokens is a plain wrap or unwrap. Such
    /// pairs are not worth routing through external liquidity.
    pub fn is_wrap_or_unwrap(&self, sell: eth::Address, buy: eth::Address) -> bool {
        let wrappers = [eth::NATIVE_TOKEN, self.wrapped_native, self.weth9];
        wrappers.contains(&sell) && wrappers.contains(&buy)
    }
}

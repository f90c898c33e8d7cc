//! Canonical hashing, typed-data signing, and the binary packing of intents
//! appended to approval calldata.

use {
    crate::{
        domain::{
            auth,
            eth,
            intent::{self, Intent, NftExtension, Protocol},
            solution,
        },
        infra::contracts::Contracts,
    },
    alloy::{
        primitives::Signature,
        signers::{local::PrivateKeySigner, SignerSync},
        sol_types::{Eip712Domain, SolCall, SolStruct, SolValue},
    },
    std::borrow::Cow,
};

pub mod sol;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("signing failed: {0}")]
    Sign(#[from] alloy::signers::Error),
    #[error("fill variant requires a signed authorization")]
    MissingAuthorization,
    #[error("intent is missing the criteria fields")]
    MissingCriteria,
    #[error("malformed intent status response")]
    Status,
}

/// The EIP-712 domain for the specified protocol variant.
pub fn domain(protocol: Protocol, chain: eth::ChainId, contracts: &Contracts) -> Eip712Domain {
    let name = match protocol {
        Protocol::Erc20 => "MemswapERC20",
        Protocol::Erc721 => "MemswapERC721",
    };
    Eip712Domain::new(
        Some(Cow::Borrowed(name)),
        Some(Cow::Borrowed("1.0")),
        Some(eth::U256::from(chain.value())),
        Some(contracts.settlement(protocol)),
        None,
    )
}

/// The EIP-712 digest identifying an intent.
pub fn intent_hash(intent: &Intent, chain: eth::ChainId, contracts: &Contracts) -> intent::Hash {
    let domain = domain(intent.protocol(), chain, contracts);
    let digest = match intent.protocol() {
        Protocol::Erc20 => to_sol_erc20(intent).eip712_signing_hash(&domain),
        Protocol::Erc721 => to_sol_erc721(intent)
            .expect("the ERC-721 variant carries criteria fields")
            .eip712_signing_hash(&domain),
    };
    intent::Hash(digest)
}

/// The EIP-712 digest of an authorization under the specified protocol's
/// domain.
pub fn authorization_hash(
    authorization: &auth::Authorization,
    protocol: Protocol,
    chain: eth::ChainId,
    contracts: &Contracts,
) -> eth::B256 {
    to_sol_authorization(authorization).eip712_signing_hash(&domain(protocol, chain, contracts))
}

pub fn sign_intent(
    signer: &PrivateKeySigner,
    intent: &Intent,
    chain: eth::ChainId,
    contracts: &Contracts,
) -> Result<eth::Bytes, Error> {
    let digest = intent_hash(intent, chain, contracts).0;
    let signature = signer.sign_hash_sync(&digest)?;
    Ok(signature.as_bytes().to_vec().into())
}

pub fn sign_authorization(
    signer: &PrivateKeySigner,
    authorization: &auth::Authorization,
    protocol: Protocol,
    chain: eth::ChainId,
    contracts: &Contracts,
) -> Result<eth::Bytes, Error> {
    let digest = authorization_hash(authorization, protocol, chain, contracts);
    let signature = signer.sign_hash_sync(&digest)?;
    Ok(signature.as_bytes().to_vec().into())
}

/// Recovers the signer of the specified digest. Returns `None` for malformed
/// signatures.
pub fn recover_signer(digest: eth::B256, signature: &[u8]) -> Option<eth::Address> {
    Signature::try_from(signature)
        .ok()?
        .recover_address_from_prehash(&digest)
        .ok()
}

/// ABI-encodes an intent for appending to approval calldata.
pub fn encode_intent_tail(intent: &Intent) -> Vec<u8> {
    match intent.protocol() {
        Protocol::Erc20 => to_wire_erc20(intent).abi_encode(),
        Protocol::Erc721 => match to_wire_erc721(intent) {
            Some(wire) => wire.abi_encode(),
            None => Vec::new(),
        },
    }
}

/// Decodes an intent from the tail of approval calldata. This stream is
/// untrusted, so any decoding failure yields `None`.
pub fn decode_intent_tail(data: &[u8]) -> Option<Intent> {
    if let Ok(wire) = sol::erc20::IntentWire::abi_decode(data) {
        return Some(from_wire_erc20(wire));
    }
    if let Ok(wire) = sol::erc721::IntentWire::abi_decode(data) {
        return Some(from_wire_erc721(wire));
    }
    None
}

/// How an intent reached the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Smuggled in the tail of a plain token approval.
    Approval,
    /// Smuggled in the tail of a wrap-and-approve helper call.
    DepositAndApprove,
    /// The full calldata is the intent itself.
    Direct,
}

#[derive(Debug)]
pub struct Decoded {
    pub intent: Intent,
    pub origin: Origin,
}

/// Matches a pending transaction against the three recognized entry shapes.
pub fn match_entry(
    to: Option<eth::Address>,
    input: &[u8],
    contracts: &Contracts,
) -> Option<Decoded> {
    const APPROVE_LEN: usize = 4 + 32 + 32;
    if input.len() > APPROVE_LEN {
        let (head, tail) = input.split_at(APPROVE_LEN);
        if head.starts_with(&sol::tokens::approveCall::SELECTOR) {
            if let Ok(call) = sol::tokens::approveCall::abi_decode(head) {
                if contracts.is_settlement(call.spender) {
                    if let Some(intent) = decode_intent_tail(tail) {
                        return Some(Decoded {
                            intent,
                            origin: Origin::Approval,
                        });
                    }
                }
            }
        }
        if head.starts_with(&sol::tokens::depositAndApproveCall::SELECTOR)
            && to == Some(contracts.wrapped_native)
        {
            if let Ok(call) = sol::tokens::depositAndApproveCall::abi_decode(head) {
                if contracts.is_settlement(call.spender) {
                    if let Some(intent) = decode_intent_tail(tail) {
                        return Some(Decoded {
                            intent,
                            origin: Origin::DepositAndApprove,
                        });
                    }
                }
            }
        }
    }

    let intent = decode_intent_tail(input)?;
    Some(Decoded {
        intent,
        origin: Origin::Direct,
    })
}

/// The on-chain fill state of an intent.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntentStatus {
    pub is_validated: bool,
    pub is_cancelled: bool,
    pub amount_filled: u128,
}

/// Calldata for the settlement contract's `intentStatus` read. The signature
/// is identical across both protocol variants.
pub fn encode_intent_status(hash: intent::Hash) -> Vec<u8> {
    sol::erc20::intentStatusCall { intentHash: hash.0 }.abi_encode()
}

pub fn decode_intent_status(data: &[u8]) -> Result<IntentStatus, Error> {
    let decoded =
        sol::erc20::intentStatusCall::abi_decode_returns(data).map_err(|_| Error::Status)?;
    Ok(IntentStatus {
        is_validated: decoded.isValidated,
        is_cancelled: decoded.isCancelled,
        amount_filled: decoded.amountFilled,
    })
}

/// Everything needed to encode the settlement call for a fill.
pub struct Fill<'a> {
    pub intent: &'a Intent,
    pub fill_amount: u128,
    pub execute_amount: u128,
    pub calls: &'a [solution::Call],
    pub variant: solution::FillVariant,
    pub authorization: Option<&'a auth::Signed>,
}

/// Encodes the settlement entrypoint call for the fill's variant.
pub fn encode_fill(fill: &Fill) -> Result<Vec<u8>, Error> {
    match fill.intent.protocol() {
        Protocol::Erc20 => {
            let intent = to_sol_erc20(fill.intent);
            let solution = sol::erc20::Solution {
                fillAmount: fill.fill_amount,
                executeAmount: fill.execute_amount,
                calls: fill.calls.iter().map(to_sol_call_erc20).collect(),
            };
            Ok(match fill.variant {
                solution::FillVariant::Direct => sol::erc20::solveCall {
                    intent,
                    solution,
                    permits: vec![],
                }
                .abi_encode(),
                solution::FillVariant::OnChainAuthCheck => {
                    sol::erc20::solveWithOnChainAuthorizationCheckCall {
                        intent,
                        solution,
                        permits: vec![],
                    }
                    .abi_encode()
                }
                solution::FillVariant::SignedAuth => {
                    let auth = fill.authorization.ok_or(Error::MissingAuthorization)?;
                    sol::erc20::solveWithSignatureAuthorizationCheckCall {
                        intent,
                        solution,
                        auth: to_sol_authorization(&auth.authorization),
                        authSignature: auth.signature.clone(),
                        permits: vec![],
                    }
                    .abi_encode()
                }
            })
        }
        Protocol::Erc721 => {
            let intent = to_sol_erc721(fill.intent).ok_or(Error::MissingCriteria)?;
            let solution = sol::erc721::Solution {
                fillAmount: fill.fill_amount,
                executeAmount: fill.execute_amount,
                calls: fill.calls.iter().map(to_sol_call_erc721).collect(),
            };
            Ok(match fill.variant {
                solution::FillVariant::Direct => sol::erc721::solveCall {
                    intent,
                    solution,
                    permits: vec![],
                }
                .abi_encode(),
                solution::FillVariant::OnChainAuthCheck => {
                    sol::erc721::solveWithOnChainAuthorizationCheckCall {
                        intent,
                        solution,
                        permits: vec![],
                    }
                    .abi_encode()
                }
                solution::FillVariant::SignedAuth => {
                    let auth = fill.authorization.ok_or(Error::MissingAuthorization)?;
                    sol::erc721::solveWithSignatureAuthorizationCheckCall {
                        intent,
                        solution,
                        auth: to_sol_authorization_erc721(&auth.authorization),
                        authSignature: auth.signature.clone(),
                        permits: vec![],
                    }
                    .abi_encode()
                }
            })
        }
    }
}

/// Encodes the matchmaker-only `authorize` entrypoint call.
pub fn encode_authorize(
    protocol: Protocol,
    intents: &[Intent],
    authorizations: &[auth::Authorization],
    solver: eth::Address,
) -> Result<Vec<u8>, Error> {
    Ok(match protocol {
        Protocol::Erc20 => sol::erc20::authorizeCall {
            intents: intents.iter().map(to_sol_erc20).collect(),
            auths: authorizations.iter().map(to_sol_authorization).collect(),
            solver,
        }
        .abi_encode(),
        Protocol::Erc721 => sol::erc721::authorizeCall {
            intents: intents
                .iter()
                .map(|intent| to_sol_erc721(intent).ok_or(Error::MissingCriteria))
                .collect::<Result<_, _>>()?,
            auths: authorizations
                .iter()
                .map(to_sol_authorization_erc721)
                .collect(),
            solver,
        }
        .abi_encode(),
    })
}

fn to_sol_erc20(intent: &Intent) -> sol::erc20::Intent {
    sol::erc20::Intent {
        isBuy: intent.is_buy,
        buyToken: intent.buy_token,
        sellToken: intent.sell_token,
        maker: intent.maker,
        solver: intent.solver,
        source: intent.source,
        feeBps: intent.fee_bps,
        surplusBps: intent.surplus_bps,
        startTime: intent.start_time,
        endTime: intent.end_time,
        nonce: intent.nonce,
        isPartiallyFillable: intent.is_partially_fillable,
        isSmartOrder: intent.is_smart_order,
        isIncentivized: intent.is_incentivized,
        amount: intent.amount,
        endAmount: intent.end_amount,
        startAmountBps: intent.start_amount_bps,
        expectedAmountBps: intent.expected_amount_bps,
    }
}

fn to_sol_erc721(intent: &Intent) -> Option<sol::erc721::Intent> {
    let nft = intent.nft?;
    Some(sol::erc721::Intent {
        isBuy: intent.is_buy,
        buyToken: intent.buy_token,
        sellToken: intent.sell_token,
        maker: intent.maker,
        solver: intent.solver,
        source: intent.source,
        feeBps: intent.fee_bps,
        surplusBps: intent.surplus_bps,
        startTime: intent.start_time,
        endTime: intent.end_time,
        nonce: intent.nonce,
        isPartiallyFillable: intent.is_partially_fillable,
        isSmartOrder: intent.is_smart_order,
        isIncentivized: intent.is_incentivized,
        amount: intent.amount,
        endAmount: intent.end_amount,
        startAmountBps: intent.start_amount_bps,
        expectedAmountBps: intent.expected_amount_bps,
        isCriteriaOrder: nft.is_criteria_order,
        tokenIdOrCriteria: nft.token_id_or_criteria,
    })
}

fn to_wire_erc20(intent: &Intent) -> sol::erc20::IntentWire {
    sol::erc20::IntentWire {
        isBuy: intent.is_buy,
        buyToken: intent.buy_token,
        sellToken: intent.sell_token,
        maker: intent.maker,
        solver: intent.solver,
        source: intent.source,
        feeBps: intent.fee_bps,
        surplusBps: intent.surplus_bps,
        startTime: intent.start_time,
        endTime: intent.end_time,
        nonce: intent.nonce,
        isPartiallyFillable: intent.is_partially_fillable,
        isSmartOrder: intent.is_smart_order,
        isIncentivized: intent.is_incentivized,
        amount: intent.amount,
        endAmount: intent.end_amount,
        startAmountBps: intent.start_amount_bps,
        expectedAmountBps: intent.expected_amount_bps,
        signature: intent.signature.clone(),
    }
}

fn from_wire_erc20(wire: sol::erc20::IntentWire) -> Intent {
    Intent {
        is_buy: wire.isBuy,
        buy_token: wire.buyToken,
        sell_token: wire.sellToken,
        maker: wire.maker,
        solver: wire.solver,
        source: wire.source,
        fee_bps: wire.feeBps,
        surplus_bps: wire.surplusBps,
        start_time: wire.startTime,
        end_time: wire.endTime,
        nonce: wire.nonce,
        is_partially_fillable: wire.isPartiallyFillable,
        is_smart_order: wire.isSmartOrder,
        is_incentivized: wire.isIncentivized,
        amount: wire.amount,
        end_amount: wire.endAmount,
        start_amount_bps: wire.startAmountBps,
        expected_amount_bps: wire.expectedAmountBps,
        signature: wire.signature,
        nft: None,
    }
}

fn to_wire_erc721(intent: &Intent) -> Option<sol::erc721::IntentWire> {
    let nft = intent.nft?;
    Some(sol::erc721::IntentWire {
        isBuy: intent.is_buy,
        buyToken: intent.buy_token,
        sellToken: intent.sell_token,
        maker: intent.maker,
        solver: intent.solver,
        source: intent.source,
        feeBps: intent.fee_bps,
        surplusBps: intent.surplus_bps,
        startTime: intent.start_time,
        endTime: intent.end_time,
        nonce: intent.nonce,
        isPartiallyFillable: intent.is_partially_fillable,
        isSmartOrder: intent.is_smart_order,
        isIncentivized: intent.is_incentivized,
        amount: intent.amount,
        endAmount: intent.end_amount,
        startAmountBps: intent.start_amount_bps,
        expectedAmountBps: intent.expected_amount_bps,
        isCriteriaOrder: nft.is_criteria_order,
        tokenIdOrCriteria: nft.token_id_or_criteria,
        signature: intent.signature.clone(),
    })
}

fn from_wire_erc721(wire: sol::erc721::IntentWire) -> Intent {
    Intent {
        is_buy: wire.isBuy,
        buy_token: wire.buyToken,
        sell_token: wire.sellToken,
        maker: wire.maker,
        solver: wire.solver,
        source: wire.source,
        fee_bps: wire.feeBps,
        surplus_bps: wire.surplusBps,
        start_time: wire.startTime,
        end_time: wire.endTime,
        nonce: wire.nonce,
        is_partially_fillable: wire.isPartiallyFillable,
        is_smart_order: wire.isSmartOrder,
        is_incentivized: wire.isIncentivized,
        amount: wire.amount,
        end_amount: wire.endAmount,
        start_amount_bps: wire.startAmountBps,
        expected_amount_bps: wire.expectedAmountBps,
        signature: wire.signature,
        nft: Some(NftExtension {
            is_criteria_order: wire.isCriteriaOrder,
            token_id_or_criteria: wire.tokenIdOrCriteria,
        }),
    }
}

fn to_sol_authorization(authorization: &auth::Authorization) -> sol::erc20::Authorization {
    sol::erc20::Authorization {
        intentHash: authorization.intent_hash.0,
        solver: authorization.solver,
        fillAmountToCheck: authorization.fill_amount_to_check,
        executeAmountToCheck: authorization.execute_amount_to_check,
        blockDeadline: authorization.block_deadline,
    }
}

fn to_sol_authorization_erc721(authorization: &auth::Authorization) -> sol::erc721::Authorization {
    sol::erc721::Authorization {
        intentHash: authorization.intent_hash.0,
        solver: authorization.solver,
        fillAmountToCheck: authorization.fill_amount_to_check,
        executeAmountToCheck: authorization.execute_amount_to_check,
        blockDeadline: authorization.block_deadline,
    }
}

fn to_sol_call_erc20(call: &solution::Call) -> sol::erc20::Call {
    sol::erc20::Call {
        to: call.to,
        data: call.data.clone().into(),
        value: call.value,
    }
}

fn to_sol_call_erc721(call: &solution::Call) -> sol::erc721::Call {
    sol::erc721::Call {
        to: call.to,
        data: call.data.clone().into(),
        value: call.value,
    }
}

#[cfg(test)]
mod tests {
    use {super::*, alloy::primitives::U256};

    fn contracts() -> Contracts {
        Contracts::for_chain(eth::ChainId::Mainnet)
    }

    fn intent() -> Intent {
        Intent {
            is_buy: false,
            buy_token: eth::Address::repeat_byte(0xaa),
            sell_token: eth::Address::repeat_byte(0xbb),
            maker: eth::Address::repeat_byte(0xcc),
            solver: eth::Address::ZERO,
            source: eth::Address::repeat_byte(0xdd),
            fee_bps: 30,
            surplus_bps: 100,
            start_time: 1_700_000_000,
            end_time: 1_700_000_600,
            nonce: U256::from(7),
            is_partially_fillable: false,
            is_smart_order: false,
            is_incentivized: false,
            amount: 10_u128.pow(18),
            end_amount: 3_000_000_000,
            start_amount_bps: 500,
            expected_amount_bps: 200,
            signature: vec![0x11; 65].into(),
            nft: None,
        }
    }

    fn nft_intent() -> Intent {
        Intent {
            is_buy: true,
            nft: Some(NftExtension {
                is_criteria_order: true,
                token_id_or_criteria: U256::ZERO,
            }),
            ..intent()
        }
    }

    #[test]
    fn intent_tail_round_trips() {
        for intent in [intent(), nft_intent()] {
            let encoded = encode_intent_tail(&intent);
            assert_eq!(decode_intent_tail(&encoded), Some(intent));
        }
    }

    #[test]
    fn intent_hash_is_deterministic_and_field_sensitive() {
        let base = intent();
        let hash = intent_hash(&base, eth::ChainId::Mainnet, &contracts());
        assert_eq!(hash, intent_hash(&base, eth::ChainId::Mainnet, &contracts()));

        let mutations = [
            Intent {
                is_buy: true,
                ..base.clone()
            },
            Intent {
                fee_bps: 31,
                ..base.clone()
            },
            Intent {
                nonce: U256::from(8),
                ..base.clone()
            },
            Intent {
                end_amount: base.end_amount + 1,
                ..base.clone()
            },
        ];
        for mutated in mutations {
            assert_ne!(hash, intent_hash(&mutated, eth::ChainId::Mainnet, &contracts()));
        }

        // The hash also binds the chain and the protocol variant.
        assert_ne!(hash, intent_hash(&base, eth::ChainId::Goerli, &contracts()));
        assert_ne!(
            hash,
            intent_hash(&nft_intent(), eth::ChainId::Mainnet, &contracts())
        );
    }

    #[test]
    fn signing_recovers_the_maker() {
        let signer = PrivateKeySigner::random();
        let mut intent = Intent {
            maker: signer.address(),
            ..intent()
        };
        intent.signature =
            sign_intent(&signer, &intent, eth::ChainId::Mainnet, &contracts()).unwrap();

        let digest = intent_hash(&intent, eth::ChainId::Mainnet, &contracts()).0;
        assert_eq!(
            recover_signer(digest, &intent.signature),
            Some(intent.maker)
        );
    }

    #[test]
    fn authorization_signing_recovers_the_matchmaker() {
        let signer = PrivateKeySigner::random();
        let authorization = auth::Authorization {
            intent_hash: intent_hash(&intent(), eth::ChainId::Mainnet, &contracts()),
            solver: eth::Address::repeat_byte(0x42),
            fill_amount_to_check: 10_u128.pow(18),
            execute_amount_to_check: 3_000_000_000,
            block_deadline: 18_000_000,
        };
        let signature = sign_authorization(
            &signer,
            &authorization,
            Protocol::Erc20,
            eth::ChainId::Mainnet,
            &contracts(),
        )
        .unwrap();
        let digest =
            authorization_hash(&authorization, Protocol::Erc20, eth::ChainId::Mainnet, &contracts());
        assert_eq!(recover_signer(digest, &signature), Some(signer.address()));
    }

    #[test]
    fn entry_matcher_recognizes_approval_carriers() {
        let contracts = contracts();
        let intent = intent();

        let mut input = sol::tokens::approveCall {
            spender: contracts.settlement_erc20,
            amount: U256::MAX,
        }
        .abi_encode();
        input.extend(encode_intent_tail(&intent));

        let decoded = match_entry(Some(intent.sell_token), &input, &contracts).unwrap();
        assert_eq!(decoded.origin, Origin::Approval);
        assert_eq!(decoded.intent, intent);
    }

    #[test]
    fn entry_matcher_recognizes_wrapping_carriers() {
        let contracts = contracts();
        let intent = intent();

        let mut input = sol::tokens::depositAndApproveCall {
            spender: contracts.settlement_erc20,
            amount: U256::from(10_u128.pow(18)),
        }
        .abi_encode();
        input.extend(encode_intent_tail(&intent));

        let decoded = match_entry(Some(contracts.wrapped_native), &input, &contracts).unwrap();
        assert_eq!(decoded.origin, Origin::DepositAndApprove);
    }

    #[test]
    fn entry_matcher_falls_back_to_direct_submissions() {
        let contracts = contracts();
        let intent = nft_intent();

        let input = encode_intent_tail(&intent);
        let decoded = match_entry(Some(contracts.settlement_erc721), &input, &contracts).unwrap();
        assert_eq!(decoded.origin, Origin::Direct);
        assert_eq!(decoded.intent, intent);
    }

    #[test]
    fn entry_matcher_swallows_garbage() {
        let contracts = contracts();
        assert!(match_entry(None, &[], &contracts).is_none());
        assert!(match_entry(None, &[0xde, 0xad, 0xbe, 0xef], &contracts).is_none());

        // An approval to an unrelated spender with a valid tail is not ours.
        let mut input = sol::tokens::approveCall {
            spender: eth::Address::repeat_byte(0x99),
            amount: U256::MAX,
        }
        .abi_encode();
        input.extend(encode_intent_tail(&intent()));
        assert!(match_entry(None, &input, &contracts).is_none());
    }
}

//! Generated Solidity types for the settlement contracts and the token
//! helpers the solver interacts with.
//!
//! The two protocol variants verify against different settlement contracts
//! but share the intent layout up to the NFT extension fields, so each gets
//! its own module with the full set of entrypoints.

/// ERC-20 settlement types and entrypoints.
pub mod erc20 {
    alloy::sol! {
        #[derive(Debug, PartialEq, Eq)]
        struct Intent {
            bool isBuy;
            address buyToken;
            address sellToken;
            address maker;
            address solver;
            address source;
            uint16 feeBps;
            uint16 surplusBps;
            uint32 startTime;
            uint32 endTime;
            uint256 nonce;
            bool isPartiallyFillable;
            bool isSmartOrder;
            bool isIncentivized;
            uint128 amount;
            uint128 endAmount;
            uint16 startAmountBps;
            uint16 expectedAmountBps;
        }

        /// The intent as it travels appended to approval calldata.
        #[derive(Debug, PartialEq, Eq)]
        struct IntentWire {
            bool isBuy;
            address buyToken;
            address sellToken;
            address maker;
            address solver;
            address source;
            uint16 feeBps;
            uint16 surplusBps;
            uint32 startTime;
            uint32 endTime;
            uint256 nonce;
            bool isPartiallyFillable;
            bool isSmartOrder;
            bool isIncentivized;
            uint128 amount;
            uint128 endAmount;
            uint16 startAmountBps;
            uint16 expectedAmountBps;
            bytes signature;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct Authorization {
            bytes32 intentHash;
            address solver;
            uint128 fillAmountToCheck;
            uint128 executeAmountToCheck;
            uint32 blockDeadline;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct Call {
            address to;
            bytes data;
            uint256 value;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct Solution {
            uint128 fillAmount;
            uint128 executeAmount;
            Call[] calls;
        }

        function solve(Intent intent, Solution solution, bytes[] permits);
        function solveWithOnChainAuthorizationCheck(
            Intent intent,
            Solution solution,
            bytes[] permits
        );
        function solveWithSignatureAuthorizationCheck(
            Intent intent,
            Solution solution,
            Authorization auth,
            bytes authSignature,
            bytes[] permits
        );
        function authorize(Intent[] intents, Authorization[] auths, address solver);
        function intentStatus(bytes32 intentHash)
            returns (bool isValidated, bool isCancelled, uint128 amountFilled);
    }
}

/// ERC-721 settlement types and entrypoints. The intent appends the criteria
/// fields; everything else mirrors the ERC-20 variant.
pub mod erc721 {
    alloy::sol! {
        #[derive(Debug, PartialEq, Eq)]
        struct Intent {
            bool isBuy;
            address buyToken;
            address sellToken;
            address maker;
            address solver;
            address source;
            uint16 feeBps;
            uint16 surplusBps;
            uint32 startTime;
            uint32 endTime;
            uint256 nonce;
            bool isPartiallyFillable;
            bool isSmartOrder;
            bool isIncentivized;
            uint128 amount;
            uint128 endAmount;
            uint16 startAmountBps;
            uint16 expectedAmountBps;
            bool isCriteriaOrder;
            uint256 tokenIdOrCriteria;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct IntentWire {
            bool isBuy;
            address buyToken;
            address sellToken;
            address maker;
            address solver;
            address source;
            uint16 feeBps;
            uint16 surplusBps;
            uint32 startTime;
            uint32 endTime;
            uint256 nonce;
            bool isPartiallyFillable;
            bool isSmartOrder;
            bool isIncentivized;
            uint128 amount;
            uint128 endAmount;
            uint16 startAmountBps;
            uint16 expectedAmountBps;
            bool isCriteriaOrder;
            uint256 tokenIdOrCriteria;
            bytes signature;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct Authorization {
            bytes32 intentHash;
            address solver;
            uint128 fillAmountToCheck;
            uint128 executeAmountToCheck;
            uint32 blockDeadline;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct Call {
            address to;
            bytes data;
            uint256 value;
        }

        #[derive(Debug, PartialEq, Eq)]
        struct Solution {
            uint128 fillAmount;
            uint128 executeAmount;
            Call[] calls;
        }

        function solve(Intent intent, Solution solution, bytes[] permits);
        function solveWithOnChainAuthorizationCheck(
            Intent intent,
            Solution solution,
            bytes[] permits
        );
        function solveWithSignatureAuthorizationCheck(
            Intent intent,
            Solution solution,
            Authorization auth,
            bytes authSignature,
            bytes[] permits
        );
        function authorize(Intent[] intents, Authorization[] auths, address solver);
        function intentStatus(bytes32 intentHash)
            returns (bool isValidated, bool isCancelled, uint128 amountFilled);
    }
}

/// Token and helper contract entrypoints.
pub mod tokens {
    alloy::sol! {
        function approve(address spender, uint256 amount);
        function transfer(address to, uint256 amount);
        function transferFrom(address from, address to, uint256 tokenId);
        function balanceOf(address owner) returns (uint256);
        function allowance(address owner, address spender) returns (uint256);
        function setApprovalForAll(address operator, bool approved);

        /// Wrapped-native helper: wraps the attached value and approves the
        /// spender in one call.
        function depositAndApprove(address spender, uint256 amount);
        function withdraw(uint256 amount);
    }
}

/// The canonical permit-2 singleton's direct allowance entrypoint. Kept in
/// its own module so the selector doesn't collide with the ERC-20 `approve`.
pub mod permit2 {
    alloy::sol! {
        function approve(address token, address spender, uint160 amount, uint48 expiration);
    }
}

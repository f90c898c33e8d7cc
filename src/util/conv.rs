//! Conversion utilities.

use {
    alloy::primitives::U256,
    bigdecimal::{num_bigint::ToBigInt, BigDecimal},
    num::{BigInt, BigUint},
};

pub fn biguint_to_u256(i: &BigUint) -> Option<U256> {
    let bytes = i.to_bytes_be();
    if bytes.len() > 32 {
        return None;
    }
    Some(U256::from_be_slice(&bytes))
}

pub fn u256_to_biguint(i: &U256) -> BigUint {
    BigUint::from_bytes_be(&i.to_be_bytes::<32>())
}

pub fn u256_to_bigdecimal(i: &U256) -> BigDecimal {
    BigDecimal::new(u256_to_biguint(i).into(), 0)
}

pub fn bigint_to_u256(i: &BigInt) -> Option<U256> {
    if i.sign() == num::bigint::Sign::Minus {
        return None;
    }
    biguint_to_u256(i.magnitude())
}

/// Converts a `BigDecimal` to a `U256`, truncating any fractional part.
pub fn bigdecimal_to_u256(d: &BigDecimal) -> Option<U256> {
    let d = d.with_scale(0).to_bigint()?;
    bigint_to_u256(&d)
}

/// Converts an amount of token atoms into native wei given the price of one
/// whole token in wei and the token's decimals. Truncates sub-wei dust.
pub fn token_to_native(atoms: &U256, price: &BigDecimal, decimals: u8) -> Option<U256> {
    let value = u256_to_bigdecimal(atoms) * price / BigDecimal::new(1.into(), -i64::from(decimals));
    bigdecimal_to_u256(&value)
}

/// Converts an amount of native wei into token atoms given the price of one
/// whole token in wei and the token's decimals.
pub fn native_to_token(wei: &U256, price: &BigDecimal, decimals: u8) -> Option<U256> {
    if price == &BigDecimal::from(0) {
        return None;
    }
    let value = u256_to_bigdecimal(wei) * BigDecimal::new(1.into(), -i64::from(decimals)) / price;
    bigdecimal_to_u256(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u256_decimal_round_trips() {
        for value in [0_u128, 1, 42, 10_u128.pow(27)] {
            let u = U256::from(value);
            assert_eq!(bigdecimal_to_u256(&u256_to_bigdecimal(&u)), Some(u));
        }
    }

    #[test]
    fn negative_decimals_do_not_convert() {
        assert_eq!(bigdecimal_to_u256(&"-1".parse().unwrap()), None);
    }

    #[test]
    fn token_amounts_convert_through_prices() {
        // 1000 USDC (6 decimals) at 500_000 gwei per USDC.
        let price = BigDecimal::from(500_000_000_000_000_u64);
        let atoms = U256::from(1_000_000_000_u64);
        let wei = token_to_native(&atoms, &price, 6).unwrap();
        assert_eq!(wei, U256::from(500_000_000_000_000_000_u128));
        assert_eq!(native_to_token(&wei, &price, 6), Some(atoms));
    }
}

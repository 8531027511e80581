//! Conversion helpers for on-chain field encodings.
//!
//! Ledger payloads carry addresses as hex strings and integer fields
//! (sequence numbers, prices, balances) as decimal strings so they survive
//! JSON without precision loss. Everything numeric decodes to `BigUint`;
//! floats are never used for monetary values.

use num_bigint::BigUint;
use num_traits::Num;

/// Normalize an on-chain address: lowercase, 0x-prefixed.
///
/// Addresses are used as natural keys, so every handler must store and
/// compare them in the same form.
pub fn normalize_address(addr: &str) -> String {
    let trimmed = addr.trim();
    let stripped = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    format!("0x{}", stripped.to_lowercase())
}

/// Parse an arbitrary-precision unsigned integer from its decimal string
/// encoding. Sequence numbers on long-running chains can exceed u64.
pub fn parse_biguint(s: &str) -> Option<BigUint> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    BigUint::from_str_radix(trimmed, 10).ok()
}

/// Render a `BigUint` back to its decimal string encoding for storage.
pub fn biguint_to_string(v: &BigUint) -> String {
    v.to_str_radix(10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address("0xABcD12"), "0xabcd12");
        assert_eq!(normalize_address("ABcD12"), "0xabcd12");
        assert_eq!(normalize_address("  0Xff00  "), "0xff00");
    }

    #[test]
    fn test_parse_biguint_beyond_u64() {
        // 2^64 = 18446744073709551616, one past u64::MAX
        let v = parse_biguint("18446744073709551616").unwrap();
        assert_eq!(biguint_to_string(&v), "18446744073709551616");
    }

    #[test]
    fn test_parse_biguint_rejects_garbage() {
        assert!(parse_biguint("").is_none());
        assert!(parse_biguint("12abc").is_none());
        assert!(parse_biguint("-5").is_none());
    }
}

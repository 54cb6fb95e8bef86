//! TON amounts with nanoton precision.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TonbagError;

/// Nanotons per TON.
pub const NANOTONS_PER_TON: u64 = 1_000_000_000;

const MAX_FRACTION_DIGITS: usize = 9;

/// An amount of TON stored as an integer number of nanotons.
///
/// Parsed from the decimal notation users type (`"0.5"`, `"12"`,
/// `"1.000000001"`); rendered back without trailing zeros.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct TonAmount(u64);

impl TonAmount {
    /// Zero TON.
    pub const ZERO: Self = Self(0);

    /// Build from a nanoton count.
    pub const fn from_nanotons(nanotons: u64) -> Self {
        Self(nanotons)
    }

    /// Nanoton count.
    pub const fn nanotons(self) -> u64 {
        self.0
    }

    /// Round half up to `places` decimal places of a TON.
    pub fn round_to_places(self, places: u32) -> Self {
        let places = places.min(MAX_FRACTION_DIGITS as u32);
        let step = 10u64.pow(MAX_FRACTION_DIGITS as u32 - places);
        let remainder = self.0 % step;
        let down = self.0 - remainder;
        if remainder * 2 >= step {
            Self(down.saturating_add(step))
        } else {
            Self(down)
        }
    }

    /// Parse a non-negative decimal TON amount.
    pub fn parse(raw: &str) -> Result<Self, TonbagError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TonbagError::invalid("amount is empty"));
        }

        let (whole, fraction) = match trimmed.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (trimmed, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(TonbagError::invalid(format!("invalid amount: {trimmed}")));
        }
        if !whole.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(TonbagError::invalid(format!("invalid amount: {trimmed}")));
        }
        if fraction.len() > MAX_FRACTION_DIGITS {
            return Err(TonbagError::invalid(format!(
                "amount has more than {MAX_FRACTION_DIGITS} decimal places"
            )));
        }

        let whole: u64 = if whole.is_empty() {
            0
        } else {
            whole
                .parse()
                .map_err(|_| TonbagError::invalid(format!("amount out of range: {trimmed}")))?
        };
        let mut fraction_nanos: u64 = 0;
        for (idx, digit) in fraction.bytes().enumerate() {
            let scale = 10u64.pow((MAX_FRACTION_DIGITS - 1 - idx) as u32);
            fraction_nanos += u64::from(digit - b'0') * scale;
        }

        whole
            .checked_mul(NANOTONS_PER_TON)
            .and_then(|n| n.checked_add(fraction_nanos))
            .map(Self)
            .ok_or_else(|| TonbagError::invalid(format!("amount out of range: {trimmed}")))
    }
}

impl fmt::Display for TonAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / NANOTONS_PER_TON;
        let fraction = self.0 % NANOTONS_PER_TON;
        if fraction == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{fraction:09}");
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl FromStr for TonAmount {
    type Err = TonbagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TonAmount {
    type Error = TonbagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TonAmount> for String {
    fn from(value: TonAmount) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_common_forms() {
        assert_eq!(TonAmount::parse("0.5").unwrap().nanotons(), 500_000_000);
        assert_eq!(TonAmount::parse("12").unwrap().nanotons(), 12_000_000_000);
        assert_eq!(TonAmount::parse(".25").unwrap().nanotons(), 250_000_000);
        assert_eq!(TonAmount::parse("1.000000001").unwrap().nanotons(), 1_000_000_001);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for raw in ["", ".", "-1", "1.2.3", "abc", "1e9", "0.0000000001"] {
            assert!(TonAmount::parse(raw).is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn test_parse_rejects_overflow() {
        assert!(TonAmount::parse("99999999999999999999").is_err());
    }

    #[test]
    fn test_display_trims_zeros() {
        assert_eq!(TonAmount::from_nanotons(500_000_000).to_string(), "0.5");
        assert_eq!(TonAmount::from_nanotons(3_000_000_000).to_string(), "3");
        assert_eq!(TonAmount::from_nanotons(1).to_string(), "0.000000001");
    }

    #[test]
    fn test_round_to_places() {
        let amount = TonAmount::parse("1.234567499").unwrap();
        assert_eq!(amount.round_to_places(6).to_string(), "1.234567");
        let amount = TonAmount::parse("1.2345675").unwrap();
        assert_eq!(amount.round_to_places(6).to_string(), "1.234568");
        assert_eq!(TonAmount::parse("0.9999999").unwrap().round_to_places(6).to_string(), "1");
        assert_eq!(TonAmount::from_nanotons(7).round_to_places(9).nanotons(), 7);
        assert_eq!(TonAmount::parse("2.5").unwrap().round_to_places(0).to_string(), "3");
    }

    proptest! {
        #[test]
        fn prop_display_parses_back(n in 0u64..u64::MAX / 2) {
            let amount = TonAmount::from_nanotons(n);
            prop_assert_eq!(TonAmount::parse(&amount.to_string()).unwrap(), amount);
        }
    }
}

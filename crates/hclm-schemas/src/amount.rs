//! Base-unit amounts.
//!
//! # Motivation
//!
//! Every quantity the ledger exposes as `uint256` (token balances, debt,
//! collateral wei, allowances, reward index) is held as an [`Amount`].
//! Mixing base units with display units is the classic client bug, so the
//! newtype has no `From<u128>` impl and no implicit arithmetic operators:
//! callers pick `checked_*` or `saturating_*` explicitly.
//!
//! # Range
//!
//! The wire type is 256 bits wide; `Amount` holds 128. At 18 decimals that is
//! ~3.4e20 whole tokens, well beyond any supply this client talks to. A wire
//! value that does not fit is rejected at the decoding boundary rather than
//! truncated.
//!
//! # Decimal conversion
//!
//! [`Amount::parse_units`] / [`Amount::format_units`] convert between decimal
//! text (`"0.25"`) and base units. Both the token and ETH use
//! [`TOKEN_DECIMALS`].

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Decimals used by both the token and native ETH.
pub const TOKEN_DECIMALS: u32 = 18;

/// Largest decimal exponent representable in `u128` (`10^38 < 2^128`).
const MAX_DECIMALS: u32 = 38;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount is empty")]
    Empty,
    #[error("amount '{0}' is not a non-negative decimal number")]
    InvalidDigit(String),
    #[error("amount '{text}' has more than {decimals} fractional digits")]
    TooPrecise { text: String, decimals: u32 },
    #[error("amount '{0}' overflows the supported range")]
    Overflow(String),
    #[error("unsupported decimals {0} (max {MAX_DECIMALS})")]
    UnsupportedDecimals(u32),
}

/// An unsigned ledger quantity in base units (wei for ETH, 1e-18 for tokens).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    /// The smallest non-zero amount (one base unit).
    pub const ONE: Amount = Amount(1);

    pub const MAX: Amount = Amount(u128::MAX);

    #[inline]
    pub const fn new(raw: u128) -> Self {
        Amount(raw)
    }

    #[inline]
    pub const fn raw(self) -> u128 {
        self.0
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn checked_add(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_add(rhs.0).map(Amount)
    }

    #[inline]
    pub fn checked_sub(self, rhs: Amount) -> Option<Amount> {
        self.0.checked_sub(rhs.0).map(Amount)
    }

    #[inline]
    pub fn saturating_add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }

    /// Subtraction clamped at zero.
    #[inline]
    pub fn saturating_sub(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_sub(rhs.0))
    }

    /// `self * mul / div`, or `None` on overflow or a zero divisor.
    pub fn checked_mul_div(self, mul: u128, div: u128) -> Option<Amount> {
        if div == 0 {
            return None;
        }
        self.0.checked_mul(mul).map(|p| Amount(p / div))
    }

    /// Parse decimal text (`"1"`, `"0.05"`, `".5"`) scaled by `10^decimals`.
    ///
    /// Rejects signs, exponents, and fractional digits beyond `decimals`
    /// (no silent rounding of operator input).
    pub fn parse_units(text: &str, decimals: u32) -> Result<Amount, AmountError> {
        let scale = pow10(decimals)?;
        let t = text.trim().replace('_', "");
        if t.is_empty() {
            return Err(AmountError::Empty);
        }

        let (whole, frac) = match t.split_once('.') {
            Some((w, f)) => (w, f),
            None => (t.as_str(), ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(AmountError::InvalidDigit(text.to_string()));
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(AmountError::InvalidDigit(text.to_string()));
        }
        if frac.len() as u32 > decimals {
            return Err(AmountError::TooPrecise {
                text: text.to_string(),
                decimals,
            });
        }

        let overflow = || AmountError::Overflow(text.to_string());
        let whole_v: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let frac_v: u128 = if frac.is_empty() {
            0
        } else {
            let digits: u128 = frac.parse().map_err(|_| overflow())?;
            digits
                .checked_mul(pow10(decimals - frac.len() as u32)?)
                .ok_or_else(overflow)?
        };

        whole_v
            .checked_mul(scale)
            .and_then(|w| w.checked_add(frac_v))
            .map(Amount)
            .ok_or_else(overflow)
    }

    /// Render as decimal text with trailing fractional zeros trimmed.
    pub fn format_units(self, decimals: u32) -> String {
        let scale = match pow10(decimals) {
            Ok(s) => s,
            Err(_) => return self.0.to_string(),
        };
        let whole = self.0 / scale;
        let frac = self.0 % scale;
        if frac == 0 {
            return whole.to_string();
        }
        let frac_s = format!("{:0width$}", frac, width = decimals as usize);
        format!("{}.{}", whole, frac_s.trim_end_matches('0'))
    }
}

fn pow10(decimals: u32) -> Result<u128, AmountError> {
    if decimals > MAX_DECIMALS {
        return Err(AmountError::UnsupportedDecimals(decimals));
    }
    Ok(10u128.pow(decimals))
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Base-unit integer text (no decimal point).
impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::parse_units(s, 0)
    }
}

// Serialized as a base-unit decimal string: JSON numbers cannot carry u128.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl<'de> Visitor<'de> for AmountVisitor {
            type Value = Amount;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a base-unit amount as a decimal string or unsigned integer")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
                Ok(Amount(v as u128))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
                u128::try_from(v)
                    .map(Amount)
                    .map_err(|_| E::custom(format!("negative amount {v}")))
            }

            fn visit_u128<E: de::Error>(self, v: u128) -> Result<Amount, E> {
                Ok(Amount(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
                v.parse::<Amount>().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

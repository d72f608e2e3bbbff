//! Token amounts
//!
//! Balances, values and gas prices are arbitrary-precision attoFIL amounts.

use fvm_shared::econ::TokenAmount as FvmTokenAmount;
use num_bigint::{BigInt, Sign};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of decimal places between FIL and attoFIL
pub const FIL_PRECISION: usize = 18;

/// Errors that can occur when parsing token amounts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TokenError {
    #[error("Invalid token amount: {0}")]
    InvalidAmount(String),
    #[error("Too many decimal places in {0}")]
    TooPrecise(String),
}

/// An amount of attoFIL
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAmount(FvmTokenAmount);

impl TokenAmount {
    pub fn zero() -> Self {
        Self::from_atto(0)
    }

    /// Create an amount from attoFIL
    pub fn from_atto(atto: impl Into<BigInt>) -> Self {
        Self(FvmTokenAmount::from_atto(atto))
    }

    /// Create an amount from whole FIL
    pub fn from_whole(fil: impl Into<BigInt>) -> Self {
        Self(FvmTokenAmount::from_whole(fil))
    }

    pub fn atto(&self) -> &BigInt {
        self.0.atto()
    }

    pub fn is_zero(&self) -> bool {
        self.atto().sign() == Sign::NoSign
    }

    pub fn is_positive(&self) -> bool {
        self.atto().sign() == Sign::Plus
    }

    pub fn is_negative(&self) -> bool {
        self.atto().sign() == Sign::Minus
    }

    /// Parse a human-entered amount: `10`, `0.5`, `1.25 FIL` or `42 attofil`
    pub fn parse_fil(input: &str) -> Result<Self, TokenError> {
        let lower = input.trim().to_ascii_lowercase();
        if let Some(atto) = lower.strip_suffix("attofil") {
            return atto.trim().parse();
        }
        let number = lower.strip_suffix("fil").unwrap_or(&lower).trim();
        let (negative, digits) = match number.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, number),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));
        if (whole.is_empty() && frac.is_empty())
            || !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit())
        {
            return Err(TokenError::InvalidAmount(input.to_string()));
        }
        if frac.len() > FIL_PRECISION {
            return Err(TokenError::TooPrecise(input.to_string()));
        }

        let whole = if whole.is_empty() { "0" } else { whole };
        let padded = format!("{}{:0<width$}", whole, frac, width = FIL_PRECISION);
        let magnitude = BigInt::parse_bytes(padded.as_bytes(), 10)
            .ok_or_else(|| TokenError::InvalidAmount(input.to_string()))?;
        Ok(Self::from_atto(if negative { -magnitude } else { magnitude }))
    }
}

impl Default for TokenAmount {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<FvmTokenAmount> for TokenAmount {
    fn from(amount: FvmTokenAmount) -> Self {
        Self(amount)
    }
}

impl From<TokenAmount> for FvmTokenAmount {
    fn from(amount: TokenAmount) -> Self {
        amount.0
    }
}

impl From<u64> for TokenAmount {
    fn from(atto: u64) -> Self {
        Self::from_atto(atto)
    }
}

/// Parses a plain attoFIL integer, the form nodes use in JSON
impl FromStr for TokenAmount {
    type Err = TokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(TokenError::InvalidAmount(s.to_string()));
        }
        BigInt::parse_bytes(s.as_bytes(), 10)
            .map(Self::from_atto)
            .ok_or_else(|| TokenError::InvalidAmount(s.to_string()))
    }
}

/// Formats as whole FIL with trailing zeros trimmed, e.g. `1.5 FIL`
impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let magnitude = self.atto().magnitude().to_string();
        let digits = format!("{:0>width$}", magnitude, width = FIL_PRECISION + 1);
        let (whole, frac) = digits.split_at(digits.len() - FIL_PRECISION);
        let frac = frac.trim_end_matches('0');
        let sign = if self.is_negative() { "-" } else { "" };
        if frac.is_empty() {
            write!(f, "{}{} FIL", sign, whole)
        } else {
            write!(f, "{}{}.{} FIL", sign, whole, frac)
        }
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.atto().to_string())
        } else {
            self.0.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            let s = String::deserialize(deserializer)?;
            s.parse().map_err(de::Error::custom)
        } else {
            FvmTokenAmount::deserialize(deserializer).map(Self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fil_forms() {
        assert_eq!(TokenAmount::parse_fil("10").unwrap(), TokenAmount::from_whole(10));
        assert_eq!(
            TokenAmount::parse_fil("0.5").unwrap(),
            TokenAmount::from_atto(500_000_000_000_000_000u64)
        );
        assert_eq!(
            TokenAmount::parse_fil("1.25 FIL").unwrap(),
            TokenAmount::from_atto(1_250_000_000_000_000_000u64)
        );
        assert_eq!(TokenAmount::parse_fil("42 attofil").unwrap(), TokenAmount::from(42));
        assert_eq!(TokenAmount::parse_fil(".1").unwrap(), TokenAmount::from_atto(100_000_000_000_000_000u64));
    }

    #[test]
    fn test_parse_fil_rejects_garbage() {
        assert!(TokenAmount::parse_fil("").is_err());
        assert!(TokenAmount::parse_fil("abc").is_err());
        assert!(TokenAmount::parse_fil("1.2.3").is_err());
        assert!(matches!(
            TokenAmount::parse_fil("0.0000000000000000001"),
            Err(TokenError::TooPrecise(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(TokenAmount::from_whole(10).to_string(), "10 FIL");
        assert_eq!(TokenAmount::parse_fil("0.07").unwrap().to_string(), "0.07 FIL");
        assert_eq!(TokenAmount::from(1).to_string(), "0.000000000000000001 FIL");
        assert_eq!(TokenAmount::zero().to_string(), "0 FIL");
    }

    #[test]
    fn test_cbor_is_signed_magnitude_bytes() {
        let cbor = |amount: &TokenAmount| fvm_ipld_encoding::to_vec(amount).unwrap();
        assert_eq!(cbor(&TokenAmount::zero()), vec![0x40]);
        assert_eq!(cbor(&TokenAmount::from(256)), vec![0x43, 0x00, 0x01, 0x00]);
        let negative = TokenAmount::from_atto(-5);
        assert_eq!(cbor(&negative), vec![0x42, 0x01, 0x05]);

        let decoded: TokenAmount = fvm_ipld_encoding::from_slice(&[0x42, 0x01, 0x05]).unwrap();
        assert_eq!(decoded, negative);
        assert!(fvm_ipld_encoding::from_slice::<TokenAmount>(&[0x41, 0x02]).is_err());
    }

    #[test]
    fn test_converts_to_shared_amount() {
        let ours = TokenAmount::parse_fil("1.5").unwrap();
        let shared: FvmTokenAmount = ours.clone().into();
        assert_eq!(shared, FvmTokenAmount::from_atto(1_500_000_000_000_000_000u64));
        assert_eq!(TokenAmount::from(shared), ours);
    }

    #[test]
    fn test_json_is_atto_string() {
        let amount = TokenAmount::from_whole(1);
        assert_eq!(
            serde_json::to_string(&amount).unwrap(),
            "\"1000000000000000000\""
        );
        let back: TokenAmount = serde_json::from_str("\"1000000000000000000\"").unwrap();
        assert_eq!(back, amount);
    }
}

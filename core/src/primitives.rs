//! Value types shared by every ledger component.
//!
//! - [`Address`]: a 20-byte account identifier, written as `0x`-prefixed hex
//! - [`Wei`]: an amount of native currency, always integral and checked
//! - [`Percentage`]: an integer in `0..=100`
//!
//! All arithmetic on [`Wei`] is checked or floor-rounded explicitly; nothing
//! in this module wraps silently.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of wei in one ether.
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Decimal places of the ether unit.
const ETHER_DECIMALS: usize = 18;

/// Errors produced while parsing or validating primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrimitiveError {
    /// The string is not a 20-byte hex address
    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    /// The string is not a valid wei or ether amount
    #[error("invalid amount '{0}'")]
    InvalidAmount(String),

    /// A percentage above 100
    #[error("percentage {0} is out of range 0..=100")]
    PercentageOutOfRange(u8),
}

/// Account identifier supplied by the wallet layer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; 20]);

impl Address {
    /// The all-zero address
    pub const ZERO: Self = Self([0; 20]);

    /// Creates an address from raw bytes
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates an address whose last eight bytes hold `n` (big-endian).
    ///
    /// Handy for fixtures and demo accounts.
    #[must_use]
    pub fn from_low_u64(n: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    /// Returns the raw bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

impl FromStr for Address {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let mut bytes = [0u8; 20];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|_| PrimitiveError::InvalidAddress(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Address {
    type Error = PrimitiveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

/// Amount of native currency in wei.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Wei(u128);

impl Wei {
    /// Zero wei
    pub const ZERO: Self = Self(0);

    /// Creates an amount from raw wei
    #[must_use]
    pub const fn new(wei: u128) -> Self {
        Self(wei)
    }

    /// Creates an amount from whole ether, `None` on overflow
    #[must_use]
    pub const fn from_ether(ether: u128) -> Option<Self> {
        match ether.checked_mul(WEI_PER_ETHER) {
            Some(wei) => Some(Self(wei)),
            None => None,
        }
    }

    /// Returns the raw wei value
    #[must_use]
    pub const fn get(self) -> u128 {
        self.0
    }

    /// Checks if this amount is zero
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// `self + rhs`, `None` on overflow
    #[must_use]
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(wei) => Some(Self(wei)),
            None => None,
        }
    }

    /// `self - rhs`, `None` on underflow
    #[must_use]
    pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
        match self.0.checked_sub(rhs.0) {
            Some(wei) => Some(Self(wei)),
            None => None,
        }
    }

    /// `self - rhs`, clamped at zero
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// `self * quantity`, `None` on overflow
    #[must_use]
    pub const fn checked_mul(self, quantity: u64) -> Option<Self> {
        match self.0.checked_mul(quantity as u128) {
            Some(wei) => Some(Self(wei)),
            None => None,
        }
    }

    /// `floor(self * numerator / denominator)` without intermediate overflow
    /// when `numerator <= denominator`.
    ///
    /// Returns `None` for a zero denominator or if the result overflows.
    #[must_use]
    pub const fn mul_div_floor(self, numerator: u64, denominator: u64) -> Option<Self> {
        if denominator == 0 {
            return None;
        }
        let num = numerator as u128;
        let den = denominator as u128;
        let quotient = self.0 / den;
        let remainder = self.0 % den;
        // remainder < den and num < 2^64, so the product fits in u128
        let Some(whole) = quotient.checked_mul(num) else {
            return None;
        };
        match whole.checked_add(remainder * num / den) {
            Some(wei) => Some(Self(wei)),
            None => None,
        }
    }

    /// `floor(self * percentage / 100)`
    #[must_use]
    pub const fn percent_floor(self, percentage: Percentage) -> Self {
        let pct = percentage.0 as u128;
        Self((self.0 / 100) * pct + (self.0 % 100) * pct / 100)
    }

    /// Formats the amount as a decimal ether string, trailing zeros trimmed.
    #[must_use]
    pub fn to_ether_string(self) -> String {
        let whole = self.0 / WEI_PER_ETHER;
        let frac = self.0 % WEI_PER_ETHER;
        if frac == 0 {
            return whole.to_string();
        }
        let digits = format!("{frac:0width$}", width = ETHER_DECIMALS);
        format!("{whole}.{}", digits.trim_end_matches('0'))
    }

    /// Parses a decimal ether amount such as `"0.005"`.
    ///
    /// # Errors
    ///
    /// Returns [`PrimitiveError::InvalidAmount`] for malformed input, more
    /// than 18 decimals, or overflow.
    pub fn parse_ether(s: &str) -> Result<Self, PrimitiveError> {
        let invalid = || PrimitiveError::InvalidAmount(s.to_string());
        let trimmed = s.trim();
        let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));

        if (whole.is_empty() && frac.is_empty())
            || frac.len() > ETHER_DECIMALS
            || !whole.bytes().all(|b| b.is_ascii_digit())
            || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole_wei = if whole.is_empty() {
            0
        } else {
            whole
                .parse::<u128>()
                .ok()
                .and_then(|w| w.checked_mul(WEI_PER_ETHER))
                .ok_or_else(invalid)?
        };
        let frac_wei = if frac.is_empty() {
            0
        } else {
            format!("{frac:0<width$}", width = ETHER_DECIMALS)
                .parse::<u128>()
                .map_err(|_| invalid())?
        };

        whole_wei
            .checked_add(frac_wei)
            .map(Self)
            .ok_or_else(invalid)
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} wei", self.0)
    }
}

/// Parses either a raw wei integer (`"5000000000000000"`) or an ether amount
/// with a decimal point or unit suffix (`"0.005"`, `"0.005 ether"`, `"1eth"`).
impl FromStr for Wei {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_ascii_lowercase();

        if let Some(amount) = lower
            .strip_suffix("ether")
            .or_else(|| lower.strip_suffix("eth"))
        {
            return Self::parse_ether(amount);
        }
        if let Some(amount) = lower.strip_suffix("wei") {
            return amount
                .trim()
                .parse::<u128>()
                .map(Self)
                .map_err(|_| PrimitiveError::InvalidAmount(s.to_string()));
        }
        if trimmed.contains('.') {
            return Self::parse_ether(trimmed);
        }
        trimmed
            .parse::<u128>()
            .map(Self)
            .map_err(|_| PrimitiveError::InvalidAmount(s.to_string()))
    }
}

/// Integer percentage in `0..=100`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Percentage(u8);

impl Percentage {
    /// 100%
    pub const MAX: Self = Self(100);

    /// Creates a percentage, rejecting values above 100
    ///
    /// # Errors
    ///
    /// Returns [`PrimitiveError::PercentageOutOfRange`] if `value > 100`.
    pub const fn new(value: u8) -> Result<Self, PrimitiveError> {
        if value > 100 {
            return Err(PrimitiveError::PercentageOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Returns the raw value
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Percentage {
    type Error = PrimitiveError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Percentage> for u8 {
    fn from(percentage: Percentage) -> Self {
        percentage.0
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

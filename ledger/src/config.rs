//! Configuration for a ledger deployment.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Unset variables fall back to the default; set but unparsable variables are
//! an error rather than being silently replaced.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use turnstile_core::primitives::{Address, Percentage, Wei};

/// Deployment parameters for the token and the sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Owner of the token and the sale
    pub venue: Address,
    /// Identity of the sale, authorized on the token as minter
    pub sale_address: Address,
    /// Maximum ticket supply
    pub cap: u64,
    /// Initial per-ticket price
    pub price_wei: Wei,
    /// Share of the purchase price returned on refund
    pub refund_percentage: Percentage,
    /// Token display name
    pub token_name: String,
    /// Token ticker
    pub token_symbol: String,
    /// Per-subscriber notification buffer
    pub bus_capacity: usize,
    /// Prometheus listener; metrics are off when unset
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            venue: Address::from_low_u64(0x00ff_00a0),
            sale_address: Address::from_low_u64(0x00ff_5a1e),
            cap: 200,
            price_wei: Wei::new(5_000_000_000_000_000),
            refund_percentage: Percentage::new(80).unwrap_or(Percentage::MAX),
            token_name: "ShowBird Ticket".to_string(),
            token_symbol: "SBT".to_string(),
            bus_capacity: 256,
            metrics_addr: None,
        }
    }
}

impl LedgerConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is malformed or the result is
    /// inconsistent.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is malformed or the result is
    /// inconsistent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            venue: parse_or(&lookup, "TURNSTILE_VENUE", defaults.venue)?,
            sale_address: parse_or(&lookup, "TURNSTILE_SALE_ADDRESS", defaults.sale_address)?,
            cap: parse_or(&lookup, "TURNSTILE_CAP", defaults.cap)?,
            price_wei: parse_or(&lookup, "TURNSTILE_PRICE", defaults.price_wei)?,
            refund_percentage: match lookup("TURNSTILE_REFUND_PERCENTAGE") {
                Some(raw) => raw
                    .trim()
                    .parse::<u8>()
                    .map_err(|e| e.to_string())
                    .and_then(|value| Percentage::new(value).map_err(|e| e.to_string()))
                    .map_err(|reason| ConfigError::Invalid {
                        key: "TURNSTILE_REFUND_PERCENTAGE",
                        value: raw.clone(),
                        reason,
                    })?,
                None => defaults.refund_percentage,
            },
            token_name: lookup("TURNSTILE_TOKEN_NAME").unwrap_or(defaults.token_name),
            token_symbol: lookup("TURNSTILE_TOKEN_SYMBOL").unwrap_or(defaults.token_symbol),
            bus_capacity: parse_or(&lookup, "TURNSTILE_BUS_CAPACITY", defaults.bus_capacity)?,
            metrics_addr: lookup("METRICS_ADDR")
                .map(|raw| {
                    raw.trim().parse::<SocketAddr>().map_err(|e| {
                        ConfigError::Invalid {
                            key: "METRICS_ADDR",
                            value: raw.clone(),
                            reason: e.to_string(),
                        }
                    })
                })
                .transpose()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject deployments the ledger cannot run.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Inconsistent`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cap == 0 {
            return Err(ConfigError::Inconsistent("cap must be positive".into()));
        }
        if self.price_wei.is_zero() {
            return Err(ConfigError::Inconsistent("price must be positive".into()));
        }
        if self.venue == Address::ZERO || self.sale_address == Address::ZERO {
            return Err(ConfigError::Inconsistent(
                "venue and sale addresses must be non-zero".into(),
            ));
        }
        if self.venue == self.sale_address {
            return Err(ConfigError::Inconsistent(
                "venue and sale must have different addresses".into(),
            ));
        }
        if self.bus_capacity == 0 {
            return Err(ConfigError::Inconsistent("bus capacity must be positive".into()));
        }
        Ok(())
    }
}

fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

//! Price source interface and in-memory price feed.
//!
//! The engine only ever reads prices: `PriceSource::price` is a pure query.
//! `PriceFeed` is the in-memory implementation used by the CLI and tests.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::token::{TokenAmount, TokenId, UsdValue};
use crate::error::{Error, Result};
use crate::utils::constants::TOKEN_DECIMALS;
use crate::utils::math::value_at_price;

// ═══════════════════════════════════════════════════════════════════════════════
// PRICE
// ═══════════════════════════════════════════════════════════════════════════════

/// USD unit price of a token with its decimal precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Price scaled by `10^decimals`
    pub value: u128,
    /// Decimal precision of `value`
    pub decimals: u32,
    /// Unix timestamp when the price was recorded
    pub timestamp: u64,
}

impl Price {
    /// Create a new price
    pub fn new(value: u128, decimals: u32, timestamp: u64) -> Self {
        Self {
            value,
            decimals,
            timestamp,
        }
    }

    /// Price quoted with 18 decimals (the convention of the mock oracle)
    pub fn from_wei(value: u128) -> Self {
        Self::new(value, TOKEN_DECIMALS, 0)
    }

    /// USD value of `amount` tokens at this price
    pub fn value_of(&self, amount: TokenAmount) -> Result<UsdValue> {
        value_at_price(amount.raw(), self.value, self.decimals).map(UsdValue::from_raw)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRICE SOURCE
// ═══════════════════════════════════════════════════════════════════════════════

/// Read-only oracle interface consumed by the engine
pub trait PriceSource {
    /// Current USD price of `token`
    fn price(&self, token: &TokenId) -> Result<Price>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRICE FEED
// ═══════════════════════════════════════════════════════════════════════════════

/// In-memory price feed keyed by token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceFeed {
    /// Current price per token
    current: HashMap<TokenId, Price>,
    /// Update history (for auditing price moves)
    history: Vec<(TokenId, Price)>,
    /// Maximum history size
    max_history: usize,
}

impl Default for PriceFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceFeed {
    /// Create an empty price feed
    pub fn new() -> Self {
        Self {
            current: HashMap::new(),
            history: Vec::new(),
            max_history: 100,
        }
    }

    /// Set the price of a token
    pub fn set_price(&mut self, token: TokenId, price: Price) -> Result<()> {
        if price.value == 0 {
            return Err(Error::InvalidParameter {
                name: "price".into(),
                reason: format!("price of {} cannot be zero", token),
            });
        }

        tracing::debug!(token = %token, value = price.value, decimals = price.decimals, "price updated");

        self.history.push((token.clone(), price));
        if self.history.len() > self.max_history {
            self.history.remove(0);
        }
        self.current.insert(token, price);
        Ok(())
    }

    /// Remove a token's price (subsequent queries fail)
    pub fn remove_price(&mut self, token: &TokenId) -> Option<Price> {
        self.current.remove(token)
    }

    /// Recent price updates, oldest first
    pub fn history(&self) -> &[(TokenId, Price)] {
        &self.history
    }
}

impl PriceSource for PriceFeed {
    fn price(&self, token: &TokenId) -> Result<Price> {
        self.current
            .get(token)
            .copied()
            .ok_or_else(|| Error::PriceUnavailable(token.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::constants::TOKEN_UNIT;

    #[test]
    fn test_price_value_of() {
        let price = Price::from_wei(TOKEN_UNIT / 2);
        let value = price.value_of(TokenAmount::from_whole(9999)).unwrap();
        assert_eq!(value, UsdValue::parse("4999.5").unwrap());
    }

    #[test]
    fn test_price_with_eight_decimals() {
        let price = Price::new(150_000_000, 8, 0);
        let value = price.value_of(TokenAmount::from_whole(2)).unwrap();
        assert_eq!(value, UsdValue::from_dollars(3));
    }

    #[test]
    fn test_feed_set_and_query() {
        let mut feed = PriceFeed::new();
        let token = TokenId::new("wFTM");

        assert!(matches!(feed.price(&token), Err(Error::PriceUnavailable(_))));

        feed.set_price(token.clone(), Price::from_wei(TOKEN_UNIT)).unwrap();
        assert_eq!(feed.price(&token).unwrap().value, TOKEN_UNIT);

        feed.set_price(token.clone(), Price::from_wei(TOKEN_UNIT / 2)).unwrap();
        assert_eq!(feed.price(&token).unwrap().value, TOKEN_UNIT / 2);
        assert_eq!(feed.history().len(), 2);
    }

    #[test]
    fn test_feed_rejects_zero_price() {
        let mut feed = PriceFeed::new();
        assert!(feed.set_price(TokenId::new("wFTM"), Price::from_wei(0)).is_err());
    }

    #[test]
    fn test_remove_price() {
        let mut feed = PriceFeed::new();
        let token = TokenId::new("xFTM");
        feed.set_price(token.clone(), Price::from_wei(TOKEN_UNIT)).unwrap();
        assert!(feed.remove_price(&token).is_some());
        assert!(feed.price(&token).is_err());
    }
}

// Convert human (UI) prices/quantities into native lots and back.
// All pure arithmetic on the market's fixed decimals and lot sizes.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use super::types::OrderError;
use crate::config::MarketConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Normaliser {
    pub base_scale: Decimal,  // 10^base_decimals
    pub quote_scale: Decimal, // 10^quote_decimals
    pub base_lot_size: Decimal,
    pub quote_lot_size: Decimal,
}

impl Normaliser {
    pub fn new(market: &MarketConfig) -> Self {
        Self {
            base_scale: market.base_scale(),
            quote_scale: market.quote_scale(),
            base_lot_size: Decimal::from(market.base_lot_size),
            quote_lot_size: Decimal::from(market.quote_lot_size),
        }
    }

    /// UI price (quote per base) -> price lots, truncated toward zero.
    pub fn price_to_lots(&self, price: Decimal) -> Result<i64, OrderError> {
        let lots = price
            .checked_mul(self.quote_scale)
            .and_then(|v| v.checked_mul(self.base_lot_size))
            .zip(self.quote_lot_size.checked_mul(self.base_scale))
            .and_then(|(num, den)| num.checked_div(den));
        lots.and_then(positive_lots)
            .ok_or_else(|| OrderError::InvalidPrice(price.to_string()))
    }

    /// UI base quantity -> base lots, truncated toward zero.
    pub fn quantity_to_lots(&self, quantity: Decimal) -> Result<i64, OrderError> {
        let lots = quantity
            .checked_mul(self.base_scale)
            .and_then(|v| v.checked_div(self.base_lot_size));
        lots.and_then(positive_lots)
            .ok_or_else(|| OrderError::InvalidQuantity(quantity.to_string()))
    }

    pub fn ui_to_native(&self, price: Decimal, quantity: Decimal) -> Result<(i64, i64), OrderError> {
        Ok((self.price_to_lots(price)?, self.quantity_to_lots(quantity)?))
    }

    /// `None` when the UI value does not fit a `Decimal`.
    pub fn price_lots_to_ui(&self, lots: i64) -> Option<Decimal> {
        Decimal::from(lots)
            .checked_mul(self.quote_lot_size)?
            .checked_mul(self.base_scale)?
            .checked_div(self.base_lot_size.checked_mul(self.quote_scale)?)
    }

    pub fn quantity_lots_to_ui(&self, lots: i64) -> Option<Decimal> {
        Decimal::from(lots)
            .checked_mul(self.base_lot_size)?
            .checked_div(self.base_scale)
    }
}

fn positive_lots(lots: Decimal) -> Option<i64> {
    lots.trunc().to_i64().filter(|l| *l > 0)
}

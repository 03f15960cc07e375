use std::sync::Arc;

use rust_decimal::Decimal;

use super::address::Address;
use super::book_side::BookSide;
use super::types::{AccountRecord, MarginCache, OpenOrdersRecord};
use crate::config::MarketConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenOrders {
    pub address: Address,
    pub record: OpenOrdersRecord,
}

/// Trader account with its open-orders records resolved per basket slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub address: Address,
    pub record: AccountRecord,
    // parallel to record.basket
    pub open_orders: Vec<Option<OpenOrders>>,
}

impl Account {
    /// Account as read on its own, before any open-orders records are known.
    pub fn unresolved(address: Address, record: AccountRecord) -> Self {
        let open_orders = vec![None; record.basket.len()];
        Self { address, record, open_orders }
    }

    pub fn basket(&self) -> &[Address] {
        &self.record.basket
    }

    pub fn open_orders_at(&self, slot: usize) -> Option<&OpenOrders> {
        self.open_orders.get(slot).and_then(|o| o.as_ref())
    }

    /// Perp position for `market` in base UI units, `None` if it does not fit
    /// a `Decimal`.
    pub fn perp_position_ui(&self, market: &MarketConfig) -> Option<Decimal> {
        let lots = self
            .record
            .perp_accounts
            .get(market.market_index)
            .map(|p| p.base_position)
            .unwrap_or(0);
        Decimal::from(lots)
            .checked_mul(Decimal::from(market.base_lot_size))?
            .checked_div(market.base_scale())
    }
}

/// One market of interest. Book sides are replaced wholesale on every load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketContext {
    pub market: MarketConfig,
    pub bids: Option<Arc<BookSide>>,
    pub asks: Option<Arc<BookSide>>,
    pub last_book_update: Option<u64>,
}

impl MarketContext {
    pub fn new(market: MarketConfig) -> Self {
        Self { market, bids: None, asks: None, last_book_update: None }
    }

    pub fn with_books(&self, bids: BookSide, asks: BookSide, ts_ms: u64) -> Self {
        Self {
            market: self.market.clone(),
            bids: Some(Arc::new(bids)),
            asks: Some(Arc::new(asks)),
            last_book_update: Some(ts_ms),
        }
    }
}

/// Immutable result of one load: everything here was read in a single
/// batched call and shares `captured_at_ms`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub cache: MarginCache,
    pub account: Account,
    pub captured_at_ms: u64,
    pub markets: Vec<MarketContext>,
}

impl Snapshot {
    pub fn market(&self, name: &str) -> Option<&MarketContext> {
        self.markets.iter().find(|m| m.market.name.eq_ignore_ascii_case(name))
    }

    /// Same decoded content, ignoring capture and book-update timestamps.
    pub fn same_content(&self, other: &Snapshot) -> bool {
        self.cache == other.cache
            && self.account == other.account
            && self.markets.len() == other.markets.len()
            && self.markets.iter().zip(&other.markets).all(|(a, b)| {
                a.market == b.market && a.bids == b.bids && a.asks == b.asks
            })
    }
}

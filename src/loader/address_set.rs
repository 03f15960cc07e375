use std::fmt;
use std::ops::Range;

use crate::state::{Address, MarketContext};

/// Which part of the batched read an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    MarginCache,
    Account,
    OpenOrders { position: usize },
    Bids { market: usize },
    Asks { market: usize },
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::MarginCache => write!(f, "margin cache"),
            Region::Account => write!(f, "account"),
            Region::OpenOrders { position } => write!(f, "open orders #{}", position),
            Region::Bids { market } => write!(f, "bids of market #{}", market),
            Region::Asks { market } => write!(f, "asks of market #{}", market),
        }
    }
}

/// Ordered address list for one load, together with the `(k, m)` it was
/// built from.
///
/// Layout: `[cache, account, k open orders, m bids, m asks]`. Offsets are only
/// available through this value so results are always sliced with the counts
/// of the build that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressSet {
    addresses: Vec<Address>,
    open_orders: usize,
    markets: usize,
}

pub const MARGIN_CACHE_INDEX: usize = 0;
pub const ACCOUNT_INDEX: usize = 1;
const OPEN_ORDERS_START: usize = 2;

impl AddressSet {
    /// Build from the account's basket slots and the markets of interest.
    /// Empty (zero) slots are skipped; nothing else is deduplicated.
    pub fn build(
        margin_cache: Address,
        account: Address,
        basket: &[Address],
        markets: &[MarketContext],
    ) -> Self {
        let mut addresses = Vec::with_capacity(OPEN_ORDERS_START + basket.len() + 2 * markets.len());
        addresses.push(margin_cache);
        addresses.push(account);
        addresses.extend(basket.iter().filter(|a| !a.is_zero()).copied());
        let open_orders = addresses.len() - OPEN_ORDERS_START;
        addresses.extend(markets.iter().map(|m| m.market.bids));
        addresses.extend(markets.iter().map(|m| m.market.asks));
        Self { addresses, open_orders, markets: markets.len() }
    }

    pub fn addresses(&self) -> &[Address] {
        &self.addresses
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// k: number of non-empty basket slots read.
    pub fn open_orders_count(&self) -> usize {
        self.open_orders
    }

    /// m: number of market contexts read.
    pub fn market_count(&self) -> usize {
        self.markets
    }

    pub fn open_orders_range(&self) -> Range<usize> {
        OPEN_ORDERS_START..OPEN_ORDERS_START + self.open_orders
    }

    pub fn bids_range(&self) -> Range<usize> {
        let start = self.open_orders_range().end;
        start..start + self.markets
    }

    pub fn asks_range(&self) -> Range<usize> {
        let start = self.bids_range().end;
        start..start + self.markets
    }

    /// Region that position `index` of the list belongs to.
    pub fn region(&self, index: usize) -> Option<Region> {
        if index == MARGIN_CACHE_INDEX {
            Some(Region::MarginCache)
        } else if index == ACCOUNT_INDEX {
            Some(Region::Account)
        } else if self.open_orders_range().contains(&index) {
            Some(Region::OpenOrders { position: index - OPEN_ORDERS_START })
        } else if self.bids_range().contains(&index) {
            Some(Region::Bids { market: index - self.bids_range().start })
        } else if self.asks_range().contains(&index) {
            Some(Region::Asks { market: index - self.asks_range().start })
        } else {
            None
        }
    }
}

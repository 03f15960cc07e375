// On-chain record layouts, as decoded from account blobs.
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::address::Address;

// Quote token sits at the end of the token arrays; market i shares token index i.
pub const QUOTE_INDEX_FROM_END: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceCache {
    pub price: Decimal, // quote native per base native
    pub last_update: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootBankCache {
    pub deposit_index: Decimal,
    pub borrow_index: Decimal,
    pub last_update: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerpMarketCache {
    pub long_funding: Decimal,
    pub short_funding: Decimal,
    pub last_update: u64,
}

/// Group-wide pricing and interest inputs used to value an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginCache {
    pub prices: Vec<PriceCache>,
    pub root_banks: Vec<RootBankCache>,
    pub perp_markets: Vec<PerpMarketCache>,
}

impl MarginCache {
    /// Price of one native base unit in native quote units. The quote token is
    /// always worth exactly one.
    pub fn price(&self, token_index: usize) -> Option<Decimal> {
        if token_index == self.quote_index() {
            return Some(Decimal::ONE);
        }
        self.prices.get(token_index).map(|p| p.price)
    }

    pub fn quote_index(&self) -> usize {
        self.root_banks.len().saturating_sub(QUOTE_INDEX_FROM_END)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerpAccount {
    pub base_position: i64,      // base lots, signed
    pub quote_position: Decimal, // native quote
    // cumulative funding per base lot already folded into quote_position
    pub long_settled_funding: Decimal,
    pub short_settled_funding: Decimal,
}

/// Trader account layout. `basket` has one slot per market; `Address::ZERO`
/// marks an empty slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub owner: Address,
    pub group: Address,
    pub basket: Vec<Address>,
    pub deposits: Vec<Decimal>,
    pub borrows: Vec<Decimal>,
    pub perp_accounts: Vec<PerpAccount>,
}

impl AccountRecord {
    /// Non-empty basket slots as (slot index, open-orders address), in slot order.
    pub fn occupied_slots(&self) -> impl Iterator<Item = (usize, Address)> + '_ {
        self.basket
            .iter()
            .enumerate()
            .filter(|(_, a)| !a.is_zero())
            .map(|(i, a)| (i, *a))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOrdersRecord {
    pub market_index: u16,
    pub owner: Address,
    pub base_free: u64,
    pub base_total: u64,
    pub quote_free: u64,
    pub quote_total: u64,
    pub client_order_ids: Vec<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookSideKind {
    Bids,
    Asks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price_lots: i64,
    pub quantity_lots: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSideRecord {
    pub kind: BookSideKind,
    pub levels: Vec<BookLevel>,
}

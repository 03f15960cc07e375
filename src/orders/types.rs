use serde::{Deserialize, Serialize};

use crate::state::Address;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,  // buy
    Short, // sell
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Limit,
    ImmediateOrCancel,
    PostOnly,
    Market,
}

// Order as requested by the caller, in native lots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacePerpOrder {
    pub side: Side,
    pub price_lots: i64,
    pub quantity_lots: i64,
    pub client_order_id: u64,
    pub order_type: OrderType,
}

/// Exchange program instructions this client knows how to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangeInstruction {
    PlacePerpOrder(PlacePerpOrder),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountMeta {
    pub address: Address,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn readonly(address: Address) -> Self {
        Self { address, is_signer: false, is_writable: false }
    }

    pub fn writable(address: Address) -> Self {
        Self { address, is_signer: false, is_writable: true }
    }

    pub fn signer(address: Address) -> Self {
        Self { address, is_signer: true, is_writable: false }
    }
}

/// Unsigned instruction payload; signing and submission happen elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub program_id: Address,
    pub accounts: Vec<AccountMeta>,
    pub data: Vec<u8>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OrderError {
    #[error("unknown market {0}")]
    UnknownMarket(String),
    #[error("no {0:?} side loaded for market {1}")]
    NoBookSide(crate::state::BookSideKind, String),
    #[error("{0} side of {1} is empty")]
    EmptyBook(&'static str, String),
    #[error("price {0} is not representable in native lots")]
    InvalidPrice(String),
    #[error("quantity {0} is not representable in native lots")]
    InvalidQuantity(String),
    #[error("book level at {0} price lots has no UI price")]
    LevelOutOfRange(i64),
    #[error("failed to encode instruction: {0}")]
    Encode(String),
}

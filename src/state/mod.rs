// Entity types and their binary layouts
pub mod address;    // 32-byte ledger identity
pub mod types;      // decoded record layouts
pub mod book_side;  // immutable one-sided book
pub mod codec;      // tag + bincode decoders/encoders
pub mod snapshot;   // Account, MarketContext, Snapshot
pub mod valuation;  // account value against the margin cache

pub use address::Address;
pub use book_side::BookSide;
pub use codec::DecodeError;
pub use snapshot::{Account, MarketContext, OpenOrders, Snapshot};
pub use types::*;

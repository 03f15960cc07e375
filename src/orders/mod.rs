// Order instruction composition
pub mod types;       // sides, order types, instruction payloads
pub mod normaliser;  // UI units <-> native lots
pub mod composer;    // snapshot -> place-perp-order instruction

pub use composer::{compose, reference_price, OrderRequest};
pub use normaliser::Normaliser;
pub use types::{AccountMeta, Instruction, OrderError, OrderType, Side};

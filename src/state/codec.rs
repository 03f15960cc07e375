//! Binary account layouts.
//!
//! Every blob is one layout tag byte followed by the bincode encoding of the
//! record. Decoders are pure: bytes in, record out.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::book_side::{BookSide, LevelOverflow};
use super::types::{AccountRecord, BookSideRecord, MarginCache, OpenOrdersRecord};

pub const MARGIN_CACHE_TAG: u8 = 1;
pub const ACCOUNT_TAG: u8 = 2;
pub const OPEN_ORDERS_TAG: u8 = 3;
pub const BOOK_SIDE_TAG: u8 = 4;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("empty account data")]
    Empty,
    #[error("layout tag mismatch: expected {expected}, found {found}")]
    WrongTag { expected: u8, found: u8 },
    #[error("layout error: {0}")]
    Layout(#[from] bincode::Error),
    #[error("basket has {found} slots, expected {expected}")]
    BasketSize { expected: usize, found: usize },
    #[error("book side kind mismatch: expected {expected:?}, found {found:?}")]
    SideMismatch {
        expected: super::types::BookSideKind,
        found: super::types::BookSideKind,
    },
    #[error(transparent)]
    LevelOverflow(#[from] LevelOverflow),
}

pub type DecodeResult<T> = Result<T, DecodeError>;

fn encode_tagged<T: Serialize>(tag: u8, value: &T) -> bincode::Result<Vec<u8>> {
    let mut out = vec![tag];
    bincode::serialize_into(&mut out, value)?;
    Ok(out)
}

fn decode_tagged<T: DeserializeOwned>(tag: u8, data: &[u8]) -> DecodeResult<T> {
    let (&found, body) = data.split_first().ok_or(DecodeError::Empty)?;
    if found != tag {
        return Err(DecodeError::WrongTag { expected: tag, found });
    }
    Ok(bincode::deserialize(body)?)
}

pub fn decode_margin_cache(data: &[u8]) -> DecodeResult<MarginCache> {
    decode_tagged(MARGIN_CACHE_TAG, data)
}

pub fn decode_account(data: &[u8]) -> DecodeResult<AccountRecord> {
    decode_tagged(ACCOUNT_TAG, data)
}

pub fn decode_open_orders(data: &[u8]) -> DecodeResult<OpenOrdersRecord> {
    decode_tagged(OPEN_ORDERS_TAG, data)
}

pub fn decode_book_side(data: &[u8]) -> DecodeResult<BookSide> {
    let record: BookSideRecord = decode_tagged(BOOK_SIDE_TAG, data)?;
    Ok(BookSide::from_record(&record)?)
}

pub fn encode_margin_cache(cache: &MarginCache) -> bincode::Result<Vec<u8>> {
    encode_tagged(MARGIN_CACHE_TAG, cache)
}

pub fn encode_account(account: &AccountRecord) -> bincode::Result<Vec<u8>> {
    encode_tagged(ACCOUNT_TAG, account)
}

pub fn encode_open_orders(open_orders: &OpenOrdersRecord) -> bincode::Result<Vec<u8>> {
    encode_tagged(OPEN_ORDERS_TAG, open_orders)
}

pub fn encode_book_side(side: &BookSide) -> bincode::Result<Vec<u8>> {
    encode_tagged(BOOK_SIDE_TAG, &side.to_record())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::address::Address;
    use crate::state::types::*;
    use rust_decimal_macros::dec;

    fn sample_cache() -> MarginCache {
        MarginCache {
            prices: vec![PriceCache { price: dec!(0.0253), last_update: 11 }],
            root_banks: vec![
                RootBankCache { deposit_index: dec!(1.01), borrow_index: dec!(1.07), last_update: 11 },
                RootBankCache { deposit_index: dec!(1), borrow_index: dec!(1), last_update: 11 },
            ],
            perp_markets: vec![PerpMarketCache {
                long_funding: dec!(-0.5),
                short_funding: dec!(0.5),
                last_update: 12,
            }],
        }
    }

    fn sample_account() -> AccountRecord {
        AccountRecord {
            owner: Address([1; 32]),
            group: Address([2; 32]),
            basket: vec![Address::ZERO, Address([3; 32])],
            deposits: vec![dec!(0), dec!(1500.25)],
            borrows: vec![dec!(2), dec!(0)],
            perp_accounts: vec![PerpAccount {
                base_position: -4,
                quote_position: dec!(88.1),
                long_settled_funding: dec!(0),
                short_settled_funding: dec!(0.25),
            }],
        }
    }

    #[test]
    fn test_margin_cache_round_trip() {
        let cache = sample_cache();
        assert_eq!(decode_margin_cache(&encode_margin_cache(&cache).unwrap()).unwrap(), cache);
    }

    #[test]
    fn test_account_round_trip() {
        let account = sample_account();
        assert_eq!(decode_account(&encode_account(&account).unwrap()).unwrap(), account);
    }

    #[test]
    fn test_open_orders_round_trip() {
        let oo = OpenOrdersRecord {
            market_index: 1,
            owner: Address([1; 32]),
            base_free: 3,
            base_total: 10,
            quote_free: 0,
            quote_total: 250,
            client_order_ids: vec![42, 43],
        };
        assert_eq!(decode_open_orders(&encode_open_orders(&oo).unwrap()).unwrap(), oo);
    }

    #[test]
    fn test_book_side_round_trip() {
        let side = BookSide::new(
            BookSideKind::Asks,
            &[
                BookLevel { price_lots: 101, quantity_lots: 4 },
                BookLevel { price_lots: 100, quantity_lots: 9 },
            ],
        )
        .unwrap();
        assert_eq!(decode_book_side(&encode_book_side(&side).unwrap()).unwrap(), side);
    }

    #[test]
    fn test_wrong_tag_is_rejected() {
        let blob = encode_account(&sample_account()).unwrap();
        match decode_margin_cache(&blob) {
            Err(DecodeError::WrongTag { expected, found }) => {
                assert_eq!(expected, MARGIN_CACHE_TAG);
                assert_eq!(found, ACCOUNT_TAG);
            }
            other => panic!("expected WrongTag, got {:?}", other),
        }
    }

    #[test]
    fn test_overflowing_book_blob_is_a_decode_error() {
        // a well-formed layout whose levels sum past i64::MAX at one price
        let record = BookSideRecord {
            kind: BookSideKind::Bids,
            levels: vec![
                BookLevel { price_lots: 7, quantity_lots: i64::MAX },
                BookLevel { price_lots: 7, quantity_lots: i64::MAX },
            ],
        };
        let blob = encode_tagged(BOOK_SIDE_TAG, &record).unwrap();
        assert!(matches!(
            decode_book_side(&blob),
            Err(DecodeError::LevelOverflow(LevelOverflow { price_lots: 7 }))
        ));
    }

    #[test]
    fn test_empty_and_truncated_blobs() {
        assert!(matches!(decode_account(&[]), Err(DecodeError::Empty)));
        let mut blob = encode_account(&sample_account()).unwrap();
        blob.truncate(blob.len() / 2);
        assert!(matches!(decode_account(&blob), Err(DecodeError::Layout(_))));
    }
}

//! Turns the flat, order-preserving result list of one batched read back into
//! typed entities.
//!
//! Cache, account and book sides are identified by position. Open-orders blobs
//! are matched to basket slots by address, never by position.

use ahash::AHashMap;
use tracing::{debug, trace};

use super::address_set::{AddressSet, Region, ACCOUNT_INDEX, MARGIN_CACHE_INDEX};
use super::LoadError;
use crate::reader::RemoteAccount;
use crate::reader::TransportError;
use crate::state::codec::{self, DecodeError};
use crate::state::{Account, Address, BookSide, BookSideKind, MarginCache, OpenOrders};

/// Decoded contents of one read, before timestamps are applied.
#[derive(Debug)]
pub struct Demuxed {
    pub cache: MarginCache,
    pub account: Account,
    pub bids: Vec<BookSide>, // market-context order
    pub asks: Vec<BookSide>,
}

pub fn demultiplex(
    set: &AddressSet,
    results: &[Option<RemoteAccount>],
    basket_size: usize,
) -> Result<Demuxed, LoadError> {
    if results.len() != set.len() {
        return Err(TransportError::LengthMismatch {
            requested: set.len(),
            returned: results.len(),
        }
        .into());
    }

    let ai = positional(set, results, ACCOUNT_INDEX, Region::Account)?;
    let record = codec::decode_account(&ai.data).map_err(|e| decode_err(Region::Account, ai.address, e))?;
    if record.basket.len() != basket_size {
        return Err(decode_err(
            Region::Account,
            ai.address,
            DecodeError::BasketSize { expected: basket_size, found: record.basket.len() },
        ));
    }
    let mut account = Account::unresolved(ai.address, record);

    resolve_open_orders(set, results, &mut account)?;

    let bids = (0..set.market_count())
        .map(|market| book_side(set, results, market, BookSideKind::Bids))
        .collect::<Result<Vec<_>, _>>()?;
    let asks = (0..set.market_count())
        .map(|market| book_side(set, results, market, BookSideKind::Asks))
        .collect::<Result<Vec<_>, _>>()?;

    let ci = positional(set, results, MARGIN_CACHE_INDEX, Region::MarginCache)?;
    let cache = codec::decode_margin_cache(&ci.data).map_err(|e| decode_err(Region::MarginCache, ci.address, e))?;

    debug!(
        open_orders = set.open_orders_count(),
        markets = set.market_count(),
        "demultiplexed batched read"
    );
    Ok(Demuxed { cache, account, bids, asks })
}

fn resolve_open_orders(
    set: &AddressSet,
    results: &[Option<RemoteAccount>],
    account: &mut Account,
) -> Result<(), LoadError> {
    let slot_by_address: AHashMap<Address, usize> =
        account.record.occupied_slots().map(|(slot, addr)| (addr, slot)).collect();

    for (position, index) in set.open_orders_range().enumerate() {
        let region = Region::OpenOrders { position };
        let ai = present(set, results, index, region)?;
        let slot = *slot_by_address
            .get(&ai.address)
            .ok_or(LoadError::Correlation { position, address: ai.address })?;
        if account.open_orders[slot].is_some() {
            return Err(LoadError::DuplicateSlot { slot, address: ai.address });
        }
        let record = codec::decode_open_orders(&ai.data).map_err(|e| decode_err(region, ai.address, e))?;
        trace!(position, slot, address = %ai.address, "matched open orders to basket slot");
        account.open_orders[slot] = Some(OpenOrders { address: ai.address, record });
    }

    // A slot filled on-chain after the address list was built was never read.
    if let Some((slot, address)) = account
        .record
        .occupied_slots()
        .find(|(slot, _)| account.open_orders[*slot].is_none())
    {
        return Err(LoadError::UnresolvedSlot { slot, address });
    }
    Ok(())
}

fn book_side(
    set: &AddressSet,
    results: &[Option<RemoteAccount>],
    market: usize,
    expected: BookSideKind,
) -> Result<BookSide, LoadError> {
    let (index, region) = match expected {
        BookSideKind::Bids => (set.bids_range().start + market, Region::Bids { market }),
        BookSideKind::Asks => (set.asks_range().start + market, Region::Asks { market }),
    };
    let ai = positional(set, results, index, region)?;
    let side = codec::decode_book_side(&ai.data).map_err(|e| decode_err(region, ai.address, e))?;
    if side.kind() != expected {
        return Err(decode_err(
            region,
            ai.address,
            DecodeError::SideMismatch { expected, found: side.kind() },
        ));
    }
    Ok(side)
}

/// Entry at `index`, which must be present.
fn present<'a>(
    set: &AddressSet,
    results: &'a [Option<RemoteAccount>],
    index: usize,
    region: Region,
) -> Result<&'a RemoteAccount, LoadError> {
    results[index]
        .as_ref()
        .ok_or(LoadError::AddressNotFound { region, address: set.addresses()[index] })
}

/// Entry at `index`, which must be present and carry the requested address.
fn positional<'a>(
    set: &AddressSet,
    results: &'a [Option<RemoteAccount>],
    index: usize,
    region: Region,
) -> Result<&'a RemoteAccount, LoadError> {
    let ai = present(set, results, index, region)?;
    let expected = set.addresses()[index];
    if ai.address != expected {
        return Err(LoadError::UnexpectedAddress { region, expected, found: ai.address });
    }
    Ok(ai)
}

fn decode_err(region: Region, address: Address, source: DecodeError) -> LoadError {
    LoadError::Decode { region, address, source }
}

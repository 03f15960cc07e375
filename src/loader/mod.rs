// Account/market state loader: build → fetch → demultiplex → assemble

pub mod address_set; // ordered address list + region offsets
pub mod demux;       // flat results -> typed entities

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::reader::{AccountReader, TransportError};
use crate::state::codec::{self, DecodeError};
use crate::state::{Account, Address, MarketContext, Snapshot};
pub use address_set::{AddressSet, Region};
use demux::Demuxed;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("batched read failed: {0}")]
    Transport(#[from] TransportError),
    #[error("no data at {address} ({region})")]
    AddressNotFound { region: Region, address: Address },
    #[error("failed to decode {region} at {address}: {source}")]
    Decode {
        region: Region,
        address: Address,
        #[source]
        source: DecodeError,
    },
    #[error("open orders {address} at result position {position} matches no basket slot")]
    Correlation { position: usize, address: Address },
    #[error("basket slot {slot} matched twice ({address})")]
    DuplicateSlot { slot: usize, address: Address },
    #[error("basket slot {slot} holds {address} which was not part of this read")]
    UnresolvedSlot { slot: usize, address: Address },
    #[error("{region}: requested {expected}, reader returned {found}")]
    UnexpectedAddress { region: Region, expected: Address, found: Address },
}

impl LoadError {
    /// The account's basket changed between building the address list and the
    /// read; the next attempt needs a freshly read basket.
    pub fn is_basket_race(&self) -> bool {
        matches!(
            self,
            LoadError::Correlation { .. }
                | LoadError::DuplicateSlot { .. }
                | LoadError::UnresolvedSlot { .. }
                | LoadError::AddressNotFound { region: Region::OpenOrders { .. }, .. }
        )
    }
}

pub fn unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Stateless loader; every call is a self-contained build → fetch →
/// demultiplex.
pub struct StateLoader<R> {
    reader: R,
    margin_cache: Address,
    basket_size: usize,
}

impl<R: AccountReader> StateLoader<R> {
    pub fn new(reader: R, config: &ClientConfig) -> Self {
        Self { reader, margin_cache: config.margin_cache, basket_size: config.basket_size }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Read cache, account, open orders and both book sides of every market in
    /// one round trip. `account` supplies the basket used to pick open-orders
    /// addresses; `markets` supplies the book-side addresses.
    #[instrument(skip_all, fields(account = %account.address, markets = markets.len()))]
    pub async fn load(&self, account: &Account, markets: &[MarketContext]) -> Result<Snapshot, LoadError> {
        let started = Instant::now();
        let set = AddressSet::build(self.margin_cache, account.address, account.basket(), markets);
        debug!(
            addresses = set.len(),
            open_orders = set.open_orders_count(),
            "fetching batched state"
        );

        let results = match self.reader.read_accounts(set.addresses()).await {
            Ok(results) => results,
            Err(e) => {
                metrics::counter!("perpsync_loads_total", "outcome" => "transport_error").increment(1);
                warn!(error = %e, "batched read failed");
                return Err(e.into());
            }
        };
        // Stamped before decoding so decode time never skews the as-of time.
        let captured_at_ms = unix_ms();

        let snapshot = demux::demultiplex(&set, &results, self.basket_size)
            .map(|parts| assemble(parts, markets, captured_at_ms));

        match &snapshot {
            Ok(_) => {
                metrics::counter!("perpsync_loads_total", "outcome" => "ok").increment(1);
                metrics::histogram!("perpsync_load_seconds").record(started.elapsed().as_secs_f64());
                info!(captured_at_ms, elapsed_us = started.elapsed().as_micros() as u64, "snapshot ready");
            }
            Err(e) => {
                metrics::counter!("perpsync_loads_total", "outcome" => "rejected").increment(1);
                warn!(error = %e, "discarding batched read");
            }
        }
        snapshot
    }

    /// Read the account on its own. Used before the first full load, and
    /// whenever the basket must be re-learned.
    #[instrument(skip(self))]
    pub async fn load_account(&self, address: Address) -> Result<Account, LoadError> {
        let mut results = self.reader.read_accounts(&[address]).await?;
        if results.len() != 1 {
            return Err(TransportError::LengthMismatch { requested: 1, returned: results.len() }.into());
        }
        let ai = results
            .pop()
            .flatten()
            .ok_or(LoadError::AddressNotFound { region: Region::Account, address })?;
        let decode_err = |source| LoadError::Decode { region: Region::Account, address, source };
        let record = codec::decode_account(&ai.data).map_err(decode_err)?;
        if record.basket.len() != self.basket_size {
            return Err(decode_err(DecodeError::BasketSize {
                expected: self.basket_size,
                found: record.basket.len(),
            }));
        }
        Ok(Account::unresolved(address, record))
    }
}

/// Package decoded parts into a new snapshot. `markets` is only read; every
/// context in the result is a new value with both sides replaced.
pub fn assemble(parts: Demuxed, markets: &[MarketContext], captured_at_ms: u64) -> Snapshot {
    let markets = markets
        .iter()
        .zip(parts.bids.into_iter().zip(parts.asks))
        .map(|(ctx, (bids, asks))| ctx.with_books(bids, asks, captured_at_ms))
        .collect();
    Snapshot { cache: parts.cache, account: parts.account, captured_at_ms, markets }
}

//! Trading client: owns the current snapshot and swaps it on every successful
//! refresh. A failed refresh leaves the previous snapshot in place.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use crate::config::ClientConfig;
use crate::loader::{LoadError, StateLoader};
use crate::orders::{self, Instruction, OrderError, OrderRequest, OrderType, Side};
use crate::reader::AccountReader;
use crate::state::valuation::{self, ValuationError};
use crate::state::{MarketContext, Snapshot};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("no snapshot loaded yet")]
    NotLoaded,
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Order(#[from] OrderError),
    #[error(transparent)]
    Valuation(#[from] ValuationError),
}

pub struct TradingClient<R> {
    config: Arc<ClientConfig>,
    loader: StateLoader<R>,
    current: RwLock<Option<Arc<Snapshot>>>,
    // set when a load failed because the basket moved under us
    needs_resync: AtomicBool,
}

impl<R: AccountReader> TradingClient<R> {
    pub fn new(config: Arc<ClientConfig>, reader: R) -> Self {
        let loader = StateLoader::new(reader, &config);
        Self { config, loader, current: RwLock::new(None), needs_resync: AtomicBool::new(false) }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn loader(&self) -> &StateLoader<R> {
        &self.loader
    }

    /// Current snapshot, if any load has succeeded.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.current.read().clone()
    }

    /// First load: learn the basket from a lone account read, then load
    /// everything in one batch.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self) -> Result<Arc<Snapshot>, LoadError> {
        let markets: Vec<MarketContext> = self.config.markets.iter().cloned().map(MarketContext::new).collect();
        self.resync(&markets).await
    }

    async fn resync(&self, markets: &[MarketContext]) -> Result<Arc<Snapshot>, LoadError> {
        let account = self.loader.load_account(self.config.account).await?;
        debug!(occupied = account.record.occupied_slots().count(), "basket read");
        let snapshot = self.loader.load(&account, markets).await?;
        self.needs_resync.store(false, Ordering::Release);
        Ok(self.install(snapshot))
    }

    /// Reload everything. On failure the previous snapshot stays current.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Arc<Snapshot>, LoadError> {
        let Some(current) = self.snapshot() else {
            return self.bootstrap().await;
        };
        let result = if self.needs_resync.load(Ordering::Acquire) {
            info!("re-reading basket before refresh");
            self.resync(&current.markets).await
        } else {
            self.loader.load(&current.account, &current.markets).await.map(|s| self.install(s))
        };
        if let Err(e) = &result {
            if e.is_basket_race() {
                self.needs_resync.store(true, Ordering::Release);
            }
            warn!(error = %e, captured_at_ms = current.captured_at_ms, "refresh failed, keeping last snapshot");
        }
        result
    }

    fn install(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let snapshot = Arc::new(snapshot);
        let mut current = self.current.write();
        // a slower concurrent refresh must not roll the view backwards
        match current.as_ref() {
            Some(existing) if existing.captured_at_ms > snapshot.captured_at_ms => existing.clone(),
            _ => {
                *current = Some(snapshot.clone());
                snapshot
            }
        }
    }

    fn loaded(&self) -> Result<Arc<Snapshot>, ClientError> {
        self.snapshot().ok_or(ClientError::NotLoaded)
    }

    pub fn top_bid(&self, market: &str) -> Result<Decimal, ClientError> {
        let snap = self.loaded()?;
        Ok(orders::reference_price(&snap, market, Side::Short)?)
    }

    pub fn top_ask(&self, market: &str) -> Result<Decimal, ClientError> {
        let snap = self.loaded()?;
        Ok(orders::reference_price(&snap, market, Side::Long)?)
    }

    /// Perp position per configured market, in base UI units.
    pub fn positions(&self) -> Result<Vec<(String, Decimal)>, ClientError> {
        let snap = self.loaded()?;
        snap.markets
            .iter()
            .map(|ctx| -> Result<_, ClientError> {
                let position = snap.account.perp_position_ui(&ctx.market).ok_or(ValuationError::Overflow)?;
                Ok((ctx.market.name.clone(), position))
            })
            .collect()
    }

    /// Assets minus liabilities in quote UI units.
    pub fn account_value(&self) -> Result<Decimal, ClientError> {
        let snap = self.loaded()?;
        let value = valuation::account_value(&snap.account, &snap.cache, &self.config.markets)?;
        let scale = self.config.markets.first().map(|m| m.quote_scale()).unwrap_or(Decimal::ONE);
        Ok(value.net()?.checked_div(scale).ok_or(ValuationError::Overflow)?)
    }

    /// Market buy of `quantity` at the current best ask.
    pub fn market_long(&self, market: &str, quantity: Decimal, client_order_id: u64) -> Result<Instruction, ClientError> {
        self.market_order(market, Side::Long, quantity, client_order_id)
    }

    /// Market sell of `quantity` at the current best bid.
    pub fn market_short(&self, market: &str, quantity: Decimal, client_order_id: u64) -> Result<Instruction, ClientError> {
        self.market_order(market, Side::Short, quantity, client_order_id)
    }

    fn market_order(&self, market: &str, side: Side, quantity: Decimal, client_order_id: u64) -> Result<Instruction, ClientError> {
        let snap = self.loaded()?;
        let price = orders::reference_price(&snap, market, side)?;
        let request = OrderRequest { side, price, quantity, client_order_id, order_type: OrderType::Market };
        Ok(orders::compose(&self.config, &snap, market, &request)?)
    }
}

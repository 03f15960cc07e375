//! Builds place-perp-order instructions from a snapshot.
//!
//! Pure: every address comes from the snapshot or static config, nothing is
//! fetched and nothing is signed.

use rust_decimal::Decimal;
use tracing::debug;

use super::normaliser::Normaliser;
use super::types::{
    AccountMeta, ExchangeInstruction, Instruction, OrderError, OrderType, PlacePerpOrder, Side,
};
use crate::config::ClientConfig;
use crate::state::{BookSideKind, MarketContext, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderRequest {
    pub side: Side,
    pub price: Decimal,    // UI units
    pub quantity: Decimal, // UI base units
    pub client_order_id: u64,
    pub order_type: OrderType,
}

pub fn market_context<'a>(snapshot: &'a Snapshot, market: &str) -> Result<&'a MarketContext, OrderError> {
    snapshot
        .market(market)
        .ok_or_else(|| OrderError::UnknownMarket(market.to_string()))
}

/// Price a marketable order would cross at: best ask for a long, best bid for
/// a short, in UI units.
pub fn reference_price(snapshot: &Snapshot, market: &str, side: Side) -> Result<Decimal, OrderError> {
    let ctx = market_context(snapshot, market)?;
    let (kind, book, label) = match side {
        Side::Long => (BookSideKind::Asks, &ctx.asks, "ask"),
        Side::Short => (BookSideKind::Bids, &ctx.bids, "bid"),
    };
    let best = book
        .as_ref()
        .ok_or_else(|| OrderError::NoBookSide(kind, ctx.market.name.clone()))?
        .best()
        .ok_or_else(|| OrderError::EmptyBook(label, ctx.market.name.clone()))?;
    Normaliser::new(&ctx.market)
        .price_lots_to_ui(best.price_lots)
        .ok_or(OrderError::LevelOutOfRange(best.price_lots))
}

pub fn compose(
    config: &ClientConfig,
    snapshot: &Snapshot,
    market: &str,
    request: &OrderRequest,
) -> Result<Instruction, OrderError> {
    let ctx = market_context(snapshot, market)?;
    let m = &ctx.market;
    let (price_lots, quantity_lots) = Normaliser::new(m).ui_to_native(request.price, request.quantity)?;

    let order = PlacePerpOrder {
        side: request.side,
        price_lots,
        quantity_lots,
        client_order_id: request.client_order_id,
        order_type: request.order_type,
    };
    let mut data = vec![];
    bincode::serialize_into(&mut data, &ExchangeInstruction::PlacePerpOrder(order))
        .map_err(|e| OrderError::Encode(e.to_string()))?;

    let account = &snapshot.account;
    let mut accounts = vec![
        AccountMeta::readonly(config.group),
        AccountMeta::writable(account.address),
        AccountMeta::signer(config.owner),
        AccountMeta::readonly(config.margin_cache),
        AccountMeta::writable(m.address),
        AccountMeta::writable(m.bids),
        AccountMeta::writable(m.asks),
        AccountMeta::writable(m.event_queue),
    ];
    // every basket slot, empty ones as the zero address
    accounts.extend(account.basket().iter().map(|a| AccountMeta::readonly(*a)));

    debug!(market = %m.name, ?order, "composed place perp order");
    Ok(Instruction { program_id: config.program_id, accounts, data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::tests::{oo_address, Ledger};
    use crate::state::Address;
    use rust_decimal_macros::dec;

    async fn snapshot(ledger: &Ledger) -> Snapshot {
        let loader = ledger.loader();
        let account = loader.load_account(ledger.config.account).await.unwrap();
        loader.load(&account, &ledger.contexts()).await.unwrap()
    }

    #[tokio::test]
    async fn test_reference_price_uses_best_opposite_level() {
        let ledger = Ledger::new(vec![Address::ZERO; 2], &[0]);
        let snap = snapshot(&ledger).await;
        // asks top at 1001 lots, bids top at 999 lots; 1 lot = 0.001 UI with the test market
        assert_eq!(reference_price(&snap, "M0-PERP", Side::Long).unwrap(), dec!(1.001));
        assert_eq!(reference_price(&snap, "M0-PERP", Side::Short).unwrap(), dec!(0.999));
    }

    #[tokio::test]
    async fn test_extreme_book_level_is_an_error() {
        let ledger = Ledger::new(vec![Address::ZERO; 2], &[0]);
        let far = crate::state::BookLevel { price_lots: i64::MAX, quantity_lots: 1 };
        let asks = crate::state::BookSide::new(BookSideKind::Asks, &[far]).unwrap();
        ledger.put_book(ledger.config.markets[0].asks, &asks);
        let snap = snapshot(&ledger).await;
        assert_eq!(
            reference_price(&snap, "M0-PERP", Side::Long),
            Err(OrderError::LevelOutOfRange(i64::MAX))
        );
        assert_eq!(reference_price(&snap, "M0-PERP", Side::Short).unwrap(), dec!(0.999));
    }

    #[tokio::test]
    async fn test_compose_references_snapshot_addresses() {
        let a = oo_address(1);
        let ledger = Ledger::new(vec![Address::ZERO, a], &[1]);
        let snap = snapshot(&ledger).await;
        let request = OrderRequest {
            side: Side::Short,
            price: dec!(25.37),
            quantity: dec!(2),
            client_order_id: 1_700_000_000_000,
            order_type: OrderType::Market,
        };
        let ix = compose(&ledger.config, &snap, "M1-PERP", &request).unwrap();
        let m = &ledger.config.markets[0];

        assert_eq!(ix.program_id, ledger.config.program_id);
        let addrs: Vec<Address> = ix.accounts.iter().map(|a| a.address).collect();
        assert_eq!(
            addrs,
            vec![
                ledger.config.group,
                ledger.config.account,
                ledger.config.owner,
                ledger.config.margin_cache,
                m.address,
                m.bids,
                m.asks,
                m.event_queue,
                Address::ZERO,
                a,
            ]
        );
        assert!(ix.accounts[2].is_signer);
        assert!(ix.accounts[1].is_writable && !ix.accounts[0].is_writable);

        let decoded: ExchangeInstruction = bincode::deserialize(&ix.data).unwrap();
        assert_eq!(
            decoded,
            ExchangeInstruction::PlacePerpOrder(PlacePerpOrder {
                side: Side::Short,
                price_lots: 25370,
                quantity_lots: 20,
                client_order_id: 1_700_000_000_000,
                order_type: OrderType::Market,
            })
        );
    }

    #[tokio::test]
    async fn test_unknown_market_and_dust() {
        let ledger = Ledger::new(vec![Address::ZERO; 2], &[0]);
        let snap = snapshot(&ledger).await;
        let mut request = OrderRequest {
            side: Side::Long,
            price: dec!(1),
            quantity: dec!(1),
            client_order_id: 1,
            order_type: OrderType::Limit,
        };
        assert_eq!(
            compose(&ledger.config, &snap, "ETH-PERP", &request),
            Err(OrderError::UnknownMarket("ETH-PERP".into()))
        );
        request.quantity = dec!(0.00001);
        assert!(matches!(
            compose(&ledger.config, &snap, "M0-PERP", &request),
            Err(OrderError::InvalidQuantity(_))
        ));
    }
}

use rust_decimal::Decimal;

use super::snapshot::Account;
use super::types::{MarginCache, PerpAccount, PerpMarketCache};
use crate::config::MarketConfig;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValuationError {
    #[error("no cached price for token {0}")]
    MissingPrice(usize),
    #[error("no interest index for token {0}")]
    MissingIndex(usize),
    #[error("no cached funding for perp market {0}")]
    MissingFunding(usize),
    #[error("open perp position in unconfigured market {0}")]
    UnknownMarket(usize),
    #[error("account value overflows")]
    Overflow,
}

/// Assets and liabilities in native quote units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountValue {
    pub assets: Decimal,
    pub liabilities: Decimal,
}

impl AccountValue {
    pub fn net(&self) -> Result<Decimal, ValuationError> {
        self.assets.checked_sub(self.liabilities).ok_or(ValuationError::Overflow)
    }

    fn add_asset(&mut self, v: Decimal) -> Result<(), ValuationError> {
        self.assets = self.assets.checked_add(v).ok_or(ValuationError::Overflow)?;
        Ok(())
    }

    fn add_liability(&mut self, v: Decimal) -> Result<(), ValuationError> {
        self.liabilities = self.liabilities.checked_add(v).ok_or(ValuationError::Overflow)?;
        Ok(())
    }
}

fn product(factors: &[Decimal]) -> Result<Decimal, ValuationError> {
    factors
        .iter()
        .try_fold(Decimal::ONE, |acc, f| acc.checked_mul(*f))
        .ok_or(ValuationError::Overflow)
}

/// Funding accrued since the position last settled, in native quote. Longs pay
/// when `long_funding` rises; shorts (negative base) receive when
/// `short_funding` rises.
fn unsettled_funding(perp: &PerpAccount, market: &PerpMarketCache) -> Result<Decimal, ValuationError> {
    let (cumulative, settled) = match perp.base_position.signum() {
        0 => return Ok(Decimal::ZERO),
        1 => (market.long_funding, perp.long_settled_funding),
        _ => (market.short_funding, perp.short_settled_funding),
    };
    let accrued = cumulative.checked_sub(settled).ok_or(ValuationError::Overflow)?;
    product(&[Decimal::from(perp.base_position), accrued])
}

/// Value `account` with the prices, interest indices and funding in `cache`.
///
/// Token balances are scaled by their deposit/borrow index. Open-orders
/// balances count as assets. Perp positions are marked at the cached price,
/// net of unsettled funding, and land on whichever side their sign puts them.
pub fn account_value(
    account: &Account,
    cache: &MarginCache,
    markets: &[MarketConfig],
) -> Result<AccountValue, ValuationError> {
    let mut value = AccountValue::default();
    let record = &account.record;

    for (i, deposit) in record.deposits.iter().enumerate() {
        let borrow = record.borrows.get(i).copied().unwrap_or_default();
        if deposit.is_zero() && borrow.is_zero() {
            continue;
        }
        let bank = cache.root_banks.get(i).ok_or(ValuationError::MissingIndex(i))?;
        let price = cache.price(i).ok_or(ValuationError::MissingPrice(i))?;
        value.add_asset(product(&[*deposit, bank.deposit_index, price])?)?;
        value.add_liability(product(&[borrow, bank.borrow_index, price])?)?;
    }

    for oo in account.open_orders.iter().flatten() {
        let i = oo.record.market_index as usize;
        let price = cache.price(i).ok_or(ValuationError::MissingPrice(i))?;
        value.add_asset(product(&[Decimal::from(oo.record.base_total), price])?)?;
        value.add_asset(Decimal::from(oo.record.quote_total))?;
    }

    for (i, perp) in record.perp_accounts.iter().enumerate() {
        if perp.base_position == 0 && perp.quote_position.is_zero() {
            continue;
        }
        let market = markets
            .iter()
            .find(|m| m.market_index == i)
            .ok_or(ValuationError::UnknownMarket(i))?;
        let price = cache.price(i).ok_or(ValuationError::MissingPrice(i))?;
        let funding = match perp.base_position {
            0 => Decimal::ZERO,
            _ => {
                let perp_cache = cache.perp_markets.get(i).ok_or(ValuationError::MissingFunding(i))?;
                unsettled_funding(perp, perp_cache)?
            }
        };
        let marked = product(&[Decimal::from(perp.base_position), Decimal::from(market.base_lot_size), price])?;
        let pnl = marked
            .checked_add(perp.quote_position)
            .and_then(|v| v.checked_sub(funding))
            .ok_or(ValuationError::Overflow)?;
        if pnl.is_sign_negative() {
            value.add_liability(-pnl)?;
        } else {
            value.add_asset(pnl)?;
        }
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::market;
    use crate::state::address::Address;
    use crate::state::snapshot::OpenOrders;
    use crate::state::types::*;
    use rust_decimal_macros::dec;

    fn cache() -> MarginCache {
        MarginCache {
            prices: vec![PriceCache { price: dec!(0.02), last_update: 1 }],
            root_banks: vec![
                RootBankCache { deposit_index: dec!(1), borrow_index: dec!(1.5), last_update: 1 },
                RootBankCache { deposit_index: dec!(1.1), borrow_index: dec!(1), last_update: 1 },
            ],
            perp_markets: vec![PerpMarketCache {
                long_funding: dec!(0),
                short_funding: dec!(0),
                last_update: 1,
            }],
        }
    }

    fn record() -> AccountRecord {
        AccountRecord {
            owner: Address([1; 32]),
            group: Address([2; 32]),
            basket: vec![Address([9; 32]), Address::ZERO],
            deposits: vec![dec!(1000), dec!(500)],
            borrows: vec![dec!(100), dec!(0)],
            perp_accounts: vec![PerpAccount::default(), PerpAccount::default()],
        }
    }

    #[test]
    fn test_deposits_and_borrows() {
        let account = Account::unresolved(Address([3; 32]), record());
        let v = account_value(&account, &cache(), &[]).unwrap();
        // 1000 * 1 * 0.02 + 500 * 1.1 * 1
        assert_eq!(v.assets, dec!(570));
        // 100 * 1.5 * 0.02
        assert_eq!(v.liabilities, dec!(3));
        assert_eq!(v.net(), Ok(dec!(567)));
    }

    #[test]
    fn test_open_orders_and_short_perp() {
        let mut rec = record();
        rec.deposits = vec![dec!(0), dec!(0)];
        rec.borrows = vec![dec!(0), dec!(0)];
        rec.perp_accounts[0] = PerpAccount { base_position: -2, quote_position: dec!(1000), ..Default::default() };
        let mut account = Account::unresolved(Address([3; 32]), rec);
        account.open_orders[0] = Some(OpenOrders {
            address: Address([9; 32]),
            record: OpenOrdersRecord {
                market_index: 0,
                owner: Address([1; 32]),
                base_free: 0,
                base_total: 500,
                quote_free: 0,
                quote_total: 40,
                client_order_ids: vec![],
            },
        });
        let markets = [market("SOL-PERP", 0, 10)];
        let v = account_value(&account, &cache(), &markets).unwrap();
        // oo: 500 * 0.02 + 40 = 50
        // perp: -2 * 1e8 * 0.02 + 1000 = -4_000_000 + 1000
        assert_eq!(v.assets, dec!(50));
        assert_eq!(v.liabilities, dec!(3999000));
    }

    #[test]
    fn test_unconfigured_perp_market() {
        let mut rec = record();
        rec.perp_accounts[1] = PerpAccount { base_position: 1, ..Default::default() };
        let account = Account::unresolved(Address([3; 32]), rec);
        assert_eq!(
            account_value(&account, &cache(), &[]),
            Err(ValuationError::UnknownMarket(1))
        );
    }

    fn perp_only(perp: PerpAccount) -> Account {
        let mut rec = record();
        rec.deposits = vec![dec!(0), dec!(0)];
        rec.borrows = vec![dec!(0), dec!(0)];
        rec.perp_accounts[0] = perp;
        Account::unresolved(Address([3; 32]), rec)
    }

    #[test]
    fn test_unsettled_funding_reduces_perp_value() {
        let mut c = cache();
        c.perp_markets[0] = PerpMarketCache { long_funding: dec!(5), short_funding: dec!(1), last_update: 2 };
        let markets = [market("SOL-PERP", 0, 10)];

        // long 3 lots owes 3 * (5 - 2): 3e8 * 0.02 - 1000 - 9
        let long = perp_only(PerpAccount {
            base_position: 3,
            quote_position: dec!(-1000),
            long_settled_funding: dec!(2),
            short_settled_funding: dec!(4),
        });
        let v = account_value(&long, &c, &markets).unwrap();
        assert_eq!(v.assets, dec!(5998991));
        assert_eq!(v.liabilities, dec!(0));

        // short 2 lots: -2 * (1 - 4) = 6 owed: -2e8 * 0.02 + 1000 - 6
        let short = perp_only(PerpAccount {
            base_position: -2,
            quote_position: dec!(1000),
            long_settled_funding: dec!(2),
            short_settled_funding: dec!(4),
        });
        let v = account_value(&short, &c, &markets).unwrap();
        assert_eq!(v.liabilities, dec!(3999006));
    }

    #[test]
    fn test_missing_funding_cache() {
        let mut c = cache();
        c.perp_markets.clear();
        let account = perp_only(PerpAccount { base_position: 1, ..Default::default() });
        assert_eq!(
            account_value(&account, &c, &[market("SOL-PERP", 0, 10)]),
            Err(ValuationError::MissingFunding(0))
        );
    }

    #[test]
    fn test_overflow_is_an_error() {
        let mut rec = record();
        // quote token: price 1, deposit index 1.1
        rec.deposits = vec![dec!(0), Decimal::MAX];
        rec.borrows = vec![dec!(0), dec!(0)];
        let account = Account::unresolved(Address([3; 32]), rec);
        assert_eq!(account_value(&account, &cache(), &[]), Err(ValuationError::Overflow));

        let lopsided = AccountValue { assets: Decimal::MIN, liabilities: Decimal::MAX };
        assert_eq!(lopsided.net(), Err(ValuationError::Overflow));
    }
}

// Static client configuration, loaded once by the binary and passed down.
use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::state::Address;

/// Default on-disk config file; env vars prefixed `PERPSYNC__` override it.
pub const DEFAULT_CONFIG_PATH: &str = "perpsync.toml";
pub const ENV_PREFIX: &str = "PERPSYNC";
/// Largest accepted token decimals; 10^18 still fits a `u64`.
pub const MAX_DECIMALS: u32 = 18;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Static metadata for one perp market.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MarketConfig {
    pub name: String, // e.g. "SOL-PERP"
    pub market_index: usize,
    pub address: Address,
    pub bids: Address,
    pub asks: Address,
    pub event_queue: Address,
    pub base_decimals: u32,
    pub quote_decimals: u32,
    pub base_lot_size: i64,
    pub quote_lot_size: i64,
}

impl MarketConfig {
    /// Native base units per UI unit.
    pub fn base_scale(&self) -> Decimal {
        decimal_scale(self.base_decimals)
    }

    /// Native quote units per UI unit.
    pub fn quote_scale(&self) -> Decimal {
        decimal_scale(self.quote_decimals)
    }
}

// saturates past MAX_DECIMALS, which validate() rejects
fn decimal_scale(decimals: u32) -> Decimal {
    Decimal::from(10u64.saturating_pow(decimals))
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub rpc_url: String,
    #[serde(default = "default_rpc_timeout_ms")]
    pub rpc_timeout_ms: u64,
    pub program_id: Address,
    pub group: Address,
    pub margin_cache: Address,
    pub account: Address,
    pub owner: Address,
    pub basket_size: usize,
    pub markets: Vec<MarketConfig>,
}

fn default_rpc_timeout_ms() -> u64 {
    10_000
}

impl ClientConfig {
    /// Layer the file at `path` under `PERPSYNC__*` environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(true))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let cfg: ClientConfig = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.markets.is_empty() {
            return Err(ConfigError::Invalid("at least one market is required".into()));
        }
        let mut seen = HashSet::new();
        for m in &self.markets {
            if !seen.insert(m.market_index) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate market index {} ({})",
                    m.market_index, m.name
                )));
            }
            if m.market_index >= self.basket_size {
                return Err(ConfigError::Invalid(format!(
                    "market {} index {} outside basket of size {}",
                    m.name, m.market_index, self.basket_size
                )));
            }
            if m.base_lot_size <= 0 || m.quote_lot_size <= 0 {
                return Err(ConfigError::Invalid(format!("market {} has non-positive lot size", m.name)));
            }
            if m.base_decimals > MAX_DECIMALS || m.quote_decimals > MAX_DECIMALS {
                return Err(ConfigError::Invalid(format!(
                    "market {} decimals exceed {}",
                    m.name, MAX_DECIMALS
                )));
            }
        }
        Ok(())
    }

    pub fn market(&self, name: &str) -> Option<&MarketConfig> {
        self.markets.iter().find(|m| m.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn market(name: &str, market_index: usize, seed: u8) -> MarketConfig {
        MarketConfig {
            name: name.to_string(),
            market_index,
            address: Address([seed; 32]),
            bids: Address([seed + 1; 32]),
            asks: Address([seed + 2; 32]),
            event_queue: Address([seed + 3; 32]),
            base_decimals: 9,
            quote_decimals: 6,
            base_lot_size: 100_000_000,
            quote_lot_size: 100,
        }
    }

    pub(crate) fn client_config(basket_size: usize, markets: Vec<MarketConfig>) -> ClientConfig {
        ClientConfig {
            rpc_url: "http://127.0.0.1:8899".into(),
            rpc_timeout_ms: default_rpc_timeout_ms(),
            program_id: Address([200; 32]),
            group: Address([201; 32]),
            margin_cache: Address([202; 32]),
            account: Address([203; 32]),
            owner: Address([204; 32]),
            basket_size,
            markets,
        }
    }

    #[test]
    fn test_validate_accepts_distinct_markets() {
        let cfg = client_config(3, vec![market("SOL-PERP", 0, 10), market("BTC-PERP", 2, 20)]);
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.market("sol-perp").map(|m| m.market_index), Some(0));
    }

    #[test]
    fn test_validate_rejects_duplicate_index() {
        let cfg = client_config(3, vec![market("SOL-PERP", 1, 10), market("BTC-PERP", 1, 20)]);
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_index_outside_basket() {
        let cfg = client_config(2, vec![market("SOL-PERP", 2, 10)]);
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_oversized_decimals() {
        let mut sol = market("SOL-PERP", 0, 10);
        sol.base_decimals = 20;
        let cfg = client_config(2, vec![sol.clone()]);
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));

        sol.base_decimals = MAX_DECIMALS;
        assert!(client_config(2, vec![sol.clone()]).validate().is_ok());
        assert_eq!(sol.base_scale(), Decimal::from(1_000_000_000_000_000_000u64));
    }

    #[test]
    fn test_load_from_toml_file() {
        let addr = |b: u8| Address([b; 32]).to_string();
        let toml = format!(
            r#"
rpc_url = "http://localhost:8899"
program_id = "{p}"
group = "{g}"
margin_cache = "{c}"
account = "{a}"
owner = "{o}"
basket_size = 4

[[markets]]
name = "SOL-PERP"
market_index = 3
address = "{m}"
bids = "{b}"
asks = "{k}"
event_queue = "{e}"
base_decimals = 9
quote_decimals = 6
base_lot_size = 10000000
quote_lot_size = 100
"#,
            p = addr(1), g = addr(2), c = addr(3), a = addr(4), o = addr(5),
            m = addr(6), b = addr(7), k = addr(8), e = addr(9),
        );
        let path = std::env::temp_dir().join(format!("perpsync-test-{}.toml", std::process::id()));
        std::fs::write(&path, toml).unwrap();
        let cfg = ClientConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(cfg.rpc_timeout_ms, 10_000);
        assert_eq!(cfg.margin_cache, Address([3; 32]));
        assert_eq!(cfg.markets.len(), 1);
        assert_eq!(cfg.markets[0].asks, Address([8; 32]));
    }
}

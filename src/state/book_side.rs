use std::collections::BTreeMap;

use super::types::{BookLevel, BookSideKind, BookSideRecord};

/// Aggregated quantity at one price does not fit in an `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("aggregate quantity at price {price_lots} overflows")]
pub struct LevelOverflow {
    pub price_lots: i64,
}

/// One side of one market's book, in native lots.
///
/// Built once from a decoded blob and never patched; a later load builds a new
/// value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookSide {
    kind: BookSideKind,
    // price_lots -> aggregate quantity_lots
    levels: BTreeMap<i64, i64>,
}

impl BookSide {
    pub fn new(kind: BookSideKind, levels: &[BookLevel]) -> Result<Self, LevelOverflow> {
        let mut map = BTreeMap::new();
        for lvl in levels {
            if lvl.quantity_lots <= 0 {
                continue;
            }
            let qty: &mut i64 = map.entry(lvl.price_lots).or_insert(0);
            *qty = qty
                .checked_add(lvl.quantity_lots)
                .ok_or(LevelOverflow { price_lots: lvl.price_lots })?;
        }
        Ok(Self { kind, levels: map })
    }

    pub fn from_record(record: &BookSideRecord) -> Result<Self, LevelOverflow> {
        Self::new(record.kind, &record.levels)
    }

    pub fn kind(&self) -> BookSideKind {
        self.kind
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Best level: highest price for bids, lowest for asks.
    pub fn best(&self) -> Option<BookLevel> {
        let entry = match self.kind {
            BookSideKind::Bids => self.levels.iter().next_back(),
            BookSideKind::Asks => self.levels.iter().next(),
        };
        entry.map(|(p, q)| BookLevel { price_lots: *p, quantity_lots: *q })
    }

    /// Levels best-first.
    pub fn levels(&self) -> Vec<BookLevel> {
        let to_level = |(p, q): (&i64, &i64)| BookLevel { price_lots: *p, quantity_lots: *q };
        match self.kind {
            BookSideKind::Bids => self.levels.iter().rev().map(to_level).collect(),
            BookSideKind::Asks => self.levels.iter().map(to_level).collect(),
        }
    }

    pub fn to_record(&self) -> BookSideRecord {
        BookSideRecord { kind: self.kind, levels: self.levels() }
    }
}

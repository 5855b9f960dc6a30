//! Build-or-load-once access to the case tables.

use crate::model::figure::FigureKind;
use crate::prob::tables::FigureTable;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Source of case tables. Injectable so tests can substitute a provider
/// with prebuilt or trimmed tables.
pub trait TableProvider {
    fn table(&self, kind: FigureKind, length: u8) -> Arc<FigureTable>;
}

/// Process-wide table cache. The first request for a `(kind, length)` pair
/// builds its table under the lock, so concurrent first use neither rebuilds
/// nor observes a half-built entry; afterwards every lookup clones an `Arc`
/// to the immutable table.
#[derive(Debug, Default)]
pub struct CachedTableProvider {
    cache: Mutex<HashMap<(FigureKind, u8), Arc<FigureTable>>>,
}

impl CachedTableProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(kind, length)` pair the engine can ask for.
    pub fn all_table_keys() -> Vec<(FigureKind, u8)> {
        let mut keys = vec![
            (FigureKind::Single, 1),
            (FigureKind::Pair, 2),
            (FigureKind::Triple, 3),
            (FigureKind::Bomb, 4),
            (FigureKind::FullHouse, 5),
        ];
        for length in (4..=14u8).step_by(2) {
            keys.push((FigureKind::Stair, length));
        }
        for length in 5..=14u8 {
            keys.push((FigureKind::Street, length));
        }
        keys
    }

    /// Builds everything up front, for deployments that fork read-only
    /// workers after startup.
    pub fn preload_all(&self) {
        for (kind, length) in Self::all_table_keys() {
            let _ = self.table(kind, length);
        }
    }

    /// Snapshot of every table built so far, in a stable order.
    pub fn snapshot(&self) -> TableSnapshot {
        let cache = self.cache.lock().expect("table cache poisoned");
        let mut tables: Vec<FigureTable> = cache.values().map(|table| (**table).clone()).collect();
        tables.sort_by_key(|table| (table.kind as u8, table.length));
        TableSnapshot { tables }
    }
}

impl TableProvider for CachedTableProvider {
    fn table(&self, kind: FigureKind, length: u8) -> Arc<FigureTable> {
        let mut cache = self.cache.lock().expect("table cache poisoned");
        cache
            .entry((kind, length))
            .or_insert_with(|| Arc::new(FigureTable::build(kind, length)))
            .clone()
    }
}

/// Serializable bundle of case tables. Round-tripping reproduces the tables
/// exactly; they are pure functions of `(kind, length)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub tables: Vec<FigureTable>,
}

impl TableSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn restore(self) -> CachedTableProvider {
        let provider = CachedTableProvider::new();
        {
            let mut cache = provider.cache.lock().expect("table cache poisoned");
            for table in self.tables {
                cache.insert((table.kind, table.length), Arc::new(table));
            }
        }
        provider
    }
}

#[cfg(test)]
mod tests {
    use super::{CachedTableProvider, TableProvider, TableSnapshot};
    use crate::model::figure::FigureKind;
    use std::sync::Arc;

    #[test]
    fn repeated_lookups_share_one_table() {
        let provider = CachedTableProvider::new();
        let first = provider.table(FigureKind::Pair, 2);
        let second = provider.table(FigureKind::Pair, 2);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn snapshot_roundtrip_reproduces_tables() {
        let provider = CachedTableProvider::new();
        let pair = provider.table(FigureKind::Pair, 2);
        let single = provider.table(FigureKind::Single, 1);

        let json = provider.snapshot().to_json().unwrap();
        let restored = TableSnapshot::from_json(&json).unwrap().restore();

        assert_eq!(*restored.table(FigureKind::Pair, 2), *pair);
        assert_eq!(*restored.table(FigureKind::Single, 1), *single);
    }

    #[test]
    fn table_keys_cover_all_variable_lengths() {
        let keys = CachedTableProvider::all_table_keys();
        assert!(keys.contains(&(FigureKind::Stair, 14)));
        assert!(keys.contains(&(FigureKind::Street, 5)));
        assert!(keys.contains(&(FigureKind::Street, 14)));
        assert!(!keys.contains(&(FigureKind::Stair, 5)));
    }
}

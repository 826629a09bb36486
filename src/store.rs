//! In-memory store of open and recently closed trades.
//!
//! The store is the client-side mirror of the server's trade table, keyed by
//! trade id. Every mutation broadcasts a full snapshot to interested
//! consumers, plus a per-record change event for listeners that only care
//! about the touched trade.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;

use crate::models::TradeRecord;

const SNAPSHOT_CAPACITY: usize = 64;
const CHANGE_CAPACITY: usize = 256;

pub struct TradeStore {
    trades: Mutex<HashMap<String, TradeRecord>>,
    snapshots: broadcast::Sender<Vec<TradeRecord>>,
    changes: broadcast::Sender<TradeRecord>,
}

impl TradeStore {
    pub fn new() -> Self {
        let (snapshots, _) = broadcast::channel(SNAPSHOT_CAPACITY);
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            trades: Mutex::new(HashMap::new()),
            snapshots,
            changes,
        }
    }

    /// Inserts or replaces a trade, then broadcasts the new snapshot and the
    /// changed record, in that order.
    pub fn upsert(&self, trade: TradeRecord) {
        let snapshot = {
            let mut trades = self.trades.lock().unwrap();
            trades.insert(trade.trade_id.clone(), trade.clone());
            trades.values().cloned().collect()
        };
        let _ = self.snapshots.send(snapshot);
        let _ = self.changes.send(trade);
    }

    /// Removes a trade and broadcasts the new snapshot. Archiving an unknown
    /// id still broadcasts, mirroring the server's idempotent archive.
    pub fn archive(&self, trade_id: &str) {
        let snapshot = {
            let mut trades = self.trades.lock().unwrap();
            trades.remove(trade_id);
            trades.values().cloned().collect()
        };
        let _ = self.snapshots.send(snapshot);
    }

    /// Current snapshot, in no particular order.
    pub fn snapshot(&self) -> Vec<TradeRecord> {
        self.trades.lock().unwrap().values().cloned().collect()
    }

    pub fn get(&self, trade_id: &str) -> Option<TradeRecord> {
        self.trades.lock().unwrap().get(trade_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.trades.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.lock().unwrap().is_empty()
    }

    pub fn subscribe_snapshots(&self) -> broadcast::Receiver<Vec<TradeRecord>> {
        self.snapshots.subscribe()
    }

    pub fn subscribe_changes(&self) -> broadcast::Receiver<TradeRecord> {
        self.changes.subscribe()
    }
}

impl Default for TradeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;
    use crate::models::TradeStatus;

    fn trade(id: &str, symbol: &str) -> TradeRecord {
        TradeRecord {
            trade_id: id.to_string(),
            symbol: symbol.to_string(),
            ..TradeRecord::default()
        }
    }

    #[test]
    fn upsert_replaces_by_id() {
        let store = TradeStore::new();
        store.upsert(trade("t-1", "BTCUSDT"));

        let mut updated = trade("t-1", "BTCUSDT");
        updated.status = TradeStatus::Watching;
        store.upsert(updated);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("t-1").unwrap().status, TradeStatus::Watching);
    }

    #[test]
    fn upsert_then_archive_broadcasts_two_snapshots() {
        let store = TradeStore::new();
        let mut snapshots = store.subscribe_snapshots();

        store.upsert(trade("t-1", "BTCUSDT"));
        store.archive("t-1");

        assert_eq!(snapshots.try_recv().unwrap().len(), 1);
        assert_eq!(snapshots.try_recv().unwrap().len(), 0);
        assert!(matches!(snapshots.try_recv(), Err(TryRecvError::Empty)));
        assert!(store.is_empty());
    }

    #[test]
    fn change_event_carries_the_touched_record() {
        let store = TradeStore::new();
        let mut changes = store.subscribe_changes();

        store.upsert(trade("t-7", "ETHUSDT"));

        let changed = changes.try_recv().unwrap();
        assert_eq!(changed.trade_id, "t-7");
        assert_eq!(changed.symbol, "ETHUSDT");
    }

    #[test]
    fn archive_unknown_id_still_broadcasts() {
        let store = TradeStore::new();
        let mut snapshots = store.subscribe_snapshots();

        store.archive("missing");

        assert!(snapshots.try_recv().unwrap().is_empty());
    }
}

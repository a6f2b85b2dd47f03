//! In-memory record store.

use super::{GraphStore, StoreResult};
use crate::codec::StorageRecord;
use crate::model::kind::NodeKind;
use crate::model::node::NodeId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Process-local store keeping cloned records in a map.
///
/// Also counts writes, which tests use to observe what a save touched.
#[derive(Debug, Default)]
pub struct MemoryGraphStore {
    records: RwLock<HashMap<NodeId, StorageRecord>>,
    writes: AtomicUsize,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of `put_record` calls served.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Acquire)
    }
}

impl GraphStore for MemoryGraphStore {
    fn put_record(&self, record: &StorageRecord) -> StoreResult<()> {
        self.records.write().insert(record.id, record.clone());
        self.writes.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn get_record(&self, id: NodeId) -> StoreResult<Option<StorageRecord>> {
        Ok(self.records.read().get(&id).cloned())
    }

    fn list_by_kind(&self, kind: NodeKind) -> StoreResult<Vec<StorageRecord>> {
        let mut records: Vec<StorageRecord> = self
            .records
            .read()
            .values()
            .filter(|record| record.kind == kind)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.id);
        Ok(records)
    }

    fn remove_record(&self, id: NodeId) -> StoreResult<bool> {
        Ok(self.records.write().remove(&id).is_some())
    }

    fn record_count(&self) -> StoreResult<usize> {
        Ok(self.records.read().len())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryGraphStore;
    use crate::codec::StorageRecord;
    use crate::model::attr::Attributes;
    use crate::model::kind::NodeKind;
    use crate::store::GraphStore;
    use uuid::Uuid;

    fn record(kind: NodeKind) -> StorageRecord {
        StorageRecord {
            id: Uuid::now_v7(),
            kind,
            attributes: Attributes::new(),
            children: Vec::new(),
        }
    }

    #[test]
    fn put_replaces_record_with_same_identity() {
        let store = MemoryGraphStore::new();
        let mut first = record(NodeKind::Project);
        store.put_record(&first).unwrap();
        first.children.push(Uuid::now_v7());
        store.put_record(&first).unwrap();

        assert_eq!(store.record_count().unwrap(), 1);
        assert_eq!(store.write_count(), 2);
        assert_eq!(store.get_record(first.id).unwrap(), Some(first));
    }

    #[test]
    fn list_by_kind_filters_and_orders() {
        let store = MemoryGraphStore::new();
        let graphs = [record(NodeKind::Graph), record(NodeKind::Graph)];
        for graph in &graphs {
            store.put_record(graph).unwrap();
        }
        store.put_record(&record(NodeKind::Story)).unwrap();

        let listed = store.list_by_kind(NodeKind::Graph).unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].id < listed[1].id);
        assert!(!store.contains(Uuid::now_v7()).unwrap());
    }

    #[test]
    fn remove_reports_whether_record_existed() {
        let store = MemoryGraphStore::new();
        let story = record(NodeKind::Story);
        store.put_record(&story).unwrap();

        assert!(store.remove_record(story.id).unwrap());
        assert!(!store.remove_record(story.id).unwrap());
        assert_eq!(store.record_count().unwrap(), 0);
    }
}

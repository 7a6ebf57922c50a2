//! In-memory backend.
//!
//! Collections live behind one [`RwLock`]. Transactions stage their writes
//! locally and apply them under a single write lock at commit, so readers
//! never observe a partially applied transaction. Secondary indices are
//! maintained as ordered maps from the indexed value's JSON text to the
//! set of primary keys holding it.

use std::collections::{BTreeMap, BTreeSet};

use cubegrid_types::EntityKind;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::backend::{BackendTransaction, DocumentBackend};
use crate::error::BackendError;
use crate::schema::{CollectionSpec, IndexSpec, StoreSchema};

/// Indexed value text -> primary keys.
type IndexEntries = BTreeMap<String, BTreeSet<String>>;

/// Lookup text for an indexed value. Numbers compare by value, so `1` and
/// `1.0` share an entry.
fn index_text(value: &Value) -> String {
    match value {
        Value::Number(n) => n.as_f64().map_or_else(|| n.to_string(), |f| f.to_string()),
        other => other.to_string(),
    }
}

#[derive(Debug, Default)]
struct Collection {
    indices: Vec<IndexSpec>,
    rows: BTreeMap<String, Value>,
    entries: BTreeMap<&'static str, IndexEntries>,
}

impl Collection {
    fn new(spec: &CollectionSpec) -> Self {
        Self {
            indices: spec.indices.clone(),
            ..Self::default()
        }
    }

    /// Replace the index set and rebuild every index from the stored rows.
    fn reindex(&mut self, indices: &[IndexSpec]) {
        self.indices = indices.to_vec();
        self.entries.clear();
        let rows = std::mem::take(&mut self.rows);
        for (key, document) in &rows {
            self.index_row(key, document);
        }
        self.rows = rows;
    }

    fn index_row(&mut self, key: &str, document: &Value) {
        for index in &self.indices {
            if let Some(value) = index.extract(document) {
                self.entries
                    .entry(index.name)
                    .or_default()
                    .entry(index_text(value))
                    .or_default()
                    .insert(key.to_owned());
            }
        }
    }

    fn unindex_row(&mut self, key: &str, document: &Value) {
        for index in &self.indices {
            let Some(value) = index.extract(document) else {
                continue;
            };
            let Some(entries) = self.entries.get_mut(index.name) else {
                continue;
            };
            let text = index_text(value);
            if let Some(keys) = entries.get_mut(&text) {
                keys.remove(key);
                if keys.is_empty() {
                    entries.remove(&text);
                }
            }
        }
    }

    fn put(&mut self, key: String, document: Value) {
        if let Some(previous) = self.rows.remove(&key) {
            self.unindex_row(&key, &previous);
        }
        self.index_row(&key, &document);
        self.rows.insert(key, document);
    }
}

#[derive(Debug, Default)]
struct State {
    name: Option<(String, u32)>,
    collections: BTreeMap<EntityKind, Collection>,
}

/// A process-local backend, mainly for tests and single-process use.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<State>,
}

impl MemoryBackend {
    /// Create an empty backend with no collections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents stored in `kind`'s collection.
    pub async fn len(&self, kind: EntityKind) -> usize {
        self.state
            .read()
            .await
            .collections
            .get(&kind)
            .map_or(0, |c| c.rows.len())
    }

    /// Name and version of the last successful `create_collections`.
    pub async fn database(&self) -> Option<(String, u32)> {
        self.state.read().await.name.clone()
    }
}

impl DocumentBackend for MemoryBackend {
    type Transaction<'a> = MemoryTransaction<'a>;

    async fn create_collections(
        &self,
        name: &str,
        version: u32,
        schema: &StoreSchema,
    ) -> Result<(), BackendError> {
        let mut state = self.state.write().await;
        for spec in &schema.collections {
            match state.collections.get_mut(&spec.kind) {
                Some(existing) if existing.indices != spec.indices => {
                    existing.reindex(&spec.indices);
                }
                Some(_) => {}
                None => {
                    state.collections.insert(spec.kind, Collection::new(spec));
                }
            }
        }
        state.name = Some((name.to_owned(), version));
        Ok(())
    }

    async fn get(&self, kind: EntityKind, key: &str) -> Result<Option<Value>, BackendError> {
        let state = self.state.read().await;
        let collection = state
            .collections
            .get(&kind)
            .ok_or(BackendError::UnknownCollection(kind))?;
        Ok(collection.rows.get(key).cloned())
    }

    async fn get_all_by_index(
        &self,
        kind: EntityKind,
        index: &IndexSpec,
        value: &Value,
    ) -> Result<Vec<Value>, BackendError> {
        let state = self.state.read().await;
        let collection = state
            .collections
            .get(&kind)
            .ok_or(BackendError::UnknownCollection(kind))?;
        let keys = collection
            .entries
            .get(index.name)
            .and_then(|entries| entries.get(&index_text(value)));
        Ok(keys
            .into_iter()
            .flatten()
            .filter_map(|key| collection.rows.get(key).cloned())
            .collect())
    }

    async fn begin(&self, scope: &[EntityKind]) -> Result<MemoryTransaction<'_>, BackendError> {
        let state = self.state.read().await;
        if let Some(missing) = scope.iter().find(|k| !state.collections.contains_key(k)) {
            return Err(BackendError::UnknownCollection(*missing));
        }
        Ok(MemoryTransaction {
            backend: self,
            scope: scope.to_vec(),
            staged: Vec::new(),
        })
    }
}

/// A transaction against a [`MemoryBackend`]; writes are staged until commit.
#[derive(Debug)]
pub struct MemoryTransaction<'a> {
    backend: &'a MemoryBackend,
    scope: Vec<EntityKind>,
    staged: Vec<(EntityKind, String, Value)>,
}

impl BackendTransaction for MemoryTransaction<'_> {
    async fn put(
        &mut self,
        kind: EntityKind,
        key: &str,
        document: Value,
    ) -> Result<(), BackendError> {
        if !self.scope.contains(&kind) {
            return Err(BackendError::OutOfScope(kind));
        }
        self.staged.push((kind, key.to_owned(), document));
        Ok(())
    }

    async fn commit(self) -> Result<(), BackendError> {
        let mut state = self.backend.state.write().await;
        if let Some((missing, _, _)) = self
            .staged
            .iter()
            .find(|(kind, _, _)| !state.collections.contains_key(kind))
        {
            return Err(BackendError::UnknownCollection(*missing));
        }
        for (kind, key, document) in self.staged {
            if let Some(collection) = state.collections.get_mut(&kind) {
                collection.put(key, document);
            }
        }
        Ok(())
    }

    async fn rollback(self) -> Result<(), BackendError> {
        tracing::debug!(discarded = self.staged.len(), "Rolled back in-memory transaction");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn backend() -> MemoryBackend {
        let backend = MemoryBackend::new();
        let created = backend
            .create_collections("test", 1, &StoreSchema::standard())
            .await;
        assert!(created.is_ok());
        backend
    }

    #[tokio::test]
    async fn writes_are_invisible_until_commit() {
        let backend = backend().await;
        let mut tx = backend.begin(&[EntityKind::Cube]).await.unwrap();
        tx.put(EntityKind::Cube, "1", json!({ "id": "1", "windowUID": "w" }))
            .await
            .unwrap();
        assert_eq!(backend.get(EntityKind::Cube, "1").await.unwrap(), None);

        tx.commit().await.unwrap();
        assert!(backend.get(EntityKind::Cube, "1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn rollback_discards_staged_writes() {
        let backend = backend().await;
        let mut tx = backend.begin(&[EntityKind::Cube]).await.unwrap();
        tx.put(EntityKind::Cube, "1", json!({ "id": "1" })).await.unwrap();
        tx.rollback().await.unwrap();
        assert_eq!(backend.len(EntityKind::Cube).await, 0);
    }

    #[tokio::test]
    async fn puts_outside_scope_fail() {
        let backend = backend().await;
        let mut tx = backend.begin(&[EntityKind::Cube]).await.unwrap();
        let result = tx.put(EntityKind::Subcube, "1", json!({})).await;
        assert!(matches!(result, Err(BackendError::OutOfScope(EntityKind::Subcube))));
    }

    #[tokio::test]
    async fn unknown_collections_are_reported() {
        let backend = MemoryBackend::new();
        assert!(matches!(
            backend.get(EntityKind::Cube, "1").await,
            Err(BackendError::UnknownCollection(EntityKind::Cube))
        ));
        assert!(backend.begin(&[EntityKind::Cube]).await.is_err());
    }

    #[tokio::test]
    async fn index_entries_follow_upserts() {
        let backend = backend().await;
        let index = IndexSpec::field("windowUID");

        let mut tx = backend.begin(&[EntityKind::Cube]).await.unwrap();
        tx.put(EntityKind::Cube, "1", json!({ "id": "1", "windowUID": "a" })).await.unwrap();
        tx.put(EntityKind::Cube, "2", json!({ "id": "2", "windowUID": "a" })).await.unwrap();
        tx.commit().await.unwrap();

        let mut tx = backend.begin(&[EntityKind::Cube]).await.unwrap();
        tx.put(EntityKind::Cube, "1", json!({ "id": "1", "windowUID": "b" })).await.unwrap();
        tx.commit().await.unwrap();

        let in_a = backend
            .get_all_by_index(EntityKind::Cube, &index, &json!("a"))
            .await
            .unwrap();
        assert_eq!(in_a, vec![json!({ "id": "2", "windowUID": "a" })]);

        let in_b = backend
            .get_all_by_index(EntityKind::Cube, &index, &json!("b"))
            .await
            .unwrap();
        assert_eq!(in_b.len(), 1);
        assert_eq!(backend.len(EntityKind::Cube).await, 2);
    }

    #[tokio::test]
    async fn numeric_index_values_compare_by_value() {
        let backend = backend().await;
        let index = IndexSpec::nested("weight", "value.2");
        let mut tx = backend.begin(&[EntityKind::SubcubeVertex]).await.unwrap();
        tx.put(
            EntityKind::SubcubeVertex,
            "v",
            json!({ "id": "v", "value": [[0, 0, 0], [0, 0, 0], 2, "p"] }),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let hits = backend
            .get_all_by_index(EntityKind::SubcubeVertex, &index, &json!(2.0))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn create_collections_is_idempotent() {
        let backend = backend().await;
        let mut tx = backend.begin(&[EntityKind::Cube]).await.unwrap();
        tx.put(EntityKind::Cube, "1", json!({ "id": "1", "windowUID": "a" })).await.unwrap();
        tx.commit().await.unwrap();

        backend
            .create_collections("test", 2, &StoreSchema::standard())
            .await
            .unwrap();
        assert_eq!(backend.len(EntityKind::Cube).await, 1);
        assert_eq!(backend.database().await, Some(("test".to_owned(), 2)));
    }
}

//! The persistent-store contract required by the entity store.
//!
//! A backend exposes named collections (one per
//! [`EntityKind`]) with put-by-key, get-by-key, and get-all-by-index, plus
//! transactions scoped to an explicit set of collections. A transaction's
//! writes become visible all at once on [`BackendTransaction::commit`], or
//! not at all.

use std::future::Future;

use cubegrid_types::EntityKind;
use serde_json::Value;

use crate::error::BackendError;
use crate::schema::{IndexSpec, StoreSchema};

/// A transactional document store with secondary indices.
pub trait DocumentBackend: Send + Sync {
    /// Transaction handle borrowed from the backend.
    type Transaction<'a>: BackendTransaction
    where
        Self: 'a;

    /// Create every collection and index in `schema`. Must be idempotent.
    fn create_collections(
        &self,
        name: &str,
        version: u32,
        schema: &StoreSchema,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Read one document by primary key.
    fn get(
        &self,
        kind: EntityKind,
        key: &str,
    ) -> impl Future<Output = Result<Option<Value>, BackendError>> + Send;

    /// Read every document whose indexed value equals `value`, in key order.
    fn get_all_by_index(
        &self,
        kind: EntityKind,
        index: &IndexSpec,
        value: &Value,
    ) -> impl Future<Output = Result<Vec<Value>, BackendError>> + Send;

    /// Open a transaction over the collections in `scope`.
    fn begin(
        &self,
        scope: &[EntityKind],
    ) -> impl Future<Output = Result<Self::Transaction<'_>, BackendError>> + Send;
}

/// An open transaction. Dropping it without committing discards its writes.
pub trait BackendTransaction: Send {
    /// Upsert `document` under `key`.
    fn put(
        &mut self,
        kind: EntityKind,
        key: &str,
        document: Value,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Make every write visible at once.
    fn commit(self) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Discard every write.
    fn rollback(self) -> impl Future<Output = Result<(), BackendError>> + Send;
}

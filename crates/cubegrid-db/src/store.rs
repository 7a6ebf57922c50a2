//! The entity store: validated, indexed, transactional persistence for the
//! cube hierarchy.
//!
//! Every write path runs the same pipeline: structural validation (which
//! also fills in derived fields), the `originID` consistency check for
//! subcube kinds, key extraction, and an upsert inside a backend
//! transaction. Multi-document writes validate everything first and then
//! commit in one transaction scoped to exactly the collections they touch.

use std::collections::BTreeMap;

use cubegrid_types::{
    BackgroundMatrix, Cube, CubeMatrix, CubeVertex, EntityKind, MatrixKind, Record, Subcube,
    SubcubeMatrix, SubcubeVertex, WindowUid,
};
use serde::Serialize;
use serde_json::Value;

use crate::backend::{BackendTransaction, DocumentBackend};
use crate::error::StoreError;
use crate::schema::StoreSchema;
use crate::validate::{check_origin, document_key, validate_document};

/// Name, version, and schema recorded by a successful initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreInfo {
    /// Database name passed to `initialize`.
    pub name: String,
    /// Schema version passed to `initialize`.
    pub version: u32,
    /// The collections and indices in use.
    pub schema: StoreSchema,
}

/// A cube and its full subtree, written atomically by
/// [`EntityStore::update_hierarchy`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HierarchyBundle {
    /// The cube document.
    pub cube: Value,
    /// Subcube documents.
    pub subcubes: Vec<Value>,
    /// Subcube vertex documents.
    pub subcube_vertices: Vec<Value>,
    /// Cube vertex documents.
    pub cube_vertices: Vec<Value>,
}

impl HierarchyBundle {
    /// Build a bundle from typed records.
    pub fn from_records(
        cube: &Cube,
        subcubes: &[Subcube],
        subcube_vertices: &[SubcubeVertex],
        cube_vertices: &[CubeVertex],
    ) -> Result<Self, StoreError> {
        Ok(Self {
            cube: serde_json::to_value(cube)?,
            subcubes: to_documents(subcubes)?,
            subcube_vertices: to_documents(subcube_vertices)?,
            cube_vertices: to_documents(cube_vertices)?,
        })
    }

    /// The bundle's documents in write order.
    fn into_writes(self) -> impl Iterator<Item = (EntityKind, Value)> {
        std::iter::once((EntityKind::Cube, self.cube))
            .chain(self.cube_vertices.into_iter().map(|d| (EntityKind::CubeVertex, d)))
            .chain(self.subcubes.into_iter().map(|d| (EntityKind::Subcube, d)))
            .chain(
                self.subcube_vertices
                    .into_iter()
                    .map(|d| (EntityKind::SubcubeVertex, d)),
            )
    }
}

/// One entry of [`EntityStore::batch_update_matrices`].
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixUpdate {
    /// Which matrix collection the document belongs to.
    pub kind: MatrixKind,
    /// The matrix document.
    pub matrix: Value,
}

impl MatrixUpdate {
    /// Wrap a raw matrix document.
    pub const fn new(kind: MatrixKind, matrix: Value) -> Self {
        Self { kind, matrix }
    }

    /// A cube matrix update.
    pub fn cube(matrix: &CubeMatrix) -> Result<Self, StoreError> {
        Ok(Self::new(MatrixKind::Cube, serde_json::to_value(matrix)?))
    }

    /// A subcube matrix update.
    pub fn subcube(matrix: &SubcubeMatrix) -> Result<Self, StoreError> {
        Ok(Self::new(MatrixKind::Subcube, serde_json::to_value(matrix)?))
    }

    /// A background matrix update.
    pub fn background(matrix: &BackgroundMatrix) -> Result<Self, StoreError> {
        Ok(Self::new(MatrixKind::Background, serde_json::to_value(matrix)?))
    }
}

/// Every spatially placed entity of one window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSnapshot {
    /// The window the snapshot was taken for.
    pub window_uid: WindowUid,
    /// Cubes in the window.
    pub cubes: Vec<Cube>,
    /// Cube vertices in the window.
    pub cube_vertices: Vec<CubeVertex>,
    /// Subcubes in the window.
    pub subcubes: Vec<Subcube>,
    /// Subcube vertices in the window.
    pub subcube_vertices: Vec<SubcubeVertex>,
}

impl WindowSnapshot {
    /// An empty snapshot of `window_uid`.
    pub const fn new(window_uid: WindowUid) -> Self {
        Self {
            window_uid,
            cubes: Vec::new(),
            cube_vertices: Vec::new(),
            subcubes: Vec::new(),
            subcube_vertices: Vec::new(),
        }
    }

    /// Total number of entities in the snapshot.
    pub fn len(&self) -> usize {
        self.cubes
            .len()
            .saturating_add(self.cube_vertices.len())
            .saturating_add(self.subcubes.len())
            .saturating_add(self.subcube_vertices.len())
    }

    /// Whether the snapshot holds no entities.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A validated document ready to be written.
#[derive(Debug)]
struct PreparedWrite {
    kind: EntityKind,
    key: String,
    document: Value,
}

/// Validated, indexed persistence over a [`DocumentBackend`].
#[derive(Debug)]
pub struct EntityStore<B> {
    backend: B,
    info: Option<StoreInfo>,
}

impl<B: DocumentBackend> EntityStore<B> {
    /// Wrap a backend. The store must be initialized before use.
    pub const fn new(backend: B) -> Self {
        Self {
            backend,
            info: None,
        }
    }

    /// The underlying backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Whether [`initialize`](Self::initialize) has completed.
    pub const fn is_initialized(&self) -> bool {
        self.info.is_some()
    }

    /// Details of the last successful initialization.
    pub const fn info(&self) -> Option<&StoreInfo> {
        self.info.as_ref()
    }

    /// Create every collection and secondary index in `schema`.
    ///
    /// Idempotent: calling it again with the same schema is a no-op on
    /// existing data.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Schema`] if `schema` lacks a collection for
    /// some entity kind, or [`StoreError::Backend`] if collection creation
    /// fails. A failed call leaves the store uninitialized.
    pub async fn initialize(
        &mut self,
        name: &str,
        version: u32,
        schema: StoreSchema,
    ) -> Result<(), StoreError> {
        if let Some(missing) = schema.first_missing() {
            return Err(StoreError::Schema(format!(
                "no collection defined for {missing}"
            )));
        }

        self.backend.create_collections(name, version, &schema).await?;

        tracing::info!(
            name,
            version,
            collections = schema.collections.len(),
            "Entity store initialized"
        );

        self.info = Some(StoreInfo {
            name: name.to_owned(),
            version,
            schema,
        });
        Ok(())
    }

    fn schema(&self) -> Result<&StoreSchema, StoreError> {
        self.info
            .as_ref()
            .map(|info| &info.schema)
            .ok_or(StoreError::NotInitialized)
    }

    /// Validate `document` as a `kind`, filling in derived fields.
    pub fn validate(&self, document: &mut Value, kind: EntityKind) -> Result<(), StoreError> {
        self.schema()?;
        validate_document(kind, document)?;
        Ok(())
    }

    fn prepare(&self, kind: EntityKind, mut document: Value) -> Result<PreparedWrite, StoreError> {
        self.validate(&mut document, kind)?;
        check_origin(kind, &document)?;
        let key = document_key(kind, &document)?;
        Ok(PreparedWrite {
            kind,
            key,
            document,
        })
    }

    /// Validate and upsert one document. Returns the stored form, with
    /// derived fields populated.
    ///
    /// # Errors
    ///
    /// Validation and consistency errors are returned before anything is
    /// written.
    pub async fn save(&self, document: Value, kind: EntityKind) -> Result<Value, StoreError> {
        let write = self.prepare(kind, document)?;

        let mut tx = self.backend.begin(&[kind]).await?;
        if let Err(e) = tx.put(kind, &write.key, write.document.clone()).await {
            discard(tx).await;
            return Err(e.into());
        }
        tx.commit().await?;

        tracing::debug!(collection = %kind, key = %write.key, "Saved document");
        Ok(write.document)
    }

    /// Point lookup by primary key. A miss is `Ok(None)`.
    pub async fn get(&self, key: &str, kind: EntityKind) -> Result<Option<Value>, StoreError> {
        self.schema()?;
        Ok(self.backend.get(kind, key).await?)
    }

    /// Every document of `kind` whose `index` equals `value`, in key order.
    /// A miss is an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnknownIndex`] if the collection declares no
    /// index named `index`.
    pub async fn query_by_index(
        &self,
        index: &str,
        value: &Value,
        kind: EntityKind,
    ) -> Result<Vec<Value>, StoreError> {
        let spec = self
            .schema()?
            .collection(kind)
            .and_then(|c| c.index(index))
            .copied()
            .ok_or_else(|| StoreError::UnknownIndex {
                kind,
                index: index.to_owned(),
            })?;
        Ok(self.backend.get_all_by_index(kind, &spec, value).await?)
    }

    /// Save a typed record and return its stored form.
    pub async fn save_record<R: Record>(&self, record: &R) -> Result<R, StoreError> {
        let stored = self.save(serde_json::to_value(record)?, R::KIND).await?;
        Ok(serde_json::from_value(stored)?)
    }

    /// Load a typed record by key.
    pub async fn get_record<R: Record>(&self, key: &str) -> Result<Option<R>, StoreError> {
        self.get(key, R::KIND)
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(StoreError::from)
    }

    /// Typed variant of [`query_by_index`](Self::query_by_index).
    pub async fn query_records<R: Record>(
        &self,
        index: &str,
        value: &Value,
    ) -> Result<Vec<R>, StoreError> {
        self.query_by_index(index, value, R::KIND)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(StoreError::from))
            .collect()
    }

    /// Write a cube and its subtree as one atomic transaction across
    /// `Cubes`, `CubeVertices`, `Subcubes`, and `SubcubeVertices`.
    ///
    /// Returns the number of documents written.
    ///
    /// # Errors
    ///
    /// Any failure, whether a validation or consistency error on one
    /// document or a backend failure, is returned as
    /// [`StoreError::Transaction`] wrapping the first cause. Nothing from
    /// the bundle is visible afterwards.
    pub async fn update_hierarchy(&self, bundle: HierarchyBundle) -> Result<usize, StoreError> {
        const SCOPE: [EntityKind; 4] = [
            EntityKind::Cube,
            EntityKind::CubeVertex,
            EntityKind::Subcube,
            EntityKind::SubcubeVertex,
        ];

        let writes = bundle
            .into_writes()
            .map(|(kind, document)| self.prepare(kind, document))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| abort_before_write("hierarchy", e))?;

        let written = self.write_atomically(&SCOPE, writes).await?;
        tracing::info!(documents = written, "Committed hierarchy update");
        Ok(written)
    }

    /// Write a batch of matrices in one atomic transaction spanning every
    /// matrix collection the batch references.
    ///
    /// Returns the number of matrices written; an empty batch writes
    /// nothing and opens no transaction.
    ///
    /// # Errors
    ///
    /// As for [`update_hierarchy`](Self::update_hierarchy): one invalid
    /// matrix aborts the whole batch.
    pub async fn batch_update_matrices(
        &self,
        updates: Vec<MatrixUpdate>,
    ) -> Result<usize, StoreError> {
        if updates.is_empty() {
            return Ok(0);
        }

        let mut grouped: BTreeMap<EntityKind, Vec<Value>> = BTreeMap::new();
        for update in updates {
            grouped
                .entry(update.kind.entity_kind())
                .or_default()
                .push(update.matrix);
        }
        let scope: Vec<EntityKind> = grouped.keys().copied().collect();

        let writes = grouped
            .into_iter()
            .flat_map(|(kind, docs)| docs.into_iter().map(move |doc| (kind, doc)))
            .map(|(kind, document)| self.prepare(kind, document))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| abort_before_write("matrix batch", e))?;

        let written = self.write_atomically(&scope, writes).await?;
        tracing::info!(
            matrices = written,
            collections = scope.len(),
            "Committed matrix batch"
        );
        Ok(written)
    }

    /// Every cube, cube vertex, subcube, and subcube vertex whose
    /// `windowUID` equals `window_uid`.
    ///
    /// Documents written with a numeric `windowUID` match its decimal form.
    pub async fn window_snapshot(
        &self,
        window_uid: &WindowUid,
    ) -> Result<WindowSnapshot, StoreError> {
        let mut keys = vec![Value::from(window_uid.as_str())];
        if let Some(numeric) = numeric_alias(window_uid.as_str()) {
            keys.push(Value::from(numeric));
        }

        let snapshot = WindowSnapshot {
            window_uid: window_uid.clone(),
            cubes: self.window_records(&keys).await?,
            cube_vertices: self.window_records(&keys).await?,
            subcubes: self.window_records(&keys).await?,
            subcube_vertices: self.window_records(&keys).await?,
        };

        tracing::debug!(
            window = %window_uid,
            cubes = snapshot.cubes.len(),
            subcubes = snapshot.subcubes.len(),
            subcube_vertices = snapshot.subcube_vertices.len(),
            "Took window snapshot"
        );
        Ok(snapshot)
    }

    async fn window_records<R: Record>(&self, keys: &[Value]) -> Result<Vec<R>, StoreError> {
        let mut records = Vec::new();
        for key in keys {
            records.extend(self.query_records::<R>("windowUID", key).await?);
        }
        Ok(records)
    }

    /// Stage `writes` in one transaction over `scope` and commit.
    async fn write_atomically(
        &self,
        scope: &[EntityKind],
        writes: Vec<PreparedWrite>,
    ) -> Result<usize, StoreError> {
        let count = writes.len();
        let mut tx = self
            .backend
            .begin(scope)
            .await
            .map_err(StoreError::transaction)?;

        for write in writes {
            if let Err(e) = tx.put(write.kind, &write.key, write.document).await {
                tracing::warn!(
                    collection = %write.kind,
                    key = %write.key,
                    error = %e,
                    "Write failed, rolling back transaction"
                );
                discard(tx).await;
                return Err(StoreError::transaction(e));
            }
        }

        tx.commit().await.map_err(StoreError::transaction)?;
        Ok(count)
    }
}

/// The integer a window id also matches when stored as a JSON number.
///
/// Only canonical decimal text qualifies, so `"01"` and `"+1"` stay
/// distinct from the number `1`.
fn numeric_alias(window_uid: &str) -> Option<i64> {
    window_uid
        .parse::<i64>()
        .ok()
        .filter(|n| n.to_string() == window_uid)
}

/// Roll back `tx`, logging rather than returning a rollback failure so the
/// original cause is what reaches the caller.
async fn discard<T: BackendTransaction>(tx: T) {
    if let Err(e) = tx.rollback().await {
        tracing::warn!(error = %e, "Rollback failed");
    }
}

fn abort_before_write(operation: &'static str, cause: StoreError) -> StoreError {
    tracing::warn!(operation, error = %cause, "Transaction aborted before any write");
    StoreError::transaction(cause)
}

fn to_documents<T: Serialize>(records: &[T]) -> Result<Vec<Value>, StoreError> {
    records
        .iter()
        .map(|r| serde_json::to_value(r).map_err(StoreError::from))
        .collect()
}

//! Error types for the entity store.
//!
//! [`StoreError`] is what every [`EntityStore`](crate::EntityStore)
//! operation returns. Backend failures arrive as [`BackendError`], which
//! wraps the underlying [`sqlx`] errors or reports contract violations of
//! the in-memory backend.

use cubegrid_types::EntityKind;

/// Why a document failed structural validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationReason {
    /// A required field is absent or null.
    #[error("missing")]
    Missing,

    /// A field has the wrong JSON type.
    #[error("expected {expected}")]
    WrongType {
        /// Description of the accepted type.
        expected: &'static str,
    },

    /// An array has the wrong number of elements.
    #[error("expected {expected} elements, found {actual}")]
    WrongShape {
        /// Required element count.
        expected: usize,
        /// Element count found.
        actual: usize,
    },

    /// A numeric value lies outside its allowed range.
    #[error("{value} is outside [{min}, {max}]")]
    OutOfRange {
        /// The offending value.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },
}

/// A document violated a structural, type, or range constraint.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid {kind} document at `{field}`: {reason}")]
pub struct ValidationError {
    /// Kind of the document being validated.
    pub kind: EntityKind,
    /// Path of the offending field, e.g. `valueArray[0][1]`.
    pub field: String,
    /// The violated constraint.
    pub reason: ValidationReason,
}

impl ValidationError {
    /// Build a validation error for `field` of a `kind` document.
    pub fn new(kind: EntityKind, field: impl Into<String>, reason: ValidationReason) -> Self {
        Self {
            kind,
            field: field.into(),
            reason,
        }
    }
}

/// Errors raised by a [`DocumentBackend`](crate::DocumentBackend).
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// The connection settings are unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// The collection has not been created.
    #[error("collection {0} does not exist")]
    UnknownCollection(EntityKind),

    /// A transaction wrote to a collection it was not opened over.
    #[error("collection {0} is outside the transaction scope")]
    OutOfScope(EntityKind),

    /// The backend refused a write.
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Errors returned by entity store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store was used before [`initialize`](crate::EntityStore::initialize) succeeded.
    #[error("entity store used before initialization")]
    NotInitialized,

    /// A document failed structural validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A subcube or subcube vertex carries an `originID` that does not
    /// match its `windowUID` and `cubeId`.
    #[error("{kind} originID mismatch: expected {expected:?}, found {actual:?}")]
    Consistency {
        /// Kind of the offending document.
        kind: EntityKind,
        /// `windowUID` followed by `cubeId`.
        expected: String,
        /// The stored `originID`.
        actual: String,
    },

    /// An atomic multi-document write was aborted; nothing was written.
    #[error("transaction aborted: {source}")]
    Transaction {
        /// The first failure inside the transaction.
        source: Box<StoreError>,
    },

    /// A single-document backend operation failed.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A document could not be converted to or from a typed record.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The schema declares no such index on the collection.
    #[error("collection {kind} has no index named {index}")]
    UnknownIndex {
        /// Collection queried.
        kind: EntityKind,
        /// Requested index name.
        index: String,
    },

    /// The supplied schema is unusable.
    #[error("schema error: {0}")]
    Schema(String),
}

impl StoreError {
    /// Wrap `cause` as the reason a transaction was aborted.
    pub fn transaction(cause: impl Into<Self>) -> Self {
        Self::Transaction {
            source: Box::new(cause.into()),
        }
    }

    /// The innermost cause of a transaction error, or `self` otherwise.
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::Transaction { source } => source.root_cause(),
            other => other,
        }
    }
}

//! The persistence collaborator.
//!
//! [`EntityStore`] is everything the admission rules need from a datastore:
//! a batch transaction with per-record savepoints, field lookups, inserts
//! and the copy counter on books. `libris-db` implements it on PostgreSQL;
//! [`memory::MemoryStore`] implements it in memory.

pub mod memory;

use async_trait::async_trait;

use crate::entity::{EntityKind, KeyValue, NewBorrowing, Record};
use crate::error::CoreError;
use crate::types::DbId;

/// How a criterion compares a column with a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
    Exact,
    /// Case-insensitive text comparison.
    IgnoreCase,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
    pub field: &'static str,
    pub value: KeyValue,
    pub mode: Match,
}

/// A conjunction of column criteria over one entity table.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub kind: EntityKind,
    pub criteria: Vec<Criterion>,
    /// Row to leave out, used when checking an update against its peers.
    pub exclude_id: Option<DbId>,
}

impl Lookup {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            criteria: Vec::new(),
            exclude_id: None,
        }
    }

    pub fn by_id(kind: EntityKind, id: DbId) -> Self {
        Self::new(kind).eq("id", id)
    }

    pub fn eq(mut self, field: &'static str, value: impl Into<KeyValue>) -> Self {
        self.criteria.push(Criterion {
            field,
            value: value.into(),
            mode: Match::Exact,
        });
        self
    }

    pub fn eq_ignore_case(mut self, field: &'static str, value: &str) -> Self {
        self.criteria.push(Criterion {
            field,
            value: KeyValue::Text(value.to_string()),
            mode: Match::IgnoreCase,
        });
        self
    }

    /// Rows whose `field` is null.
    pub fn is_null(mut self, field: &'static str) -> Self {
        self.criteria.push(Criterion {
            field,
            value: KeyValue::Null,
            mode: Match::Exact,
        });
        self
    }

    pub fn excluding(mut self, id: Option<DbId>) -> Self {
        self.exclude_id = id;
        self
    }
}

/// Transactional access to persisted entities.
///
/// All reads and writes happen inside the batch opened by
/// [`EntityStore::begin_batch`]. A record is admitted between
/// [`EntityStore::begin_record`] and [`EntityStore::commit_record`]; rolling
/// the record back undoes its writes without touching earlier records.
#[async_trait]
pub trait EntityStore: Send {
    async fn begin_batch(&mut self) -> Result<(), CoreError>;
    async fn commit_batch(&mut self) -> Result<(), CoreError>;
    /// Discard the batch. A no-op when no batch is open.
    async fn rollback_batch(&mut self) -> Result<(), CoreError>;

    async fn begin_record(&mut self) -> Result<(), CoreError>;
    async fn commit_record(&mut self) -> Result<(), CoreError>;
    async fn rollback_record(&mut self) -> Result<(), CoreError>;

    async fn exists(&mut self, lookup: &Lookup) -> Result<bool, CoreError>;
    async fn count(&mut self, lookup: &Lookup) -> Result<i64, CoreError>;
    /// Ids of matching rows, ascending.
    async fn find_ids(&mut self, lookup: &Lookup) -> Result<Vec<DbId>, CoreError>;

    /// Persist a record whose references are all ids, returning its id.
    /// A book's author and category ids become link rows.
    async fn insert(&mut self, record: &Record) -> Result<DbId, CoreError>;
    /// Replace the stored fields of `id`. Returns `false` if no such row.
    async fn update(&mut self, id: DbId, record: &Record) -> Result<bool, CoreError>;
    /// Delete one row. Dependants must already be gone.
    async fn delete(&mut self, kind: EntityKind, id: DbId) -> Result<bool, CoreError>;

    async fn available_copies(&mut self, book_id: DbId) -> Result<Option<i32>, CoreError>;
    async fn adjust_available_copies(&mut self, book_id: DbId, delta: i32)
        -> Result<(), CoreError>;
    async fn fetch_borrowing(&mut self, id: DbId) -> Result<Option<NewBorrowing>, CoreError>;

    /// First matching id, if any.
    async fn find_id(&mut self, lookup: &Lookup) -> Result<Option<DbId>, CoreError> {
        Ok(self.find_ids(lookup).await?.into_iter().next())
    }
}

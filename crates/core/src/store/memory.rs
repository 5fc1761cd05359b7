//! In-memory [`EntityStore`], used for dry runs and tests.
//!
//! Batches and record savepoints are snapshots of the whole table set, so
//! rollback semantics match the database store. Outside a batch every write
//! is applied immediately.

use std::collections::BTreeMap;

use async_trait::async_trait;

use super::{EntityStore, Lookup, Match};
use crate::entity::{
    BookAuthorLink, BookCategoryLink, EntityKind, KeyValue, NewBorrowing, Record, Ref,
};
use crate::error::CoreError;
use crate::types::DbId;

#[derive(Debug, Clone, Default)]
struct Tables {
    rows: BTreeMap<EntityKind, BTreeMap<DbId, Record>>,
    last_id: BTreeMap<EntityKind, DbId>,
}

impl Tables {
    fn table(&self, kind: EntityKind) -> impl Iterator<Item = (&DbId, &Record)> {
        self.rows.get(&kind).into_iter().flat_map(|rows| rows.iter())
    }

    fn put(&mut self, kind: EntityKind, id: Option<DbId>, mut record: Record) -> Result<DbId, CoreError> {
        let last = self.last_id.entry(kind).or_insert(0);
        let id = match id {
            Some(id) => {
                *last = (*last).max(id);
                id
            }
            None => {
                *last += 1;
                *last
            }
        };
        let rows = self.rows.entry(kind).or_default();
        if rows.contains_key(&id) {
            return Err(CoreError::duplicate(
                kind.label(),
                &["id"],
                format!("{kind} with id {id} already exists"),
            ));
        }
        record.set_id(Some(id));
        rows.insert(id, record);
        Ok(id)
    }

    fn matches(id: DbId, record: &Record, lookup: &Lookup) -> bool {
        if lookup.exclude_id == Some(id) {
            return false;
        }
        lookup.criteria.iter().all(|c| {
            let actual = if c.field == "id" {
                Some(KeyValue::Int(id))
            } else {
                record.column(c.field)
            };
            match (actual, &c.value, c.mode) {
                (Some(KeyValue::Text(a)), KeyValue::Text(b), Match::IgnoreCase) => {
                    a.to_lowercase() == b.to_lowercase()
                }
                (Some(actual), expected, _) => actual == *expected,
                (None, _, _) => false,
            }
        })
    }

    fn find(&self, lookup: &Lookup) -> Vec<DbId> {
        self.table(lookup.kind)
            .filter(|(id, record)| Self::matches(**id, record, lookup))
            .map(|(id, _)| *id)
            .collect()
    }

    fn replace_links(&mut self, book_id: DbId, authors: &[DbId], categories: &[DbId]) -> Result<(), CoreError> {
        for kind in [EntityKind::BookAuthor, EntityKind::BookCategory] {
            if let Some(rows) = self.rows.get_mut(&kind) {
                rows.retain(|_, r| r.column("book_id") != Some(KeyValue::Int(book_id)));
            }
        }
        for &author_id in authors {
            self.put(
                EntityKind::BookAuthor,
                None,
                Record::BookAuthor(BookAuthorLink { book_id, author_id }),
            )?;
        }
        for &category_id in categories {
            self.put(
                EntityKind::BookCategory,
                None,
                Record::BookCategory(BookCategoryLink { book_id, category_id }),
            )?;
        }
        Ok(())
    }
}

/// Resolved author and category ids of a book, or an error if any
/// reference is still a natural key.
fn book_link_ids(record: &Record) -> Result<Option<(Vec<DbId>, Vec<DbId>)>, CoreError> {
    let Record::Book(book) = record else {
        return Ok(None);
    };
    let unresolved = || CoreError::Internal("book references must be resolved to ids".into());
    let authors = book
        .authors
        .iter()
        .map(|r| r.id().ok_or_else(unresolved))
        .collect::<Result<Vec<_>, _>>()?;
    let categories = book
        .categories
        .iter()
        .map(|r| r.id().ok_or_else(unresolved))
        .collect::<Result<Vec<_>, _>>()?;
    if matches!(book.library, Ref::Natural(_)) {
        return Err(unresolved());
    }
    Ok(Some((authors, categories)))
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Tables,
    batch: Option<Tables>,
    record: Option<Tables>,
    fail_next_commit: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next [`EntityStore::commit_batch`] fail with a persistence
    /// error, as a lost connection would.
    pub fn fail_next_commit(&mut self) {
        self.fail_next_commit = true;
    }

    /// Stored record by id, with its id filled in.
    pub fn get(&self, kind: EntityKind, id: DbId) -> Option<&Record> {
        self.tables.rows.get(&kind)?.get(&id)
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        self.tables.rows.get(&kind).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.rows.values().all(BTreeMap::is_empty)
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn begin_batch(&mut self) -> Result<(), CoreError> {
        if self.batch.is_some() {
            return Err(CoreError::Internal("a batch is already open".into()));
        }
        self.batch = Some(self.tables.clone());
        Ok(())
    }

    async fn commit_batch(&mut self) -> Result<(), CoreError> {
        if self.fail_next_commit {
            self.fail_next_commit = false;
            return Err(CoreError::Persistence("simulated commit failure".into()));
        }
        self.batch = None;
        self.record = None;
        Ok(())
    }

    async fn rollback_batch(&mut self) -> Result<(), CoreError> {
        if let Some(snapshot) = self.batch.take() {
            self.tables = snapshot;
        }
        self.record = None;
        Ok(())
    }

    async fn begin_record(&mut self) -> Result<(), CoreError> {
        if self.batch.is_none() {
            return Err(CoreError::Internal("no batch is open".into()));
        }
        self.record = Some(self.tables.clone());
        Ok(())
    }

    async fn commit_record(&mut self) -> Result<(), CoreError> {
        self.record = None;
        Ok(())
    }

    async fn rollback_record(&mut self) -> Result<(), CoreError> {
        if let Some(snapshot) = self.record.take() {
            self.tables = snapshot;
        }
        Ok(())
    }

    async fn exists(&mut self, lookup: &Lookup) -> Result<bool, CoreError> {
        Ok(!self.tables.find(lookup).is_empty())
    }

    async fn count(&mut self, lookup: &Lookup) -> Result<i64, CoreError> {
        Ok(self.tables.find(lookup).len() as i64)
    }

    async fn find_ids(&mut self, lookup: &Lookup) -> Result<Vec<DbId>, CoreError> {
        Ok(self.tables.find(lookup))
    }

    async fn insert(&mut self, record: &Record) -> Result<DbId, CoreError> {
        let links = book_link_ids(record)?;
        let id = self.tables.put(record.kind(), record.id(), record.clone())?;
        if let Some((authors, categories)) = links {
            self.tables.replace_links(id, &authors, &categories)?;
        }
        Ok(id)
    }

    async fn update(&mut self, id: DbId, record: &Record) -> Result<bool, CoreError> {
        let links = book_link_ids(record)?;
        let kind = record.kind();
        let Some(stored) = self.tables.rows.get_mut(&kind).and_then(|rows| rows.get_mut(&id)) else {
            return Ok(false);
        };
        let mut replacement = record.clone();
        replacement.set_id(Some(id));
        *stored = replacement;
        if let Some((authors, categories)) = links {
            self.tables.replace_links(id, &authors, &categories)?;
        }
        Ok(true)
    }

    async fn delete(&mut self, kind: EntityKind, id: DbId) -> Result<bool, CoreError> {
        Ok(self
            .tables
            .rows
            .get_mut(&kind)
            .and_then(|rows| rows.remove(&id))
            .is_some())
    }

    async fn available_copies(&mut self, book_id: DbId) -> Result<Option<i32>, CoreError> {
        Ok(match self.get(EntityKind::Book, book_id) {
            Some(Record::Book(book)) => Some(book.available_copies),
            _ => None,
        })
    }

    async fn adjust_available_copies(&mut self, book_id: DbId, delta: i32) -> Result<(), CoreError> {
        let Some(Record::Book(book)) = self
            .tables
            .rows
            .get_mut(&EntityKind::Book)
            .and_then(|rows| rows.get_mut(&book_id))
        else {
            return Err(CoreError::NotFound {
                entity: "Book",
                id: book_id,
            });
        };
        let adjusted = book.available_copies + delta;
        if adjusted < 0 || adjusted > book.total_copies {
            return Err(CoreError::capacity(
                "available_copies",
                format!(
                    "available copies of book {book_id} would become {adjusted} (total {})",
                    book.total_copies
                ),
            ));
        }
        book.available_copies = adjusted;
        Ok(())
    }

    async fn fetch_borrowing(&mut self, id: DbId) -> Result<Option<NewBorrowing>, CoreError> {
        Ok(match self.get(EntityKind::Borrowing, id) {
            Some(Record::Borrowing(b)) => Some(b.clone()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::entity::{NewAuthor, NewCategory};

    fn author(first: &str, last: &str) -> Record {
        Record::Author(NewAuthor {
            id: None,
            first_name: first.into(),
            last_name: last.into(),
            birth_date: NaiveDate::from_ymd_opt(1900, 1, 1),
            nationality: None,
            biography: None,
        })
    }

    #[tokio::test]
    async fn record_rollback_keeps_earlier_records() {
        let mut store = MemoryStore::new();
        store.begin_batch().await.unwrap();

        store.begin_record().await.unwrap();
        store.insert(&author("Ann", "Lee")).await.unwrap();
        store.commit_record().await.unwrap();

        store.begin_record().await.unwrap();
        store.insert(&author("Bo", "Kim")).await.unwrap();
        store.rollback_record().await.unwrap();

        store.commit_batch().await.unwrap();
        assert_eq!(store.len(EntityKind::Author), 1);
    }

    #[tokio::test]
    async fn batch_rollback_discards_everything() {
        let mut store = MemoryStore::new();
        store.begin_batch().await.unwrap();
        store.insert(&author("Ann", "Lee")).await.unwrap();
        store.rollback_batch().await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn explicit_ids_are_kept_and_sequence_advances() {
        let mut store = MemoryStore::new();
        let mut first = author("Ann", "Lee");
        first.set_id(Some(10));
        assert_eq!(store.insert(&first).await.unwrap(), 10);
        assert_eq!(store.insert(&author("Bo", "Kim")).await.unwrap(), 11);

        let err = store.insert(&first).await.unwrap_err();
        assert!(matches!(err, CoreError::DuplicateEntity { .. }));
    }

    #[tokio::test]
    async fn lookup_ignores_case_and_excluded_id() {
        let mut store = MemoryStore::new();
        let id = store
            .insert(&Record::Category(NewCategory {
                id: None,
                name: "Poetry".into(),
                description: None,
            }))
            .await
            .unwrap();

        let lookup = Lookup::new(EntityKind::Category).eq_ignore_case("name", "POETRY");
        assert!(store.exists(&lookup).await.unwrap());
        assert!(!store.exists(&lookup.clone().excluding(Some(id))).await.unwrap());
        assert!(!store
            .exists(&Lookup::new(EntityKind::Category).eq("name", "POETRY"))
            .await
            .unwrap());
    }
}

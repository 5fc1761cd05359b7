//! [`EntityStore`] on PostgreSQL.
//!
//! A batch is one transaction; a record is one savepoint inside it. Every
//! operation other than [`EntityStore::begin_batch`] needs the batch open.

use async_trait::async_trait;
use libris_core::entity::{EntityKind, NewBook, NewBorrowing, Record};
use libris_core::error::CoreError;
use libris_core::store::{EntityStore, Lookup};
use libris_core::types::DbId;
use sqlx::{PgConnection, Postgres, Transaction};

use crate::error::{map_sqlx_error, persistence};
use crate::lookup;
use crate::repositories::{
    advance_sequence, delete_row, AuthorRepo, BookLinkRepo, BookRepo, BorrowingRepo, CategoryRepo,
    LibraryRepo, MemberRepo, ReviewRepo,
};
use crate::DbPool;

const SAVEPOINT: &str = "libris_record";

pub struct PgStore {
    pool: DbPool,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool, tx: None }
    }

    fn conn(&mut self) -> Result<&mut PgConnection, CoreError> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| CoreError::Internal("no batch is open".into()))
    }

    async fn execute(&mut self, sql: &str) -> Result<(), CoreError> {
        let conn = self.conn()?;
        sqlx::query(sql).execute(conn).await.map_err(persistence)?;
        Ok(())
    }
}

/// Library id plus author and category ids of a book whose references
/// have all been resolved.
fn resolved_refs(book: &NewBook) -> Result<(DbId, Vec<DbId>, Vec<DbId>), CoreError> {
    let unresolved = || CoreError::Internal("book references must be resolved to ids".into());
    let library_id = book.library.id().ok_or_else(unresolved)?;
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
    Ok((library_id, authors, categories))
}

#[async_trait]
impl EntityStore for PgStore {
    async fn begin_batch(&mut self) -> Result<(), CoreError> {
        if self.tx.is_some() {
            return Err(CoreError::Internal("a batch is already open".into()));
        }
        self.tx = Some(self.pool.begin().await.map_err(persistence)?);
        Ok(())
    }

    async fn commit_batch(&mut self) -> Result<(), CoreError> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| CoreError::Internal("no batch is open".into()))?;
        tx.commit().await.map_err(persistence)
    }

    async fn rollback_batch(&mut self) -> Result<(), CoreError> {
        match self.tx.take() {
            Some(tx) => tx.rollback().await.map_err(persistence),
            None => Ok(()),
        }
    }

    async fn begin_record(&mut self) -> Result<(), CoreError> {
        self.execute(&format!("SAVEPOINT {SAVEPOINT}")).await
    }

    async fn commit_record(&mut self) -> Result<(), CoreError> {
        self.execute(&format!("RELEASE SAVEPOINT {SAVEPOINT}")).await
    }

    async fn rollback_record(&mut self) -> Result<(), CoreError> {
        self.execute(&format!("ROLLBACK TO SAVEPOINT {SAVEPOINT}"))
            .await?;
        self.execute(&format!("RELEASE SAVEPOINT {SAVEPOINT}")).await
    }

    async fn exists(&mut self, lookup: &Lookup) -> Result<bool, CoreError> {
        let conn = self.conn()?;
        lookup::exists(lookup)
            .build_query_scalar::<bool>()
            .fetch_one(conn)
            .await
            .map_err(persistence)
    }

    async fn count(&mut self, lookup: &Lookup) -> Result<i64, CoreError> {
        let conn = self.conn()?;
        lookup::count(lookup)
            .build_query_scalar::<i64>()
            .fetch_one(conn)
            .await
            .map_err(persistence)
    }

    async fn find_ids(&mut self, lookup: &Lookup) -> Result<Vec<DbId>, CoreError> {
        let conn = self.conn()?;
        lookup::select_ids(lookup)
            .build_query_scalar::<DbId>()
            .fetch_all(conn)
            .await
            .map_err(persistence)
    }

    async fn insert(&mut self, record: &Record) -> Result<DbId, CoreError> {
        let kind = record.kind();
        let conn = self.conn()?;
        let inserted = match record {
            Record::Library(r) => LibraryRepo::insert(&mut *conn, r).await,
            Record::Author(r) => AuthorRepo::insert(&mut *conn, r).await,
            Record::Category(r) => CategoryRepo::insert(&mut *conn, r).await,
            Record::Member(r) => MemberRepo::insert(&mut *conn, r).await,
            Record::Book(r) => {
                let (library_id, authors, categories) = resolved_refs(r)?;
                match BookRepo::insert(&mut *conn, r, library_id).await {
                    Ok(id) => BookLinkRepo::replace_for_book(&mut *conn, id, &authors, &categories)
                        .await
                        .map(|()| id),
                    Err(e) => Err(e),
                }
            }
            Record::BookAuthor(r) => BookLinkRepo::insert_author(&mut *conn, r).await,
            Record::BookCategory(r) => BookLinkRepo::insert_category(&mut *conn, r).await,
            Record::Borrowing(r) => BorrowingRepo::insert(&mut *conn, r).await,
            Record::Review(r) => ReviewRepo::insert(&mut *conn, r).await,
        };
        let id = inserted.map_err(|e| map_sqlx_error(kind.label(), e))?;

        if record.id().is_some() {
            advance_sequence(&mut *conn, kind).await.map_err(persistence)?;
        }
        Ok(id)
    }

    async fn update(&mut self, id: DbId, record: &Record) -> Result<bool, CoreError> {
        let kind = record.kind();
        let conn = self.conn()?;
        let updated = match record {
            Record::Library(r) => LibraryRepo::update(&mut *conn, id, r).await,
            Record::Author(r) => AuthorRepo::update(&mut *conn, id, r).await,
            Record::Category(r) => CategoryRepo::update(&mut *conn, id, r).await,
            Record::Member(r) => MemberRepo::update(&mut *conn, id, r).await,
            Record::Book(r) => {
                let (library_id, authors, categories) = resolved_refs(r)?;
                match BookRepo::update(&mut *conn, id, r, library_id).await {
                    Ok(true) => BookLinkRepo::replace_for_book(&mut *conn, id, &authors, &categories)
                        .await
                        .map(|()| true),
                    other => other,
                }
            }
            Record::Borrowing(r) => BorrowingRepo::update(&mut *conn, id, r).await,
            Record::Review(r) => ReviewRepo::update(&mut *conn, id, r).await,
            Record::BookAuthor(_) | Record::BookCategory(_) => {
                return Err(CoreError::Internal(format!(
                    "{kind} rows are replaced, not updated"
                )));
            }
        };
        updated.map_err(|e| map_sqlx_error(kind.label(), e))
    }

    async fn delete(&mut self, kind: EntityKind, id: DbId) -> Result<bool, CoreError> {
        let conn = self.conn()?;
        delete_row(conn, kind, id)
            .await
            .map_err(|e| map_sqlx_error(kind.label(), e))
    }

    async fn available_copies(&mut self, book_id: DbId) -> Result<Option<i32>, CoreError> {
        let conn = self.conn()?;
        BookRepo::available_copies(conn, book_id)
            .await
            .map_err(persistence)
    }

    async fn adjust_available_copies(&mut self, book_id: DbId, delta: i32) -> Result<(), CoreError> {
        let conn = self.conn()?;
        match BookRepo::adjust_available_copies(conn, book_id, delta).await {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(CoreError::NotFound {
                entity: "Book",
                id: book_id,
            }),
            Err(e) => Err(map_sqlx_error("Book", e)),
        }
    }

    async fn fetch_borrowing(&mut self, id: DbId) -> Result<Option<NewBorrowing>, CoreError> {
        let conn = self.conn()?;
        let row = BorrowingRepo::find_by_id(conn, id)
            .await
            .map_err(persistence)?;
        Ok(row.map(NewBorrowing::from))
    }
}

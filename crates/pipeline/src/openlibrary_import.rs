//! Import an author's works from a bibliographic source as books.
//!
//! All remote calls happen first. The author is then found or created in
//! its own batch, works already held for that author are dropped, and the
//! rest are admitted as one book batch.

use libris_core::catalog::Catalog;
use libris_core::entity::{EntityKind, Record};
use libris_core::error::CoreError;
use libris_core::rules::author_lookup;
use libris_core::store::{EntityStore, Lookup};
use libris_core::types::{DbId, RawRecord};
use libris_openlibrary::{AuthorCandidate, BibliographicSource, Work, WorkDetails};
use serde::Serialize;
use serde_json::{json, Value};

use crate::batch::{run_batch, BatchError, BatchReport};

/// What to import and where the books go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorImport {
    pub author: String,
    pub limit: usize,
    pub library_id: DbId,
    pub copies: i32,
}

#[derive(Debug, Serialize)]
pub struct ImportReport {
    pub author_id: DbId,
    pub author_created: bool,
    /// Works skipped because a book with the same title is already linked
    /// to the author.
    pub already_present: usize,
    pub books: BatchReport,
}

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("no author found for '{0}'")]
    AuthorNotFound(String),

    #[error("author could not be stored: {0}")]
    Author(#[source] CoreError),

    #[error(transparent)]
    Batch(#[from] BatchError),
}

pub async fn import_author_works<S, B>(
    catalog: &Catalog,
    store: &mut S,
    source: &B,
    import: &AuthorImport,
) -> Result<ImportReport, ImportError>
where
    S: EntityStore + ?Sized,
    B: BibliographicSource + ?Sized,
{
    let candidate = source
        .search_author(&import.author)
        .await
        .ok_or_else(|| ImportError::AuthorNotFound(import.author.clone()))?;
    tracing::info!(key = %candidate.key, name = %candidate.name, "Found author");

    let works = source.author_works(&candidate.key, import.limit).await;
    let mut fetched = Vec::with_capacity(works.len());
    for work in works {
        let details = source.work_details(work.short_key()).await;
        if details.is_none() {
            tracing::warn!(work = %work.key, "No details for work, using the listing only");
        }
        fetched.push((work, details));
    }

    store.begin_batch().await.map_err(ImportError::Author)?;
    let prepared = match prepare(catalog, store, &candidate, &fetched, import).await {
        Ok(prepared) => prepared,
        Err(e) => {
            if let Err(rollback) = store.rollback_batch().await {
                tracing::error!(error = %rollback, "Rollback after author failure failed");
            }
            return Err(ImportError::Author(e));
        }
    };
    store.commit_batch().await.map_err(ImportError::Author)?;

    if prepared.author_created {
        tracing::info!(author_id = prepared.author_id, "Created author");
    }
    let books = run_batch(catalog, store, EntityKind::Book, &prepared.books).await?;

    Ok(ImportReport {
        author_id: prepared.author_id,
        author_created: prepared.author_created,
        already_present: prepared.already_present,
        books,
    })
}

struct Prepared {
    author_id: DbId,
    author_created: bool,
    already_present: usize,
    books: Vec<RawRecord>,
}

async fn prepare<S>(
    catalog: &Catalog,
    store: &mut S,
    candidate: &AuthorCandidate,
    fetched: &[(Work, Option<WorkDetails>)],
    import: &AuthorImport,
) -> Result<Prepared, CoreError>
where
    S: EntityStore + ?Sized,
{
    let (author_id, author_created) = find_or_create_author(catalog, store, candidate).await?;

    let mut books = Vec::new();
    let mut already_present = 0;
    for (work, details) in fetched {
        let raw = book_record(work, details.as_ref(), author_id, import);
        let title = raw.get("title").and_then(Value::as_str).unwrap_or_default();
        if !title.is_empty() && has_title(store, author_id, title).await? {
            tracing::warn!(title, author_id, "Book already present, skipping");
            already_present += 1;
            continue;
        }
        books.push(raw);
    }

    Ok(Prepared {
        author_id,
        author_created,
        already_present,
        books,
    })
}

async fn find_or_create_author<S>(
    catalog: &Catalog,
    store: &mut S,
    candidate: &AuthorCandidate,
) -> Result<(DbId, bool), CoreError>
where
    S: EntityStore + ?Sized,
{
    let mut raw = author_record(candidate);
    let record = match catalog.validate(EntityKind::Author, &raw) {
        Err(CoreError::Validation(errors)) if errors.iter().all(|e| e.field == "birth_date") => {
            tracing::warn!(
                birth_date = ?candidate.birth_date,
                "Unusable author birth date, importing without it"
            );
            raw.remove("birth_date");
            catalog.validate(EntityKind::Author, &raw)?
        }
        other => other?,
    };
    let Record::Author(author) = &record else {
        return Err(CoreError::Internal("author validation produced another kind".into()));
    };

    let lookup = author_lookup(&author.first_name, &author.last_name, author.birth_date);
    if let Some(id) = store.find_id(&lookup).await? {
        return Ok((id, false));
    }
    let admitted = catalog.create(store, EntityKind::Author, &raw).await?;
    Ok((admitted.id, true))
}

async fn has_title<S>(store: &mut S, author_id: DbId, title: &str) -> Result<bool, CoreError>
where
    S: EntityStore + ?Sized,
{
    let book_ids = store
        .find_ids(&Lookup::new(EntityKind::Book).eq_ignore_case("title", title))
        .await?;
    for book_id in book_ids {
        let link = Lookup::new(EntityKind::BookAuthor)
            .eq("book_id", book_id)
            .eq("author_id", author_id);
        if store.exists(&link).await? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Split a display name on its last space into first and last name. A
/// single-word name fills both.
fn author_record(candidate: &AuthorCandidate) -> RawRecord {
    let name = candidate.name.trim();
    let (first, last) = name.rsplit_once(' ').unwrap_or((name, name));
    let mut raw = RawRecord::new();
    raw.insert("first_name".into(), json!(first.trim()));
    raw.insert("last_name".into(), json!(last.trim()));
    if let Some(born) = &candidate.birth_date {
        raw.insert("birth_date".into(), json!(born));
    }
    raw
}

fn book_record(
    work: &Work,
    details: Option<&WorkDetails>,
    author_id: DbId,
    import: &AuthorImport,
) -> RawRecord {
    let title = details
        .and_then(|d| d.title.as_deref())
        .or(work.title.as_deref())
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "));
    let isbn = work
        .isbn
        .first()
        .or_else(|| details.and_then(|d| d.isbn_13.first().or(d.isbn_10.first())));

    let mut raw = RawRecord::new();
    raw.insert("title".into(), json!(title));
    raw.insert("isbn".into(), json!(isbn));
    raw.insert(
        "publication_date".into(),
        json!(details.and_then(WorkDetails::publication_date)),
    );
    raw.insert("total_copies".into(), json!(import.copies));
    raw.insert("library_id".into(), json!(import.library_id));
    raw.insert("author_ids".into(), json!([author_id]));
    raw
}

//! Business rules that depend on stored state.
//!
//! Checks run before any write for the record: uniqueness per entity,
//! borrowing capacity, and resolution of a book's natural-key references.
//! The only write a check may make is creating an author or category in
//! get-or-create mode, which the record's savepoint undoes on rejection.
//! The copy counter is adjusted by the caller from the returned
//! [`Admission`] once the record itself has been written.

use std::str::FromStr;

use crate::entity::{
    AuthorName, EntityKind, NewAuthor, NewBook, NewBorrowing, NewCategory, NewLibrary, NewMember,
    Record, Ref,
};
use crate::error::{CoreError, FieldError};
use crate::store::{EntityStore, Lookup};
use crate::types::DbId;

pub const DEFAULT_BORROW_LIMIT: i64 = 10;

/// How a book's references by natural key are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BookReferencePolicy {
    /// Every reference must resolve to an existing row.
    #[default]
    Strict,
    /// Unknown authors and categories are created. Libraries still must exist.
    GetOrCreate,
}

impl FromStr for BookReferencePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(BookReferencePolicy::Strict),
            "get_or_create" | "get-or-create" => Ok(BookReferencePolicy::GetOrCreate),
            other => Err(format!("unknown book reference policy '{other}'")),
        }
    }
}

/// A change to a book's `available_copies` that goes with an accepted write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyAdjustment {
    pub book_id: DbId,
    pub delta: i32,
}

/// Result of a passed rule check: the record to write (with references
/// resolved to ids) and the side effect to apply after writing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    pub record: Record,
    pub copies: Option<CopyAdjustment>,
}

#[derive(Debug, Clone, Copy)]
pub struct RuleEngine {
    /// Maximum number of open borrowings per member.
    pub borrow_limit: i64,
    pub book_references: BookReferencePolicy,
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self {
            borrow_limit: DEFAULT_BORROW_LIMIT,
            book_references: BookReferencePolicy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

/// Rows of the same author: names compared case-insensitively.
pub fn author_lookup(first_name: &str, last_name: &str, birth_date: Option<chrono::NaiveDate>) -> Lookup {
    Lookup::new(EntityKind::Author)
        .eq_ignore_case("first_name", first_name)
        .eq_ignore_case("last_name", last_name)
        .eq("birth_date", birth_date)
}

fn library_address_lookup(library: &NewLibrary) -> Lookup {
    let a = &library.address;
    Lookup::new(EntityKind::Library)
        .eq_ignore_case("name", &library.name)
        .eq("street", a.street.as_str())
        .eq("district", a.district.as_str())
        .eq("state", a.state.as_str())
        .eq("pin", a.pin.as_str())
        .eq("country", a.country.as_str())
}

fn open_borrowings(member_id: DbId) -> Lookup {
    Lookup::new(EntityKind::Borrowing)
        .eq("member_id", member_id)
        .is_null("return_date")
}

/// Copies of `book_id` left on the shelf once its open loans are taken out
/// of `total`.
pub async fn free_copies<S>(store: &mut S, book_id: DbId, total: i32) -> Result<i32, CoreError>
where
    S: EntityStore + ?Sized,
{
    let on_loan = store
        .count(
            &Lookup::new(EntityKind::Borrowing)
                .eq("book_id", book_id)
                .is_null("return_date"),
        )
        .await?;
    let free = i64::from(total) - on_loan;
    if free < 0 {
        return Err(CoreError::capacity(
            "total_copies",
            format!("book {book_id} has {on_loan} copies on loan, more than total_copies ({total})"),
        ));
    }
    Ok(i32::try_from(free).unwrap_or(total))
}

impl RuleEngine {
    /// Check a new record against stored state.
    pub async fn check_create<S>(&self, store: &mut S, record: Record) -> Result<Admission, CoreError>
    where
        S: EntityStore + ?Sized,
    {
        let kind = record.kind();
        if let Some(id) = record.id() {
            if store.exists(&Lookup::by_id(kind, id)).await? {
                return Err(CoreError::duplicate(
                    kind.label(),
                    &["id"],
                    format!("{kind} with id {id} already exists"),
                ));
            }
        }

        self.check_unique(store, &record, None).await?;

        match record {
            Record::Book(book) => {
                let book = self.resolve_book_references(store, book).await?;
                Ok(Admission {
                    record: Record::Book(book),
                    copies: None,
                })
            }
            Record::Borrowing(borrowing) if borrowing.is_open() => {
                self.check_borrowing_capacity(store, &borrowing).await?;
                let copies = Some(CopyAdjustment {
                    book_id: borrowing.book_id,
                    delta: -1,
                });
                Ok(Admission {
                    record: Record::Borrowing(borrowing),
                    copies,
                })
            }
            record => Ok(Admission {
                record,
                copies: None,
            }),
        }
    }

    /// Check a replacement for stored row `id`.
    ///
    /// Uniqueness excludes the row itself. A borrowing keeps its member and
    /// book, and setting its return date for the first time gives a copy back.
    pub async fn check_update<S>(
        &self,
        store: &mut S,
        id: DbId,
        record: Record,
    ) -> Result<Admission, CoreError>
    where
        S: EntityStore + ?Sized,
    {
        self.check_unique(store, &record, Some(id)).await?;

        match record {
            Record::Book(book) => {
                let book = self.resolve_book_references(store, book).await?;
                Ok(Admission {
                    record: Record::Book(book),
                    copies: None,
                })
            }
            Record::Borrowing(borrowing) => {
                let previous = store.fetch_borrowing(id).await?.ok_or(CoreError::NotFound {
                    entity: "Borrowing",
                    id,
                })?;
                let copies = borrowing_update_effect(&previous, &borrowing)?;
                Ok(Admission {
                    record: Record::Borrowing(borrowing),
                    copies,
                })
            }
            record => Ok(Admission {
                record,
                copies: None,
            }),
        }
    }

    async fn check_unique<S>(
        &self,
        store: &mut S,
        record: &Record,
        exclude: Option<DbId>,
    ) -> Result<(), CoreError>
    where
        S: EntityStore + ?Sized,
    {
        match record {
            Record::Author(a) => self.check_author(store, a, exclude).await,
            Record::Member(m) => self.check_member(store, m, exclude).await,
            Record::Library(l) => self.check_library(store, l, exclude).await,
            Record::Category(c) => self.check_category(store, c, exclude).await,
            Record::Book(b) => self.check_book(store, b, exclude).await,
            Record::BookAuthor(link) => {
                let lookup = Lookup::new(EntityKind::BookAuthor)
                    .eq("book_id", link.book_id)
                    .eq("author_id", link.author_id);
                reject_if_exists(
                    store,
                    lookup.excluding(exclude),
                    "BookAuthor",
                    &["book_id", "author_id"],
                    format!("author {} is already linked to book {}", link.author_id, link.book_id),
                )
                .await
            }
            Record::BookCategory(link) => {
                let lookup = Lookup::new(EntityKind::BookCategory)
                    .eq("book_id", link.book_id)
                    .eq("category_id", link.category_id);
                reject_if_exists(
                    store,
                    lookup.excluding(exclude),
                    "BookCategory",
                    &["book_id", "category_id"],
                    format!(
                        "category {} is already linked to book {}",
                        link.category_id, link.book_id
                    ),
                )
                .await
            }
            Record::Review(r) => {
                let lookup = Lookup::new(EntityKind::Review)
                    .eq("member_id", r.member_id)
                    .eq("book_id", r.book_id);
                reject_if_exists(
                    store,
                    lookup.excluding(exclude),
                    "Review",
                    &["member_id", "book_id"],
                    format!("member {} already reviewed book {}", r.member_id, r.book_id),
                )
                .await
            }
            Record::Borrowing(_) => Ok(()),
        }
    }

    // -- per-entity uniqueness --

    async fn check_author<S>(&self, store: &mut S, a: &NewAuthor, exclude: Option<DbId>) -> Result<(), CoreError>
    where
        S: EntityStore + ?Sized,
    {
        reject_if_exists(
            store,
            author_lookup(&a.first_name, &a.last_name, a.birth_date).excluding(exclude),
            "Author",
            &["first_name", "last_name", "birth_date"],
            format!(
                "{} {} (born {}) already exists",
                a.first_name,
                a.last_name,
                a.birth_date.map_or_else(|| "unknown".to_string(), |d| d.to_string())
            ),
        )
        .await
    }

    async fn check_member<S>(&self, store: &mut S, m: &NewMember, exclude: Option<DbId>) -> Result<(), CoreError>
    where
        S: EntityStore + ?Sized,
    {
        reject_if_exists(
            store,
            Lookup::new(EntityKind::Member)
                .eq_ignore_case("email", &m.email)
                .excluding(exclude),
            "Member",
            &["email"],
            format!("email {} is already registered", m.email),
        )
        .await?;
        reject_if_exists(
            store,
            Lookup::new(EntityKind::Member)
                .eq("phone", m.phone.as_str())
                .excluding(exclude),
            "Member",
            &["phone"],
            format!("phone {} is already registered", m.phone),
        )
        .await
    }

    async fn check_library<S>(&self, store: &mut S, l: &NewLibrary, exclude: Option<DbId>) -> Result<(), CoreError>
    where
        S: EntityStore + ?Sized,
    {
        reject_if_exists(
            store,
            library_address_lookup(l).excluding(exclude),
            "Library",
            &["name", "address"],
            format!("library '{}' already exists at this address", l.name),
        )
        .await?;
        reject_if_exists(
            store,
            Lookup::new(EntityKind::Library)
                .eq_ignore_case("contact_email", &l.contact_email)
                .excluding(exclude),
            "Library",
            &["contact_email"],
            format!("contact email {} is already used", l.contact_email),
        )
        .await?;
        if let Some(phone) = &l.phone {
            reject_if_exists(
                store,
                Lookup::new(EntityKind::Library)
                    .eq("phone", phone.as_str())
                    .excluding(exclude),
                "Library",
                &["phone"],
                format!("phone {phone} is already used"),
            )
            .await?;
        }
        Ok(())
    }

    async fn check_category<S>(&self, store: &mut S, c: &NewCategory, exclude: Option<DbId>) -> Result<(), CoreError>
    where
        S: EntityStore + ?Sized,
    {
        reject_if_exists(
            store,
            Lookup::new(EntityKind::Category)
                .eq_ignore_case("name", &c.name)
                .excluding(exclude),
            "Category",
            &["name"],
            format!("category '{}' already exists", c.name),
        )
        .await
    }

    async fn check_book<S>(&self, store: &mut S, b: &NewBook, exclude: Option<DbId>) -> Result<(), CoreError>
    where
        S: EntityStore + ?Sized,
    {
        let Some(isbn) = &b.isbn else {
            return Ok(());
        };
        reject_if_exists(
            store,
            Lookup::new(EntityKind::Book)
                .eq("isbn", isbn.as_str())
                .excluding(exclude),
            "Book",
            &["isbn"],
            format!("a book with ISBN {isbn} already exists"),
        )
        .await
    }

    // -- borrowing --

    /// Open borrowings only: a copy must be free, the pair must not already
    /// be open, and the member must be under the limit.
    async fn check_borrowing_capacity<S>(&self, store: &mut S, b: &NewBorrowing) -> Result<(), CoreError>
    where
        S: EntityStore + ?Sized,
    {
        let available = store.available_copies(b.book_id).await?.ok_or_else(|| {
            CoreError::ForeignKeyNotFound {
                entity: "Borrowing",
                field: "book_id".into(),
                target: "Book",
                value: b.book_id.to_string(),
            }
        })?;
        if available <= 0 {
            return Err(CoreError::capacity(
                "book_id",
                format!("no copies of book {} are available", b.book_id),
            ));
        }

        reject_if_exists(
            store,
            open_borrowings(b.member_id).eq("book_id", b.book_id),
            "Borrowing",
            &["member_id", "book_id"],
            format!(
                "member {} already has book {} on loan",
                b.member_id, b.book_id
            ),
        )
        .await?;

        let open = store.count(&open_borrowings(b.member_id)).await?;
        if open >= self.borrow_limit {
            return Err(CoreError::capacity(
                "member_id",
                format!(
                    "member {} already has {open} open borrowings (limit {})",
                    b.member_id, self.borrow_limit
                ),
            ));
        }
        Ok(())
    }

    // -- book references --

    async fn resolve_book_references<S>(&self, store: &mut S, mut book: NewBook) -> Result<NewBook, CoreError>
    where
        S: EntityStore + ?Sized,
    {
        if let Ref::Natural(name) = &book.library {
            let id = store
                .find_id(&Lookup::new(EntityKind::Library).eq_ignore_case("name", name))
                .await?
                .ok_or_else(|| missing_reference("library", EntityKind::Library, name))?;
            book.library = Ref::Id(id);
        }

        let mut author_ids = Vec::with_capacity(book.authors.len());
        for author in &book.authors {
            let id = match author {
                Ref::Id(id) => *id,
                Ref::Natural(name) => self.resolve_author(store, name).await?,
            };
            if !author_ids.contains(&id) {
                author_ids.push(id);
            }
        }
        book.authors = author_ids.into_iter().map(Ref::Id).collect();

        let mut category_ids = Vec::with_capacity(book.categories.len());
        for category in &book.categories {
            let id = match category {
                Ref::Id(id) => *id,
                Ref::Natural(name) => self.resolve_category(store, name).await?,
            };
            if !category_ids.contains(&id) {
                category_ids.push(id);
            }
        }
        book.categories = category_ids.into_iter().map(Ref::Id).collect();

        Ok(book)
    }

    async fn resolve_author<S>(&self, store: &mut S, name: &AuthorName) -> Result<DbId, CoreError>
    where
        S: EntityStore + ?Sized,
    {
        let lookup = author_lookup(&name.first_name, &name.last_name, name.birth_date);
        if let Some(id) = store.find_id(&lookup).await? {
            return Ok(id);
        }
        match self.book_references {
            BookReferencePolicy::Strict => Err(missing_reference(
                "authors",
                EntityKind::Author,
                &format!("{} {}", name.first_name, name.last_name),
            )),
            BookReferencePolicy::GetOrCreate => {
                let id = store
                    .insert(&Record::Author(NewAuthor {
                        id: None,
                        first_name: name.first_name.clone(),
                        last_name: name.last_name.clone(),
                        birth_date: name.birth_date,
                        nationality: None,
                        biography: None,
                    }))
                    .await?;
                tracing::debug!(author_id = id, first_name = %name.first_name, last_name = %name.last_name, "Created author from book reference");
                Ok(id)
            }
        }
    }

    async fn resolve_category<S>(&self, store: &mut S, name: &str) -> Result<DbId, CoreError>
    where
        S: EntityStore + ?Sized,
    {
        let lookup = Lookup::new(EntityKind::Category).eq_ignore_case("name", name);
        if let Some(id) = store.find_id(&lookup).await? {
            return Ok(id);
        }
        match self.book_references {
            BookReferencePolicy::Strict => {
                Err(missing_reference("categories", EntityKind::Category, name))
            }
            BookReferencePolicy::GetOrCreate => {
                let id = store
                    .insert(&Record::Category(NewCategory {
                        id: None,
                        name: name.to_string(),
                        description: None,
                    }))
                    .await?;
                tracing::debug!(category_id = id, name, "Created category from book reference");
                Ok(id)
            }
        }
    }

    // -- delete --

    /// Delete a row and everything that depends on it.
    ///
    /// Book: its links, borrowings and reviews. Member: borrowings (open
    /// ones give their copy back) and reviews. Author and Category: links.
    /// Library: every book it holds, each cascaded. An open Borrowing gives
    /// its copy back.
    pub async fn delete<S>(&self, store: &mut S, kind: EntityKind, id: DbId) -> Result<(), CoreError>
    where
        S: EntityStore + ?Sized,
    {
        match kind {
            EntityKind::Library => {
                let books = store
                    .find_ids(&Lookup::new(EntityKind::Book).eq("library_id", id))
                    .await?;
                for book_id in books {
                    delete_book_dependants(store, book_id).await?;
                    store.delete(EntityKind::Book, book_id).await?;
                }
            }
            EntityKind::Book => delete_book_dependants(store, id).await?,
            EntityKind::Member => {
                let borrowings = store
                    .find_ids(&Lookup::new(EntityKind::Borrowing).eq("member_id", id))
                    .await?;
                for borrowing_id in borrowings {
                    release_copy(store, borrowing_id).await?;
                    store.delete(EntityKind::Borrowing, borrowing_id).await?;
                }
                delete_where(store, Lookup::new(EntityKind::Review).eq("member_id", id)).await?;
            }
            EntityKind::Author => {
                delete_where(store, Lookup::new(EntityKind::BookAuthor).eq("author_id", id)).await?;
            }
            EntityKind::Category => {
                delete_where(store, Lookup::new(EntityKind::BookCategory).eq("category_id", id))
                    .await?;
            }
            EntityKind::Borrowing => release_copy(store, id).await?,
            EntityKind::Review | EntityKind::BookAuthor | EntityKind::BookCategory => {}
        }

        if !store.delete(kind, id).await? {
            return Err(CoreError::NotFound {
                entity: kind.label(),
                id,
            });
        }
        Ok(())
    }
}

/// Copy-count effect of replacing `previous` with `next`.
fn borrowing_update_effect(
    previous: &NewBorrowing,
    next: &NewBorrowing,
) -> Result<Option<CopyAdjustment>, CoreError> {
    let mut errors = Vec::new();
    if next.member_id != previous.member_id {
        errors.push(FieldError::record("member_id", "a borrowing cannot move to another member"));
    }
    if next.book_id != previous.book_id {
        errors.push(FieldError::record("book_id", "a borrowing cannot move to another book"));
    }
    if previous.return_date.is_some() && next.return_date.is_none() {
        errors.push(FieldError::record(
            "return_date",
            "a returned borrowing cannot be reopened",
        ));
    }
    if !errors.is_empty() {
        return Err(CoreError::Validation(errors));
    }

    Ok((previous.is_open() && !next.is_open()).then_some(CopyAdjustment {
        book_id: next.book_id,
        delta: 1,
    }))
}

async fn reject_if_exists<S>(
    store: &mut S,
    lookup: Lookup,
    entity: &'static str,
    fields: &[&str],
    message: String,
) -> Result<(), CoreError>
where
    S: EntityStore + ?Sized,
{
    if store.exists(&lookup).await? {
        return Err(CoreError::duplicate(entity, fields, message));
    }
    Ok(())
}

fn missing_reference(field: &str, target: EntityKind, value: &str) -> CoreError {
    CoreError::ForeignKeyNotFound {
        entity: "Book",
        field: field.to_string(),
        target: target.label(),
        value: value.to_string(),
    }
}

async fn delete_where<S>(store: &mut S, lookup: Lookup) -> Result<(), CoreError>
where
    S: EntityStore + ?Sized,
{
    let kind = lookup.kind;
    for id in store.find_ids(&lookup).await? {
        store.delete(kind, id).await?;
    }
    Ok(())
}

async fn delete_book_dependants<S>(store: &mut S, book_id: DbId) -> Result<(), CoreError>
where
    S: EntityStore + ?Sized,
{
    for kind in [
        EntityKind::BookAuthor,
        EntityKind::BookCategory,
        EntityKind::Borrowing,
        EntityKind::Review,
    ] {
        delete_where(store, Lookup::new(kind).eq("book_id", book_id)).await?;
    }
    Ok(())
}

/// Give back the copy held by an open borrowing.
async fn release_copy<S>(store: &mut S, borrowing_id: DbId) -> Result<(), CoreError>
where
    S: EntityStore + ?Sized,
{
    if let Some(borrowing) = store.fetch_borrowing(borrowing_id).await? {
        if borrowing.is_open() {
            store.adjust_available_copies(borrowing.book_id, 1).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::entity::{BookAuthorLink, Record};
    use crate::fixtures::*;
    use crate::store::memory::MemoryStore;

    async fn seeded() -> (MemoryStore, DbId, DbId) {
        let mut store = MemoryStore::new();
        let library_id = store.insert(&library("Central", "desk@central.org")).await.unwrap();
        let member_id = store
            .insert(&member("ada@example.com", "+16502530000"))
            .await
            .unwrap();
        (store, library_id, member_id)
    }

    async fn add_book(store: &mut MemoryStore, library_id: DbId, total: i32) -> DbId {
        store
            .insert(&Record::Book(book(library_id, None, total)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn author_duplicate_ignores_name_case() {
        let mut store = MemoryStore::new();
        let born = Some(day(1812, 2, 7));
        store.insert(&author("Charles", "Dickens", born)).await.unwrap();

        let err = RuleEngine::default()
            .check_create(&mut store, author("CHARLES", "dickens", born))
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::DuplicateEntity { entity: "Author", .. });

        // Same names, different birth date: a different author.
        assert!(RuleEngine::default()
            .check_create(&mut store, author("Charles", "Dickens", None))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn author_update_excludes_itself() {
        let mut store = MemoryStore::new();
        let id = store.insert(&author("Jane", "Austen", None)).await.unwrap();

        assert!(RuleEngine::default()
            .check_update(&mut store, id, author("Jane", "Austen", None))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn member_email_and_phone_are_unique() {
        let (mut store, _, _) = seeded().await;
        let rules = RuleEngine::default();

        let err = rules
            .check_create(&mut store, member("ADA@example.com", "+16502530001"))
            .await
            .unwrap_err();
        assert_eq!(err.fields(), vec!["email"]);

        let err = rules
            .check_create(&mut store, member("other@example.com", "+16502530000"))
            .await
            .unwrap_err();
        assert_eq!(err.fields(), vec!["phone"]);
    }

    #[tokio::test]
    async fn library_name_and_address_pair_is_unique() {
        let (mut store, _, _) = seeded().await;
        let err = RuleEngine::default()
            .check_create(&mut store, library("CENTRAL", "other@central.org"))
            .await
            .unwrap_err();
        assert_eq!(err.fields(), vec!["name", "address"]);

        let err = RuleEngine::default()
            .check_create(&mut store, library("Annex", "Desk@Central.org"))
            .await
            .unwrap_err();
        assert_eq!(err.fields(), vec!["contact_email"]);
    }

    #[tokio::test]
    async fn explicit_id_collision_is_a_duplicate() {
        let (mut store, library_id, _) = seeded().await;
        let mut record = library("Annex", "annex@central.org");
        record.set_id(Some(library_id));
        let err = RuleEngine::default()
            .check_create(&mut store, record)
            .await
            .unwrap_err();
        assert_eq!(err.fields(), vec!["id"]);
    }

    #[tokio::test]
    async fn isbn_is_unique_among_books() {
        let (mut store, library_id, _) = seeded().await;
        store
            .insert(&Record::Book(book(library_id, Some("9780134685991"), 1)))
            .await
            .unwrap();
        let err = RuleEngine::default()
            .check_create(&mut store, Record::Book(book(library_id, Some("9780134685991"), 2)))
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::DuplicateEntity { entity: "Book", .. });
    }

    #[tokio::test]
    async fn second_review_for_same_pair_is_a_duplicate() {
        let mut store = MemoryStore::new();
        let mut m = member("ada@example.com", "+16502530000");
        m.set_id(Some(7));
        store.insert(&m).await.unwrap();
        let library_id = store.insert(&library("Central", "desk@central.org")).await.unwrap();
        let mut b = book(library_id, None, 1);
        b.id = Some(3);
        store.insert(&Record::Book(b)).await.unwrap();

        let rules = RuleEngine::default();
        let first = rules.check_create(&mut store, review(7, 3, 4.0)).await.unwrap();
        store.insert(&first.record).await.unwrap();

        let err = rules
            .check_create(&mut store, review(7, 3, 1.5))
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::DuplicateEntity { entity: "Review", .. });
    }

    #[tokio::test]
    async fn borrowing_needs_a_free_copy() {
        let (mut store, library_id, member_id) = seeded().await;
        let book_id = add_book(&mut store, library_id, 1).await;
        store.adjust_available_copies(book_id, -1).await.unwrap();

        let err = RuleEngine::default()
            .check_create(&mut store, Record::Borrowing(open_borrowing(member_id, book_id)))
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::CapacityExceeded { ref field, .. } if field == "book_id");
    }

    #[tokio::test]
    async fn same_book_cannot_be_borrowed_twice() {
        let (mut store, library_id, member_id) = seeded().await;
        let book_id = add_book(&mut store, library_id, 2).await;
        store
            .insert(&Record::Borrowing(open_borrowing(member_id, book_id)))
            .await
            .unwrap();

        let err = RuleEngine::default()
            .check_create(&mut store, Record::Borrowing(open_borrowing(member_id, book_id)))
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::DuplicateEntity { entity: "Borrowing", .. });
    }

    #[tokio::test]
    async fn open_borrowing_takes_a_copy_and_returned_one_does_not() {
        let (mut store, library_id, member_id) = seeded().await;
        let book_id = add_book(&mut store, library_id, 2).await;
        let rules = RuleEngine::default();

        let open = rules
            .check_create(&mut store, Record::Borrowing(open_borrowing(member_id, book_id)))
            .await
            .unwrap();
        assert_eq!(open.copies, Some(CopyAdjustment { book_id, delta: -1 }));

        let mut returned = open_borrowing(member_id, book_id);
        returned.return_date = Some(day(2024, 5, 10));
        let admission = rules
            .check_create(&mut store, Record::Borrowing(returned))
            .await
            .unwrap();
        assert_eq!(admission.copies, None);
    }

    #[test]
    fn first_return_gives_the_copy_back() {
        let previous = open_borrowing(1, 2);
        let mut returned = previous.clone();
        returned.return_date = Some(day(2024, 5, 9));

        assert_eq!(
            borrowing_update_effect(&previous, &returned).unwrap(),
            Some(CopyAdjustment { book_id: 2, delta: 1 })
        );
        assert_eq!(borrowing_update_effect(&returned, &returned).unwrap(), None);
        assert!(borrowing_update_effect(&returned, &previous).is_err());

        let mut moved = previous.clone();
        moved.book_id = 9;
        assert_matches!(
            borrowing_update_effect(&previous, &moved),
            Err(CoreError::Validation(_))
        );
    }

    #[tokio::test]
    async fn strict_policy_rejects_unknown_natural_references() {
        let (mut store, library_id, _) = seeded().await;
        let mut b = book(library_id, None, 1);
        b.categories = vec![Ref::Natural("Poetry".into())];

        let err = RuleEngine::default()
            .check_create(&mut store, Record::Book(b))
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::ForeignKeyNotFound { target: "Category", .. });
    }

    #[tokio::test]
    async fn get_or_create_resolves_and_creates() {
        let (mut store, _, _) = seeded().await;
        let existing = store.insert(&category("Poetry")).await.unwrap();
        let rules = RuleEngine {
            book_references: BookReferencePolicy::GetOrCreate,
            ..RuleEngine::default()
        };

        let mut b = book(0, None, 1);
        b.library = Ref::Natural("central".into());
        b.categories = vec![Ref::Natural("POETRY".into()), Ref::Natural("Drama".into())];
        b.authors = vec![Ref::Natural(AuthorName {
            first_name: "Kent".into(),
            last_name: "Beck".into(),
            birth_date: None,
        })];

        let admission = rules.check_create(&mut store, Record::Book(b)).await.unwrap();
        let Record::Book(resolved) = admission.record else {
            panic!("expected a book");
        };
        assert_eq!(resolved.library, Ref::Id(1));
        assert_eq!(resolved.categories[0], Ref::Id(existing));
        assert_eq!(resolved.categories.len(), 2);
        assert_eq!(store.len(EntityKind::Author), 1);
        assert_eq!(store.len(EntityKind::Category), 2);
    }

    #[tokio::test]
    async fn library_names_are_never_created() {
        let (mut store, _, _) = seeded().await;
        let rules = RuleEngine {
            book_references: BookReferencePolicy::GetOrCreate,
            ..RuleEngine::default()
        };
        let mut b = book(0, None, 1);
        b.library = Ref::Natural("Nowhere".into());

        let err = rules.check_create(&mut store, Record::Book(b)).await.unwrap_err();
        assert_matches!(err, CoreError::ForeignKeyNotFound { target: "Library", .. });
    }

    #[tokio::test]
    async fn duplicate_link_is_rejected() {
        let (mut store, library_id, _) = seeded().await;
        let book_id = add_book(&mut store, library_id, 1).await;
        let author_id = store.insert(&author("Kent", "Beck", None)).await.unwrap();
        let link = Record::BookAuthor(BookAuthorLink { book_id, author_id });
        store.insert(&link).await.unwrap();

        let err = RuleEngine::default()
            .check_create(&mut store, link)
            .await
            .unwrap_err();
        assert_eq!(err.fields(), vec!["book_id", "author_id"]);
    }

    #[tokio::test]
    async fn deleting_a_library_cascades_through_its_books() {
        let (mut store, library_id, member_id) = seeded().await;
        let book_id = add_book(&mut store, library_id, 2).await;
        let author_id = store.insert(&author("Kent", "Beck", None)).await.unwrap();
        store
            .insert(&Record::BookAuthor(BookAuthorLink { book_id, author_id }))
            .await
            .unwrap();
        store
            .insert(&Record::Borrowing(open_borrowing(member_id, book_id)))
            .await
            .unwrap();
        store.insert(&review(member_id, book_id, 5.0)).await.unwrap();

        RuleEngine::default()
            .delete(&mut store, EntityKind::Library, library_id)
            .await
            .unwrap();

        for kind in [
            EntityKind::Library,
            EntityKind::Book,
            EntityKind::BookAuthor,
            EntityKind::Borrowing,
            EntityKind::Review,
        ] {
            assert_eq!(store.len(kind), 0, "{kind} left behind");
        }
        assert_eq!(store.len(EntityKind::Author), 1);
        assert_eq!(store.len(EntityKind::Member), 1);
    }

    #[tokio::test]
    async fn deleting_a_member_returns_open_copies() {
        let (mut store, library_id, member_id) = seeded().await;
        let book_id = add_book(&mut store, library_id, 2).await;
        store
            .insert(&Record::Borrowing(open_borrowing(member_id, book_id)))
            .await
            .unwrap();
        store.adjust_available_copies(book_id, -1).await.unwrap();

        RuleEngine::default()
            .delete(&mut store, EntityKind::Member, member_id)
            .await
            .unwrap();

        assert_eq!(store.available_copies(book_id).await.unwrap(), Some(2));
        assert_eq!(store.len(EntityKind::Borrowing), 0);
    }

    #[tokio::test]
    async fn deleting_a_missing_row_is_not_found() {
        let mut store = MemoryStore::new();
        let err = RuleEngine::default()
            .delete(&mut store, EntityKind::Review, 99)
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::NotFound { entity: "Review", id: 99 });
    }
}

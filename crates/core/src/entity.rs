//! Canonical entity records and their static metadata.
//!
//! A canonical record is the output of a validator: typed, normalized and
//! ready to be persisted. Each [`EntityKind`] carries a key descriptor (the
//! source columns that identify a row) and the foreign keys it declares.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::DbId;

// ---------------------------------------------------------------------------
// Entity kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Library,
    Author,
    Category,
    Member,
    Book,
    BookAuthor,
    BookCategory,
    Borrowing,
    Review,
}

impl EntityKind {
    /// Dependency order: every kind only references kinds listed before it.
    pub const INGEST_ORDER: [EntityKind; 9] = [
        EntityKind::Library,
        EntityKind::Author,
        EntityKind::Category,
        EntityKind::Member,
        EntityKind::Book,
        EntityKind::BookAuthor,
        EntityKind::BookCategory,
        EntityKind::Borrowing,
        EntityKind::Review,
    ];

    /// Human-readable label used in errors and log lines.
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Library => "Library",
            EntityKind::Author => "Author",
            EntityKind::Category => "Category",
            EntityKind::Member => "Member",
            EntityKind::Book => "Book",
            EntityKind::BookAuthor => "BookAuthor",
            EntityKind::BookCategory => "BookCategory",
            EntityKind::Borrowing => "Borrowing",
            EntityKind::Review => "Review",
        }
    }

    /// Table name, also the CSV file stem and the REST collection name.
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Library => "libraries",
            EntityKind::Author => "authors",
            EntityKind::Category => "categories",
            EntityKind::Member => "members",
            EntityKind::Book => "books",
            EntityKind::BookAuthor => "book_authors",
            EntityKind::BookCategory => "book_categories",
            EntityKind::Borrowing => "borrowings",
            EntityKind::Review => "reviews",
        }
    }

    /// Source columns that identify a row of this kind.
    pub fn key(self) -> KeyDescriptor {
        match self {
            EntityKind::Library => KeyDescriptor::new(&["library_id"]),
            EntityKind::Author => KeyDescriptor::new(&["author_id"]),
            EntityKind::Category => KeyDescriptor::new(&["category_id"]),
            EntityKind::Member => KeyDescriptor::new(&["member_id"]),
            EntityKind::Book => KeyDescriptor::new(&["book_id"]),
            EntityKind::BookAuthor => KeyDescriptor::new(&["book_id", "author_id"]),
            EntityKind::BookCategory => KeyDescriptor::new(&["book_id", "category_id"]),
            EntityKind::Borrowing => KeyDescriptor::new(&["borrowing_id"]),
            EntityKind::Review => KeyDescriptor::new(&["review_id"]),
        }
    }

    /// Declared foreign keys: field on this kind → referenced kind.
    pub fn foreign_keys(self) -> &'static [ForeignKey] {
        const BOOK: &[ForeignKey] = &[
            ForeignKey::new("library_id", EntityKind::Library),
            ForeignKey::new("author_ids", EntityKind::Author),
            ForeignKey::new("category_ids", EntityKind::Category),
        ];
        const BOOK_AUTHOR: &[ForeignKey] = &[
            ForeignKey::new("book_id", EntityKind::Book),
            ForeignKey::new("author_id", EntityKind::Author),
        ];
        const BOOK_CATEGORY: &[ForeignKey] = &[
            ForeignKey::new("book_id", EntityKind::Book),
            ForeignKey::new("category_id", EntityKind::Category),
        ];
        const MEMBER_BOOK: &[ForeignKey] = &[
            ForeignKey::new("member_id", EntityKind::Member),
            ForeignKey::new("book_id", EntityKind::Book),
        ];

        match self {
            EntityKind::Book => BOOK,
            EntityKind::BookAuthor => BOOK_AUTHOR,
            EntityKind::BookCategory => BOOK_CATEGORY,
            EntityKind::Borrowing | EntityKind::Review => MEMBER_BOOK,
            EntityKind::Library | EntityKind::Author | EntityKind::Category | EntityKind::Member => {
                &[]
            }
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    /// Accepts the table name (`books`) or the snake-case kind (`book`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        EntityKind::INGEST_ORDER
            .into_iter()
            .find(|kind| {
                kind.table() == wanted || kind.label().to_ascii_lowercase() == wanted.replace('_', "")
            })
            .ok_or_else(|| format!("unknown entity type '{s}'"))
    }
}

/// A foreign-key declaration. The referenced key is always the primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKey {
    pub field: &'static str,
    pub target: EntityKind,
}

impl ForeignKey {
    pub const fn new(field: &'static str, target: EntityKind) -> Self {
        Self { field, target }
    }
}

/// Ordered list of source columns that identify a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyDescriptor {
    pub fields: &'static [&'static str],
}

impl KeyDescriptor {
    pub const fn new(fields: &'static [&'static str]) -> Self {
        Self { fields }
    }

    /// Render the key of a raw record for log lines, e.g. `book_id=3`.
    ///
    /// Single-column keys also fall back to a plain `id` column. Returns
    /// `N/A` when nothing is present.
    pub fn render(&self, raw: &crate::types::RawRecord) -> String {
        let mut parts = Vec::new();
        for field in self.fields {
            if let Some(value) = raw.get(*field).and_then(render_scalar) {
                parts.push(format!("{field}={value}"));
            }
        }
        if parts.is_empty() && self.fields.len() == 1 {
            if let Some(value) = raw.get("id").and_then(render_scalar) {
                parts.push(format!("{}={value}", self.fields[0]));
            }
        }
        if parts.is_empty() {
            "N/A".to_string()
        } else {
            parts.join(",")
        }
    }
}

fn render_scalar(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Canonical records
// ---------------------------------------------------------------------------

/// Where a library sits. Country defaults to India when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub district: String,
    pub state: String,
    pub pin: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLibrary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<DbId>,
    pub name: String,
    pub address: Address,
    pub contact_email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAuthor {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<DbId>,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub biography: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<DbId>,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberType {
    Student,
    Faculty,
}

impl MemberType {
    pub fn as_str(self) -> &'static str {
        match self {
            MemberType::Student => "Student",
            MemberType::Faculty => "Faculty",
        }
    }
}

impl FromStr for MemberType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(MemberType::Student),
            "faculty" => Ok(MemberType::Faculty),
            other => Err(format!("'{other}' is not one of Student, Faculty")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMember {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<DbId>,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub member_type: MemberType,
}

/// A reference given either by primary key or by natural key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ref<K> {
    Id(DbId),
    Natural(K),
}

impl<K> Ref<K> {
    pub fn id(&self) -> Option<DbId> {
        match self {
            Ref::Id(id) => Some(*id),
            Ref::Natural(_) => None,
        }
    }
}

/// Natural key of an author: names plus optional birth date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorName {
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<DbId>,
    pub title: String,
    pub isbn: Option<String>,
    pub publication_date: NaiveDate,
    pub total_copies: i32,
    pub available_copies: i32,
    /// Library id, or library name.
    pub library: Ref<String>,
    pub authors: Vec<Ref<AuthorName>>,
    /// Category ids, or category names.
    pub categories: Vec<Ref<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookAuthorLink {
    pub book_id: DbId,
    pub author_id: DbId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookCategoryLink {
    pub book_id: DbId,
    pub category_id: DbId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBorrowing {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<DbId>,
    pub member_id: DbId,
    pub book_id: DbId,
    pub borrow_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub late_fee: Option<f64>,
}

impl NewBorrowing {
    pub fn is_open(&self) -> bool {
        self.return_date.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReview {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<DbId>,
    pub member_id: DbId,
    pub book_id: DbId,
    pub rating: f64,
    pub comment: Option<String>,
    pub review_date: NaiveDate,
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Any canonical record, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "entity", content = "record", rename_all = "snake_case")]
pub enum Record {
    Library(NewLibrary),
    Author(NewAuthor),
    Category(NewCategory),
    Member(NewMember),
    Book(NewBook),
    BookAuthor(BookAuthorLink),
    BookCategory(BookCategoryLink),
    Borrowing(NewBorrowing),
    Review(NewReview),
}

/// A scalar used to match rows by field.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyValue {
    Int(i64),
    Text(String),
    Date(NaiveDate),
    Null,
}

impl From<DbId> for KeyValue {
    fn from(v: DbId) -> Self {
        KeyValue::Int(v)
    }
}

impl From<&str> for KeyValue {
    fn from(v: &str) -> Self {
        KeyValue::Text(v.to_string())
    }
}

impl From<Option<NaiveDate>> for KeyValue {
    fn from(v: Option<NaiveDate>) -> Self {
        v.map_or(KeyValue::Null, KeyValue::Date)
    }
}

impl From<Option<&str>> for KeyValue {
    fn from(v: Option<&str>) -> Self {
        v.map_or(KeyValue::Null, KeyValue::from)
    }
}

impl Record {
    pub fn kind(&self) -> EntityKind {
        match self {
            Record::Library(_) => EntityKind::Library,
            Record::Author(_) => EntityKind::Author,
            Record::Category(_) => EntityKind::Category,
            Record::Member(_) => EntityKind::Member,
            Record::Book(_) => EntityKind::Book,
            Record::BookAuthor(_) => EntityKind::BookAuthor,
            Record::BookCategory(_) => EntityKind::BookCategory,
            Record::Borrowing(_) => EntityKind::Borrowing,
            Record::Review(_) => EntityKind::Review,
        }
    }

    /// Source-provided primary key, if any. Link records never carry one.
    pub fn id(&self) -> Option<DbId> {
        match self {
            Record::Library(r) => r.id,
            Record::Author(r) => r.id,
            Record::Category(r) => r.id,
            Record::Member(r) => r.id,
            Record::Book(r) => r.id,
            Record::Borrowing(r) => r.id,
            Record::Review(r) => r.id,
            Record::BookAuthor(_) | Record::BookCategory(_) => None,
        }
    }

    pub fn set_id(&mut self, id: Option<DbId>) {
        match self {
            Record::Library(r) => r.id = id,
            Record::Author(r) => r.id = id,
            Record::Category(r) => r.id = id,
            Record::Member(r) => r.id = id,
            Record::Book(r) => r.id = id,
            Record::Borrowing(r) => r.id = id,
            Record::Review(r) => r.id = id,
            Record::BookAuthor(_) | Record::BookCategory(_) => {}
        }
    }

    /// Primary-key values held in a declared foreign-key field.
    ///
    /// Natural-key references are not included; they are resolved by the
    /// rule engine instead.
    pub fn reference_ids(&self, field: &str) -> Vec<DbId> {
        match (self, field) {
            (Record::Book(b), "library_id") => b.library.id().into_iter().collect(),
            (Record::Book(b), "author_ids") => b.authors.iter().filter_map(Ref::id).collect(),
            (Record::Book(b), "category_ids") => b.categories.iter().filter_map(Ref::id).collect(),
            (Record::BookAuthor(l), "book_id") => vec![l.book_id],
            (Record::BookAuthor(l), "author_id") => vec![l.author_id],
            (Record::BookCategory(l), "book_id") => vec![l.book_id],
            (Record::BookCategory(l), "category_id") => vec![l.category_id],
            (Record::Borrowing(r), "member_id") => vec![r.member_id],
            (Record::Borrowing(r), "book_id") => vec![r.book_id],
            (Record::Review(r), "member_id") => vec![r.member_id],
            (Record::Review(r), "book_id") => vec![r.book_id],
            _ => Vec::new(),
        }
    }

    /// Value of a persisted column, used to match rows by field.
    ///
    /// Column names follow the relational layout (library address fields
    /// are flattened). Unknown columns yield `None`.
    pub fn column(&self, name: &str) -> Option<KeyValue> {
        let value: KeyValue = match (self, name) {
            (Record::Library(r), "name") => r.name.as_str().into(),
            (Record::Library(r), "street") => r.address.street.as_str().into(),
            (Record::Library(r), "district") => r.address.district.as_str().into(),
            (Record::Library(r), "state") => r.address.state.as_str().into(),
            (Record::Library(r), "pin") => r.address.pin.as_str().into(),
            (Record::Library(r), "country") => r.address.country.as_str().into(),
            (Record::Library(r), "contact_email") => r.contact_email.as_str().into(),
            (Record::Library(r), "phone") => r.phone.as_deref().into(),

            (Record::Author(r), "first_name") => r.first_name.as_str().into(),
            (Record::Author(r), "last_name") => r.last_name.as_str().into(),
            (Record::Author(r), "birth_date") => r.birth_date.into(),

            (Record::Category(r), "name") => r.name.as_str().into(),

            (Record::Member(r), "email") => r.email.as_str().into(),
            (Record::Member(r), "phone") => r.phone.as_str().into(),

            (Record::Book(r), "title") => r.title.as_str().into(),
            (Record::Book(r), "isbn") => r.isbn.as_deref().into(),
            (Record::Book(r), "library_id") => r.library.id().map_or(KeyValue::Null, KeyValue::Int),

            (Record::BookAuthor(l), "book_id") => l.book_id.into(),
            (Record::BookAuthor(l), "author_id") => l.author_id.into(),
            (Record::BookCategory(l), "book_id") => l.book_id.into(),
            (Record::BookCategory(l), "category_id") => l.category_id.into(),

            (Record::Borrowing(r), "member_id") => r.member_id.into(),
            (Record::Borrowing(r), "book_id") => r.book_id.into(),
            (Record::Borrowing(r), "return_date") => r.return_date.into(),

            (Record::Review(r), "member_id") => r.member_id.into(),
            (Record::Review(r), "book_id") => r.book_id.into(),

            _ => return None,
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ingest_order_respects_foreign_keys() {
        for (i, kind) in EntityKind::INGEST_ORDER.iter().enumerate() {
            for fk in kind.foreign_keys() {
                let target_pos = EntityKind::INGEST_ORDER
                    .iter()
                    .position(|k| *k == fk.target)
                    .unwrap();
                assert!(target_pos < i, "{kind} depends on later {}", fk.target);
            }
        }
    }

    #[test]
    fn kind_parses_from_table_or_label() {
        assert_eq!("books".parse::<EntityKind>().unwrap(), EntityKind::Book);
        assert_eq!("Book".parse::<EntityKind>().unwrap(), EntityKind::Book);
        assert_eq!(
            "book_authors".parse::<EntityKind>().unwrap(),
            EntityKind::BookAuthor
        );
        assert!("shelves".parse::<EntityKind>().is_err());
    }

    #[test]
    fn key_renders_composite_and_missing() {
        let raw = json!({"book_id": "3", "author_id": 9}).as_object().unwrap().clone();
        assert_eq!(EntityKind::BookAuthor.key().render(&raw), "book_id=3,author_id=9");

        let empty = json!({"title": "Emma"}).as_object().unwrap().clone();
        assert_eq!(EntityKind::Book.key().render(&empty), "N/A");
    }

    #[test]
    fn key_falls_back_to_plain_id() {
        let raw = json!({"id": 12}).as_object().unwrap().clone();
        assert_eq!(EntityKind::Member.key().render(&raw), "member_id=12");
    }

    #[test]
    fn member_type_is_case_insensitive() {
        assert_eq!("STUDENT".parse::<MemberType>().unwrap(), MemberType::Student);
        assert_eq!(" faculty".parse::<MemberType>().unwrap(), MemberType::Faculty);
        assert!("staff".parse::<MemberType>().is_err());
    }
}

//! Admission of one record: validate, check references, apply rules, write.
//!
//! [`Catalog`] is what both the batch pipeline and the REST handlers call.
//! It never opens or closes transactions; callers wrap each call in a
//! record savepoint (batch) or a transaction (request).

use chrono::{NaiveDate, Utc};
use serde_json::Value;

use crate::entity::{EntityKind, Record};
use crate::error::CoreError;
use crate::integrity::check_references;
use crate::normalize::IsbnPolicy;
use crate::rules::{free_copies, Admission, BookReferencePolicy, RuleEngine, DEFAULT_BORROW_LIMIT};
use crate::store::EntityStore;
use crate::types::{DbId, RawRecord};
use crate::validation::{validate_record, ValidationContext, DEFAULT_LOAN_PERIOD_DAYS};

/// Tunables shared by every entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogConfig {
    pub borrow_limit: i64,
    pub loan_period_days: i64,
    pub isbn_policy: IsbnPolicy,
    pub book_references: BookReferencePolicy,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            borrow_limit: DEFAULT_BORROW_LIMIT,
            loan_period_days: DEFAULT_LOAN_PERIOD_DAYS,
            isbn_policy: IsbnPolicy::default(),
            book_references: BookReferencePolicy::default(),
        }
    }
}

/// A record that has been written, with its assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct Admitted {
    pub id: DbId,
    pub record: Record,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    config: CatalogConfig,
    rules: RuleEngine,
    fixed_today: Option<NaiveDate>,
}

impl Catalog {
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            rules: RuleEngine {
                borrow_limit: config.borrow_limit,
                book_references: config.book_references,
            },
            config,
            fixed_today: None,
        }
    }

    /// Pin "today" instead of reading the clock.
    pub fn with_fixed_today(mut self, today: NaiveDate) -> Self {
        self.fixed_today = Some(today);
        self
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        self.fixed_today.unwrap_or_else(|| Utc::now().date_naive())
    }

    pub fn validation_context(&self) -> ValidationContext {
        ValidationContext {
            today: self.today(),
            isbn_policy: self.config.isbn_policy,
            loan_period_days: self.config.loan_period_days,
        }
    }

    /// Validate a raw record without touching any store.
    pub fn validate(&self, kind: EntityKind, raw: &RawRecord) -> Result<Record, CoreError> {
        Ok(validate_record(kind, raw, &self.validation_context())?)
    }

    /// Validate, check and persist a new record.
    pub async fn create<S>(&self, store: &mut S, kind: EntityKind, raw: &RawRecord) -> Result<Admitted, CoreError>
    where
        S: EntityStore + ?Sized,
    {
        let record = self.validate(kind, raw)?;
        check_references(store, &record).await?;
        let admission = self.rules.check_create(store, record).await?;

        let id = store.insert(&admission.record).await?;
        apply_copies(store, &admission).await?;

        let mut record = admission.record;
        record.set_id(Some(id));
        Ok(Admitted { id, record })
    }

    /// Validate and replace stored row `id`.
    ///
    /// A review's date is reset to today on every update. A book given
    /// without `available_copies` keeps its open loans counted against the
    /// new total.
    pub async fn update<S>(
        &self,
        store: &mut S,
        kind: EntityKind,
        id: DbId,
        raw: &RawRecord,
    ) -> Result<Admitted, CoreError>
    where
        S: EntityStore + ?Sized,
    {
        let mut record = self.validate(kind, raw)?;
        record.set_id(None);
        match &mut record {
            Record::Review(review) => review.review_date = self.today(),
            Record::Book(book) if raw.get("available_copies").map_or(true, Value::is_null) => {
                book.available_copies = free_copies(store, id, book.total_copies).await?;
            }
            _ => {}
        }
        check_references(store, &record).await?;
        let admission = self.rules.check_update(store, id, record).await?;

        if !store.update(id, &admission.record).await? {
            return Err(CoreError::NotFound {
                entity: kind.label(),
                id,
            });
        }
        apply_copies(store, &admission).await?;

        let mut record = admission.record;
        record.set_id(Some(id));
        Ok(Admitted { id, record })
    }

    /// Delete a row and its dependants.
    pub async fn delete<S>(&self, store: &mut S, kind: EntityKind, id: DbId) -> Result<(), CoreError>
    where
        S: EntityStore + ?Sized,
    {
        self.rules.delete(store, kind, id).await
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(CatalogConfig::default())
    }
}

async fn apply_copies<S>(store: &mut S, admission: &Admission) -> Result<(), CoreError>
where
    S: EntityStore + ?Sized,
{
    if let Some(adjustment) = admission.copies {
        store
            .adjust_available_copies(adjustment.book_id, adjustment.delta)
            .await?;
    }
    Ok(())
}

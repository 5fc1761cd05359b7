//! SQL for [`Lookup`] queries.

use libris_core::entity::KeyValue;
use libris_core::store::{Lookup, Match};
use sqlx::{Postgres, QueryBuilder};

/// `SELECT id` of matching rows, ascending.
pub fn select_ids(lookup: &Lookup) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT id FROM {} WHERE TRUE", lookup.kind.table()));
    push_criteria(&mut qb, lookup);
    qb.push(" ORDER BY id");
    qb
}

/// `SELECT COUNT(*)` of matching rows.
pub fn count(lookup: &Lookup) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT COUNT(*) FROM {} WHERE TRUE",
        lookup.kind.table()
    ));
    push_criteria(&mut qb, lookup);
    qb
}

/// `SELECT EXISTS(...)` over matching rows.
pub fn exists(lookup: &Lookup) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE TRUE",
        lookup.kind.table()
    ));
    push_criteria(&mut qb, lookup);
    qb.push(")");
    qb
}

// Field names come from code, never from input, so they are spliced in.
fn push_criteria(qb: &mut QueryBuilder<'static, Postgres>, lookup: &Lookup) {
    for criterion in &lookup.criteria {
        let field = criterion.field;
        match (&criterion.value, criterion.mode) {
            (KeyValue::Null, _) => {
                qb.push(format_args!(" AND {field} IS NULL"));
            }
            (KeyValue::Text(text), Match::IgnoreCase) => {
                qb.push(format_args!(" AND LOWER({field}) = LOWER("));
                qb.push_bind(text.clone());
                qb.push(")");
            }
            (value, _) => {
                qb.push(format_args!(" AND {field} = "));
                push_value(qb, value);
            }
        }
    }
    if let Some(id) = lookup.exclude_id {
        qb.push(" AND id <> ");
        qb.push_bind(id);
    }
}

fn push_value(qb: &mut QueryBuilder<'static, Postgres>, value: &KeyValue) {
    match value {
        KeyValue::Int(v) => {
            qb.push_bind(*v);
        }
        KeyValue::Text(v) => {
            qb.push_bind(v.clone());
        }
        KeyValue::Date(v) => {
            qb.push_bind(*v);
        }
        KeyValue::Null => {
            qb.push("NULL");
        }
    }
}

use chrono::Duration;

use super::fields::{self, Fields};
use super::{Validate, ValidationContext};
use crate::entity::{EntityKind, NewBorrowing};
use crate::error::{ErrorCode, FieldError};
use crate::types::RawRecord;

impl Validate for NewBorrowing {
    const KIND: EntityKind = EntityKind::Borrowing;

    /// `borrow_date` defaults to today and `due_date` to the end of the
    /// loan period. Late fees are rounded to cents.
    fn validate(raw: &RawRecord, ctx: &ValidationContext) -> Result<Self, Vec<FieldError>> {
        let mut f = Fields::new(raw);
        let id = f.optional_any(&["id", "borrowing_id"], fields::id);
        let member_id = f.required("member_id", fields::id);
        let book_id = f.required("book_id", fields::id);
        let borrow_date = f.optional("borrow_date", fields::date);
        let due_date = f.optional("due_date", fields::date);
        let return_date = f.optional("return_date", fields::date);
        let late_fee = f.optional("late_fee", fields::decimal);

        let borrow_date = borrow_date.unwrap_or(ctx.today);
        let due_date = match due_date {
            Some(due) => Some(due),
            None => {
                let due = Duration::try_days(ctx.loan_period_days)
                    .and_then(|period| borrow_date.checked_add_signed(period));
                if due.is_none() {
                    f.push(
                        FieldError::new(
                            "due_date",
                            ErrorCode::OutOfRange,
                            "loan period runs past the last representable date",
                        )
                        .with_raw(borrow_date.to_string()),
                    );
                }
                due
            }
        };

        if borrow_date > ctx.today {
            f.push(
                FieldError::new("borrow_date", ErrorCode::OutOfRange, "must not be in the future")
                    .with_raw(borrow_date.to_string()),
            );
        }
        if let Some(due) = due_date.filter(|due| *due < borrow_date) {
            f.push(FieldError::record(
                "due_date",
                format!("due_date ({due}) is before borrow_date ({borrow_date})"),
            ));
        }
        if let Some(returned) = return_date {
            if returned < borrow_date {
                f.push(FieldError::record(
                    "return_date",
                    format!("return_date ({returned}) is before borrow_date ({borrow_date})"),
                ));
            }
            if returned > ctx.today {
                f.push(
                    FieldError::new("return_date", ErrorCode::OutOfRange, "must not be in the future")
                        .with_raw(returned.to_string()),
                );
            }
        }
        if let Some(fee) = late_fee {
            if fee < 0.0 {
                f.push(
                    FieldError::new("late_fee", ErrorCode::OutOfRange, "must not be negative")
                        .with_raw(fee.to_string()),
                );
            }
        }

        let (Some(member_id), Some(book_id), Some(due_date)) = (member_id, book_id, due_date) else {
            return Err(f.into_errors());
        };
        f.finish()?;

        Ok(NewBorrowing {
            id,
            member_id,
            book_id,
            borrow_date,
            due_date,
            return_date,
            late_fee: late_fee.map(|fee| (fee * 100.0).round() / 100.0),
        })
    }
}

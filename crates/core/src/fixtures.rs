//! Canonical records for unit tests.

use chrono::NaiveDate;

use crate::entity::*;
use crate::types::DbId;

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn library(name: &str, email: &str) -> Record {
    Record::Library(NewLibrary {
        id: None,
        name: name.into(),
        address: Address {
            street: "12 MG Road".into(),
            district: "Pune".into(),
            state: "Maharashtra".into(),
            pin: "411001".into(),
            country: "India".into(),
        },
        contact_email: email.into(),
        phone: None,
    })
}

pub fn author(first: &str, last: &str, born: Option<NaiveDate>) -> Record {
    Record::Author(NewAuthor {
        id: None,
        first_name: first.into(),
        last_name: last.into(),
        birth_date: born,
        nationality: None,
        biography: None,
    })
}

pub fn category(name: &str) -> Record {
    Record::Category(NewCategory {
        id: None,
        name: name.into(),
        description: None,
    })
}

pub fn member(email: &str, phone: &str) -> Record {
    Record::Member(NewMember {
        id: None,
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: email.into(),
        phone: phone.into(),
        member_type: MemberType::Student,
    })
}

pub fn book(library_id: DbId, isbn: Option<&str>, total: i32) -> NewBook {
    NewBook {
        id: None,
        title: "Refactoring".into(),
        isbn: isbn.map(Into::into),
        publication_date: day(2018, 11, 20),
        total_copies: total,
        available_copies: total,
        library: Ref::Id(library_id),
        authors: Vec::new(),
        categories: Vec::new(),
    }
}

pub fn open_borrowing(member_id: DbId, book_id: DbId) -> NewBorrowing {
    NewBorrowing {
        id: None,
        member_id,
        book_id,
        borrow_date: day(2024, 5, 1),
        due_date: day(2024, 5, 15),
        return_date: None,
        late_fee: None,
    }
}

pub fn review(member_id: DbId, book_id: DbId, rating: f64) -> Record {
    Record::Review(NewReview {
        id: None,
        member_id,
        book_id,
        rating,
        comment: None,
        review_date: day(2024, 5, 20),
    })
}

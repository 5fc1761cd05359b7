//! Row models: one struct per table, as returned by the repositories.

pub mod author;
pub mod book;
pub mod book_link;
pub mod borrowing;
pub mod category;
pub mod library;
pub mod member;
pub mod review;

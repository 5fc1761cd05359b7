//! Validation, normalization and admission rules for library records.
//!
//! Everything here is free of database and HTTP concerns. Persistence is
//! reached through the [`store::EntityStore`] trait.

pub mod catalog;
pub mod config;
pub mod entity;
pub mod error;
pub mod integrity;
pub mod normalize;
pub mod rules;
pub mod store;
pub mod types;
pub mod validation;

#[cfg(test)]
mod fixtures;

//! Open Library client for the bibliographic ingestion variant.
//!
//! [`OpenLibraryClient`] talks to the public HTTP API with at most one
//! request per second. The [`BibliographicSource`] view of it never fails:
//! network and decoding errors are logged and come back as "nothing found".

pub mod client;
pub mod models;
pub mod rate_limit;

use async_trait::async_trait;

pub use client::{OpenLibraryClient, OpenLibraryError, DEFAULT_BASE_URL};
pub use models::{AuthorCandidate, Work, WorkDetails};

/// A remote catalogue of authors and their works.
#[async_trait]
pub trait BibliographicSource: Send + Sync {
    /// Best match for an author name, if any.
    async fn search_author(&self, name: &str) -> Option<AuthorCandidate>;

    /// Up to `limit` works of the author with `author_key`.
    async fn author_works(&self, author_key: &str, limit: usize) -> Vec<Work>;

    async fn work_details(&self, work_key: &str) -> Option<WorkDetails>;
}

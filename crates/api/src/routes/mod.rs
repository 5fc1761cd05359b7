pub mod health;
pub mod records;

use axum::routing::post;
use axum::Router;
use libris_core::entity::EntityKind;

use crate::handlers;
use crate::state::AppState;

/// Collections exposed over REST. Book links are written through books.
pub const COLLECTIONS: [EntityKind; 7] = [
    EntityKind::Library,
    EntityKind::Author,
    EntityKind::Category,
    EntityKind::Member,
    EntityKind::Book,
    EntityKind::Borrowing,
    EntityKind::Review,
];

/// Build the `/api/v1` route tree.
///
/// ```text
/// /libraries, /authors, /categories, /members,
/// /books, /borrowings, /reviews              list, create
/// /{collection}/{id}                          get, update, delete
///
/// /ingest/{entity}                            run a JSON array as one batch (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    let mut router = Router::new().route("/ingest/{entity}", post(handlers::ingest::ingest));
    for kind in COLLECTIONS {
        router = router.nest(&format!("/{}", kind.table()), records::router(kind));
    }
    router
}

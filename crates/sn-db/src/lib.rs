//! sn-db — the Store contract (C1) and its PostgreSQL implementation.

pub mod models;
pub mod pg_store;
pub mod store;

pub use pg_store::{PgReferenceCacheGuard, PgStore};
pub use store::{
    CommitEvidenceItem, CommitEvidenceOutcome, HypothesisPatch, NewDocument, NewHypothesis,
    NewSegment, ReferenceCacheLock, Store,
};

use sn_common::SnResult;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Connects to Postgres and runs pending migrations. Called once at startup
/// by the API and both workers; failure here is an exit-code-1 condition
/// (spec §6).
pub async fn connect_and_migrate(database_url: &str) -> SnResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .map_err(|e| sn_common::SnError::Unavailable(format!("migration failed: {e}")))?;

    Ok(pool)
}

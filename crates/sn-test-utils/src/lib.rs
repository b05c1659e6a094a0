//! Shared test fixtures: an in-memory [`Store`](sn_db::Store) fake plus
//! builders for the row types, so engine and API tests don't each hand-roll
//! a `Source`/`Document`/`Segment`/`Hypothesis` literal.

pub mod builders;
pub mod fake_store;

pub use fake_store::FakeStore;

//! sn-api — the HTTP surface (spec §6): a thin axum layer over `Store`,
//! `Queue`, and the evidence `Engine`. Every handler either delegates
//! straight to one of those three, or does request-shape validation first
//! (`validation.rs`) — no business logic lives in this crate.

pub mod dto;
pub mod handlers;
pub mod router;
pub mod state;
pub mod validation;

pub use router::build_router;
pub use state::AppState;

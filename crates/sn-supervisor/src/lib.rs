//! sn-supervisor — the process lifecycle shared by the API and both workers:
//! signal handling, cancellation-aware poll scheduling, structured logging
//! init, and the ambient metrics surface. None of this is business logic —
//! every binary in the workspace wires the same three calls
//! (`init_tracing`, `shutdown_signal`, `run_poll_loop`/
//! `metrics::install_recorder`) at startup.

pub mod logging;
pub mod metrics;
pub mod poll_loop;
pub mod shutdown;

pub use logging::init_tracing;
pub use poll_loop::run_poll_loop;
pub use shutdown::shutdown_signal;

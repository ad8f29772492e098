//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields
//!       (candy_machine, start_index, end_index, signature, lamports)
//!     → logging.rs (EnvFilter + fmt layer on stdout)
//! ```

pub mod logging;

pub use logging::init_logging;

//! Observability: structured logging setup.

pub mod logging;

pub use logging::{init_logging, verbosity_to_directive, LogFormat};

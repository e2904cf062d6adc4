#![forbid(unsafe_code)]

//! Core: input events, hit-test geometry, debouncing, and logging.

pub mod debounce;
pub mod event;
pub mod geometry;
pub mod logging;

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{debug, debug_span, error, info, trace, warn};

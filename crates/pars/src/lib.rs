#![forbid(unsafe_code)]
//! pars public API facade.
//!
//! Re-exports the engine surface through a stable external interface. This
//! is the crate downstream consumers (CLI, embedding applications) depend
//! on.

pub use pars_engine::*;

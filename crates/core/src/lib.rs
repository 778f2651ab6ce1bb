//! Shared leaf crate: id/time aliases, the core error type, and the
//! small I/O helpers the rest of the pipeline builds on.
//!
//! Zero internal dependencies by design — every other workspace crate
//! may depend on `clipcast-core`, never the other way around.

pub mod cache;
pub mod error;
pub mod ffmpeg;
pub mod types;
pub mod words;

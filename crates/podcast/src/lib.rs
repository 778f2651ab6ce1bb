//! Client for the bilingual-podcast generation service.
//!
//! The service accepts a prompt, answers with a correlation id, and
//! eventually exposes a structured result (bilingual text, a base64
//! audio blob, and time-stamped clip boundaries) on its status
//! endpoint. Generation takes minutes, so the client polls with a
//! two-tier retry policy and caches full responses on disk.

pub mod client;
pub mod poll;
pub mod types;

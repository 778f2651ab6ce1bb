//! Pipeline orchestration.
//!
//! [`content::ContentProcessor`] turns a prompt into fully-resolved
//! render specs (podcast generation, clip extraction, image gathering,
//! asset staging). [`manager::VideoManager`] drives a render batch to a
//! single concatenated output file, waiting on either the polling
//! engine or the completion feed.

pub mod content;
pub mod error;
pub mod manager;

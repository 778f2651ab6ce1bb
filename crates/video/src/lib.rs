//! Client for the remote video-rendering service.
//!
//! A render job is submitted as a multipart upload (speech, music,
//! images, timing metadata) and answered with a correlation id. The
//! finished clip is collected either by bounded polling
//! ([`poller::poll_batch`]) or by waiting on the push-based completion
//! feed ([`completion::wait_via_feed`]) and fetching afterwards.

pub mod client;
pub mod completion;
pub mod poller;
pub mod spec;

//! Client for the image-search service.
//!
//! A search session is started per query; the service gathers images
//! asynchronously, exposing a count endpoint and per-index binary
//! fetch. Download is tolerant: the batch proceeds past individual
//! images that never materialize.

pub mod client;
pub mod download;

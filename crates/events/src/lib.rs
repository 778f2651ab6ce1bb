//! Asynchronous completion tracking for remote jobs.
//!
//! Remote services accept a unit of work and answer with an opaque
//! correlation id; finishing is signalled either by polling or by a
//! push-based completion feed. This crate owns the fan-in side:
//!
//! - [`tracker::CorrelationTracker`] — the registry mapping correlation
//!   ids to completion state, supporting multiple concurrent waiters;
//! - [`feed::FeedListener`] — a long-lived WebSocket subscription that
//!   forwards completion events into the tracker;
//! - [`bus::EventBus`] — broadcast channel for pipeline observers.

pub mod bus;
pub mod feed;
pub mod reconnect;
pub mod tracker;

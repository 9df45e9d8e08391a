//! Tabula Sync - keeping tables, views and charts consistent
//!
//! This crate sits between whatever drives the tables (a UI event loop, the
//! CLI, tests) and the pure operations in `tabula-table`.
//!
//! # Architecture
//!
//! ```text
//! intents (TableEvent)
//!     ↓
//! TableStore  ── reduces events, recomputes client-side views, links tables
//!     ↓ Effect::Fetch / Effect::FindIndex
//! TableService ── tokio task running effects through a FetchCollaborator
//!     ↓ FetchComplete / FetchError
//! TableStore  ── applies results that are still current, drops stale ones
//! ```
//!
//! # Pieces
//!
//! - [`TableRegistry`] - tables by id, injected wherever cross-table lookups happen
//! - [`TableStore`] - the reducer over the closed [`TableEvent`] set
//! - [`LatestRequests`] - staleness guard for out-of-order fetch completion, one
//!   [`FetchTicket`] per issued fetch
//! - [`FetchCollaborator`] - the async boundary to whatever serves table pages
//! - [`propagate_selection`] / [`highlight_target`] - identity-column sync between tables
//! - [`needs_fetch`] - chart fetch-vs-reuse decision, applied by the store on
//!   `TableEvent::PlotParams`
//! - [`TableService`] - the async actor owning a store

mod chart_sync;
mod error;
mod events;
mod fetch;
mod propagate;
mod registry;
mod service;
mod staleness;
mod store;

pub use chart_sync::*;
pub use error::{SyncError, SyncResult};
pub use events::*;
pub use fetch::*;
pub use propagate::*;
pub use registry::TableRegistry;
pub use service::{TableChange, TableService};
pub use staleness::{FetchTicket, LatestRequests};
pub use store::{Reduction, TableStore};

//! Scholarship portal client engine.
//!
//! Matches a student against the scholarship catalogue, narrows it with the
//! portal's filter selectors, and keeps per-scholarship bookmarks in sync
//! with the backend using optimistic updates.

pub mod api;
pub mod client;
pub mod coerce;
pub mod config;
pub mod drafts;
pub mod eligibility;
pub mod errors;
pub mod filters;
pub mod models;
pub mod session;
pub mod sort;
pub mod store;

pub use errors::{PortalError, Result};

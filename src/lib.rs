//! Document upload service with time-limited retention.
//!
//! [`store::DocumentStore`] owns payloads and metadata and enforces the
//! seven-day expiry of eulogy documents; [`api`] exposes it over HTTP behind
//! [`auth::AdminAuth`].

pub mod api;
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod store;

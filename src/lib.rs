//! Masjid SaaS: multi-tenant mosque administration backend in Rust
//!
//! Every onboarded mosque (tenant) gets its own slug and data partition for
//! finance, ZIS, inventory, events, forum, prayer times and notifications.
//! Storage is Sled with per-collection index trees; the API is Axum on port 11111.

pub mod auth;
pub mod config;
pub mod error;
// Tracing subscriber (stdout + optional rolling file)
pub mod logging;
pub mod models;
// Finance / ZIS aggregation for dashboards and the public portal
pub mod reports;
// REST API module: Axum HTTP handlers on port 11111
pub mod rest;
pub mod storage;
pub mod tenancy;

//! rss-relay: fetches RSS/Atom feeds, normalizes them, and serves them over an
//! RPC-style HTTP API.
//!
//! - [`feed`] - parser collaborator, normalizer and fan-out aggregator
//! - [`service`] - the `GetFeed` / `GetFeeds` / `ValidateFeed` handlers
//! - [`api`] - `axum` transport for the handlers
//! - [`context`] - cancellable request deadlines
//! - [`config`] - TOML configuration

pub mod api;
pub mod config;
pub mod context;
pub mod feed;
pub mod service;

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

//! Chapter portal library: competition submissions, document uploads, and the
//! admin area (reviews, roles, signup whitelist, editable page copy) behind them.

pub mod auth;
pub mod authz;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

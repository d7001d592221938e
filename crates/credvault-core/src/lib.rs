//! Core library for `CredVault`.
//!
//! Contains the field cipher, domain models, input validation, user
//! accounts and sessions, the per-user credential and note stores, search,
//! dashboard statistics, the activity log and CSV export. This crate depends
//! on `credvault-storage` for the storage backend trait and knows nothing
//! about HTTP.

pub mod activity;
pub mod cipher;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod models;
pub mod pagination;
pub mod search;
pub mod sessions;
pub mod users;
pub mod validate;
pub mod vault;

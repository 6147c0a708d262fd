//! Backend Contract Tests
//!
//! Every storage backend is driven through the same `StorageBackend`
//! operations. Network media run against their in-memory clients.
//!
//! - contract: read/write/append/stat/list/delete on every backend
//! - keyed: behavior specific to flat key stores

#[path = "../common/mod.rs"]
mod common;

mod contract;
mod keyed;

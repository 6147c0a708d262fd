//! Store Integration Tests
//!
//! Conversations and runs through `TallyStore` on every backend.
//!
//! - conversations: create, save/load, append, list, delete
//! - runs: run kinds, listing and reopening
//! - config: opening a store from `tally.toml` and the environment

#[path = "../common/mod.rs"]
mod common;

mod config;
mod conversations;
mod runs;

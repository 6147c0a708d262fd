//! Storage layer for Tally
//!
//! This crate implements the storage contract every medium must satisfy and
//! the three media Tally ships with:
//!
//! - [`LocalBackend`]: plain files and directories via `tokio::fs`
//! - [`LogStoreBackend`]: one append-only named log per file (S2-style)
//! - [`StreamBackend`]: one keyed stream per file (Redis streams)
//!
//! Network media sit behind client seams ([`LogClient`], [`StreamClient`]) so
//! the backend logic is shared between the real clients (cargo features
//! `s2` and `redis`) and the in-memory clients used in tests.
//!
//! | Operation | Local | Log store | Stream |
//! |-----------|-------|-----------|--------|
//! | `write`   | overwrite file | delete + create + append | delete + add |
//! | `append`  | read + concat + write | append record | add entry |
//! | `read`    | file contents | records joined by `\n` | entries joined by `\n` |
//! | `list`    | `read_dir` | synthesized from stream names | synthesized from keys |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod keyspace;
pub mod local;
pub mod log_store;
pub mod registry;
pub mod stream;

pub use backend::{BackendKind, Entry, Stat, StorageBackend};
pub use error::{Result, StorageError};
pub use local::LocalBackend;
pub use log_store::{LogClient, LogRecord, LogStoreBackend, MemoryLogClient};
pub use registry::{connect, BackendConfig};
pub use stream::{MemoryStreamClient, StreamBackend, StreamClient};

#[cfg(feature = "s2")]
pub use log_store::S2HttpClient;
#[cfg(feature = "redis")]
pub use stream::RedisStreamClient;

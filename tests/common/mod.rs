//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use std::sync::{Arc, Once};
use tally_core::Persona;
use tally::prelude::*;
use tally_storage::{LocalBackend, LogStoreBackend, StreamBackend};
use tempfile::TempDir;

static TRACING: Once = Once::new();

/// Route library logs to the test harness output.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// A backend plus whatever keeps it alive for the test
pub struct TestBackend {
    pub name: &'static str,
    pub backend: Arc<dyn StorageBackend>,
    pub base: String,
    _dir: Option<TempDir>,
}

impl TestBackend {
    pub fn local() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let base = dir.path().join("store").to_string_lossy().into_owned();
        TestBackend {
            name: "local",
            backend: Arc::new(LocalBackend::new()),
            base,
            _dir: Some(dir),
        }
    }

    pub fn log_store() -> Self {
        TestBackend {
            name: "log_store",
            backend: Arc::new(LogStoreBackend::in_memory()),
            base: "evals".to_string(),
            _dir: None,
        }
    }

    pub fn stream() -> Self {
        TestBackend {
            name: "stream",
            backend: Arc::new(StreamBackend::in_memory()),
            base: "evals".to_string(),
            _dir: None,
        }
    }

    /// One fixture per backend implementation
    pub fn all() -> Vec<TestBackend> {
        vec![Self::local(), Self::log_store(), Self::stream()]
    }

    pub fn path(&self, segments: &[&str]) -> String {
        let mut all: Vec<&str> = vec![self.base.as_str()];
        all.extend_from_slice(segments);
        self.backend.join(&all)
    }

    pub fn store(&self) -> TallyStore {
        TallyStore::new(Arc::clone(&self.backend), self.base.clone())
    }
}

pub fn at(hour: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
}

pub fn sample_conversation(id: &str) -> Conversation {
    let mut conversation = Conversation::new(id);
    conversation.push_step(
        Message::user("I need a table for two tonight"),
        vec![Message::assistant("What time works for you?")],
    );
    conversation.push_step(
        Message::user("Around 8pm"),
        vec![Message::assistant("Booked for 8pm.")],
    );
    conversation
}

pub fn sample_trajectory_meta() -> TrajectoryMeta {
    TrajectoryMeta::new(
        "Book a table for two",
        Persona {
            name: Some("Sam".into()),
            description: "Busy parent, terse replies".into(),
            guardrails: vec![],
        },
        at(9),
    )
}

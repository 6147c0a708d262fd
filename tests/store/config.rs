//! Opening a store from configuration.

use std::collections::HashMap;
use std::fs;
use tally::prelude::*;
use tally::{BackendKind, Error};
use tempfile::TempDir;

fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[tokio::test]
async fn store_opens_under_discovered_config() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("tally.toml"),
        "[storage]\nbackend = \"local\"\npath = \"data\"\n",
    )
    .unwrap();
    let nested = dir.path().join("a").join("b");
    fs::create_dir_all(&nested).unwrap();

    let config = TallyConfig::load_with(&nested, env(&[])).unwrap();
    assert_eq!(config.storage.path, "data");

    let store = TallyStore::open(&config).await.unwrap();
    assert_eq!(store.backend().kind(), BackendKind::Local);

    store.create_conversation("c1").await.unwrap();
    assert!(nested
        .join("data")
        .join("conversations")
        .join("c1")
        .join("meta.json")
        .is_file());
}

#[tokio::test]
async fn environment_overrides_file() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("tally.toml"), "[storage]\npath = \"data\"\n").unwrap();

    let config = TallyConfig::load_with(dir.path(), env(&[("TALLY_STORAGE_PATH", "other")]))
        .unwrap();
    assert_eq!(config.storage.path, "other");
}

#[tokio::test]
async fn redis_without_url_fails_to_open() {
    let config = TallyConfig::from_lookup(env(&[("TALLY_STORAGE_BACKEND", "redis")])).unwrap();
    let err = TallyStore::open(&config).await.unwrap_err();
    assert!(matches!(err, Error::Config(_)), "{}", err);
    assert!(err.to_string().contains("TALLY_REDIS_URL"));
}

#![allow(dead_code)]

use std::time::Duration;

use hpecli::config::HttpConfig;
use hpecli::rest::RestClient;
use hpecli::store::Store;
use secrecy::SecretString;
use tempfile::TempDir;

/// A store in its own temp directory; keep the `TempDir` alive for the test.
pub fn temp_store() -> (TempDir, Store) {
    let dir = TempDir::new().expect("create temp dir");
    let store = Store::new(dir.path().join("store.json"));
    (dir, store)
}

pub fn rest_client() -> RestClient {
    RestClient::new(&HttpConfig {
        timeout: Duration::from_secs(5),
        insecure: false,
    })
    .expect("build rest client")
}

pub fn secret(value: &str) -> SecretString {
    SecretString::new(value.to_string().into())
}

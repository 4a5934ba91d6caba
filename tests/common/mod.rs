//! Shared fixtures for integration tests.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use wardrobe_api::config::load_from_map;
use wardrobe_api::{HttpServer, Shutdown};

pub const JWT_SECRET_32: &str = "0123456789abcdef0123456789abcdef";

/// A complete, valid environment with only required keys set.
pub fn valid_env() -> BTreeMap<String, String> {
    [
        ("DATABASE_URL", "./data.sqlite"),
        ("REDIS_URL", "redis://localhost:6379"),
        ("S3_ENDPOINT", "http://localhost:9000"),
        ("S3_BUCKET", "wardrobe-items"),
        ("S3_ACCESS_KEY", "minio"),
        ("S3_SECRET_KEY", "minio-secret-key"),
        ("OPENAI_API_KEY", "sk-test-openai"),
        ("JWT_SECRET", JWT_SECRET_32),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// `valid_env()` with `key` overridden.
#[allow(dead_code)]
pub fn env_with(key: &str, value: &str) -> BTreeMap<String, String> {
    let mut env = valid_env();
    env.insert(key.to_string(), value.to_string());
    env
}

/// Start a server from `env` on `addr`. Returns its shutdown handle and task.
#[allow(dead_code)]
pub async fn start_server(
    env: BTreeMap<String, String>,
    addr: SocketAddr,
) -> (Shutdown, JoinHandle<std::io::Result<()>>) {
    let config = Arc::new(load_from_map(&env).expect("fixture env must validate"));
    let listener = TcpListener::bind(addr).await.unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let handle = tokio::spawn(async move { HttpServer::new(config).run(listener, rx).await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    (shutdown, handle)
}

//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use treeserve::config::ServerConfig;
use treeserve::net::Governor;
use treeserve::{HttpServer, Shutdown};

/// A handler tree on disk plus a running server serving it.
pub struct TestServer {
    pub dir: TempDir,
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    /// The running server's admission governor.
    pub governor: Governor,
    config_tx: mpsc::UnboundedSender<ServerConfig>,
    shutdown: Shutdown,
}

impl TestServer {
    /// Start a server over `files` with default settings.
    pub async fn start(files: &[(&str, &str)]) -> Self {
        Self::start_with(files, |_| {}).await
    }

    /// Start a server over `files` after adjusting the config.
    pub async fn start_with(files: &[(&str, &str)], configure: impl FnOnce(&mut ServerConfig)) -> Self {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            write_file(dir.path(), name, content);
        }

        let mut config = ServerConfig::default();
        config.handlers.root = dir.path().to_path_buf();
        config.listener.bind_address = "127.0.0.1:0".to_string();
        configure(&mut config);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let shutdown = Shutdown::new();
        let (config_tx, config_updates) = mpsc::unbounded_channel();
        let server = HttpServer::new(config);
        let governor = server.state().governor.clone();
        let server_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            let _ = server.run(listener, config_updates, server_shutdown).await;
        });

        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .no_proxy()
            .build()
            .unwrap();

        Self {
            dir,
            addr,
            client,
            governor,
            config_tx,
            shutdown,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().to_path_buf()
    }

    pub fn write(&self, name: &str, content: &str) {
        write_file(self.dir.path(), name, content);
    }

    /// Push a config update, as the file watcher would.
    pub fn update_config(&self, config: ServerConfig) {
        self.config_tx.send(config).unwrap();
    }

    pub async fn post_json(&self, path: &str, body: serde_json::Value) -> reqwest::Response {
        self.client.post(self.url(path)).json(&body).send().await.unwrap()
    }

    pub async fn post_text(&self, path: &str, body: &str) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("content-type", "text/plain")
            .body(body.to_string())
            .send()
            .await
            .unwrap()
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub fn stop(&self) {
        self.shutdown.trigger();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn write_file(root: &Path, name: &str, content: &str) {
    let path = root.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

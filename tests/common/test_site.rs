//! TestSite builder: a throwaway store root plus controller

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use wallmount::http::{router, AppState};
use wallmount::page::PageOptions;
use wallmount::{PushController, VersionId, VersionStore};

/// Parse a known-good id
pub fn id(raw: &str) -> VersionId {
    VersionId::parse(raw).expect("valid test id")
}

/// Temporary store root
pub struct TestSite {
    dir: TempDir,
}

impl TestSite {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn inbox(&self) -> PathBuf {
        self.dir.path().join("inbox")
    }

    /// Place content for `raw` into the inbox, the way a publisher's transfer would
    pub fn stage(&self, raw: &str) -> &Self {
        self.stage_file(raw, "index.html", &format!("<h1>{}</h1>", raw))
    }

    pub fn stage_file(&self, raw: &str, relative: &str, content: &str) -> &Self {
        let path = self.inbox().join(raw).join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create staging dirs");
        }
        fs::write(&path, content).expect("Failed to write staged file");
        self
    }

    pub fn is_staged(&self, raw: &str) -> bool {
        self.inbox().join(raw).is_dir()
    }

    pub fn store(&self) -> VersionStore {
        VersionStore::open(self.path()).expect("Failed to open store")
    }

    pub fn controller(&self) -> Arc<PushController> {
        Arc::new(PushController::new(self.store()).expect("Failed to own store"))
    }

    pub fn controller_with_timeout(&self, timeout: Duration) -> Arc<PushController> {
        Arc::new(
            PushController::new(self.store())
                .expect("Failed to own store")
                .with_reservation_timeout(Some(timeout)),
        )
    }
}

/// HTTP server bound to an ephemeral localhost port
pub struct TestServer {
    pub addr: SocketAddr,
    pub controller: Arc<PushController>,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(controller: Arc<PushController>) -> Self {
        let state = Arc::new(AppState::new(
            Arc::clone(&controller),
            PageOptions {
                title: "test wall".to_string(),
                poll_interval_ms: 1000,
            },
        ));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local addr");
        let handle = tokio::spawn(async move {
            axum::serve(listener, router(state))
                .await
                .expect("Server failed");
        });
        Self {
            addr,
            controller,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn client() -> reqwest::Client {
        reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to build client")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

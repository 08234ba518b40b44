//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own archive and user databases.

use super::constants::*;
use super::fixtures::create_test_db_dir;
use ganjoor_server::archive_store::{ArchiveStore, SqliteArchiveStore};
use ganjoor_server::config::PaginationSettings;
use ganjoor_server::search::{ArchiveSearchVault, SearchVault};
use ganjoor_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use ganjoor_server::user::{SqliteUserStore, UserManager};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with isolated databases
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Archive store shared with the server, for direct checks in tests
    pub archive_store: Arc<dyn ArchiveStore>,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port
    ///
    /// # Panics
    ///
    /// Panics if fixture creation, port binding or server startup fails.
    pub async fn spawn() -> Self {
        let temp_db_dir = create_test_db_dir().expect("Failed to create test databases");

        let archive_store: Arc<dyn ArchiveStore> = Arc::new(
            SqliteArchiveStore::new(temp_db_dir.path().join("archive.db"), 2)
                .expect("Failed to open archive store"),
        );
        let user_store = SqliteUserStore::new(temp_db_dir.path().join("user.db"))
            .expect("Failed to open user store");
        let user_manager = Arc::new(UserManager::new(
            archive_store.clone(),
            Box::new(user_store),
        ));
        let search_vault: Arc<dyn SearchVault> =
            Arc::new(ArchiveSearchVault::new(archive_store.clone(), 100));

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");

        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            metrics_port: 0,
            requests_logging_level: RequestsLoggingLevel::None,
            content_cache_age_sec: 60,
            frontend_dir_path: None,
            pagination: PaginationSettings {
                default_page_size: TEST_PAGE_SIZE,
                max_page_size: TEST_MAX_PAGE_SIZE,
            },
        };

        let app = make_app(config, archive_store.clone(), search_vault, user_manager)
            .expect("Failed to build app");

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            archive_store,
            _temp_db_dir: temp_db_dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling the home endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

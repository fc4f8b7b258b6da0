//! Mock record server for HTTP tests
//!
//! Serves fixed bodies under `/presentation/<record_id>/<path>` on an
//! ephemeral localhost port. Unknown paths answer 404. GET routes also
//! answer HEAD, which is what media probes use.

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub struct MockRecordServer {
    base_url: String,
    handle: JoinHandle<()>,
}

impl MockRecordServer {
    /// Start serving `files` (relative path, body) for `record_id`
    pub async fn start(record_id: &str, files: &[(&str, String)]) -> Self {
        let mut router = Router::new();
        for (path, body) in files {
            let body = body.clone();
            router = router.route(
                &format!("/presentation/{}/{}", record_id, path),
                get(move || {
                    let body = body.clone();
                    async move { body }
                }),
            );
        }

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let addr = listener.local_addr().expect("Mock server address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("Mock server failed");
        });

        Self {
            base_url: format!("http://{}/presentation", addr),
            handle,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Drop for MockRecordServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// Axum server: upload endpoint plus the static file responder for stored artifacts.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        DefaultBodyLimit, State,
    },
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tracing::{debug, info};

use super::files::{file_handler, head_handler};
use crate::engine::ingest::{Ingestor, Installation};
use crate::error::IngestError;

/// Multipart field carrying the archive.
pub const UPLOAD_FIELD: &str = "ipa";

pub type SharedIngestor = Arc<Ingestor>;

pub struct InstallServer {
    addr: SocketAddr,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

/// Routes of the service, ready to be served or tested.
pub fn router(ingestor: SharedIngestor, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/upload", post(upload_handler))
        .route("/files/{filename}", get(file_handler).head(head_handler))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(ingestor)
}

impl InstallServer {
    /// Bind `addr` and serve in the background, returning a handle.
    pub async fn start(
        addr: SocketAddr,
        ingestor: SharedIngestor,
        max_upload_bytes: usize,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let app = router(ingestor, max_upload_bytes);

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });
        info!("install server listening on {}", addr);

        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Build a URL on this server for `path` (leading `/` included).
    pub fn url_for(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Shutdown the server gracefully.
    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// POST /upload: multipart form with the archive under [`UPLOAD_FIELD`].
async fn upload_handler(
    State(ingestor): State<SharedIngestor>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Installation>, IngestError> {
    // A body that is not multipart at all carries no file either.
    let mut multipart = multipart.map_err(|e| {
        debug!("upload rejected: {}", e);
        IngestError::NoFile
    })?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        return ingestor
            .ingest(file_name.as_deref(), field)
            .await
            .map(Json);
    }
    Err(IngestError::NoFile)
}

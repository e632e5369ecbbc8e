/// Seconds an uploaded artifact pair stays downloadable before it is purged.
pub const EXPIRY_DELAY_SECS: u64 = 300;

/// Maximum accepted upload body size (300 MB).
pub const MAX_UPLOAD_BYTES: usize = 300 * 1024 * 1024;

/// Largest `Info.plist` the archive reader will inflate (4 MiB).
pub const MAX_DESCRIPTOR_BYTES: u64 = 4 * 1024 * 1024;

/// Port used when none is configured.
pub const DEFAULT_PORT: u16 = 5000;

/// Flat directory holding archive/manifest pairs.
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";

/// Externally reachable origin used when none is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Top-level configuration for the installer service.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Origin prepended to every link handed back to clients.
    pub base_url: String,
    /// TCP port to listen on.
    pub port: u16,
    /// Directory used as the artifact store.
    pub upload_dir: String,
    /// Lifetime of an artifact pair in seconds.
    pub expiry_secs: u64,
    /// Request body cap for uploads.
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Base URL without a trailing slash, ready for `{base}/files/{name}`.
    pub fn normalized_base_url(&self) -> String {
        self.base_url.trim_end_matches('/').to_string()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            port: DEFAULT_PORT,
            upload_dir: DEFAULT_UPLOAD_DIR.to_string(),
            expiry_secs: EXPIRY_DELAY_SECS,
            max_upload_bytes: MAX_UPLOAD_BYTES,
        }
    }
}

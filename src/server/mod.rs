// HTTP surface: upload intake and artifact download routes.

pub mod files;
pub mod handler;

pub use handler::{router, InstallServer, SharedIngestor, UPLOAD_FIELD};

// Engine orchestration: upload lifecycle and artifact expiry.

pub mod expiry;
pub mod ingest;

pub use expiry::{reclaim_leftovers, ExpiryScheduler};
pub use ingest::{Ingestor, Installation};

// Over-the-air installer service for iOS application archives.

pub mod archive;
pub mod config;
pub mod engine;
pub mod error;
pub mod manifest;
pub mod server;
pub mod store;

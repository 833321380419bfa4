//! # polliwog-core
//!
//! Core library for polliwog - a daycare event feed mirror.
//!
//! This library provides:
//! - A cookie-session HTTP client for the remote event feed
//! - Backward pagination with cycle-guard termination
//! - Content-addressed, idempotent attachment download
//! - Magic-byte media sniffing and extension correction
//! - Embedded metadata (Exif / PNG text) and filesystem timestamp stamping
//!
//! ## Example
//!
//! ```rust,no_run
//! use polliwog_core::{Config, FeedClient, IngestCoordinator};
//!
//! # async fn run() -> polliwog_core::Result<()> {
//! let config = Config::load()?;
//! config.validate()?;
//!
//! let client = FeedClient::new(&config.feed)?;
//! client.login("parent@example.com", "secret").await?;
//! client.admit().await?;
//!
//! let coordinator = IngestCoordinator::new(client, &config.archive);
//! let summary = coordinator.run().await?;
//! println!("downloaded {} attachments", summary.attachments_downloaded);
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use client::{EventFeed, FeedClient};
pub use config::Config;
pub use error::{Error, Result};
pub use ingest::{IngestCoordinator, RunSummary};
pub use types::*;

// Public modules
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod ingest;
pub mod logging;
pub mod paginate;
pub mod retry;
pub mod sniff;
pub mod stamp;
pub mod template;
pub mod types;

//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop hosts
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`, with multipart uploads and retry
//! - `VaultAccess` over a directory tree using `tokio::fs`
//! - `SettingsStore` as a single JSON document on disk
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{JsonSettingsStore, ReqwestHttpClient, TokioVault};
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let vault = TokioVault::new("/home/me/notes");
//!     let settings = JsonSettingsStore::new(JsonSettingsStore::default_path());
//!
//!     // Use in core configuration
//!     Ok(())
//! }
//! ```

mod http;
mod settings;
mod vault;

pub use http::ReqwestHttpClient;
pub use settings::JsonSettingsStore;
pub use vault::TokioVault;

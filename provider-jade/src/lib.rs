//! # Jade Provider
//!
//! Implements `RemoteStore` over the Jade sync HTTP API.
//!
//! ## Overview
//!
//! All calls go to `<endpoint>/api/sync` and carry the access token in the
//! `x-access-token` header:
//! - `GET /check-health`: liveness and credential probe
//! - `GET /check-file-exists?md5=`: content dedup lookup
//! - `POST /` (multipart): per-path sync, with the file body when needed
//! - `GET /flush`: clear staging state before a full sync
//! - `POST /rebuild`: commit the manifest

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{JadeConnector, JadeRemoteFactory, ACCESS_TOKEN_HEADER};
pub use error::{JadeError, Result};

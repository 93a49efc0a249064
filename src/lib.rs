//! Client for Replit Database, a key-value store reached over HTTP.
//!
//! Inside a repl the free functions ([`get`], [`set`], [`delete`],
//! [`list_keys`], [`get_json`], [`set_json`]) work without setup: they share
//! one lazily built [`Client`] whose URL comes from `/tmp/replitdb` or the
//! `REPLIT_DB_URL` environment variable. Build a [`Client`] or a
//! [`SharedClient`] directly to control where the URL comes from.
//!
//! ```no_run
//! # async fn demo() -> replitdb::Result<()> {
//! replitdb::set("key", "value").await?;
//! assert_eq!(replitdb::get("key").await?, "value");
//! replitdb::delete("key").await?;
//! assert!(replitdb::get("key").await.unwrap_err().is_not_found());
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod fs_util;
mod shared;

pub use client::{Client, HTTP_TIMEOUT, ValueReader};
pub use config::{ConnectionSource, DEFAULT_URL_ENV, DEFAULT_URL_FILE};
pub use error::{Error, Result};
pub use shared::{
    SHARED_CLIENT_REFRESH_INTERVAL, SharedClient, delete, get, get_json, list_keys, set,
    set_json, shared,
};

use std::env::{self, VarError};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::client::{Client, parse_base_url};
use crate::error::{Error, Result};
use crate::fs_util;

/// File that, when present, holds the connection URL.
pub const DEFAULT_URL_FILE: &str = "/tmp/replitdb";
/// Environment variable holding the connection URL.
pub const DEFAULT_URL_ENV: &str = "REPLIT_DB_URL";

/// Where a connection URL is discovered.
///
/// The cached file wins over the environment variable whenever it exists,
/// since hosts rewrite it when the embedded token rotates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSource {
    url_file: PathBuf,
    env_var: String,
}

impl Default for ConnectionSource {
    fn default() -> Self {
        Self::new(DEFAULT_URL_FILE, DEFAULT_URL_ENV)
    }
}

impl ConnectionSource {
    pub fn new(url_file: impl Into<PathBuf>, env_var: impl Into<String>) -> Self {
        Self {
            url_file: url_file.into(),
            env_var: env_var.into(),
        }
    }

    pub fn url_file(&self) -> &Path {
        &self.url_file
    }

    pub fn env_var(&self) -> &str {
        &self.env_var
    }

    /// Returns the raw connection URL without validating it.
    pub fn resolve_url(&self) -> Result<String> {
        self.resolve_url_with(|name| env::var(name))
    }

    /// Like [`resolve_url`](Self::resolve_url), reading variables through
    /// `lookup` instead of the process environment.
    pub fn resolve_url_with<F>(&self, lookup: F) -> Result<String>
    where
        F: FnOnce(&str) -> std::result::Result<String, VarError>,
    {
        if self.url_file.exists() {
            debug!(path = %self.url_file.display(), "reading database url from file");
            return Ok(fs::read_to_string(&self.url_file)?);
        }

        match lookup(&self.env_var) {
            Ok(url) => {
                debug!(var = %self.env_var, "reading database url from environment");
                Ok(url)
            }
            Err(VarError::NotPresent) => Err(Error::MissingUrl {
                var: self.env_var.clone(),
            }),
            Err(VarError::NotUnicode(_)) => Err(Error::invalid_url(
                "",
                format!("{} is not valid unicode", self.env_var),
            )),
        }
    }

    /// Builds a client from the discovered URL.
    pub fn connect(&self) -> Result<Client> {
        Client::new(&self.resolve_url()?)
    }

    /// Validates `url` and stores it in the cached URL file.
    pub fn write_cached_url(&self, url: &str) -> Result<()> {
        parse_base_url(url)?;
        fs_util::atomic_write(&self.url_file, url.trim())?;
        debug!(path = %self.url_file.display(), "cached database url");
        Ok(())
    }
}

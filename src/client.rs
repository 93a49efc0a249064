use std::borrow::Cow;
use std::time::Duration;

use bytes::Bytes;
use percent_encoding::percent_decode_str;
use reqwest::{Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ConnectionSource;
use crate::error::{Error, Result};

/// Per-request timeout applied to every call.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for a single Replit Database endpoint.
///
/// Every method performs exactly one HTTP request against the base URL and
/// never retries. Cloning is cheap and clones share one connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    http: reqwest::Client,
    timeout: Duration,
}

impl Client {
    /// Creates a client for the given connection URL.
    pub fn new(url: &str) -> Result<Self> {
        Self::with_timeout(url, HTTP_TIMEOUT)
    }

    /// Creates a client whose requests give up after `timeout`.
    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self> {
        let base_url = parse_base_url(url)?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        debug!(
            host = base_url.host_str().unwrap_or_default(),
            ?timeout,
            "created database client"
        );
        Ok(Self {
            base_url,
            http,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Creates a client from the cached URL file or `REPLIT_DB_URL`.
    pub fn from_env() -> Result<Self> {
        ConnectionSource::default().connect()
    }

    /// Returns the value for `key`, or [`Error::NotFound`]. A value that is
    /// not UTF-8 is [`Error::Utf8`]; use [`Client::get_bytes`] for raw data.
    pub async fn get(&self, key: &str) -> Result<String> {
        self.get_reader(key).await?.text().await
    }

    /// Returns the raw bytes stored under `key`, or [`Error::NotFound`].
    pub async fn get_bytes(&self, key: &str) -> Result<Bytes> {
        self.get_reader(key).await?.bytes().await
    }

    /// Returns a streaming reader over the value for `key`, or
    /// [`Error::NotFound`]. The connection is held until the reader is dropped.
    pub async fn get_reader(&self, key: &str) -> Result<ValueReader> {
        let resp = self.http.get(self.key_url(key)?).send().await?;
        let status = resp.status();
        debug!(method = "GET", key, %status, "database request");

        if status.as_u16() <= 299 {
            return Ok(ValueReader { response: resp });
        }
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound);
        }
        Err(request_failed(resp).await)
    }

    /// Decodes the JSON value stored under `key`.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.get_reader(key).await?.json().await
    }

    /// Creates or updates `key` with `value`.
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        let resp = self
            .http
            .post(self.key_url(key)?)
            .form(&[(key, value)])
            .send()
            .await?;
        let status = resp.status();
        debug!(method = "POST", key, %status, "database request");

        // Only a plain 200 counts; 201 and other 2xx are failures.
        if status.as_u16() > 200 {
            return Err(request_failed(resp).await);
        }
        Ok(())
    }

    /// Stores the JSON serialization of `value` under `key`.
    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value).map_err(Error::Encode)?;
        self.set(key, &json).await
    }

    /// Removes `key`. Deleting a missing key succeeds.
    pub async fn delete(&self, key: &str) -> Result<()> {
        let resp = self.http.delete(self.key_url(key)?).send().await?;
        let status = resp.status();
        debug!(method = "DELETE", key, %status, "database request");

        if status.as_u16() <= 299 {
            return Ok(());
        }
        Err(request_failed(resp).await)
    }

    /// Lists every key starting with `prefix`, in the order the backend
    /// returns them (lexicographic).
    pub async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let resp = self.http.get(self.list_url(prefix)).send().await?;
        let status = resp.status();
        debug!(method = "GET", prefix, %status, "database list request");

        if status.as_u16() > 299 {
            return Err(request_failed(resp).await);
        }
        let body = resp.text().await?;
        decode_listing(&body)
    }

    fn key_url(&self, key: &str) -> Result<Url> {
        // These would collapse into the base URL, which is the listing
        // endpoint. URL parsing treats `%2e` as `.` too, so escaping can't
        // preserve them.
        if matches!(key, "" | "." | "..") {
            return Err(Error::InvalidKey {
                key: key.to_string(),
            });
        }
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        // parse_base_url rejects cannot-be-a-base URLs, so this always succeeds.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(key);
        }
        Ok(url)
    }

    fn list_url(&self, prefix: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_fragment(None);
        url.query_pairs_mut()
            .clear()
            .append_pair("prefix", prefix)
            .append_pair("encode", "true");
        url
    }
}

/// Caller-owned body of a `get_reader` response.
///
/// Dropping the reader releases the connection, whether or not the body was
/// consumed.
#[derive(Debug)]
pub struct ValueReader {
    response: Response,
}

impl ValueReader {
    /// Length of the value if the backend announced it.
    pub fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    /// Reads the next chunk of the value. `None` marks the end.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>> {
        Ok(self.response.chunk().await?)
    }

    pub async fn bytes(self) -> Result<Bytes> {
        Ok(self.response.bytes().await?)
    }

    /// Reads the whole value, rejecting bytes that are not UTF-8.
    pub async fn text(self) -> Result<String> {
        let body = self.bytes().await?;
        Ok(String::from_utf8(body.to_vec())?)
    }

    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let body = self.bytes().await?;
        serde_json::from_slice(&body).map_err(Error::Decode)
    }
}

pub(crate) fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| Error::invalid_url(raw, e))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::invalid_url(
            raw,
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    if url.cannot_be_a_base() {
        return Err(Error::invalid_url(raw, "url cannot be a base"));
    }
    Ok(url)
}

async fn request_failed(resp: Response) -> Error {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    warn!(%status, "database request failed");
    Error::RequestFailed { status, body }
}

fn decode_listing(body: &str) -> Result<Vec<String>> {
    body.lines().map(decode_key).collect()
}

fn decode_key(line: &str) -> Result<String> {
    if has_malformed_escape(line) {
        return Err(Error::KeyEncoding {
            line: line.to_string(),
        });
    }
    let unplussed = line.replace('+', " ");
    percent_decode_str(&unplussed)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|_| Error::KeyEncoding {
            line: line.to_string(),
        })
}

/// True when a `%` is not followed by two hex digits.
fn has_malformed_escape(line: &str) -> bool {
    let bytes = line.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        b == b'%'
            && !(bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit))
    })
}

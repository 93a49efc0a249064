use reqwest::StatusCode;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the database client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested key does not exist.
    #[error("not found")]
    NotFound,
    /// No connection URL file exists and the environment variable is unset.
    #[error("{var} not set in environment")]
    MissingUrl { var: String },
    /// The connection URL could not be used as a base URL. The URL embeds
    /// the access token, so it is kept out of the message.
    #[error("invalid database url: {reason}")]
    InvalidUrl { url: String, reason: String },
    /// Reading or writing the cached connection URL file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Network failure or request timeout.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    /// The backend answered with a status the operation does not accept.
    #[error("request failed ({status}): {body}")]
    RequestFailed { status: StatusCode, body: String },
    /// The key cannot be addressed as a path segment.
    #[error("invalid key {key:?}")]
    InvalidKey { key: String },
    /// A stored value was read as text but is not UTF-8.
    #[error("value is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    /// A stored value was not valid JSON for the requested type.
    #[error("failed to decode value: {0}")]
    Decode(#[source] serde_json::Error),
    /// A value could not be serialized to JSON.
    #[error("failed to encode value: {0}")]
    Encode(#[source] serde_json::Error),
    /// A listed key had a malformed escape or did not decode to UTF-8.
    #[error("failed to decode listed key '{line}'")]
    KeyEncoding { line: String },
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound)
    }

    pub(crate) fn invalid_url(url: &str, reason: impl ToString) -> Self {
        Error::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Request URLs carry the database token.
        Error::Transport(err.without_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_failed_message_carries_status_and_body() {
        let err = Error::RequestFailed {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "request failed (500 Internal Server Error): boom");
    }

    #[test]
    fn missing_url_names_the_variable() {
        let err = Error::MissingUrl {
            var: "REPLIT_DB_URL".to_string(),
        };
        assert_eq!(err.to_string(), "REPLIT_DB_URL not set in environment");
        assert!(!err.is_not_found());
        assert!(Error::NotFound.is_not_found());
    }
}

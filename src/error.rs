//! Error types for configuration loading, API access and migrations.

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Problems with the credentials file. Always fatal, raised before any
/// request is sent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("invalid {field} `{url}`: {message}")]
    InvalidUrl {
        field: &'static str,
        url: String,
        message: String,
    },

    #[error("failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to unmarshal yaml: {0}")]
    Parse(#[source] serde_yaml::Error),

    #[error("failed to marshal config to yaml: {0}")]
    Serialize(#[source] serde_yaml::Error),

    #[error("failed to write config file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to find home directory")]
    NoHomeDir,
}

/// Errors produced while talking to a GitLab instance.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("could not serialize request body for {url}: {source}")]
    Encode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not build http client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid url `{url}`: {message}")]
    InvalidUrl { url: String, message: String },
}

impl ApiError {
    pub fn transport(url: &str, source: reqwest::Error) -> Self {
        Self::Transport {
            url: url.to_string(),
            source,
        }
    }

    pub fn decode(url: &str, message: impl Into<String>) -> Self {
        Self::Decode {
            url: url.to_string(),
            message: message.into(),
        }
    }

    /// Short description used in retry and per-record log lines.
    pub fn short_message(&self) -> String {
        match self {
            Self::Status { status, .. } => format!("status {}", status),
            Self::Transport { source, .. } => source.to_string(),
            Self::Decode { message, .. } => format!("decode error: {}", message),
            other => other.to_string(),
        }
    }
}

/// Errors that abort a migration or mirror invocation.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("invalid selection: {0}")]
    Selection(String),

    #[error("{entity} {id} has no `{field}` field")]
    MissingField {
        entity: &'static str,
        id: String,
        field: &'static str,
    },

    #[error(transparent)]
    Credentials(#[from] crate::credentials::CredentialError),
}

use std::path::PathBuf;

use thiserror::Error;

/// Why an inbound client message was dropped.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("message is not valid JSON")]
    InvalidJson,

    #[error("message is not a JSON object")]
    NotAnObject,

    #[error("message has no event name")]
    MissingEvent,

    #[error("unknown event: {0}")]
    UnknownEvent(String),

    #[error("missing payload field: {0}")]
    MissingField(&'static str),

    #[error("invalid payload field: {0}")]
    InvalidField(&'static str),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid maze layout: {0}")]
    Layout(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server runtime failed: {0}")]
    Serve(#[source] std::io::Error),
}

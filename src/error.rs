//! Errors raised by the network clients

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
    },

    #[error("RenVM RPC error {code}: {message}")]
    RenVm { code: i64, message: String },

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("response is missing {0}")]
    MissingData(&'static str),

    #[error("invalid darknode ID: {0}")]
    InvalidDarknodeId(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the lapis workflow.
///
/// Every fetch, parse and lookup in the crate returns `Result<T>`. The three
/// conditions callers most often branch on are kept distinct: the network or
/// service failed (`Http`, `Service`), the service answered but had nothing
/// for us (`NoDataAvailable`), and a flow fell outside a rating curve
/// (`OutOfRange`).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LapisError {
    /// Transport-level failure (DNS, TLS, timeout, body decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("request failed. {status} - {reason} ({url})")]
    Service {
        url: String,
        status: u16,
        reason: String,
    },

    #[error("parse error: {0}")]
    Parse(String),

    /// The request succeeded but the result set is empty.
    #[error("no data available: {0}")]
    NoDataAvailable(String),

    #[error("flow {flow} cfs is outside the rating curve range [{min}, {max}] cfs")]
    OutOfRange { flow: f64, min: f64, max: f64 },

    #[error("invalid rating curve: {0}")]
    InvalidRatingCurve(String),

    #[error("invalid location '{name}': {reason}")]
    InvalidLocation { name: String, reason: String },

    #[error("unsupported CRS EPSG:{0}")]
    UnsupportedCrs(u32),

    #[error("the collection '{0}' does not have an EPT url")]
    MissingEptPath(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LapisError>;

impl LapisError {
    /// Builds a `Service` error from an HTTP status, using the wording the
    /// workflow has always reported for the common failure codes.
    pub fn from_status(url: &str, status: u16) -> Self {
        let reason = match status {
            400 => "Bad request",
            401 => "Unauthorized",
            403 => "Forbidden",
            404 => "Not found",
            500 => "Internal error",
            502 | 503 | 504 => "Service unavailable",
            _ => "Unexpected status",
        };
        LapisError::Service {
            url: url.to_string(),
            status,
            reason: reason.to_string(),
        }
    }
}

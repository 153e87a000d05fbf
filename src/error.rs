use crate::discovery::DiscoveryError;
use crate::http_client::HttpClientError;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Which of the two relabel rule lists of a scrape job an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelabelKind {
    Target,
    Metric,
}

impl fmt::Display for RelabelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelabelKind::Target => f.write_str("target"),
            RelabelKind::Metric => f.write_str("metric"),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0:?} is not a valid hostname")]
pub struct TargetAddressError(pub String);

/// Everything that can go wrong while loading a configuration document.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document does not match the schema: an unknown key, a value of the
    /// wrong type or a malformed literal.
    #[error("parse config error in {path}: {source} (content preview: {preview:?})")]
    Schema {
        path: String,
        preview: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("job_name is empty in {path}")]
    MissingJobName { path: String },

    #[error("empty or null scrape config section in {path}")]
    NullScrapeConfig { path: String },

    #[error("found multiple scrape configs with job name {job_name:?}")]
    DuplicateJobName { job_name: String },

    #[error("invalid HTTP client config in scrape config {job_name:?}")]
    ClientConfig {
        job_name: String,
        #[source]
        source: HttpClientError,
    },

    #[error("invalid static target in scrape config {job_name:?}")]
    InvalidTargetAddress {
        job_name: String,
        #[source]
        source: TargetAddressError,
    },

    #[error("empty or null {kind} relabeling rule in scrape config {job_name:?}")]
    NullRelabelRule { job_name: String, kind: RelabelKind },

    #[error("invalid {backend} discovery config in scrape config {job_name:?}")]
    Discovery {
        job_name: String,
        backend: &'static str,
        #[source]
        source: DiscoveryError,
    },

    #[error("scrape timeout {timeout:?} greater than scrape interval {interval:?} for {scope}")]
    TimeoutExceedsInterval {
        scope: String,
        timeout: Duration,
        interval: Duration,
    },

    #[error("only one of scrape and scrape_configs may be set")]
    ConflictingScrapeSections,

    #[error("unable to read configuration file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

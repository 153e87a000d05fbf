//! Target discovery configurations.
//!
//! A scrape job lists its discovery mechanisms inline, one key per backend
//! (`static_configs`, `file_sd_configs`, ...). Each mechanism is decoded into
//! a variant of [`DiscoveryConfig`]. Only the configuration is modelled here;
//! actually resolving targets is left to the discovery backends.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("{0:?} is not a valid label name")]
    InvalidLabelName(String),

    #[error("file_sd_configs entry must list at least one file")]
    NoFiles,

    #[error("path name {0:?} is not valid for file discovery")]
    InvalidFilePattern(String),

    #[error("DNS-SD config must contain at least one record name")]
    NoDnsNames,

    #[error("a port is required in DNS-SD configs for all record types except SRV")]
    MissingDnsPort,

    #[error("URL scheme must be 'http' or 'https', got {0:?}")]
    UnsupportedUrlScheme(String),

    #[error("host is missing in URL {0}")]
    MissingUrlHost(Url),

    #[error("refresh_interval must be greater than zero")]
    ZeroRefreshInterval,
}

/// A discovery mechanism attached to a scrape job.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryConfig {
    /// Targets listed literally in the configuration.
    Static(Vec<TargetGroup>),
    File(FileSdConfig),
    Dns(DnsSdConfig),
    Http(HttpSdConfig),
}

impl DiscoveryConfig {
    /// The name of the backend, as used in the `<name>_sd_configs` keys.
    pub fn name(&self) -> &'static str {
        match self {
            DiscoveryConfig::Static(_) => "static",
            DiscoveryConfig::File(_) => "file",
            DiscoveryConfig::Dns(_) => "dns",
            DiscoveryConfig::Http(_) => "http",
        }
    }

    pub fn validate(&self) -> Result<(), DiscoveryError> {
        match self {
            DiscoveryConfig::Static(groups) => groups.iter().try_for_each(TargetGroup::validate),
            DiscoveryConfig::File(config) => config.validate(),
            DiscoveryConfig::Dns(config) => config.validate(),
            DiscoveryConfig::Http(config) => config.validate(),
        }
    }
}

/// A set of targets sharing a common set of labels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TargetGroup {
    pub targets: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl TargetGroup {
    fn validate(&self) -> Result<(), DiscoveryError> {
        match self.labels.keys().find(|name| !is_valid_label_name(name)) {
            Some(name) => Err(DiscoveryError::InvalidLabelName(name.clone())),
            None => Ok(()),
        }
    }
}

/// Label names must match `[a-zA-Z_][a-zA-Z0-9_]*`.
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileSdConfig {
    pub files: Vec<String>,
    #[serde(with = "humantime_serde")]
    pub refresh_interval: Duration,
}

impl Default for FileSdConfig {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            refresh_interval: Duration::from_secs(5 * 60),
        }
    }
}

impl FileSdConfig {
    fn validate(&self) -> Result<(), DiscoveryError> {
        if self.files.is_empty() {
            return Err(DiscoveryError::NoFiles);
        }
        if let Some(file) = self.files.iter().find(|file| !is_valid_file_pattern(file)) {
            return Err(DiscoveryError::InvalidFilePattern(file.clone()));
        }
        if self.refresh_interval.is_zero() {
            return Err(DiscoveryError::ZeroRefreshInterval);
        }
        Ok(())
    }
}

/// File patterns may only glob in the last path component, with at most one
/// `*`, and must name JSON or YAML files.
fn is_valid_file_pattern(pattern: &str) -> bool {
    let (dir, name) = match pattern.rsplit_once('/') {
        Some((dir, name)) => (dir, name),
        None => ("", pattern),
    };

    if dir.contains('*') || name.matches('*').count() > 1 {
        return false;
    }

    match name.rsplit_once('.') {
        Some((stem, extension)) => {
            !stem.is_empty()
                && ["json", "yml", "yaml"]
                    .iter()
                    .any(|valid| extension == *valid || extension == valid.to_uppercase())
        }
        None => false,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DnsRecordType {
    #[default]
    Srv,
    A,
    Aaaa,
    Mx,
    Ns,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DnsSdConfig {
    pub names: Vec<String>,
    #[serde(with = "humantime_serde")]
    pub refresh_interval: Duration,
    #[serde(rename = "type")]
    pub record_type: DnsRecordType,
    #[serde(skip_serializing_if = "is_zero_port")]
    pub port: u16,
}

impl Default for DnsSdConfig {
    fn default() -> Self {
        Self {
            names: Vec::new(),
            refresh_interval: Duration::from_secs(30),
            record_type: DnsRecordType::Srv,
            port: 0,
        }
    }
}

impl DnsSdConfig {
    fn validate(&self) -> Result<(), DiscoveryError> {
        if self.names.is_empty() {
            return Err(DiscoveryError::NoDnsNames);
        }
        if self.record_type != DnsRecordType::Srv && self.port == 0 {
            return Err(DiscoveryError::MissingDnsPort);
        }
        if self.refresh_interval.is_zero() {
            return Err(DiscoveryError::ZeroRefreshInterval);
        }
        Ok(())
    }
}

fn is_zero_port(port: &u16) -> bool {
    *port == 0
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpSdConfig {
    pub url: Url,
    #[serde(default = "default_http_refresh_interval", with = "humantime_serde")]
    pub refresh_interval: Duration,
}

fn default_http_refresh_interval() -> Duration {
    Duration::from_secs(60)
}

impl HttpSdConfig {
    fn validate(&self) -> Result<(), DiscoveryError> {
        if self.url.scheme() != "http" && self.url.scheme() != "https" {
            return Err(DiscoveryError::UnsupportedUrlScheme(
                self.url.scheme().to_string(),
            ));
        }
        if self.url.host_str().map_or(true, str::is_empty) {
            return Err(DiscoveryError::MissingUrlHost(self.url.clone()));
        }
        if self.refresh_interval.is_zero() {
            return Err(DiscoveryError::ZeroRefreshInterval);
        }
        Ok(())
    }
}

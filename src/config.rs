//! The agent configuration and its loader.
//!
//! [`load`] turns a YAML document into a validated [`Config`]:
//!
//! ```text
//! document
//!     → copy of DEFAULT_CONFIG
//!     → strict decode of the top-level sections (unknown keys are errors)
//!     → ScrapeConfig::decode for every scrape job
//!     → Config, or the first error
//! ```
//!
//! Every call builds a new tree. Nothing is shared between two loads, so a
//! reload simply replaces the previous `Config` as a whole.

use crate::error::ConfigError;
use crate::units::ByteSize;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, warn};

mod defaults;
mod scrape;
mod validate;

pub use defaults::{DEFAULT_CONFIG, DEFAULT_GLOBAL_CONFIG, DEFAULT_SCRAPE_CONFIG};
pub use scrape::{Scheme, ScrapeConfig};
use scrape::RawScrapeConfig;
pub use validate::{check_static_targets, check_target_address};

/// Number of characters of the document included in error reports.
const PREVIEW_LENGTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Config {
    pub global: GlobalConfig,
    #[serde(skip_serializing_if = "RuntimeConfig::is_unset")]
    pub runtime: RuntimeConfig,
    #[serde(skip_serializing)]
    pub alert: AlertingConfig,
    #[serde(skip_serializing)]
    pub rule: RuleConfig,
    pub scrape_configs: Vec<ScrapeConfig>,
}

/// Settings shared by all scrape jobs.
///
/// Every field is optional. Zero durations and limits mean "unset": the
/// intervals fall back to [`DEFAULT_GLOBAL_CONFIG`] and the limits are
/// unbounded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GlobalConfig {
    #[serde(with = "humantime_serde")]
    pub scrape_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub scrape_timeout: Duration,
    #[serde(with = "humantime_serde::option", skip_serializing_if = "Option::is_none")]
    pub evaluation_interval: Option<Duration>,
    #[serde(with = "humantime_serde::option", skip_serializing_if = "Option::is_none")]
    pub rule_query_offset: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_log_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrape_failure_log_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "ByteSize::is_zero")]
    pub body_size_limit: ByteSize,
    #[serde(skip_serializing_if = "is_zero")]
    pub sample_limit: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub label_limit: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub label_name_length_limit: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub label_value_length_limit: u64,
    #[serde(skip_serializing_if = "is_zero")]
    pub keep_dropped_targets: u64,
}

impl GlobalConfig {
    /// Fills in unset intervals and checks that the timeout fits in the
    /// interval. An unset timeout never exceeds the interval.
    fn resolve(&mut self) -> Result<(), ConfigError> {
        if self.scrape_interval.is_zero() {
            self.scrape_interval = DEFAULT_GLOBAL_CONFIG.scrape_interval;
        }

        if self.scrape_timeout > self.scrape_interval {
            return Err(ConfigError::TimeoutExceedsInterval {
                scope: "global config".to_string(),
                timeout: self.scrape_timeout,
                interval: self.scrape_interval,
            });
        }
        if self.scrape_timeout.is_zero() {
            self.scrape_timeout = DEFAULT_GLOBAL_CONFIG
                .scrape_timeout
                .min(self.scrape_interval);
        }

        Ok(())
    }
}

/// Tuning knobs for the agent process itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Garbage collector target percentage. Zero leaves the runtime default.
    #[serde(rename = "gogc")]
    pub gc_percent: i32,
}

impl RuntimeConfig {
    fn is_unset(&self) -> bool {
        self.gc_percent == 0
    }
}

/// Reserved for alerting settings; no keys are accepted yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertingConfig {}

/// Reserved for rule evaluation settings; no keys are accepted yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {}

/// The top level of the document. Scrape job blocks are decoded together with
/// the rest of the document and turned into jobs by [`ScrapeConfig::from_raw`].
/// A `None` entry in `scrape_configs` is a null list item.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    global: Option<GlobalConfig>,
    #[serde(default)]
    runtime: Option<RuntimeConfig>,
    #[serde(default)]
    alert: Option<AlertingConfig>,
    #[serde(default)]
    rule: Option<RuleConfig>,
    #[serde(default)]
    scrape: Option<RawScrapeConfig>,
    #[serde(default)]
    scrape_configs: Option<Vec<Option<RawScrapeConfig>>>,
}

/// Parses and validates a configuration document.
///
/// Unknown keys anywhere in the document are rejected. On failure nothing of
/// the document is returned, only the first error found.
pub fn load(document: &str) -> Result<Config, ConfigError> {
    let result = decode(document);

    match &result {
        Ok(config) => debug!(
            scrape_configs = config.scrape_configs.len(),
            "loaded configuration"
        ),
        Err(err) => error!(
            error = %err,
            content_preview = %preview(document),
            "failed to load configuration"
        ),
    }

    result
}

/// Reads `path` and passes its contents to [`load`].
pub fn load_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let document = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_owned(),
        source,
    })?;

    load(&document)
}

fn decode(document: &str) -> Result<Config, ConfigError> {
    let mut config = DEFAULT_CONFIG.clone();

    let raw: RawConfig = if is_blank(document) {
        RawConfig::default()
    } else {
        serde_yaml::from_str(document).map_err(|source| schema_error("document", document, source))?
    };

    if let Some(global) = raw.global {
        config.global = global;
    }
    config.global.resolve()?;

    if let Some(runtime) = raw.runtime {
        config.runtime = runtime;
    }
    if let Some(alert) = raw.alert {
        config.alert = alert;
    }
    if let Some(rule) = raw.rule {
        config.rule = rule;
    }

    let scrape_configs = raw.scrape_configs.unwrap_or_default();
    let jobs: Vec<(String, Option<RawScrapeConfig>)> = match raw.scrape {
        Some(_) if !scrape_configs.is_empty() => {
            return Err(ConfigError::ConflictingScrapeSections)
        }
        Some(scrape) => {
            warn!("the scrape section is deprecated, use scrape_configs instead");
            vec![("scrape".to_string(), Some(scrape))]
        }
        None => scrape_configs
            .into_iter()
            .enumerate()
            .map(|(index, block)| (format!("scrape_configs[{index}]"), block))
            .collect(),
    };

    let mut job_names = HashSet::new();
    for (path, block) in jobs {
        let job = ScrapeConfig::from_raw(block, &path, &config.global)?;
        if !job_names.insert(job.job_name.clone()) {
            return Err(ConfigError::DuplicateJobName {
                job_name: job.job_name,
            });
        }
        config.scrape_configs.push(job);
    }

    Ok(config)
}

/// A document with nothing but whitespace, comments and document markers
/// holds no configuration at all.
fn is_blank(document: &str) -> bool {
    document.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---"
    })
}

/// The first few characters of `text`, for error reports.
pub(crate) fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_LENGTH).collect()
}

/// Wraps a decode error of `text`. The preview starts at the line the error
/// points to, so it shows the offending field as the operator wrote it.
pub(crate) fn schema_error(path: &str, text: &str, source: serde_yaml::Error) -> ConfigError {
    let line = source.location().map_or(1, |location| location.line().max(1));
    let from_line: String = text
        .lines()
        .skip(line - 1)
        .collect::<Vec<_>>()
        .join("\n");

    let preview = if from_line.trim().is_empty() {
        preview(text)
    } else {
        preview(&from_line)
    };

    ConfigError::Schema {
        path: path.to_string(),
        preview,
        source,
    }
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

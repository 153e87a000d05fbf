//! Baseline values that every load starts from.
//!
//! Decoders always clone these and overlay the document on the copy, so a key
//! missing from the document keeps its default instead of a zero value.

use super::{AlertingConfig, Config, GlobalConfig, RuleConfig, RuntimeConfig, Scheme, ScrapeConfig};
use crate::http_client::HttpClientConfig;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::time::Duration;

pub static DEFAULT_GLOBAL_CONFIG: Lazy<GlobalConfig> = Lazy::new(|| GlobalConfig {
    scrape_interval: Duration::from_secs(15),
    scrape_timeout: Duration::from_secs(15),
    ..GlobalConfig::default()
});

pub static DEFAULT_CONFIG: Lazy<Config> = Lazy::new(|| Config {
    global: DEFAULT_GLOBAL_CONFIG.clone(),
    runtime: RuntimeConfig::default(),
    alert: AlertingConfig::default(),
    rule: RuleConfig::default(),
    scrape_configs: Vec::new(),
});

/// Scrape intervals and timeouts are left at zero here; they are inherited
/// from the global section once the job is decoded.
pub static DEFAULT_SCRAPE_CONFIG: Lazy<ScrapeConfig> = Lazy::new(|| ScrapeConfig {
    job_name: String::new(),
    honor_labels: false,
    honor_timestamps: true,
    scrape_interval: Duration::ZERO,
    scrape_timeout: Duration::ZERO,
    metrics_path: "/metrics".to_string(),
    scheme: Scheme::Http,
    params: BTreeMap::new(),
    target_limit: 0,
    label_limit: 0,
    label_name_length_limit: 0,
    label_value_length_limit: 0,
    http_client_config: HttpClientConfig::default(),
    service_discovery_configs: Vec::new(),
    relabel_configs: Vec::new(),
    metric_relabel_configs: Vec::new(),
});

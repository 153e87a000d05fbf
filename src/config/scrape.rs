use super::defaults::DEFAULT_SCRAPE_CONFIG;
use super::validate::validate_scrape_config;
use super::{schema_error, GlobalConfig};
use crate::discovery::{DiscoveryConfig, DnsSdConfig, FileSdConfig, HttpSdConfig, TargetGroup};
use crate::error::ConfigError;
use crate::http_client::{Authorization, BasicAuth, HttpClientConfig, OAuth2, Secret, TlsConfig};
use crate::relabel::RelabelConfig;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

/// A single scrape job.
///
/// Limits set to zero are unbounded.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeConfig {
    pub job_name: String,
    pub honor_labels: bool,
    pub honor_timestamps: bool,
    pub scrape_interval: Duration,
    pub scrape_timeout: Duration,
    pub metrics_path: String,
    pub scheme: Scheme,
    pub params: BTreeMap<String, Vec<String>>,
    pub target_limit: u64,
    pub label_limit: u64,
    pub label_name_length_limit: u64,
    pub label_value_length_limit: u64,
    pub http_client_config: HttpClientConfig,
    pub service_discovery_configs: Vec<DiscoveryConfig>,
    pub relabel_configs: Vec<RelabelConfig>,
    pub metric_relabel_configs: Vec<RelabelConfig>,
}

/// The scrape job block exactly as it is written in the document. HTTP
/// client and discovery settings are inlined, so they are listed here field
/// by field; serde cannot combine `flatten` with `deny_unknown_fields`.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawScrapeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    job_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    honor_labels: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    honor_timestamps: Option<bool>,
    #[serde(
        default,
        with = "humantime_serde::option",
        skip_serializing_if = "Option::is_none"
    )]
    scrape_interval: Option<Duration>,
    #[serde(
        default,
        with = "humantime_serde::option",
        skip_serializing_if = "Option::is_none"
    )]
    scrape_timeout: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scheme: Option<Scheme>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label_name_length_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label_value_length_limit: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    basic_auth: Option<BasicAuth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    authorization: Option<Authorization>,
    #[serde(skip_serializing_if = "Option::is_none")]
    oauth2: Option<OAuth2>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bearer_token: Option<Secret>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bearer_token_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tls_config: Option<TlsConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    proxy_url: Option<Url>,
    #[serde(skip_serializing_if = "Option::is_none")]
    follow_redirects: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    enable_http2: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    static_configs: Vec<TargetGroup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    file_sd_configs: Vec<FileSdConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    dns_sd_configs: Vec<DnsSdConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    http_sd_configs: Vec<HttpSdConfig>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    relabel_configs: Vec<Option<RelabelConfig>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    metric_relabel_configs: Vec<Option<RelabelConfig>>,
}

type RelabelLists = (Vec<Option<RelabelConfig>>, Vec<Option<RelabelConfig>>);

impl RawScrapeConfig {
    /// Overlays every field present in the document onto `job`. The relabel
    /// lists are handed back as-is, null entries included.
    fn overlay(self, job: &mut ScrapeConfig) -> RelabelLists {
        fn set<T>(target: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *target = value;
            }
        }

        set(&mut job.job_name, self.job_name);
        set(&mut job.honor_labels, self.honor_labels);
        set(&mut job.honor_timestamps, self.honor_timestamps);
        set(&mut job.scrape_interval, self.scrape_interval);
        set(&mut job.scrape_timeout, self.scrape_timeout);
        set(&mut job.metrics_path, self.metrics_path);
        set(&mut job.scheme, self.scheme);
        set(&mut job.target_limit, self.target_limit);
        set(&mut job.label_limit, self.label_limit);
        set(&mut job.label_name_length_limit, self.label_name_length_limit);
        set(&mut job.label_value_length_limit, self.label_value_length_limit);
        job.params.extend(self.params);

        let client = &mut job.http_client_config;
        client.basic_auth = self.basic_auth.or(client.basic_auth.take());
        client.authorization = self.authorization.or(client.authorization.take());
        client.oauth2 = self.oauth2.or(client.oauth2.take());
        client.bearer_token_file = self.bearer_token_file.or(client.bearer_token_file.take());
        client.proxy_url = self.proxy_url.or(client.proxy_url.take());
        set(&mut client.bearer_token, self.bearer_token);
        set(&mut client.tls_config, self.tls_config);
        set(&mut client.follow_redirects, self.follow_redirects);
        set(&mut client.enable_http2, self.enable_http2);

        let discovery = &mut job.service_discovery_configs;
        if !self.static_configs.is_empty() {
            discovery.push(DiscoveryConfig::Static(self.static_configs));
        }
        discovery.extend(self.file_sd_configs.into_iter().map(DiscoveryConfig::File));
        discovery.extend(self.dns_sd_configs.into_iter().map(DiscoveryConfig::Dns));
        discovery.extend(self.http_sd_configs.into_iter().map(DiscoveryConfig::Http));

        (self.relabel_configs, self.metric_relabel_configs)
    }
}

impl From<&ScrapeConfig> for RawScrapeConfig {
    fn from(job: &ScrapeConfig) -> Self {
        fn non_zero(value: u64) -> Option<u64> {
            (value != 0).then_some(value)
        }

        let client = &job.http_client_config;
        let mut raw = RawScrapeConfig {
            job_name: Some(job.job_name.clone()),
            honor_labels: Some(job.honor_labels),
            honor_timestamps: Some(job.honor_timestamps),
            scrape_interval: Some(job.scrape_interval),
            scrape_timeout: Some(job.scrape_timeout),
            metrics_path: Some(job.metrics_path.clone()),
            scheme: Some(job.scheme),
            params: job.params.clone(),
            target_limit: non_zero(job.target_limit),
            label_limit: non_zero(job.label_limit),
            label_name_length_limit: non_zero(job.label_name_length_limit),
            label_value_length_limit: non_zero(job.label_value_length_limit),
            basic_auth: client.basic_auth.clone(),
            authorization: client.authorization.clone(),
            oauth2: client.oauth2.clone(),
            bearer_token: (!client.bearer_token.is_empty()).then(|| client.bearer_token.clone()),
            bearer_token_file: client.bearer_token_file.clone(),
            tls_config: (!client.tls_config.is_empty()).then(|| client.tls_config.clone()),
            proxy_url: client.proxy_url.clone(),
            follow_redirects: Some(client.follow_redirects),
            enable_http2: Some(client.enable_http2),
            relabel_configs: job.relabel_configs.iter().cloned().map(Some).collect(),
            metric_relabel_configs: job.metric_relabel_configs.iter().cloned().map(Some).collect(),
            ..RawScrapeConfig::default()
        };

        for config in &job.service_discovery_configs {
            match config {
                DiscoveryConfig::Static(groups) => raw.static_configs.extend(groups.iter().cloned()),
                DiscoveryConfig::File(config) => raw.file_sd_configs.push(config.clone()),
                DiscoveryConfig::Dns(config) => raw.dns_sd_configs.push(config.clone()),
                DiscoveryConfig::Http(config) => raw.http_sd_configs.push(config.clone()),
            }
        }

        raw
    }
}

impl Serialize for ScrapeConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RawScrapeConfig::from(self).serialize(serializer)
    }
}

impl ScrapeConfig {
    /// Decodes one scrape job block from its YAML text.
    ///
    /// The job starts out as a copy of [`DEFAULT_SCRAPE_CONFIG`], the block
    /// is overlaid on it and the result is validated. Intervals, timeouts and
    /// label limits left unset are inherited from `global`. `path` locates the
    /// block in the document and is only used for error messages.
    pub fn decode(block: &str, path: &str, global: &GlobalConfig) -> Result<Self, ConfigError> {
        let raw: Option<RawScrapeConfig> =
            serde_yaml::from_str(block).map_err(|source| schema_error(path, block, source))?;
        Self::from_raw(raw, path, global)
    }

    /// Builds a job from a block that has already been decoded as part of
    /// the whole document. A `None` block was written as an empty or null
    /// list entry.
    pub(crate) fn from_raw(
        raw: Option<RawScrapeConfig>,
        path: &str,
        global: &GlobalConfig,
    ) -> Result<Self, ConfigError> {
        let raw = raw.ok_or_else(|| ConfigError::NullScrapeConfig {
            path: path.to_string(),
        })?;

        let mut job = DEFAULT_SCRAPE_CONFIG.clone();
        let (relabel_configs, metric_relabel_configs) = raw.overlay(&mut job);

        validate_scrape_config(&job, path, &relabel_configs, &metric_relabel_configs)?;

        for config in &job.service_discovery_configs {
            config.validate().map_err(|source| ConfigError::Discovery {
                job_name: job.job_name.clone(),
                backend: config.name(),
                source,
            })?;
        }

        job.relabel_configs = relabel_configs.into_iter().flatten().collect();
        job.metric_relabel_configs = metric_relabel_configs.into_iter().flatten().collect();
        job.inherit(global)?;

        debug!(
            job_name = %job.job_name,
            discovery_configs = job.service_discovery_configs.len(),
            relabel_configs = job.relabel_configs.len(),
            "decoded scrape config"
        );

        Ok(job)
    }

    fn inherit(&mut self, global: &GlobalConfig) -> Result<(), ConfigError> {
        if self.scrape_interval.is_zero() {
            self.scrape_interval = global.scrape_interval;
        }

        if self.scrape_timeout > self.scrape_interval {
            return Err(ConfigError::TimeoutExceedsInterval {
                scope: format!("scrape config with job name {:?}", self.job_name),
                timeout: self.scrape_timeout,
                interval: self.scrape_interval,
            });
        }
        if self.scrape_timeout.is_zero() {
            self.scrape_timeout = global.scrape_timeout.min(self.scrape_interval);
        }

        for (limit, global_limit) in [
            (&mut self.label_limit, global.label_limit),
            (&mut self.label_name_length_limit, global.label_name_length_limit),
            (&mut self.label_value_length_limit, global.label_value_length_limit),
        ] {
            if *limit == 0 {
                *limit = global_limit;
            }
        }

        Ok(())
    }

    /// All literal targets from the static discovery configs.
    pub fn static_targets(&self) -> impl Iterator<Item = &str> {
        self.service_discovery_configs
            .iter()
            .filter_map(|config| match config {
                DiscoveryConfig::Static(groups) => Some(groups),
                _ => None,
            })
            .flatten()
            .flat_map(|group| group.targets.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_GLOBAL_CONFIG;
    use crate::error::RelabelKind;
    use crate::relabel::Action;
    use pretty_assertions::assert_eq;
    use serde_yaml::Value;

    fn decode(yaml: &str) -> Result<ScrapeConfig, ConfigError> {
        ScrapeConfig::decode(yaml, "scrape_configs[0]", &DEFAULT_GLOBAL_CONFIG)
    }

    #[test]
    fn job_name_only_inherits_defaults() {
        let job = decode("job_name: node").unwrap();

        assert_eq!(
            job,
            ScrapeConfig {
                job_name: "node".to_string(),
                scrape_interval: Duration::from_secs(15),
                scrape_timeout: Duration::from_secs(15),
                ..DEFAULT_SCRAPE_CONFIG.clone()
            }
        );
        assert_eq!(job.metrics_path, "/metrics");
        assert_eq!(job.scheme, Scheme::Http);
    }

    #[test]
    fn missing_job_name() {
        let err = decode("metrics_path: /stats").unwrap_err();
        assert!(matches!(err, ConfigError::MissingJobName { .. }));

        let err = decode("job_name: ''").unwrap_err();
        assert!(matches!(err, ConfigError::MissingJobName { .. }));
    }

    #[test]
    fn null_block_is_rejected() {
        let err = decode("~").unwrap_err();
        assert!(matches!(err, ConfigError::NullScrapeConfig { path } if path == "scrape_configs[0]"));
    }

    #[test]
    fn unknown_key_is_schema_error() {
        let err = decode("job_name: node\nmetric_path: /stats").unwrap_err();
        match err {
            ConfigError::Schema { path, preview, source } => {
                assert_eq!(path, "scrape_configs[0]");
                assert!(preview.contains("metric_path"));
                assert!(source.to_string().contains("metric_path"));
            }
            other => panic!("expected a schema error, got {:?}", other),
        }
    }

    #[test]
    fn wrong_type_names_the_field() {
        let err = decode("job_name: node\ntarget_limit: lots").unwrap_err();
        match err {
            ConfigError::Schema { preview, source, .. } => {
                assert!(source.to_string().contains("target_limit"));
                assert_eq!(source.location().map(|location| location.line()), Some(2));
                assert!(preview.starts_with("target_limit: lots"));
            }
            other => panic!("expected a schema error, got {:?}", other),
        }
    }

    #[test]
    fn unquoted_scalars_in_string_fields() {
        let job = decode(
            r#"
            job_name: 2024
            static_configs:
              - targets: ["localhost:9100"]
                labels:
                  version: 2
                  canary: true
            relabel_configs:
              - source_labels: [__meta_status]
                regex: 200
                action: keep
            "#,
        )
        .unwrap();

        assert_eq!(job.job_name, "2024");
        match &job.service_discovery_configs[0] {
            DiscoveryConfig::Static(groups) => {
                assert_eq!(groups[0].labels["version"], "2");
                assert_eq!(groups[0].labels["canary"], "true");
            }
            other => panic!("expected a static config, got {:?}", other),
        }
        assert_eq!(job.relabel_configs[0].regex, "200");
    }

    #[test]
    fn unsupported_scheme_is_schema_error() {
        let err = decode("job_name: node\nscheme: ftp").unwrap_err();
        assert!(matches!(err, ConfigError::Schema { .. }));
    }

    #[test]
    fn full_job() {
        let job = decode(
            r#"
            job_name: api
            honor_labels: true
            honor_timestamps: false
            scrape_interval: 30s
            scrape_timeout: 10s
            metrics_path: /internal/metrics
            scheme: https
            params:
              module: [http_2xx, tcp]
            target_limit: 100
            label_limit: 30
            basic_auth:
              username: agent
              password_file: /etc/agent/password
            tls_config:
              ca_file: /etc/agent/ca.pem
            follow_redirects: false
            static_configs:
              - targets: ["api-1:8443", "api-2:8443"]
                labels:
                  env: prod
            file_sd_configs:
              - files: ["/etc/agent/api/*.json"]
            relabel_configs:
              - source_labels: [__address__]
                target_label: instance
            metric_relabel_configs:
              - action: labeldrop
                regex: "go_.*"
            "#,
        )
        .unwrap();

        assert_eq!(job.job_name, "api");
        assert!(job.honor_labels);
        assert!(!job.honor_timestamps);
        assert_eq!(job.scrape_interval, Duration::from_secs(30));
        assert_eq!(job.scrape_timeout, Duration::from_secs(10));
        assert_eq!(job.metrics_path, "/internal/metrics");
        assert_eq!(job.scheme, Scheme::Https);
        assert_eq!(
            job.params.get("module"),
            Some(&vec!["http_2xx".to_string(), "tcp".to_string()])
        );
        assert_eq!(job.target_limit, 100);
        assert_eq!(job.label_limit, 30);

        let client = &job.http_client_config;
        assert_eq!(client.basic_auth.as_ref().unwrap().username, "agent");
        assert_eq!(
            client.tls_config.ca_file,
            Some(PathBuf::from("/etc/agent/ca.pem"))
        );
        assert!(!client.follow_redirects);
        assert!(client.enable_http2);

        let names: Vec<_> = job
            .service_discovery_configs
            .iter()
            .map(DiscoveryConfig::name)
            .collect();
        assert_eq!(names, vec!["static", "file"]);
        assert_eq!(
            job.static_targets().collect::<Vec<_>>(),
            vec!["api-1:8443", "api-2:8443"]
        );

        assert_eq!(job.relabel_configs.len(), 1);
        assert_eq!(job.metric_relabel_configs[0].action, Action::LabelDrop);
    }

    #[test]
    fn null_metric_relabel_rule() {
        let err = decode(
            r#"
            job_name: node
            metric_relabel_configs:
              - action: keep
              -
            "#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NullRelabelRule {
                kind: RelabelKind::Metric,
                ..
            }
        ));
    }

    #[test]
    fn invalid_discovery_backend() {
        let err = decode(
            r#"
            job_name: node
            dns_sd_configs:
              - names: [node.example.com]
                type: A
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Discovery { backend: "dns", .. }));
    }

    #[test]
    fn timeout_defaults_to_interval_when_shorter() {
        let job = decode("job_name: node\nscrape_interval: 5s").unwrap();
        assert_eq!(job.scrape_interval, Duration::from_secs(5));
        assert_eq!(job.scrape_timeout, Duration::from_secs(5));

        let job = decode("job_name: node\nscrape_interval: 1m").unwrap();
        assert_eq!(job.scrape_timeout, Duration::from_secs(15));
    }

    #[test]
    fn timeout_greater_than_interval() {
        let err = decode("job_name: node\nscrape_interval: 10s\nscrape_timeout: 20s").unwrap_err();
        assert!(matches!(err, ConfigError::TimeoutExceedsInterval { .. }));
    }

    #[test]
    fn label_limits_inherit_from_global() {
        let global = GlobalConfig {
            label_limit: 64,
            label_value_length_limit: 512,
            ..DEFAULT_GLOBAL_CONFIG.clone()
        };
        let job =
            ScrapeConfig::decode("job_name: node\nlabel_limit: 10", "scrape_configs[0]", &global)
                .unwrap();

        assert_eq!(job.label_limit, 10);
        assert_eq!(job.label_name_length_limit, 0);
        assert_eq!(job.label_value_length_limit, 512);
    }

    #[test]
    fn serializes_inline_keys() {
        let job = decode(
            r#"
            job_name: node
            bearer_token: hunter2
            static_configs:
              - targets: ["localhost:9100"]
            "#,
        )
        .unwrap();

        let value = serde_yaml::to_value(&job).unwrap();
        assert_eq!(value["job_name"], Value::from("node"));
        assert_eq!(value["metrics_path"], Value::from("/metrics"));
        assert_eq!(value["scrape_interval"], Value::from("15s"));
        assert_eq!(value["bearer_token"], Value::from("<secret>"));
        assert_eq!(
            value["static_configs"][0]["targets"][0],
            Value::from("localhost:9100")
        );
        assert!(value.get("relabel_configs").is_none());
    }
}

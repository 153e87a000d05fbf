//! Semantic checks on a decoded scrape job.

use super::ScrapeConfig;
use crate::discovery::DiscoveryConfig;
use crate::error::{ConfigError, RelabelKind, TargetAddressError};
use crate::relabel::RelabelConfig;

/// Runs the checks that serde cannot express, in order, stopping at the first
/// failure.
///
/// The relabel lists are passed in undecoded form so that null entries are
/// still visible.
pub(crate) fn validate_scrape_config(
    job: &ScrapeConfig,
    path: &str,
    relabel_configs: &[Option<RelabelConfig>],
    metric_relabel_configs: &[Option<RelabelConfig>],
) -> Result<(), ConfigError> {
    if job.job_name.is_empty() {
        return Err(ConfigError::MissingJobName {
            path: path.to_string(),
        });
    }

    job.http_client_config
        .validate()
        .map_err(|source| ConfigError::ClientConfig {
            job_name: job.job_name.clone(),
            source,
        })?;

    // Relabeling may rewrite the address before it is used, so addresses can
    // only be checked when there is nothing to rewrite them.
    if relabel_configs.is_empty() {
        check_static_targets(&job.service_discovery_configs).map_err(|source| {
            ConfigError::InvalidTargetAddress {
                job_name: job.job_name.clone(),
                source,
            }
        })?;
    }

    if relabel_configs.iter().any(Option::is_none) {
        return Err(ConfigError::NullRelabelRule {
            job_name: job.job_name.clone(),
            kind: RelabelKind::Target,
        });
    }
    if metric_relabel_configs.iter().any(Option::is_none) {
        return Err(ConfigError::NullRelabelRule {
            job_name: job.job_name.clone(),
            kind: RelabelKind::Metric,
        });
    }

    Ok(())
}

/// Checks every literal target of the static discovery configs.
pub fn check_static_targets(configs: &[DiscoveryConfig]) -> Result<(), TargetAddressError> {
    configs
        .iter()
        .filter_map(|config| match config {
            DiscoveryConfig::Static(groups) => Some(groups),
            _ => None,
        })
        .flatten()
        .flat_map(|group| group.targets.iter())
        .try_for_each(|target| check_target_address(target))
}

/// Checks that a target address is a bare `host:port`.
pub fn check_target_address(address: &str) -> Result<(), TargetAddressError> {
    // For now only URLs are rejected.
    if address.contains('/') {
        return Err(TargetAddressError(address.to_string()));
    }
    Ok(())
}

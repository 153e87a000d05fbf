//! Configuration schema of the scrape agent.
//!
//! The entry point is [`load`], which turns a YAML document into a validated
//! [`Config`]. Loading is a pure function of the document: there is no shared
//! mutable state, and every call returns an independent tree.
//!
//! ```
//! let config = scrape_config::load(
//!     r#"
//! scrape_configs:
//!   - job_name: node-exporter
//!     static_configs:
//!       - targets: ["localhost:9100"]
//! "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.scrape_configs[0].metrics_path, "/metrics");
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod http_client;
pub mod relabel;
pub mod units;

pub use config::{load, load_file, Config, GlobalConfig, Scheme, ScrapeConfig};
pub use error::ConfigError;

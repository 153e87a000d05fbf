use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    /// The configuration file to validate.
    #[clap(env = "SCRAPE_CONFIG_FILE", default_value = "agent.yml")]
    config_file: PathBuf,
}

pub fn handle_command(args: Arguments) -> Result<()> {
    let config = scrape_config::load_file(&args.config_file)
        .with_context(|| format!("{} is not a valid configuration", args.config_file.display()))?;

    let targets: usize = config
        .scrape_configs
        .iter()
        .map(|job| job.static_targets().count())
        .sum();

    info!(
        "{} is valid: {} scrape jobs, {} static targets, scraped every {}",
        args.config_file.display(),
        config.scrape_configs.len(),
        targets,
        humantime::format_duration(config.global.scrape_interval)
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn valid_file() {
        let file = config_file("scrape_configs:\n  - job_name: node\n    static_configs:\n      - targets: [\"localhost:9100\"]\n");
        let args = Arguments {
            config_file: file.path().to_owned(),
        };

        handle_command(args).expect("expected no error");
    }

    #[test]
    fn invalid_file() {
        let file = config_file("scrape_configs:\n  - metrics_path: /stats\n");
        let args = Arguments {
            config_file: file.path().to_owned(),
        };

        let err = handle_command(args).expect_err("expected an error");
        assert!(err.to_string().contains("is not a valid configuration"));
        assert!(matches!(
            err.downcast_ref::<scrape_config::ConfigError>(),
            Some(scrape_config::ConfigError::MissingJobName { .. })
        ));
    }

    #[test]
    fn missing_file() {
        let args = Arguments {
            config_file: "/nonexistent/agent.yml".into(),
        };

        let err = handle_command(args).expect_err("expected an error");
        assert!(matches!(
            err.downcast_ref::<scrape_config::ConfigError>(),
            Some(scrape_config::ConfigError::Io { .. })
        ));
    }
}

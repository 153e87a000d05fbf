use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use scrape_config::Config;
use std::io::{self, Write};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Format {
    Yaml,
    Json,
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    /// The configuration file to print.
    #[clap(env = "SCRAPE_CONFIG_FILE", default_value = "agent.yml")]
    config_file: PathBuf,

    /// The output format.
    #[clap(short, long, value_enum, default_value = "yaml")]
    format: Format,
}

pub fn handle_command(args: Arguments) -> Result<()> {
    let config = scrape_config::load_file(&args.config_file)
        .with_context(|| format!("{} is not a valid configuration", args.config_file.display()))?;

    let output = render(&config, args.format)?;
    io::stdout()
        .lock()
        .write_all(output.as_bytes())
        .context("unable to write configuration to stdout")?;

    Ok(())
}

fn render(config: &Config, format: Format) -> Result<String> {
    let output = match format {
        Format::Yaml => serde_yaml::to_string(config)?,
        Format::Json => {
            let mut output = serde_json::to_string_pretty(config)?;
            output.push('\n');
            output
        }
    };
    Ok(output)
}

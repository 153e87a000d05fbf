use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod check;
pub mod print;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Application {
    #[command(subcommand)]
    pub command: SubCommands,
}

#[derive(Subcommand)]
pub enum SubCommands {
    /// Validate a configuration file and report the first problem found.
    Check(check::Arguments),

    /// Print the effective configuration, with all defaults filled in.
    Print(print::Arguments),
}

pub fn handle_command(app: Application) -> Result<()> {
    match app.command {
        SubCommands::Check(args) => check::handle_command(args),
        SubCommands::Print(args) => print::handle_command(args),
    }
}

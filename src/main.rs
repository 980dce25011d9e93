mod cli;
mod commands;
mod config;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command, OutputFormat};
use config::Config;
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub check: bool,
    pub output: OutputFormat,
    pub endpoint: Option<String>,
    pub config: Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    match cli.command {
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "stalkctl", &mut io::stdout());
            Ok(())
        }
        command => {
            let ctx = Context {
                verbose: cli.verbose,
                quiet: cli.quiet,
                check: cli.check,
                output: cli.output,
                endpoint: cli.endpoint,
                config: Config::load(cli.config.as_deref())?,
            };
            log::trace!("verbosity {}, check mode {}", ctx.verbose, ctx.check);

            let result = commands::run(&ctx, command);
            if let Err(err) = &result
                && let Some(e) = err.downcast_ref::<ebkit::Error>()
            {
                ui::hint(&format!("{}. {}", e.category().description(), e.category().advice()));
            }
            result
        }
    }
}

//! shelf CLI
//!
//! Command-line interface for reconciling installed and owned game libraries.

mod cli_types;
mod commands;
mod error;
mod spinner;

use std::io::Write;

use clap::Parser;
use log::{Level, LevelFilter};
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use cli_types::{Cli, Commands, ConfigAction};
pub(crate) use error::CliError;

/// Log an empty line (user output goes through the logger).
pub(crate) fn log_blank() {
    log::info!("");
}

/// Install the logger. User-facing output is logged at info and printed
/// bare; warnings and errors get a colored prefix. `--verbose` switches to
/// timestamped debug output. `RUST_LOG` overrides the level.
fn init_logging(quiet: bool, verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else if quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .target(env_logger::Target::Stdout)
        .parse_default_env();

    if verbose {
        builder.format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} {}: {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.args()
            )
        });
    } else {
        builder.format(|buf, record| match record.level() {
            Level::Error => writeln!(
                buf,
                "{} {}",
                "error:".if_supports_color(Stdout, |t| t.red()),
                record.args()
            ),
            Level::Warn => writeln!(
                buf,
                "{} {}",
                "warning:".if_supports_color(Stdout, |t| t.yellow()),
                record.args()
            ),
            _ => writeln!(buf, "{}", record.args()),
        });
    }
    builder.init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let result = match cli.command {
        Commands::Reconcile {
            installed,
            owned,
            hidden,
            relationships,
            db,
            source,
            policy,
            json,
        } => commands::reconcile::run_reconcile(
            commands::reconcile::ReconcileInputs {
                installed,
                owned,
                hidden,
                relationships,
                db,
                source,
            },
            &policy,
            json,
            cli.quiet,
        ),
        Commands::Run { dir, policy, json } => {
            commands::run::run_all(&dir, &policy, json, cli.quiet)
        }
        Commands::Sources => {
            commands::sources::run_sources();
            Ok(())
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::run_config_show(),
            ConfigAction::Path => {
                commands::config::run_config_path();
                Ok(())
            }
            ConfigAction::SetPolicy { policy } => {
                commands::config::run_config_set_policy(&policy)
            }
        },
    };

    if let Err(e) = result {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

//! Survey Insights - CSV survey analysis from the command line
//!
//! Loads one or two survey waves, runs the requested analysis and writes
//! text or JSON results, optionally with PNG charts.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Command};
use tracing::{debug, info};
use tracing_subscriber::FmtSubscriber;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging or data needed)
    if let Command::InitConfig { force } = cli.command {
        if let Err(e) = commands::init_config(force) {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
        return;
    }

    init_logging(&cli);

    info!("Survey Insights v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", cli);

    if let Err(e) = commands::run(&cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Initialize logging based on verbosity settings. Logs go to stderr so
/// stdout stays clean for results.
fn init_logging(cli: &Cli) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

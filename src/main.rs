mod config;
mod db;
mod error;
mod models;
mod report;
mod run;
mod util;

use anyhow::Result;
use clap::Parser;
use std::sync::Once;

static TRACING_INIT: Once = Once::new();

fn main() -> Result<()> {
    let cli = run::Cli::parse();
    init_tracing(cli.verbose);

    let settings = config::Settings::load_default()?;
    let db_path = settings.resolve_database_path(cli.db.as_deref())?;
    let mut db = db::Database::open(&db_path)?;

    run::execute(cli, &mut db, &settings)
}

/// Logs go to stderr so report output stays clean. `RUST_LOG` overrides `-v`.
fn init_tracing(verbose: u8) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let level = match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        };
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("cashlog={level}")));

        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    });
}

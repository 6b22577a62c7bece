//! oxide-schemadiff CLI
//!
//! Prints the migration between two schema snapshot files.

use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_schemadiff::prelude::*;

/// Schema diffing and DDL generation.
#[derive(Parser)]
#[command(name = "oxide-schemadiff")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Previous snapshot (JSON). Omit on the first run.
    #[arg(short, long)]
    from: Option<PathBuf>,

    /// Target snapshot (JSON).
    #[arg(short, long)]
    to: PathBuf,

    /// Target dialect.
    #[arg(
        short,
        long,
        env = "SCHEMADIFF_DIALECT",
        value_enum,
        default_value_t = DialectKind::Postgres
    )]
    dialect: DialectKind,

    /// Only print the migration of this app.
    #[arg(short, long)]
    app: Option<String>,

    /// MySQL: append typed indexes as separate CREATE INDEX statements.
    #[arg(long)]
    mysql_separate_indexes: bool,

    /// MySQL: default table character set.
    #[arg(long, default_value = "utf8mb4")]
    charset: String,

    /// Print the downgrade instead of the upgrade.
    #[arg(long)]
    downgrade: bool,

    /// Write the target snapshot here once the migration is planned.
    #[arg(long)]
    write_snapshot: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let old = cli.from.as_ref().map(SchemaSnapshot::load).transpose()?;
    let new = SchemaSnapshot::load(&cli.to)?;

    let options = DialectOptions {
        mysql_inline_indexes: !cli.mysql_separate_indexes,
        charset: cli.charset.clone(),
    };
    let dialect = cli.dialect.build(&options);
    let planned = MigrationPlanner::new(dialect.as_ref()).plan(old.as_ref(), &new)?;

    if planned.is_empty() {
        info!("No changes detected.");
    }

    for migration in &planned.migrations {
        if let Some(app) = &cli.app {
            if &migration.app != app {
                continue;
            }
        }
        for warning in &migration.warnings {
            warn!("{}", warning);
        }

        let statements = if cli.downgrade {
            &migration.sql.downgrade
        } else {
            &migration.sql.upgrade
        };
        println!("-- {} ({})", migration.app, cli.dialect);
        for statement in statements {
            println!("{statement};");
        }
        println!();
    }

    if let Some(path) = &cli.write_snapshot {
        planned.snapshot.save(path)?;
        info!("Wrote snapshot: {}", path.display());
    }

    Ok(())
}

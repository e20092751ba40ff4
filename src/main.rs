use anyhow::Context;
use clap::Parser;
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;
use trout::cli::{Cli, Commands};
use trout::commands::{
    calc_bad_nights_command, init_db, list_bad_nights, list_nights, show_bands, show_star,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open database: {}", cli.database))?;

    match cli.command {
        Commands::CalcBadNights { args } => {
            calc_bad_nights_command(&conn, &args)?;
        }
        Commands::BadNights { year, secondary } => {
            list_bad_nights(&conn, year, secondary)?;
        }
        Commands::Bands { format } => {
            show_bands(&conn, format)?;
        }
        Commands::Star {
            star,
            year,
            secondary,
        } => {
            show_star(&conn, star, year, secondary)?;
        }
        Commands::Nights { year, secondary } => {
            list_nights(&conn, year, secondary)?;
        }
        Commands::InitDb => {
            init_db(&conn, &cli.database)?;
        }
    }

    Ok(())
}

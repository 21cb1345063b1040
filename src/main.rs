mod aggregator;
mod cli;
mod db;
mod error;
mod fmt;
mod identity;
mod importer;
mod kpis;
mod models;
mod parser;
mod reports;
mod settings;
mod sheet;

use clap::Parser;

use cli::{Cli, Commands, ProductsCommands, SnapshotsCommands};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Import {
            file,
            week,
            dry_run,
        } => cli::import::run(&file, week.as_deref(), dry_run),
        Commands::Snapshots { command } => match command {
            SnapshotsCommands::List => cli::snapshots::list(),
            SnapshotsCommands::Show { week, top } => cli::snapshots::show(&week, top),
        },
        Commands::Compare {
            week_a,
            week_b,
            limit,
        } => cli::compare::run(&week_a, &week_b, limit),
        Commands::Products { command } => match command {
            ProductsCommands::List { search } => cli::products::list(search.as_deref()),
            ProductsCommands::History { id } => cli::products::history(id),
        },
        Commands::Runs { limit } => cli::runs::run(limit),
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

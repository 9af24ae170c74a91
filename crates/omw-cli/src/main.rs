use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use omw_store::EntryStore;
use tracing_subscriber::EnvFilter;

use omw_cli::commands::record::Action;
use omw_cli::commands::report::{CLI_BOUNDS, Period};
use omw_cli::commands::{convert, edit, record, report, server};
use omw_cli::{Cli, Commands, Config};

/// Load config and open the entry store it points at.
fn open_store(config_path: Option<&Path>) -> Result<(EntryStore, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let store = EntryStore::open(&config.store_path);
    Ok((store, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let mut stdout = io::stdout().lock();

    match command {
        Commands::Add { task } => {
            let (store, _config) = open_store(cli.config.as_deref())?;
            record::run(&mut stdout, &store, Action::Add(task))?;
        }
        Commands::Hello => {
            let (store, _config) = open_store(cli.config.as_deref())?;
            record::run(&mut stdout, &store, Action::Hello)?;
        }
        Commands::Break => {
            let (store, _config) = open_store(cli.config.as_deref())?;
            record::run(&mut stdout, &store, Action::Break)?;
        }
        Commands::Ignore => {
            let (store, _config) = open_store(cli.config.as_deref())?;
            record::run(&mut stdout, &store, Action::Ignore)?;
        }
        Commands::Stretch => {
            let (store, _config) = open_store(cli.config.as_deref())?;
            record::run(&mut stdout, &store, Action::Stretch)?;
        }
        Commands::Report { from, to, format } => {
            let (store, _config) = open_store(cli.config.as_deref())?;
            let today = Local::now().date_naive();
            let period = Period::resolve(from.as_deref(), to.as_deref(), today, CLI_BOUNDS)?;
            report::run(&mut stdout, &store, period, (*format).into())?;
        }
        Commands::Edit => {
            let (store, config) = open_store(cli.config.as_deref())?;
            let env_editor = std::env::var("EDITOR").ok();
            let editor = edit::resolve_editor(config.editor.as_deref(), env_editor.as_deref());
            edit::run(&store, &editor)?;
        }
        Commands::Server => {
            let (store, config) = open_store(cli.config.as_deref())?;
            let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
            runtime.block_on(server::serve(&config, store))?;
        }
        Commands::Convert { path } => {
            let (store, _config) = open_store(cli.config.as_deref())?;
            let count = convert::run(&mut stdout, path)?;
            eprintln!(
                "Converted {count} entries. Review the output, then save it as {}",
                store.path().display()
            );
        }
    }

    Ok(())
}

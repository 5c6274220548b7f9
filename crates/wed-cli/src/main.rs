mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use wed_core::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Logs go to stderr so --json output stays parseable
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    let config = Config::load()?;

    // Login only writes the state file
    if let Commands::Login {
        user_id,
        email,
        hours,
    } = &cli.command
    {
        return cli::commands::login(&config, user_id, email.as_deref(), *hours, cli.json);
    }

    let sync = cli::commands::open_sync(&config)?;

    // Process commands
    match &cli.command {
        Commands::Show => cli::commands::show(&sync, cli.json).await?,
        Commands::Set { field, value } => {
            cli::commands::set_field(&sync, field, value, cli.json).await?;
        }
        Commands::Guest(cmd) => cli::commands::guest(&sync, cmd, cli.json).await?,
        Commands::Expense(cmd) => cli::commands::expense(&sync, cmd, cli.json).await?,
        Commands::Segment(cmd) => cli::commands::segment(&sync, cmd, cli.json).await?,
        Commands::Stats => cli::commands::stats(&sync, cli.json).await?,
        Commands::Countdown => cli::commands::countdown(&sync, cli.json).await?,
        Commands::Submit => cli::commands::submit(&sync, cli.json).await?,
        Commands::Reset { force } => cli::commands::reset(&sync, *force, cli.json).await?,
        Commands::Recover => cli::commands::recover(&sync, cli.json).await?,
        Commands::Logout { reset } => {
            cli::commands::logout(&config, &sync, *reset, cli.json).await?;
        }
        Commands::Login { .. } => {}
    }

    Ok(())
}

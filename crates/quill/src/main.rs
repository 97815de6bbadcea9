use std::sync::Arc;

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quill::App;
use quill::cli::{Cli, Commands};
use quill::commands;
use quill::config::{DaemonConfig, DiscordConfig, build_messenger, resolve_database};
use quill_scheduler::SystemClock;
use quill_sprint::Caller;
use quill_store::SqliteStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "quill=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let database = resolve_database(cli.database).map_err(|e| miette::miette!("{}", e))?;
    let discord = cli.discord_token.map(|token| DiscordConfig {
        token,
        api_base: cli.discord_api,
    });

    if let Commands::Daemon { poll_interval } = cli.command {
        let config = DaemonConfig::new(database, poll_interval, discord)
            .map_err(|e| miette::miette!("{}", e))?;
        return quill::daemon::run(config).await;
    }

    let store = Arc::new(SqliteStore::open(&database).map_err(|e| miette::miette!("{}", e))?);
    let messenger = build_messenger(discord.as_ref()).map_err(|e| miette::miette!("{}", e))?;
    let app = App::new(store, messenger, Arc::new(SystemClock));

    let output = match cli.command {
        Commands::Daemon { .. } => None,
        Commands::Jobs { json } => Some(commands::jobs(&app, json).await?),
        Commands::Sprint { caller, command } => {
            let caller = Caller::from(caller);
            commands::sprint(&app, &caller, command)
                .await
                .map_err(|e| commands::sprint_report(caller.user, e))?
        }
        Commands::Goal { user, command } => Some(
            commands::goal(&app, user, command)
                .await
                .map_err(|e| miette::miette!("{}", e))?,
        ),
        Commands::Project {
            user,
            shortname,
            name,
        } => Some(commands::create_project(&app, user, &shortname, &name)?),
        Commands::Setting { command } => Some(commands::change_setting(&app, command)?),
    };

    if let Some(output) = output {
        println!("{}", output);
    }
    Ok(())
}

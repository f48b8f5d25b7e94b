use anyhow::Result;
use clap::Parser;

mod cli;
mod config_cmds;
mod cooldown_cmd;
mod models_cmd;
mod route_cmd;
mod select_cmd;

use ads_config::SchedulerConfig;
use cli::{Cli, Commands, ConfigCommands};

fn main() -> Result<()> {
    // Initialize tracing (output to stderr, initialize only once)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();
    let format = cli.format.clone();
    let config = match &cli.config {
        Some(path) => SchedulerConfig::load_from(path)?,
        None => SchedulerConfig::load()?,
    };
    tracing::debug!(
        extra_models = config.models.len(),
        cooldown_policy = ?config.router.cooldown_policy,
        "Configuration loaded"
    );

    match cli.command {
        Commands::Models { tier } => models_cmd::handle_models(&config, tier, format),
        Commands::Select { snapshot } => select_cmd::handle_select(&snapshot, format),
        Commands::Route {
            model,
            tier,
            url,
            repeat,
        } => route_cmd::handle_route(&config, model, tier, url, repeat, format),
        Commands::Cooldown {
            provider,
            sessions,
            api_key,
        } => cooldown_cmd::handle_cooldown(&config, &provider, sessions, api_key.as_deref(), format),
        Commands::Config { cmd } => match cmd {
            ConfigCommands::Show => config_cmds::handle_config_show(&config, format),
            ConfigCommands::Path => config_cmds::handle_config_path(cli.config.as_deref()),
        },
    }
}

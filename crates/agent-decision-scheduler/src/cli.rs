use ads_core::{OutputFormat, Tier};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ads")]
#[command(about = "Agent Decision Scheduler: layer selection and provider routing for simulated agents")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (text or json)
    #[arg(long, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Config file (defaults to ~/.config/agent-decision-scheduler/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registry models with queue names and fallback chains
    Models {
        /// Only models of this tier, in rotation order
        #[arg(long, value_enum)]
        tier: Option<Tier>,
    },

    /// Pick the reasoning layer for an agent snapshot (JSON file, `-` for stdin)
    Select { snapshot: PathBuf },

    /// Resolve a request to a provider queue without dispatching it
    Route {
        /// Explicit model id or legacy alias
        #[arg(long)]
        model: Option<String>,

        /// Intelligence tier (used when no model is given)
        #[arg(long, value_enum)]
        tier: Option<Tier>,

        /// Custom endpoint base URL
        #[arg(long)]
        url: Option<String>,

        /// Number of consecutive resolutions to show (tier rotation)
        #[arg(long, default_value_t = 1)]
        repeat: usize,
    },

    /// Compute the fair-share cooldown for a provider
    Cooldown {
        #[arg(long)]
        provider: String,

        /// Active game sessions sharing the provider
        #[arg(long, default_value_t = 1)]
        sessions: usize,

        /// API key whose hashed override applies (never printed)
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Print the config file path
    Path,
}

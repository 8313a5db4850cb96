pub mod ask;
pub mod config;

use clap::{Parser, Subcommand};

/// StreamRelay: streams conversational-backend answers into chat cards.
#[derive(Debug, Parser)]
#[command(name = "streamrelay", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the relay server (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Run one streaming turn and print the answer as it arrives.
    Ask {
        /// The message to send.
        message: String,
        /// User id the conversation belongs to.
        #[arg(long, default_value = "cli")]
        user: String,
        /// Continue this conversation instead of starting a new one.
        #[arg(long)]
        conversation: Option<String>,
    },
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from the path specified by `SR_CONFIG` (or
/// `config.toml` by default).  Returns the parsed [`Config`] and the
/// path that was used.  A missing file yields the defaults.
///
/// [`Config`]: sr_domain::config::Config
pub fn load_config() -> anyhow::Result<(sr_domain::config::Config, String)> {
    let config_path = std::env::var("SR_CONFIG").unwrap_or_else(|_| "config.toml".into());

    let config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        sr_domain::config::Config::default()
    };

    Ok((config, config_path))
}

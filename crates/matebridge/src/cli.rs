//! Clap derive structures for the `matebridge` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// matebridge -- mirror TeslaMate vehicles into a local state tree
#[derive(Debug, Parser)]
#[command(
    name = "matebridge",
    version,
    about = "Bridge TeslaMate vehicle telemetry and commands",
    long_about = "Polls a TeslaMate API server, mirrors vehicle info and status into a\n\
        hierarchical state tree, and relays commands and settings back to the\n\
        vehicles, waking them first when required.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "MATEBRIDGE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// TeslaMate API URL (overrides profile)
    #[arg(long, short = 'u', env = "MATEBRIDGE_SERVER_URL", global = true)]
    pub server_url: Option<String>,

    /// Bearer token (overrides the credential chain)
    #[arg(long, env = "MATEBRIDGE_ACCESS_TOKEN", global = true, hide_env_values = true)]
    pub access_token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "MATEBRIDGE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// Color mode for tables and status labels
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Print nothing but errors
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip TLS certificate verification
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "MATEBRIDGE_TIMEOUT", global = true)]
    pub timeout: Option<u64>,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Write logs to this file instead of stderr
    #[arg(long, env = "MATEBRIDGE_LOG_FILE", global = true)]
    pub log_file: Option<PathBuf>,
}

// ── Output, Color & Log Enums ────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Rounded table
    Table,
    /// Pretty-printed JSON
    Json,
    /// JSON on one line
    JsonCompact,
    /// YAML
    Yaml,
    /// One key per line
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Color when stdout is a terminal
    Auto,
    /// Always color
    Always,
    /// Never color
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line
    Json,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the bridge until interrupted
    Run(RunArgs),

    /// Show vehicles and their mirrored state
    #[command(alias = "st")]
    Status(StatusArgs),

    /// Check that the TeslaMate API answers
    Ping,

    /// Send a command to a vehicle
    #[command(alias = "cmd")]
    Command(CommandArgs),

    /// Change a vehicle setting
    Set(SetArgs),

    /// List the commands and settings exposed per vehicle
    Catalog(CatalogArgs),

    /// Manage profiles and the config file
    Config(ConfigArgs),

    /// Print a shell completion script
    Completions(CompletionsArgs),
}

// ── Run ──────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Wake sleeping vehicles before sending commands
    #[arg(long)]
    pub force_wake: bool,

    /// Reconciliation period in seconds (overrides profile)
    #[arg(long)]
    pub refresh_interval: Option<u64>,

    /// Health check period in seconds (overrides profile)
    #[arg(long)]
    pub health_interval: Option<u64>,
}

// ── Status ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Only show this vehicle
    pub vin: Option<String>,

    /// Dump every mirrored state value instead of the vehicle summary
    #[arg(long, short = 't')]
    pub tree: bool,
}

// ── Command / Set ────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CommandArgs {
    /// Vehicle identification number
    pub vin: String,

    /// Catalog command name (see `matebridge catalog`)
    pub name: String,

    /// Wake the vehicle first if it is not online
    #[arg(long)]
    pub force_wake: bool,
}

#[derive(Debug, Args)]
pub struct SetArgs {
    /// Vehicle identification number
    pub vin: String,

    /// Catalog setting name (see `matebridge catalog`)
    pub name: String,

    /// New value
    pub value: String,

    /// Wake the vehicle first if it is not online
    #[arg(long)]
    pub force_wake: bool,
}

// ── Catalog ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CatalogArgs {
    #[command(subcommand)]
    pub command: CatalogCommand,
}

#[derive(Debug, Subcommand)]
pub enum CatalogCommand {
    /// List command nodes
    Commands,

    /// List setting nodes
    Settings,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive first-time setup
    Init,

    /// Print the config file with tokens masked
    Show,

    /// Print the config file path
    Path,

    /// Set a configuration value on the active profile
    Set {
        /// Profile key (e.g. "server_url", "refresh_interval")
        key: String,

        /// Value to set
        value: String,
    },

    /// List profiles, marking the default
    Profiles,

    /// Make a profile the default
    Use {
        /// Profile name
        name: String,
    },

    /// Store the active profile's access token in the system keyring
    SetToken {
        /// Read the token from stdin instead of prompting
        #[arg(long)]
        stdin: bool,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}

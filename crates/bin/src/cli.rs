//! CLI argument definitions for the Tollgate binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::DEFAULT_CONFIG_PATH;

/// Tollgate multi-tenant identity service
#[derive(Parser, Debug)]
#[command(name = "tollgate")]
#[command(about = "Tollgate: user registration, login and sessions for many tenants")]
#[command(version)]
pub struct Cli {
    /// Configuration file
    #[arg(
        short,
        long,
        global = true,
        default_value = DEFAULT_CONFIG_PATH,
        env = "TOLLGATE_CONFIG"
    )]
    pub config: PathBuf,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP service
    Serve(ServeArgs),
    /// List storage drivers, or show help for one
    Store(DriverArgs),
    /// List encryption drivers, or show help for one
    Encrypt(DriverArgs),
    /// Initialise the configured store
    CreateStore,
    /// Add a user directly to the store
    UserAdd(UserAddArgs),
    /// Print the default configuration, or write it to the config path
    Config(ConfigArgs),
    /// Check health of a running Tollgate service
    Health(HealthArgs),
}

/// Arguments for the serve command
#[derive(clap::Args, Debug)]
pub struct ServeArgs {
    /// Bind address, overriding Service.Host
    #[arg(long, env = "TOLLGATE_HOST")]
    pub host: Option<String>,

    /// Port to listen on, overriding Service.Port
    #[arg(short, long, env = "TOLLGATE_PORT")]
    pub port: Option<u16>,
}

/// Arguments for the driver listing commands
#[derive(clap::Args, Debug)]
pub struct DriverArgs {
    /// Show the long help for this driver
    pub name: Option<String>,
}

/// Arguments for the user-add command
#[derive(clap::Args, Debug)]
pub struct UserAddArgs {
    /// Tenant the user belongs to
    #[arg(short, long)]
    pub domain: String,

    /// Login name
    #[arg(short, long)]
    pub login: String,

    /// Full name
    #[arg(short, long, default_value = "")]
    pub name: String,

    #[arg(short, long)]
    pub email: String,

    #[arg(long, env = "TOLLGATE_USER_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Create a system account that may call the service
    #[arg(long)]
    pub system: bool,
}

/// Arguments for the config command
#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
    /// Write to the config path instead of printing
    #[arg(short, long)]
    pub write: bool,

    /// Overwrite an existing file
    #[arg(short, long, requires = "write")]
    pub force: bool,
}

/// Arguments for the health command
#[derive(clap::Args, Debug)]
pub struct HealthArgs {
    /// Base URL of the service
    #[arg(short, long, default_value = "http://127.0.0.1:7480", env = "TOLLGATE_URL")]
    pub url: String,

    /// Timeout in seconds
    #[arg(short, long, default_value_t = 5)]
    pub timeout: u64,
}

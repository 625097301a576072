//! Storefront shell - headless driver for the native/page auth bridge.

mod app;
mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use shell_config_and_utils::{init_logging, Config, Paths};

/// Storefront shell command-line interface.
#[derive(Parser)]
#[command(name = "storefront-shell")]
#[command(about = "Resolve embedded routes and drive the auth bridge from a terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error). Defaults to the config value.
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for config, secure store and logs. Defaults to ~/.storefront
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one navigation cycle and print the URL the page would load
    Resolve {
        /// Route requested by the screen, e.g. /home
        route: String,
    },
    /// Password login against the SSO gateway
    Login {
        #[arg(long)]
        id: String,
        #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log out and clear both storage domains
    Logout,
    /// Check whether the stored session is still usable
    Status,
    /// Show the device identity
    Device {
        /// Forget the stored identifier and generate a new one
        #[arg(long)]
        reset: bool,
    },
    /// Navigate to a route, then exchange page messages as JSON lines on stdin/stdout
    Bridge {
        route: String,
        /// Fixed position reported to GET_LOCATION_REQUEST, as "lat,lon"
        #[arg(long)]
        location: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;
    let config = Config::load(&paths)?;

    let level = cli.log_level.unwrap_or_else(|| config.log_level.clone());
    if let Err(e) = init_logging(&level) {
        eprintln!("warning: logging disabled: {e}");
    }

    match cli.command {
        Commands::Resolve { route } => commands::resolve::run(&config, &paths, &route).await?,
        Commands::Login { id, password } => {
            commands::session::login(&config, &paths, &id, &password).await?
        }
        Commands::Logout => commands::session::logout(&config, &paths).await?,
        Commands::Status => commands::session::status(&config, &paths).await?,
        Commands::Device { reset } => commands::device::run(&config, &paths, reset)?,
        Commands::Bridge { route, location } => {
            commands::bridge::run(&config, &paths, &route, location.as_deref()).await?
        }
    }

    Ok(())
}

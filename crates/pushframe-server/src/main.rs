//! Pushframe server binary.
//!
//! `run` (the default) starts the notification relay and the HTTP
//! submission API; the `app` subcommands manage the application registry
//! the same process reads at runtime.

use std::{path::PathBuf, process::ExitCode, sync::Arc};

use clap::{Parser, Subcommand};
use pushframe_server::{ApiState, Relay, ServerError, ServiceConfig, http};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pushframe_directory::SharedDirectory;

#[derive(Parser)]
#[command(
    name = "pushframe-server",
    about = "Push notification relay for information-base clients"
)]
struct Cli {
    /// Address clients connect to for receiving notifications.
    #[arg(long, value_name = "ADDR")]
    service: Option<std::net::SocketAddr>,

    /// Address the HTTP submission API listens on.
    #[arg(long, value_name = "ADDR")]
    listen: Option<std::net::SocketAddr>,

    /// Path of the application registry file.
    #[arg(long, value_name = "FILE")]
    keys_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the relay and the HTTP API (the default).
    Run,
    /// Manage registered applications.
    App {
        #[command(subcommand)]
        command: AppCommand,
    },
}

#[derive(Subcommand)]
enum AppCommand {
    /// Register a new application and print its credentials.
    Create {
        /// Human-readable application title.
        title: String,
    },
    /// Delete an application.
    Delete {
        /// Application id.
        app_id: String,
    },
    /// List registered applications.
    List,
    /// Rotate an application's server key. Outstanding access tokens
    /// are reset.
    RotateServerKey {
        /// Application id.
        app_id: String,
    },
    /// Rotate an application's client key material and print the new
    /// key blob for distribution to clients.
    RotateClientKey {
        /// Application id.
        app_id: String,
    },
}

fn config_from(cli: &Cli) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    if let Some(addr) = cli.service {
        config.notify_addr = addr;
    }
    if let Some(addr) = cli.listen {
        config.api_addr = addr;
    }
    if let Some(path) = &cli.keys_file {
        config.keys_file = path.clone();
    }
    config
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = config_from(&cli);

    let result = match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config).await,
        Command::App { command } => admin(&config, &command),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "fatal");
            ExitCode::FAILURE
        },
    }
}

async fn run(config: ServiceConfig) -> Result<(), ServerError> {
    let directory = SharedDirectory::open(&config.keys_file)?;
    info!(apps = directory.list().len(), keys_file = %config.keys_file.display(), "registry loaded");

    let relay = Arc::new(Relay::bind(config.notify_addr, Arc::new(directory.clone())).await?);

    let state = Arc::new(ApiState { directory, sender: relay.clone() });
    let api_listener = TcpListener::bind(config.api_addr).await.map_err(ServerError::Http)?;
    info!(addr = %config.api_addr, "HTTP API listening");

    axum::serve(api_listener, http::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Http)?;

    relay.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown requested");
}

#[allow(clippy::print_stdout)]
fn admin(config: &ServiceConfig, command: &AppCommand) -> Result<(), ServerError> {
    let directory = SharedDirectory::open(&config.keys_file)?;

    match command {
        AppCommand::Create { title } => {
            let app = directory.create_app(title)?;
            println!("id:         {}", app.id);
            println!("title:      {}", app.title);
            println!("server key: {}", app.server_key);
            println!("client key: {}", app.keys.to_base64());
        },
        AppCommand::Delete { app_id } => {
            directory.delete_app(app_id)?;
            println!("deleted {app_id}");
        },
        AppCommand::List => {
            for app in directory.list() {
                println!("{}  {}", app.id, app.title);
            }
        },
        AppCommand::RotateServerKey { app_id } => {
            let server_key = directory.rotate_server_key(app_id)?;
            println!("server key: {server_key}");
        },
        AppCommand::RotateClientKey { app_id } => {
            let blob = directory.rotate_client_key(app_id)?;
            println!("client key: {blob}");
        },
    }

    Ok(())
}

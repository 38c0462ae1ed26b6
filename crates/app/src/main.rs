//! Fleetgate - command line entry point
//!
//! Loads settings, installs tracing, wires the client and runs one command.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fleetgate::{FleetClient, log_event};
use fleetgate_domain::{ApiRequest, HttpMethod};
use fleetgate_infrastructure::{SettingsLoader, init_tracing};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "fleetgate", version, about = "Resilient client for the fleet management API")]
struct Cli {
    /// Configuration file (TOML, JSON or YAML).
    #[arg(long, env = "FLEETGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Overrides the API base URL.
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Log in and store the token pair.
    Login {
        /// Account email.
        #[arg(long)]
        email: String,
        /// Account password.
        #[arg(long, env = "FLEETGATE_PASSWORD", hide_env_values = true)]
        password: String,
        /// Keep the session across restarts.
        #[arg(long)]
        remember: bool,
    },
    /// Forget the stored token pair.
    Logout,
    /// Show whether a session is stored.
    Status,
    /// Send a request to the API and print the response body.
    Request {
        /// GET, POST, PUT, PATCH or DELETE.
        method: HttpMethod,
        /// Path relative to the base URL, e.g. `/buses`.
        path: String,
        /// JSON body.
        #[arg(long)]
        body: Option<String>,
        /// Query parameter as `name=value`; repeatable.
        #[arg(long = "query", value_parser = parse_query)]
        query: Vec<(String, String)>,
    },
}

fn parse_query(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got `{raw}`"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loader = match &cli.config {
        Some(path) => SettingsLoader::new().with_file(path),
        None => SettingsLoader::new(),
    };
    let mut settings = loader.load()?;
    if let Some(base_url) = cli.base_url {
        settings.base_url = base_url;
    }

    init_tracing(&settings.log_filter)?;
    info!("Starting fleetgate v{}", env!("CARGO_PKG_VERSION"));

    let client = FleetClient::connect(settings).await?;
    client.events().subscribe(log_event);

    match cli.command {
        Command::Login {
            email,
            password,
            remember,
        } => {
            let credential = client.session().login(&email, &password, remember).await?;
            println!("Logged in ({} session)", credential.tier);
        }
        Command::Logout => {
            client.session().logout().await?;
            println!("Logged out");
        }
        Command::Status => {
            if client.session().is_authenticated() {
                println!("Authenticated against {}", client.settings().base_url);
            } else {
                println!("Not logged in");
            }
        }
        Command::Request {
            method,
            path,
            body,
            query,
        } => {
            let mut request = ApiRequest::new(method, path);
            if let Some(body) = body {
                let json = serde_json::from_str(&body).context("--body is not valid JSON")?;
                request = request.with_body(json);
            }
            for (name, value) in query {
                request = request.with_query(name, value);
            }

            let response = client.request(request).await?;
            println!("{}", response.text());
        }
    }

    Ok(())
}

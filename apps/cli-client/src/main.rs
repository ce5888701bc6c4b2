use std::net::SocketAddr;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use client_sdk::{DEFAULT_API_BASE, StoreApi, StoreClient};
use common::StoreEngine;
use dashboard::{ActionOutcome, Dashboard, StoreRow};
use tracing_subscriber::EnvFilter;

mod web;

#[derive(Debug, Parser)]
#[command(name = "storectl")]
#[command(about = "CLI and web dashboard for the store provisioning API")]
#[command(version)]
struct Cli {
    /// Base address of the provisioning API
    #[arg(long, env = "STORECTL_API_URL", default_value = DEFAULT_API_BASE)]
    api_url: String,

    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List every store known to the API
    List,
    /// Start provisioning a new store
    Create {
        name: String,
        #[arg(long, default_value_t = StoreEngine::WooCommerce)]
        engine: StoreEngine,
    },
    /// Remove a store
    Delete { name: String },
    /// Print the API health document
    Health,
    /// Serve the dashboard page
    ServeWeb {
        #[arg(long, default_value = "127.0.0.1:3000")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, matches!(cli.command, Commands::ServeWeb { .. }));

    let client = StoreClient::new(&cli.api_url);

    match cli.command {
        Commands::List => {
            let mut dashboard = Dashboard::new(client);
            dashboard
                .refresh()
                .await
                .with_context(|| format!("failed to list stores from {}", cli.api_url))?;
            print!("{}", format_table(dashboard.rows()));
        }
        Commands::Create { name, engine } => {
            let mut dashboard = Dashboard::new(client);
            let outcome = dashboard.create(&name, engine).await;
            report(&dashboard, outcome)?;
        }
        Commands::Delete { name } => {
            let mut dashboard = Dashboard::new(client);
            let outcome = dashboard.delete(&name).await;
            report(&dashboard, outcome)?;
        }
        Commands::Health => {
            let health = client
                .health()
                .await
                .with_context(|| format!("failed to contact {}", cli.api_url))?;
            println!("{}", serde_json::to_string_pretty(&health)?);
        }
        Commands::ServeWeb { bind } => {
            let bind_addr: SocketAddr = bind
                .parse()
                .with_context(|| format!("invalid bind address: {bind}"))?;
            web::serve(client, bind_addr).await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, serving: bool) {
    let filter = match (verbose, serving) {
        (0, false) => "warn",
        (0, true) => "info",
        (1, _) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn report<A: StoreApi>(dashboard: &Dashboard<A>, outcome: ActionOutcome) -> Result<()> {
    let Some(message) = dashboard.message() else {
        return Ok(());
    };

    if !outcome.is_completed() {
        bail!("{}", message.text);
    }

    if message.is_error() {
        eprintln!("{}", message.text);
    } else {
        println!("{}", message.text);
    }
    Ok(())
}

fn format_table(rows: &[StoreRow]) -> String {
    if rows.is_empty() {
        return "no stores\n".to_string();
    }

    let header = ["NAME", "ENGINE", "STATUS", "URL", "CREATED"];
    let cells = rows
        .iter()
        .map(|row| {
            [
                row.name.as_str(),
                row.engine.as_str(),
                row.status.as_str(),
                row.url.as_str(),
                row.created_at.as_str(),
            ]
        })
        .collect::<Vec<_>>();

    let mut widths = header.map(str::len);
    for line in &cells {
        for (width, cell) in widths.iter_mut().zip(line) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    for line in std::iter::once(&header).chain(cells.iter()) {
        let rendered = line
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(rendered.trim_end());
        out.push('\n');
    }
    out
}

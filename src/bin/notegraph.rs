//! Notegraph CLI: voice note server and graph inspection.
//!
//! Usage:
//!   notegraph serve [--config path] [--port port]
//!   notegraph stats [--config path] [--recent n]

use clap::{Parser, Subcommand};
use notegraph::{server, Config};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "notegraph",
    version,
    about = "Voice notes linked into a concept graph"
)]
struct Cli {
    /// Path to a YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Override the configured port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print graph and recording counts
    Stats {
        /// Also list the most recent recordings
        #[arg(long, default_value_t = 0)]
        recent: usize,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_stats(config: &Config, recent: usize) -> i32 {
    let (engine, recordings) = match server::open_stores(config) {
        Ok(stores) => stores,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    let stats = engine.stats();
    println!("nodes:      {}", stats.nodes);
    println!("edges:      {}", stats.edges);
    println!("vertices:   {}", stats.vertices);
    println!("concepts:   {}", stats.concepts);
    match recordings.count() {
        Ok(n) => println!("recordings: {}", n),
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    }

    if recent == 0 {
        return 0;
    }
    match recordings.list_recent(recent) {
        Ok(list) => {
            println!();
            println!("{:>6}  {:>6}  {:<20}  {}", "ID", "NODE", "CREATED", "TAGS");
            println!("{}", "-".repeat(72));
            for rec in list {
                let node = rec.node_id.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
                println!(
                    "{:>6}  {:>6}  {:<20}  {}",
                    rec.id,
                    node,
                    rec.created_at.format("%Y-%m-%d %H:%M:%S"),
                    rec.tags.join(", ")
                );
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn cmd_serve(mut config: Config, port: Option<u16>) -> i32 {
    if let Some(port) = port {
        config.server.port = port;
    }
    let pipeline = match server::build_pipeline(&config) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    match server::serve(&config, pipeline).await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "server exited");
            1
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let code = match cli.command {
        Commands::Serve { port } => cmd_serve(config, port).await,
        Commands::Stats { recent } => cmd_stats(&config, recent),
    };
    std::process::exit(code);
}

//! gitserve - a read-only HTTP/JSON view of git repositories
//!
//! Mirrors the GitHub v3 API shapes for commits, trees, blobs, tags, refs,
//! diffs, blame, contributors, and archives, over a flat directory of
//! repositories.
//!
//! # Usage
//! ```bash
//! gitserve /srv/git                      # serve every repo under /srv/git
//! gitserve /srv/git --port 8080
//! gitserve /srv/git --base-url https://git.example.com
//! ```

mod error;
mod git;
mod models;
mod routes;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use routes::AppState;

/// Serve git repositories as a read-only JSON API
#[derive(Parser)]
#[command(name = "gitserve")]
#[command(about = "A read-only HTTP/JSON view of git repositories", long_about = None)]
struct Cli {
    /// Directory whose immediate children are the served repositories
    #[arg(value_name = "REPO_ROOT")]
    root: PathBuf,

    /// Port to run the server on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Base URL used in links embedded in responses; defaults to the bind
    /// address
    #[arg(long)]
    base_url: Option<String>,

    /// Commit count returned by history listings when no limit is given
    #[arg(long, default_value = "50")]
    default_limit: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let root = match std::fs::canonicalize(&cli.root) {
        Ok(root) if root.is_dir() => root,
        _ => {
            eprintln!("✗ Repository root is not a directory: {}", cli.root.display());
            std::process::exit(1);
        }
    };

    let addr = format!("{}:{}", cli.host, cli.port);
    let base_url = cli
        .base_url
        .unwrap_or_else(|| format!("http://{}", addr))
        .trim_end_matches('/')
        .to_string();

    let state = AppState {
        root: Arc::new(root.clone()),
        base_url: Arc::new(base_url.clone()),
        default_limit: cli.default_limit,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(routes::create_router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("✗ Failed to bind to {}: {}", addr, e);
            eprintln!("  Try a different port with --port <PORT>");
            std::process::exit(1);
        }
    };

    println!();
    println!("  Repository root: {}", root.display());
    println!("  Server:          {}", base_url);
    println!();
    println!("  Press Ctrl+C to stop");
    println!();

    let shutdown = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        println!("\n  Shutting down...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

use clap::Parser;
use colored::*;
use star_history_server::cli::Cli;
use star_history_server::error::Result;
use star_history_server::github::build_http_client;
use star_history_server::server::{serve, AppState};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();

    // Initialize tracing with DEBUG level by default
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("debug"))
        )
        .init();

    let cli = Cli::parse();
    cli.validate()?;

    println!("{}", "Star History Server".bold().green());
    println!("{}\n", "=".repeat(50).dimmed());

    if cli.github_token.is_none() {
        println!(
            "{}",
            "No GITHUB_TOKEN configured; requests without an Authorization header are anonymous".yellow()
        );
    }

    let http = build_http_client(Duration::from_secs(cli.request_timeout))?;

    let state = AppState {
        http,
        api_base_url: cli.api_base_url.clone(),
        default_token: cli.github_token.clone(),
        max_request_amount: cli.max_request_amount,
        start_time: Instant::now(),
    };

    println!("📡 Upstream API: {}", cli.api_base_url);
    println!("📊 Max pages per timeline: {}", cli.max_request_amount);
    println!("\nPress Ctrl+C to stop the server\n");

    // Set up graceful shutdown
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        println!("\n🛑 Shutting down server...");
    };

    serve(state, &cli.listen_addr(), shutdown).await?;

    println!("✅ Server stopped");

    Ok(())
}

mod cli;
mod config;
mod dispatch;
mod errors;
mod extraction;
mod orchestrator;
mod output;
mod routes;
mod screening;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Cli, Command, ProfileArgs};
use crate::config::Config;
use crate::dispatch::{Dispatcher, DryRunDispatcher, HttpMailDispatcher};
use crate::orchestrator::{collect_documents, Screener};
use crate::output::Formatter;
use crate::routes::build_router;
use crate::screening::profile::ScreeningProfile;
use crate::state::AppState;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting screener v{}", env!("CARGO_PKG_VERSION"));

    // Taxonomy, tiers and templates are validated before any document is touched.
    let profile = load_profile(&cli.profile)?;
    info!(
        "Profile '{}': {} keyword group(s), tiers [{}]",
        profile.name,
        profile.taxonomy.group_count(),
        profile
            .policy
            .tiers()
            .iter()
            .map(|t| t.label.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let dispatcher = build_dispatcher(&config, cli.dry_run)?;
    let mut screener = Screener::new(
        profile,
        &config.recruiter_name,
        config.sender(),
        dispatcher,
    );
    if let Some(recipient) = &cli.recipient {
        screener = screener.with_recipient(recipient)?;
        info!("All messages will be sent to {}", recipient.trim());
    }

    match cli.command {
        Command::Batch(args) => {
            let paths = expand_inputs(&args.inputs)?;
            info!("{} résumé(s) to process", paths.len());
            let report = screener.run_batch(&paths).await;
            println!("{}", Formatter::new(args.json).format_report(&report)?);
        }
        Command::Analyze(args) => {
            let outcome = screener
                .process_file(&args.file)
                .await
                .with_context(|| format!("Failed to screen {}", args.file.display()))?;
            println!("{}", Formatter::new(args.json).format_outcome(&outcome)?);
        }
        Command::Serve(args) => {
            let state = AppState {
                screener: Arc::new(screener),
            };
            let app = build_router(state)
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive());

            let port = args.port.unwrap_or(config.port);
            let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
            info!("Listening on {addr}");

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

fn load_profile(args: &ProfileArgs) -> Result<ScreeningProfile> {
    let profile = match &args.profile {
        Some(path) => ScreeningProfile::load(path)?,
        None => ScreeningProfile::preset(&args.preset)?,
    };
    Ok(match args.min_hits {
        Some(min_hits) => profile.with_min_hits(min_hits)?,
        None => profile,
    })
}

fn build_dispatcher(config: &Config, dry_run: bool) -> Result<Arc<dyn Dispatcher>> {
    match (&config.relay, dry_run) {
        (Some(relay), false) => {
            let dispatcher = HttpMailDispatcher::new(relay.url.clone(), relay.api_key.clone())
                .context("Failed to build mail relay client")?;
            info!("Mail relay configured, sending from {}", config.sender());
            Ok(Arc::new(dispatcher))
        }
        (Some(_), true) => {
            info!("Dry run: messages will be logged, not sent");
            Ok(Arc::new(DryRunDispatcher))
        }
        (None, _) => {
            warn!("MAIL_RELAY_URL not set, messages will be logged, not sent");
            Ok(Arc::new(DryRunDispatcher))
        }
    }
}

/// Folders expand to the readable documents directly inside them; files pass through.
fn expand_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let found = collect_documents(input)
                .with_context(|| format!("Failed to list {}", input.display()))?;
            if found.is_empty() {
                warn!("No résumés found in {}", input.display());
            }
            paths.extend(found);
        } else {
            paths.push(input.clone());
        }
    }
    Ok(paths)
}

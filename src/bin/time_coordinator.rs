use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use library_loans::adapters::http::HttpTimeParticipant;
use library_loans::api::coordinator::router;
use library_loans::core::TimeParticipant;
use library_loans::utils::{logger, validation::Validate};
use library_loans::{CoordinatorArgs, TimeCoordinator};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CoordinatorArgs::parse();
    let config = args.load_config().context("failed to load configuration")?;

    logger::init_logger(&config.logging.format, args.verbose);
    tracing::info!("Time coordination service starting...");

    if let Err(e) = config.validate() {
        tracing::error!(
            "Configuration validation failed: {} (Category: {:?})",
            e,
            e.category()
        );
        std::process::exit(1);
    }

    let timeout = Duration::from_secs(config.coordinator.request_timeout_seconds);
    let mut participants: Vec<Arc<dyn TimeParticipant>> = Vec::new();
    for participant in &config.coordinator.participants {
        let client = HttpTimeParticipant::new(&participant.name, &participant.url, timeout)
            .with_context(|| format!("failed to build client for {}", participant.name))?;
        tracing::info!(
            "Registered participant {} at {}",
            participant.name,
            client.endpoint()
        );
        participants.push(Arc::new(client));
    }
    if participants.is_empty() {
        tracing::warn!("No participants configured; SetTime will only move the coordinator");
    }

    let start = config.clock_start()?.unwrap_or_else(Utc::now);
    let coordinator = Arc::new(TimeCoordinator::new(participants, start));

    let listener = tokio::net::TcpListener::bind(&config.coordinator.listen_addr)
        .await
        .with_context(|| format!("failed to listen on {}", config.coordinator.listen_addr))?;
    tracing::info!("Server listening on {}", config.coordinator.listen_addr);

    axum::serve(listener, router(coordinator))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("server error")?;

    Ok(())
}

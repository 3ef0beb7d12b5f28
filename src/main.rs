use anyhow::Context;
use clap::Parser;
use library_loans::adapters::dispatch::EmailLogConsumer;
use library_loans::api::loans::{router, LibraryState};
use library_loans::core::clock::clock_for;
use library_loans::utils::{logger, validation::Validate};
use library_loans::{
    DueSoonScanner, InMemoryLoanStore, InMemoryLog, LoanLedger, ScannerHandle, ServiceArgs,
    TimeControl,
};
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServiceArgs::parse();
    let config = args.load_config().context("failed to load configuration")?;

    logger::init_logger(&config.logging.format, args.verbose);
    tracing::info!("Loans service starting...");

    if let Err(e) = config.validate() {
        tracing::error!(
            "Configuration validation failed: {} (Category: {:?})",
            e,
            e.category()
        );
        std::process::exit(1);
    }

    let clock = clock_for(config.clock.simulate, config.clock_start()?);

    let store = Arc::new(InMemoryLoanStore::new());
    let seeded = store.load_seed(&config.seed).await?;
    tracing::info!("Loaded {} seed rows into the loan store", seeded);

    let log = Arc::new(InMemoryLog::new(config.scanner.topic.clone()));
    let (consumer_shutdown, consumer_stopped) = watch::channel(false);
    let consumer = EmailLogConsumer::new((*log).clone(), config.scanner.consumer_batch_size)
        .spawn(consumer_stopped);

    let scanner = DueSoonScanner::new(
        store.clone(),
        log.clone(),
        clock.clone(),
        config.scanner.due_soon_days,
    );
    tracing::info!(
        "Will check for due loans every {} seconds",
        config.scanner.interval_seconds
    );
    let scanner = ScannerHandle::spawn(scanner, config.scan_interval());

    let state = Arc::new(LibraryState {
        service_name: config.service.name.clone(),
        ledger: LoanLedger::new(store.clone(), clock.clone(), config.ledger_policy()),
        time_control: TimeControl::new(config.service.name.clone(), clock),
    });

    let listener = tokio::net::TcpListener::bind(&config.service.listen_addr)
        .await
        .with_context(|| format!("failed to listen on {}", config.service.listen_addr))?;
    tracing::info!("Server listening on {}", config.service.listen_addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("server error")?;

    tracing::info!("Loans service shutting down...");
    scanner.stop().await;
    let _ = consumer_shutdown.send(true);
    let _ = consumer.await;

    Ok(())
}

//! Risk Scoring Engine - Main Entry Point
//!
//! Consumes scoring requests from NATS, scores them, and publishes the
//! verdicts. Requests are processed in parallel up to the configured
//! worker count.

use anyhow::{Context, Result};
use futures::StreamExt;
use risk_scoring_engine::{
    config::{AppConfig, LoggingConfig},
    consumer::{decode_request, RequestConsumer},
    metrics::{MetricsReporter, ScoringMetrics},
    producer::ResultProducer,
    ScoringEngine, ScoringError, StaticReputationLookup,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!("risk_scoring_engine={}", logging.level))
    })?;

    if logging.format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Configuration first so logging honours it
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Risk Scoring Engine");
    info!(
        "Risk levels: medium>={:.2}, high>={:.2}, critical>={:.2}; lookup timeout {} ms",
        config.engine.risk_levels.medium,
        config.engine.risk_levels.high,
        config.engine.risk_levels.critical,
        config.engine.network.lookup_timeout_ms
    );

    let metrics = Arc::new(ScoringMetrics::new());

    let lookup = Arc::new(StaticReputationLookup::new(
        config.engine.network.reputation.clone(),
    ));
    let engine = Arc::new(
        ScoringEngine::new(&config.engine, lookup)
            .context("Failed to build scoring engine")?
            .with_metrics(metrics.clone()),
    );
    info!(
        seed = ?engine.model().seed(),
        tenants = engine.signatures().tenant_count(),
        "Scoring engine initialized"
    );

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = RequestConsumer::new(client.clone(), &config.nats.request_subject);
    let producer = Arc::new(ResultProducer::new(client.clone(), &config.nats.result_subject));

    let num_workers = config.pipeline.workers.max(1);
    info!(
        "Listening on {} with {} parallel workers, publishing to {}",
        consumer.subject(),
        num_workers,
        producer.subject()
    );

    // Semaphore to limit concurrent scoring
    let semaphore = Arc::new(Semaphore::new(num_workers));
    let processed_count = Arc::new(AtomicU64::new(0));

    let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.metrics_interval_secs);
    tokio::spawn(reporter.start());

    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .context("Worker semaphore closed")?;

        let engine = engine.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();
        let processed_count = processed_count.clone();

        tokio::spawn(async move {
            let request = match decode_request(&message.payload) {
                Ok(request) => request,
                Err(e) => {
                    metrics.record_rejected();
                    warn!(error = %e, "Dropping undecodable request");
                    drop(permit);
                    return;
                }
            };

            match engine.analyze(&request).await {
                Ok(result) => {
                    if let Err(e) = producer.publish(&result, message.reply.as_deref()).await {
                        error!(
                            session_id = %result.session_id,
                            error = %e,
                            "Failed to publish scoring result"
                        );
                    }

                    let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
                    if count % 100 == 0 {
                        let stats = metrics.get_processing_stats();
                        info!(
                            processed = count,
                            throughput = format!("{:.1} req/s", metrics.get_throughput()),
                            avg_latency_us = stats.mean_us,
                            "Processing milestone"
                        );
                    }
                }
                Err(ScoringError::Validation(reason)) => {
                    warn!(
                        user_id = request.user_id.as_deref().unwrap_or("-"),
                        reason = %reason,
                        "Rejected invalid scoring request"
                    );
                }
                Err(e) => {
                    error!(error = %e, "Scoring failed");
                }
            }

            drop(permit);
        });
    }

    info!("Scoring engine shutting down...");
    metrics.print_summary();

    Ok(())
}

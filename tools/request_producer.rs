//! Scoring Request Producer
//!
//! Generates legitimate and suspicious scoring requests and publishes them
//! to NATS for end-to-end testing of the scoring service.

use rand::Rng;
use risk_scoring_engine::types::request::{BehavioralData, PointerSample, ScoringRequest};
use std::time::Duration;
use tracing::{info, warn};

const NARRATIONS: &[&str] = &["Rent", "School fees", "Groceries", "Salary advance", "Family support"];

const SUSPICIOUS_NARRATIONS: &[&str] = &[
    "URGENT: claim your lottery prize now",
    "Inheritance release fee - barrister",
    "Investment double your money guaranteed",
    "Customs clearance for my package, dear",
];

/// Request generator for testing
struct RequestGenerator {
    rng: rand::rngs::ThreadRng,
    counter: u64,
}

impl RequestGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            counter: 0,
        }
    }

    /// Daytime request from a settled session with history
    fn generate_legitimate(&mut self) -> ScoringRequest {
        self.counter += 1;
        let amount = (self.rng.gen_range(1_000.0..80_000.0_f64) * 100.0).round() / 100.0;
        let ip = format!(
            "41.{}.{}.{}",
            self.rng.gen_range(58..220),
            self.rng.gen_range(0..255),
            self.rng.gen_range(1..255)
        );
        let narration = self.random_choice(NARRATIONS);

        let behavioral = BehavioralData {
            session_duration: self.rng.gen_range(120.0..1800.0),
            previous_transaction_count: self.rng.gen_range(0..4),
            avg_transaction_amount: self.rng.gen_range(5_000.0..60_000.0),
            hour_of_day: self.rng.gen_range(8..20),
            day_of_week: self.rng.gen_range(0..7),
            typing_pattern: (0..12).map(|_| self.rng.gen_range(80.0..220.0)).collect(),
            pointer_movements: self.pointer_trail(20),
        };

        let account = self.account_number();
        self.tag(
            ScoringRequest::new(amount, &account)
                .with_narration(narration)
                .with_network(&ip, "Mozilla/5.0 (Linux; Android 13)")
                .with_behavior(behavioral),
        )
    }

    /// Night-time, short session, anonymized origin and scam narration
    fn generate_suspicious(&mut self) -> ScoringRequest {
        self.counter += 1;
        let amount = *self.random_choice(&[419.0, 100_000.0, 500_000.0, 2_000_000.0, 5_500_000.0]);
        let ip = format!(
            "{}{}.{}",
            self.random_choice(&["185.220.", "45.142.", "198.98."]),
            self.rng.gen_range(0..255),
            self.rng.gen_range(1..255)
        );
        let user_agent = self.random_choice(&["Mozilla/5.0", "FreeVPN/3.2", "ProxyBrowser/1.0"]);
        let narration = self.random_choice(SUSPICIOUS_NARRATIONS);

        let behavioral = BehavioralData {
            session_duration: self.rng.gen_range(5.0..30.0),
            previous_transaction_count: self.rng.gen_range(3..12),
            avg_transaction_amount: self.rng.gen_range(2_000.0..20_000.0),
            hour_of_day: self.rng.gen_range(0..6),
            day_of_week: self.rng.gen_range(0..7),
            typing_pattern: (0..4).map(|_| self.rng.gen_range(5.0..40.0)).collect(),
            pointer_movements: Vec::new(),
        };

        let account = self.account_number();
        self.tag(
            ScoringRequest::new(amount, &account)
                .with_narration(narration)
                .with_network(&ip, user_agent)
                .with_behavior(behavioral),
        )
    }

    fn tag(&self, mut request: ScoringRequest) -> ScoringRequest {
        request.user_id = Some(format!("user_{:08}", self.counter));
        request
    }

    fn account_number(&mut self) -> String {
        format!("{:010}", self.rng.gen_range(0..10_000_000_000u64))
    }

    fn pointer_trail(&mut self, points: usize) -> Vec<PointerSample> {
        let (mut x, mut y) = (self.rng.gen_range(0.0..400.0), self.rng.gen_range(0.0..800.0));
        (0..points)
            .map(|i| {
                x += self.rng.gen_range(-15.0..15.0);
                y += self.rng.gen_range(-15.0..15.0);
                PointerSample {
                    x,
                    y,
                    timestamp: i as f64 * 16.0,
                }
            })
            .collect()
    }

    fn random_choice<'a, T>(&mut self, choices: &'a [T]) -> &'a T {
        &choices[self.rng.gen_range(0..choices.len())]
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("request_producer=info".parse()?),
        )
        .init();

    info!("Starting Scoring Request Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("transactions.scoring");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let fraud_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.1);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);
    let fraud_rate = fraud_rate.clamp(0.0, 1.0);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        fraud_rate = fraud_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, fraud_rate, delay_ms).await;
        }
    };

    let mut generator = RequestGenerator::new();
    let mut rng = rand::thread_rng();
    let mut legitimate_count = 0;
    let mut suspicious_count = 0;

    info!("Starting to publish {} requests...", count);

    for i in 0..count {
        let request = if rng.gen_bool(fraud_rate) {
            suspicious_count += 1;
            generator.generate_suspicious()
        } else {
            legitimate_count += 1;
            generator.generate_legitimate()
        };

        let payload = serde_json::to_vec(&request)?;
        client.publish(subject.to_string(), payload.into()).await?;

        if (i + 1) % 10 == 0 {
            info!(
                "Published {}/{} requests ({} legitimate, {} suspicious)",
                i + 1,
                count,
                legitimate_count,
                suspicious_count
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    client.flush().await?;
    info!(
        "Completed! Published {} requests ({} legitimate, {} suspicious)",
        count, legitimate_count, suspicious_count
    );

    Ok(())
}

async fn run_dry_mode(count: u64, fraud_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = RequestGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let request = if rng.gen_bool(fraud_rate) {
            generator.generate_suspicious()
        } else {
            generator.generate_legitimate()
        };

        if (i + 1) % 10 == 0 || i == 0 {
            let json = serde_json::to_string_pretty(&request)?;
            info!("Sample request {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}

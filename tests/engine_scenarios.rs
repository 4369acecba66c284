//! End-to-end scoring scenarios against mocked reputation lookups

use async_trait::async_trait;
use risk_scoring_engine::config::EngineConfig;
use risk_scoring_engine::feature_extractor::FEATURE_COUNT;
use risk_scoring_engine::models::pattern::{DenseLayer, PatternScoringModel};
use risk_scoring_engine::rules::signatures::{AmountSignatureTable, SignatureRule};
use risk_scoring_engine::rules::transaction::TransactionRules;
use risk_scoring_engine::types::network::ReputationRecord;
use risk_scoring_engine::types::request::{BehavioralData, ScoringRequest};
use risk_scoring_engine::{
    Decision, Flag, LookupError, ReputationLookup, RiskLevel, ScoringEngine, ScoringError,
    ScoringResult,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct MockLookup(ReputationRecord);

#[async_trait]
impl ReputationLookup for MockLookup {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn lookup(&self, _ip: &str) -> Result<ReputationRecord, LookupError> {
        Ok(self.0.clone())
    }
}

struct FailingLookup;

#[async_trait]
impl ReputationLookup for FailingLookup {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn lookup(&self, _ip: &str) -> Result<ReputationRecord, LookupError> {
        Err(LookupError::Unavailable("provider returned 503".to_string()))
    }
}

struct PanickingLookup;

#[async_trait]
impl ReputationLookup for PanickingLookup {
    fn name(&self) -> &'static str {
        "panicking"
    }

    async fn lookup(&self, _ip: &str) -> Result<ReputationRecord, LookupError> {
        panic!("provider client bug");
    }
}

/// Never answers; records when the pending lookup is dropped
struct HangingLookup {
    dropped: Arc<AtomicBool>,
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReputationLookup for HangingLookup {
    fn name(&self) -> &'static str {
        "hanging"
    }

    async fn lookup(&self, _ip: &str) -> Result<ReputationRecord, LookupError> {
        let _guard = DropFlag(self.dropped.clone());
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(ReputationRecord::default())
    }
}

fn clean_record() -> ReputationRecord {
    ReputationRecord {
        country: Some("NG".to_string()),
        asn: Some("AS36924".to_string()),
        ..ReputationRecord::default()
    }
}

fn vpn_record() -> ReputationRecord {
    ReputationRecord {
        is_vpn: true,
        ..clean_record()
    }
}

fn engine_with(lookup: impl ReputationLookup + 'static) -> ScoringEngine {
    ScoringEngine::new(&EngineConfig::default(), Arc::new(lookup)).unwrap()
}

/// Single output layer with zero weights: scores sigmoid(bias) for any input
fn constant_model(bias: f64) -> PatternScoringModel {
    PatternScoringModel::from_layers(vec![DenseLayer::new(
        vec![vec![0.0]; FEATURE_COUNT],
        vec![bias],
    )])
    .unwrap()
}

fn behavior(session_secs: f64, previous: u32, hour: i32, day: i32) -> BehavioralData {
    BehavioralData {
        session_duration: session_secs,
        previous_transaction_count: previous,
        avg_transaction_amount: 80_000.0,
        hour_of_day: hour,
        day_of_week: day,
        typing_pattern: vec![120.0, 140.0, 110.0, 150.0],
        pointer_movements: Vec::new(),
    }
}

fn assert_well_formed(result: &ScoringResult) {
    assert!((0.0..=100.0).contains(&result.risk_score), "{}", result.risk_score);
    assert!((0.0..=1.0).contains(&result.confidence), "{}", result.confidence);
    assert!(!result.recommendations.is_empty());
    assert!(!result.session_id.is_empty());
}

fn without_volatile_fields(mut result: ScoringResult) -> ScoringResult {
    result.session_id.clear();
    result.processing_time_ms = 0;
    result
}

fn at_time(mut request: ScoringRequest, hour: i32, day: i32) -> ScoringRequest {
    request.behavioral.hour_of_day = hour;
    request.behavioral.day_of_week = day;
    request
}

#[tokio::test]
async fn test_ordinary_daytime_transfer_is_approved() {
    let engine = engine_with(MockLookup(clean_record()));
    let request = at_time(
        ScoringRequest::new(100_000.0, "0123456789").with_network("41.58.12.9", "Mozilla/5.0"),
        14,
        2,
    );

    let result = engine.analyze(&request).await.unwrap();

    assert_well_formed(&result);
    assert!(matches!(result.risk_level, RiskLevel::Low | RiskLevel::Medium));
    assert_eq!(result.decision, Decision::Approve);
    assert!(!result.has_flag(Flag::MlHighRisk));
    assert!(!result.has_flag(Flag::MlCriticalRisk));
    assert!(!result.has_flag(Flag::VpnDetected));
    assert!(!result.has_flag(Flag::AnalysisError));
    assert!(result.breakdown.unwrap().model <= 0.7);
}

#[tokio::test]
async fn test_night_time_vpn_prize_transfer_is_escalated() {
    let engine = engine_with(MockLookup(vpn_record()));
    let request = at_time(
        ScoringRequest::new(5_000_000.0, "0123456789")
            .with_narration("URGENT: you are the winner of our prize draw")
            .with_network("185.220.101.4", "Mozilla/5.0"),
        2,
        3,
    );

    let result = engine.analyze(&request).await.unwrap();

    assert_well_formed(&result);
    assert!(result.risk_level >= RiskLevel::High, "{:?}", result);
    assert!(matches!(result.decision, Decision::Review | Decision::Block));
    assert!(result.has_flag(Flag::VpnDetected));
    assert!(result.has_flag(Flag::HighValue));
    assert!(result.has_flag(Flag::RoundAmount));
    assert!(result.has_flag(Flag::UnusualHours));
    assert!(result.has_flag(Flag::MlHighRisk));

    let breakdown = result.breakdown.unwrap();
    assert!(breakdown.model > 0.85, "{}", breakdown.model);
    assert_eq!(breakdown.network, 0.3);
    assert!((breakdown.behavioral - 0.2).abs() < 1e-9);
    assert_eq!(breakdown.transaction, 1.0);
}

#[tokio::test]
async fn test_failing_lookup_uses_safe_default() {
    let engine = engine_with(FailingLookup);
    let request = ScoringRequest::new(42_000.0, "0123456789").with_network("41.58.12.9", "");

    let result = engine.analyze(&request).await.unwrap();

    assert_well_formed(&result);
    assert!(!result.has_flag(Flag::ThreatIp));
    assert!(!result.has_flag(Flag::AnalysisError));

    let breakdown = result.breakdown.unwrap();
    assert!(breakdown.network_fallback);
    assert_eq!(breakdown.network, 0.5);
    assert_eq!(breakdown.country, "Unknown");
}

#[tokio::test]
async fn test_panicking_lookup_uses_safe_default() {
    let engine = Arc::new(engine_with(PanickingLookup));
    let request = ScoringRequest::new(42_000.0, "0123456789").with_network("41.58.12.9", "");

    // Spawned so that an escaping panic would surface as a JoinError
    let result = tokio::spawn({
        let engine = engine.clone();
        async move { engine.analyze(&request).await }
    })
    .await
    .unwrap()
    .unwrap();

    assert_well_formed(&result);
    assert!(!result.has_flag(Flag::AnalysisError));
    assert!(!result.has_flag(Flag::ThreatIp));

    let breakdown = result.breakdown.unwrap();
    assert!(breakdown.network_fallback);
    assert_eq!(breakdown.network, 0.5);
}

#[tokio::test]
async fn test_missing_optional_telemetry_still_scores() {
    let payload = r#"{
        "transactionData": {
            "amount": 35000,
            "recipientAccountNumber": "0123456789",
            "recipientBankCode": "044"
        },
        "userContext": {
            "ipAddress": "41.58.12.9",
            "userAgent": "Mozilla/5.0"
        },
        "behavioralData": {
            "sessionDuration": 240,
            "previousTransactionCount": 1,
            "avgTransactionAmount": 0,
            "timeOfDay": 11,
            "dayOfWeek": 4
        }
    }"#;
    let request: ScoringRequest = serde_json::from_str(payload).unwrap();
    let engine = engine_with(MockLookup(clean_record()));

    let result = engine.analyze(&request).await.unwrap();

    assert_well_formed(&result);
    assert!(!result.has_flag(Flag::AnalysisError));
    let breakdown = result.breakdown.unwrap();
    assert!(breakdown.model.is_finite());
    assert!((0.0..=1.0).contains(&breakdown.model));
}

#[tokio::test]
async fn test_identical_requests_give_identical_results() {
    let first = engine_with(MockLookup(vpn_record()));
    let second = engine_with(MockLookup(vpn_record()));
    let request = ScoringRequest::new(250_000.0, "0123456789")
        .with_narration("investment opportunity")
        .with_network("45.142.1.9", "Mozilla/5.0")
        .with_behavior(behavior(95.0, 4, 22, 5));

    let a = first.analyze(&request).await.unwrap();
    let b = first.analyze(&request).await.unwrap();
    let c = second.analyze(&request).await.unwrap();

    assert_ne!(a.session_id, b.session_id);
    assert_eq!(without_volatile_fields(a.clone()), without_volatile_fields(b));
    assert_eq!(without_volatile_fields(a), without_volatile_fields(c));
}

#[tokio::test]
async fn test_lookup_outage_never_rates_below_medium() {
    let engine = engine_with(FailingLookup).with_model(constant_model(0.0));

    for amount in [500.0, 12_345.0, 99_999.0] {
        let request = ScoringRequest::new(amount, "0123456789");
        let result = engine.analyze(&request).await.unwrap();

        // 0.5 * 0.40 + 0.5 * 0.25
        assert_eq!(result.risk_score, 32.5);
        assert!(result.risk_level >= RiskLevel::Medium);
    }
}

#[tokio::test]
async fn test_signature_amounts_raise_transaction_score() {
    let engine = engine_with(MockLookup(clean_record()));

    for amount in [419.0, 4_190.0, 41_900.0, 419_000.0] {
        let request = ScoringRequest::new(amount, "0123456789");
        let result = engine.analyze(&request).await.unwrap();
        let breakdown = result.breakdown.clone().unwrap();

        assert!(breakdown.signature_suspicion >= 0.9, "{amount}");
        assert!(breakdown.transaction > 0.0, "{amount}");
        assert!(result.has_flag(Flag::SignatureAmount));
    }
}

#[tokio::test]
async fn test_extreme_inputs_stay_in_bounds() {
    let engine = engine_with(MockLookup(vpn_record()));
    let mut odd = behavior(-40.0, 9_999, 99, -3);
    odd.avg_transaction_amount = f64::NAN;
    odd.typing_pattern = vec![f64::INFINITY, 3.0];

    let requests = [
        ScoringRequest::new(0.01, "1"),
        ScoringRequest::new(1e12, "0123456789").with_behavior(odd.clone()),
        ScoringRequest::new(7_500_000.0, "0123456789")
            .with_narration("lottery inheritance beneficiary urgent payment invoice bitcoin")
            .with_behavior(odd),
    ];

    for request in &requests {
        let result = engine.analyze(request).await.unwrap();
        assert_well_formed(&result);
    }
}

#[tokio::test]
async fn test_missing_amount_is_a_validation_error() {
    let engine = engine_with(MockLookup(clean_record()));

    let result = engine.analyze(&ScoringRequest::new(0.0, "0123456789")).await;
    assert!(matches!(result, Err(ScoringError::Validation(_))));

    let result = engine.analyze(&ScoringRequest::new(f64::NAN, "0123456789")).await;
    assert!(matches!(result, Err(ScoringError::Validation(_))));
}

#[test]
fn test_amount_contribution_is_monotonic() {
    let rules = TransactionRules::default();
    let amounts = [10.0, 50_000.0, 999_999.0, 1_000_001.0, 4_999_999.0, 5_000_001.0, 1e10];

    for pair in amounts.windows(2) {
        assert!(rules.amount_score(pair[1]) >= rules.amount_score(pair[0]));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_batch_latency() {
    let engine = Arc::new(engine_with(MockLookup(clean_record())));

    let handles: Vec<_> = (0..50)
        .map(|i| {
            let engine = engine.clone();
            tokio::spawn(async move {
                let request = ScoringRequest::new(1_000.0 + f64::from(i) * 250.0, "0123456789");
                engine.analyze(&request).await
            })
        })
        .collect();

    let mut times = Vec::new();
    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        times.push(result.processing_time_ms);
    }
    times.sort_unstable();

    assert_eq!(times.len(), 50);
    assert!(times[times.len() / 2] < 500, "median {} ms", times[times.len() / 2]);
}

#[tokio::test]
async fn test_dropping_analysis_cancels_lookup() {
    let dropped = Arc::new(AtomicBool::new(false));
    let mut config = EngineConfig::default();
    config.network.lookup_timeout_ms = 3_600_000;
    let engine = ScoringEngine::new(
        &config,
        Arc::new(HangingLookup {
            dropped: dropped.clone(),
        }),
    )
    .unwrap();

    let request = ScoringRequest::new(10_000.0, "0123456789");
    let outcome = tokio::time::timeout(Duration::from_millis(50), engine.analyze(&request)).await;

    assert!(outcome.is_err());
    assert!(dropped.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_tenant_signature_table_swap() {
    let engine = engine_with(MockLookup(clean_record()));
    let request = ScoringRequest::new(5_000.0, "0123456789");
    let tenant_request = request.clone().with_tenant("gh-bank");

    let before = engine.analyze(&tenant_request).await.unwrap();
    assert!(!before.has_flag(Flag::SignatureAmount));

    engine.signatures().set_tenant_table(
        "GH-Bank",
        AmountSignatureTable::new(
            vec![SignatureRule::Exact {
                amounts: vec![5_000.0],
                score: 0.97,
            }],
            0.3,
        ),
    );

    let tenant = engine.analyze(&tenant_request).await.unwrap();
    assert!(tenant.has_flag(Flag::SignatureAmount));
    assert_eq!(tenant.breakdown.unwrap().signature_suspicion, 0.97);

    let other = engine.analyze(&request).await.unwrap();
    assert!(!other.has_flag(Flag::SignatureAmount));

    assert!(engine.signatures().remove_tenant_table("Gh-Bank"));
    let after = engine.analyze(&tenant_request).await.unwrap();
    assert!(!after.has_flag(Flag::SignatureAmount));
}

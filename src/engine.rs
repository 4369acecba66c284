//! Scoring engine: runs every analyzer for a request and combines the
//! results into one verdict.

use crate::clock::{Clock, IdGenerator, MonotonicClock, UuidGenerator};
use crate::config::EngineConfig;
use crate::error::{Result, ScoringError};
use crate::feature_extractor::FeatureExtractor;
use crate::metrics::ScoringMetrics;
use crate::models::aggregator::RiskAggregator;
use crate::models::pattern::PatternScoringModel;
use crate::network::lookup::ReputationLookup;
use crate::network::NetworkAnalyzer;
use crate::policy::{DecisionPolicy, RiskSignals};
use crate::rules::behavioral::BehavioralRules;
use crate::rules::signatures::SignatureRegistry;
use crate::rules::transaction::TransactionRules;
use crate::types::request::ScoringRequest;
use crate::types::result::{ScoreBreakdown, ScoringResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Real-time transaction risk scoring engine.
///
/// Safe to share across tasks; every call to [`analyze`](Self::analyze) is
/// independent.
pub struct ScoringEngine {
    extractor: FeatureExtractor,
    model: Arc<PatternScoringModel>,
    network: NetworkAnalyzer,
    behavioral_rules: BehavioralRules,
    transaction_rules: TransactionRules,
    aggregator: RiskAggregator,
    policy: DecisionPolicy,
    signatures: Arc<SignatureRegistry>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    metrics: Option<Arc<ScoringMetrics>>,
}

impl ScoringEngine {
    /// Build an engine from configuration and a reputation lookup.
    pub fn new(config: &EngineConfig, lookup: Arc<dyn ReputationLookup>) -> Result<Self> {
        config.validate()?;

        let signatures = Arc::new(SignatureRegistry::with_tenants(
            config.signatures.clone(),
            config.tenant_signatures.clone(),
        ));

        Ok(Self {
            extractor: FeatureExtractor::new(config.features.clone(), signatures.clone()),
            model: Arc::new(PatternScoringModel::seeded(&config.model)),
            network: NetworkAnalyzer::new(lookup, config.network.clone()),
            behavioral_rules: BehavioralRules::new(config.behavioral_rules.clone()),
            transaction_rules: TransactionRules::new(config.transaction_rules.clone()),
            aggregator: RiskAggregator::new(config.weights.clone(), config.risk_levels.clone())?,
            policy: DecisionPolicy::new(config.decision.clone()),
            signatures,
            clock: Arc::new(MonotonicClock),
            ids: Arc::new(UuidGenerator),
            metrics: None,
        })
    }

    /// Replace the seeded model, e.g. with weights loaded elsewhere.
    pub fn with_model(mut self, model: PatternScoringModel) -> Self {
        self.model = Arc::new(model);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<ScoringMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Signature tables, replaceable while the engine is serving.
    pub fn signatures(&self) -> &Arc<SignatureRegistry> {
        &self.signatures
    }

    pub fn model(&self) -> &PatternScoringModel {
        &self.model
    }

    /// Score one request.
    ///
    /// Only a malformed request produces an error. Lookup failures degrade
    /// to the cautious network default and internal model failures produce
    /// the fail-safe verdict. Dropping the future abandons the reputation
    /// lookup.
    pub async fn analyze(&self, request: &ScoringRequest) -> Result<ScoringResult> {
        let started = self.clock.now();

        if let Err(e) = request.validate() {
            if let Some(metrics) = &self.metrics {
                metrics.record_rejected();
            }
            return Err(e);
        }

        let session_id = self.ids.next_id();
        let features = self.extractor.extract(request);

        let model = Arc::clone(&self.model);
        let model_task = tokio::task::spawn_blocking(move || {
            let scoring_started = Instant::now();
            (model.score(&features), scoring_started.elapsed())
        });

        let network_started = Instant::now();
        let network_task = async {
            let assessment = self
                .network
                .analyze(
                    &request.user_context.ip_address,
                    &request.user_context.user_agent,
                )
                .await;
            (assessment, network_started.elapsed())
        };

        let (model_outcome, (network, network_time)) = tokio::join!(model_task, network_task);

        let model_score = match model_outcome {
            Ok((score, model_time)) if score.is_finite() => {
                self.record_component("model", model_time);
                score
            }
            Ok((score, _)) => {
                let cause = ScoringError::NonFiniteScore(score);
                return Ok(self.fail_safe(session_id, started, &cause));
            }
            Err(e) => return Ok(self.fail_safe(session_id, started, &e)),
        };
        self.record_component("network", network_time);

        let behavioral = &request.behavioral;
        let transaction = &request.transaction;
        let signature_suspicion = features.amount_distribution();

        let behavioral_score = self.behavioral_rules.score(behavioral);
        let transaction_score = self.transaction_rules.score(transaction, signature_suspicion);

        let combined =
            self.aggregator
                .aggregate(model_score, &network, behavioral_score, transaction_score);
        let risk_level = self.aggregator.risk_level(combined);
        let decision = self.policy.decide(risk_level, combined);

        let flags = self.policy.flags(&RiskSignals {
            model_score,
            network: &network,
            session_too_short: self.behavioral_rules.is_session_too_short(behavioral),
            high_velocity: self.behavioral_rules.is_high_velocity(behavioral),
            high_value: self.transaction_rules.is_high_value(transaction.amount),
            round_amount: self.transaction_rules.is_round_amount(transaction.amount),
            unusual_hours: self.behavioral_rules.is_unusual_hour(behavioral),
            signature_amount: self.transaction_rules.is_signature_amount(signature_suspicion),
        });
        let recommendations = self.policy.recommendations(&flags, risk_level);
        let confidence = self.policy.confidence(model_score, &network);

        debug!(
            session_id = %session_id,
            model = model_score,
            network = network.normalized_risk(),
            behavioral = behavioral_score,
            transaction = transaction_score,
            combined,
            "Component scores"
        );

        let result = ScoringResult {
            risk_score: RiskAggregator::display_score(combined),
            risk_level,
            decision,
            confidence,
            flags,
            recommendations,
            processing_time_ms: self.elapsed_ms(started),
            session_id,
            breakdown: Some(ScoreBreakdown {
                model: model_score,
                network: network.normalized_risk(),
                behavioral: behavioral_score,
                transaction: transaction_score,
                signature_suspicion,
                network_fallback: network.fallback,
                country: network.country.clone(),
            }),
        };

        if let Some(metrics) = &self.metrics {
            if network.fallback {
                metrics.record_lookup_fallback();
            }
            metrics.record_result(self.clock.now().saturating_duration_since(started), &result);
        }

        info!(
            session_id = %result.session_id,
            user_id = request.user_id.as_deref().unwrap_or("-"),
            risk_score = result.risk_score,
            risk_level = %result.risk_level,
            decision = %result.decision,
            flags = ?result.flags,
            processing_time_ms = result.processing_time_ms,
            "Transaction scored"
        );

        Ok(result)
    }

    fn fail_safe(
        &self,
        session_id: String,
        started: Instant,
        cause: &dyn std::error::Error,
    ) -> ScoringResult {
        error!(
            session_id = %session_id,
            error = %cause,
            "Risk analysis failed, returning fail-safe verdict"
        );

        let result = ScoringResult::fail_safe(session_id, self.elapsed_ms(started));
        if let Some(metrics) = &self.metrics {
            metrics.record_fail_safe();
            metrics.record_result(self.clock.now().saturating_duration_since(started), &result);
        }
        result
    }

    fn record_component(&self, component: &'static str, duration: Duration) {
        if let Some(metrics) = &self.metrics {
            metrics.record_component_time(component, duration);
        }
    }

    fn elapsed_ms(&self, started: Instant) -> u64 {
        self.clock.now().saturating_duration_since(started).as_millis() as u64
    }
}

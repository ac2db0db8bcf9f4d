//! Two-phase analysis pipeline
//!
//! The primary phase validates retrieved reference scenarios against the
//! target and expands on them; the secondary phase scans for anything the
//! primary phase did not report. Stage failures inside a phase are recorded as
//! diagnostics instead of aborting the request.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use tracing::warn;

use super::extract::extract;
use super::prompts::build_prompt;
use super::prompts::PromptMode;
use super::prompts::PromptOptions;
use super::prompts::ZERO_BASE_SOURCE;
use super::references::ReferenceLibrary;
use super::retriever::Retriever;
use crate::config::AppConfig;
use crate::config::LlmConfig;
use crate::embeddings::Embedder;
use crate::embeddings::EmbeddingClient;
use crate::errors::Result;
use crate::errors::VulnRagError;
use crate::index::QdrantIndex;
use crate::index::SimilarityIndex;
use crate::llm::CompletionRequest;
use crate::llm::LanguageModel;
use crate::llm::LlmClient;
use crate::models::AnalysisOutcome;
use crate::models::AnalysisReport;
use crate::models::Finding;
use crate::models::InfrastructureDescription;
use crate::models::ParsedResult;
use crate::models::Phase;
use crate::models::PhaseDiagnostic;
use crate::models::ReferenceMatch;
use crate::models::SeveritySummary;
use crate::models::TokenUsage;

/// One analysis request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub infrastructure: Value,
    /// Overrides `retrieval.threshold`
    #[serde(default)]
    pub threshold: Option<f32>,
    /// Overrides `index.top_k`
    #[serde(default)]
    pub top_k: Option<usize>,
}

impl AnalysisRequest {
    pub fn new(infrastructure: Value) -> Self {
        Self {
            infrastructure,
            threshold: None,
            top_k: None,
        }
    }
}

/// Retrieval-only result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub threshold: f32,
    pub qualified: Vec<ReferenceMatch>,
    pub rejected: Vec<ReferenceMatch>,
}

enum PhaseState {
    Skipped,
    Failed,
    Parsed(ParsedResult),
}

impl PhaseState {
    fn parsed(&self) -> Option<&ParsedResult> {
        match self {
            Self::Parsed(result) => Some(result),
            _ => None,
        }
    }
}

#[derive(Default)]
struct PhaseLog {
    diagnostics: Vec<PhaseDiagnostic>,
    usage: TokenUsage,
}

impl PhaseLog {
    fn record(&mut self, phase: Phase, error: &VulnRagError) {
        warn!(%phase, kind = error.kind(), error = %error, "Phase degraded");
        self.diagnostics.push(PhaseDiagnostic {
            phase,
            kind: error.kind().to_string(),
            message: error.to_string(),
            raw_output: None,
        });
    }
}

/// Retrieval-augmented vulnerability analysis
pub struct AnalysisPipeline {
    retriever: Retriever,
    llm: Arc<dyn LanguageModel>,
    references: ReferenceLibrary,
    llm_config: LlmConfig,
    threshold: f32,
    top_k: usize,
    phase_timeout: Duration,
    request_deadline: Duration,
}

impl AnalysisPipeline {
    /// Pipeline over injected clients
    pub fn new(
        config: &AppConfig,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn SimilarityIndex>,
        llm: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            retriever: Retriever::new(embedder, index),
            llm,
            references: ReferenceLibrary::new(
                config.references.base_dir.clone(),
                config.retrieval.max_context_chars,
            ),
            llm_config: config.llm.clone(),
            threshold: config.retrieval.threshold,
            top_k: config.index.top_k,
            phase_timeout: config.phase_timeout(),
            request_deadline: config.request_deadline(),
        }
    }

    /// Pipeline over the HTTP clients named in configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let embedder = Arc::new(EmbeddingClient::from_app_config(config)?);
        let index = Arc::new(QdrantIndex::from_app_config(config)?);
        let llm = Arc::new(LlmClient::from_app_config(config)?);
        Ok(Self::new(config, embedder, index, llm))
    }

    fn resolve_knobs(&self, request: &AnalysisRequest) -> Result<(f32, usize)> {
        let threshold = request.threshold.unwrap_or(self.threshold);
        if !(-1.0..=1.0).contains(&threshold) {
            return Err(VulnRagError::InvalidInput(format!(
                "threshold must be within [-1, 1], got {threshold}"
            )));
        }
        let top_k = request.top_k.unwrap_or(self.top_k);
        if top_k == 0 {
            return Err(VulnRagError::InvalidInput(
                "top_k must be positive".to_string(),
            ));
        }
        Ok((threshold, top_k))
    }

    /// Retrieval only: which references would the primary phase use
    pub async fn search(&self, request: &AnalysisRequest) -> Result<SearchOutcome> {
        let (threshold, top_k) = self.resolve_knobs(request)?;
        let infrastructure = InfrastructureDescription::from_value(&request.infrastructure)?;
        let query = infrastructure.query_text()?;

        let retrieval = bounded(
            "retrieval",
            self.phase_timeout,
            self.retriever.retrieve(&query, top_k, threshold),
        )
        .await?;

        Ok(SearchOutcome {
            threshold,
            qualified: retrieval.qualified.iter().map(ReferenceMatch::from).collect(),
            rejected: retrieval.rejected.iter().map(ReferenceMatch::from).collect(),
        })
    }

    /// Run both phases and merge their findings
    ///
    /// Only an invalid request or an exceeded request deadline is returned as
    /// an error; everything else degrades into the outcome's diagnostics.
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisOutcome> {
        let (threshold, top_k) = self.resolve_knobs(&request)?;
        let infrastructure = InfrastructureDescription::from_value(&request.infrastructure)?;
        for warning in infrastructure.validate() {
            warn!(%warning, "Infrastructure graph warning");
        }
        let query = infrastructure.query_text()?;
        let target_json = serde_json::to_string(&request.infrastructure)?;

        let started = Instant::now();
        let outcome = bounded(
            "request",
            self.request_deadline,
            self.run(&query, &target_json, top_k, threshold),
        )
        .await?;

        info!(
            status = outcome.status(),
            findings = outcome.report().vulnerabilities.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Analysis finished"
        );
        Ok(outcome)
    }

    async fn run(
        &self,
        query: &str,
        target_json: &str,
        top_k: usize,
        threshold: f32,
    ) -> Result<AnalysisOutcome> {
        let mut log = PhaseLog::default();
        let options = PromptOptions {
            response_language: self.llm_config.response_language.clone(),
        };

        let (primary, references) = self
            .primary_phase(query, target_json, top_k, threshold, &options, &mut log)
            .await;

        let excluded = primary.parsed().map(ParsedResult::titles).unwrap_or_default();
        let prompt = build_prompt(PromptMode::ExpandOnly, target_json, "", &excluded, &options);
        let secondary = self.complete_phase(Phase::Secondary, prompt, &mut log).await;

        Ok(finish(primary, secondary, references, log))
    }

    async fn primary_phase(
        &self,
        query: &str,
        target_json: &str,
        top_k: usize,
        threshold: f32,
        options: &PromptOptions,
        log: &mut PhaseLog,
    ) -> (PhaseState, Vec<ReferenceMatch>) {
        let retrieval = match bounded(
            "retrieval",
            self.phase_timeout,
            self.retriever.retrieve(query, top_k, threshold),
        )
        .await
        {
            Ok(retrieval) => retrieval,
            Err(e) => {
                log.record(Phase::Primary, &e);
                return (PhaseState::Failed, Vec::new());
            }
        };

        if retrieval.qualified.is_empty() {
            info!(
                threshold,
                candidates = retrieval.rejected.len(),
                "No reference qualified, skipping primary phase"
            );
            return (PhaseState::Skipped, Vec::new());
        }

        let references: Vec<ReferenceMatch> =
            retrieval.qualified.iter().map(ReferenceMatch::from).collect();
        let context = match self.references.assemble(&references).await {
            Ok(context) => context,
            Err(e) => {
                log.record(Phase::Primary, &e);
                return (PhaseState::Failed, references);
            }
        };

        let prompt = build_prompt(
            PromptMode::ValidateAndExpand,
            target_json,
            &context,
            &[],
            options,
        );
        let state = self.complete_phase(Phase::Primary, prompt, log).await;
        (state, references)
    }

    async fn complete_phase(&self, phase: Phase, prompt: String, log: &mut PhaseLog) -> PhaseState {
        let request = CompletionRequest::from_config(&self.llm_config, prompt);
        let stage = format!("{phase} completion");
        let completion = match bounded(&stage, self.phase_timeout, self.llm.complete(request))
            .await
        {
            Ok(completion) => completion,
            Err(e) => {
                log.record(phase, &e);
                return PhaseState::Failed;
            }
        };
        log.usage.add(completion.usage);

        if completion.is_truncated() {
            warn!(%phase, finish_reason = %completion.finish_reason, "Model output truncated");
            log.diagnostics.push(PhaseDiagnostic {
                phase,
                kind: "truncated".to_string(),
                message: format!(
                    "output stopped with finish reason '{}'",
                    completion.finish_reason
                ),
                raw_output: Some(completion.text),
            });
            return PhaseState::Failed;
        }

        match extract(&completion.text) {
            Some(parsed) => {
                info!(%phase, findings = parsed.vulnerabilities.len(), "Phase parsed");
                PhaseState::Parsed(parsed)
            }
            None => {
                warn!(%phase, chars = completion.text.len(), "No JSON object in model output");
                log.diagnostics.push(PhaseDiagnostic {
                    phase,
                    kind: "unparseable_output".to_string(),
                    message: "model output did not contain a usable JSON object".to_string(),
                    raw_output: Some(completion.text),
                });
                PhaseState::Failed
            }
        }
    }
}

/// Await `future`, failing with `Timeout` once `limit` has passed
async fn bounded<T, F>(stage: &str, limit: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let started = Instant::now();
    tokio::time::timeout(limit, future)
        .await
        .unwrap_or_else(|_| {
            Err(VulnRagError::Timeout {
                stage: stage.to_string(),
                elapsed: started.elapsed(),
            })
        })
}

/// Merge primary then secondary findings, dropping repeated titles
pub fn merge_findings(primary: Vec<Finding>, secondary: Vec<Finding>) -> Vec<Finding> {
    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(primary.len() + secondary.len());

    for finding in primary {
        if finding.title.is_empty() || seen.insert(finding.title.clone()) {
            merged.push(finding);
        }
    }
    for mut finding in secondary {
        if !finding.title.is_empty() && !seen.insert(finding.title.clone()) {
            continue;
        }
        if finding.source.is_none() {
            finding.source = Some(ZERO_BASE_SOURCE.to_string());
        }
        merged.push(finding);
    }

    merged
}

fn finish(
    primary: PhaseState,
    secondary: PhaseState,
    references: Vec<ReferenceMatch>,
    log: PhaseLog,
) -> AnalysisOutcome {
    let parsed_any = primary.parsed().is_some() || secondary.parsed().is_some();
    let any_failed = matches!(primary, PhaseState::Failed) || matches!(secondary, PhaseState::Failed);
    let primary_skipped = matches!(primary, PhaseState::Skipped);

    let (primary_findings, rejected_scenarios) = match primary {
        PhaseState::Parsed(result) => (result.vulnerabilities, result.rejected_scenarios),
        _ => (Vec::new(), Vec::new()),
    };
    let secondary_findings = match secondary {
        PhaseState::Parsed(result) => result.vulnerabilities,
        _ => Vec::new(),
    };

    let vulnerabilities = merge_findings(primary_findings, secondary_findings);
    let report = AnalysisReport {
        summary: SeveritySummary::from_findings(&vulnerabilities),
        vulnerabilities,
        references,
        rejected_scenarios,
        diagnostics: log.diagnostics,
        usage: log.usage,
        generated_at: Utc::now(),
    };

    if !parsed_any {
        AnalysisOutcome::Failed(report)
    } else if any_failed {
        AnalysisOutcome::Partial(report)
    } else if primary_skipped {
        AnalysisOutcome::NoReferenceMatch(report)
    } else {
        AnalysisOutcome::Completed(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    fn finding(title: &str, severity: Severity, source: Option<&str>) -> Finding {
        Finding {
            severity,
            title: title.to_string(),
            description: String::new(),
            attack_path: vec![],
            impact: String::new(),
            recommendation: String::new(),
            cvss_score: 0.0,
            source: source.map(str::to_string),
            confidence: None,
            confidence_reason: None,
        }
    }

    fn parsed(findings: Vec<Finding>) -> PhaseState {
        PhaseState::Parsed(ParsedResult {
            summary: SeveritySummary::from_findings(&findings),
            vulnerabilities: findings,
            rejected_scenarios: vec![],
        })
    }

    #[test]
    fn test_merge_keeps_primary_order_and_drops_duplicates() {
        let merged = merge_findings(
            vec![
                finding("A", Severity::High, Some("rag_doc_1")),
                finding("B", Severity::Medium, Some("rag_doc_2")),
            ],
            vec![
                finding("B", Severity::Low, None),
                finding("C", Severity::Low, None),
            ],
        );

        let titles: Vec<&str> = merged.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", "C"]);
        assert_eq!(merged[1].severity, Severity::Medium);
        assert_eq!(merged[2].source.as_deref(), Some(ZERO_BASE_SOURCE));
    }

    #[test]
    fn test_merge_keeps_explicit_secondary_source() {
        let merged = merge_findings(vec![], vec![finding("X", Severity::High, Some("custom"))]);
        assert_eq!(merged[0].source.as_deref(), Some("custom"));
    }

    #[test]
    fn test_finish_completed() {
        let outcome = finish(
            parsed(vec![finding("A", Severity::High, Some("rag_doc_1"))]),
            parsed(vec![finding("B", Severity::Low, None)]),
            vec![],
            PhaseLog::default(),
        );
        assert_eq!(outcome.status(), "completed");
        assert_eq!(
            outcome.report().summary,
            SeveritySummary { high: 1, medium: 0, low: 1 }
        );
    }

    #[test]
    fn test_finish_no_reference_match() {
        let outcome = finish(
            PhaseState::Skipped,
            parsed(vec![finding("B", Severity::Medium, None)]),
            vec![],
            PhaseLog::default(),
        );
        assert_eq!(outcome.status(), "no_reference_match");
        assert_eq!(outcome.report().vulnerabilities.len(), 1);
    }

    #[test]
    fn test_finish_partial_and_failed() {
        let outcome = finish(
            PhaseState::Failed,
            parsed(vec![finding("B", Severity::Medium, None)]),
            vec![],
            PhaseLog::default(),
        );
        assert_eq!(outcome.status(), "partial");

        let outcome = finish(
            PhaseState::Skipped,
            PhaseState::Failed,
            vec![],
            PhaseLog::default(),
        );
        assert_eq!(outcome.status(), "failed");
        assert!(outcome.report().vulnerabilities.is_empty());
    }

    #[test]
    fn test_zero_findings_is_not_failure() {
        let outcome = finish(parsed(vec![]), parsed(vec![]), vec![], PhaseLog::default());
        assert_eq!(outcome.status(), "completed");
        assert_eq!(outcome.report().summary.total(), 0);
    }

    #[tokio::test]
    async fn test_bounded_times_out() {
        let err = bounded("slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();

        match err {
            VulnRagError::Timeout { stage, .. } => assert_eq!(stage, "slow"),
            other => panic!("unexpected error: {other}"),
        }
    }
}

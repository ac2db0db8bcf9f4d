use std::collections::HashSet;
use std::fmt;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::errors::Result;
use crate::errors::VulnRagError;

/// Fixed-length vector produced by the embedder
pub type EmbeddingVector = Vec<f32>;

/// A cloud resource in the infrastructure graph
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfraNode {
    pub node_id: String,
    #[serde(rename = "type", alias = "node_type", default)]
    pub node_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    /// Collector-specific fields (`attributes`, ...) kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A directed relation between two nodes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfraEdge {
    #[serde(default)]
    pub id: Option<String>,
    pub src: String,
    pub dst: String,
    #[serde(default)]
    pub relation: String,
    #[serde(default)]
    pub directed: bool,
    #[serde(default)]
    pub conditions: Option<String>,
}

/// Infrastructure configuration submitted for analysis
///
/// Graph documents carry `nodes` and `edges`; resource-list documents carry a
/// `resources` array instead and leave both empty. Unknown top-level fields are
/// preserved so the document round-trips unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InfrastructureDescription {
    #[serde(default)]
    pub nodes: Vec<InfraNode>,
    #[serde(default)]
    pub edges: Vec<InfraEdge>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InfrastructureDescription {
    /// Parse an infrastructure document from an arbitrary JSON value
    pub fn from_value(value: &Value) -> Result<Self> {
        if !value.is_object() {
            return Err(VulnRagError::InvalidInfrastructure(
                "expected a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value.clone())
            .map_err(|e| VulnRagError::InvalidInfrastructure(e.to_string()))
    }

    /// Structural problems in the graph
    ///
    /// Malformed graphs are tolerated; callers surface these as warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let mut seen = HashSet::new();

        for node in &self.nodes {
            if !seen.insert(node.node_id.as_str()) {
                warnings.push(format!("duplicate node_id '{}'", node.node_id));
            }
        }

        for edge in &self.edges {
            let label = edge.id.as_deref().unwrap_or(&edge.relation);
            if !seen.contains(edge.src.as_str()) {
                warnings.push(format!(
                    "edge '{label}' references unknown src '{}'",
                    edge.src
                ));
            }
            if !seen.contains(edge.dst.as_str()) {
                warnings.push(format!(
                    "edge '{label}' references unknown dst '{}'",
                    edge.dst
                ));
            }
        }

        warnings
    }

    /// Text sent to the embedder for similarity search
    ///
    /// Resource-list documents are reduced to the list of each resource's
    /// `content`; anything else is embedded whole.
    pub fn query_text(&self) -> Result<String> {
        if let Some(Value::Array(resources)) = self.extra.get("resources") {
            let contents: Vec<Value> = resources
                .iter()
                .map(|r| r.get("content").cloned().unwrap_or_else(|| Value::Object(Map::new())))
                .collect();
            return Ok(serde_json::to_string(&contents)?);
        }
        Ok(serde_json::to_string(self)?)
    }
}

/// Finding severity
///
/// Anything the model emits outside high/medium/low is kept as `Unknown` and
/// never counted in a summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
    #[default]
    Unknown,
}

impl Severity {
    /// Case-insensitive exact match; surrounding whitespace is not ignored
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(value.as_str().map_or(Self::Unknown, Self::parse))
    }
}

/// Counts of findings by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeveritySummary {
    #[serde(default)]
    pub high: usize,
    #[serde(default)]
    pub medium: usize,
    #[serde(default)]
    pub low: usize,
}

impl SeveritySummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut summary = Self::default();
        for finding in findings {
            match finding.severity {
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
                Severity::Unknown => {}
            }
        }
        summary
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

/// One reported vulnerability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(
        rename = "attackPath",
        alias = "attack_path",
        default,
        deserialize_with = "lenient_steps"
    )]
    pub attack_path: Vec<String>,
    #[serde(default)]
    pub impact: String,
    #[serde(default)]
    pub recommendation: String,
    #[serde(default, deserialize_with = "lenient_f32")]
    pub cvss_score: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_opt_f32",
        skip_serializing_if = "Option::is_none"
    )]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_reason: Option<String>,
}

/// A reference scenario the model judged not reproducible
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedScenario {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub doc_title: String,
    #[serde(default)]
    pub rejection_reason: String,
    #[serde(default)]
    pub missing_permissions: Vec<String>,
}

/// Typed view of one extracted model response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedResult {
    #[serde(default)]
    pub summary: SeveritySummary,
    #[serde(default)]
    pub vulnerabilities: Vec<Finding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected_scenarios: Vec<RejectedScenario>,
}

impl ParsedResult {
    pub fn titles(&self) -> Vec<String> {
        self.vulnerabilities
            .iter()
            .map(|v| v.title.clone())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

fn number_from_value(value: &Value) -> Option<f32> {
    match value {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        Value::String(s) => s.trim().parse::<f32>().ok(),
        _ => None,
    }
}

/// Accepts a list of steps or a single step string
fn lenient_steps<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        Value::String(s) if !s.is_empty() => vec![s],
        _ => Vec::new(),
    })
}

fn lenient_f32<'de, D>(deserializer: D) -> std::result::Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value).unwrap_or(0.0))
}

fn lenient_opt_f32<'de, D>(deserializer: D) -> std::result::Result<Option<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(number_from_value(&value))
}

/// Payload stored alongside each reference vector
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferencePayload {
    #[serde(default = "unknown_title")]
    pub title: String,
    /// Path (relative to the reference base directory) of the scenario text
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn unknown_title() -> String {
    "unknown".to_string()
}

/// One result of a top-k similarity query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityHit {
    pub payload: ReferencePayload,
    pub score: f32,
    /// 1-based position in the ranked result list
    pub rank: usize,
}

/// A qualified hit, reduced to what the prompt needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceMatch {
    pub title: String,
    pub path: String,
    pub score: f32,
    pub rank: usize,
}

impl From<&SimilarityHit> for ReferenceMatch {
    fn from(hit: &SimilarityHit) -> Self {
        Self {
            title: hit.payload.title.clone(),
            path: hit.payload.description.clone(),
            score: hit.score,
            rank: hit.rank,
        }
    }
}

/// Analysis phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Primary,
    Secondary,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => f.write_str("primary"),
            Self::Secondary => f.write_str("secondary"),
        }
    }
}

/// Why a phase produced no parsed result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseDiagnostic {
    pub phase: Phase,
    pub kind: String,
    pub message: String,
    /// Model text kept for manual review when it could not be parsed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

/// Token accounting reported by the model endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn add(&mut self, other: Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Aggregated result of a two-phase analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub summary: SeveritySummary,
    pub vulnerabilities: Vec<Finding>,
    /// Reference scenarios the primary phase validated against
    pub references: Vec<ReferenceMatch>,
    #[serde(default)]
    pub rejected_scenarios: Vec<RejectedScenario>,
    #[serde(default)]
    pub diagnostics: Vec<PhaseDiagnostic>,
    #[serde(default)]
    pub usage: TokenUsage,
    pub generated_at: DateTime<Utc>,
}

/// Tagged analysis result
///
/// Distinguishes "nothing known matched" from "analysis could not be completed".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisOutcome {
    /// Every phase that ran produced a parsed result
    Completed(AnalysisReport),
    /// No reference scenario qualified; findings come from the secondary phase only
    NoReferenceMatch(AnalysisReport),
    /// At least one phase degraded; see `diagnostics`
    Partial(AnalysisReport),
    /// No phase produced a parsed result
    Failed(AnalysisReport),
}

impl AnalysisOutcome {
    pub fn report(&self) -> &AnalysisReport {
        match self {
            Self::Completed(r) | Self::NoReferenceMatch(r) | Self::Partial(r) | Self::Failed(r) => {
                r
            }
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::NoReferenceMatch(_) => "no_reference_match",
            Self::Partial(_) => "partial",
            Self::Failed(_) => "failed",
        }
    }
}

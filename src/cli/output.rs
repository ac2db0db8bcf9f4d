//! CLI output formatting utilities
//!
//! This module provides consistent output formatting for the `vulnrag` CLI

use crate::ingest::IngestStats;
use crate::models::AnalysisOutcome;
use crate::models::ReferenceMatch;
use crate::models::Severity;
use crate::rag::SearchOutcome;
use crate::AppConfig;

/// Safely truncate a string at character boundary (not byte boundary)
///
/// Returns the string with a "..." suffix if truncated, otherwise unchanged.
#[must_use]
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    } else {
        s.to_string()
    }
}

/// Hide all but the first few characters of a secret
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        "(not set)".to_string()
    } else if secret.chars().count() <= 8 {
        "***".to_string()
    } else {
        let head: String = secret.chars().take(4).collect();
        format!("{head}***")
    }
}

const fn severity_icon(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "🔴",
        Severity::Medium => "🟠",
        Severity::Low => "🟡",
        Severity::Unknown => "⚪",
    }
}

fn print_references(label: &str, references: &[ReferenceMatch]) {
    println!("{label} ({}):", references.len());
    for reference in references {
        println!(
            "  {}. {} (similarity: {:.4}) {}",
            reference.rank, reference.title, reference.score, reference.path
        );
    }
}

/// Print an analysis outcome as a human-readable report
pub fn print_analysis(outcome: &AnalysisOutcome, graph_warnings: &[String]) {
    let report = outcome.report();

    println!("🛡️  Analysis status: {}", outcome.status());
    println!(
        "📊 Summary: {} high, {} medium, {} low",
        report.summary.high, report.summary.medium, report.summary.low
    );
    println!();

    if !report.references.is_empty() {
        print_references("📚 References used", &report.references);
        println!();
    }

    for (idx, finding) in report.vulnerabilities.iter().enumerate() {
        println!(
            "{} {}. [{}] {} (CVSS {:.1})",
            severity_icon(finding.severity),
            idx + 1,
            finding.severity,
            finding.title,
            finding.cvss_score
        );
        if let Some(source) = &finding.source {
            match finding.confidence {
                Some(confidence) => println!("   source: {source}, confidence: {confidence:.2}"),
                None => println!("   source: {source}"),
            }
        }
        println!("   {}", truncate_str(&finding.description, 200));
        for (step_idx, step) in finding.attack_path.iter().enumerate() {
            println!("     {}) {}", step_idx + 1, step);
        }
        if !finding.recommendation.is_empty() {
            println!("   ➜ {}", truncate_str(&finding.recommendation, 200));
        }
        println!();
    }

    if !report.rejected_scenarios.is_empty() {
        println!("🚫 Rejected reference scenarios:");
        for rejected in &report.rejected_scenarios {
            println!("  ❌ {}: {}", rejected.doc_title, rejected.rejection_reason);
            if !rejected.missing_permissions.is_empty() {
                println!("     missing: {}", rejected.missing_permissions.join(", "));
            }
        }
        println!();
    }

    for diagnostic in &report.diagnostics {
        print_warning(&format!(
            "{} phase: {} ({})",
            diagnostic.phase, diagnostic.message, diagnostic.kind
        ));
        if let Some(raw) = &diagnostic.raw_output {
            println!("   raw output: {}", truncate_str(raw, 500));
        }
    }

    for warning in graph_warnings {
        print_warning(&format!("graph: {warning}"));
    }

    println!(
        "🔢 Tokens: {} in, {} out",
        report.usage.input_tokens, report.usage.output_tokens
    );
}

/// Print retrieval results
pub fn print_search(outcome: &SearchOutcome) {
    println!("🔍 Threshold: {}", outcome.threshold);
    print_references("✅ Qualified", &outcome.qualified);
    print_references("❌ Below threshold", &outcome.rejected);
}

/// Print ingestion statistics
pub fn print_ingest_stats(stats: &IngestStats) {
    print_success(&format!(
        "Ingested {}/{} reference items ({} failed)",
        stats.stored, stats.total, stats.failed
    ));
}

/// Print configuration
pub fn print_config(config: &AppConfig) {
    println!("📋 vulnrag Configuration:");
    println!();

    println!("📝 Logging:");
    println!("  Level: {}", config.logging.level);
    println!("  Backtrace: {}", config.logging.backtrace);
    println!();

    println!("🧠 Embeddings:");
    println!("  Endpoint: {}", config.embeddings.endpoint);
    println!("  Model: {}", config.embeddings.model);
    println!("  Dimension: {}", config.embedding_dimension());
    println!(
        "  Key: {}",
        mask_secret(config.embeddings.api_key.as_deref().unwrap_or_default())
    );
    println!();

    println!("🗂️  Index:");
    println!("  URL: {}", config.index.url);
    println!("  Collection: {}", config.index.collection);
    println!("  Top-k: {}", config.index.top_k);
    println!();

    println!("🔍 Retrieval:");
    println!("  Threshold: {}", config.retrieval.threshold);
    println!("  Max context chars: {}", config.retrieval.max_context_chars);
    println!("  Reference dir: {}", config.references.base_dir.display());
    println!();

    println!("🤖 LLM:");
    println!("  Endpoint: {}", config.llm_endpoint());
    println!("  Model: {}", config.llm_model());
    println!("  Key: {}", mask_secret(&config.llm.llm_key));
    println!("  Max tokens: {}", config.llm.max_tokens);
    println!(
        "  Response language: {}",
        config.llm.response_language.as_deref().unwrap_or("English")
    );
    println!();

    println!("⏱️  Analysis:");
    println!("  Phase timeout: {}s", config.analysis.phase_timeout_secs);
    println!("  Request deadline: {}s", config.analysis.request_deadline_secs);
    println!();

    println!("🌐 Server:");
    println!("  Address: {}:{}", config.server.host, config.server.port);
    println!("  CORS: {}", config.server.cors);
    println!(
        "  Max concurrent requests: {}",
        config.server.max_concurrent_requests
    );
}

/// Print colored output functions
pub fn print_info(msg: &str) {
    println!("ℹ️  {msg}");
}

pub fn print_success(msg: &str) {
    println!("✅ {msg}");
}

pub fn print_warning(msg: &str) {
    println!("⚠️  {msg}");
}

pub fn print_error(msg: &str) {
    eprintln!("❌ {msg}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str_multibyte() {
        assert_eq!(truncate_str("권한 상승 경로", 2), "권한...");
        assert_eq!(truncate_str("short", 10), "short");
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "(not set)");
        assert_eq!(mask_secret("abc"), "***");
        assert_eq!(mask_secret("sk-or-v1-abcdef"), "sk-o***");
    }
}

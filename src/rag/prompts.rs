//! Prompt templates for the two analysis phases
//!
//! Both phases embed [`FINDINGS_SCHEMA`], whose field names are the serde
//! names of [`crate::models::Finding`]. The extractor parses exactly this
//! shape, so the two must change together.

use std::fmt::Write as _;

/// Source tag for findings not derived from a reference document
pub const ZERO_BASE_SOURCE: &str = "zero_base";

/// Output contract shared by both phases
pub const FINDINGS_SCHEMA: &str = r#"{
    "summary": { "high": 0, "medium": 0, "low": 0 },
    "vulnerabilities": [
        {
            "severity": "high|medium|low",
            "title": "sentence-style title",
            "description": "what is wrong",
            "attackPath": ["step 1", "step 2"],
            "impact": "potential impact",
            "recommendation": "how to fix it",
            "cvss_score": 0.0,
            "source": "rag_doc_N|zero_base",
            "confidence": 0.0,
            "confidence_reason": "why this score"
        }
    ]
}"#;

/// Extra top-level field requested in validate-and-expand mode
pub const REJECTED_SCENARIOS_SCHEMA: &str = r#""rejected_scenarios": [
    {
        "source": "rag_doc_N",
        "doc_title": "reference scenario title",
        "rejection_reason": "which permission or resource is missing",
        "missing_permissions": ["lambda:InvokeFunction"]
    }
]"#;

const ROLE: &str = "Role: you are a Tier-1 cloud security architect and red team lead who designs \
and validates real-world intrusion scenarios against enterprise environments.";

const DEEP_VALIDATION: &str = "\
[Deep validation and false-positive removal]
1. Effective permission calculation: weigh Allow against Deny, SCPs and permission boundaries.
2. Identity vs resource-based policy interaction: find trust boundaries that collapse.
3. Multi-hop attack simulation: follow sts:AssumeRole, iam:PassRole and Lambda execution roles.
4. Indirect permissions: count what a principal can obtain through roles or triggers it controls.
5. False-positive filtering: drop paths blocked by MFA, SourceIp or similar conditions.";

const CONFIDENCE_SCALE: &str = "\
[Confidence score]
- 0.9 to 1.0: reproducible, every required permission exists and the path is proven
- 0.7 to 0.9: very likely, most conditions hold, some depend on the environment
- 0.5 to 0.7: possible, some permissions present but controls are unverified
- 0.3 to 0.5: unlikely, key permissions are missing
- 0.0 to 0.3: not reproducible";

const OUTPUT_RULES: &str = "\
Output format: print only one raw JSON object matching the schema below. \
No prose, no markdown, no code fences, no comments.";

/// Which phase the prompt is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    /// Check each reference scenario against the target, then scan for more
    ValidateAndExpand,
    /// Scan for issues outside the excluded titles
    ExpandOnly,
}

/// Prompt knobs that do not change the protocol
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptOptions {
    /// Write every report string in this language (English when unset)
    pub response_language: Option<String>,
}

/// Assemble the full user prompt for one phase
///
/// `reference_context` is only used in validate-and-expand mode and
/// `excluded_titles` only in expand-only mode.
pub fn build_prompt(
    mode: PromptMode,
    target_infra_json: &str,
    reference_context: &str,
    excluded_titles: &[String],
    options: &PromptOptions,
) -> String {
    let mut prompt = String::with_capacity(
        target_infra_json.len() + reference_context.len() + FINDINGS_SCHEMA.len() + 2048,
    );
    prompt.push_str(ROLE);
    prompt.push('\n');

    match mode {
        PromptMode::ValidateAndExpand => {
            prompt.push_str(
                "Goal: prove which reference attack scenarios are reproducible against the \
                 target infrastructure, with a confidence score and source for each, then find \
                 what the references miss.\n\n",
            );
            let _ = writeln!(
                prompt,
                "Context: vulnerability knowledge base (RAG)\n{reference_context}\n"
            );
            let _ = writeln!(
                prompt,
                "Input: target infrastructure configuration (JSON)\n{target_infra_json}\n"
            );
            prompt.push_str(
                "[Analysis protocol (mandatory)]\n\
                 1. For every reference scenario, verify whether its attack technique is \
                 reproducible against the target's actual permission graph.\n\
                 2. Report reproducible scenarios in vulnerabilities with a confidence score. \
                 Set source to rag_doc_N for the scenario taken from [Reference N].\n\
                 3. Report scenarios that are not reproducible in rejected_scenarios with a \
                 concrete rejection reason and the missing permissions.\n\
                 4. Then scan the whole infrastructure again for high-impact issues not covered \
                 by any reference (IAM misuse, exposed resources, missing encryption) and \
                 report them with source zero_base.\n\n",
            );
            prompt.push_str(DEEP_VALIDATION);
            prompt.push_str("\n\n");
            prompt.push_str(CONFIDENCE_SCALE);
            prompt.push_str("\n\n");
        }
        PromptMode::ExpandOnly => {
            prompt.push_str(
                "Goal: find vulnerabilities in the infrastructure below that have not been \
                 identified yet.\n\n",
            );
            let _ = writeln!(
                prompt,
                "Input: target infrastructure configuration (JSON)\n{target_infra_json}\n"
            );
            prompt.push_str("Already identified (excluded, do not report again):\n");
            if excluded_titles.is_empty() {
                prompt.push_str("none\n");
            } else {
                for title in excluded_titles {
                    let _ = writeln!(prompt, "- {title}");
                }
            }
            prompt.push('\n');
            prompt.push_str(
                "[Analysis protocol (mandatory)]\n\
                 1. Do not report anything already listed above.\n\
                 2. Use everything you know about cloud security (OWASP, AWS best practices) to \
                 scan the whole infrastructure.\n\
                 3. Identify critical issues such as IAM permission misuse, exposed resources \
                 and missing encryption.\n\
                 4. Simulate multi-hop attack chains including sts:AssumeRole and iam:PassRole.\n\
                 5. Consider privilege gained through indirect paths such as Lambda roles and \
                 EventBridge rules.\n",
            );
            let _ = writeln!(
                prompt,
                "6. Set source to {ZERO_BASE_SOURCE} on every finding.\n"
            );
        }
    }

    prompt.push_str(OUTPUT_RULES);
    prompt.push('\n');
    if let Some(language) = options.response_language.as_deref() {
        let _ = writeln!(
            prompt,
            "Write every string value in {language}; technical terms may add the English term \
             in parentheses."
        );
    }

    prompt.push_str("\nSchema\n");
    prompt.push_str(FINDINGS_SCHEMA);
    if mode == PromptMode::ValidateAndExpand {
        prompt.push_str("\nAdd this top-level field next to vulnerabilities:\n");
        prompt.push_str(REJECTED_SCENARIOS_SCHEMA);
    }
    prompt.push('\n');
    prompt
}

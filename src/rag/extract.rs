//! Structured-result extraction from free-form model output

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;

use crate::models::ParsedResult;
use crate::models::Severity;

static REASONING_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<reasoning>.*?</reasoning>").expect("static regex"));

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").expect("static regex"));

/// Pull the JSON object out of raw model output
///
/// Reasoning blocks are dropped and code fences unwrapped, then the text
/// between the first `{` and the last `}` is parsed. A result with a
/// `vulnerabilities` array but no `summary` gets one computed from the
/// severities. Returns `None` whenever no object can be recovered.
pub fn extract_json(raw: &str) -> Option<Map<String, Value>> {
    let without_reasoning = REASONING_BLOCK.replace_all(raw, "");
    let unfenced = CODE_FENCE.replace_all(&without_reasoning, "$1");

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    if end <= start {
        return None;
    }

    let mut object = match serde_json::from_str::<Value>(&unfenced[start..=end]) {
        Ok(Value::Object(object)) => object,
        Ok(_) => return None,
        Err(e) => {
            debug!(error = %e, "Model output is not valid JSON");
            return None;
        }
    };

    if !object.contains_key("summary") {
        if let Some(Value::Array(findings)) = object.get("vulnerabilities") {
            let summary = summarize(findings);
            object.insert("summary".to_string(), summary);
        }
    }

    Some(object)
}

fn summarize(findings: &[Value]) -> Value {
    let (mut high, mut medium, mut low) = (0usize, 0usize, 0usize);
    for finding in findings {
        let severity = finding
            .get("severity")
            .and_then(Value::as_str)
            .map_or(Severity::Unknown, Severity::parse);
        match severity {
            Severity::High => high += 1,
            Severity::Medium => medium += 1,
            Severity::Low => low += 1,
            Severity::Unknown => {}
        }
    }
    json!({ "high": high, "medium": medium, "low": low })
}

/// Typed variant of [`extract_json`]
///
/// An object without a `vulnerabilities` array (a refusal, an error
/// envelope) is a shape mismatch and yields `None`, never an empty result.
pub fn extract(raw: &str) -> Option<ParsedResult> {
    let object = extract_json(raw)?;
    if !object.get("vulnerabilities").is_some_and(Value::is_array) {
        debug!("Model output has no vulnerabilities array");
        return None;
    }
    serde_json::from_value(Value::Object(object)).ok()
}

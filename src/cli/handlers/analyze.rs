//! Analysis and search handlers

use std::path::Path;
use std::path::PathBuf;

use serde_json::Value;

use crate::cli::output::*;
use crate::errors::VulnRagError;
use crate::models::InfrastructureDescription;
use crate::rag::AnalysisPipeline;
use crate::rag::AnalysisRequest;
use crate::AppConfig;
use crate::Result;

/// Read an infrastructure description from disk
///
/// A missing or unreadable file is an I/O error; content that is not JSON is
/// reported as an invalid infrastructure description.
pub fn read_infrastructure(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| {
        VulnRagError::InvalidInfrastructure(format!("{}: {e}", path.display()))
    })
}

fn build_request(file: &Path, threshold: Option<f32>, top_k: Option<usize>) -> Result<AnalysisRequest> {
    let mut request = AnalysisRequest::new(read_infrastructure(file)?);
    request.threshold = threshold;
    request.top_k = top_k;
    Ok(request)
}

pub async fn handle_analyze_command(
    config: &AppConfig,
    file: PathBuf,
    threshold: Option<f32>,
    top_k: Option<usize>,
    output: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let request = build_request(&file, threshold, top_k)?;
    let graph_warnings = InfrastructureDescription::from_value(&request.infrastructure)?.validate();

    if !json {
        print_info(&format!("Analyzing {}", file.display()));
    }

    let pipeline = AnalysisPipeline::from_config(config)?;
    let outcome = pipeline.analyze(request).await?;

    if let Some(output_path) = &output {
        let body = serde_json::to_string_pretty(&outcome)?;
        std::fs::write(output_path, body)?;
        if !json {
            print_success(&format!("Report written to: {}", output_path.display()));
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!();
        print_analysis(&outcome, &graph_warnings);
    }

    Ok(())
}

pub async fn handle_search_command(
    config: &AppConfig,
    file: PathBuf,
    threshold: Option<f32>,
    top_k: Option<usize>,
) -> Result<()> {
    let request = build_request(&file, threshold, top_k)?;
    let pipeline = AnalysisPipeline::from_config(config)?;
    let outcome = pipeline.search(&request).await?;

    if outcome.qualified.is_empty() {
        print_warning("No reference scenario reached the threshold");
    }
    print_search(&outcome);

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_read_infrastructure_missing_file_is_io() {
        let err = read_infrastructure(Path::new("/nonexistent/infra.json")).unwrap_err();
        assert!(matches!(err, VulnRagError::Io(_)));
    }

    #[test]
    fn test_read_infrastructure_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "nodes: [").unwrap();
        let err = read_infrastructure(file.path()).unwrap_err();
        assert_eq!(err.kind(), "invalid_infrastructure");
    }

    #[test]
    fn test_build_request_carries_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"nodes": [], "edges": []}}"#).unwrap();
        let request = build_request(file.path(), Some(0.5), Some(3)).unwrap();
        assert_eq!(request.threshold, Some(0.5));
        assert_eq!(request.top_k, Some(3));
        assert!(request.infrastructure["nodes"].is_array());
    }
}

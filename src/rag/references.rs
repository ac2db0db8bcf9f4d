//! Reference document loading and context assembly

use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;
use tracing::warn;

use crate::errors::Result;
use crate::errors::VulnRagError;
use crate::models::ReferenceMatch;

/// Reads reference scenario texts from a base directory
pub struct ReferenceLibrary {
    base_dir: PathBuf,
    max_context_chars: usize,
}

impl ReferenceLibrary {
    pub fn new(base_dir: impl Into<PathBuf>, max_context_chars: usize) -> Self {
        Self {
            base_dir: base_dir.into(),
            max_context_chars,
        }
    }

    /// Map a payload `description` path to a file under the base directory
    ///
    /// Absolute paths and paths that climb out of the base directory are
    /// rejected.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let trimmed = relative.trim();
        if trimmed.is_empty() {
            return Err(VulnRagError::MissingReferenceDocument(
                "reference has no description path".to_string(),
            ));
        }

        let path = Path::new(trimmed);
        let escapes = path.components().any(|component| {
            matches!(
                component,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if escapes {
            return Err(VulnRagError::MissingReferenceDocument(format!(
                "{trimmed} is outside the reference directory"
            )));
        }

        let resolved = self.base_dir.join(path);
        if !resolved.is_file() {
            return Err(VulnRagError::MissingReferenceDocument(
                resolved.display().to_string(),
            ));
        }
        Ok(resolved)
    }

    /// Read one reference document
    pub async fn load(&self, reference: &ReferenceMatch) -> Result<String> {
        let path = self.resolve(&reference.path)?;
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            VulnRagError::MissingReferenceDocument(format!("{}: {e}", path.display()))
        })
    }

    /// Build the labeled reference context for the validation prompt
    ///
    /// Blocks are numbered in match order. The first reference is always
    /// included; later ones are dropped once the character budget is spent.
    /// A reference whose header alone no longer fits is never read.
    pub async fn assemble(&self, references: &[ReferenceMatch]) -> Result<String> {
        let mut context = String::new();
        let mut used = 0usize;

        for (idx, reference) in references.iter().enumerate() {
            if idx > 0 {
                let header = format_block(idx + 1, reference, "").chars().count();
                if used + SEPARATOR.len() + header > self.max_context_chars {
                    self.log_budget_exhausted(idx, references.len());
                    break;
                }
            }

            let body = self.load(reference).await?;
            let block = format_block(idx + 1, reference, &body);
            let block_chars = block.chars().count();

            if idx > 0 {
                if used + SEPARATOR.len() + block_chars > self.max_context_chars {
                    self.log_budget_exhausted(idx, references.len());
                    break;
                }
                context.push_str(SEPARATOR);
                used += SEPARATOR.len();
            }
            context.push_str(&block);
            used += block_chars;
        }

        debug!(chars = used, "Assembled reference context");
        Ok(context)
    }

    fn log_budget_exhausted(&self, kept: usize, total: usize) {
        warn!(
            kept,
            dropped = total - kept,
            budget = self.max_context_chars,
            "Reference context budget exhausted"
        );
    }
}

const SEPARATOR: &str = "\n\n";

fn format_block(number: usize, reference: &ReferenceMatch, body: &str) -> String {
    format!(
        "[Reference {number} - {} (similarity: {:.4})]\n{}",
        reference.title,
        reference.score,
        body.trim_end()
    )
}

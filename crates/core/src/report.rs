use serde::{Deserialize, Serialize};

use crate::types::{FileInfo, PerformanceResult, StructureResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisReport {
    pub file_info: FileInfo,
    pub structure: StructureResult,
    pub performance: PerformanceResult,
    pub recommendations: Vec<String>,
}

/// Terminal output of one analysis. Serialises either as the flat report
/// object or as `{"error": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AnalysisResult {
    Success(Box<AnalysisReport>),
    Failure { error: String },
}

impl AnalysisResult {
    pub fn failure(error: impl std::fmt::Display) -> Self {
        AnalysisResult::Failure {
            error: error.to_string(),
        }
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        match self {
            AnalysisResult::Success(r) => Some(r.as_ref()),
            AnalysisResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AnalysisResult::Success(_) => None,
            AnalysisResult::Failure { error } => Some(error.as_str()),
        }
    }
}

impl AnalysisReport {
    pub fn to_markdown(&self) -> String {
        let mut s = String::new();
        s.push_str("# pbix-audit report\n\n");
        s.push_str(&format!("- file: `{}`\n", self.file_info.name));
        s.push_str(&format!("- size_mb: `{:.2}`\n", self.file_info.size_mb));
        s.push_str(&format!(
            "- modified: `{}`\n",
            self.file_info.modified.to_rfc3339()
        ));
        s.push('\n');

        s.push_str("## Performance\n\n");
        s.push_str(&format!(
            "- grade: `{}`\n",
            self.performance.performance_grade
        ));
        s.push_str(&format!(
            "- size_score: `{}`\n",
            self.performance.size_score
        ));
        s.push_str(&format!(
            "- estimated_load_time: `{:.1}s` (size-based estimate)\n",
            self.performance.estimated_load_time
        ));
        s.push('\n');

        s.push_str("## Structure\n\n");
        if !self.structure.has_layout {
            s.push_str("- (no layout document found)\n");
        } else {
            s.push_str(&format!("- pages: `{}`\n", self.structure.page_count));
            s.push_str(&format!("- visuals: `{}`\n", self.structure.visual_count));
            if !self.structure.page_names.is_empty() {
                s.push_str("- page_names:\n");
                for name in &self.structure.page_names {
                    s.push_str(&format!("  - {}\n", name));
                }
            }
            if !self.structure.visual_types.is_empty() {
                s.push_str("- visual_types:\n");
                for t in &self.structure.visual_types {
                    s.push_str(&format!("  - `{}`\n", t));
                }
            }
            if let Some(err) = &self.structure.error {
                s.push_str(&format!("- error: {}\n", err));
            }
            if !self.structure.visual_errors.is_empty() {
                s.push_str("- skipped visuals:\n");
                for e in &self.structure.visual_errors {
                    s.push_str(&format!("  - {}\n", e));
                }
            }
        }
        s.push('\n');

        s.push_str("## Recommendations\n\n");
        for r in &self.recommendations {
            s.push_str(&format!("- {}\n", r));
        }

        s
    }
}

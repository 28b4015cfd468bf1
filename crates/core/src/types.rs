use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Grade {
    A,
    B,
    C,
    D,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            other => Err(format!("unknown grade {other:?} (expected A, B, C or D)")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileInfo {
    pub name: String,
    pub size_mb: f64,
    pub modified: DateTime<Utc>,
}

/// Facts walked out of the layout document.
///
/// When `has_layout` is false every count is zero and every list is empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StructureResult {
    pub page_count: u64,
    pub visual_count: u64,
    pub page_names: Vec<String>,
    pub visual_types: Vec<String>,
    pub has_layout: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub visual_errors: Vec<String>,
}

impl StructureResult {
    pub fn record_visual_type(&mut self, visual_type: &str) {
        if !self.visual_types.iter().any(|t| t == visual_type) {
            self.visual_types.push(visual_type.to_string());
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceResult {
    pub file_size_mb: f64,
    pub size_score: u8,
    /// Seconds. Linear in file size; a placeholder, not a measurement.
    pub estimated_load_time: f64,
    pub performance_grade: Grade,
}

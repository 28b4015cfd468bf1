use tracing::debug;

use crate::types::{PerformanceResult, StructureResult};

pub const FALLBACK_RECOMMENDATION: &str = "Great! No major issues found with your report";

pub struct Rule {
    pub id: &'static str,
    pub message: &'static str,
    check: fn(&PerformanceResult, &StructureResult) -> bool,
}

impl Rule {
    pub fn triggers(&self, performance: &PerformanceResult, structure: &StructureResult) -> bool {
        (self.check)(performance, structure)
    }
}

/// Evaluated in this order; every rule is checked.
pub static RULES: &[Rule] = &[
    Rule {
        id: "LARGE_FILE",
        message: "Consider reducing file size by optimizing data or images",
        check: |p, _| p.file_size_mb > 50.0,
    },
    Rule {
        id: "MANY_PAGES",
        message: "Consider reducing the number of pages for better navigation",
        check: |_, s| s.page_count > 10,
    },
    Rule {
        id: "MANY_VISUALS",
        message: "High number of visuals may impact performance",
        check: |_, s| s.visual_count > 50,
    },
    Rule {
        id: "MANY_VISUAL_TYPES",
        message: "Consider standardizing on fewer visual types",
        check: |_, s| s.visual_types.len() > 8,
    },
];

/// Rules that fire for this package, in evaluation order.
pub fn triggered_rules<'a>(
    performance: &'a PerformanceResult,
    structure: &'a StructureResult,
) -> impl Iterator<Item = &'static Rule> + 'a {
    RULES
        .iter()
        .filter(move |r| r.triggers(performance, structure))
}

/// Returns one message per triggered rule, or the single fallback message.
/// Never empty.
pub fn recommend(performance: &PerformanceResult, structure: &StructureResult) -> Vec<String> {
    let mut out: Vec<String> = triggered_rules(performance, structure)
        .map(|r| {
            debug!(rule = r.id, "rule triggered");
            r.message.to_string()
        })
        .collect();

    if out.is_empty() {
        out.push(FALLBACK_RECOMMENDATION.to_string());
    }
    out
}

use serde_json::Value;

use crate::types::StructureResult;

const UNNAMED_PAGE: &str = "Unnamed Page";
const UNKNOWN_VISUAL: &str = "unknown";

/// Accumulates pages, visual containers and visual types from a parsed
/// layout document into `out`.
///
/// A visual whose nested `config` string is not valid JSON still counts as a
/// visual; its type is skipped and the failure is pushed to `visual_errors`.
pub fn walk_layout(doc: &Value, out: &mut StructureResult) {
    let Some(sections) = doc.get("sections").and_then(Value::as_array) else {
        return;
    };

    out.page_count = sections.len() as u64;

    for (section_idx, section) in sections.iter().enumerate() {
        let name = section
            .get("displayName")
            .and_then(Value::as_str)
            .unwrap_or(UNNAMED_PAGE);
        out.page_names.push(name.to_string());

        let Some(visuals) = section.get("visualContainers").and_then(Value::as_array) else {
            continue;
        };
        out.visual_count += visuals.len() as u64;

        for (visual_idx, visual) in visuals.iter().enumerate() {
            match visual_type(visual) {
                Ok(Some(t)) => out.record_visual_type(&t),
                Ok(None) => {}
                Err(e) => out.visual_errors.push(format!(
                    "section {section_idx} visual {visual_idx}: {e}"
                )),
            }
        }
    }
}

fn visual_type(visual: &Value) -> Result<Option<String>, serde_json::Error> {
    let parsed;
    let config = match visual.get("config") {
        Some(Value::String(raw)) => {
            parsed = serde_json::from_str::<Value>(raw)?;
            &parsed
        }
        Some(obj @ Value::Object(_)) => obj,
        _ => return Ok(None),
    };

    Ok(config.get("singleVisual").map(|single| {
        single
            .get("visualType")
            .and_then(Value::as_str)
            .unwrap_or(UNKNOWN_VISUAL)
            .to_string()
    }))
}

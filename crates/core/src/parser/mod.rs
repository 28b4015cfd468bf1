mod layout;

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{error::LayoutError, types::StructureResult};

pub use layout::walk_layout;

/// Location of the layout document relative to the extraction root.
pub const LAYOUT_PATH: [&str; 2] = ["Report", "Layout"];

pub fn layout_path(root: &Path) -> PathBuf {
    LAYOUT_PATH.iter().fold(root.to_path_buf(), |p, part| p.join(part))
}

/// Walks the layout document of an extracted package.
///
/// Never fails: a missing layout yields an empty result, an unreadable one
/// yields `has_layout = true` with `error` set.
pub fn analyze_structure(root: &Path) -> StructureResult {
    let path = layout_path(root);
    let mut structure = StructureResult::default();

    if !path.exists() {
        debug!(path = %path.display(), "no layout document in package");
        return structure;
    }
    structure.has_layout = true;

    let parsed = std::fs::read(&path)
        .map_err(LayoutError::from)
        .and_then(|bytes| decode_utf16le(&bytes))
        .and_then(|text| serde_json::from_str::<serde_json::Value>(&text).map_err(LayoutError::from));

    match parsed {
        Ok(doc) => walk_layout(&doc, &mut structure),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "layout document unreadable");
            structure.error = Some(e.to_string());
        }
    }

    structure
}

/// Decodes UTF-16 little-endian text, dropping a leading byte order mark.
pub fn decode_utf16le(bytes: &[u8]) -> Result<String, LayoutError> {
    if bytes.len() % 2 != 0 {
        return Err(LayoutError::Decode(format!(
            "odd byte length {}",
            bytes.len()
        )));
    }

    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));

    let mut text = String::with_capacity(bytes.len() / 2);
    for (i, ch) in char::decode_utf16(units).enumerate() {
        match ch {
            Ok('\u{feff}') if i == 0 => {}
            Ok(c) => text.push(c),
            Err(e) => {
                return Err(LayoutError::Decode(format!(
                    "unpaired surrogate 0x{:04x} at byte {}",
                    e.unpaired_surrogate(),
                    i * 2
                )))
            }
        }
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utf16le(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
    }

    #[test]
    fn decode_strips_bom_and_keeps_non_ascii() {
        let mut bytes = vec![0xff, 0xfe];
        bytes.extend(utf16le("{\"displayName\":\"Ventes été\"}"));
        assert_eq!(
            decode_utf16le(&bytes).unwrap(),
            "{\"displayName\":\"Ventes été\"}"
        );
    }

    #[test]
    fn decode_rejects_odd_length() {
        let err = decode_utf16le(&[0x7b, 0x00, 0x7d]).unwrap_err();
        assert!(matches!(err, LayoutError::Decode(_)));
    }

    #[test]
    fn decode_rejects_unpaired_surrogate() {
        let err = decode_utf16le(&[0x00, 0xd8, 0x41, 0x00]).unwrap_err();
        assert!(err.to_string().contains("surrogate"));
    }

    #[test]
    fn missing_layout_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let structure = analyze_structure(dir.path());
        assert_eq!(structure, StructureResult::default());
    }

    #[test]
    fn unreadable_layout_entry_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(layout_path(dir.path())).unwrap();

        let structure = analyze_structure(dir.path());
        assert!(structure.has_layout);
        assert!(structure
            .error
            .as_deref()
            .unwrap()
            .starts_with("cannot read layout document"));
    }

    #[test]
    fn layout_in_wrong_encoding_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("Report")).unwrap();
        std::fs::write(layout_path(dir.path()), b"{\"sections\":[]}").unwrap();

        let structure = analyze_structure(dir.path());
        assert!(structure.has_layout);
        assert!(structure.error.is_some());
        assert_eq!(structure.page_count, 0);
    }
}

#![allow(dead_code)]

use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use zip::write::SimpleFileOptions;

pub fn utf16le(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
}

/// Writes a zip package at `dir/name` with the given raw entries.
pub fn write_package(dir: &Path, name: &str, entries: &[(&str, Vec<u8>)]) -> PathBuf {
    let path = dir.join(name);
    let file = File::create(&path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    for (entry, data) in entries {
        zip.start_file(*entry, SimpleFileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
    path
}

/// Writes a package whose `Report/Layout` holds `layout` encoded as UTF-16LE.
pub fn write_layout_package(dir: &Path, name: &str, layout: &str) -> PathBuf {
    write_package(
        dir,
        name,
        &[
            ("Version", utf16le("1.28")),
            ("Report/Layout", utf16le(layout)),
            ("DataModel", vec![0xde, 0xad, 0xbe, 0xef]),
        ],
    )
}

pub fn sales_layout() -> String {
    serde_json::json!({
        "id": 0,
        "sections": [
            {
                "displayName": "Sales",
                "visualContainers": [
                    { "x": 0, "config": "{\"name\":\"v1\",\"singleVisual\":{\"visualType\":\"barChart\"}}" },
                    { "x": 1, "config": "{\"name\":\"v2\",\"singleVisual\":{\"visualType\":\"barChart\"}}" },
                    { "x": 2, "config": "{\"name\":\"v3\",\"singleVisual\":{\"visualType\":\"table\"}}" }
                ]
            },
            {
                "visualContainers": []
            }
        ]
    })
    .to_string()
}

pub fn entry_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

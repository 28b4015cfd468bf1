use assert_cmd::cargo_bin_cmd;
use predicates::prelude::*;
use std::{fs::File, io::Write, path::Path};

use zip::write::SimpleFileOptions;

const LAYOUT: &str = r#"{"sections":[{"displayName":"Sales","visualContainers":[{"config":"{\"singleVisual\":{\"visualType\":\"barChart\"}}"},{"config":"{\"singleVisual\":{\"visualType\":\"table\"}}"}]},{"displayName":"Detail"}]}"#;

fn write_package(path: &Path, padding_bytes: usize) {
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    zip.start_file("Report/Layout", SimpleFileOptions::default())
        .unwrap();
    let encoded: Vec<u8> = LAYOUT.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
    zip.write_all(&encoded).unwrap();
    if padding_bytes > 0 {
        let stored =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        zip.start_file("Report/StaticResources/padding.bin", stored)
            .unwrap();
        zip.write_all(&vec![0u8; padding_bytes]).unwrap();
    }
    zip.finish().unwrap();
}

#[test]
fn cli_analyze_writes_reports_and_exits_0() {
    let work = tempfile::tempdir().unwrap();
    let package = work.path().join("sales.pbix");
    write_package(&package, 0);
    let out = work.path().join("out");

    let mut cmd = cargo_bin_cmd!("pbix-audit");
    cmd.env("NO_COLOR", "1").args([
        "analyze",
        "--input",
        package.to_str().unwrap(),
        "--output-format",
        "all",
        "--out",
        out.to_str().unwrap(),
    ]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("grade=A"))
        .stdout(predicate::str::contains("pages=2 visuals=2"))
        .stderr(predicate::str::contains("PASS"));

    let json: serde_json::Value =
        serde_json::from_slice(&std::fs::read(out.join("report.json")).unwrap()).unwrap();
    assert_eq!(json["structure"]["page_names"][1], "Detail");
    assert_eq!(json["performance"]["performance_grade"], "A");
    assert!(out.join("report.md").exists());
}

#[test]
fn cli_analyse_alias_is_accepted() {
    let work = tempfile::tempdir().unwrap();
    let package = work.path().join("sales.pbix");
    write_package(&package, 0);

    let mut cmd = cargo_bin_cmd!("pbix-audit");
    cmd.args([
        "analyse",
        "--input",
        package.to_str().unwrap(),
        "--out",
        work.path().join("out").to_str().unwrap(),
    ]);
    cmd.assert().success();
}

#[test]
fn cli_analyze_exits_2_when_grade_below_minimum() {
    let work = tempfile::tempdir().unwrap();
    let package = work.path().join("large.pbix");
    write_package(&package, 26 * 1024 * 1024);

    let mut cmd = cargo_bin_cmd!("pbix-audit");
    cmd.env("NO_COLOR", "1").args([
        "analyze",
        "--input",
        package.to_str().unwrap(),
        "--min-grade",
        "A",
        "--out",
        work.path().join("out").to_str().unwrap(),
    ]);

    cmd.assert()
        .code(2)
        .stdout(predicate::str::contains("grade=B"))
        .stderr(predicate::str::contains("GRADE BELOW MINIMUM"));
}

#[test]
fn cli_analyze_errors_on_invalid_container() {
    let work = tempfile::tempdir().unwrap();
    let package = work.path().join("fake.pbix");
    std::fs::write(&package, b"not a zip").unwrap();
    let out = work.path().join("out");

    let mut cmd = cargo_bin_cmd!("pbix-audit");
    cmd.args([
        "analyze",
        "--input",
        package.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
    ]);
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid container"));

    let json: serde_json::Value =
        serde_json::from_slice(&std::fs::read(out.join("report.json")).unwrap()).unwrap();
    assert!(json["error"].as_str().unwrap().starts_with("invalid container"));
}

#[test]
fn cli_analyze_errors_on_missing_input() {
    let work = tempfile::tempdir().unwrap();
    let mut cmd = cargo_bin_cmd!("pbix-audit");
    cmd.args([
        "analyze",
        "--input",
        "does-not-exist.pbix",
        "--out",
        work.path().join("out").to_str().unwrap(),
    ]);
    cmd.assert().failure().code(1);
}

#[test]
fn cli_analyze_creates_configured_scratch_dir() {
    let work = tempfile::tempdir().unwrap();
    let package = work.path().join("sales.pbix");
    write_package(&package, 0);
    let scratch = work.path().join("scratch/nested");
    let config = work.path().join("pbix-audit.toml");
    std::fs::write(
        &config,
        format!("scratch_dir = {:?}\n", scratch.to_str().unwrap()),
    )
    .unwrap();

    let mut cmd = cargo_bin_cmd!("pbix-audit");
    cmd.args([
        "analyze",
        "--input",
        package.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
        "--out",
        work.path().join("out").to_str().unwrap(),
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("pages=2"));

    assert!(scratch.is_dir());
    assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 0);
}

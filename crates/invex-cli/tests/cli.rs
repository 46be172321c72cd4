use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SAMPLE: &str = "PROFORMA INVOICE\nCode No: SD-100\nCustomer Name: John Doe\nTel: 0712345678\nReference: T123ABC\nGross Value: 150,000.00";

/// Workspace with an empty config so the user's own config is never read.
fn workspace() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.json");
    fs::write(&config, "{}").unwrap();
    (dir, config)
}

fn invex(config: &Path) -> Command {
    let mut cmd = Command::cargo_bin("invex").unwrap();
    cmd.arg("-c").arg(config);
    cmd
}

#[test]
fn extract_text_document_as_json() {
    let (dir, config) = workspace();
    let input = dir.path().join("invoice.txt");
    fs::write(&input, SAMPLE).unwrap();

    invex(&config)
        .arg("extract")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""code_no": "SD-100""#))
        .stdout(predicate::str::contains(r#""customer_name": "John Doe""#))
        .stdout(predicate::str::contains(r#""amount": "150000.00""#));
}

#[test]
fn extract_writes_csv_to_file() {
    let (dir, config) = workspace();
    let input = dir.path().join("invoice.txt");
    let output = dir.path().join("out.csv");
    fs::write(&input, SAMPLE).unwrap();

    invex(&config)
        .args(["extract", "-f", "csv", "-o"])
        .arg(&output)
        .arg(&input)
        .assert()
        .success();

    let csv = fs::read_to_string(&output).unwrap();
    assert!(csv.starts_with("pi_no,code_no,"));
    assert!(csv.contains("SD-100"));
}

#[test]
fn extract_image_is_rejected() {
    let (dir, config) = workspace();
    let input = dir.path().join("scan.png");
    fs::write(&input, [0x89, b'P', b'N', b'G']).unwrap();

    invex(&config)
        .arg("extract")
        .arg(&input)
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "Image extraction disabled. Please upload a PDF or text-based document.",
        ));
}

#[test]
fn extract_missing_input_fails() {
    let (dir, config) = workspace();

    invex(&config)
        .arg("extract")
        .arg(dir.path().join("missing.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn config_init_get_and_set() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("nested").join("config.json");

    invex(&config).args(["config", "init"]).assert().success();
    assert!(config.exists());

    invex(&config)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    invex(&config)
        .args(["config", "get", "table.serial_max"])
        .assert()
        .success()
        .stdout(predicate::str::contains("100"));

    invex(&config)
        .args(["config", "set", "extraction.max_items", "25"])
        .assert()
        .success();

    invex(&config)
        .args(["config", "get", "extraction.max_items"])
        .assert()
        .success()
        .stdout(predicate::str::contains("25"));

    invex(&config)
        .args(["config", "set", "extraction.no_such_key", "1"])
        .assert()
        .failure();
}

#[test]
fn patterns_lists_defaults_and_explains_matches() {
    let (dir, config) = workspace();

    invex(&config)
        .args(["patterns", "--field", "code_no"])
        .assert()
        .success()
        .stdout(predicate::str::contains("code_no (built-in defaults)"));

    invex(&config)
        .arg("patterns")
        .assert()
        .success()
        .stdout(predicate::str::contains("Service templates"));

    let input = dir.path().join("invoice.txt");
    fs::write(&input, SAMPLE).unwrap();

    invex(&config)
        .args(["patterns", "--field", "code_no", "--against"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("SD-100"));

    invex(&config)
        .args(["patterns", "--field", "colour"])
        .assert()
        .failure();
}

#[test]
fn batch_writes_outputs_and_summary() {
    let (dir, config) = workspace();
    let inputs = dir.path().join("inputs");
    let output = dir.path().join("out");
    fs::create_dir_all(&inputs).unwrap();
    fs::write(inputs.join("a.txt"), SAMPLE).unwrap();
    fs::write(inputs.join("b.png"), [0u8; 8]).unwrap();
    fs::write(inputs.join("notes.md"), "ignored").unwrap();

    let pattern = format!("{}/*", inputs.display());

    invex(&config)
        .args(["batch", &pattern, "--summary", "--continue-on-error", "-o"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 2 files"))
        .stdout(predicate::str::contains("Failed files:"));

    let record = fs::read_to_string(output.join("a.txt.json")).unwrap();
    assert!(record.contains("SD-100"));
    assert!(!output.join("b.png.json").exists());

    let summary = fs::read_to_string(output.join("summary.csv")).unwrap();
    assert!(summary.contains("a.txt,success"));
    assert!(summary.contains("b.png,error"));

    invex(&config)
        .args(["batch", &pattern, "-o"])
        .arg(&output)
        .assert()
        .failure()
        .stderr(predicate::str::contains("1 of 2 files failed"));
}

#[test]
fn batch_keeps_same_stem_outputs_apart() {
    let (dir, config) = workspace();
    let inputs = dir.path().join("inputs");
    let output = dir.path().join("out");
    fs::create_dir_all(&inputs).unwrap();
    fs::write(inputs.join("a.txt"), SAMPLE).unwrap();
    fs::write(inputs.join("a.text"), SAMPLE.replace("SD-100", "SD-200")).unwrap();

    let pattern = format!("{}/a.*", inputs.display());

    invex(&config)
        .args(["batch", &pattern, "-o"])
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 2 files"));

    assert!(fs::read_to_string(output.join("a.txt.json")).unwrap().contains("SD-100"));
    assert!(fs::read_to_string(output.join("a.text.json")).unwrap().contains("SD-200"));
}

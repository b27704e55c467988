use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

const RESPONSE: &str = r#"{
  "status": "success",
  "invoice_data": {
    "line_items": [
      {"item_code": "A1", "description": "Cheese <aged>", "quantity": 2, "price": 10.5, "total": 21}
    ],
    "totals": {"subtotal": 21, "tax": 3.57, "total": 24.57}
  },
  "processing_time": "1.20s"
}"#;

fn invup(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("invup").unwrap();
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env_remove("INVUP_API_BASE")
        .env_remove("INVUP_ANALYTICS_SECRET")
        .env_remove("INVUP_FIREBASE_CONFIG_URL")
        .env_remove("INVUP_MAX_FILE_SIZE");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    invup(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("upload"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("health"))
        .stdout(predicate::str::contains("probe"));
}

#[test]
fn test_render_text() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("response.json");
    fs::write(&input, RESPONSE).unwrap();

    invup(dir.path())
        .arg("render")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("Processing Results"))
        .stdout(predicate::str::contains("Cheese <aged>"))
        .stdout(predicate::str::contains("24.57"))
        .stdout(predicate::str::contains("₪"));
}

#[test]
fn test_render_html_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("response.json");
    let output = dir.path().join("result.html");
    fs::write(&input, RESPONSE).unwrap();

    invup(dir.path())
        .args(["render", "--format", "html", "--output"])
        .arg(&output)
        .arg(&input)
        .assert()
        .success();

    let html = fs::read_to_string(&output).unwrap();
    assert!(html.contains("<td>Cheese &lt;aged&gt;</td>"));
    assert_eq!(html.matches("colspan=\"4\"").count(), 3);
}

#[test]
fn test_render_error_envelope_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("response.json");
    fs::write(&input, r#"{"status":"error","error":"bad format"}"#).unwrap();

    invup(dir.path())
        .arg("render")
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("bad format"));
}

#[test]
fn test_upload_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    invup(dir.path())
        .args(["upload", "does-not-exist.png"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_upload_rejects_non_image_before_network() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("notes.txt");
    fs::write(&input, "not an invoice").unwrap();

    // An unreachable backend proves no request is attempted.
    invup(dir.path())
        .args(["--api-base", "http://127.0.0.1:9", "upload"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Please upload an image file"));
}

#[test]
fn test_upload_rejects_before_fetching_firebase_config() {
    let mut server = mockito::Server::new();
    let config_endpoint = server
        .mock("GET", "/api/firebase-config")
        .with_status(200)
        .with_body(r#"{"storageBucket":"invoices-test.appspot.com"}"#)
        .expect(0)
        .create();
    let upload_endpoint = server.mock("POST", "/upload").expect(0).create();

    let dir = tempfile::tempdir().unwrap();
    let notes = dir.path().join("notes.txt");
    fs::write(&notes, "not an invoice").unwrap();
    let scan = dir.path().join("scan.png");
    let mut png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    png.resize(64, 0);
    fs::write(&scan, png).unwrap();

    let config_url = format!("{}/api/firebase-config", server.url());

    invup(dir.path())
        .env("INVUP_FIREBASE_CONFIG_URL", &config_url)
        .args(["--api-base", &server.url(), "upload"])
        .arg(&notes)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Please upload an image file"));

    invup(dir.path())
        .env("INVUP_FIREBASE_CONFIG_URL", &config_url)
        .env("INVUP_MAX_FILE_SIZE", "32")
        .args(["--api-base", &server.url(), "upload"])
        .arg(&scan)
        .assert()
        .failure()
        .stderr(predicate::str::contains("File size should be less than 32 bytes"));

    config_endpoint.assert();
    upload_endpoint.assert();
}

#[test]
fn test_health_against_mock_backend() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/health")
        .with_status(200)
        .with_body(r#"{"status":"healthy","gemini":"active","timestamp":1700000000.0}"#)
        .create();

    let dir = tempfile::tempdir().unwrap();
    invup(dir.path())
        .args(["--api-base", &server.url(), "health"])
        .assert()
        .success()
        .stdout(predicate::str::contains("healthy"))
        .stdout(predicate::str::contains("active"));

    mock.assert();
}

#[test]
fn test_config_init_and_get() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.json");

    invup(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .success();

    invup(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "get", "upload.max_file_size"])
        .assert()
        .success()
        .stdout(predicate::str::contains("6291456"));

    invup(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "storage.prefix", "scans"])
        .assert()
        .success();

    invup(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "get", "storage.prefix"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"scans\""));

    invup(dir.path())
        .arg("--config")
        .arg(&config)
        .args(["config", "set", "firebase.api_key", "secret"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
    assert!(!fs::read_to_string(&config).unwrap().contains("secret"));
}

//! CLI integration tests using assert_cmd.
//!
//! Commands that talk to a backend run against a wiremock server. The binary
//! blocks, so it is driven from `spawn_blocking` while the server keeps
//! running on the test runtime.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn trainhub() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("trainhub").unwrap()
}

/// A config pointing at `server`, with the token kept inside `dir`.
fn write_config(dir: &TempDir, server: &MockServer) -> PathBuf {
    let config = dir.path().join("trainhub.toml");
    std::fs::write(
        &config,
        format!(
            "base_url = \"{}\"\ntimeout_secs = 5\ntoken_path = '{}'\n",
            server.uri(),
            token_path(dir).display()
        ),
    )
    .unwrap();
    config
}

fn token_path(dir: &TempDir) -> PathBuf {
    dir.path().join("token.json")
}

fn store_token(dir: &TempDir) {
    std::fs::write(
        token_path(dir),
        json!({ "access_token": "tok-abc", "username": "riley" }).to_string(),
    )
    .unwrap();
}

fn command(dir: &TempDir, config: &Path) -> Command {
    let mut cmd = trainhub();
    cmd.current_dir(dir.path())
        .env("HOME", dir.path())
        .env_remove("TRAINHUB_BASE_URL")
        .env_remove("TRAINHUB_TOKEN_PATH")
        .arg("--config")
        .arg(config);
    cmd
}

fn user_json(role: &str) -> serde_json::Value {
    json!({
        "id": "u1",
        "username": "riley",
        "email": "riley@example.com",
        "full_name": "Riley Park",
        "role": role
    })
}

async fn mount_me(server: &MockServer, role: &str) {
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .and(header("authorization", "Bearer tok-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json(role)))
        .mount(server)
        .await;
}

/// Run a prepared command off the async runtime.
async fn run<F>(f: F)
where
    F: FnOnce() + Send + 'static,
{
    tokio::task::spawn_blocking(f).await.unwrap();
}

#[test]
fn help_lists_commands() {
    trainhub()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("assessments"))
        .stdout(predicate::str::contains("certificates"))
        .stdout(predicate::str::contains("login"));
}

#[test]
fn version_flag() {
    trainhub()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("trainhub"));
}

#[test]
fn init_creates_config() {
    let dir = TempDir::new().unwrap();

    trainhub()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created trainhub.toml"));

    let written = std::fs::read_to_string(dir.path().join("trainhub.toml")).unwrap();
    assert!(written.contains("base_url"));
}

#[test]
fn init_skips_existing_config() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("trainhub.toml"), "# mine\n").unwrap();

    trainhub()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    let kept = std::fs::read_to_string(dir.path().join("trainhub.toml")).unwrap();
    assert_eq!(kept, "# mine\n");
}

#[test]
fn missing_config_file_fails() {
    trainhub()
        .arg("--config")
        .arg("nonexistent.toml")
        .arg("health")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"))
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn unknown_role_is_rejected_by_the_parser() {
    trainhub()
        .args(["register", "--username", "a", "--email", "a@b.c"])
        .args(["--full-name", "A", "--password", "pw", "--role", "wizard"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown role"));
}

#[tokio::test(flavor = "multi_thread")]
async fn health_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "status": "ok", "message": "up" })),
        )
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &server);

    let mut cmd = command(&dir, &config);
    run(move || {
        cmd.arg("health")
            .assert()
            .success()
            .stdout(predicate::str::contains("ok (up)"));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn verify_unknown_code_is_invalid_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/certificates/verify"))
        .and(body_json(json!({ "verification_code": "NOPE" })))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "detail": "Certificate not found" })),
        )
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &server);

    let mut cmd = command(&dir, &config);
    run(move || {
        cmd.args(["certificates", "verify", "  NOPE "])
            .assert()
            .success()
            .stdout(predicate::str::contains("INVALID: Certificate not found"));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn verify_valid_code_prints_details() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/certificates/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "valid": true,
            "certificate": {
                "id": "c1",
                "program_title": "Hazmat Handling",
                "recipient_name": "Riley Park",
                "certificate_number": "CERT-0001",
                "verification_code": "ABC123",
                "issued_date": "2026-01-15T10:00:00",
                "expiry_date": "2028-01-15T10:00:00",
                "is_valid": true
            }
        })))
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &server);

    let mut cmd = command(&dir, &config);
    run(move || {
        cmd.args(["certificates", "verify", "ABC123"])
            .assert()
            .success()
            .stdout(predicate::str::contains("VALID"))
            .stdout(predicate::str::contains("Hazmat Handling"))
            .stdout(predicate::str::contains("2028-01-15"));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn login_stores_token_for_later_commands() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_json(json!({ "username": "riley", "password": "pw" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-abc",
            "token_type": "bearer",
            "user": user_json("instructor")
        })))
        .mount(&server)
        .await;
    mount_me(&server, "instructor").await;
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &server);

    let mut login = command(&dir, &config);
    run(move || {
        login
            .args(["login", "--username", "riley"])
            .write_stdin("pw\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("Logged in as riley (instructor)"));
    })
    .await;
    assert!(token_path(&dir).exists());

    let mut whoami = command(&dir, &config);
    run(move || {
        whoami
            .arg("whoami")
            .assert()
            .success()
            .stdout(predicate::str::contains("role:     instructor"))
            .stdout(predicate::str::contains("manage questions"));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn learner_cannot_create_programs() {
    let server = MockServer::start().await;
    mount_me(&server, "learner").await;
    Mock::given(method("POST"))
        .and(path("/api/programs"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &server);
    store_token(&dir);

    let mut cmd = command(&dir, &config);
    run(move || {
        cmd.args(["programs", "create", "--title", "Forklift Safety"])
            .args(["--description", "Basics", "--expiry-months", "24"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("permission denied"));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn instructor_updates_module_in_place() {
    let server = MockServer::start().await;
    mount_me(&server, "instructor").await;
    Mock::given(method("PUT"))
        .and(path("/api/modules/m1"))
        .and(body_json(json!({
            "program_id": "p1",
            "title": "Loading docks",
            "description": "",
            "order": 2
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "m1",
            "program_id": "p1",
            "title": "Loading docks",
            "description": "",
            "order": 2
        })))
        .expect(1)
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &server);
    store_token(&dir);

    let mut cmd = command(&dir, &config);
    run(move || {
        cmd.args(["modules", "update", "m1", "--program", "p1"])
            .args(["--title", " Loading docks ", "--order", "2"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Updated module Loading docks (m1)"));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn learner_cannot_update_units() {
    let server = MockServer::start().await;
    mount_me(&server, "learner").await;
    Mock::given(method("PUT"))
        .and(path("/api/units/u1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &server);
    store_token(&dir);

    let mut cmd = command(&dir, &config);
    run(move || {
        cmd.args(["units", "update", "u1", "--module", "m1"])
            .args(["--title", "Controls", "--order", "1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("permission denied"));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn expired_token_logs_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/me"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "detail": "Token expired" })),
        )
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &server);
    store_token(&dir);

    let mut cmd = command(&dir, &config);
    run(move || {
        cmd.arg("whoami")
            .assert()
            .success()
            .stdout(predicate::str::contains("Not logged in."));
    })
    .await;
    assert!(!token_path(&dir).exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn take_assessment_from_stdin() {
    let server = MockServer::start().await;
    mount_me(&server, "learner").await;
    Mock::given(method("GET"))
        .and(path("/api/assessments/a1/questions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "id": "q1",
                "question_text": "Which class covers flammable gases?",
                "question_type": "multiple_choice",
                "options": [
                    { "id": "o1", "text": "Class 2.1" },
                    { "id": "o2", "text": "Class 8" }
                ],
                "points": 3
            },
            {
                "id": "q2",
                "question_text": "Placards may be removed in transit.",
                "question_type": "true_false",
                "points": 3
            }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/assessments/a1/submit"))
        .and(body_json(json!({
            "assessment_id": "a1",
            "answers": [
                { "question_id": "q1", "selected_option_id": "o1" },
                { "question_id": "q2", "answer_text": "true" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "percentage": 50.0,
            "is_passed": false,
            "total_points": 6,
            "earned_points": 3
        })))
        .expect(1)
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &server);
    store_token(&dir);

    let mut cmd = command(&dir, &config);
    run(move || {
        cmd.args(["assessments", "take", "a1"])
            .write_stdin("9\n1\nyes\nsubmit\n")
            .assert()
            .success()
            .stdout(predicate::str::contains("[1/2] Which class covers flammable gases?"))
            .stdout(predicate::str::contains("Score: 3/6 points (50.0%)"))
            .stdout(predicate::str::contains("NOT PASSED"))
            .stderr(predicate::str::contains("Pick an option between 1 and 2."));
    })
    .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn abandoning_an_attempt_submits_nothing() {
    let server = MockServer::start().await;
    mount_me(&server, "learner").await;
    Mock::given(method("GET"))
        .and(path("/api/assessments/a1/questions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": "q1",
            "question_text": "Explain segregation rules.",
            "question_type": "essay",
            "points": 5
        }])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/assessments/a1/submit"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &server);
    store_token(&dir);

    let mut cmd = command(&dir, &config);
    run(move || {
        cmd.args(["assessments", "take", "a1"])
            .write_stdin("Keep oxidizers apart.\n")
            .assert()
            .failure()
            .stderr(predicate::str::contains("input ended"));
    })
    .await;
}

#[test]
fn logout_works_offline() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("trainhub.toml");
    std::fs::write(
        &config,
        format!(
            "base_url = \"http://127.0.0.1:9\"\ntoken_path = '{}'\n",
            token_path(&dir).display()
        ),
    )
    .unwrap();
    store_token(&dir);

    trainhub()
        .current_dir(dir.path())
        .env("HOME", dir.path())
        .env_remove("TRAINHUB_BASE_URL")
        .env_remove("TRAINHUB_TOKEN_PATH")
        .arg("--config")
        .arg(&config)
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged out."));
    assert!(!token_path(&dir).exists());
}

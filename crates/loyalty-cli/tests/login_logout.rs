//! End-to-end OTP login, registration and logout against a mock backend.

use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

fn session_path(home: &Path) -> std::path::PathBuf {
    home.join("storage").join("loyalty_session.json")
}

fn verify_body() -> Value {
    json!({
        "data": {
            "user": {"id": "u1", "name": "Aisyah", "role": "customer"},
            "backend_tokens": {
                "access_token": "access-token-0123456789",
                "refresh_token": "refresh-token-0123456789",
                "expires_in": 3600
            }
        }
    })
}

async fn mount_route(server: &MockServer, route: &str, status: u16, body: Value) {
    Mock::given(method("POST"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_stores_session() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/login/phone_number"))
        .and(body_json(json!({"phone_number": "60123456789"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "sent"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/verify/login/phone_number/otp"))
        .and(body_json(json!({"otp_code": "123456"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(verify_body()))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .env("LOYALTY_API_URL", server.uri())
        .args(["login", "--phone", "+60123456789"])
        .write_stdin("123456\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Code sent."))
        .stdout(predicate::str::contains("✓ Logged in as Aisyah"))
        .stdout(predicate::str::contains("access-token-0123456789").not());

    let stored: Value =
        serde_json::from_str(&fs::read_to_string(session_path(home.path())).unwrap()).unwrap();
    assert_eq!(stored["user"]["id"], "u1");
    assert_eq!(stored["access_token"], "access-token-0123456789");
    assert_eq!(stored["refresh_token"], "refresh-token-0123456789");
    assert!(stored["expires_at"].is_string());

    cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .args(["debug-log", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("auth: verifying -> authenticated"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_login_prompts_for_phone() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_route(&server, "/auth/login/phone_number", 200, json!({})).await;
    mount_route(
        &server,
        "/auth/verify/login/phone_number/otp",
        200,
        verify_body(),
    )
    .await;

    cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .env("LOYALTY_API_URL", server.uri())
        .arg("login")
        .write_stdin("+60 12-345 6789\n123456\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Phone number:"))
        .stdout(predicate::str::contains("✓ Logged in"));

    assert!(session_path(home.path()).exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_expired_code_then_cancel_leaves_no_session() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_route(&server, "/auth/login/phone_number", 200, json!({})).await;
    mount_route(
        &server,
        "/auth/verify/login/phone_number/otp",
        401,
        json!({"message": "OTP expired"}),
    )
    .await;

    cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .env("LOYALTY_API_URL", server.uri())
        .args(["login", "--phone", "+60123456789"])
        .write_stdin("123456\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("expired"))
        .stdout(predicate::str::contains("Login cancelled."));

    assert!(!session_path(home.path()).exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_invalid_otp_is_rejected_locally() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_route(&server, "/auth/login/phone_number", 200, json!({})).await;
    Mock::given(method("POST"))
        .and(path("/auth/verify/login/phone_number/otp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(verify_body()))
        .expect(0)
        .mount(&server)
        .await;

    cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .env("LOYALTY_API_URL", server.uri())
        .args(["login", "--phone", "+60123456789"])
        .write_stdin("12ab56\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("6-digit code"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unregistered_phone_fails() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;
    mount_route(
        &server,
        "/auth/login/phone_number",
        404,
        json!({"message": "User not found"}),
    )
    .await;

    cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .env("LOYALTY_API_URL", server.uri())
        .args(["login", "--phone", "+60123456789"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not registered"));
}

#[test]
fn test_short_phone_fails_without_network() {
    let home = TempDir::new().unwrap();

    cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        // Nothing listens here; validation must fail first.
        .env("LOYALTY_API_URL", "http://127.0.0.1:9")
        .args(["login", "--phone", "+60 1234"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("at least 8 digits"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_register_sends_profile_and_logs_in() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register/phone_number"))
        .and(body_json(json!({
            "phone_number": "60123456789",
            "email": "aisyah@example.com",
            "role": "customer"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    mount_route(
        &server,
        "/auth/verify/register/phone_number/otp",
        200,
        verify_body(),
    )
    .await;

    cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .env("LOYALTY_API_URL", server.uri())
        .args([
            "register",
            "--phone",
            "+60123456789",
            "--email",
            "aisyah@example.com",
            "--accept-terms",
        ])
        .write_stdin("123456\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Registered and logged in as Aisyah"));

    assert!(session_path(home.path()).exists());
}

#[test]
fn test_register_without_terms_fails() {
    let home = TempDir::new().unwrap();

    cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .env("LOYALTY_API_URL", "http://127.0.0.1:9")
        .args([
            "register",
            "--phone",
            "+60123456789",
            "--email",
            "aisyah@example.com",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("terms and conditions"));
}

#[test]
fn test_logout_removes_session() {
    let home = TempDir::new().unwrap();
    let storage = home.path().join("storage");
    fs::create_dir_all(&storage).unwrap();
    fs::write(
        session_path(home.path()),
        json!({
            "user": {"id": "u1"},
            "access_token": "a",
            "refresh_token": "b"
        })
        .to_string(),
    )
    .unwrap();

    cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Logged out"));

    assert!(!session_path(home.path()).exists());
}

#[test]
fn test_logout_when_not_logged_in() {
    let home = TempDir::new().unwrap();

    cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .arg("logout")
        .assert()
        .success()
        .stdout(predicate::str::contains("Not logged in"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_forgot_password_posts_email() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/forgot-password"))
        .and(body_json(json!({"email": "aisyah@example.com"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .env("LOYALTY_API_URL", server.uri())
        .args(["forgot-password", "--email", "aisyah@example.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("reset link"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_reset_password_reports_server_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/reset-password"))
        .and(body_json(json!({"token": "tok", "password": "s3cret-pass"})))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "Token expired"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .env("LOYALTY_API_URL", server.uri())
        .env("LOYALTY_NEW_PASSWORD", "s3cret-pass")
        .args(["reset-password", "--token", "tok"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Token expired"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_resend_requests_a_second_code() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login/phone_number"))
        .and(body_json(json!({"phone_number": "60123456789"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&server)
        .await;
    mount_route(
        &server,
        "/auth/verify/login/phone_number/otp",
        200,
        verify_body(),
    )
    .await;

    cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .env("LOYALTY_API_URL", server.uri())
        .args(["login", "--phone", "+60123456789"])
        .write_stdin("r\n123456\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("A new code was sent."))
        .stdout(predicate::str::contains("✓ Logged in as Aisyah"));

    assert!(session_path(home.path()).exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_back_asks_for_phone_again() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    let server = MockServer::start().await;
    for phone in ["60123456789", "60198765432"] {
        Mock::given(method("POST"))
            .and(path("/auth/login/phone_number"))
            .and(body_json(json!({"phone_number": phone})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path("/auth/verify/login/phone_number/otp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(verify_body()))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .env("LOYALTY_API_URL", server.uri())
        .args(["login", "--phone", "+60123456789"])
        .write_stdin("b\n+60198765432\n123456\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Phone number:"))
        .stdout(predicate::str::contains("Requesting a code for +60198765432"))
        .stdout(predicate::str::contains("✓ Logged in"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_requests_carry_stored_session_token() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = TempDir::new().unwrap();
    fs::create_dir_all(home.path().join("storage")).unwrap();
    fs::write(
        session_path(home.path()),
        json!({
            "user": {"id": "u1"},
            "access_token": "stored-access-token",
            "refresh_token": "stored-refresh-token"
        })
        .to_string(),
    )
    .unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/forgot-password"))
        .and(header("authorization", "Bearer stored-access-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .env("LOYALTY_API_URL", server.uri())
        .args(["forgot-password", "--email", "aisyah@example.com"])
        .assert()
        .success();
}

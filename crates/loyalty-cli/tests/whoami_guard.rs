//! Privilege checks for `loyalty whoami --require`.

use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::{Value, json};
use tempfile::TempDir;

fn write_session(home: &Path, user: Value) {
    let storage = home.join("storage");
    fs::create_dir_all(&storage).unwrap();
    let session = json!({
        "user": user,
        "access_token": "access-token-0123456789",
        "refresh_token": "refresh-token-0123456789"
    });
    fs::write(storage.join("loyalty_session.json"), session.to_string()).unwrap();
}

#[test]
fn test_whoami_without_session_redirects_to_login() {
    let home = TempDir::new().unwrap();

    cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .arg("whoami")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));

    cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .args(["debug-log", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("guard: redirect to /login"));
}

#[test]
fn test_whoami_shows_profile() {
    let home = TempDir::new().unwrap();
    write_session(
        home.path(),
        json!({"id": 42, "name": "Aisyah", "email": "aisyah@example.com", "business_id": "b7"}),
    );

    cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .arg("whoami")
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged in as Aisyah"))
        .stdout(predicate::str::contains("id: 42"))
        .stdout(predicate::str::contains("business: b7"))
        .stdout(predicate::str::contains("expires: never"))
        .stdout(predicate::str::contains("access-token-0123456789").not());
}

#[test]
fn test_whoami_json_prints_raw_profile() {
    let home = TempDir::new().unwrap();
    write_session(home.path(), json!({"id": "u1", "loyalty_tier": "gold"}));

    let output = cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .args(["whoami", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let user: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(user, json!({"id": "u1", "loyalty_tier": "gold"}));
}

#[test]
fn test_staff_user_denied_admin_access() {
    let home = TempDir::new().unwrap();
    write_session(home.path(), json!({"id": "u2", "is_staff": true}));

    cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .args(["whoami", "--require", "admin"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("requires admin privileges"));

    cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .args(["whoami", "--require", "staff"])
        .assert()
        .success()
        .stdout(predicate::str::contains("staff: yes"));
}

#[test]
fn test_admin_role_grants_admin_access() {
    let home = TempDir::new().unwrap();
    write_session(home.path(), json!({"id": "u3", "role": "admin"}));

    cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .args(["whoami", "--require", "admin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("admin: yes"));
}

#[test]
fn test_corrupt_session_counts_as_logged_out() {
    let home = TempDir::new().unwrap();
    let storage = home.path().join("storage");
    fs::create_dir_all(&storage).unwrap();
    fs::write(storage.join("loyalty_session.json"), "{not json").unwrap();

    cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .arg("whoami")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not logged in"));
}

#[test]
fn test_debug_log_clear_and_limit() {
    let home = TempDir::new().unwrap();

    for _ in 0..3 {
        cargo_bin_cmd!("loyalty")
            .env("LOYALTY_HOME", home.path())
            .arg("whoami")
            .assert()
            .failure();
    }

    let output = cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .args(["debug-log", "show", "--limit", "2"])
        .output()
        .unwrap();
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 2);

    cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .args(["debug-log", "clear"])
        .assert()
        .success();

    cargo_bin_cmd!("loyalty")
        .env("LOYALTY_HOME", home.path())
        .args(["debug-log", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No debug log entries."));
}

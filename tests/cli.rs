//! CLI integration tests for assetry admin commands.
//!
//! Each test uses an isolated temp directory for the database, so tests can
//! run in parallel.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::Path;

use assert_cmd::Command;
use assetry::store::{SqliteStore, Store};
use predicates::prelude::*;
use tempfile::TempDir;

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("assetry").expect("failed to find binary");
        cmd.env("NO_COLOR", "1");
        cmd
    }

    fn init(&self, username: &str, password: Option<&str>) -> assert_cmd::assert::Assert {
        let mut cmd = self.cmd();
        cmd.args([
            "admin",
            "init",
            "--data-dir",
            &self.data_dir_str(),
            "--username",
            username,
        ]);
        if let Some(password) = password {
            cmd.args(["--password", password]);
        }
        cmd.assert()
    }
}

#[test]
fn test_init_prints_generated_password() {
    let ctx = TestContext::new();

    ctx.init("root", None)
        .success()
        .stdout(predicate::str::contains("Created system super user 'root'"))
        .stdout(predicate::str::contains("Password (save this"));

    assert!(ctx.data_dir().join("assetry.db").exists());
}

#[test]
fn test_init_with_password_creates_super_user() {
    let ctx = TestContext::new();

    ctx.init("root", Some("rootpass"))
        .success()
        .stdout(predicate::str::contains("Password").not());

    let store = SqliteStore::new(ctx.data_dir().join("assetry.db")).expect("open store");
    let user = store
        .get_user_by_username("root")
        .expect("query user")
        .expect("user exists");
    assert!(user.roles.system_super());
    assert!(!user.banned);
}

#[test]
fn test_init_twice_same_user_fails() {
    let ctx = TestContext::new();

    ctx.init("root", Some("rootpass")).success();
    ctx.init("root", Some("rootpass"))
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_init_rejects_short_password() {
    let ctx = TestContext::new();

    ctx.init("root", Some("abc")).failure();
}

#[test]
fn test_serve_requires_init() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args(["serve", "--data-dir", &ctx.data_dir_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn test_serve_rejects_bad_config() {
    let ctx = TestContext::new();
    let config = ctx.data_dir().join("assetry.toml");
    std::fs::write(&config, "port = \"eighty\"\n").expect("write config");

    ctx.cmd()
        .args(["serve", "--config"])
        .arg(&config)
        .assert()
        .failure();
}

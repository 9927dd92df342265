//! Integration tests for the tenant-sql binary.

use std::io::Write;

use assert_cmd::{Command, cargo::cargo_bin_cmd};
use predicates::prelude::*;
use tempfile::{Builder, NamedTempFile, TempDir};

const MAPPINGS: &str = r#"
[[mappings]]
customerId = "0b6c9d55-7f3e-4bd0-9d38-2a4c1f1e9a10"
customerCode = "ABC"
customerName = "ABC Corp"
schemaName = "abc"
objectPrefix = "abc_"
databaseUser = "abcuser"
"#;

/// Binary run from an empty directory so no local config is picked up
fn cmd(home: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("tenant-sql");
    cmd.current_dir(home.path())
        .env("HOME", home.path())
        .env_remove("TENANT_SQL_MAPPINGS")
        .env_remove("TENANT_SQL_CANONICAL_SCHEMA")
        .env_remove("TENANT_SQL_CANONICAL_PREFIX")
        .env_remove("RUST_LOG");
    cmd
}

fn sql_file(content: &str) -> NamedTempFile {
    let mut file = Builder::new().suffix(".sql").tempfile().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

fn mappings_file() -> NamedTempFile {
    let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
    write!(file, "{}", MAPPINGS).unwrap();
    file
}

#[test]
fn test_refs_text() {
    let home = TempDir::new().unwrap();
    let sql = sql_file("SELECT t.Id FROM om.om_table t");

    cmd(&home)
        .args(["refs", "--no-color", sql.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Table   om.om_table"))
        .stdout(predicate::str::contains("Column  om.om_table.Id"));
}

#[test]
fn test_refs_json() {
    let home = TempDir::new().unwrap();
    let sql = sql_file("CREATE VIEW om.om_v AS SELECT 1 AS One");

    cmd(&home)
        .args(["refs", "-f", "json", sql.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"kind\": \"View\""));
}

#[test]
fn test_refs_from_stdin() {
    let home = TempDir::new().unwrap();

    cmd(&home)
        .args(["refs", "--no-color", "-"])
        .write_stdin("SELECT * FROM om.om_piped")
        .assert()
        .success()
        .stdout(predicate::str::contains("om.om_piped"));
}

#[test]
fn test_refs_several_files_have_headers() {
    let home = TempDir::new().unwrap();
    let first = sql_file("SELECT * FROM om.om_a");
    let second = sql_file("SELECT * FROM om.om_b");

    cmd(&home)
        .args([
            "refs",
            "--no-color",
            first.path().to_str().unwrap(),
            second.path().to_str().unwrap()
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("== "))
        .stdout(predicate::str::contains("om.om_b"));
}

#[test]
fn test_refs_parse_failure() {
    let home = TempDir::new().unwrap();
    let sql = sql_file("SELECT FROM");

    cmd(&home)
        .args(["refs", sql.path().to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_refs_file_not_found() {
    let home = TempDir::new().unwrap();

    cmd(&home)
        .args(["refs", "/nonexistent/query.sql"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_validate_ok() {
    let home = TempDir::new().unwrap();
    let sql = sql_file("SELECT 1");

    cmd(&home)
        .args(["validate", "--no-color", sql.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"));
}

#[test]
fn test_validate_reports_position() {
    let home = TempDir::new().unwrap();
    let sql = sql_file("SELECT 1\nGO\nSELECT * FROM om.om_table WHERE )");

    cmd(&home)
        .args(["validate", "--no-color", sql.path().to_str().unwrap()])
        .assert()
        .code(1)
        .stdout(predicate::str::contains(":3:33: error:"));
}

#[test]
fn test_normalize_with_mappings() {
    let home = TempDir::new().unwrap();
    let sql = sql_file("SELECT * FROM [abc].[abc_table]");
    let mappings = mappings_file();

    cmd(&home)
        .args([
            "--mappings",
            mappings.path().to_str().unwrap(),
            "normalize",
            sql.path().to_str().unwrap()
        ])
        .assert()
        .success()
        .stdout("SELECT * FROM [om].[om_table]\n");
}

#[test]
fn test_normalize_mappings_from_env() {
    let home = TempDir::new().unwrap();
    let sql = sql_file("SELECT * FROM abcuser.abcuser_orders");
    let mappings = mappings_file();

    cmd(&home)
        .env("TENANT_SQL_MAPPINGS", mappings.path())
        .args(["normalize", sql.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("om.om_orders"));
}

#[test]
fn test_normalize_without_mappings_is_unchanged() {
    let home = TempDir::new().unwrap();
    let sql = sql_file("SELECT * FROM abc.abc_table");

    cmd(&home)
        .args(["normalize", sql.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout("SELECT * FROM abc.abc_table\n");
}

#[test]
fn test_render_for_customer() {
    let home = TempDir::new().unwrap();
    let sql = sql_file("SELECT * FROM om.om_table");
    let mappings = mappings_file();

    cmd(&home)
        .args([
            "render",
            sql.path().to_str().unwrap(),
            "--customer",
            "abc",
            "--mappings",
            mappings.path().to_str().unwrap(),
            "-f",
            "json"
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"customerCode\": \"abc\""))
        .stdout(predicate::str::contains("abc.abc_table"));
}

#[test]
fn test_render_unknown_customer() {
    let home = TempDir::new().unwrap();
    let sql = sql_file("SELECT * FROM om.om_table");
    let mappings = mappings_file();

    cmd(&home)
        .args([
            "--mappings",
            mappings.path().to_str().unwrap(),
            "render",
            sql.path().to_str().unwrap(),
            "-c",
            "NOPE"
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_local_config_sets_canonical() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join(".tenant-sql.toml"),
        "[canonical]\nschema = \"core\"\nprefix = \"core_\"\n"
    )
    .unwrap();
    let sql = sql_file("SELECT * FROM abc.abc_table");
    let mappings = mappings_file();

    cmd(&home)
        .args([
            "--mappings",
            mappings.path().to_str().unwrap(),
            "normalize",
            sql.path().to_str().unwrap()
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("core.core_table"));
}

#[test]
fn test_invalid_local_config() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join(".tenant-sql.toml"), "[canonical\n").unwrap();
    let sql = sql_file("SELECT 1");

    cmd(&home)
        .args(["validate", sql.path().to_str().unwrap()])
        .assert()
        .failure();
}

#[test]
fn test_help() {
    let home = TempDir::new().unwrap();

    cmd(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("refs"))
        .stdout(predicate::str::contains("render"));
}

#[test]
fn test_render_requires_customer() {
    let home = TempDir::new().unwrap();

    cmd(&home)
        .args(["render", "query.sql"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--customer"));
}

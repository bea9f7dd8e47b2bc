use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn flash(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_flash"));
    cmd.current_dir(dir).env_remove("FLASH_KEY").env_remove("RUST_LOG");
    cmd
}

fn workspace() -> TempDir {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("tls.cert"), vec![0x30u8; 128]).unwrap();
    std::fs::write(tmp.path().join("admin.macaroon"), b"SECRET-MACAROON-BYTES").unwrap();
    tmp
}

fn seal(dir: &Path, extra: &[&str]) -> String {
    let output = flash(dir)
        .args(["seal", "-c", "tls.cert", "-m", "admin.macaroon"])
        .args(extra)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let key = String::from_utf8(output).unwrap();
    assert_eq!(key.lines().count(), 1, "stdout must carry only the key");
    key.trim().to_owned()
}

#[test]
fn seal_then_open_with_key_flag() {
    let tmp = workspace();
    let key = seal(tmp.path(), &["-o", "auth.bin"]);
    assert!(tmp.path().join("auth.bin").is_file());

    flash(tmp.path())
        .args(["open", "-a", "auth.bin", "-k", &key])
        .assert()
        .success()
        .stdout("certificate: 128 bytes\nmacaroon: 21 bytes\n")
        .stdout(predicate::str::contains("SECRET").not());
}

#[test]
fn key_can_come_from_the_environment() {
    let tmp = workspace();
    let key = seal(tmp.path(), &[]);

    flash(tmp.path())
        .args(["open", "-a", "auth.bin"])
        .env("FLASH_KEY", &key)
        .assert()
        .success()
        .stdout(predicate::str::contains("macaroon: 21 bytes"));
}

#[test]
fn wrong_key_fails_with_authentication_error() {
    let tmp = workspace();
    seal(tmp.path(), &[]);
    let other = tempfile::tempdir().unwrap();
    let wrong = flash(other.path()).arg("keygen").output().unwrap().stdout;
    let wrong = String::from_utf8(wrong).unwrap();

    flash(tmp.path())
        .args(["open", "-a", "auth.bin", "-k", wrong.trim()])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Authentication failed"))
        .stderr(predicate::str::contains(wrong.trim()).not());
}

#[test]
fn malformed_key_is_an_encoding_error() {
    let tmp = workspace();
    seal(tmp.path(), &[]);

    flash(tmp.path())
        .args(["open", "-a", "auth.bin", "-k", "not-hex"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid key encoding"));
}

#[test]
fn bound_containers_require_the_bound_flag() {
    let tmp = workspace();
    let key = seal(tmp.path(), &["--bound"]);

    flash(tmp.path()).args(["open", "-a", "auth.bin", "-k", &key]).assert().failure();
    flash(tmp.path()).args(["open", "-a", "auth.bin", "-k", &key, "--bound"]).assert().success();
}

#[test]
fn inspect_prints_header_and_size() {
    let tmp = workspace();
    seal(tmp.path(), &["-o", "state/auth.bin"]);
    let size = std::fs::metadata(tmp.path().join("state/auth.bin")).unwrap().len();

    flash(tmp.path())
        .args(["inspect", "-a", "state/auth.bin"])
        .assert()
        .success()
        .stdout(format!("certificate: 128 bytes\nmacaroon: 21 bytes\ncontainer: {size} bytes\n"));
}

#[test]
fn inspect_of_missing_container_fails() {
    let tmp = workspace();
    flash(tmp.path()).args(["inspect", "-a", "auth.bin"]).assert().failure();
}

#[test]
fn keygen_prints_a_usable_key() {
    let tmp = tempfile::tempdir().unwrap();
    flash(tmp.path())
        .arg("keygen")
        .assert()
        .success()
        .stdout(predicate::str::is_match("^[0-9a-f]+\n$").unwrap());
}

#[test]
fn config_file_sets_container_and_format() {
    let tmp = workspace();
    std::fs::write(
        tmp.path().join("flash.toml"),
        "[vault]\ncontainer = \"node/creds.bin\"\nformat = \"bound\"\n",
    )
    .unwrap();

    let key = seal(tmp.path(), &[]);
    assert!(tmp.path().join("node/creds.bin").is_file());

    flash(tmp.path()).args(["open", "-k", &key]).assert().success();
    flash(tmp.path())
        .args(["open", "-k", &key])
        .env("FLASH__VAULT__FORMAT", "detached")
        .assert()
        .failure();
}

#[test]
fn explicit_missing_config_is_an_error() {
    let tmp = tempfile::tempdir().unwrap();
    flash(tmp.path())
        .args(["--config", "absent.toml", "keygen"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration"));
}

#[test]
fn missing_input_file_fails_without_output() {
    let tmp = tempfile::tempdir().unwrap();
    flash(tmp.path())
        .args(["seal", "-c", "absent.cert", "-m", "absent.macaroon"])
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("absent.cert"));
    assert!(!tmp.path().join("auth.bin").exists());
}

#[test]
fn no_arguments_prints_help() {
    let tmp = tempfile::tempdir().unwrap();
    flash(tmp.path()).assert().failure().stderr(predicate::str::contains("Usage"));
}

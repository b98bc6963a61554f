//! CLI end-to-end tests
//!
//! Tests for the avfs command-line interface.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the avfs binary
#[allow(deprecated)]
fn avfs_cmd() -> Command {
    Command::cargo_bin("avfs").unwrap()
}

/// A small clip with ragged audio so every command has real work to do.
fn write_config(dir: &Path) -> PathBuf {
    let config_file = dir.join("avfs.toml");
    fs::write(
        &config_file,
        r#"
[clip]
name = "tiny"
width = 8
height = 8
pixel_format = "yv12"
frames = 12
fps_num = 4
fps_den = 1

[clip.audio]
sample_rate = 400
channels = 2
sample_format = "s16"

[read]
chunk_size = 1000
"#,
    )
    .unwrap();
    config_file
}

fn file_size(config: &Path) -> u64 {
    let output = avfs_cmd()
        .args(["info", "--json", "--config", config.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    json["file_size"].as_u64().unwrap()
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = avfs_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = avfs_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("avfs"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_command() {
    let mut cmd = avfs_cmd();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_read_help() {
    let mut cmd = avfs_cmd();
    cmd.args(["read", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Synthesize a byte range"));
}

#[test]
fn test_cli_info_text() {
    let temp = tempdir().unwrap();
    let config = write_config(temp.path());

    let mut cmd = avfs_cmd();
    cmd.args(["info", "--config", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("File: tiny.avi"))
        .stdout(predicate::str::contains("Segments: 1"))
        .stdout(predicate::str::contains("Audio: 1200 samples"));
}

#[test]
fn test_cli_info_json() {
    let temp = tempdir().unwrap();
    let config = write_config(temp.path());

    let output = avfs_cmd()
        .args(["info", "--json", "--config", config.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["width"], 8);
    assert_eq!(json["video"]["frame_count"], 12);
    assert_eq!(json["video"]["handler"], "YV12");
    assert_eq!(json["audio"]["sample_count"], 1200);
    assert_eq!(json["segments"].as_array().unwrap().len(), 1);
    assert_eq!(json["segments"][0]["size"], json["file_size"]);
}

#[test]
fn test_cli_read_to_file() {
    let temp = tempdir().unwrap();
    let config = write_config(temp.path());
    let out = temp.path().join("head.bin");

    let mut cmd = avfs_cmd();
    cmd.args([
        "read",
        "--config",
        config.to_str().unwrap(),
        "--offset",
        "0",
        "--length",
        "12",
        "--output",
        out.to_str().unwrap(),
    ])
    .assert()
    .success();

    let bytes = fs::read(&out).unwrap();
    assert_eq!(bytes.len(), 12);
    assert_eq!(&bytes[..4], b"RIFF");
    assert_eq!(&bytes[8..12], b"AVI ");
}

#[test]
fn test_cli_read_to_stdout() {
    let temp = tempdir().unwrap();
    let config = write_config(temp.path());

    let mut cmd = avfs_cmd();
    cmd.args([
        "read",
        "--config",
        config.to_str().unwrap(),
        "--offset",
        "8",
        "--length",
        "8",
    ])
    .assert()
    .success()
    .stdout(predicate::eq(&b"AVI LIST"[..]));
}

#[test]
fn test_cli_read_past_end_fails() {
    let temp = tempdir().unwrap();
    let config = write_config(temp.path());
    let size = file_size(&config);

    let mut cmd = avfs_cmd();
    cmd.args([
        "read",
        "--config",
        config.to_str().unwrap(),
        "--offset",
        &size.to_string(),
        "--length",
        "1",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_cli_export_matches_ranged_read() {
    let temp = tempdir().unwrap();
    let config = write_config(temp.path());
    let size = file_size(&config);

    let mut cmd = avfs_cmd();
    cmd.args([
        "export",
        "--config",
        config.to_str().unwrap(),
        temp.path().to_str().unwrap(),
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains(format!("Wrote {} bytes", size)));

    let exported = fs::read(temp.path().join("tiny.avi")).unwrap();
    assert_eq!(exported.len() as u64, size);

    // A differently chunked read of the tail must agree with the export.
    let tail = temp.path().join("tail.bin");
    let offset = size - 300_000;
    avfs_cmd()
        .args([
            "read",
            "--config",
            config.to_str().unwrap(),
            "--offset",
            &offset.to_string(),
            "--length",
            "300000",
            "--output",
            tail.to_str().unwrap(),
        ])
        .assert()
        .success();
    let tail = fs::read(&tail).unwrap();
    assert!(tail[..] == exported[offset as usize..]);
}

#[test]
fn test_cli_export_zero_chunk_size() {
    let temp = tempdir().unwrap();
    let config = write_config(temp.path());

    let mut cmd = avfs_cmd();
    cmd.args([
        "export",
        "--config",
        config.to_str().unwrap(),
        "--chunk-size",
        "0",
        temp.path().join("out.avi").to_str().unwrap(),
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("Chunk size cannot be 0"));
}

#[test]
fn test_cli_inspect_shows_tree() {
    let temp = tempdir().unwrap();
    let config = write_config(temp.path());

    let mut cmd = avfs_cmd();
    cmd.args(["inspect", "--config", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("RIFF:AVI "))
        .stdout(predicate::str::contains("LIST:hdrl"))
        .stdout(predicate::str::contains("LIST:movi"))
        .stdout(predicate::str::contains("ix00"))
        .stdout(predicate::str::contains("ix01"))
        .stdout(predicate::str::contains("idx1"))
        .stdout(predicate::str::contains("more data chunks"));
}

#[test]
fn test_cli_validate_config() {
    let temp = tempdir().unwrap();
    let config = write_config(temp.path());

    let mut cmd = avfs_cmd();
    cmd.args(["validate", config.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("8x8 yv12"));
}

#[test]
fn test_cli_validate_rejects_bad_format() {
    let temp = tempdir().unwrap();
    let config_file = temp.path().join("bad.toml");
    fs::write(
        &config_file,
        r#"
[clip]
pixel_format = "nv12"
"#,
    )
    .unwrap();

    let mut cmd = avfs_cmd();
    cmd.args(["validate", config_file.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown pixel format"));
}

#[test]
fn test_cli_missing_config_file() {
    let mut cmd = avfs_cmd();
    cmd.args(["info", "--config", "/nonexistent/avfs.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

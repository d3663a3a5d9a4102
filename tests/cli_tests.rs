//! Start-up checks of the streamcrawl binary

use std::fs;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn streamcrawl(args: &[&std::path::Path]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_streamcrawl"))
        .args(args)
        .stdin(Stdio::null())
        .output()
        .unwrap()
}

#[test]
fn test_existing_output_reported_before_bad_config() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("crawl.json");
    let output = temp_dir.path().join("out.gz");
    fs::write(&config, "{not json").unwrap();
    fs::write(&output, b"keep me").unwrap();

    let result = streamcrawl(&[&config, &output]);

    assert_eq!(result.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("already exists"));
    assert!(!stderr.contains("malformed config"));
    assert_eq!(fs::read(&output).unwrap(), b"keep me");
}

#[test]
fn test_bad_config_leaves_no_output() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("crawl.json");
    let output = temp_dir.path().join("out.gz");
    fs::write(&config, r#"{"tags": ["rust"], "user": "alice"}"#).unwrap();

    let result = streamcrawl(&[&config, &output]);

    assert_eq!(result.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&result.stderr).contains("malformed config"));
    assert!(!output.exists());
}

#[test]
fn test_missing_arguments_is_usage_error() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("crawl.json");

    let result = streamcrawl(&[&config]);
    assert_eq!(result.status.code(), Some(2));
}

#![cfg(all(unix, feature = "cli"))]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Channel 31 shows "1", channel 0 shows "?1", channel 3 shows lane 4 at
/// 01:32.17. Each channel is committed by the control byte that follows it.
const CAPTURE: &[u8] = &[
    0x80, 0x0E, // channel 31, segment 0 = '1'
    0xBE, 0x1E, // channel 0, segment 1 = '1'
    0xB8, 0x0B, 0x10, 0x2F, 0x3E, 0x4C, 0x5D, 0x6E, 0x78, // channel 3, "4 013217"
    0x80, // back to channel 31, left staged at end of file
];

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "lanecast-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn write_capture(dir: &Path) -> PathBuf {
    let path = dir.join("capture.bin");
    std::fs::write(&path, CAPTURE).expect("capture should be writable");
    path
}

fn lanecast(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lanecast"))
        .args(["--log-level", "error"])
        .args(args)
        .env_remove("LANECAST_CONFIG")
        .output()
        .expect("lanecast should run")
}

fn json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be JSON"))
        .collect()
}

#[test]
fn decode_prints_each_committed_channel() {
    let dir = unique_temp_dir("decode");
    let capture = write_capture(&dir);

    let output = lanecast(&[
        "--format",
        "json",
        "decode",
        capture.to_str().unwrap(),
        "--mode",
        "3=lane",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let records = json_lines(&output);
    assert_eq!(records.len(), 3);

    assert_eq!(records[0]["sequence"], 1);
    assert_eq!(records[0]["channel"], 31);
    assert_eq!(records[0]["display"], "1       ");

    assert_eq!(records[1]["channel"], 0);
    assert!(records[1]["data"][0].is_null());
    assert_eq!(records[1]["data"][1], 49);

    assert_eq!(records[2]["channel"], 3);
    assert_eq!(records[2]["mode"], "lane");
    assert_eq!(records[2]["display"], "4 _ 01:32.17");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn decode_honors_count_and_channel_filter() {
    let dir = unique_temp_dir("decode-filter");
    let capture = write_capture(&dir);

    let output = lanecast(&[
        "--format",
        "json",
        "decode",
        capture.to_str().unwrap(),
        "--channels",
        "0,3",
        "--count",
        "1",
    ]);
    assert!(output.status.success());

    let records = json_lines(&output);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["channel"], 0);
    assert_eq!(records[0]["sequence"], 2);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn decode_reads_channel_modes_from_config() {
    let dir = unique_temp_dir("decode-config");
    let capture = write_capture(&dir);
    let config = dir.join("lanecast.json");
    std::fs::write(&config, r#"{ "channels": { "3": "clock" } }"#).unwrap();

    let output = lanecast(&[
        "--format",
        "json",
        "--config",
        config.to_str().unwrap(),
        "decode",
        capture.to_str().unwrap(),
        "--channels",
        "3",
    ]);
    assert!(output.status.success());

    let records = json_lines(&output);
    assert_eq!(records[0]["mode"], "clock");
    assert_eq!(records[0]["display"], "01:32.17");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn decode_table_output_has_header() {
    let dir = unique_temp_dir("decode-table");
    let capture = write_capture(&dir);

    let output = lanecast(&["--format", "table", "decode", capture.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("CHANNEL"));
    assert!(stdout.contains("DISPLAY"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn decode_missing_file_exits_with_source_error() {
    let dir = unique_temp_dir("decode-missing");
    let missing = dir.join("nope.bin");

    let output = lanecast(&["decode", missing.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("nope.bin"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn invalid_mode_assignment_exits_with_usage() {
    let dir = unique_temp_dir("decode-usage");
    let capture = write_capture(&dir);

    let output = lanecast(&["decode", capture.to_str().unwrap(), "--mode", "40=lane"]);
    assert_eq!(output.status.code(), Some(64));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn trace_dumps_bytes_up_to_limit() {
    let dir = unique_temp_dir("trace");
    let capture = write_capture(&dir);

    let output = lanecast(&[
        "--format",
        "json",
        "trace",
        capture.to_str().unwrap(),
        "--limit",
        "4",
    ]);
    assert!(output.status.success());

    let rows = json_lines(&output);
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0]["kind"], "control");
    assert_eq!(rows[0]["channel"], 31);
    assert_eq!(rows[1]["decoded"], "1");
    assert_eq!(rows[2]["note"], "switch");
    assert_eq!(rows[3]["hex"], "0x1e");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn version_prints_package_version() {
    let output = lanecast(&["version"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("lanecast {}", env!("CARGO_PKG_VERSION"))
    );

    let extended = lanecast(&["version", "--extended"]);
    assert!(String::from_utf8_lossy(&extended.stdout).contains("channels: 32"));
}

#[test]
fn serve_without_source_exits_with_usage() {
    let output = Command::new(env!("CARGO_BIN_EXE_lanecast"))
        .args(["--log-level", "error", "serve"])
        .env_remove("LANECAST_CONFIG")
        .env_remove("LANECAST_FILE")
        .env_remove("LANECAST_PORT")
        .output()
        .expect("lanecast should run");

    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no source configured"));
}

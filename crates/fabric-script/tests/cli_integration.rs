//! Integration tests for the cfgfab CLI.

use fabric_core as _;
use fabric_script as _;
use log as _;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn binary_path() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    path.pop();
    path.join("cfgfab")
}

fn create_temp_file(dir: &std::path::Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

const ROUND_TRIP: &str = "\
; one config register per terminal
.config_regs 1
.status_regs 0

wr 0x0000 0xdeadbeef => wr 0x0000 0
wr 0x1000 0xcafec001 => wr 0x1000 0
rd 0x0000 => rd 0x0000 0xdeadbeef
rd 0x1000 => rd 0x1000 0xcafec001

expect config 0 0 == 0xdeadbeef
expect config 1 0 == 0xcafec001
";

#[test]
fn run_passing_script() {
    let temp_dir = tempfile::tempdir().unwrap();
    let script = create_temp_file(temp_dir.path(), "round_trip.cfg", ROUND_TRIP);

    let output = Command::new(binary_path())
        .args(["run", script.to_str().unwrap()])
        .output()
        .expect("failed to run cfgfab");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("PASS (line 5): wr 0x0000 0x0"));
    assert!(stdout.contains("6 passed, 0 failed"));
}

#[test]
fn run_failing_script_exits_nonzero() {
    let temp_dir = tempfile::tempdir().unwrap();
    let script = create_temp_file(
        temp_dir.path(),
        "wrong.cfg",
        ".config_regs 1\n.status_regs 0\nwr 0x2000 7\nrd 0x2000 => rd 0x2000 8\n",
    );

    let output = Command::new(binary_path())
        .args(["run", script.to_str().unwrap()])
        .output()
        .expect("failed to run cfgfab");

    assert!(!output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("FAIL (line 4): expected rd 0x2000 0x8, got rd 0x2000 0x7"));
}

#[test]
fn run_with_trace_prints_events() {
    let temp_dir = tempfile::tempdir().unwrap();
    let script = create_temp_file(temp_dir.path(), "trace.cfg", "wr 0x3000 1\n");

    let output = Command::new(binary_path())
        .args(["run", script.to_str().unwrap(), "--trace"])
        .output()
        .expect("failed to run cfgfab");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("push      wr 0x3000 0x1"));
    assert!(stdout.contains("-> t3"));
}

#[test]
fn check_reports_topology() {
    let temp_dir = tempfile::tempdir().unwrap();
    let script = create_temp_file(temp_dir.path(), "check.cfg", ROUND_TRIP);

    let output = Command::new(binary_path())
        .args(["check", script.to_str().unwrap()])
        .output()
        .expect("failed to run cfgfab");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("4 terminals, 4 transactions, 2 register checks"));
}

#[test]
fn syntax_error_names_the_line() {
    let temp_dir = tempfile::tempdir().unwrap();
    let script = create_temp_file(temp_dir.path(), "bad.cfg", "rd 0x0\nwr 0x10\n");

    let output = Command::new(binary_path())
        .args(["check", script.to_str().unwrap()])
        .output()
        .expect("failed to run cfgfab");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("line 2:"));
}

#[test]
fn missing_script_fails() {
    let status = Command::new(binary_path())
        .args(["run", "/nonexistent/script.cfg"])
        .status()
        .expect("failed to run cfgfab");

    assert!(!status.success());
}

#[test]
fn help_exits_zero() {
    let status = Command::new(binary_path())
        .arg("--help")
        .status()
        .expect("failed to run cfgfab");

    assert!(status.success());
}

//! End-to-end tests driving the `ternctl` binary across processes.

use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tern_waitset::platform::segment_path;

const BIN: &str = env!("CARGO_BIN_EXE_ternctl");

fn unique(prefix: &str) -> String {
    format!("{prefix}_{}", std::process::id())
}

fn ternctl(args: &[&str]) -> Output {
    Command::new(BIN).args(args).output().unwrap()
}

fn wait_for_file(path: &Path) {
    let start = Instant::now();
    while !path.exists() {
        assert!(
            start.elapsed() < Duration::from_secs(10),
            "segment {} never appeared",
            path.display()
        );
        thread::sleep(Duration::from_millis(10));
    }
}

fn wait_with_deadline(mut child: Child) -> Output {
    let start = Instant::now();
    while child.try_wait().unwrap().is_none() {
        if start.elapsed() > Duration::from_secs(10) {
            child.kill().unwrap();
            panic!("serve did not exit");
        }
        thread::sleep(Duration::from_millis(10));
    }
    child.wait_with_output().unwrap()
}

fn spawn_serve(args: &[&str]) -> Child {
    Command::new(BIN)
        .arg("serve")
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap()
}

#[test]
fn trigger_wakes_serving_process() {
    let name = unique("cli_wake");
    let path = segment_path(&name);
    let serve = spawn_serve(&[
        "--segment",
        &name,
        "--slots",
        "3",
        "--timeout-ms",
        "50",
        "--max-events",
        "1",
    ]);
    wait_for_file(&path);

    let trigger = ternctl(&["trigger", "--segment", &name, "--slot", "2"]);
    assert!(trigger.status.success());

    let output = wait_with_deadline(serve);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ready: 2"), "stdout: {stdout}");
    assert!(!path.exists());
}

#[test]
fn info_reports_segment_state() {
    let name = unique("cli_info");
    let path = segment_path(&name);
    let serve = spawn_serve(&["--segment", &name, "--slots", "4", "--max-events", "1"]);
    wait_for_file(&path);

    let info = ternctl(&["info", "--segment", &name]);
    assert!(info.status.success());
    let stdout = String::from_utf8_lossy(&info.stdout);
    assert!(stdout.contains("slots: 4"), "stdout: {stdout}");
    assert!(stdout.contains("(alive)"), "stdout: {stdout}");

    assert!(ternctl(&["trigger", "--segment", &name, "--slot", "0"]).status.success());
    assert!(wait_with_deadline(serve).status.success());
}

#[test]
fn serve_reads_config_file() {
    let name = unique("cli_config");
    let path = segment_path(&name);
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
segment = "{name}"
slots = 2
timeout_ms = 20
max_events = 1

[shared]
service_name = "cli-test"
"#
    )
    .unwrap();

    let serve = spawn_serve(&["--config", file.path().to_str().unwrap()]);
    wait_for_file(&path);

    assert!(ternctl(&["trigger", "--segment", &name, "--slot", "1"]).status.success());
    let output = wait_with_deadline(serve);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("ready: 1"));
}

#[test]
fn trigger_out_of_range_slot_fails() {
    let name = unique("cli_range");
    let path = segment_path(&name);
    let serve = spawn_serve(&["--segment", &name, "--slots", "2", "--max-events", "1"]);
    wait_for_file(&path);

    let trigger = ternctl(&["trigger", "--segment", &name, "--slot", "7"]);
    assert!(!trigger.status.success());
    assert!(String::from_utf8_lossy(&trigger.stderr).contains("out of range"));

    assert!(ternctl(&["trigger", "--segment", &name, "--slot", "1"]).status.success());
    assert!(wait_with_deadline(serve).status.success());
}

#[test]
fn commands_on_missing_segment_fail() {
    let name = unique("cli_missing");
    assert!(!ternctl(&["info", "--segment", &name]).status.success());
    assert!(!ternctl(&["trigger", "--segment", &name, "--slot", "0"]).status.success());
}

#[test]
fn serve_rejects_invalid_slot_count() {
    let name = unique("cli_invalid");
    let output = ternctl(&["serve", "--segment", &name, "--slots", "0"]);
    assert!(!output.status.success());
    assert!(!segment_path(&name).exists());
}

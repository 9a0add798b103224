use std::process::Command;

use serde_json::Value;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_steptempo-cli"))
}

#[test]
fn analyze_pulse_train_reports_calibrated_tempo() {
    let output = cli()
        .args([
            "analyze",
            "--pattern",
            "pulse-train",
            "--bpm",
            "100",
            "--duration-secs",
            "40",
            "--format",
            "json",
        ])
        .output()
        .expect("failed to run analyze");
    assert!(
        output.status.success(),
        "CLI exited with {:?}",
        output.status.code()
    );

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let json: Value = serde_json::from_str(stdout.trim()).expect("replay report JSON payload");
    assert_eq!(json["fixture_id"], "synthetic-PulseTrain");
    assert_eq!(json["beats"].as_u64(), Some(66));

    let bpm = json["bpm"].as_f64().expect("tempo estimate present");
    assert!((bpm - 100.0).abs() < 0.5, "expected ~100 BPM, got {bpm}");

    assert_eq!(json["calibrated"], Value::Bool(true));
    let slow = json["thresholds"]["slow"].as_f64().unwrap_or_default();
    assert!(
        (slow - 92.0).abs() < 0.5,
        "steady tempo should calibrate narrow, got slow bound {slow}"
    );
    assert_eq!(json["level"], "Moderate");
}

#[test]
fn analyze_silence_stays_idle() {
    let output = cli()
        .args([
            "analyze",
            "--pattern",
            "silence",
            "--duration-secs",
            "5",
            "--format",
            "json",
        ])
        .output()
        .expect("failed to run analyze");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let json: Value = serde_json::from_str(stdout.trim()).expect("replay report JSON payload");
    assert_eq!(json["beats"].as_u64(), Some(0));
    assert!(json["bpm"].is_null(), "silence must not produce an estimate");
    assert_eq!(json["calibrated"], Value::Bool(false));
    assert_eq!(json["level"], "Idle");
    // Fallback ticks once per simulated second, zero energy floors at 57
    assert_eq!(json["fallback_estimates"].as_u64(), Some(5));
    assert_eq!(json["last_fallback_bpm"].as_f64(), Some(57.0));
}

#[test]
fn analyze_out_writes_report_file() {
    let path = std::env::temp_dir().join(format!("steptempo-report-{}.json", std::process::id()));

    let output = cli()
        .args([
            "analyze",
            "--pattern",
            "steady",
            "--level",
            "100",
            "--duration-secs",
            "3",
            "--out",
            path.to_str().expect("temp path utf8"),
        ])
        .output()
        .expect("failed to run analyze");
    assert!(
        output.status.success(),
        "CLI exited with {:?}",
        output.status.code()
    );
    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    assert!(stdout.contains("Wrote report to"), "got {stdout}");

    let contents = std::fs::read_to_string(&path).expect("report file written");
    let json: Value = serde_json::from_str(&contents).expect("report file JSON");
    assert_eq!(json["fixture_id"], "synthetic-Steady");
    // Steady energy never spikes, but the fallback path still classifies
    assert_eq!(json["beats"].as_u64(), Some(0));
    assert_eq!(json["level"], "Moderate");

    let _ = std::fs::remove_file(&path);
}

#[test]
fn config_prints_effective_defaults() {
    let output = cli().args(["config"]).output().expect("failed to run config");
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let json: Value = serde_json::from_str(stdout.trim()).expect("config JSON");
    assert_eq!(json["engine"]["tick_ms"].as_u64(), Some(40));
    assert_eq!(json["calibration"]["window_secs"].as_f64(), Some(30.0));
    let ratio = json["detector"]["spike_ratio"].as_f64().unwrap_or_default();
    assert!((ratio - 1.3).abs() < 1e-6);
}

#[test]
fn analyze_requires_exactly_one_source() {
    let output = cli().args(["analyze"]).output().expect("failed to run analyze");
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(
        stderr.contains("exactly one source"),
        "expected source validation error, got {stderr}"
    );
}

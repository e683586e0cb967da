//! Unit tests for the host entry point.

use std::ffi::OsString;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

use rstest::{fixture, rstest};
use serde_json::json;
use tempfile::TempDir;

use super::*;

struct Outcome {
    code: ExitCode,
    stdout: String,
    stderr: String,
}

fn invoke(args: &[&str]) -> Outcome {
    let args: Vec<OsString> = std::iter::once("lattice-host")
        .chain(args.iter().copied())
        .map(OsString::from)
        .collect();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let code = run(args, &mut stdout, &mut stderr);
    Outcome {
        code,
        stdout: String::from_utf8(stdout).expect("stdout is utf-8"),
        stderr: String::from_utf8(stderr).expect("stderr is utf-8"),
    }
}

#[fixture]
fn config_dir() -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    let toml = format!(
        "command_plugin_dir = {:?}\ntransport_plugin_dir = {:?}\nlog_filter = \"error\"\n",
        dir.path().join("commands").display().to_string(),
        dir.path().join("transports").display().to_string(),
    );
    fs::write(dir.path().join("lattice.toml"), toml).expect("write config");
    dir
}

fn config_arg(dir: &Path) -> String {
    dir.join("lattice.toml").display().to_string()
}

#[rstest]
#[case(None, json!(null))]
#[case(Some("{\"a\": 1}"), json!({"a": 1}))]
#[case(Some("42"), json!(42))]
#[case(Some("ping"), json!("ping"))]
fn input_falls_back_to_plain_text(#[case] raw: Option<&str>, #[case] expected: Value) {
    assert_eq!(parse_input(raw), expected);
}

#[rstest]
fn help_goes_to_stdout() {
    let outcome = invoke(&["--help"]);
    assert_eq!(outcome.code, ExitCode::SUCCESS);
    assert!(outcome.stdout.contains("Usage"));
    assert!(outcome.stderr.is_empty());
}

#[rstest]
fn missing_subcommand_is_a_usage_error() {
    let outcome = invoke(&[]);
    assert_eq!(outcome.code, ExitCode::FAILURE);
    assert!(!outcome.stderr.is_empty());
}

#[rstest]
fn list_prints_builtins(config_dir: TempDir) {
    let config = config_arg(config_dir.path());
    let outcome = invoke(&["--config-path", &config, "list"]);
    assert_eq!(outcome.code, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    assert_eq!(
        outcome.stdout,
        "command\techo\tregistered\ntransport\techo\tinitialized\n"
    );
}

#[rstest]
fn run_prints_plugin_output(config_dir: TempDir) {
    let config = config_arg(config_dir.path());
    let outcome = invoke(&["--config-path", &config, "run", "command", "echo", "{\"n\":1}"]);
    assert_eq!(outcome.code, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    assert_eq!(outcome.stdout, "{\"n\":1}\n");
}

#[rstest]
fn unknown_plugin_fails(config_dir: TempDir) {
    let config = config_arg(config_dir.path());
    let outcome = invoke(&["--config-path", &config, "run", "transport", "ghost"]);
    assert_eq!(outcome.code, ExitCode::FAILURE);
    assert!(outcome.stderr.contains("ghost"), "stderr: {}", outcome.stderr);
    assert!(outcome.stdout.is_empty());
}

#[rstest]
fn malformed_config_file_fails(config_dir: TempDir) {
    let broken = config_dir.path().join("broken.toml");
    fs::write(&broken, "log_filter = [unterminated\n").expect("write config");
    let broken = broken.display().to_string();
    let outcome = invoke(&["--config-path", &broken, "list"]);
    assert_eq!(outcome.code, ExitCode::FAILURE);
    assert!(
        outcome.stderr.contains("failed to load configuration"),
        "stderr: {}",
        outcome.stderr
    );
}

#[rstest]
fn flags_override_the_config_file(config_dir: TempDir) {
    let config = config_arg(config_dir.path());
    let elsewhere = config_dir.path().join("elsewhere");
    let plugin = elsewhere.join("table_plugin");
    fs::create_dir_all(&plugin).expect("create plugin dir");
    fs::write(
        plugin.join("table_plugin.yml"),
        "classes: [EchoCommandPlugin]\n",
    )
    .expect("write main module");
    let elsewhere = elsewhere.display().to_string();

    let outcome = invoke(&[
        "--config-path",
        &config,
        "--command-plugin-dir",
        &elsewhere,
        "list",
    ]);
    assert_eq!(outcome.code, ExitCode::SUCCESS, "stderr: {}", outcome.stderr);
    assert!(
        outcome.stdout.contains("command\ttable\tregistered"),
        "stdout: {}",
        outcome.stdout
    );
}

#[rstest]
fn settings_flags_after_the_subcommand_are_rejected(config_dir: TempDir) {
    let config = config_arg(config_dir.path());
    let outcome = invoke(&["list", "--config-path", &config]);
    assert_eq!(outcome.code, ExitCode::FAILURE);
    assert!(outcome.stdout.is_empty());
}

#[rstest]
fn help_lists_settings_flags() {
    let outcome = invoke(&["--help"]);
    assert!(outcome.stdout.contains("--plugin-overrides"));
    assert!(outcome.stdout.contains("--config-path"));
}

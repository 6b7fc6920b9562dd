//! Integration tests for command mode (-c/--command flag) and sheet mode

use std::path::PathBuf;
use std::process::Command;

struct Cleanup(Vec<PathBuf>);
impl Drop for Cleanup {
    fn drop(&mut self) {
        for path in &self.0 {
            let _ = std::fs::remove_file(path);
        }
    }
}

fn temp_path(name: &str, ext: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "sheetcalc_cli_{}_{}_{}_{:?}.{}",
        name,
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos(),
        std::thread::current().id(),
        ext,
    ))
}

/// Run the binary with a config file of `config` contents, so a user's
/// ~/.config/sheetcalc/config.toml never leaks into the tests.
fn run_with_config(config: &str, args: &[&str]) -> (String, String, i32) {
    let config_path = temp_path("config", "toml");
    let _cleanup = Cleanup(vec![config_path.clone()]);
    std::fs::write(&config_path, config).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_sheetcalc"))
        .arg("--config")
        .arg(&config_path)
        .args(args)
        .env_remove("SHEETCALC_LOG")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    (stdout, stderr, exit_code)
}

fn run_command(args: &[&str]) -> (String, String, i32) {
    run_with_config("", args)
}

#[test]
fn test_basic_arithmetic() {
    let (stdout, _, code) = run_command(&["-c", "5 + 3"]);
    assert_eq!(stdout.trim(), "8");
    assert_eq!(code, 0);
}

#[test]
fn test_auto_prepend_equals() {
    let (stdout1, _, _) = run_command(&["-c", "10 + 5"]);
    let (stdout2, _, _) = run_command(&["-c", "=10 + 5"]);
    assert_eq!(stdout1, stdout2);
    assert_eq!(stdout1.trim(), "15");
}

#[test]
fn test_functions() {
    let (stdout, _, code) = run_command(&["-c", "SUM(1, 2, 3) * 2"]);
    assert_eq!(stdout.trim(), "12");
    assert_eq!(code, 0);

    let (stdout, _, _) = run_command(&["-c", "CONCAT(\"a\", LOWER(\"BC\"))"]);
    assert_eq!(stdout.trim(), "abc");
}

#[test]
fn test_unknown_function_exit_code() {
    let (stdout, _, code) = run_command(&["-c", "undefined_function()"]);
    assert_eq!(stdout.trim(), "#NAME?");
    assert_eq!(code, 1);
}

#[test]
fn test_division_by_zero() {
    let (stdout, _, code) = run_command(&["-c", "AVERAGE()"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "0");

    let (stdout, _, code) = run_command(&["-c", "MEDIAN()"]);
    assert!(stdout.starts_with('#'));
    assert_eq!(code, 1);
}

#[test]
fn test_function_listing() {
    let (stdout, _, code) = run_command(&["--functions"]);
    assert_eq!(code, 0);
    assert!(stdout.lines().any(|line| line.starts_with("SUMIFS ")));
    assert!(stdout.lines().any(|line| line.starts_with("RAND ")));
}

#[test]
fn test_malformed_config_is_reported() {
    let (_, stderr, code) = run_with_config("[eval]\nerror_policy = 3\n", &["-c", "1"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Failed to parse"));
}

#[test]
fn test_sheet_mode_prints_values() {
    let sheet = temp_path("sheet", "calc");
    let saved = temp_path("saved", "calc");
    let _cleanup = Cleanup(vec![sheet.clone(), saved.clone()]);
    std::fs::write(
        &sheet,
        "# size: 3x2\nA1: 10\nA2: 20\nA3: =SUM(A1:A2)\nB1: \"label\"\n",
    )
    .unwrap();

    let (stdout, _, code) = run_command(&[
        sheet.to_str().unwrap(),
        "-o",
        saved.to_str().unwrap(),
    ]);
    assert_eq!(code, 0);
    assert_eq!(stdout, "A1: 10\nB1: label\nA2: 20\nA3: 30\n");

    let written = std::fs::read_to_string(&saved).unwrap();
    assert!(written.contains("A3: =SUM(A1:A2)"));
    assert!(written.contains("B1: \"label\""));
}

#[test]
fn test_missing_sheet_is_an_error() {
    let missing = temp_path("missing", "calc");
    let (stdout, stderr, code) = run_command(&[missing.to_str().unwrap()]);
    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.contains("File not found"));
}

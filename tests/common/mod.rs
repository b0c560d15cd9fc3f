// tests/common/mod.rs
// Shared test utilities for integration tests
#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use jumanpp_batch::BatchConfig;
use tempfile::TempDir;

pub const V1_VERSION: &str = "1.02";
pub const V2_VERSION: &str = "2.0.0-rc3";

/// Write a POSIX-shell stand-in for the analyzer into `dir` and return the
/// command line that runs it.
///
/// Every input sentence becomes one primary noun token, one alternative verb
/// token and a sentinel line. Version 1 echoes `# ` comment lines, later
/// versions drop them.
pub fn write_fake_analyzer(dir: &Path, version: &str) -> String {
    let echo_comments = if version.starts_with("1.") { "1" } else { "" };
    let script = format!(
        r##"#!/bin/sh
if [ "$1" = "-v" ]; then
  echo "Juman++ Version: {version}"
  exit 0
fi
echo_comments="{echo_comments}"
while IFS= read -r line || [ -n "$line" ]; do
  case "$line" in
    "# "*)
      if [ -n "$echo_comments" ]; then printf '%s\n' "$line"; fi
      ;;
    *)
      printf '%s %s %s 名詞 6 普通名詞 1 * 0 * 0 "代表表記:%s/%s"\n' "$line" "$line" "$line" "$line" "$line"
      printf '@ %s %s %s 動詞 2 * 0 * 0 * 0 NIL\n' "$line" "$line" "$line"
      printf 'EOS\n'
      ;;
  esac
done
"##
    );
    let path = dir.join(format!("fake-jumanpp-{}.sh", version));
    fs::write(&path, script).expect("Failed to write fake analyzer");
    format!("sh {}", path.display())
}

/// Write an analyzer that consumes its input and then fails
pub fn write_failing_analyzer(dir: &Path, exit_code: i32) -> String {
    let script = format!(
        "#!/bin/sh\ncat >/dev/null\necho 'dictionary not found' >&2\nexit {}\n",
        exit_code
    );
    let path = dir.join("failing-jumanpp.sh");
    fs::write(&path, script).expect("Failed to write failing analyzer");
    format!("sh {}", path.display())
}

/// Write an analyzer that emits one block too few
pub fn write_truncating_analyzer(dir: &Path) -> String {
    let script = "#!/bin/sh\nread -r first\nwhile IFS= read -r line; do\n  printf '%s %s %s 名詞 6 普通名詞 1 * 0 * 0 NIL\\nEOS\\n' \"$line\" \"$line\" \"$line\"\ndone\n";
    let path = dir.join("truncating-jumanpp.sh");
    fs::write(&path, script).expect("Failed to write truncating analyzer");
    format!("sh {}", path.display())
}

/// Batch config writing into `dir`, polling fast enough for tests
pub fn test_config(dir: &Path, command: &str, workers: usize) -> BatchConfig {
    BatchConfig::new(command, dir.join("out-{}.txt").to_string_lossy())
        .with_workers(workers)
        .with_check_interval(Duration::from_millis(20))
}

/// Sentences without spaces so every one maps to a single token line
pub fn sentences(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("文{:03}", i)).collect()
}

/// Concatenated content of all locations
pub fn read_locations(locations: &[PathBuf]) -> String {
    locations
        .iter()
        .map(|p| fs::read_to_string(p).expect("Failed to read output location"))
        .collect()
}

/// Run the analyzer command directly on the same input, as a single process
pub fn run_single_shot(command: &str, input: &str) -> String {
    let args = shell_words::split(command).expect("Invalid command");
    let mut child = Command::new(&args[0])
        .args(&args[1..])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("Failed to start analyzer");
    child
        .stdin
        .take()
        .expect("stdin not captured")
        .write_all(input.as_bytes())
        .expect("Failed to write to stdin");
    let output = child.wait_with_output().expect("Failed to read output");
    String::from_utf8(output.stdout).expect("Analyzer output is not UTF-8")
}

/// Helper function to run jumanpp-batch with given arguments and input via stdin
pub fn run_cli_with_input(args: &[&str], input: &str) -> (String, String, i32) {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_jumanpp-batch"))
        .args(args)
        .arg("--ignore-config")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start jumanpp-batch");

    if let Some(mut stdin) = cmd.stdin.take() {
        stdin
            .write_all(input.as_bytes())
            .expect("Failed to write to stdin");
    }

    let output = cmd.wait_with_output().expect("Failed to read output");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

//! End-to-end checks of the `linkgram` binary that need no engine installed.

use assert_cmd::Command;
use tempfile::TempDir;

/// Run the binary inside `dir`, isolated from the user's config.
fn linkgram(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("linkgram").unwrap();
    cmd.current_dir(dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join("xdg"))
        .env_remove("LINKGRAM_LIBRARY_PATH")
        .env_remove("LINKGRAM_LOG");
    cmd
}

fn stderr_of(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    let output = linkgram(&dir).arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for sub in ["tree", "links", "details", "diagram", "count"] {
        assert!(stdout.contains(sub), "missing {sub} in:\n{stdout}");
    }
}

#[test]
fn test_missing_library_fails_cleanly() {
    let dir = TempDir::new().unwrap();
    let output = linkgram(&dir)
        .args([
            "--library",
            "/nonexistent/liblink-grammar.so",
            "tree",
            "turn off the light",
        ])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr_of(&output);
    assert!(
        stderr.contains("failed to load link-grammar library"),
        "unexpected stderr:\n{stderr}"
    );
}

#[test]
fn test_invalid_config_fails_cleanly() {
    let dir = TempDir::new().unwrap();
    let config_dir = dir.path().join(".linkgram");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(config_dir.join("config.toml"), "linkage_limit = \"many\"\n").unwrap();

    let output = linkgram(&dir).args(["count", "hello"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = stderr_of(&output);
    assert!(stderr.contains("invalid config"), "unexpected stderr:\n{stderr}");
}

#[test]
fn test_missing_explicit_config_fails() {
    let dir = TempDir::new().unwrap();
    let output = linkgram(&dir)
        .args(["--config", "absent.toml", "links", "hello"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr_of(&output).contains("absent.toml"));
}

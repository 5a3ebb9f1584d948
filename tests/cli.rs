//! Integration tests for top-level CLI behavior.

use std::process::Command;

fn run_docsync(args: &[&str]) -> std::process::Output {
    let bin = env!("CARGO_BIN_EXE_docsync");
    Command::new(bin).args(args).output().expect("failed to run docsync binary")
}

#[test]
fn invalid_subcommand_exits_with_error() {
    let output = run_docsync(&["nonsense"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("unrecognized subcommand"));
}

#[test]
fn sync_help_shows_usage() {
    let output = run_docsync(&["sync", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("--event"));
    assert!(stdout.contains("--config"));
}

#[test]
fn bootstrap_requires_owner_and_repo() {
    let output = run_docsync(&["bootstrap"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!output.status.success());
    assert!(stderr.contains("--owner") || stderr.contains("--repo"));
}

#[test]
fn live_mode_requires_credentials() {
    let dir = std::env::temp_dir().join("docsync_cli_no_creds");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("docsync.yaml"), "docs_path: docs\n").unwrap();

    let bin = env!("CARGO_BIN_EXE_docsync");
    let output = Command::new(bin)
        .args(["bootstrap", "--owner", "acme", "--repo", "widgets"])
        .current_dir(&dir)
        .env_remove("GITHUB_TOKEN")
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("DOCSYNC_CASSETTE")
        .output()
        .expect("failed to run docsync binary");
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(!output.status.success());
    assert!(stderr.contains("GITHUB_TOKEN"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn bootstrap_replays_an_empty_repository() {
    let dir = std::env::temp_dir().join("docsync_cli_replay_empty");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("docsync.yaml"), "docs_path: docs\nextract_references: false\n")
        .unwrap();

    // An empty repository: no docs root, no manifest, no important files,
    // no cache object. The run completes with nothing to publish.
    let cassette = serde_json::json!({
        "name": "bootstrap-empty",
        "recorded_at": "2024-06-15T10:30:00Z",
        "interactions": [
            {"seq": 0, "port": "repo", "method": "list_dir", "input": {}, "output": {"ok": null}},
            {"seq": 1, "port": "repo", "method": "get_file", "input": {}, "output": {"ok": null}},
            {"seq": 2, "port": "repo", "method": "get_file", "input": {}, "output": {"ok": null}},
            {"seq": 3, "port": "repo", "method": "list_dir", "input": {}, "output": {"ok": []}},
            {"seq": 4, "port": "repo", "method": "get_file", "input": {}, "output": {"ok": null}}
        ]
    });
    let cassette_path = dir.join("bootstrap-empty.cassette.yaml");
    std::fs::write(&cassette_path, serde_yaml::to_string(&cassette).unwrap()).unwrap();

    let bin = env!("CARGO_BIN_EXE_docsync");
    let output = Command::new(bin)
        .args(["bootstrap", "--owner", "acme", "--repo", "widgets"])
        .current_dir(&dir)
        .env("DOCSYNC_CASSETTE", &cassette_path)
        .output()
        .expect("failed to run docsync binary");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("Nothing to bootstrap"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn sync_skips_non_actionable_events() {
    let dir = std::env::temp_dir().join("docsync_cli_skip_event");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("docsync.yaml"), "docs_path: docs\n").unwrap();

    let event = serde_json::json!({
        "action": "closed",
        "pull_request": {"number": 7, "title": "Add billing", "labels": []},
        "repository": {
            "name": "widgets",
            "owner": {"login": "acme"},
            "default_branch": "main"
        }
    });
    let event_path = dir.join("event.json");
    std::fs::write(&event_path, event.to_string()).unwrap();

    // No interactions: a skipped event must touch no port.
    let cassette = serde_json::json!({
        "name": "skip",
        "recorded_at": "2024-06-15T10:30:00Z",
        "interactions": []
    });
    let cassette_path = dir.join("skip.cassette.yaml");
    std::fs::write(&cassette_path, serde_yaml::to_string(&cassette).unwrap()).unwrap();

    let bin = env!("CARGO_BIN_EXE_docsync");
    let output = Command::new(bin)
        .args(["sync", "--event", event_path.to_str().unwrap()])
        .current_dir(&dir)
        .env("DOCSYNC_CASSETTE", &cassette_path)
        .output()
        .expect("failed to run docsync binary");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("Skipped"));

    let _ = std::fs::remove_dir_all(&dir);
}

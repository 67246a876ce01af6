//! Integration tests for the sm CLI.
//!
//! Each test gets its own data root and index under a temp dir. Stdout is
//! not a terminal here, so every command answers in JSON.

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        let ws = Self {
            dir: TempDir::new().unwrap(),
        };
        ws.sm(&["init"]).assert().success();
        ws
    }

    fn sm(&self, args: &[&str]) -> Command {
        let mut cmd = Command::cargo_bin("sm").unwrap();
        cmd.args(args)
            .env("SM_DATA_DIR", self.dir.path().join("data"))
            .env("SM_DB", self.dir.path().join("index.db"))
            .env("SM_ACTOR", "ada@example.com")
            .env_remove("RUST_LOG");
        cmd
    }

    fn json(&self, args: &[&str]) -> Value {
        let output = self.sm(args).output().unwrap();
        assert!(
            output.status.success(),
            "sm {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).unwrap()
    }

    fn file(&self, rel: &str) -> std::path::PathBuf {
        self.dir.path().join("data").join(rel)
    }
}

// =============================================================================
// Basic Command Tests
// =============================================================================

#[test]
fn test_version_without_data_root() {
    let output = Command::cargo_bin("sm").unwrap().arg("version").output().unwrap();
    assert!(output.status.success());
    let v: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(v["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_commands_require_init() {
    let dir = TempDir::new().unwrap();
    let output = Command::cargo_bin("sm")
        .unwrap()
        .args(["project", "list"])
        .env("SM_DATA_DIR", dir.path().join("data"))
        .env("SM_DB", dir.path().join("index.db"))
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2));
    let err: Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(err["error"]["code"], "NOT_INITIALIZED");
}

// =============================================================================
// Workflow Tests
// =============================================================================

#[test]
fn test_issue_lifecycle_end_to_end() {
    let ws = Workspace::new();
    ws.json(&["project", "create", "eng", "Engineering"]);
    assert!(ws.file("projects/ENG.json").exists());
    assert!(ws.file("boards/ENG-board.json").exists());

    let created = ws.json(&["issue", "create", "ENG", "First issue", "--type", "bug"]);
    assert_eq!(created["tracking_id"], "ENG-1");
    assert_eq!(created["status"], "backlog");
    assert!(ws.file("issues/ENG-1.json").exists());

    let archived = ws.json(&["issue", "archive", "ENG-1"]);
    assert_eq!(archived["succeeded"][0], "ENG-1");
    assert!(ws.file("archive/issues/ENG-1.json").exists());
    assert!(!ws.file("issues/ENG-1.json").exists());

    ws.json(&["issue", "delete", "ENG-1"]);
    assert!(ws.file("deleted/issues/ENG-1.json").exists());

    ws.json(&["issue", "recover", "ENG-1"]);
    assert!(ws.file("issues/ENG-1.json").exists());

    let shown = ws.json(&["issue", "show", "eng-1"]);
    assert_eq!(shown["status"], "backlog");
    assert_eq!(shown["transitions"].as_array().unwrap().len(), 3);
}

#[test]
fn test_dangling_link_is_rejected() {
    let ws = Workspace::new();
    ws.json(&["project", "create", "ENG", "Engineering"]);

    let output = ws
        .sm(&["issue", "create", "ENG", "Broken", "--link", "blocks:ENG-999"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(4));
    let err: Value = serde_json::from_slice(&output.stderr).unwrap();
    assert_eq!(err["error"]["code"], "VALIDATION_FAILED");
    assert_eq!(err["error"]["errors"].as_array().unwrap().len(), 1);
    assert!(!ws.file("issues/ENG-1.json").exists());
}

#[test]
fn test_repair_reindexes_hand_edited_documents() {
    let ws = Workspace::new();
    ws.json(&["project", "create", "ENG", "Engineering"]);
    ws.json(&["issue", "create", "ENG", "One"]);

    // A document dropped into the archive by hand
    std::fs::write(
        ws.file("archive/issues/ENG-7.json"),
        r#"{"tracking_id":"ENG-7","project":"ENG","title":"Old","status":"archived"}"#,
    )
    .unwrap();

    let stats = ws.json(&["repair"]);
    assert_eq!(stats["projects"], 1);
    assert_eq!(stats["issues"], 2);
    assert_eq!(stats["boards"], 1);

    let listed = ws.json(&["issue", "list", "ENG", "--archived"]);
    assert_eq!(listed["count"], 2);

    let check = ws.json(&["check"]);
    assert_eq!(check["clean"], true);
}

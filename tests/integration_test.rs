use std::process::Command;
use tempfile::TempDir;

fn memoweave_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_memoweave"))
}

/// Add a note with `--json` and return its id.
fn add_note_json(tmp: &TempDir, args: &[&str]) -> String {
    let mut full = vec!["add"];
    full.extend_from_slice(args);
    full.push("--json");

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(&full)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "add failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    parsed["id"].as_str().unwrap().to_string()
}

fn init(tmp: &TempDir) {
    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["init"])
        .output()
        .unwrap();
    assert!(output.status.success());
}

#[test]
fn test_init_creates_memoweave_directory() {
    let tmp = TempDir::new().unwrap();

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["init"])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(tmp.path().join(".memoweave").exists());
    assert!(tmp.path().join(".memoweave/notes.db").exists());
}

#[test]
fn test_init_twice_fails() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["init"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Already initialized"));
}

#[test]
fn test_add_without_init_fails() {
    let tmp = TempDir::new().unwrap();

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["add", "Test"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Not in a memoweave workspace"));
}

#[test]
fn test_full_note_workflow() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);

    // Add a note with most fields set
    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args([
            "add",
            "Plant the tomatoes",
            "-c",
            "Buy seedlings first",
            "--tag=garden",
            "--tag=spring",
            "--color=green",
            "--priority=high",
            "--due=2025-05-02",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Created note"));
    assert!(stdout.contains("Plant the tomatoes"));

    let id = add_note_json(&tmp, &["Water schedule"]);

    // List shows both
    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["list"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Plant the tomatoes"));
    assert!(stdout.contains("Water schedule"));

    // Get by id prefix
    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["get", &id[..7]])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Water schedule"));

    // Get with JSON output
    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["get", &id, "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(parsed["title"], "Water schedule");
    assert_eq!(parsed["status"], "todo");
    assert_eq!(parsed["color"], "yellow");
}

#[test]
fn test_list_json_and_filters() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);

    add_note_json(&tmp, &["Deploy fix", "--priority=high", "--tag=work"]);
    add_note_json(&tmp, &["Read novel", "--priority=low"]);

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["list", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert!(parsed.is_array());
    assert_eq!(parsed.as_array().unwrap().len(), 2);

    // Filter token narrows the list
    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["list", "priority:high", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    let notes = parsed.as_array().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["title"], "Deploy fix");

    // Free text matches titles
    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["list", "novel", "--json"])
        .output()
        .unwrap();
    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(parsed.as_array().unwrap().len(), 1);
}

#[test]
fn test_update_note_records_history() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);

    let id = add_note_json(&tmp, &["Original title", "-c", "Original content"]);

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args([
            "update",
            &id,
            "--title=New title",
            "--status=in_progress",
            "--tag=renamed",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Updated note"));
    assert!(stdout.contains("New title"));

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["get", &id, "--json"])
        .output()
        .unwrap();
    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(parsed["title"], "New title");
    assert_eq!(parsed["status"], "in_progress");
    assert_eq!(parsed["tags"], serde_json::json!(["renamed"]));

    // The title change kept the old text as a revision
    let history = parsed["history"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["title"], "Original title");

    // Metadata-only updates add no revision
    memoweave_cmd()
        .current_dir(tmp.path())
        .args(["update", &id, "--priority=high"])
        .output()
        .unwrap();
    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["get", &id, "--json"])
        .output()
        .unwrap();
    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(parsed["history"].as_array().unwrap().len(), 1);
}

#[test]
fn test_update_clear_flags() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);

    let id = add_note_json(
        &tmp,
        &[
            "Dentist",
            "--due=2025-03-10",
            "--start=14:00",
            "--end=14:30",
            "--tag=health",
        ],
    );

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["update", &id, "--clear-due", "--clear-times", "--clear-tags"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["get", &id, "--json"])
        .output()
        .unwrap();
    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert!(parsed["due_date"].is_null());
    assert!(parsed["start_time"].is_null());
    assert!(parsed["end_time"].is_null());
    assert_eq!(parsed["tags"].as_array().unwrap().len(), 0);
}

#[test]
fn test_invalid_field_values_fail() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["add", "Bad status", "--status=blocked"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid status"));

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["add", "Bad date", "--due=tomorrow"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid date"));
}

#[test]
fn test_trash_and_restore() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);

    let id = add_note_json(&tmp, &["Old idea"]);

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["trash", &id])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Moved 'Old idea' to trash"));

    // Gone from the active list, present in the trash
    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["list"])
        .output()
        .unwrap();
    assert!(!String::from_utf8_lossy(&output.stdout).contains("Old idea"));

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["list", "--trash"])
        .output()
        .unwrap();
    assert!(String::from_utf8_lossy(&output.stdout).contains("Old idea"));

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["restore", &id])
        .output()
        .unwrap();
    assert!(output.status.success());

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["list"])
        .output()
        .unwrap();
    assert!(String::from_utf8_lossy(&output.stdout).contains("Old idea"));
}

#[test]
fn test_delete_requires_force_when_non_interactive() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);

    let id = add_note_json(&tmp, &["Doomed"]);

    // Without --force and without a tty the command refuses
    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["delete", &id])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--force"));

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["delete", &id, "--force"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Deleted note"));

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["get", &id])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_board_show_and_move_to_column() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);

    let id = add_note_json(&tmp, &["Ship release"]);
    add_note_json(&tmp, &["Write changelog"]);

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["board", "show"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("todo (2)"));
    assert!(stdout.contains("Ship release"));

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["board", "move", &id, "--group=all", "--status=done"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["get", &id, "--json"])
        .output()
        .unwrap();
    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(parsed["status"], "done");
}

#[test]
fn test_board_move_onto_note_takes_its_place() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);

    let first = add_note_json(&tmp, &["Alpha"]);
    add_note_json(&tmp, &["Beta"]);
    let third = add_note_json(&tmp, &["Gamma"]);

    // Dropping Gamma onto Alpha puts it in front of Alpha
    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["board", "move", &third, "--onto", &first, "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    let titles: Vec<&str> = parsed["columns"][0]["notes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Gamma", "Alpha", "Beta"]);
}

#[test]
fn test_board_group_by_tag() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);

    add_note_json(&tmp, &["Standup notes", "--tag=work"]);
    add_note_json(&tmp, &["Groceries"]);

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["board", "show", "--group-by=tag"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("## work"));
    assert!(stdout.contains("## untagged"));
}

#[test]
fn test_todos_toggle_finishes_note() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);

    let id = add_note_json(
        &tmp,
        &["Trip packing", "--item=Passport", "--item=Charger"],
    );

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["todos", "list"])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Passport"));
    assert!(stdout.contains("Charger"));

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["todos", "toggle", &id, "1"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("[x] Passport"));

    // Completing the last open item moves the note to done
    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["todos", "toggle", &id, "2"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("All checklist items done"));
    assert!(stdout.contains("Trip packing"));

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["get", &id, "--json"])
        .output()
        .unwrap();
    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(parsed["status"], "done");

    // Unchecking afterwards leaves the status alone
    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["todos", "toggle", &id, "2"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(!String::from_utf8_lossy(&output.stdout).contains("All checklist items done"));

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["get", &id, "--json"])
        .output()
        .unwrap();
    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(parsed["status"], "done");
}

#[test]
fn test_calendar_views() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);

    add_note_json(
        &tmp,
        &["Quarterly review", "--due=2025-07-01", "--start=09:30"],
    );
    add_note_json(&tmp, &["Pay rent", "--due=2025-07-01"]);
    add_note_json(&tmp, &["August thing", "--due=2025-08-15"]);

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["calendar", "--day=2025-07-01"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    // Untimed entries are all-day; timed ones get the default hour slot
    assert!(stdout.contains("all-day"));
    assert!(stdout.contains("Pay rent"));
    assert!(stdout.contains("09:30-10:30"));

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["calendar", "--month=2025-07"])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("2025-07-01"));
    assert!(!stdout.contains("August thing"));

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["calendar"])
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("2025-07-01"));
    assert!(stdout.contains("2025-08-15"));
}

#[test]
fn test_templates_apply_and_custom_catalog() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["templates", "list"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("meeting"));
    assert!(stdout.contains("daily"));

    // Applying a built-in creates a dated note
    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["templates", "apply", "meeting", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert!(parsed["title"].as_str().unwrap().starts_with("Meeting "));
    assert_eq!(parsed["color"], "blue");
    assert_eq!(parsed["checklist"].as_array().unwrap().len(), 1);

    // Save a custom template and use it from add
    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args([
            "templates",
            "save",
            "standup",
            "--title=Standup {{date}}",
            "--tag=work",
            "--item=Fill in blockers",
        ])
        .output()
        .unwrap();
    assert!(output.status.success());

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["add", "Monday sync", "--template=standup", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(parsed["title"], "Monday sync");
    assert_eq!(parsed["tags"], serde_json::json!(["work"]));
    assert_eq!(parsed["checklist"][0]["text"], "Fill in blockers");

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["templates", "delete", "standup"])
        .output()
        .unwrap();
    assert!(output.status.success());

    // Deleting a template that is not saved fails
    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["templates", "delete", "standup"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_search_full_text() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);

    add_note_json(&tmp, &["Garden plan", "-c", "Order basil seedlings"]);
    add_note_json(&tmp, &["Tax return"]);

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["search", "basil"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Garden plan"));
    assert!(!stdout.contains("Tax return"));

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["search", "spaceship"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No results found"));
}

#[test]
fn test_history_list_and_revert() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);

    let id = add_note_json(&tmp, &["First draft", "-c", "v1"]);

    memoweave_cmd()
        .current_dir(tmp.path())
        .args(["update", &id, "--title=Second draft", "-c", "v2"])
        .output()
        .unwrap();

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["history", &id])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("First draft"));

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["history", &id, "--revert=1"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Reverted note"));

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["get", &id, "--json"])
        .output()
        .unwrap();
    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(parsed["title"], "First draft");
    assert_eq!(parsed["content"], "v1");
    // The replaced text is itself kept, so the revert can be undone
    let history = parsed["history"].as_array().unwrap();
    assert_eq!(history[0]["title"], "Second draft");
}

#[test]
fn test_prefs_roundtrip() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["prefs", "set", "ui-theme", r#"{"dark": true}"#])
        .output()
        .unwrap();
    assert!(output.status.success());

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["prefs", "get", "ui-theme"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("dark"));

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["prefs", "list"])
        .output()
        .unwrap();
    assert!(String::from_utf8_lossy(&output.stdout).contains("ui-theme"));

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["prefs", "delete", "ui-theme"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["prefs", "get", "ui-theme"])
        .output()
        .unwrap();
    assert!(String::from_utf8_lossy(&output.stdout).contains("(not set)"));

    // Values must be JSON, keys must be plain slugs
    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["prefs", "set", "ui-theme", "not json"])
        .output()
        .unwrap();
    assert!(!output.status.success());

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["prefs", "set", "../escape", "{}"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn test_stats_counts_and_achievements() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);

    // The first add unlocks an achievement, announced on stderr
    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["add", "One"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Achievement unlocked: First Note"));

    // The second add stays quiet
    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["add", "Two"])
        .output()
        .unwrap();
    assert!(!String::from_utf8_lossy(&output.stderr).contains("Achievement unlocked"));

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["stats"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Notes: 2 active"));
    assert!(stdout.contains("[x] First Note"));
    assert!(stdout.contains("[ ] Note Collector"));

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["stats", "--json"])
        .output()
        .unwrap();
    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(parsed["counters"]["notes_created"], 2);
}

#[test]
fn test_plans_list_empty() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["plans", "list"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No plans"));
}

#[test]
fn test_ai_pin_is_deterministic_and_offline() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);

    let id = add_note_json(&tmp, &["Pinned content", "-c", "Exact bytes"]);

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["ai", "pin", &id])
        .output()
        .unwrap();
    assert!(output.status.success());
    let first = String::from_utf8_lossy(&output.stdout).trim().to_string();
    assert!(first.starts_with("bafy"));
    assert_eq!(first.len(), 68);

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["ai", "pin", &id])
        .output()
        .unwrap();
    let second = String::from_utf8_lossy(&output.stdout).trim().to_string();
    assert_eq!(first, second);
}

#[test]
fn test_ai_commands_require_api_key() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);

    let id = add_note_json(&tmp, &["Needs a title", "-c", "Some content"]);

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .env_remove("MEMOWEAVE_API_KEY")
        .args(["ai", "title", &id])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("MEMOWEAVE_API_KEY"));
}

#[test]
fn test_pin_flag_floats_note_in_list() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);

    add_note_json(&tmp, &["Newer note"]);
    let id = add_note_json(&tmp, &["Important"]);
    add_note_json(&tmp, &["Newest note"]);

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["pin", &id])
        .output()
        .unwrap();
    assert!(output.status.success());

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["list", "--json"])
        .output()
        .unwrap();
    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(parsed[0]["title"], "Important");

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["pin", &id, "--remove"])
        .output()
        .unwrap();
    assert!(output.status.success());

    // Unpinned, it falls back into the created-order band
    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["list", "--sort=created", "--json"])
        .output()
        .unwrap();
    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(parsed[0]["title"], "Newest note");
}

#[test]
fn test_archive_hides_from_board_and_list() {
    let tmp = TempDir::new().unwrap();
    init(&tmp);

    let id = add_note_json(&tmp, &["Done project", "--pin"]);

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["archive", &id])
        .output()
        .unwrap();
    assert!(output.status.success());

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["list"])
        .output()
        .unwrap();
    assert!(!String::from_utf8_lossy(&output.stdout).contains("Done project"));

    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["board", "show"])
        .output()
        .unwrap();
    assert!(!String::from_utf8_lossy(&output.stdout).contains("Done project"));

    // Archiving also unpins
    let output = memoweave_cmd()
        .current_dir(tmp.path())
        .args(["list", "--archived", "--json"])
        .output()
        .unwrap();
    let parsed: serde_json::Value =
        serde_json::from_str(&String::from_utf8_lossy(&output.stdout)).unwrap();
    assert_eq!(parsed[0]["title"], "Done project");
    assert_eq!(parsed[0]["pinned"], false);
}

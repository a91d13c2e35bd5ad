mod common;

use chrono::{Local, TimeZone};
use serde_json::{Value, json};
use std::collections::HashMap;
use tempfile::TempDir;

use common::{ScriptedSender, calls, client, message, page, reaction};
use slk::models::{File, ReactedItem};
use slk::notes::{
    JSONL_FILE, LEDGER_FILE, Ledger, NoteContext, NoteOutput, NotesFormat, build_note_content,
    message_time, needs_previous, note_filename, sanitize_filename, select_new_items, truncate,
};
use slk::services::notes::{capture_notes, fetch_context};

const ME: &str = "U0ME000001";

fn names(id: &str) -> String {
    match id {
        "U0ME000001" => "me".to_string(),
        "U0JANE0001" => "Jane Doe".to_string(),
        other => other.to_string(),
    }
}

fn reacted(channel: &str, ts: &str, emoji: &str, users: &[&str]) -> ReactedItem {
    let mut msg = message(ts, "U0JANE0001", "ship it");
    msg.reactions = vec![reaction(emoji, users)];
    ReactedItem {
        kind: "message".to_string(),
        channel: channel.to_string(),
        message: msg,
    }
}

#[test]
fn test_missing_ledger_is_empty() {
    let dir = TempDir::new().unwrap();
    let ledger = Ledger::load(dir.path());
    assert!(ledger.is_empty());
    assert_eq!(ledger.path(), dir.path().join(LEDGER_FILE));
}

#[test]
fn test_ledger_round_trip() {
    let dir = TempDir::new().unwrap();
    let mut ledger = Ledger::load(dir.path());
    assert!(ledger.record("C1", "1705312325.000100", "2024-01-15T10:00:00Z"));
    ledger.save().unwrap();

    let reloaded = Ledger::load(dir.path());
    assert_eq!(reloaded.len(), 1);
    assert!(reloaded.contains("C1", "1705312325.000100"));
    assert_eq!(
        reloaded.captured_at("C1", "1705312325.000100"),
        Some("2024-01-15T10:00:00Z")
    );

    let raw = std::fs::read_to_string(dir.path().join(LEDGER_FILE)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["captured"]["C1:1705312325.000100"], "2024-01-15T10:00:00Z");
}

#[test]
fn test_ledger_never_overwrites() {
    let dir = TempDir::new().unwrap();
    let mut ledger = Ledger::load(dir.path());
    assert!(ledger.record("C1", "1.0", "first"));
    assert!(!ledger.record("C1", "1.0", "second"));
    assert_eq!(ledger.captured_at("C1", "1.0"), Some("first"));
}

#[test]
fn test_corrupt_ledger_starts_over() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(LEDGER_FILE), "{not json").unwrap();

    let mut ledger = Ledger::load(dir.path());
    assert!(ledger.is_empty());

    ledger.record("C1", "1.0", "now");
    ledger.save().unwrap();
    assert_eq!(Ledger::load(dir.path()).len(), 1);
}

#[test]
fn test_save_leaves_only_the_ledger() {
    let dir = TempDir::new().unwrap();
    let mut ledger = Ledger::load(dir.path());
    ledger.record("C1", "1.0", "now");
    ledger.save().unwrap();
    ledger.record("C2", "2.0", "later");
    ledger.save().unwrap();

    let entries: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, [LEDGER_FILE]);
}

#[test]
fn test_select_new_items() {
    let dir = TempDir::new().unwrap();
    let mut ledger = Ledger::load(dir.path());
    ledger.record("C1", "1705312000.000000", "earlier");

    let mut file_share = reacted("C1", "1705312100.000000", "writing_hand", &[ME]);
    file_share.kind = "file".to_string();

    let items = vec![
        reacted("C1", "1705312000.000000", "writing_hand", &[ME]), // already captured
        reacted("C1", "1705312200.000000", "writing_hand::skin-tone-3", &[ME]),
        reacted("C1", "1705312300.000000", "writing_hand", &["U0JANE0001"]), // not mine
        reacted("C2", "1705312400.000000", "eyes", &[ME]),
        reacted("C2", "1600000000.000000", "writing_hand", &[ME]), // too old
        file_share,
        reacted("C2", "1705312500.000000", "writing_hand", &[ME]),
    ];

    let selected = select_new_items(items, "writing_hand", ME, Some(1_700_000_000), &ledger);

    let keys: Vec<(&str, &str)> = selected
        .iter()
        .map(|i| (i.channel.as_str(), i.message.ts.as_str()))
        .collect();
    assert_eq!(
        keys,
        [("C1", "1705312200.000000"), ("C2", "1705312500.000000")]
    );
}

#[test]
fn test_no_cutoff_keeps_old_items() {
    let dir = TempDir::new().unwrap();
    let ledger = Ledger::load(dir.path());
    let items = vec![reacted("C1", "1600000000.000000", "writing_hand", &[ME])];
    assert_eq!(select_new_items(items, "writing_hand", ME, None, &ledger).len(), 1);
}

#[test]
fn test_filename_helpers() {
    assert_eq!(sanitize_filename("Team Ops/Alerts"), "team-ops-alerts");

    let time = Local.with_ymd_and_hms(2024, 1, 15, 9, 5, 7).unwrap();
    assert_eq!(note_filename(&time, "dm-Jane Doe"), "2024-01-15-090507-dm-jane-doe.md");
}

#[test]
fn test_truncate_keeps_the_first_line() {
    assert_eq!(truncate("short\nsecond line", 60), "short");
    assert_eq!(truncate("abcdefghij", 8), "abcde...");
    assert_eq!(truncate("abcdefgh", 8), "abcdefgh");
}

#[test]
fn test_short_notes_need_previous_context() {
    assert!(needs_previous(&message("1.0", ME, "+1")));
    assert!(!needs_previous(&message("1.0", ME, &"x".repeat(80))));
}

#[test]
fn test_build_note_content() {
    let time = Local.with_ymd_and_hms(2024, 1, 15, 9, 5, 0).unwrap();
    let context = NoteContext {
        parent: Some(message("1.0", "U0JANE0001", "release plan?\nsee doc")),
        previous: None,
    };
    let files = vec![File {
        name: "plan.pdf".to_string(),
        size: 2048,
        ..Default::default()
    }];

    let content = build_note_content(
        "me",
        "ops",
        "agreed, <@U0JANE0001>",
        &files,
        &time,
        Some(&context),
        &names,
    );

    assert_eq!(
        content,
        "@me in #ops\n\n\
         [@Jane Doe, thread]:\n\
         > release plan?\n\
         > see doc\n\n\
         > agreed, <@U0JANE0001>\n\n\
         [file] plan.pdf (2.0KB)\n\n\
         2024-01-15 09:05\n"
    );
}

#[test]
fn test_context_summary() {
    let context = NoteContext {
        parent: Some(message("1.0", "U0JANE0001", "parent")),
        previous: Some(message("2.0", ME, "before <@U0JANE0001>")),
    };
    assert_eq!(
        context.summary(&names),
        "[Jane Doe, thread]: parent\n[me, previous]: before @Jane Doe"
    );
    assert!(NoteContext::default().is_empty());
}

#[test]
fn test_note_output_uses_names() {
    let item = reacted("D1", "1705312325.000100", "writing_hand", &[ME]);
    let output = NoteOutput::new(&item, "dm-Jane Doe", &names);

    assert_eq!(output.user, "Jane Doe");
    assert_eq!(output.timestamp, "2024-01-15T09:52:05Z");
    assert!(output.file.ends_with("-dm-jane-doe.md"));
}

#[test]
fn test_notes_format_parse() {
    assert_eq!("jsonl".parse::<NotesFormat>(), Ok(NotesFormat::Jsonl));
    assert_eq!("md".parse::<NotesFormat>(), Ok(NotesFormat::Md));
    assert_eq!(
        "txt".parse::<NotesFormat>(),
        Err("--format must be 'md' or 'jsonl', got 'txt'".to_string())
    );
}

const PARENT_TS: &str = "1705312325.000100";
const REPLY_TS: &str = "1705312400.000200";

fn thread_reply(text: &str) -> ReactedItem {
    let mut item = reacted("C1", REPLY_TS, "writing_hand", &[ME]);
    item.message.text = text.to_string();
    item.message.thread_ts = PARENT_TS.to_string();
    item
}

fn long_text() -> String {
    "a note long enough that no preceding message is attached to it as context".repeat(2)
}

#[tokio::test]
async fn test_short_reply_skips_previous_when_it_is_the_parent() {
    let thread = json!([
        {"ts": PARENT_TS, "user": "U0JANE0001", "text": "release plan?", "thread_ts": PARENT_TS},
        {"ts": REPLY_TS, "user": ME, "text": "+1", "thread_ts": PARENT_TS},
    ]);
    let sender = ScriptedSender::new()
        .ok(page("messages", thread.clone(), ""))
        .ok(page("messages", thread, ""));
    let client = client(sender);

    let context = fetch_context(&client, &thread_reply("+1")).await;

    assert_eq!(context.parent.map(|m| m.ts).as_deref(), Some(PARENT_TS));
    assert!(context.previous.is_none());
    let calls = calls(&client);
    assert_eq!(calls.len(), 2);
    assert!(calls[0].1.contains("limit=1"));
    assert!(calls.iter().all(|(method, _)| method == "conversations.replies"));
}

#[tokio::test]
async fn test_short_reply_gets_the_reply_before_it() {
    let thread = json!([
        {"ts": PARENT_TS, "user": "U0JANE0001", "text": "release plan?"},
        {"ts": "1705312350.000150", "user": "U0JANE0001", "text": "friday?"},
        {"ts": REPLY_TS, "user": ME, "text": "+1"},
    ]);
    let sender = ScriptedSender::new()
        .ok(page("messages", thread.clone(), ""))
        .ok(page("messages", thread, ""));
    let client = client(sender);

    let context = fetch_context(&client, &thread_reply("+1")).await;

    assert_eq!(context.parent.map(|m| m.text).as_deref(), Some("release plan?"));
    assert_eq!(context.previous.map(|m| m.text).as_deref(), Some("friday?"));
}

#[tokio::test]
async fn test_short_channel_message_gets_the_message_before_it() {
    let history = json!([{"ts": "1705312300.000000", "user": "U0JANE0001", "text": "ship it?"}]);
    let sender = ScriptedSender::new().ok(page("messages", history, ""));
    let client = client(sender);
    let item = reacted("C1", REPLY_TS, "writing_hand", &[ME]);

    let context = fetch_context(&client, &item).await;

    assert!(context.parent.is_none());
    assert_eq!(context.previous.map(|m| m.text).as_deref(), Some("ship it?"));
    let calls = calls(&client);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "conversations.history");
    assert!(calls[0].1.contains(&format!("latest={}", REPLY_TS)));
}

#[tokio::test]
async fn test_failed_context_lookups_are_skipped() {
    let sender = ScriptedSender::new()
        .ok(json!({"ok": false, "error": "thread_not_found"}))
        .ok(json!({"ok": false, "error": "thread_not_found"}));
    let client = client(sender);

    let context = fetch_context(&client, &thread_reply("+1")).await;

    assert!(context.is_empty());
    assert_eq!(calls(&client).len(), 2);
}

#[tokio::test]
async fn test_long_channel_message_needs_no_context() {
    let client = client(ScriptedSender::new());
    let mut item = reacted("C1", REPLY_TS, "writing_hand", &[ME]);
    item.message.text = long_text();

    assert!(fetch_context(&client, &item).await.is_empty());
    assert!(calls(&client).is_empty());
}

#[tokio::test]
async fn test_capture_appends_records_and_saves_ledger() {
    let dir = TempDir::new().unwrap();
    let client = client(ScriptedSender::new());
    let mut first = reacted("C1", "1705312325.000100", "writing_hand", &[ME]);
    first.message.text = long_text();
    let mut second = reacted("D1", "1705312400.000200", "writing_hand", &[ME]);
    second.message.text = long_text();
    let channel_names = HashMap::from([
        ("C1".to_string(), "ops".to_string()),
        ("D1".to_string(), "dm-Jane Doe".to_string()),
    ]);
    let mut ledger = Ledger::load(dir.path());

    let outputs = capture_notes(
        &client,
        &[first, second],
        &channel_names,
        dir.path(),
        NotesFormat::Jsonl,
        &mut ledger,
    )
    .await
    .unwrap();

    assert_eq!(outputs.len(), 2);
    let lines: Vec<Value> = std::fs::read_to_string(dir.path().join(JSONL_FILE))
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["channel"], "ops");
    assert_eq!(lines[1]["channel"], "dm-Jane Doe");
    assert!(lines[0].get("context").is_none());

    let saved = Ledger::load(dir.path());
    assert!(saved.contains("C1", "1705312325.000100"));
    assert!(saved.contains("D1", "1705312400.000200"));
}

#[tokio::test]
async fn test_unwritable_note_stays_out_of_the_ledger() {
    let dir = TempDir::new().unwrap();
    let client = client(ScriptedSender::new());
    let mut blocked = reacted("C1", "1705312325.000100", "writing_hand", &[ME]);
    blocked.message.text = long_text();
    let mut written = reacted("C2", "1705312400.000200", "writing_hand", &[ME]);
    written.message.text = long_text();
    let channel_names = HashMap::from([("C1".to_string(), "ops".to_string())]);

    // a directory where the note file should go makes that write fail
    let blocked_path = dir
        .path()
        .join(note_filename(&message_time("1705312325.000100"), "ops"));
    std::fs::create_dir(&blocked_path).unwrap();

    let mut ledger = Ledger::load(dir.path());
    let outputs = capture_notes(
        &client,
        &[blocked, written],
        &channel_names,
        dir.path(),
        NotesFormat::Md,
        &mut ledger,
    )
    .await
    .unwrap();

    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].channel, "C2");
    assert!(dir.path().join(&outputs[0].file).is_file());

    let saved = Ledger::load(dir.path());
    assert_eq!(saved.len(), 1);
    assert!(!saved.contains("C1", "1705312325.000100"));
    assert!(saved.contains("C2", "1705312400.000200"));
}

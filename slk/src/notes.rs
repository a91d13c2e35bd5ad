//! Capturing reacted-to messages as local notes.
//!
//! The ledger at `<dir>/.slk-state.json` remembers every message already
//! written out, keyed by `"<channelID>:<ts>"`. Entries are only ever added.

use chrono::{DateTime, Local, SecondsFormat, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;

use crate::error::Result;
use crate::format::{format_file_size, resolve_text, ts_to_time};
use crate::identity::NameResolver;
use crate::models::{File, Message, ReactedItem, Reaction};

pub const LEDGER_FILE: &str = ".slk-state.json";
pub const JSONL_FILE: &str = "notes.jsonl";
pub const DEFAULT_EMOJI: &str = "writing_hand";
pub const DEFAULT_SINCE: &str = "7d";

/// Messages shorter than this get the preceding message attached as context.
pub const SHORT_MESSAGE_CHARS: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotesFormat {
    Jsonl,
    Md,
}

impl FromStr for NotesFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "jsonl" => Ok(NotesFormat::Jsonl),
            "md" => Ok(NotesFormat::Md),
            other => Err(format!("--format must be 'md' or 'jsonl', got '{}'", other)),
        }
    }
}

/// `~/Documents/notes/slack`, when a home directory is known.
pub fn default_notes_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|home| !home.is_empty())
        .map(|home| {
            PathBuf::from(home)
                .join("Documents")
                .join("notes")
                .join("slack")
        })
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    captured: BTreeMap<String, String>,
}

/// The set of already-captured messages and when each was captured.
#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    captured: BTreeMap<String, String>,
}

impl Ledger {
    /// Reads the ledger in `dir`. A missing file is an empty ledger; so is an
    /// unreadable or corrupt one, after a warning.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(LEDGER_FILE);
        let captured = match std::fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str::<LedgerFile>(&data) {
                Ok(file) => file.captured,
                Err(e) => {
                    warn!("corrupt state file {}: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!("cannot read state file {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };
        debug!("ledger {} holds {} entries", path.display(), captured.len());
        Self { path, captured }
    }

    pub fn key(channel_id: &str, ts: &str) -> String {
        format!("{}:{}", channel_id, ts)
    }

    pub fn contains(&self, channel_id: &str, ts: &str) -> bool {
        self.captured.contains_key(&Self::key(channel_id, ts))
    }

    /// Marks a message captured. An existing entry keeps its original time;
    /// returns whether the entry is new.
    pub fn record(&mut self, channel_id: &str, ts: &str, captured_at: &str) -> bool {
        let key = Self::key(channel_id, ts);
        if self.captured.contains_key(&key) {
            return false;
        }
        self.captured.insert(key, captured_at.to_string());
        true
    }

    pub fn captured_at(&self, channel_id: &str, ts: &str) -> Option<&str> {
        self.captured
            .get(&Self::key(channel_id, ts))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.captured.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captured.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the ledger through a temporary file in the same directory, so a
    /// crash never leaves a half-written state file behind.
    pub fn save(&self) -> Result<()> {
        let file = LedgerFile {
            captured: self.captured.clone(),
        };
        let data = serde_json::to_string_pretty(&file).map_err(io::Error::other)?;

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(data.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// True when the user `self_id` reacted with `emoji` or one of its skin-tone
/// variants (`writing_hand::skin-tone-2`).
pub fn has_matching_reaction(reactions: &[Reaction], emoji: &str, self_id: &str) -> bool {
    reactions
        .iter()
        .filter(|r| r.name.starts_with(emoji))
        .any(|r| r.users.iter().any(|u| u == self_id))
}

/// Reacted items worth capturing: messages newer than `cutoff` that
/// `self_id` marked with `emoji` and that the ledger has not seen yet.
pub fn select_new_items(
    items: Vec<ReactedItem>,
    emoji: &str,
    self_id: &str,
    cutoff: Option<i64>,
    ledger: &Ledger,
) -> Vec<ReactedItem> {
    items
        .into_iter()
        .filter(|item| item.kind == "message")
        .filter(|item| match cutoff {
            Some(cutoff) => ts_to_time(&item.message.ts).is_some_and(|t| t.timestamp() >= cutoff),
            None => true,
        })
        .filter(|item| has_matching_reaction(&item.message.reactions, emoji, self_id))
        .filter(|item| !ledger.contains(&item.channel, &item.message.ts))
        .collect()
}

/// Local time a message was posted. Malformed timestamps map to the epoch.
pub fn message_time(ts: &str) -> DateTime<Local> {
    ts_to_time(ts)
        .unwrap_or(DateTime::UNIX_EPOCH)
        .with_timezone(&Local)
}

pub fn rfc3339_utc(time: &DateTime<Local>) -> String {
    time.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn sanitize_filename(name: &str) -> String {
    name.replace([' ', '/'], "-").to_lowercase()
}

/// First line of `s`, cut to `max` characters with a trailing `...`.
pub fn truncate(s: &str, max: usize) -> String {
    let first_line = s.split('\n').next().unwrap_or_default();
    if first_line.chars().count() > max {
        let kept: String = first_line.chars().take(max.saturating_sub(3)).collect();
        return format!("{}...", kept);
    }
    first_line.to_string()
}

/// `<YYYY-MM-DD>-<HHMMSS>-<channel>.md`, in local time.
pub fn note_filename(msg_time: &DateTime<Local>, channel_name: &str) -> String {
    format!(
        "{}-{}.md",
        msg_time.format("%Y-%m-%d-%H%M%S"),
        sanitize_filename(channel_name)
    )
}

/// Messages shown above a captured note.
#[derive(Debug, Clone, Default)]
pub struct NoteContext {
    /// Parent of the thread the note was posted in.
    pub parent: Option<Message>,
    /// Message immediately before a short note.
    pub previous: Option<Message>,
}

impl NoteContext {
    pub fn is_empty(&self) -> bool {
        self.parent.is_none() && self.previous.is_none()
    }

    /// One line per context message, for JSON lines output.
    pub fn summary(&self, resolver: &dyn NameResolver) -> String {
        let mut lines = Vec::new();
        if let Some(parent) = &self.parent {
            lines.push(format!(
                "[{}, thread]: {}",
                resolver.resolve_user(&parent.user),
                resolve_text(&parent.text, resolver)
            ));
        }
        if let Some(previous) = &self.previous {
            lines.push(format!(
                "[{}, previous]: {}",
                resolver.resolve_user(&previous.user),
                resolve_text(&previous.text, resolver)
            ));
        }
        lines.join("\n")
    }
}

/// Short notes get the message before them attached as context.
pub fn needs_previous(msg: &Message) -> bool {
    msg.text.trim().chars().count() < SHORT_MESSAGE_CHARS
}

/// Markdown body of one note file.
pub fn build_note_content(
    user_name: &str,
    channel_name: &str,
    text: &str,
    files: &[File],
    msg_time: &DateTime<Local>,
    context: Option<&NoteContext>,
    resolver: &dyn NameResolver,
) -> String {
    let mut out = String::new();
    let _ = write!(out, "@{} in #{}\n\n", user_name, channel_name);

    if let Some(context) = context {
        for (label, msg) in [("thread", &context.parent), ("previous", &context.previous)] {
            if let Some(msg) = msg {
                let _ = writeln!(out, "[@{}, {}]:", resolver.resolve_user(&msg.user), label);
                push_quoted(&mut out, &resolve_text(&msg.text, resolver));
                out.push('\n');
            }
        }
    }

    push_quoted(&mut out, text);

    if !files.is_empty() {
        out.push('\n');
        for file in files {
            let _ = writeln!(out, "[file] {} ({})", file.name, format_file_size(file.size));
        }
    }

    let _ = write!(out, "\n{}\n", msg_time.format("%Y-%m-%d %H:%M"));
    out
}

fn push_quoted(out: &mut String, text: &str) {
    for line in text.split('\n') {
        let _ = writeln!(out, "> {}", line);
    }
}

/// One line of `notes.jsonl`.
#[derive(Debug, Clone, Serialize)]
pub struct NoteRecord {
    pub channel: String,
    pub user: String,
    pub text: String,
    pub ts: String,
    pub timestamp: String,
    pub captured: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub context: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
}

/// Summary of a captured (or, on a dry run, capturable) note.
#[derive(Debug, Clone, Serialize)]
pub struct NoteOutput {
    pub channel: String,
    pub user: String,
    pub text: String,
    pub ts: String,
    pub timestamp: String,
    pub file: String,
}

impl NoteOutput {
    pub fn new(item: &ReactedItem, channel_name: &str, resolver: &dyn NameResolver) -> Self {
        let msg_time = message_time(&item.message.ts);
        Self {
            channel: channel_name.to_string(),
            user: resolver.resolve_user(&item.message.user),
            text: item.message.text.clone(),
            ts: item.message.ts.clone(),
            timestamp: rfc3339_utc(&msg_time),
            file: note_filename(&msg_time, channel_name),
        }
    }
}

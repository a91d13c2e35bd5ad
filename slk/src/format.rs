//! Plain-text and JSON rendering of fetched Slack data.

use chrono::{DateTime, Local, SecondsFormat, Utc};
use log::warn;
use regex::{Captures, Regex};
use serde::Serialize;
use std::fmt::Write;
use std::sync::LazyLock;

use crate::identity::NameResolver;
use crate::models::{Channel, File, Message, Reaction, SearchMessages, User};

static USER_MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@(U[A-Z0-9]+)>").expect("valid mention regex"));
static CHANNEL_MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<#(C[A-Z0-9]+)\|([^>]+)>").expect("valid channel regex"));
static URL_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(https?://[^|>]+)\|([^>]+)>").expect("valid link regex"));
static BARE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<(https?://[^>]+)>").expect("valid url regex"));
static USER_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^U[A-Z0-9]{8,}$").expect("valid user ID regex"));

const TOPIC_WIDTH: usize = 60;

/// Replaces Slack markup (mentions, links, entities) with readable text.
pub fn resolve_text(text: &str, resolver: &dyn NameResolver) -> String {
    let text = USER_MENTION_RE.replace_all(text, |caps: &Captures| {
        format!("@{}", resolver.resolve_user(&caps[1]))
    });
    let text = CHANNEL_MENTION_RE.replace_all(&text, "#$2");
    let text = URL_LINK_RE.replace_all(&text, "$2");
    let text = BARE_URL_RE.replace_all(&text, "$1");
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

/// Seconds part of a dotted Slack timestamp. Malformed values give `None`.
pub fn ts_to_time(ts: &str) -> Option<DateTime<Utc>> {
    let seconds = ts.split('.').next().unwrap_or_default();
    match seconds.parse::<i64>() {
        Ok(secs) => DateTime::from_timestamp(secs, 0),
        Err(_) => {
            warn!("malformed timestamp: {}", ts);
            None
        }
    }
}

/// `YYYY-MM-DD HH:MM` in local time, empty for a malformed timestamp.
pub fn format_timestamp(ts: &str) -> String {
    ts_to_time(ts)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

pub fn format_file_size(size: u64) -> String {
    const KB: u64 = 1 << 10;
    const MB: u64 = 1 << 20;
    const GB: u64 = 1 << 30;
    match size {
        s if s >= GB => format!("{:.1}GB", s as f64 / GB as f64),
        s if s >= MB => format!("{:.1}MB", s as f64 / MB as f64),
        s if s >= KB => format!("{:.1}KB", s as f64 / KB as f64),
        s => format!("{}B", s),
    }
}

/// Author label: the resolved user, or the bot's own name.
fn author_name(msg: &Message, resolver: &dyn NameResolver) -> String {
    if msg.user.is_empty() && !msg.bot_id.is_empty() {
        if msg.username.is_empty() {
            return "bot".to_string();
        }
        return msg.username.clone();
    }
    resolver.resolve_user(&msg.user)
}

/// Renders messages in the order given. Messages without text (joins, leaves)
/// are skipped.
pub fn format_messages(
    msgs: &[Message],
    channel_label: &str,
    resolver: &dyn NameResolver,
) -> String {
    if msgs.is_empty() {
        return "No messages found.\n".to_string();
    }

    let mut out = String::new();
    for msg in msgs.iter().filter(|m| !m.text.is_empty()) {
        let ts = format_timestamp(&msg.ts);
        if channel_label.is_empty() {
            let _ = writeln!(out, "{}", ts);
        } else {
            let prefix = if channel_label.starts_with('@') { "" } else { "#" };
            let _ = writeln!(out, "{}{} \u{2014} {}", prefix, channel_label, ts);
        }
        let _ = writeln!(
            out,
            "  @{}: {}",
            author_name(msg, resolver),
            resolve_text(&msg.text, resolver)
        );

        if !msg.reactions.is_empty() {
            let _ = writeln!(out, "    {}", format_reactions(&msg.reactions, resolver));
        }

        for file in &msg.files {
            let _ = writeln!(out, "    [file] {} ({})", file.name, format_file_size(file.size));
        }

        if msg.reply_count > 0 && msg.thread_ts == msg.ts {
            let latest = Some(&msg.latest_reply)
                .filter(|ts| !ts.is_empty())
                .and_then(|ts| ts_to_time(ts));
            match latest {
                Some(latest) => {
                    let _ = writeln!(
                        out,
                        "    [{} replies, latest: {}, ts: {}]",
                        msg.reply_count,
                        latest.with_timezone(&Local).format("%H:%M"),
                        msg.ts
                    );
                }
                None => {
                    let _ = writeln!(out, "    [{} replies, ts: {}]", msg.reply_count, msg.ts);
                }
            }
        }

        out.push('\n');
    }
    out
}

// one entry per reacting user, in first-seen order: ":a: :b: @name"
fn format_reactions(reactions: &[Reaction], resolver: &dyn NameResolver) -> String {
    let mut by_user: Vec<(&str, Vec<String>)> = Vec::new();
    for reaction in reactions {
        for user_id in &reaction.users {
            let emoji = format!(":{}:", reaction.name);
            match by_user.iter_mut().find(|(id, _)| *id == user_id.as_str()) {
                Some((_, emojis)) => emojis.push(emoji),
                None => by_user.push((user_id.as_str(), vec![emoji])),
            }
        }
    }
    by_user
        .iter()
        .map(|(id, emojis)| format!("{} @{}", emojis.join(" "), resolver.resolve_user(id)))
        .collect::<Vec<_>>()
        .join("  ")
}

pub fn channel_type(ch: &Channel) -> &'static str {
    if ch.is_im {
        "dm"
    } else if ch.is_mpim {
        "mpim"
    } else if ch.is_private {
        "private"
    } else {
        "public"
    }
}

pub fn format_channels(channels: &[Channel], resolver: &dyn NameResolver) -> String {
    if channels.is_empty() {
        return "No channels found.\n".to_string();
    }

    let mut out = String::new();
    for ch in channels {
        let name = if ch.is_im {
            format!("@{}", resolver.resolve_user(&ch.user))
        } else {
            ch.name.clone()
        };
        let _ = write!(
            out,
            "{:<30}  {:<8}  {:>4} members",
            name,
            channel_type(ch),
            ch.num_members
        );
        if !ch.topic.value.is_empty() {
            let _ = write!(out, "  | {}", truncate_chars(&ch.topic.value, TOPIC_WIDTH));
        }
        out.push('\n');
    }
    out
}

/// Cuts `text` to `width` characters, ending with `...` when shortened.
pub fn truncate_chars(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Active users get a `*` marker once presence has been fetched. Deleted
/// accounts and bots are left out.
pub fn format_users(users: &[User]) -> String {
    if users.is_empty() {
        return "No users found.\n".to_string();
    }

    let mut out = String::new();
    for user in users.iter().filter(|u| !u.deleted && !u.is_bot) {
        match user.presence.as_str() {
            "active" => out.push_str("* "),
            "away" => out.push_str("  "),
            _ => {}
        }
        let _ = write!(
            out,
            "{:<25}  {:<30}  {:<30}",
            user.display_name(),
            user.real_name,
            user.profile.title
        );

        let status = [user.profile.status_emoji.as_str(), user.profile.status_text.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !status.is_empty() {
            let _ = write!(out, "  {}", status);
        }
        out.push('\n');
    }
    out
}

pub fn format_search_results(result: &SearchMessages, resolver: &dyn NameResolver) -> String {
    if result.matches.is_empty() {
        return "No results found.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(out, "{} results:\n", result.total);
    for m in &result.matches {
        // search reports DMs with the other user's ID as the channel name
        let channel = if USER_ID_RE.is_match(&m.channel.name) {
            format!("@{}", resolver.resolve_user(&m.channel.name))
        } else {
            format!("#{}", m.channel.name)
        };
        let _ = writeln!(out, "{} \u{2014} {}", channel, format_timestamp(&m.ts));

        let mut author = resolver.resolve_user(&m.user);
        if author == m.user && !m.username.is_empty() {
            author = m.username.clone();
        }
        let _ = writeln!(out, "  @{}: {}\n", author, resolve_text(&m.text, resolver));
    }
    out
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MessageJson {
    pub user: String,
    pub user_id: String,
    pub text: String,
    pub ts: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thread_ts: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub reply_count: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reactions: Vec<Reaction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<File>,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

pub fn messages_to_json(msgs: &[Message], resolver: &dyn NameResolver) -> Vec<MessageJson> {
    msgs.iter()
        .filter(|m| !m.text.is_empty())
        .map(|msg| MessageJson {
            user: author_name(msg, resolver),
            user_id: msg.user.clone(),
            text: msg.text.clone(),
            ts: msg.ts.clone(),
            timestamp: ts_to_time(&msg.ts)
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
                .unwrap_or_default(),
            thread_ts: msg.thread_ts.clone(),
            reply_count: msg.reply_count,
            reactions: msg.reactions.clone(),
            files: msg.files.clone(),
        })
        .collect()
}

/// Pretty-printed JSON with two-space indentation.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}

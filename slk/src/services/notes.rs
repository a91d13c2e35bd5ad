use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use log::{error, info, warn};
use serde_json::json;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{print_json, warm_user_cache};
use crate::api::slack::ALL_CONVERSATION_TYPES;
use crate::api::{HttpSender, SlackClient};
use crate::cli::NotesArgs;
use crate::format::{format_timestamp, resolve_text};
use crate::identity::NameResolver;
use crate::models::ReactedItem;
use crate::notes::{
    JSONL_FILE, Ledger, NoteContext, NoteOutput, NoteRecord, NotesFormat, build_note_content,
    default_notes_dir, message_time, needs_previous, select_new_items, truncate,
};
use crate::timearg::parse_time_arg;

const PREVIEW_CHARS: usize = 60;

pub async fn run<S: HttpSender>(
    client: &mut SlackClient<S>,
    args: NotesArgs,
    json: bool,
) -> Result<()> {
    let cutoff = parse_time_arg(&args.since).context("parsing --since")?;
    let format = if args.format.is_empty() {
        NotesFormat::Jsonl
    } else {
        args.format.parse().map_err(anyhow::Error::msg)?
    };
    let dir = if args.dir.is_empty() {
        default_notes_dir().context("cannot determine home directory")?
    } else {
        PathBuf::from(&args.dir)
    };

    let self_id = client
        .identify()
        .await
        .context("identifying user")?
        .to_string();
    warm_user_cache(client).await;

    let channels = client
        .list_channels(ALL_CONVERSATION_TYPES, None)
        .await
        .context("listing channels")?;
    let channel_names: HashMap<String, String> = channels
        .iter()
        .map(|ch| {
            let name = if ch.is_im {
                format!("dm-{}", client.resolve_user(&ch.user))
            } else {
                ch.name.clone()
            };
            (ch.id.clone(), name)
        })
        .collect();

    let items = client
        .reactions_list(None)
        .await
        .context("fetching reactions")?;
    let mut ledger = Ledger::load(&dir);
    let new_items = select_new_items(items, &args.emoji, &self_id, cutoff, &ledger);
    info!("{} new notes to capture", new_items.len());

    let channel_name = |id: &str| {
        channel_names
            .get(id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    };

    if new_items.is_empty() {
        if json {
            return print_json(&json!({
                "ok": true,
                "captured": 0,
                "notes": Vec::<NoteOutput>::new(),
            }));
        }
        println!("No new notes found.");
        return Ok(());
    }

    if args.dry_run {
        let identity = client.identity();
        if json {
            let notes: Vec<NoteOutput> = new_items
                .iter()
                .map(|item| NoteOutput::new(item, &channel_name(&item.channel), identity))
                .collect();
            return print_json(&json!({
                "ok": true,
                "captured": notes.len(),
                "notes": notes,
                "dry_run": true,
            }));
        }
        println!("Would capture {} notes:", new_items.len());
        for item in &new_items {
            let msg = &item.message;
            println!(
                "  @{} in #{} ({}): {}",
                identity.resolve_user(&msg.user),
                channel_name(&item.channel),
                format_timestamp(&msg.ts),
                truncate(&resolve_text(&msg.text, identity), PREVIEW_CHARS)
            );
        }
        return Ok(());
    }

    let outputs =
        capture_notes(client, &new_items, &channel_names, &dir, format, &mut ledger).await?;

    if json {
        return print_json(&json!({
            "ok": true,
            "captured": outputs.len(),
            "notes": outputs,
        }));
    }

    match format {
        NotesFormat::Jsonl => {
            println!("Appended {} notes to {}", outputs.len(), dir.join(JSONL_FILE).display());
        }
        NotesFormat::Md => {
            println!("Captured {} new notes:", outputs.len());
            for note in &outputs {
                println!(
                    "  {} \u{2014} @{}: {}",
                    dir.join(&note.file).display(),
                    note.user,
                    truncate(&resolve_text(&note.text, client.identity()), PREVIEW_CHARS)
                );
            }
        }
    }
    Ok(())
}

/// Writes each item as a note in `dir` and records it in `ledger`, then saves
/// the ledger. A note that cannot be written is logged and left unrecorded so
/// the next run retries it.
pub async fn capture_notes<S: HttpSender>(
    client: &SlackClient<S>,
    items: &[ReactedItem],
    channel_names: &HashMap<String, String>,
    dir: &Path,
    format: NotesFormat,
    ledger: &mut Ledger,
) -> Result<Vec<NoteOutput>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating notes directory {}", dir.display()))?;

    let mut jsonl = match format {
        NotesFormat::Jsonl => {
            let path = dir.join(JSONL_FILE);
            let file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(&path)
                .with_context(|| format!("opening {}", path.display()))?;
            Some(file)
        }
        NotesFormat::Md => None,
    };

    let captured_at = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    let mut outputs = Vec::new();

    for item in items {
        let context = fetch_context(client, item).await;
        let name = channel_names
            .get(&item.channel)
            .cloned()
            .unwrap_or_else(|| item.channel.clone());
        let output = NoteOutput::new(item, &name, client.identity());

        let written = match jsonl.as_mut() {
            Some(file) => {
                append_record(file, item, &output, &context, &captured_at, client.identity())
            }
            None => write_markdown(dir, item, &output, &context, client.identity()),
        };
        if let Err(e) = written {
            error!("saving note {}: {:#}", output.ts, e);
            continue;
        }

        ledger.record(&item.channel, &item.message.ts, &captured_at);
        outputs.push(output);
    }

    ledger
        .save()
        .with_context(|| format!("saving state {}", ledger.path().display()))?;
    Ok(outputs)
}

/// Thread parent for replies, plus the preceding message for short notes.
/// Lookup failures only cost the context.
pub async fn fetch_context<S: HttpSender>(
    client: &SlackClient<S>,
    item: &ReactedItem,
) -> NoteContext {
    let msg = &item.message;
    let mut context = NoteContext::default();

    if msg.is_thread_reply() {
        match client.get_replies(&item.channel, &msg.thread_ts, Some(1)).await {
            Ok(replies) => context.parent = replies.into_iter().next(),
            Err(e) => warn!("could not fetch thread context: {}", e),
        }
    }

    if !needs_previous(msg) {
        return context;
    }

    if msg.is_thread_reply() {
        match client.get_replies(&item.channel, &msg.thread_ts, None).await {
            Ok(replies) => {
                let previous = replies
                    .iter()
                    .position(|r| r.ts == msg.ts)
                    .filter(|idx| *idx > 0)
                    .map(|idx| &replies[idx - 1]);
                if let Some(previous) = previous {
                    if context.parent.as_ref().is_none_or(|p| p.ts != previous.ts) {
                        context.previous = Some(previous.clone());
                    }
                }
            }
            Err(e) => warn!("could not fetch thread replies: {}", e),
        }
    } else {
        match client.get_history(&item.channel, Some(1), None, Some(&msg.ts)).await {
            Ok(history) => context.previous = history.into_iter().next(),
            Err(e) => warn!("could not fetch channel history: {}", e),
        }
    }

    context
}

fn append_record(
    file: &mut std::fs::File,
    item: &ReactedItem,
    output: &NoteOutput,
    context: &NoteContext,
    captured_at: &str,
    resolver: &dyn NameResolver,
) -> Result<()> {
    let record = NoteRecord {
        channel: output.channel.clone(),
        user: output.user.clone(),
        text: resolve_text(&item.message.text, resolver),
        ts: output.ts.clone(),
        timestamp: output.timestamp.clone(),
        captured: captured_at.to_string(),
        context: context.summary(resolver),
        files: item.message.files.iter().map(|f| f.name.clone()).collect(),
    };
    let mut line = serde_json::to_string(&record)?;
    line.push('\n');
    file.write_all(line.as_bytes())?;
    Ok(())
}

fn write_markdown(
    dir: &Path,
    item: &ReactedItem,
    output: &NoteOutput,
    context: &NoteContext,
    resolver: &dyn NameResolver,
) -> Result<()> {
    let msg_time = message_time(&item.message.ts);
    let content = build_note_content(
        &output.user,
        &output.channel,
        &resolve_text(&item.message.text, resolver),
        &item.message.files,
        &msg_time,
        Some(context).filter(|c| !c.is_empty()),
        resolver,
    );
    let path = dir.join(&output.file);
    std::fs::write(&path, content).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

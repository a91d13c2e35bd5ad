use anyhow::{Context, Result};
use log::warn;
use serde_json::json;

use super::{print_json, warm_user_cache};
use crate::api::{HttpSender, SlackClient};
use crate::cli::OpenArgs;
use crate::format::{format_messages, messages_to_json};
use crate::models::Message;
use crate::resolve::{Permalink, parse_permalink};

pub async fn run<S: HttpSender>(
    client: &mut SlackClient<S>,
    args: OpenArgs,
    json: bool,
) -> Result<()> {
    let link = parse_permalink(&args.permalink)?;
    warm_user_cache(client).await;

    let messages = fetch_linked(client, &link, args.context).await?;
    // naming the channel would cost another call
    let label = &link.channel_id;

    if json {
        let mut payload = json!({
            "ok": true,
            "channel": label,
            "messages": messages_to_json(&messages, client.identity()),
            "url": args.permalink,
        });
        if let Some(thread_ts) = &link.thread_ts {
            payload["thread_ts"] = json!(thread_ts);
        }
        return print_json(&payload);
    }

    print!("{}", format_messages(&messages, label, client.identity()));
    Ok(())
}

/// The linked message preceded by up to `context` earlier messages, oldest
/// first.
pub async fn fetch_linked<S: HttpSender>(
    client: &SlackClient<S>,
    link: &Permalink,
    context: usize,
) -> Result<Vec<Message>> {
    if let Some(thread_ts) = &link.thread_ts {
        let thread = client
            .get_replies(&link.channel_id, thread_ts, None)
            .await
            .context("fetching thread")?;
        return Ok(match thread.iter().position(|m| m.ts == link.message_ts) {
            Some(idx) => thread[idx.saturating_sub(context)..=idx].to_vec(),
            None => thread,
        });
    }

    let mut messages = Vec::new();
    if context > 0 {
        match client
            .get_context(&link.channel_id, &link.message_ts, context)
            .await
        {
            Ok(mut earlier) => {
                earlier.reverse();
                messages = earlier;
            }
            Err(e) => warn!("could not fetch context: {}", e),
        }
    }
    messages.push(client.get_message(&link.channel_id, &link.message_ts).await?);
    Ok(messages)
}

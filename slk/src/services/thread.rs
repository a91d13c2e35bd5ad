use anyhow::{Context, Result};
use serde_json::json;

use super::{print_json, warm_user_cache};
use crate::api::{HttpSender, SlackClient};
use crate::cli::ThreadArgs;
use crate::format::{format_messages, messages_to_json};
use crate::resolve::resolve_target;

pub async fn run<S: HttpSender>(
    client: &mut SlackClient<S>,
    args: ThreadArgs,
    json: bool,
) -> Result<()> {
    warm_user_cache(client).await;
    let target = resolve_target(client, &args.channel).await?;
    let messages = client
        .get_replies(&target.channel_id, &args.thread_ts, Some(args.limit))
        .await
        .with_context(|| format!("fetching thread {}", args.thread_ts))?;

    if json {
        return print_json(&json!({
            "ok": true,
            "channel": target.label,
            "thread_ts": args.thread_ts,
            "messages": messages_to_json(&messages, client.identity()),
        }));
    }

    print!("{}", format_messages(&messages, &target.label, client.identity()));
    Ok(())
}

use anyhow::{Context, Result};
use serde_json::json;

use super::{print_json, warm_user_cache};
use crate::api::{HttpSender, SlackClient};
use crate::cli::ReadArgs;
use crate::format::{format_messages, messages_to_json};
use crate::history::HistoryQuery;
use crate::resolve::resolve_target;

pub async fn run<S: HttpSender>(
    client: &mut SlackClient<S>,
    args: ReadArgs,
    json: bool,
) -> Result<()> {
    // filters are checked before anything goes over the wire
    let query = HistoryQuery::from_filters(args.limit, &args.after, &args.before, &args.around)?;

    warm_user_cache(client).await;
    let target = resolve_target(client, &args.target).await?;
    let messages = query
        .fetch(client, &target.channel_id)
        .await
        .with_context(|| format!("reading {}", target.label))?;

    if json {
        return print_json(&json!({
            "ok": true,
            "channel": target.label,
            "messages": messages_to_json(&messages, client.identity()),
        }));
    }

    print!("{}", format_messages(&messages, &target.label, client.identity()));
    Ok(())
}

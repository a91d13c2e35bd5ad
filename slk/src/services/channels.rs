use anyhow::{Context, Result};
use serde_json::json;

use super::{print_json, warm_user_cache};
use crate::api::{HttpSender, SlackClient};
use crate::cli::ChannelsArgs;
use crate::format::format_channels;

pub async fn run<S: HttpSender>(
    client: &mut SlackClient<S>,
    args: ChannelsArgs,
    json: bool,
) -> Result<()> {
    let channels = client
        .list_channels(args.kind.api_types(), None)
        .await
        .context("listing channels")?;

    if json {
        return print_json(&json!({ "ok": true, "channels": channels }));
    }

    // DM rows are labelled with the other party's name
    if channels.iter().any(|ch| ch.is_im) {
        warm_user_cache(client).await;
    }
    print!("{}", format_channels(&channels, client.identity()));
    Ok(())
}

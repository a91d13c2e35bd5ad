use anyhow::{Context, Result};
use log::warn;
use regex::{Captures, Regex};
use serde_json::json;
use std::sync::LazyLock;

use super::print_json;
use crate::api::{HttpSender, SlackClient};
use crate::cli::SearchArgs;
use crate::format::format_search_results;
use crate::identity::IdentityCache;

static FROM_AT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"from:@(\S+)").expect("valid from: regex"));

/// Search wants login names, people type display names.
pub fn rewrite_from_mentions(query: &str, identity: &IdentityCache) -> String {
    FROM_AT_RE
        .replace_all(query, |caps: &Captures| {
            format!("from:@{}", identity.resolve_display_name_to_username(&caps[1]))
        })
        .into_owned()
}

pub async fn run<S: HttpSender>(
    client: &mut SlackClient<S>,
    args: SearchArgs,
    json: bool,
) -> Result<()> {
    if let Err(e) = client.ensure_user_cache().await {
        warn!("user cache unavailable, from:@ resolution disabled: {}", e);
    }

    let query = rewrite_from_mentions(&args.query, client.identity());
    let result = client
        .search_messages(&query, args.limit)
        .await
        .with_context(|| format!("searching for {:?}", query))?;

    if json {
        return print_json(&json!({
            "ok": true,
            "total": result.total,
            "matches": result.matches,
        }));
    }

    print!("{}", format_search_results(&result, client.identity()));
    Ok(())
}

//! Turning user-supplied targets and links into channel IDs and timestamps.

use log::debug;
use regex::Regex;
use reqwest::Url;
use std::sync::LazyLock;

use crate::api::{HttpSender, SlackClient};
use crate::error::{Result, SlackError};

static USER_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^U[A-Z0-9]{8,}$").expect("valid user ID regex"));
static PERMALINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://[^/]+\.slack\.com/archives/([A-Z0-9]+)/p(\d{10})(\d{6})")
        .expect("valid permalink regex")
});

/// A channel ID plus the label to print above its messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub channel_id: String,
    pub label: String,
}

/// Resolves `@name`, a user ID, a channel ID or a channel name, in that order.
/// Channel IDs are taken as-is without asking the API whether they exist.
pub async fn resolve_target<S: HttpSender>(
    client: &mut SlackClient<S>,
    target: &str,
) -> Result<ResolvedTarget> {
    if let Some(username) = target.strip_prefix('@') {
        let dm = client.find_dm_by_user(username).await?;
        let label = format!("@{}", client.resolve_user(&dm.user));
        return Ok(ResolvedTarget {
            channel_id: dm.id,
            label,
        });
    }

    if USER_ID_RE.is_match(target) {
        let dm = client.find_dm_by_user_id(target).await?;
        return Ok(ResolvedTarget {
            channel_id: dm.id,
            label: format!("@{}", client.resolve_user(target)),
        });
    }

    if looks_like_channel_id(target) {
        debug!("treating {} as a channel ID", target);
        return Ok(ResolvedTarget {
            channel_id: target.to_string(),
            label: target.to_string(),
        });
    }

    let channel = client.find_channel_by_name(target).await?;
    Ok(ResolvedTarget {
        channel_id: channel.id,
        label: channel.name,
    })
}

fn looks_like_channel_id(target: &str) -> bool {
    target.len() >= 9 && target.starts_with(['C', 'G', 'D'])
}

/// The message a Slack permalink points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permalink {
    pub channel_id: String,
    pub message_ts: String,
    /// Parent timestamp when the link points at a thread reply.
    pub thread_ts: Option<String>,
}

impl Permalink {
    pub fn is_thread_reply(&self) -> bool {
        self.thread_ts.is_some()
    }
}

pub fn parse_permalink(raw: &str) -> Result<Permalink> {
    let raw = raw.trim_start_matches('<').trim_end_matches('>');
    let caps = PERMALINK_RE
        .captures(raw)
        .ok_or_else(|| SlackError::InvalidPermalink(raw.to_string()))?;

    let thread_ts = Url::parse(raw).ok().and_then(|url| {
        url.query_pairs()
            .find(|(key, value)| key == "thread_ts" && !value.is_empty())
            .map(|(_, value)| value.into_owned())
    });

    Ok(Permalink {
        channel_id: caps[1].to_string(),
        message_ts: format!("{}.{}", &caps[2], &caps[3]),
        thread_ts,
    })
}

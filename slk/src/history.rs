//! Channel history reads: plain ranges and windows centred on one message.

use log::debug;
use std::collections::HashSet;

use crate::api::{HttpSender, SlackClient};
use crate::error::{Result, SlackError};
use crate::models::Message;
use crate::timearg::parse_time_arg;

/// A validated `read` request. Building one never touches the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryQuery {
    Range {
        limit: usize,
        oldest: Option<String>,
        latest: Option<String>,
    },
    Around {
        limit: usize,
        center: String,
    },
}

impl HistoryQuery {
    pub fn from_filters(limit: usize, after: &str, before: &str, around: &str) -> Result<Self> {
        if !around.is_empty() {
            if !after.is_empty() || !before.is_empty() {
                return Err(SlackError::UsageConflict(
                    "--around is mutually exclusive with --after and --before".to_string(),
                ));
            }
            return Ok(HistoryQuery::Around {
                limit,
                center: around.to_string(),
            });
        }

        Ok(HistoryQuery::Range {
            limit,
            oldest: parse_time_arg(after)?.map(|t| t.to_string()),
            latest: parse_time_arg(before)?.map(|t| t.to_string()),
        })
    }

    /// Runs the query and returns messages oldest first.
    pub async fn fetch<S: HttpSender>(
        &self,
        client: &SlackClient<S>,
        channel_id: &str,
    ) -> Result<Vec<Message>> {
        let mut messages = match self {
            HistoryQuery::Range {
                limit,
                oldest,
                latest,
            } => {
                client
                    .get_history(channel_id, Some(*limit), oldest.as_deref(), latest.as_deref())
                    .await?
            }
            HistoryQuery::Around { limit, center } => {
                fetch_around(client, channel_id, center, *limit).await?
            }
        };
        messages.reverse();
        Ok(messages)
    }
}

/// Up to `limit` messages surrounding `center`, newest first.
pub async fn fetch_around<S: HttpSender>(
    client: &SlackClient<S>,
    channel_id: &str,
    center: &str,
    limit: usize,
) -> Result<Vec<Message>> {
    let half_before = limit / 2;
    let half_after = limit - half_before;

    // a zero page limit would mean "everything", so an empty half is skipped
    let before = if half_before > 0 {
        client
            .get_history(channel_id, Some(half_before), None, Some(center))
            .await?
    } else {
        Vec::new()
    };
    let after = client
        .get_history_after(channel_id, Some(half_after + 1), center)
        .await?;
    debug!(
        "around {}: {} before, {} from centre on",
        center,
        before.len(),
        after.len()
    );

    Ok(merge_around_window(before, after, limit))
}

/// Concatenates both halves, keeps the first copy of each `ts`, orders by
/// `ts` descending and caps the result at `limit`.
pub fn merge_around_window(
    before: Vec<Message>,
    after: Vec<Message>,
    limit: usize,
) -> Vec<Message> {
    let mut seen = HashSet::new();
    let mut merged: Vec<Message> = before
        .into_iter()
        .chain(after)
        .filter(|m| seen.insert(m.ts.clone()))
        .collect();
    merged.sort_by(|a, b| b.ts.cmp(&a.ts));
    merged.truncate(limit);
    merged
}

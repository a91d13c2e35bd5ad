use log::{debug, info};
use serde::Deserialize;
use std::time::Duration;

use super::paginate::PageRequest;
use super::transport::{HttpSender, ReqwestSender, Transport};
use crate::error::{Result, SlackError};
use crate::identity::{IdentityCache, NameResolver};
use crate::models::*;

/// Every conversation type a user token can list.
pub const ALL_CONVERSATION_TYPES: &str = "public_channel,private_channel,mpim,im";

const CHANNELS_PAGE: usize = 200;
const HISTORY_PAGE: usize = 100;
const MEMBERS_PAGE: usize = 1000;
const USERS_PAGE: usize = 200;

/// Slack Web API client for one command run. Owns the identity cache, so a
/// fresh client means a fresh cache and a fresh set of warnings.
pub struct SlackClient<S = ReqwestSender> {
    transport: Transport<S>,
    identity: IdentityCache,
    self_id: Option<String>,
}

impl SlackClient<ReqwestSender> {
    pub fn new(base_url: &str, token: &str) -> Result<Self> {
        Ok(Self::with_sender(ReqwestSender::new(base_url, token)?))
    }
}

impl<S: HttpSender> SlackClient<S> {
    pub fn with_sender(sender: S) -> Self {
        Self {
            transport: Transport::new(sender),
            identity: IdentityCache::new(),
            self_id: None,
        }
    }

    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.transport = self.transport.with_backoff_unit(unit);
        self
    }

    pub fn transport(&self) -> &Transport<S> {
        &self.transport
    }

    pub async fn auth_test(&self) -> Result<AuthTestResult> {
        self.transport.call("auth.test", &[]).await
    }

    /// Calls `auth.test` and remembers the authenticated user's ID.
    pub async fn identify(&mut self) -> Result<&str> {
        let result = self.auth_test().await?;
        Ok(self.self_id.insert(result.user_id).as_str())
    }

    pub fn self_id(&self) -> Option<&str> {
        self.self_id.as_deref()
    }

    pub async fn get_presence(&self, user_id: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct Presence {
            #[serde(default)]
            presence: String,
        }
        let resp: Presence = self
            .transport
            .call("users.getPresence", &[("user", user_id.to_string())])
            .await?;
        Ok(resp.presence)
    }

    pub async fn list_channels(&self, types: &str, limit: Option<usize>) -> Result<Vec<Channel>> {
        let request = PageRequest::new("conversations.list", "channels", CHANNELS_PAGE)
            .param("types", types)
            .param("exclude_archived", "true")
            .limit(limit);
        self.transport.paginate(request).await
    }

    /// User IDs of everyone in `channel_id`.
    pub async fn get_members(&self, channel_id: &str) -> Result<Vec<String>> {
        let request = PageRequest::new("conversations.members", "members", MEMBERS_PAGE)
            .param("channel", channel_id);
        self.transport.paginate(request).await
    }

    /// Newest-first history, optionally bounded by `oldest`/`latest` epochs.
    pub async fn get_history(
        &self,
        channel_id: &str,
        limit: Option<usize>,
        oldest: Option<&str>,
        latest: Option<&str>,
    ) -> Result<Vec<Message>> {
        let mut request = PageRequest::new("conversations.history", "messages", HISTORY_PAGE)
            .param("channel", channel_id)
            .limit(limit);
        if let Some(oldest) = oldest {
            request = request.param("oldest", oldest);
        }
        if let Some(latest) = latest {
            request = request.param("latest", latest);
        }
        self.transport.paginate(request).await
    }

    /// Messages at or after `oldest`, newest first.
    pub async fn get_history_after(
        &self,
        channel_id: &str,
        limit: Option<usize>,
        oldest: &str,
    ) -> Result<Vec<Message>> {
        let request = PageRequest::new("conversations.history", "messages", HISTORY_PAGE)
            .param("channel", channel_id)
            .param("oldest", oldest)
            .param("inclusive", "true")
            .limit(limit);
        self.transport.paginate(request).await
    }

    /// The single message stored at exactly `ts`.
    pub async fn get_message(&self, channel_id: &str, ts: &str) -> Result<Message> {
        let page: MessagePage = self
            .transport
            .call(
                "conversations.history",
                &[
                    ("channel", channel_id.to_string()),
                    ("oldest", ts.to_string()),
                    ("latest", ts.to_string()),
                    ("limit", "1".to_string()),
                    ("inclusive", "true".to_string()),
                ],
            )
            .await?;
        page.messages.into_iter().next().ok_or_else(|| {
            SlackError::not_found("message", format!("ts={} in channel {}", ts, channel_id))
        })
    }

    /// Up to `before` messages older than `ts`, newest first, from one page.
    pub async fn get_context(
        &self,
        channel_id: &str,
        ts: &str,
        before: usize,
    ) -> Result<Vec<Message>> {
        let page: MessagePage = self
            .transport
            .call(
                "conversations.history",
                &[
                    ("channel", channel_id.to_string()),
                    ("latest", ts.to_string()),
                    ("limit", before.to_string()),
                ],
            )
            .await?;
        Ok(page.messages)
    }

    /// Thread parent followed by its replies, oldest first.
    pub async fn get_replies(
        &self,
        channel_id: &str,
        thread_ts: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Message>> {
        let request = PageRequest::new("conversations.replies", "messages", HISTORY_PAGE)
            .param("channel", channel_id)
            .param("ts", thread_ts)
            .limit(limit);
        self.transport.paginate(request).await
    }

    pub async fn search_messages(&self, query: &str, limit: usize) -> Result<SearchMessages> {
        #[derive(Deserialize)]
        struct SearchResponse {
            #[serde(default)]
            messages: SearchMessages,
        }
        let resp: SearchResponse = self
            .transport
            .call(
                "search.messages",
                &[
                    ("query", query.to_string()),
                    ("count", limit.to_string()),
                    ("sort", "timestamp".to_string()),
                    ("sort_dir", "desc".to_string()),
                ],
            )
            .await?;
        Ok(resp.messages)
    }

    /// Items the authenticated user reacted to.
    pub async fn reactions_list(&self, limit: Option<usize>) -> Result<Vec<ReactedItem>> {
        let request = PageRequest::new("reactions.list", "items", HISTORY_PAGE)
            .param("full", "true")
            .limit(limit);
        self.transport.paginate(request).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let request = PageRequest::new("users.list", "members", USERS_PAGE);
        self.transport.paginate(request).await
    }

    /// Builds the identity cache from the full user list unless it already
    /// exists. A failed listing leaves the cache unbuilt.
    pub async fn ensure_user_cache(&mut self) -> Result<()> {
        if self.identity.is_built() {
            return Ok(());
        }
        let users = self.list_users().await?;
        info!("user cache built with {} users", users.len());
        self.identity.populate(users);
        Ok(())
    }

    pub fn identity(&self) -> &IdentityCache {
        &self.identity
    }

    pub fn resolve_user(&self, user_id: &str) -> String {
        self.identity.resolve_user(user_id)
    }

    pub fn resolve_display_name_to_username(&self, display_name: &str) -> String {
        self.identity.resolve_display_name_to_username(display_name)
    }

    /// Channel by case-insensitive exact name, across every listable type.
    pub async fn find_channel_by_name(&self, name: &str) -> Result<Channel> {
        let channels = self.list_channels(ALL_CONVERSATION_TYPES, None).await?;
        let wanted = name.to_lowercase();
        channels
            .into_iter()
            .find(|ch| ch.name.to_lowercase() == wanted)
            .ok_or_else(|| SlackError::not_found("channel", name))
    }

    pub async fn find_user_by_name(&mut self, query: &str) -> Result<User> {
        self.ensure_user_cache().await?;
        self.identity
            .find_user(query)
            .cloned()
            .ok_or_else(|| SlackError::not_found("user", query))
    }

    pub async fn find_dm_by_user_id(&self, user_id: &str) -> Result<Channel> {
        let channels = self.list_channels("im", None).await?;
        debug!("searching {} DMs for {}", channels.len(), user_id);
        channels
            .into_iter()
            .find(|ch| ch.user == user_id)
            .ok_or_else(|| SlackError::not_found("DM channel with user ID", user_id))
    }

    pub async fn find_dm_by_user(&mut self, username: &str) -> Result<Channel> {
        let user = self.find_user_by_name(username).await?;
        self.find_dm_by_user_id(&user.id).await
    }
}

impl SlackClient<ReqwestSender> {
    /// GETs a private file URL with the bearer token attached.
    pub async fn download_file(&self, file_url: &str) -> Result<reqwest::Response> {
        let response = self.transport.sender().http().get(file_url).send().await?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(SlackError::HttpStatus {
                method: "download".to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }
}

#[derive(Deserialize)]
struct MessagePage {
    #[serde(default)]
    messages: Vec<Message>,
}

use serde::{Deserialize, Serialize};

/// Base envelope every Web API method answers with.
#[derive(Debug, Deserialize, Default)]
pub struct Envelope {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ResponseMetadata {
    #[serde(default)]
    pub next_cursor: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct AuthTestResult {
    pub user: String,
    pub team: String,
    pub team_id: String,
    pub user_id: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub is_channel: bool,
    pub is_group: bool,
    pub is_im: bool,
    pub is_mpim: bool,
    pub is_private: bool,
    pub is_archived: bool,
    pub num_members: u32,
    /// The other party of a direct message.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user: String,
    pub topic: TextValue,
    pub purpose: TextValue,
    pub name_normalized: String,
}

/// Topic or purpose of a channel.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct TextValue {
    pub value: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subtype: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub user: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub bot_id: String,
    pub text: String,
    pub ts: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub thread_ts: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub reply_count: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub latest_reply: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reactions: Vec<Reaction>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<File>,
    /// Bot display name.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub username: String,
}

impl Message {
    /// True for a reply inside a thread, false for the thread parent itself.
    pub fn is_thread_reply(&self) -> bool {
        !self.thread_ts.is_empty() && self.thread_ts != self.ts
    }
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Reaction {
    pub name: String,
    pub count: u32,
    pub users: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct File {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub url_private: String,
    pub url_private_download: String,
    pub mimetype: String,
    pub filetype: String,
    pub pretty_type: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct User {
    pub id: String,
    pub name: String,
    pub real_name: String,
    pub profile: UserProfile,
    pub deleted: bool,
    pub is_bot: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub presence: String,
}

impl User {
    /// Profile display name, falling back to the login name.
    pub fn display_name(&self) -> &str {
        if self.profile.display_name.is_empty() {
            &self.name
        } else {
            &self.profile.display_name
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct UserProfile {
    pub display_name: String,
    pub real_name: String,
    pub title: String,
    pub status_emoji: String,
    pub status_text: String,
    pub image_48: String,
}

/// An item from `reactions.list`.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct ReactedItem {
    #[serde(rename = "type")]
    pub kind: String,
    pub channel: String,
    pub message: Message,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct SearchMessages {
    pub total: u32,
    pub matches: Vec<SearchMatch>,
    pub paging: SearchPaging,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct SearchMatch {
    #[serde(rename = "type")]
    pub kind: String,
    pub user: String,
    pub username: String,
    pub text: String,
    pub ts: String,
    pub channel: SearchChannel,
    pub permalink: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<File>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct SearchChannel {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct SearchPaging {
    pub count: u32,
    pub total: u32,
    pub page: u32,
    pub pages: u32,
}

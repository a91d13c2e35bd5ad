#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use slk::api::{HttpSender, RawResponse, SlackClient};
use slk::error::{Result, SlackError};
use slk::models::{Message, Reaction, User, UserProfile};

/// Replays canned responses in order and records every request.
#[derive(Default)]
pub struct ScriptedSender {
    responses: Mutex<VecDeque<RawResponse>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, response: RawResponse) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }

    pub fn ok(self, body: Value) -> Self {
        self.reply(json_response(200, body))
    }

    pub fn rate_limited(self, retry_after: Option<u64>) -> Self {
        self.reply(RawResponse {
            status: 429,
            retry_after,
            body: Vec::new(),
        })
    }

    /// `(method, form body)` of every request so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpSender for ScriptedSender {
    async fn post_form(&self, method: &str, body: &str) -> Result<RawResponse> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), body.to_string()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| SlackError::Transport(format!("no scripted response for {}", method)))
    }
}

pub fn json_response(status: u16, body: Value) -> RawResponse {
    RawResponse {
        status,
        retry_after: None,
        body: serde_json::to_vec(&body).unwrap(),
    }
}

pub fn client(sender: ScriptedSender) -> SlackClient<ScriptedSender> {
    SlackClient::with_sender(sender).with_backoff_unit(Duration::from_millis(1))
}

pub fn calls(client: &SlackClient<ScriptedSender>) -> Vec<(String, String)> {
    client.transport().sender().calls()
}

/// A page of `items` under `key`, with an optional next cursor.
pub fn page(key: &str, items: Value, next_cursor: &str) -> Value {
    let mut body = json!({
        "ok": true,
        "response_metadata": { "next_cursor": next_cursor },
    });
    body[key] = items;
    body
}

pub fn message(ts: &str, user: &str, text: &str) -> Message {
    Message {
        kind: "message".to_string(),
        ts: ts.to_string(),
        user: user.to_string(),
        text: text.to_string(),
        ..Default::default()
    }
}

pub fn reaction(name: &str, users: &[&str]) -> Reaction {
    Reaction {
        name: name.to_string(),
        count: users.len() as u32,
        users: users.iter().map(|u| u.to_string()).collect(),
    }
}

pub fn user(id: &str, name: &str, display_name: &str, real_name: &str) -> User {
    User {
        id: id.to_string(),
        name: name.to_string(),
        real_name: real_name.to_string(),
        profile: UserProfile {
            display_name: display_name.to_string(),
            real_name: real_name.to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

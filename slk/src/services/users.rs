use anyhow::{Context, Result};
use log::warn;
use serde_json::json;

use super::print_json;
use crate::api::{HttpSender, SlackClient};
use crate::cli::UsersArgs;
use crate::format::format_users;
use crate::models::User;

/// Users whose login, display or real name contains `query`, ignoring case.
pub fn filter_users(users: Vec<User>, query: &str) -> Vec<User> {
    let query = query.to_lowercase();
    users
        .into_iter()
        .filter(|u| {
            u.name.to_lowercase().contains(&query)
                || u.profile.display_name.to_lowercase().contains(&query)
                || u.real_name.to_lowercase().contains(&query)
        })
        .collect()
}

pub async fn run<S: HttpSender>(
    client: &SlackClient<S>,
    args: UsersArgs,
    json: bool,
) -> Result<()> {
    let mut users = client.list_users().await.context("listing users")?;
    if let Some(query) = &args.query {
        users = filter_users(users, query);
    }

    if args.status {
        for user in users.iter_mut().filter(|u| !u.deleted && !u.is_bot) {
            match client.get_presence(&user.id).await {
                Ok(presence) => user.presence = presence,
                Err(e) => warn!("presence for {}: {}", user.name, e),
            }
        }
    }

    if json {
        return print_json(&json!({ "ok": true, "users": users }));
    }

    print!("{}", format_users(&users));
    Ok(())
}

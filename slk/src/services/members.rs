use anyhow::{Context, Result};
use serde::Serialize;

use super::{print_json, warm_user_cache};
use crate::api::{HttpSender, SlackClient};
use crate::cli::MembersArgs;
use crate::identity::NameResolver;
use crate::resolve::resolve_target;

#[derive(Debug, Serialize)]
struct Member {
    id: String,
    name: String,
}

pub async fn run<S: HttpSender>(
    client: &mut SlackClient<S>,
    args: MembersArgs,
    json: bool,
) -> Result<()> {
    warm_user_cache(client).await;
    let target = resolve_target(client, &args.channel).await?;
    let member_ids = client
        .get_members(&target.channel_id)
        .await
        .with_context(|| format!("listing members of {}", target.label))?;

    let identity = client.identity();
    if json {
        let members: Vec<Member> = member_ids
            .into_iter()
            .map(|id| Member {
                name: identity.resolve_user(&id),
                id,
            })
            .collect();
        return print_json(&members);
    }

    for id in &member_ids {
        println!("{}", identity.resolve_user(id));
    }
    Ok(())
}

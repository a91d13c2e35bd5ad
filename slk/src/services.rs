//! One module per subcommand. Each fetches through a [`SlackClient`] and
//! prints either text or JSON.

pub mod auth;
pub mod channels;
pub mod download;
pub mod members;
pub mod notes;
pub mod open;
pub mod read;
pub mod search;
pub mod thread;
pub mod users;

use anyhow::Result;
use log::warn;
use serde::Serialize;

use crate::api::{HttpSender, SlackClient, transport::DEFAULT_API_URL};
use crate::cli::{Args, Command};
use crate::credentials::{CredentialStore, SystemStore, get_token};
use crate::format::to_json;

pub async fn run(args: Args) -> Result<()> {
    let api_url = if args.api_url.is_empty() {
        DEFAULT_API_URL.to_string()
    } else {
        args.api_url.clone()
    };
    let store = SystemStore::default();
    let json = args.json;

    match args.command {
        Command::Auth(a) => auth::run(&store, &api_url, a).await,
        Command::Channels(a) => channels::run(&mut connect(&store, &api_url)?, a, json).await,
        Command::Read(a) => read::run(&mut connect(&store, &api_url)?, a, json).await,
        Command::Thread(a) => thread::run(&mut connect(&store, &api_url)?, a, json).await,
        Command::Open(a) => open::run(&mut connect(&store, &api_url)?, a, json).await,
        Command::Search(a) => search::run(&mut connect(&store, &api_url)?, a, json).await,
        Command::Users(a) => users::run(&connect(&store, &api_url)?, a, json).await,
        Command::Members(a) => members::run(&mut connect(&store, &api_url)?, a, json).await,
        Command::Download(a) => download::run(&connect(&store, &api_url)?, a).await,
        Command::Notes(a) => notes::run(&mut connect(&store, &api_url)?, a, json).await,
    }
}

/// A client authenticated with the first token found.
fn connect(store: &dyn CredentialStore, api_url: &str) -> Result<SlackClient> {
    let token = get_token(store)?;
    Ok(SlackClient::new(api_url, &token.token)?)
}

/// Builds the identity cache. A failed listing is not fatal; names then show
/// as raw user IDs.
pub(crate) async fn warm_user_cache<S: HttpSender>(client: &mut SlackClient<S>) {
    if let Err(e) = client.ensure_user_cache().await {
        warn!("user cache unavailable: {}", e);
    }
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", to_json(value)?);
    Ok(())
}

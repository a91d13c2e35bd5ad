use anyhow::{Context, Result, bail};
use dialoguer::Input;
use std::process;

use crate::api::SlackClient;
use crate::cli::AuthArgs;
use crate::credentials::{CredentialStore, TOKEN_ENV, get_token, mask_token};

const USER_TOKEN_PREFIX: &str = "xoxp-";

const SETUP_GUIDE: &str = "\
No token configured. Let's set one up.

You need a Slack User OAuth Token (xoxp-...).

If your workspace already has a Slack app installed:
  1. Go to https://api.slack.com/apps
  2. Select your app
  3. OAuth & Permissions -> User OAuth Token -> Copy

If not, create one:
  1. https://api.slack.com/apps -> Create New App -> From scratch
  2. OAuth & Permissions -> add these User Token Scopes:
     channels:history, channels:read, groups:history, groups:read,
     im:history, im:read, mpim:history, mpim:read,
     search:read, users:read, files:read
  3. Install to Workspace -> Copy User OAuth Token
";

pub async fn run(store: &dyn CredentialStore, api_url: &str, args: AuthArgs) -> Result<()> {
    if args.clear {
        store.delete().context("clearing token")?;
        println!("Token removed from {}.", store.name());
        return Ok(());
    }

    if let Some(token) = args.token {
        return store_token(store, api_url, &token).await;
    }

    match get_token(store) {
        Ok(result) => {
            println!("Status: configured");
            println!("Source: {}", result.source);
            println!("Token:  {}", mask_token(&result.token));
            Ok(())
        }
        Err(_) => guided_setup(store, api_url).await,
    }
}

/// Trims the token and rejects anything that is not a user token.
pub fn check_token_shape(raw: &str) -> Result<String> {
    let token = raw.trim();
    if token.is_empty() {
        bail!("empty token");
    }
    if !token.starts_with(USER_TOKEN_PREFIX) {
        bail!(
            "expected a User OAuth Token (starts with {})\n\
             Bot tokens (xoxb-) are not supported: Slack's search and DM APIs require a user token.",
            USER_TOKEN_PREFIX
        );
    }
    Ok(token.to_string())
}

/// Stores `raw` only after Slack accepts it.
async fn store_token(store: &dyn CredentialStore, api_url: &str, raw: &str) -> Result<()> {
    let token = check_token_shape(raw)?;
    let client = SlackClient::new(api_url, &token)?;
    let identity = client
        .auth_test()
        .await
        .context("token rejected by Slack")?;

    store.set(&token).context("storing token")?;
    println!("Authenticated as @{} in {}.", identity.user, identity.team);
    println!("Token stored in {}.", store.name());
    Ok(())
}

async fn guided_setup(store: &dyn CredentialStore, api_url: &str) -> Result<()> {
    println!("{}", SETUP_GUIDE);
    println!("Token will be stored in {}.", store.name());
    println!("For non-interactive use: slk auth <token>");
    println!("Or set the {} environment variable.", TOKEN_ENV);
    println!();

    // line-edited with echo on: ^C returns an error here with the terminal
    // already restored
    let prompt = tokio::task::spawn_blocking(|| {
        Input::<String>::new()
            .with_prompt("Paste your xoxp- token")
            .allow_empty(true)
            .interact_text()
    });

    let entered = tokio::select! {
        _ = tokio::signal::ctrl_c() => abort(),
        joined = prompt => joined.context("token prompt failed")?,
    };
    let Some(token) = entered_token(entered) else {
        abort();
    };

    if token.is_empty() {
        bail!("no token provided");
    }
    store_token(store, api_url, &token).await
}

/// The trimmed answer, or `None` when the prompt ended without one (^C,
/// closed stdin, terminal error).
pub fn entered_token(entered: dialoguer::Result<String>) -> Option<String> {
    entered.ok().map(|token| token.trim().to_string())
}

fn abort() -> ! {
    eprintln!("\nAborted.");
    process::exit(130);
}

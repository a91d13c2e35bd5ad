use std::fmt;
use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use log::LevelFilter;

use crate::api::slack::ALL_CONVERSATION_TYPES;
use crate::notes::{DEFAULT_EMOJI, DEFAULT_SINCE};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "slk",
    author,
    version,
    about = "Read Slack channels, DMs, threads, and files from the command line",
    after_help = "Environment:\n  SLACK_TOKEN  Fallback token if the credential store is not configured"
)]
pub struct Args {
    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Log verbosity
    #[arg(short, long, value_name = "LEVEL", default_value_t = LogLevel::Warn, global = true)]
    pub log_level: LogLevel,

    /// Slack Web API base URL
    #[arg(long, env = "SLK_API_URL", default_value = "", hide = true, global = true)]
    pub api_url: String,

    #[command(subcommand)]
    pub command: Command,
}

const AUTH_HELP: &str = "\
Tokens are kept in the macOS Keychain, or in the Secret Service (secret-tool) on Linux.
Windows and other platforms have no credential store backend: set SLACK_TOKEN instead.";

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Store, show or clear the Slack API token
    #[command(after_help = AUTH_HELP)]
    Auth(AuthArgs),
    /// List channels and conversations
    Channels(ChannelsArgs),
    /// Read messages from a channel or DM
    Read(ReadArgs),
    /// Read thread replies
    Thread(ThreadArgs),
    /// Open a message permalink and show it with context
    Open(OpenArgs),
    /// Search messages across the workspace
    Search(SearchArgs),
    /// List workspace users
    Users(UsersArgs),
    /// List channel members
    Members(MembersArgs),
    /// Download a file attachment
    Download(DownloadArgs),
    /// Capture messages you reacted to as local notes
    Notes(NotesArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct AuthArgs {
    /// User OAuth token (xoxp-...); prompts when omitted and none is stored
    pub token: Option<String>,

    /// Remove the stored token
    #[arg(long, conflicts_with = "token")]
    pub clear: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ChannelsArgs {
    /// Conversation type
    #[arg(long = "type", value_name = "TYPE", default_value_t = ChannelType::All)]
    pub kind: ChannelType,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ReadArgs {
    /// Channel name, channel ID, user ID or @username
    pub target: String,

    /// Maximum number of messages to retrieve
    #[arg(long, default_value_t = 25)]
    pub limit: usize,

    /// Show messages after this time (2024-01-15, 1h, 2d)
    #[arg(long, default_value = "")]
    pub after: String,

    /// Show messages before this time
    #[arg(long, default_value = "")]
    pub before: String,

    /// Show messages around this Slack timestamp
    #[arg(long, default_value = "")]
    pub around: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ThreadArgs {
    /// Channel name, channel ID or @username
    pub channel: String,

    /// Timestamp of the thread's parent message
    pub thread_ts: String,

    /// Maximum number of replies to retrieve
    #[arg(long, default_value_t = 50)]
    pub limit: usize,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct OpenArgs {
    /// Slack message permalink
    pub permalink: String,

    /// Number of messages before the target to show for context
    #[arg(long, default_value_t = 2)]
    pub context: usize,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct SearchArgs {
    /// Search query; `from:@Display Name` is rewritten to the login name
    pub query: String,

    /// Maximum number of search results
    #[arg(long, default_value_t = 10)]
    pub limit: usize,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct UsersArgs {
    /// Case-insensitive filter on login, display or real name
    pub query: Option<String>,

    /// Show online/away presence (one API call per user)
    #[arg(long)]
    pub status: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct MembersArgs {
    /// Channel name, channel ID, user ID or @username
    pub channel: String,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct DownloadArgs {
    /// url_private or url_private_download of the file
    pub url: String,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct NotesArgs {
    /// How far back to look (1h, 2d, 7d, 30d)
    #[arg(long, default_value = DEFAULT_SINCE)]
    pub since: String,

    /// Reaction emoji marking a message as a note
    #[arg(long, default_value = DEFAULT_EMOJI)]
    pub emoji: String,

    /// Preview without saving
    #[arg(long)]
    pub dry_run: bool,

    /// Notes directory (default ~/Documents/notes/slack)
    #[arg(long, env = "SLK_NOTES_DIR", default_value = "")]
    pub dir: String,

    /// Output format: jsonl or md (default jsonl)
    #[arg(long, env = "SLK_NOTES_FORMAT", default_value = "")]
    pub format: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChannelType {
    All,
    Public,
    Private,
    Dm,
    Mpim,
}

impl ChannelType {
    /// Value of the `types` parameter of `conversations.list`.
    pub fn api_types(self) -> &'static str {
        match self {
            ChannelType::All => ALL_CONVERSATION_TYPES,
            ChannelType::Public => "public_channel",
            ChannelType::Private => "private_channel",
            ChannelType::Dm => "im",
            ChannelType::Mpim => "mpim",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelType::All => write!(f, "all"),
            ChannelType::Public => write!(f, "public"),
            ChannelType::Private => write!(f, "private"),
            ChannelType::Dm => write!(f, "dm"),
            ChannelType::Mpim => write!(f, "mpim"),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl From<LogLevel> for LevelFilter {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Off => LevelFilter::Off,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
            LogLevel::Off => write!(f, "off"),
        }
    }
}

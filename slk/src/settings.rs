use std::{
    env,
    path::{Path, PathBuf},
};

use config::{Config, File};
use log::debug;
use serde::Deserialize;

use crate::cli::{Args, Command};
use crate::notes::{DEFAULT_EMOJI, DEFAULT_SINCE};

/// Optional values read from `config.toml`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    pub api_url: Option<String>,
    pub notes_dir: Option<String>,
    pub notes_format: Option<String>,
    pub notes_emoji: Option<String>,
    pub notes_since: Option<String>,
}

const CONFIG_FILE_NAME: &str = env!("CARGO_PKG_NAME");

fn get_xdg_config_path() -> Option<PathBuf> {
    if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config));
    }

    if let Ok(home) = env::var("HOME") {
        return Some(PathBuf::from(home).join(".config"));
    }

    None
}

/// `$XDG_CONFIG_HOME/slk/config.toml`, falling back to `~/.config`.
pub fn config_file_path() -> Option<PathBuf> {
    get_xdg_config_path().map(|dir| dir.join(CONFIG_FILE_NAME).join("config.toml"))
}

pub fn load_settings(config_path: &Path) -> anyhow::Result<Settings> {
    if !config_path.exists() {
        return Ok(Settings::default());
    }
    Config::builder()
        .add_source(File::from(config_path.to_path_buf()).required(false))
        .build()?
        .try_deserialize()
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to deserialize config file {}: {}",
                config_path.display(),
                e
            )
        })
}

pub fn merge_settings_with_args(args: &Args) -> anyhow::Result<Args> {
    let settings = match config_file_path() {
        Some(path) => load_settings(&path)?,
        None => Settings::default(),
    };
    Ok(apply_settings(args, settings))
}

/// Fills in whatever the command line and environment left unset.
pub fn apply_settings(args: &Args, settings: Settings) -> Args {
    let mut new_args = args.clone();

    macro_rules! apply_if_empty {
        ($target:expr, $config:expr) => {
            if let Some(value) = $config {
                if $target.is_empty() {
                    $target = value;
                }
            }
        };
    }

    macro_rules! apply_if_default {
        ($target:expr, $config:expr, $default:expr) => {
            if let Some(value) = $config {
                if !value.is_empty() && $target == $default {
                    $target = value;
                }
            }
        };
    }

    apply_if_empty!(new_args.api_url, settings.api_url);

    if let Command::Notes(notes) = &mut new_args.command {
        apply_if_empty!(notes.dir, settings.notes_dir);
        apply_if_empty!(notes.format, settings.notes_format);
        apply_if_default!(notes.emoji, settings.notes_emoji, DEFAULT_EMOJI);
        apply_if_default!(notes.since, settings.notes_since, DEFAULT_SINCE);
    }

    debug!("merged config: {:?}", new_args);

    new_args
}

pub mod api;
pub mod cli;
pub mod credentials;
pub mod error;
pub mod format;
pub mod history;
pub mod identity;
pub mod models;
pub mod notes;
pub mod resolve;
pub mod services;
pub mod settings;
pub mod timearg;

pub use error::{Result, SlackError};

//! User ID to display-name mapping for one client session.

use log::warn;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use crate::models::User;

/// Anything that can turn a user ID into something printable.
pub trait NameResolver {
    fn resolve_user(&self, user_id: &str) -> String;
}

impl<F> NameResolver for F
where
    F: Fn(&str) -> String,
{
    fn resolve_user(&self, user_id: &str) -> String {
        self(user_id)
    }
}

#[derive(Debug, Default)]
pub struct IdentityCache {
    names: HashMap<String, String>,
    users: Vec<User>,
    built: bool,
    warned: RefCell<HashSet<String>>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache that is already built from `users`.
    pub fn from_users(users: Vec<User>) -> Self {
        let mut cache = Self::new();
        cache.populate(users);
        cache
    }

    /// Fills the cache from a complete user listing. Has no effect once built.
    pub fn populate(&mut self, users: Vec<User>) {
        if self.built {
            return;
        }
        self.names = users
            .iter()
            .map(|u| (u.id.clone(), u.display_name().to_string()))
            .collect();
        self.users = users;
        self.built = true;
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    // a cache built from an empty listing behaves as unbuilt
    fn has_names(&self) -> bool {
        self.built && !self.names.is_empty()
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn names(&self) -> &HashMap<String, String> {
        &self.names
    }

    /// Case-insensitive match on display name, login name or real name.
    pub fn find_user(&self, query: &str) -> Option<&User> {
        let query = query.to_lowercase();
        self.users.iter().find(|u| {
            u.profile.display_name.to_lowercase() == query
                || u.name.to_lowercase() == query
                || u.real_name.to_lowercase() == query
        })
    }

    /// Maps a display name to the login name search queries expect.
    pub fn resolve_display_name_to_username(&self, display_name: &str) -> String {
        if !self.has_names() {
            return display_name.to_string();
        }
        match self.find_user(display_name) {
            Some(user) => user.name.clone(),
            None => {
                warn!(
                    "could not resolve display name {:?} to username",
                    display_name
                );
                display_name.to_string()
            }
        }
    }

    /// Number of distinct unknown IDs reported so far.
    pub fn warnings_emitted(&self) -> usize {
        self.warned.borrow().len()
    }
}

impl NameResolver for IdentityCache {
    fn resolve_user(&self, user_id: &str) -> String {
        if let Some(name) = self.names.get(user_id) {
            return name.clone();
        }
        if self.has_names()
            && !user_id.is_empty()
            && self.warned.borrow_mut().insert(user_id.to_string())
        {
            warn!("unknown user ID {:?} not in cache", user_id);
        }
        user_id.to_string()
    }
}

//! User-to-role lookup
//!
//! The permission service only needs to know which role a user holds. The
//! identity subsystem implements [`UserProvider`]; [`StaticUserProvider`] is
//! an in-memory implementation for tests and tooling.

use parking_lot::RwLock;
use std::collections::HashMap;

/// Maps a user identifier to a role name
pub trait UserProvider: Send + Sync {
    /// Role for `user_id`, or `None` if the user is unknown
    fn role_of(&self, user_id: &str) -> Option<String>;
}

/// In-memory user -> role table
#[derive(Debug, Default)]
pub struct StaticUserProvider {
    roles: RwLock<HashMap<String, String>>,
}

impl StaticUserProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style assignment
    pub fn with_user(self, user_id: impl Into<String>, role: impl Into<String>) -> Self {
        self.set_role(user_id, role);
        self
    }

    pub fn set_role(&self, user_id: impl Into<String>, role: impl Into<String>) {
        self.roles.write().insert(user_id.into(), role.into());
    }

    pub fn remove_user(&self, user_id: &str) -> Option<String> {
        self.roles.write().remove(user_id)
    }
}

impl UserProvider for StaticUserProvider {
    fn role_of(&self, user_id: &str) -> Option<String> {
        self.roles.read().get(user_id).cloned()
    }
}

impl<F> UserProvider for F
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn role_of(&self, user_id: &str) -> Option<String> {
        self(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_provider() {
        let provider = StaticUserProvider::new()
            .with_user("alice", "admin")
            .with_user("bob", "user");

        assert_eq!(provider.role_of("alice").as_deref(), Some("admin"));
        assert_eq!(provider.role_of("carol"), None);

        provider.set_role("bob", "premium");
        assert_eq!(provider.role_of("bob").as_deref(), Some("premium"));

        assert_eq!(provider.remove_user("bob").as_deref(), Some("premium"));
        assert_eq!(provider.role_of("bob"), None);
    }

    #[test]
    fn test_closure_provider() {
        let provider = |user_id: &str| (user_id == "root").then(|| "admin".to_string());
        assert_eq!(provider.role_of("root").as_deref(), Some("admin"));
        assert_eq!(provider.role_of("nobody"), None);
    }
}

use std::collections::HashSet;

use async_trait::async_trait;
use orgaccess_application::GlobalAdminCheck;
use orgaccess_core::{AppResult, UserId};

/// Global admin capability backed by an injected allow-list of user ids.
#[derive(Debug, Clone, Default)]
pub struct StaticGlobalAdminCheck {
    admin_user_ids: HashSet<UserId>,
}

impl StaticGlobalAdminCheck {
    /// Creates a check granting the capability to exactly the given users.
    #[must_use]
    pub fn new(admin_user_ids: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            admin_user_ids: admin_user_ids.into_iter().collect(),
        }
    }

    /// Parses a comma-separated list of user ids. Blank entries are ignored.
    pub fn from_comma_separated(value: &str) -> AppResult<Self> {
        let admin_user_ids = value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(UserId::new)
            .collect::<AppResult<HashSet<_>>>()?;

        Ok(Self { admin_user_ids })
    }

    /// Returns the number of configured global admins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.admin_user_ids.len()
    }

    /// Returns whether no global admin is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.admin_user_ids.is_empty()
    }
}

#[async_trait]
impl GlobalAdminCheck for StaticGlobalAdminCheck {
    async fn is_global_admin(&self, user_id: &UserId) -> AppResult<bool> {
        Ok(self.admin_user_ids.contains(user_id))
    }
}

#[cfg(test)]
mod tests {
    use orgaccess_application::GlobalAdminCheck;
    use orgaccess_core::UserId;

    use super::StaticGlobalAdminCheck;

    fn user(value: &str) -> UserId {
        UserId::new(value).unwrap_or_else(|_| unreachable!())
    }

    #[tokio::test]
    async fn only_listed_users_are_global_admins() {
        let check = StaticGlobalAdminCheck::new([user("root")]);

        assert!(matches!(check.is_global_admin(&user("root")).await, Ok(true)));
        assert!(matches!(check.is_global_admin(&user("alice")).await, Ok(false)));
    }

    #[test]
    fn parses_comma_separated_list() {
        let check = StaticGlobalAdminCheck::from_comma_separated(" root, ops ,,root ");
        assert_eq!(check.map(|check| check.len()).unwrap_or_default(), 2);

        let empty = StaticGlobalAdminCheck::from_comma_separated("");
        assert!(empty.is_ok_and(|check| check.is_empty()));
    }
}

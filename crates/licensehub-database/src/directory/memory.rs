//! In-memory directory, populated by the caller.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use licensehub_core::result::AppResult;
use licensehub_core::types::{GroupId, UserId};
use licensehub_entity::directory::{DirectoryGroup, DirectoryUser};

use super::Directory;

/// Directory backed by concurrent maps.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    users: Arc<DashMap<UserId, DirectoryUser>>,
    groups: Arc<DashMap<GroupId, DirectoryGroup>>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an active user and return its id.
    pub fn add_user(&self, username: impl Into<String>) -> UserId {
        let id = UserId::new();
        self.users.insert(
            id,
            DirectoryUser {
                id,
                username: username.into(),
                active: true,
            },
        );
        id
    }

    /// Register an active group and return its id.
    pub fn add_group(&self, name: impl Into<String>) -> GroupId {
        let id = GroupId::new();
        self.groups.insert(
            id,
            DirectoryGroup {
                id,
                name: name.into(),
                active: true,
            },
        );
        id
    }

    /// Flip a user's active flag. Returns `false` if the user is unknown.
    pub fn set_user_active(&self, id: UserId, active: bool) -> bool {
        match self.users.get_mut(&id) {
            Some(mut user) => {
                user.active = active;
                true
            }
            None => false,
        }
    }

    /// Flip a group's active flag. Returns `false` if the group is unknown.
    pub fn set_group_active(&self, id: GroupId, active: bool) -> bool {
        match self.groups.get_mut(&id) {
            Some(mut group) => {
                group.active = active;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn find_user(&self, id: UserId) -> AppResult<Option<DirectoryUser>> {
        Ok(self.users.get(&id).map(|user| user.clone()))
    }

    async fn find_group(&self, id: GroupId) -> AppResult<Option<DirectoryGroup>> {
        Ok(self.groups.get(&id).map(|group| group.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deactivated_user_is_still_found() {
        let directory = MemoryDirectory::new();
        let alice = directory.add_user("alice");
        assert!(directory.set_user_active(alice, false));

        let user = directory.find_user(alice).await.unwrap().unwrap();
        assert_eq!(user.username, "alice");
        assert!(!user.active);
        assert!(!directory.set_user_active(UserId::new(), false));
    }

    #[tokio::test]
    async fn test_unknown_group_is_none() {
        let directory = MemoryDirectory::new();
        directory.add_group("engineering");
        assert!(directory.find_group(GroupId::new()).await.unwrap().is_none());
    }
}

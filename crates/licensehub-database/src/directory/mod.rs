//! Read-only view of users and groups.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use licensehub_core::result::AppResult;
use licensehub_core::types::{GroupId, UserId};
use licensehub_entity::directory::{DirectoryGroup, DirectoryUser};

pub use memory::MemoryDirectory;
pub use postgres::PgDirectory;

/// Lookup of the principals that can hold seats.
#[async_trait]
pub trait Directory: Send + Sync + std::fmt::Debug {
    /// Find a user by id.
    async fn find_user(&self, id: UserId) -> AppResult<Option<DirectoryUser>>;

    /// Find a group by id.
    async fn find_group(&self, id: GroupId) -> AppResult<Option<DirectoryGroup>>;
}

//! User store port.

use async_trait::async_trait;

use crate::user::User;
use crate::user::error::Result;

/// Persistence contract for [`User`] records.
///
/// Every mutation is a single atomic write. Dropping a returned future
/// before it resolves leaves the record untouched.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new user and return it with its identifier assigned.
    ///
    /// The incoming `id` is ignored.
    async fn create(&self, user: User) -> Result<User>;

    /// Find a user by identifier.
    ///
    /// Fails with `NotFound` when absent or malformed, `DisabledUser` when
    /// soft-deleted.
    async fn get_by_id(&self, id: &str) -> Result<User>;

    /// Find a user by email, with the same semantics as
    /// [`UserStore::get_by_id`].
    async fn get_by_email(&self, email: &str) -> Result<User>;

    /// Overwrite every mutable field of an enabled user.
    ///
    /// Identifier, `enabled`, tokens and `created_at` are kept.
    async fn update(&self, user: User) -> Result<User>;

    /// Overwrite only the token fields and `updated_at`.
    async fn update_token(&self, user: User) -> Result<User>;

    /// Mark a user as disabled. Repeating it is not an error.
    async fn soft_delete(&self, id: &str) -> Result<()>;

    /// Physically remove a user, enabled or not.
    ///
    /// Fails with `NothingDeleted` when no record matched.
    async fn hard_delete(&self, id: &str) -> Result<()>;

    /// Check the backend is reachable.
    async fn ping(&self) -> Result<()>;
}

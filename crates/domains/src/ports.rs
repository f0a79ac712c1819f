//! # Core Traits (Ports)
//!
//! Any storage or identity adapter must implement these traits to be wired
//! into the engine. Every write must be atomic per record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::{Result, StoreError};
use crate::models::{Category, NewUser, Post, Role, Topic, User};

/// Result type returned by store adapters.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Categories are provisioned out-of-band and otherwise read-only.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
    async fn get_category(&self, id: Uuid) -> StoreResult<Option<Category>>;
    async fn create_category(&self, category: Category) -> StoreResult<Category>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait TopicRepository: Send + Sync {
    async fn create_topic(&self, topic: Topic) -> StoreResult<Topic>;
    async fn get_topic(&self, id: Uuid) -> StoreResult<Option<Topic>>;
    /// Topics of one category, pinned first then newest first.
    async fn list_topics_by_category(&self, category_id: Uuid) -> StoreResult<Vec<Topic>>;
    async fn count_topics_by_category(&self, category_id: Uuid) -> StoreResult<u64>;

    /// Single-field writes; `NotFound` when the topic does not exist.
    async fn set_pinned(&self, id: Uuid, pinned: bool, at: DateTime<Utc>) -> StoreResult<()>;
    async fn set_locked(&self, id: Uuid, locked: bool, at: DateTime<Utc>) -> StoreResult<()>;

    /// Atomically adds one to the view counter and returns the new value.
    /// Must never be implemented as read-then-write.
    async fn increment_views(&self, id: Uuid) -> StoreResult<i64>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create_post(&self, post: Post) -> StoreResult<Post>;
    /// Posts of one topic, oldest first.
    async fn list_posts(&self, topic_id: Uuid) -> StoreResult<Vec<Post>>;
    async fn count_posts_by_topic(&self, topic_id: Uuid) -> StoreResult<u64>;
    async fn count_posts_by_category(&self, category_id: Uuid) -> StoreResult<u64>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persists a profile, assigning the next `display_id`. `Conflict` on duplicate id.
    async fn create_user(&self, user: NewUser) -> StoreResult<User>;
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn get_user_by_display_id(&self, display_id: i64) -> StoreResult<Option<User>>;
    /// All users, newest first.
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn find_by_role(&self, role: Role) -> StoreResult<Vec<User>>;
    /// Single-field write; `NotFound` when the user does not exist.
    async fn update_role(&self, id: Uuid, role: Role, at: DateTime<Utc>) -> StoreResult<User>;
}

/// The resolved caller of an engine operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    Authenticated(User),
}

impl Caller {
    pub fn role(&self) -> Option<Role> {
        match self {
            Caller::Anonymous => None,
            Caller::Authenticated(user) => Some(user.role),
        }
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Caller::Anonymous => None,
            Caller::Authenticated(user) => Some(user),
        }
    }
}

/// Identity Context: turns an opaque caller token into a `Caller`.
///
/// Unresolvable tokens yield `Caller::Anonymous`; only infrastructure
/// failures are errors.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Caller>;
}

//! # Domain Models
//!
//! These structs represent the core entities of the forum.
//! Identifiers are UUID v7 so that ids sort roughly by creation time.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

/// Display name shown in place of an author record that no longer resolves.
pub const TOMBSTONE_DISPLAY_NAME: &str = "Deleted user";

/// The closed set of roles. Variant order is privilege order:
/// `User < Moderator < Admin < Owner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Moderator,
    Admin,
    Owner,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::User, Role::Moderator, Role::Admin, Role::Owner];

    /// Wire name, as stored and accepted by `FromStr`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Moderator => "moderator",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }

    /// Human-readable label for profile badges and the admin user list.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Moderator => "Moderator",
            Role::Admin => "Administrator",
            Role::Owner => "Owner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Role::User),
            "moderator" => Ok(Role::Moderator),
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            other => Err(DomainError::InvalidInput(format!("unknown role '{other}'"))),
        }
    }
}

/// A forum member's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    /// Public numeric handle, assigned by the store at creation and never changed.
    pub display_id: i64,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Stand-in for an author whose profile is gone.
    pub fn tombstone(id: Uuid) -> Self {
        let epoch = DateTime::<Utc>::UNIX_EPOCH;
        Self {
            id,
            display_name: TOMBSTONE_DISPLAY_NAME.to_string(),
            display_id: 0,
            role: Role::User,
            created_at: epoch,
            updated_at: epoch,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.display_id == 0
    }
}

/// Input for creating a profile. The store assigns `display_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub id: Uuid,
    pub display_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// A top-level section of the forum. Provisioned by operators, read-only otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Single glyph shown next to the name (usually an emoji)
    pub icon: String,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

/// A category together with its derived aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub category: Category,
    pub topic_count: u64,
    pub post_count: u64,
}

/// A discussion started inside a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub category_id: Uuid,
    pub author_id: Uuid,
    pub pinned: bool,
    pub locked: bool,
    /// Only ever grows, one per read.
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A reply inside a topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One row of a category's topic listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicSummary {
    pub topic: Topic,
    pub author: User,
    /// Derived from the posts table on every listing, never stored.
    pub post_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostView {
    pub post: Post,
    pub author: User,
}

/// Everything needed to render an opened topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicDetail {
    pub topic: Topic,
    pub author: User,
    pub posts: Vec<PostView>,
}

// Ids are UUID v7, so comparing them breaks timestamp ties in creation order
// and keeps every listing deterministic.

/// Categories sort by position, ties broken by creation order.
pub fn category_order(a: &Category, b: &Category) -> Ordering {
    a.position
        .cmp(&b.position)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Pinned topics first, then newest first within each group.
pub fn topic_listing_order(a: &Topic, b: &Topic) -> Ordering {
    b.pinned
        .cmp(&a.pinned)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| b.id.cmp(&a.id))
}

/// Replies oldest first.
pub fn post_order(a: &Post, b: &Post) -> Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

/// Newest members first.
pub fn user_listing_order(a: &User, b: &User) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// Parses an externally supplied identifier.
pub fn parse_id(entity: &'static str, raw: &str) -> Result<Uuid, DomainError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| DomainError::InvalidInput(format!("malformed {entity} id '{raw}'")))
}

//! # Forum Engine
//!
//! Orchestrates every caller-facing operation: consult the Role Policy with
//! the caller's resolved identity, then talk to the store, then return a
//! typed result. The engine is stateless between calls and holds no locks.

mod catalog;
mod members;
mod moderation;
mod topics;

use std::collections::HashMap;
use std::sync::Arc;

use domains::{
    decide, Action, CategoryRepository, Caller, Decision, DomainError, PolicyContext,
    PostRepository, Result, TopicRepository, User, UserRepository,
};
use uuid::Uuid;

/// The store adapters the engine talks to.
#[derive(Clone)]
pub struct Ports {
    pub categories: Arc<dyn CategoryRepository>,
    pub topics: Arc<dyn TopicRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Ports {
    /// Wires all four ports to one adapter that implements them all.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: CategoryRepository + TopicRepository + PostRepository + UserRepository + 'static,
    {
        Self {
            categories: store.clone(),
            topics: store.clone(),
            posts: store.clone(),
            users: store,
        }
    }
}

#[derive(Clone)]
pub struct ForumService {
    ports: Ports,
}

impl ForumService {
    pub fn new(ports: Ports) -> Self {
        Self { ports }
    }

    /// Resolves a topic or fails with `NotFound`.
    async fn require_topic(&self, id: Uuid) -> Result<domains::Topic> {
        self.ports
            .topics
            .get_topic(id)
            .await?
            .ok_or_else(|| DomainError::not_found("topic", id))
    }

    /// Looks up authors, substituting a tombstone for missing profiles.
    async fn authors(&self, ids: impl IntoIterator<Item = Uuid>) -> Result<HashMap<Uuid, User>> {
        let mut found = HashMap::new();
        for id in ids {
            if found.contains_key(&id) {
                continue;
            }
            let user = self
                .ports
                .users
                .get_user(id)
                .await?
                .unwrap_or_else(|| User::tombstone(id));
            found.insert(id, user);
        }
        Ok(found)
    }
}

/// Requires a resolved identity before anything else is looked at.
pub(crate) fn authenticated(caller: &Caller) -> Result<&User> {
    caller
        .user()
        .ok_or_else(|| DomainError::Unauthorized("authentication required".into()))
}

/// Applies the Role Policy; a denial ends the operation.
pub(crate) fn authorize(caller: &Caller, action: Action, ctx: &PolicyContext) -> Result<()> {
    match decide(caller.role(), action, ctx) {
        Decision::Allow => Ok(()),
        Decision::Deny(denial) => {
            tracing::warn!(
                ?action,
                ?denial,
                caller = ?caller.user().map(|u| u.id),
                "policy denied"
            );
            if denial.is_conflict() {
                Err(DomainError::Conflict(denial.reason().into()))
            } else {
                Err(DomainError::Unauthorized(denial.reason().into()))
            }
        }
    }
}

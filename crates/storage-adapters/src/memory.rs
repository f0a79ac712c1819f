//! # In-memory store
//!
//! `DashMap`-backed implementation of every store port. Used by tests and
//! by single-process deployments that do not need durability.
//!
//! Each record lives in one map entry, so every write is atomic per record.
//! The view counter is bumped while holding the entry's shard lock.
//! The single owner is tracked in its own slot, always locked before the
//! user table, so two owners can never be written concurrently.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::{
    category_order, post_order, topic_listing_order, user_listing_order, Category,
    CategoryRepository, NewUser, Post, PostRepository, Role, StoreError, StoreResult, Topic,
    TopicRepository, User, UserRepository,
};
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryForumStore {
    categories: DashMap<Uuid, Category>,
    topics: DashMap<Uuid, Topic>,
    posts: DashMap<Uuid, Post>,
    users: DashMap<Uuid, User>,
    /// Last handed-out display id.
    display_seq: AtomicI64,
    /// Id of the user holding `Role::Owner`, if any.
    owner: Mutex<Option<Uuid>>,
    offline: AtomicBool,
}

impl InMemoryForumStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with `Unavailable` until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Removes a profile, leaving authored content in place.
    pub fn remove_user(&self, id: Uuid) -> Option<User> {
        let mut owner = self.owner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *owner == Some(id) {
            *owner = None;
        }
        self.users.remove(&id).map(|(_, user)| user)
    }

    fn owner_slot(&self) -> StoreResult<MutexGuard<'_, Option<Uuid>>> {
        self.owner
            .lock()
            .map_err(|_| StoreError::Unavailable("owner slot poisoned".into()))
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store is offline".into()));
        }
        Ok(())
    }

    fn topic_ids_in(&self, category_id: Uuid) -> Vec<Uuid> {
        self.topics
            .iter()
            .filter(|t| t.category_id == category_id)
            .map(|t| t.id)
            .collect()
    }
}

#[async_trait]
impl CategoryRepository for InMemoryForumStore {
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        self.check_online()?;
        let mut categories: Vec<Category> =
            self.categories.iter().map(|c| c.value().clone()).collect();
        categories.sort_by(category_order);
        Ok(categories)
    }

    async fn get_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        self.check_online()?;
        Ok(self.categories.get(&id).map(|c| c.value().clone()))
    }

    async fn create_category(&self, category: Category) -> StoreResult<Category> {
        self.check_online()?;
        match self.categories.entry(category.id) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "category {} already exists",
                category.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(category.clone());
                Ok(category)
            }
        }
    }
}

#[async_trait]
impl TopicRepository for InMemoryForumStore {
    async fn create_topic(&self, topic: Topic) -> StoreResult<Topic> {
        self.check_online()?;
        if !self.categories.contains_key(&topic.category_id) {
            return Err(StoreError::not_found("category", topic.category_id));
        }
        match self.topics.entry(topic.id) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "topic {} already exists",
                topic.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(topic.clone());
                Ok(topic)
            }
        }
    }

    async fn get_topic(&self, id: Uuid) -> StoreResult<Option<Topic>> {
        self.check_online()?;
        Ok(self.topics.get(&id).map(|t| t.value().clone()))
    }

    async fn list_topics_by_category(&self, category_id: Uuid) -> StoreResult<Vec<Topic>> {
        self.check_online()?;
        let mut topics: Vec<Topic> = self
            .topics
            .iter()
            .filter(|t| t.category_id == category_id)
            .map(|t| t.value().clone())
            .collect();
        topics.sort_by(topic_listing_order);
        Ok(topics)
    }

    async fn count_topics_by_category(&self, category_id: Uuid) -> StoreResult<u64> {
        self.check_online()?;
        Ok(self
            .topics
            .iter()
            .filter(|t| t.category_id == category_id)
            .count() as u64)
    }

    async fn set_pinned(&self, id: Uuid, pinned: bool, at: DateTime<Utc>) -> StoreResult<()> {
        self.check_online()?;
        let mut topic = self
            .topics
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("topic", id))?;
        topic.pinned = pinned;
        topic.updated_at = at;
        Ok(())
    }

    async fn set_locked(&self, id: Uuid, locked: bool, at: DateTime<Utc>) -> StoreResult<()> {
        self.check_online()?;
        let mut topic = self
            .topics
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("topic", id))?;
        topic.locked = locked;
        topic.updated_at = at;
        Ok(())
    }

    async fn increment_views(&self, id: Uuid) -> StoreResult<i64> {
        self.check_online()?;
        let mut topic = self
            .topics
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("topic", id))?;
        topic.views += 1;
        Ok(topic.views)
    }
}

#[async_trait]
impl PostRepository for InMemoryForumStore {
    async fn create_post(&self, post: Post) -> StoreResult<Post> {
        self.check_online()?;
        if !self.topics.contains_key(&post.topic_id) {
            return Err(StoreError::not_found("topic", post.topic_id));
        }
        match self.posts.entry(post.id) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "post {} already exists",
                post.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(post.clone());
                Ok(post)
            }
        }
    }

    async fn list_posts(&self, topic_id: Uuid) -> StoreResult<Vec<Post>> {
        self.check_online()?;
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|p| p.topic_id == topic_id)
            .map(|p| p.value().clone())
            .collect();
        posts.sort_by(post_order);
        Ok(posts)
    }

    async fn count_posts_by_topic(&self, topic_id: Uuid) -> StoreResult<u64> {
        self.check_online()?;
        Ok(self.posts.iter().filter(|p| p.topic_id == topic_id).count() as u64)
    }

    async fn count_posts_by_category(&self, category_id: Uuid) -> StoreResult<u64> {
        self.check_online()?;
        let topic_ids = self.topic_ids_in(category_id);
        Ok(self
            .posts
            .iter()
            .filter(|p| topic_ids.contains(&p.topic_id))
            .count() as u64)
    }
}

#[async_trait]
impl UserRepository for InMemoryForumStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        self.check_online()?;
        let mut owner = self.owner_slot()?;
        match self.users.entry(user.id) {
            Entry::Occupied(_) => Err(StoreError::Conflict(format!(
                "user {} already exists",
                user.id
            ))),
            Entry::Vacant(_) if user.role == Role::Owner && owner.is_some() => Err(
                StoreError::Conflict("the deployment already has an owner".into()),
            ),
            Entry::Vacant(slot) => {
                let display_id = self.display_seq.fetch_add(1, Ordering::SeqCst) + 1;
                let created = User {
                    id: user.id,
                    display_name: user.display_name,
                    display_id,
                    role: user.role,
                    created_at: user.created_at,
                    updated_at: user.created_at,
                };
                if created.role == Role::Owner {
                    *owner = Some(created.id);
                }
                slot.insert(created.clone());
                Ok(created)
            }
        }
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.check_online()?;
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn get_user_by_display_id(&self, display_id: i64) -> StoreResult<Option<User>> {
        self.check_online()?;
        Ok(self
            .users
            .iter()
            .find(|u| u.display_id == display_id)
            .map(|u| u.value().clone()))
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.check_online()?;
        let mut users: Vec<User> = self.users.iter().map(|u| u.value().clone()).collect();
        users.sort_by(user_listing_order);
        Ok(users)
    }

    async fn find_by_role(&self, role: Role) -> StoreResult<Vec<User>> {
        self.check_online()?;
        Ok(self
            .users
            .iter()
            .filter(|u| u.role == role)
            .map(|u| u.value().clone())
            .collect())
    }

    async fn update_role(&self, id: Uuid, role: Role, at: DateTime<Utc>) -> StoreResult<User> {
        self.check_online()?;
        let mut owner = self.owner_slot()?;
        if role == Role::Owner && owner.is_some_and(|current| current != id) {
            return Err(StoreError::Conflict(
                "the deployment already has an owner".into(),
            ));
        }
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("user", id))?;
        if role == Role::Owner {
            *owner = Some(id);
        } else if *owner == Some(id) {
            *owner = None;
        }
        user.role = role;
        user.updated_at = at;
        Ok(user.value().clone())
    }
}

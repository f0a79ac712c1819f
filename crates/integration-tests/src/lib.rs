//! Shared fixtures for the cross-crate tests: a wired engine over a real
//! store plus helpers to seed members and categories directly.

use std::sync::Arc;

use chrono::{Duration, Utc};
use domains::{
    Caller, Category, CategoryRepository, NewUser, PostRepository, Role, Topic, TopicRepository,
    User, UserRepository,
};
use services::{ForumService, Ports};
use storage_adapters::{InMemoryForumStore, SqliteForumStore};
use uuid::Uuid;

pub struct Forum<S> {
    pub store: Arc<S>,
    pub service: ForumService,
}

impl Forum<InMemoryForumStore> {
    pub fn in_memory() -> Self {
        Self::over(Arc::new(InMemoryForumStore::new()))
    }
}

impl Forum<SqliteForumStore> {
    pub async fn sqlite() -> Self {
        let store = SqliteForumStore::in_memory()
            .await
            .expect("in-memory sqlite should open");
        Self::over(Arc::new(store))
    }
}

impl<S> Forum<S>
where
    S: CategoryRepository + TopicRepository + PostRepository + UserRepository + 'static,
{
    pub fn over(store: Arc<S>) -> Self {
        let service = ForumService::new(Ports::from_store(store.clone()));
        Self { store, service }
    }

    /// Creates a member with `role` straight in the store.
    pub async fn member(&self, name: &str, role: Role) -> User {
        self.store
            .create_user(NewUser {
                id: Uuid::now_v7(),
                display_name: name.to_string(),
                role,
                created_at: Utc::now(),
            })
            .await
            .expect("member should be created")
    }

    pub async fn caller(&self, role: Role) -> Caller {
        Caller::Authenticated(self.member(&format!("{role}-caller"), role).await)
    }

    pub async fn category(&self, name: &str, position: i32) -> Category {
        self.store
            .create_category(Category {
                id: Uuid::now_v7(),
                name: name.to_string(),
                description: format!("{name} discussions"),
                icon: "💬".to_string(),
                position,
                created_at: Utc::now(),
            })
            .await
            .expect("category should be created")
    }

    /// Inserts a topic with a controlled age, bypassing the engine.
    pub async fn aged_topic(
        &self,
        category_id: Uuid,
        author_id: Uuid,
        pinned: bool,
        age_minutes: i64,
    ) -> Topic {
        let created = Utc::now() - Duration::minutes(age_minutes);
        self.store
            .create_topic(Topic {
                id: Uuid::now_v7(),
                title: format!("{age_minutes} minutes old"),
                content: "seeded".to_string(),
                category_id,
                author_id,
                pinned,
                locked: false,
                views: 0,
                created_at: created,
                updated_at: created,
            })
            .await
            .expect("topic should be created")
    }
}

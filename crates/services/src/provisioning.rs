//! # Provisioning
//!
//! Operator-only setup that runs outside the Role Policy: seeding categories
//! and installing the single owner. Used by the `seed` binary, never by
//! request handlers.

use std::sync::Arc;

use chrono::Utc;
use domains::{
    Category, CategoryRepository, DomainError, NewUser, Result, Role, User, UserRepository,
};
use tracing::instrument;
use uuid::Uuid;

use crate::validation::{required_text, MAX_DISPLAY_NAME_CHARS, MAX_TITLE_CHARS};

/// Category definition as an operator writes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySpec {
    pub name: String,
    pub description: String,
    pub icon: String,
    pub position: i32,
}

pub struct ProvisioningService {
    categories: Arc<dyn CategoryRepository>,
    users: Arc<dyn UserRepository>,
}

impl ProvisioningService {
    pub fn new(categories: Arc<dyn CategoryRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { categories, users }
    }

    /// Creates a category unless one with the same name already exists.
    #[instrument(skip(self, spec), fields(name = %spec.name))]
    pub async fn provision_category(&self, spec: CategorySpec) -> Result<Category> {
        let name = required_text("category name", &spec.name, MAX_TITLE_CHARS)?;
        let existing = self.categories.list_categories().await?;
        if let Some(found) = existing.into_iter().find(|c| c.name == name) {
            tracing::debug!(category_id = %found.id, "category already provisioned");
            return Ok(found);
        }

        let category = self
            .categories
            .create_category(Category {
                id: Uuid::now_v7(),
                name,
                description: spec.description.trim().to_string(),
                icon: spec.icon.trim().to_string(),
                position: spec.position,
                created_at: Utc::now(),
            })
            .await?;
        tracing::info!(category_id = %category.id, "category provisioned");
        Ok(category)
    }

    /// Installs the deployment's single owner.
    ///
    /// Re-running with the current owner's id is a no-op; any other id is a
    /// `Conflict` once an owner exists.
    #[instrument(skip(self, display_name))]
    pub async fn provision_owner(&self, user_id: Uuid, display_name: &str) -> Result<User> {
        let display_name = required_text("display name", display_name, MAX_DISPLAY_NAME_CHARS)?;

        let owners = self.users.find_by_role(Role::Owner).await?;
        if let Some(owner) = owners.into_iter().next() {
            if owner.id == user_id {
                tracing::debug!("owner already provisioned");
                return Ok(owner);
            }
            return Err(DomainError::Conflict(format!(
                "deployment already has an owner (display id {})",
                owner.display_id
            )));
        }

        if self.users.get_user(user_id).await?.is_some() {
            return Err(DomainError::Conflict(
                "an existing member cannot be turned into the owner".into(),
            ));
        }

        let owner = self
            .users
            .create_user(NewUser {
                id: user_id,
                display_name,
                role: Role::Owner,
                created_at: Utc::now(),
            })
            .await?;
        tracing::info!(display_id = owner.display_id, "owner provisioned");
        Ok(owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{MockCategoryRepository, MockUserRepository};

    fn member(role: Role) -> User {
        let now = Utc::now();
        User {
            id: Uuid::now_v7(),
            display_name: "root".into(),
            display_id: 1,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    fn service(categories: MockCategoryRepository, users: MockUserRepository) -> ProvisioningService {
        ProvisioningService::new(Arc::new(categories), Arc::new(users))
    }

    #[tokio::test]
    async fn second_owner_is_refused() {
        let existing = member(Role::Owner);
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_role()
            .returning(move |_| Ok(vec![existing.clone()]));
        users.expect_create_user().never();

        let err = service(MockCategoryRepository::new(), users)
            .provision_owner(Uuid::now_v7(), "usurper")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn reprovisioning_same_owner_is_a_noop() {
        let existing = member(Role::Owner);
        let id = existing.id;
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_role()
            .returning(move |_| Ok(vec![existing.clone()]));
        users.expect_create_user().never();

        let owner = service(MockCategoryRepository::new(), users)
            .provision_owner(id, "root")
            .await
            .unwrap();
        assert_eq!(owner.id, id);
    }

    #[tokio::test]
    async fn first_owner_is_created_with_owner_role() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_role().returning(|_| Ok(vec![]));
        users.expect_get_user().returning(|_| Ok(None));
        users.expect_create_user().times(1).returning(|new| {
            assert_eq!(new.role, Role::Owner);
            Ok(User {
                id: new.id,
                display_name: new.display_name,
                display_id: 1,
                role: new.role,
                created_at: new.created_at,
                updated_at: new.created_at,
            })
        });

        let owner = service(MockCategoryRepository::new(), users)
            .provision_owner(Uuid::now_v7(), " root ")
            .await
            .unwrap();
        assert_eq!(owner.role, Role::Owner);
        assert_eq!(owner.display_name, "root");
    }

    #[tokio::test]
    async fn categories_are_provisioned_once_by_name() {
        let mut categories = MockCategoryRepository::new();
        let existing = Category {
            id: Uuid::now_v7(),
            name: "News".into(),
            description: String::new(),
            icon: "📰".into(),
            position: 0,
            created_at: Utc::now(),
        };
        let existing_id = existing.id;
        categories
            .expect_list_categories()
            .returning(move || Ok(vec![existing.clone()]));
        categories
            .expect_create_category()
            .times(1)
            .returning(|c| Ok(c));
        let svc = service(categories, MockUserRepository::new());

        let again = svc
            .provision_category(CategorySpec {
                name: "News".into(),
                description: "Announcements".into(),
                icon: "📰".into(),
                position: 0,
            })
            .await
            .unwrap();
        assert_eq!(again.id, existing_id);

        let fresh = svc
            .provision_category(CategorySpec {
                name: "Off-topic".into(),
                description: " Anything ".into(),
                icon: "🎲".into(),
                position: 9,
            })
            .await
            .unwrap();
        assert_eq!(fresh.description, "Anything");
        assert_eq!(fresh.position, 9);
    }

    #[tokio::test]
    async fn blank_category_name_is_invalid() {
        let mut categories = MockCategoryRepository::new();
        categories.expect_create_category().never();

        let err = service(categories, MockUserRepository::new())
            .provision_category(CategorySpec {
                name: "  ".into(),
                description: String::new(),
                icon: String::new(),
                position: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }
}

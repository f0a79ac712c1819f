//! Profiles and role administration.

use chrono::Utc;
use domains::{
    user_listing_order, Action, Caller, DomainError, NewUser, PolicyContext, Result, Role,
    RoleChange, User,
};
use tracing::instrument;
use uuid::Uuid;

use super::{authenticated, authorize, ForumService};
use crate::validation::{required_text, MAX_DISPLAY_NAME_CHARS};

impl ForumService {
    /// Creates the profile of a freshly signed-up identity with role `user`.
    #[instrument(skip(self, display_name))]
    pub async fn register_profile(&self, user_id: Uuid, display_name: &str) -> Result<User> {
        let display_name = required_text("display name", display_name, MAX_DISPLAY_NAME_CHARS)?;
        let user = self
            .ports
            .users
            .create_user(NewUser {
                id: user_id,
                display_name,
                role: Role::User,
                created_at: Utc::now(),
            })
            .await?;
        tracing::info!(display_id = user.display_id, "profile registered");
        Ok(user)
    }

    /// Public profile lookup by numeric display id.
    #[instrument(skip(self))]
    pub async fn get_profile(&self, display_id: i64) -> Result<User> {
        self.ports
            .users
            .get_user_by_display_id(display_id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", display_id))
    }

    /// The admin user list, newest members first.
    #[instrument(skip(self, caller), fields(caller = ?caller.user().map(|u| u.id)))]
    pub async fn list_users(&self, caller: &Caller) -> Result<Vec<User>> {
        authenticated(caller)?;
        authorize(caller, Action::ViewUserList, &PolicyContext::default())?;
        let mut users = self.ports.users.list_users().await?;
        users.sort_by(user_listing_order);
        Ok(users)
    }

    /// Changes another user's role.
    ///
    /// `new_role` arrives in wire form and must name one of the four roles.
    /// An owner's role never changes and nobody is promoted to owner here;
    /// both are reported as `Conflict`, whoever the caller is.
    #[instrument(skip(self, caller), fields(caller = ?caller.user().map(|u| u.id)))]
    pub async fn update_user_role(
        &self,
        caller: &Caller,
        target_id: Uuid,
        new_role: &str,
    ) -> Result<()> {
        let acting = authenticated(caller)?;

        let target = self
            .ports
            .users
            .get_user(target_id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", target_id))?;

        let requested = match new_role.parse::<Role>() {
            Ok(role) => role,
            Err(err) if target.role != Role::Owner => return Err(err),
            // An owner target is refused below whatever value was sent.
            Err(_) => target.role,
        };

        let change = RoleChange {
            current: target.role,
            requested,
            is_self: acting.id == target.id,
        };
        authorize(caller, Action::ChangeRole, &PolicyContext::role_change(change))?;

        let updated = self
            .ports
            .users
            .update_role(target_id, requested, Utc::now())
            .await?;
        tracing::info!(
            from = target.role.label(),
            to = updated.role.label(),
            "role updated"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{caller, user, user_at, Mocks};
    use chrono::{Duration, Utc};
    use domains::{Caller, DomainError, Role, StoreError, User};
    use mockall::predicate::{always, eq};
    use uuid::Uuid;

    fn target_lookup(mocks: &mut Mocks, target: &User) {
        let target = target.clone();
        mocks
            .users
            .expect_get_user()
            .with(eq(target.id))
            .returning(move |_| Ok(Some(target.clone())));
    }

    #[tokio::test]
    async fn owner_target_is_a_conflict_for_every_caller() {
        let owner = user(Role::Owner);
        for role in Role::ALL {
            for new_role in ["user", "moderator", "admin", "owner", "superuser", ""] {
                let mut mocks = Mocks::default();
                target_lookup(&mut mocks, &owner);
                mocks.users.expect_update_role().never();

                let err = mocks
                    .into_service()
                    .update_user_role(&caller(role), owner.id, new_role)
                    .await
                    .unwrap_err();
                assert!(
                    matches!(err, DomainError::Conflict(_)),
                    "caller {role} -> {new_role}: {err:?}"
                );
            }
        }
    }

    #[tokio::test]
    async fn the_owner_cannot_demote_themself() {
        let owner = user(Role::Owner);
        let mut mocks = Mocks::default();
        target_lookup(&mut mocks, &owner);
        mocks.users.expect_update_role().never();

        let err = mocks
            .into_service()
            .update_user_role(&Caller::Authenticated(owner.clone()), owner.id, "admin")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn promoting_to_owner_is_a_conflict() {
        let target = user(Role::Admin);
        let mut mocks = Mocks::default();
        target_lookup(&mut mocks, &target);
        mocks.users.expect_update_role().never();

        let err = mocks
            .into_service()
            .update_user_role(&caller(Role::Owner), target.id, "owner")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn unknown_role_name_is_invalid_input() {
        let target = user(Role::User);
        let mut mocks = Mocks::default();
        target_lookup(&mut mocks, &target);
        mocks.users.expect_update_role().never();

        let err = mocks
            .into_service()
            .update_user_role(&caller(Role::Admin), target.id, "superadmin")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn anonymous_is_rejected_before_any_lookup() {
        let mut mocks = Mocks::default();
        mocks.users.expect_get_user().never();

        let err = mocks
            .into_service()
            .update_user_role(&Caller::Anonymous, Uuid::now_v7(), "admin")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn moderators_cannot_change_roles() {
        let target = user(Role::User);
        let mut mocks = Mocks::default();
        target_lookup(&mut mocks, &target);
        mocks.users.expect_update_role().never();

        let err = mocks
            .into_service()
            .update_user_role(&caller(Role::Moderator), target.id, "moderator")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn admin_promotes_user_to_moderator() {
        let target = user(Role::User);
        let mut mocks = Mocks::default();
        target_lookup(&mut mocks, &target);
        let promoted = User {
            role: Role::Moderator,
            ..target.clone()
        };
        mocks
            .users
            .expect_update_role()
            .with(eq(target.id), eq(Role::Moderator), always())
            .times(1)
            .returning(move |_, _, _| Ok(promoted.clone()));

        mocks
            .into_service()
            .update_user_role(&caller(Role::Admin), target.id, "Moderator")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unknown_target_is_not_found() {
        let mut mocks = Mocks::default();
        mocks.users.expect_get_user().returning(|_| Ok(None));

        let err = mocks
            .into_service()
            .update_user_role(&caller(Role::Admin), Uuid::now_v7(), "user")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "user", .. }));
    }

    #[tokio::test]
    async fn user_list_is_staff_only_and_newest_first() {
        let now = Utc::now();
        let oldest = user_at(Role::Owner, now - Duration::days(10));
        let newest = user_at(Role::User, now);
        let middle = user_at(Role::Moderator, now - Duration::days(1));
        let stored = vec![oldest.clone(), newest.clone(), middle.clone()];

        let mut mocks = Mocks::default();
        mocks
            .users
            .expect_list_users()
            .times(1)
            .returning(move || Ok(stored.clone()));
        let service = mocks.into_service();

        for role in [Role::User, Role::Moderator] {
            assert!(matches!(
                service.list_users(&caller(role)).await,
                Err(DomainError::Unauthorized(_))
            ));
        }
        let ids: Vec<Uuid> = service
            .list_users(&caller(Role::Admin))
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec![newest.id, middle.id, oldest.id]);
    }

    #[tokio::test]
    async fn registration_trims_name_and_defaults_to_user_role() {
        let mut mocks = Mocks::default();
        mocks
            .users
            .expect_create_user()
            .times(1)
            .returning(|new| {
                Ok(User {
                    id: new.id,
                    display_name: new.display_name,
                    display_id: 1,
                    role: new.role,
                    created_at: new.created_at,
                    updated_at: new.created_at,
                })
            });

        let id = Uuid::now_v7();
        let profile = mocks
            .into_service()
            .register_profile(id, "  neo  ")
            .await
            .unwrap();
        assert_eq!(profile.id, id);
        assert_eq!(profile.display_name, "neo");
        assert_eq!(profile.role, Role::User);
    }

    #[tokio::test]
    async fn duplicate_registration_is_a_conflict() {
        let mut mocks = Mocks::default();
        mocks
            .users
            .expect_create_user()
            .returning(|_| Err(StoreError::Conflict("user already exists".into())));

        let err = mocks
            .into_service()
            .register_profile(Uuid::now_v7(), "neo")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn profile_lookup_by_display_id() {
        let member = user(Role::User);
        let display_id = member.display_id;
        let mut mocks = Mocks::default();
        mocks
            .users
            .expect_get_user_by_display_id()
            .returning(move |id| Ok((id == display_id).then(|| member.clone())));
        let service = mocks.into_service();

        assert_eq!(service.get_profile(display_id).await.unwrap().display_id, display_id);
        assert!(matches!(
            service.get_profile(display_id + 1).await,
            Err(DomainError::NotFound { entity: "user", .. })
        ));
    }
}

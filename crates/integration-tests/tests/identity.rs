//! Bearer tokens resolved to callers, then driven through the engine.

use std::sync::Arc;

use auth_adapters::JwtIdentityResolver;
use chrono::Utc;
use domains::{Caller, DomainError, IdentityResolver, MockIdentityResolver, Role};
use integration_tests::Forum;
use jsonwebtoken::{encode, EncodingKey, Header};
use secrecy::SecretString;
use serde::Serialize;
use storage_adapters::InMemoryForumStore;
use uuid::Uuid;

const SECRET: &str = "integration-signing-secret-0123456789";

#[derive(Serialize)]
struct Claims {
    sub: String,
    exp: i64,
}

fn bearer(sub: Uuid) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        exp: Utc::now().timestamp() + 600,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap();
    format!("Bearer {token}")
}

fn resolver(forum: &Forum<InMemoryForumStore>) -> JwtIdentityResolver {
    JwtIdentityResolver::new(
        &SecretString::from(SECRET.to_string()),
        0,
        forum.store.clone(),
    )
}

#[tokio::test]
async fn resolved_moderator_can_pin() {
    let forum = Forum::in_memory();
    let cat = forum.category("General", 1).await;
    let moderator = forum.member("mod", Role::Moderator).await;
    let topic = forum.aged_topic(cat.id, moderator.id, false, 1).await;

    let caller = resolver(&forum).resolve(&bearer(moderator.id)).await.unwrap();
    forum.service.set_pinned(&caller, topic.id, true).await.unwrap();

    let listing = forum.service.list_topics(cat.id).await.unwrap();
    assert!(listing[0].topic.pinned);
}

#[tokio::test]
async fn promotion_takes_effect_on_next_resolve() {
    let forum = Forum::in_memory();
    let cat = forum.category("General", 1).await;
    let admin = forum.caller(Role::Admin).await;
    let member = forum.member("rising", Role::User).await;
    let topic = forum.aged_topic(cat.id, member.id, false, 1).await;
    let resolver = resolver(&forum);
    let token = bearer(member.id);

    let before = resolver.resolve(&token).await.unwrap();
    assert!(matches!(
        forum.service.set_locked(&before, topic.id, true).await,
        Err(DomainError::Unauthorized(_))
    ));

    forum
        .service
        .update_user_role(&admin, member.id, "moderator")
        .await
        .unwrap();

    let after = resolver.resolve(&token).await.unwrap();
    assert_eq!(after.role(), Some(Role::Moderator));
    forum.service.set_locked(&after, topic.id, true).await.unwrap();
}

#[tokio::test]
async fn unverifiable_token_behaves_as_anonymous() {
    let forum = Forum::in_memory();
    let cat = forum.category("General", 1).await;

    let caller = resolver(&forum)
        .resolve("Bearer definitely.not.valid")
        .await
        .unwrap();
    assert_eq!(caller, Caller::Anonymous);
    assert!(matches!(
        forum.service.create_topic(&caller, cat.id, "t", "c").await,
        Err(DomainError::Unauthorized(_))
    ));
    assert_eq!(forum.service.list_categories().await.unwrap().len(), 1);
}

#[tokio::test]
async fn engine_accepts_any_resolver_behind_the_trait() {
    let forum = Forum::in_memory();
    let cat = forum.category("General", 1).await;
    let admin = forum.member("admin", Role::Admin).await;

    let mut mock = MockIdentityResolver::new();
    let resolved = admin.clone();
    mock.expect_resolve()
        .withf(|token| token.starts_with("session-"))
        .times(1)
        .returning(move |_| Ok(Caller::Authenticated(resolved.clone())));
    let identity: Arc<dyn IdentityResolver> = Arc::new(mock);

    let caller = identity.resolve("session-cookie").await.unwrap();
    let topic = forum
        .service
        .create_topic(&caller, cat.id, "Announcement", "Welcome")
        .await
        .unwrap();
    assert_eq!(topic.author_id, admin.id);
    assert_eq!(forum.service.list_users(&caller).await.unwrap().len(), 1);
}

#[test]
fn resolution_failure_from_store_is_not_masked() {
    let forum = Forum::in_memory();
    let member = tokio_test::block_on(forum.member("m", Role::User));
    forum.store.set_offline(true);

    let err = tokio_test::block_on(resolver(&forum).resolve(&bearer(member.id))).unwrap_err();
    assert!(matches!(err, DomainError::StoreUnavailable(_)));
}

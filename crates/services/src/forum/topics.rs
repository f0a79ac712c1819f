//! Topic and post lifecycle: creation, the read path and the view counter.

use chrono::Utc;
use domains::{
    post_order, Action, Caller, DomainError, PolicyContext, Post, PostView, Result, Topic,
    TopicDetail, User,
};
use tracing::instrument;
use uuid::Uuid;

use super::{authenticated, authorize, ForumService};
use crate::validation::{required_text, MAX_BODY_CHARS, MAX_TITLE_CHARS};

impl ForumService {
    /// Starts a new topic authored by the caller.
    ///
    /// The topic is persisted unpinned, unlocked and with zero views.
    /// Not idempotent: every successful call creates a new topic.
    #[instrument(skip(self, caller, title, content), fields(caller = ?caller.user().map(|u| u.id)))]
    pub async fn create_topic(
        &self,
        caller: &Caller,
        category_id: Uuid,
        title: &str,
        content: &str,
    ) -> Result<Topic> {
        let author = authenticated(caller)?;
        authorize(caller, Action::CreateTopic, &PolicyContext::default())?;

        let title = required_text("title", title, MAX_TITLE_CHARS)?;
        let content = required_text("content", content, MAX_BODY_CHARS)?;

        if self.ports.categories.get_category(category_id).await?.is_none() {
            return Err(DomainError::not_found("category", category_id));
        }

        let now = Utc::now();
        let topic = Topic {
            id: Uuid::now_v7(),
            title,
            content,
            category_id,
            author_id: author.id,
            pinned: false,
            locked: false,
            views: 0,
            created_at: now,
            updated_at: now,
        };
        let created = self.ports.topics.create_topic(topic).await?;
        tracing::info!(topic_id = %created.id, "topic created");
        Ok(created)
    }

    /// Replies to an unlocked topic.
    #[instrument(skip(self, caller, content), fields(caller = ?caller.user().map(|u| u.id)))]
    pub async fn create_post(&self, caller: &Caller, topic_id: Uuid, content: &str) -> Result<Post> {
        let author = authenticated(caller)?;
        let topic = self.require_topic(topic_id).await?;
        authorize(caller, Action::CreatePost, &PolicyContext::topic(topic.locked))?;

        let content = required_text("content", content, MAX_BODY_CHARS)?;
        let now = Utc::now();
        let post = Post {
            id: Uuid::now_v7(),
            topic_id,
            author_id: author.id,
            content,
            created_at: now,
            updated_at: now,
        };
        let created = self.ports.posts.create_post(post).await?;
        tracing::info!(post_id = %created.id, "post created");
        Ok(created)
    }

    /// Counts one read of a topic. No deduplication by viewer.
    ///
    /// The increment happens in the store as a single atomic add.
    #[instrument(skip(self))]
    pub async fn increment_views(&self, topic_id: Uuid) -> Result<()> {
        let views = self.ports.topics.increment_views(topic_id).await?;
        tracing::debug!(views, "view counted");
        Ok(())
    }

    /// The topic read path: counts the view, then loads the topic and its replies.
    #[instrument(skip(self))]
    pub async fn open_topic(&self, topic_id: Uuid) -> Result<TopicDetail> {
        self.increment_views(topic_id).await?;
        let topic = self.require_topic(topic_id).await?;
        let posts = self.ports.posts.list_posts(topic_id).await?;

        let authors = self
            .authors(std::iter::once(topic.author_id).chain(posts.iter().map(|p| p.author_id)))
            .await?;
        let author_of = |id: Uuid| {
            authors
                .get(&id)
                .cloned()
                .unwrap_or_else(|| User::tombstone(id))
        };

        Ok(TopicDetail {
            author: author_of(topic.author_id),
            posts: posts
                .into_iter()
                .map(|post| PostView {
                    author: author_of(post.author_id),
                    post,
                })
                .collect(),
            topic,
        })
    }

    /// Replies of a topic, oldest first.
    #[instrument(skip(self))]
    pub async fn list_posts(&self, topic_id: Uuid) -> Result<Vec<Post>> {
        self.require_topic(topic_id).await?;
        let mut posts = self.ports.posts.list_posts(topic_id).await?;
        posts.sort_by(post_order);
        Ok(posts)
    }

    /// Reply count, always derived from the posts themselves.
    #[instrument(skip(self))]
    pub async fn post_count(&self, topic_id: Uuid) -> Result<u64> {
        self.require_topic(topic_id).await?;
        Ok(self.ports.posts.count_posts_by_topic(topic_id).await?)
    }
}

//! Anonymous read side: categories and topic listings.

use domains::{
    category_order, topic_listing_order, Category, CategorySummary, DomainError, Result,
    TopicSummary, User,
};
use tracing::instrument;
use uuid::Uuid;

use super::ForumService;

impl ForumService {
    /// All categories by position, ties broken by creation order.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let mut categories = self.ports.categories.list_categories().await?;
        categories.sort_by(category_order);
        tracing::debug!(count = categories.len(), "listed categories");
        Ok(categories)
    }

    /// Categories with their derived topic and post counts.
    #[instrument(skip(self))]
    pub async fn list_category_summaries(&self) -> Result<Vec<CategorySummary>> {
        let categories = self.list_categories().await?;
        let mut summaries = Vec::with_capacity(categories.len());
        for category in categories {
            let topic_count = self.ports.topics.count_topics_by_category(category.id).await?;
            let post_count = self.ports.posts.count_posts_by_category(category.id).await?;
            summaries.push(CategorySummary {
                category,
                topic_count,
                post_count,
            });
        }
        Ok(summaries)
    }

    /// Topics of a category: pinned first, newest first within each group.
    ///
    /// The sort is stable, so adapters that already return this order keep
    /// their tie order untouched.
    #[instrument(skip(self))]
    pub async fn list_topics(&self, category_id: Uuid) -> Result<Vec<TopicSummary>> {
        if self.ports.categories.get_category(category_id).await?.is_none() {
            return Err(DomainError::not_found("category", category_id));
        }

        let mut topics = self.ports.topics.list_topics_by_category(category_id).await?;
        topics.sort_by(topic_listing_order);

        let authors = self.authors(topics.iter().map(|t| t.author_id)).await?;
        let mut listing = Vec::with_capacity(topics.len());
        for topic in topics {
            let post_count = self.ports.posts.count_posts_by_topic(topic.id).await?;
            let author = authors
                .get(&topic.author_id)
                .cloned()
                .unwrap_or_else(|| User::tombstone(topic.author_id));
            listing.push(TopicSummary {
                topic,
                author,
                post_count,
            });
        }
        tracing::debug!(count = listing.len(), "listed topics");
        Ok(listing)
    }
}

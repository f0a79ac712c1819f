//! # SQLite store
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `domains` models. UUIDs are stored as 16-byte blobs.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::{
    Category, CategoryRepository, NewUser, Post, PostRepository, Role, StoreError, StoreResult,
    Topic, TopicRepository, User, UserRepository,
};
use sqlx::error::ErrorKind;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use uuid::Uuid;

pub struct SqliteForumStore {
    pool: SqlitePool,
}

// Helper for UUID conversion
fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

fn blob_to_uuid(row: &SqliteRow, column: &str) -> StoreResult<Uuid> {
    let blob: Vec<u8> = row.try_get(column).map_err(store_err)?;
    Uuid::from_slice(&blob)
        .map_err(|e| StoreError::Unavailable(format!("corrupt uuid in column {column}: {e}")))
}

/// Maps driver failures onto the store error contract.
fn store_err(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::RowNotFound => StoreError::not_found("row", "unknown"),
        sqlx::Error::Database(db) => match db.kind() {
            ErrorKind::UniqueViolation | ErrorKind::CheckViolation => {
                StoreError::Conflict(db.message().to_string())
            }
            ErrorKind::ForeignKeyViolation => {
                StoreError::not_found("referenced record", db.message())
            }
            _ => StoreError::Unavailable(err.to_string()),
        },
        _ => StoreError::Unavailable(err.to_string()),
    }
}

fn row_to_category(row: &SqliteRow) -> StoreResult<Category> {
    Ok(Category {
        id: blob_to_uuid(row, "id")?,
        name: row.try_get("name").map_err(store_err)?,
        description: row.try_get("description").map_err(store_err)?,
        icon: row.try_get("icon").map_err(store_err)?,
        position: row.try_get("position").map_err(store_err)?,
        created_at: row.try_get("created_at").map_err(store_err)?,
    })
}

fn row_to_topic(row: &SqliteRow) -> StoreResult<Topic> {
    Ok(Topic {
        id: blob_to_uuid(row, "id")?,
        title: row.try_get("title").map_err(store_err)?,
        content: row.try_get("content").map_err(store_err)?,
        category_id: blob_to_uuid(row, "category_id")?,
        author_id: blob_to_uuid(row, "author_id")?,
        pinned: row.try_get("pinned").map_err(store_err)?,
        locked: row.try_get("locked").map_err(store_err)?,
        views: row.try_get("views").map_err(store_err)?,
        created_at: row.try_get("created_at").map_err(store_err)?,
        updated_at: row.try_get("updated_at").map_err(store_err)?,
    })
}

fn row_to_post(row: &SqliteRow) -> StoreResult<Post> {
    Ok(Post {
        id: blob_to_uuid(row, "id")?,
        topic_id: blob_to_uuid(row, "topic_id")?,
        author_id: blob_to_uuid(row, "author_id")?,
        content: row.try_get("content").map_err(store_err)?,
        created_at: row.try_get("created_at").map_err(store_err)?,
        updated_at: row.try_get("updated_at").map_err(store_err)?,
    })
}

fn row_to_user(row: &SqliteRow) -> StoreResult<User> {
    let role: String = row.try_get("role").map_err(store_err)?;
    Ok(User {
        id: blob_to_uuid(row, "id")?,
        display_name: row.try_get("display_name").map_err(store_err)?,
        display_id: row.try_get("display_id").map_err(store_err)?,
        role: Role::from_str(&role)
            .map_err(|_| StoreError::Unavailable(format!("unrecognised role '{role}' in users")))?,
        created_at: row.try_get("created_at").map_err(store_err)?,
        updated_at: row.try_get("updated_at").map_err(store_err)?,
    })
}

fn count(row: &SqliteRow) -> StoreResult<u64> {
    let n: i64 = row.try_get("n").map_err(store_err)?;
    Ok(n.max(0) as u64)
}

impl SqliteForumStore {
    /// Opens a pool against `url`, creating the database file if needed.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(store_err)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_with(options)
            .await
            .map_err(store_err)?;
        tracing::info!(url, max_connections, "connected to sqlite");
        Ok(Self { pool })
    }

    /// A private in-memory database. One long-lived connection, since every
    /// new `:memory:` connection would see an empty database.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(store_err)?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(store_err)?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Applies the embedded schema migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("migration failed: {e}")))?;
        tracing::debug!("sqlite migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl CategoryRepository for SqliteForumStore {
    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query("SELECT * FROM categories ORDER BY position ASC, created_at ASC, id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        rows.iter().map(row_to_category).collect()
    }

    async fn get_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        let row = sqlx::query("SELECT * FROM categories WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        row.as_ref().map(row_to_category).transpose()
    }

    async fn create_category(&self, category: Category) -> StoreResult<Category> {
        sqlx::query(
            "INSERT INTO categories (id, name, description, icon, position, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(category.id))
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.icon)
        .bind(category.position)
        .bind(category.created_at)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(category)
    }
}

#[async_trait]
impl TopicRepository for SqliteForumStore {
    async fn create_topic(&self, topic: Topic) -> StoreResult<Topic> {
        sqlx::query("INSERT INTO topics (id, title, content, category_id, author_id, pinned, locked, views, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)")
            .bind(uuid_to_blob(topic.id))
            .bind(&topic.title)
            .bind(&topic.content)
            .bind(uuid_to_blob(topic.category_id))
            .bind(uuid_to_blob(topic.author_id))
            .bind(topic.pinned)
            .bind(topic.locked)
            .bind(topic.views)
            .bind(topic.created_at)
            .bind(topic.updated_at)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(topic)
    }

    async fn get_topic(&self, id: Uuid) -> StoreResult<Option<Topic>> {
        let row = sqlx::query("SELECT * FROM topics WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        row.as_ref().map(row_to_topic).transpose()
    }

    async fn list_topics_by_category(&self, category_id: Uuid) -> StoreResult<Vec<Topic>> {
        let rows = sqlx::query(
            "SELECT * FROM topics WHERE category_id = ? ORDER BY pinned DESC, created_at DESC, id DESC",
        )
        .bind(uuid_to_blob(category_id))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.iter().map(row_to_topic).collect()
    }

    async fn count_topics_by_category(&self, category_id: Uuid) -> StoreResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM topics WHERE category_id = ?")
            .bind(uuid_to_blob(category_id))
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;
        count(&row)
    }

    async fn set_pinned(&self, id: Uuid, pinned: bool, at: DateTime<Utc>) -> StoreResult<()> {
        let result = sqlx::query("UPDATE topics SET pinned = ?, updated_at = ? WHERE id = ?")
            .bind(pinned)
            .bind(at)
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("topic", id));
        }
        Ok(())
    }

    async fn set_locked(&self, id: Uuid, locked: bool, at: DateTime<Utc>) -> StoreResult<()> {
        let result = sqlx::query("UPDATE topics SET locked = ?, updated_at = ? WHERE id = ?")
            .bind(locked)
            .bind(at)
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("topic", id));
        }
        Ok(())
    }

    /// A single `UPDATE ... SET views = views + 1`, so concurrent readers
    /// never lose an increment.
    async fn increment_views(&self, id: Uuid) -> StoreResult<i64> {
        let row = sqlx::query("UPDATE topics SET views = views + 1 WHERE id = ? RETURNING views")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .ok_or_else(|| StoreError::not_found("topic", id))?;
        row.try_get("views").map_err(store_err)
    }
}

#[async_trait]
impl PostRepository for SqliteForumStore {
    async fn create_post(&self, post: Post) -> StoreResult<Post> {
        sqlx::query("INSERT INTO posts (id, topic_id, author_id, content, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)")
            .bind(uuid_to_blob(post.id))
            .bind(uuid_to_blob(post.topic_id))
            .bind(uuid_to_blob(post.author_id))
            .bind(&post.content)
            .bind(post.created_at)
            .bind(post.updated_at)
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(post)
    }

    async fn list_posts(&self, topic_id: Uuid) -> StoreResult<Vec<Post>> {
        let rows = sqlx::query("SELECT * FROM posts WHERE topic_id = ? ORDER BY created_at ASC, id ASC")
            .bind(uuid_to_blob(topic_id))
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        rows.iter().map(row_to_post).collect()
    }

    async fn count_posts_by_topic(&self, topic_id: Uuid) -> StoreResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM posts WHERE topic_id = ?")
            .bind(uuid_to_blob(topic_id))
            .fetch_one(&self.pool)
            .await
            .map_err(store_err)?;
        count(&row)
    }

    async fn count_posts_by_category(&self, category_id: Uuid) -> StoreResult<u64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM posts p JOIN topics t ON t.id = p.topic_id WHERE t.category_id = ?",
        )
        .bind(uuid_to_blob(category_id))
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;
        count(&row)
    }
}

#[async_trait]
impl UserRepository for SqliteForumStore {
    /// The next display id is computed inside the INSERT itself; SQLite
    /// serialises writers, so two sign-ups never share a number.
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        let row = sqlx::query(
            "INSERT INTO users (id, display_name, display_id, role, created_at, updated_at) \
             VALUES (?, ?, (SELECT COALESCE(MAX(display_id), 0) + 1 FROM users), ?, ?, ?) \
             RETURNING *",
        )
        .bind(uuid_to_blob(user.id))
        .bind(&user.display_name)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;
        row_to_user(&row)
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn get_user_by_display_id(&self, display_id: i64) -> StoreResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE display_id = ?")
            .bind(display_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        row.as_ref().map(row_to_user).transpose()
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        rows.iter().map(row_to_user).collect()
    }

    async fn find_by_role(&self, role: Role) -> StoreResult<Vec<User>> {
        let rows = sqlx::query("SELECT * FROM users WHERE role = ? ORDER BY created_at ASC")
            .bind(role.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        rows.iter().map(row_to_user).collect()
    }

    async fn update_role(&self, id: Uuid, role: Role, at: DateTime<Utc>) -> StoreResult<User> {
        let row = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ? RETURNING *")
            .bind(role.as_str())
            .bind(at)
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?
            .ok_or_else(|| StoreError::not_found("user", id))?;
        row_to_user(&row)
    }
}

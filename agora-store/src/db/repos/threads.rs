//! Thread repository
//!
//! Handles thread CRUD with:
//! - Top-level thread creation
//! - Replies created under a locked parent (transaction)
//! - Paginated feed with authors and one reply level
//! - Single-thread view with two reply levels

use tracing::{debug, instrument};
use uuid::Uuid;

use super::populate::{decode_counted, with_replies, THREAD_WITH_AUTHOR_COLUMNS};
use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::models::thread::ThreadAuthorRow;
use crate::models::{
    Paginated, Pagination, Thread, ThreadDetail, ThreadText, ThreadWithReplies,
    DEFAULT_THREADS_PER_PAGE, DETAIL_REPLY_DEPTH, LIST_REPLY_DEPTH,
};
use crate::revalidate::{signal, Revalidate};

const THREAD_COLUMNS: &str = "id, text, author_id, community_id, parent_id, created_at";

/// New top-level thread.
#[derive(Debug, Clone)]
pub struct CreateThreadParams {
    pub text: String,
    pub author_id: String,
    /// Accepted for callers posting from a community page; not stored.
    pub community_id: Option<String>,
    /// Route to invalidate after posting
    pub path: String,
}

/// Thread repository
pub struct ThreadRepo<'a> {
    db: &'a Database,
    revalidator: &'a dyn Revalidate,
}

/// Re-tag a foreign-key failure on `author_id` as a missing user.
fn missing_author(err: sqlx::Error, author_id: &str) -> StoreError {
    match StoreError::from(err) {
        StoreError::NotFound { .. } => StoreError::not_found("user", author_id),
        other => other,
    }
}

impl<'a> ThreadRepo<'a> {
    pub fn new(db: &'a Database, revalidator: &'a dyn Revalidate) -> Self {
        Self { db, revalidator }
    }

    /// Create a top-level thread.
    ///
    /// The thread is always stored without a community, whatever
    /// `community_id` says. The author's thread list picks it up through
    /// `threads.author_id`.
    #[instrument(skip_all, fields(author_id = %params.author_id))]
    pub async fn create_thread(&self, params: CreateThreadParams) -> StoreResult<Thread> {
        let text = ThreadText::new(&params.text)?;
        let pool = self.db.pool().await?;

        if let Some(community_id) = params.community_id.as_deref() {
            debug!(community_id, "community id ignored, thread stored without community");
        }

        let thread = sqlx::query_as::<_, Thread>(&format!(
            r#"
            INSERT INTO threads (text, author_id, community_id)
            VALUES ($1, $2, NULL)
            RETURNING {THREAD_COLUMNS}
            "#
        ))
        .bind(text.as_str())
        .bind(&params.author_id)
        .fetch_one(pool)
        .await
        .map_err(|e| missing_author(e, &params.author_id))?;

        signal(self.revalidator, &params.path);
        Ok(thread)
    }

    /// Top-level threads, newest first, with authors and one reply level.
    #[instrument(skip(self))]
    pub async fn fetch_threads(
        &self,
        page: Pagination,
    ) -> StoreResult<Paginated<ThreadWithReplies>> {
        let pool = self.db.pool().await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {THREAD_WITH_AUTHOR_COLUMNS}, COUNT(*) OVER() AS total
            FROM threads t
            JOIN users u ON u.id = t.author_id
            WHERE t.parent_id IS NULL
            ORDER BY t.created_at DESC, t.id
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(pool)
        .await?;

        let (rows, total) = decode_counted::<ThreadAuthorRow>(&rows)?;
        let threads = with_replies(pool, rows, LIST_REPLY_DEPTH).await?;
        Ok(page.wrap(threads, total))
    }

    /// First page of the feed with the default page size.
    pub async fn fetch_latest(&self) -> StoreResult<Paginated<ThreadWithReplies>> {
        self.fetch_threads(Pagination::new(1, DEFAULT_THREADS_PER_PAGE))
            .await
    }

    /// One thread with its author and two levels of replies. Deeper replies
    /// are only counted.
    #[instrument(skip(self))]
    pub async fn fetch_thread_by_id(&self, thread_id: Uuid) -> StoreResult<Option<ThreadDetail>> {
        let pool = self.db.pool().await?;

        let Some(row) = sqlx::query_as::<_, ThreadAuthorRow>(&format!(
            r#"
            SELECT {THREAD_WITH_AUTHOR_COLUMNS}
            FROM threads t
            JOIN users u ON u.id = t.author_id
            WHERE t.id = $1
            "#
        ))
        .bind(thread_id)
        .fetch_optional(pool)
        .await?
        else {
            return Ok(None);
        };

        Ok(with_replies(pool, vec![row], DETAIL_REPLY_DEPTH).await?.pop())
    }

    /// Reply to an existing thread.
    ///
    /// The parent row is locked for the duration of the insert; when it does
    /// not exist nothing is written.
    #[instrument(skip(self, comment_text))]
    pub async fn add_comment_to_thread(
        &self,
        thread_id: Uuid,
        comment_text: &str,
        user_id: &str,
        path: &str,
    ) -> StoreResult<Thread> {
        let text = ThreadText::new(comment_text)?;
        let pool = self.db.pool().await?;
        let mut tx = pool.begin().await?;

        let parent: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM threads WHERE id = $1 FOR UPDATE")
                .bind(thread_id)
                .fetch_optional(&mut *tx)
                .await?;

        if parent.is_none() {
            return Err(StoreError::not_found("thread", thread_id.to_string()));
        }

        let reply = sqlx::query_as::<_, Thread>(&format!(
            r#"
            INSERT INTO threads (text, author_id, parent_id)
            VALUES ($1, $2, $3)
            RETURNING {THREAD_COLUMNS}
            "#
        ))
        .bind(text.as_str())
        .bind(user_id)
        .bind(thread_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| missing_author(e, user_id))?;

        tx.commit().await?;

        signal(self.revalidator, path);
        Ok(reply)
    }

    /// Number of direct replies to a thread.
    pub async fn count_replies(&self, thread_id: Uuid) -> StoreResult<i64> {
        let pool = self.db.pool().await?;

        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM threads WHERE parent_id = $1")
                .bind(thread_id)
                .fetch_one(pool)
                .await?;

        Ok(count)
    }
}

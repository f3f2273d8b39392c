//! Shared reply population
//!
//! Thread lists are populated in two queries regardless of page size: the
//! page of threads (joined with authors), then every reply under those
//! threads down to the requested depth in one recursive query.

use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::StoreResult;
use crate::models::thread::{ReplyRow, ThreadAuthorRow};
use crate::models::{ReplyForest, ThreadWithReplies};

/// Columns of `threads t` joined with `users u` as its author.
pub(crate) const THREAD_WITH_AUTHOR_COLUMNS: &str = r#"
    t.id, t.text, t.author_id, t.community_id, t.parent_id, t.created_at,
    u.username AS author_username, u.name AS author_name, u.image AS author_image
"#;

/// Fetch replies under `roots`, at most `depth` levels down, oldest first.
pub(crate) async fn fetch_replies(
    pool: &PgPool,
    roots: &[Uuid],
    depth: u32,
) -> Result<Vec<ReplyRow>, sqlx::Error> {
    if roots.is_empty() || depth == 0 {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, ReplyRow>(
        r#"
        WITH RECURSIVE tree AS (
            SELECT t.id, t.text, t.author_id, t.community_id, t.parent_id, t.created_at,
                   1 AS depth
            FROM threads t
            WHERE t.parent_id = ANY($1)
            UNION ALL
            SELECT c.id, c.text, c.author_id, c.community_id, c.parent_id, c.created_at,
                   tree.depth + 1
            FROM threads c
            JOIN tree ON c.parent_id = tree.id
            WHERE tree.depth < $2
        )
        SELECT
            tree.id, tree.text, tree.author_id, tree.community_id, tree.parent_id, tree.created_at,
            u.name AS author_name,
            u.image AS author_image,
            (SELECT COUNT(*) FROM threads r WHERE r.parent_id = tree.id) AS reply_count
        FROM tree
        JOIN users u ON u.id = tree.author_id
        ORDER BY tree.created_at ASC, tree.id
        "#,
    )
    .bind(roots)
    .bind(depth as i32)
    .fetch_all(pool)
    .await
}

/// Attach reply trees to already-fetched thread rows, keeping row order.
pub(crate) async fn with_replies(
    pool: &PgPool,
    rows: Vec<ThreadAuthorRow>,
    depth: u32,
) -> StoreResult<Vec<ThreadWithReplies>> {
    let roots: Vec<Uuid> = rows.iter().map(|r| r.thread.id).collect();
    let mut forest = ReplyForest::new(fetch_replies(pool, &roots, depth).await?, depth);

    Ok(rows
        .into_iter()
        .map(|row| {
            let (thread, author) = row.into_parts();
            let children = forest.take(thread.id);
            ThreadWithReplies {
                thread,
                author,
                children,
            }
        })
        .collect())
}

/// Decode rows carrying a `COUNT(*) OVER() AS total` column.
pub(crate) fn decode_counted<T>(rows: &[sqlx::postgres::PgRow]) -> StoreResult<(Vec<T>, i64)>
where
    T: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    use sqlx::Row;

    let total = rows.first().map(|r| r.get::<i64, _>("total")).unwrap_or(0);
    let items = rows
        .iter()
        .map(T::from_row)
        .collect::<Result<Vec<_>, _>>()?;
    Ok((items, total))
}

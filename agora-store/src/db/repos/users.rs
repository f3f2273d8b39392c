//! User repository
//!
//! Handles profile upserts, lookups, searchable listings, profile thread
//! views and reply activity. A user's thread and community lists are
//! derived from the threads and memberships tables.

use tracing::{debug, instrument};

use super::populate::{decode_counted, with_replies, THREAD_WITH_AUTHOR_COLUMNS};
use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::models::thread::{ActivityRow, ThreadAuthorRow};
use crate::models::validation::required;
use crate::models::{
    ActivityItem, Paginated, Pagination, ProfileThreads, SearchTerm, SortOrder, User, UserSummary,
    Username, DEFAULT_PER_PAGE, LIST_REPLY_DEPTH,
};
use crate::revalidate::{signal, Revalidate};

/// Maximum length for display names
const MAX_NAME_LEN: usize = 100;

/// Columns of `users u` including the derived reference lists.
const USER_COLUMNS: &str = r#"
    u.id, u.username, u.name, u.bio, u.image, u.onboarded, u.created_at,
    ARRAY(
        SELECT t.id FROM threads t
        WHERE t.author_id = u.id AND t.parent_id IS NULL
        ORDER BY t.created_at, t.id
    ) AS thread_ids,
    ARRAY(
        SELECT c.id FROM communities c
        WHERE c.created_by = u.id
           OR EXISTS (
               SELECT 1 FROM community_members m
               WHERE m.community_id = c.id AND m.user_id = u.id
           )
        ORDER BY c.created_at, c.id
    ) AS community_ids
"#;

/// Profile save from the onboarding or edit form.
#[derive(Debug, Clone)]
pub struct UpdateUserParams {
    pub user_id: String,
    pub username: String,
    pub name: String,
    pub bio: String,
    pub image: String,
    /// Route that triggered the save
    pub path: String,
}

/// User listing filter.
#[derive(Debug, Clone)]
pub struct FetchUsersParams {
    /// The requesting user, excluded from results
    pub user_id: String,
    pub search_string: String,
    pub page_number: u32,
    pub page_size: u32,
    pub sort_by: SortOrder,
}

impl FetchUsersParams {
    /// Defaults: no search, first page of 20, newest first.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            search_string: String::new(),
            page_number: 1,
            page_size: DEFAULT_PER_PAGE,
            sort_by: SortOrder::Desc,
        }
    }
}

/// User repository
pub struct UserRepo<'a> {
    db: &'a Database,
    revalidator: &'a dyn Revalidate,
}

impl<'a> UserRepo<'a> {
    pub fn new(db: &'a Database, revalidator: &'a dyn Revalidate) -> Self {
        Self { db, revalidator }
    }

    /// Create or update a profile by external id and mark it onboarded.
    ///
    /// The username is lowercased. Only the configured profile-edit route
    /// is invalidated; saves from any other route invalidate nothing.
    #[instrument(skip_all, fields(user_id = %params.user_id))]
    pub async fn update_user(&self, params: UpdateUserParams) -> StoreResult<User> {
        let username = Username::new(&params.username)?;
        let name = required(&params.name, "name", MAX_NAME_LEN)?;
        let pool = self.db.pool().await?;

        sqlx::query(
            r#"
            INSERT INTO users (id, username, name, bio, image, onboarded)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            ON CONFLICT (id) DO UPDATE SET
                username = EXCLUDED.username,
                name = EXCLUDED.name,
                bio = EXCLUDED.bio,
                image = EXCLUDED.image,
                onboarded = TRUE
            "#,
        )
        .bind(&params.user_id)
        .bind(username.as_str())
        .bind(&name)
        .bind(&params.bio)
        .bind(&params.image)
        .execute(pool)
        .await?;

        if params.path == self.db.config().profile_edit_path {
            signal(self.revalidator, &params.path);
        } else {
            debug!(path = %params.path, "profile saved outside the edit route, no revalidation");
        }

        self.fetch_user(&params.user_id)
            .await?
            .ok_or_else(|| StoreError::not_found("user", params.user_id.as_str()))
    }

    /// Get a user by external id. Related threads and communities are
    /// returned as ids only.
    pub async fn fetch_user(&self, user_id: &str) -> StoreResult<Option<User>> {
        let pool = self.db.pool().await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users u WHERE u.id = $1"
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// The user's top-level threads, oldest first, each with one level of
    /// replies. `None` when the user does not exist.
    #[instrument(skip(self))]
    pub async fn fetch_threads_by_profile(
        &self,
        user_id: &str,
    ) -> StoreResult<Option<ProfileThreads>> {
        let pool = self.db.pool().await?;

        let Some(user) = sqlx::query_as::<_, UserSummary>(
            "SELECT id, username, name, image FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, ThreadAuthorRow>(&format!(
            r#"
            SELECT {THREAD_WITH_AUTHOR_COLUMNS}
            FROM threads t
            JOIN users u ON u.id = t.author_id
            WHERE t.author_id = $1 AND t.parent_id IS NULL
            ORDER BY t.created_at ASC, t.id
            "#
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        let threads = with_replies(pool, rows, LIST_REPLY_DEPTH).await?;
        Ok(Some(ProfileThreads { user, threads }))
    }

    /// List other users, optionally filtered by a case-insensitive substring
    /// of username or name, ordered by join time.
    #[instrument(skip_all, fields(page = params.page_number, per_page = params.page_size))]
    pub async fn fetch_users(&self, params: FetchUsersParams) -> StoreResult<Paginated<User>> {
        let page = Pagination::new(params.page_number, params.page_size);
        let pattern = SearchTerm::parse(&params.search_string).map(|t| t.like_pattern());
        let pool = self.db.pool().await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {USER_COLUMNS}, COUNT(*) OVER() AS total
            FROM users u
            WHERE u.id <> $1
              AND ($2::text IS NULL OR u.username ILIKE $2 OR u.name ILIKE $2)
            ORDER BY u.created_at {order}, u.id
            LIMIT $3 OFFSET $4
            "#,
            order = params.sort_by.as_sql(),
        ))
        .bind(&params.user_id)
        .bind(pattern)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(pool)
        .await?;

        let (users, total) = decode_counted::<User>(&rows)?;
        Ok(page.wrap(users, total))
    }

    /// Replies by other users to threads the user started, newest first.
    #[instrument(skip(self))]
    pub async fn get_activity(&self, user_id: &str) -> StoreResult<Vec<ActivityItem>> {
        let pool = self.db.pool().await?;

        let rows = sqlx::query_as::<_, ActivityRow>(
            r#"
            SELECT
                r.id, r.text, r.author_id, r.community_id, r.parent_id, r.created_at,
                u.name AS author_name, u.image AS author_image
            FROM threads r
            JOIN threads p ON p.id = r.parent_id
            JOIN users u ON u.id = r.author_id
            WHERE p.author_id = $1 AND r.author_id <> $1
            ORDER BY r.created_at DESC, r.id
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(ActivityItem::from).collect())
    }
}

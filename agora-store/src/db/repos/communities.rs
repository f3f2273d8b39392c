//! Community repository
//!
//! Membership lives in `community_members` only: a community's member list
//! and a user's community list are two views of the same rows, so adding or
//! removing a member is a single write.

use std::collections::HashMap;

use tracing::{info, instrument};

use super::populate::{decode_counted, with_replies, THREAD_WITH_AUTHOR_COLUMNS};
use crate::db::Database;
use crate::error::{StoreError, StoreResult};
use crate::models::thread::ThreadAuthorRow;
use crate::models::validation::required;
use crate::models::{
    Community, CommunityDetails, CommunityPosts, CommunityWithMembers, MemberSummary,
    MembershipRow, Paginated, Pagination, SearchTerm, SortOrder, DEFAULT_PER_PAGE,
    LIST_REPLY_DEPTH,
};

/// Maximum length for community names and handles
const MAX_NAME_LEN: usize = 100;

const COMMUNITY_COLUMNS: &str = "id, name, username, image, bio, created_by, created_at";

/// New community.
#[derive(Debug, Clone)]
pub struct CreateCommunityParams {
    pub id: String,
    pub name: String,
    pub username: String,
    pub image: String,
    pub bio: String,
    pub created_by_id: String,
}

/// Community listing filter.
#[derive(Debug, Clone)]
pub struct FetchCommunitiesParams {
    pub search_string: String,
    pub page_number: u32,
    pub page_size: u32,
    pub sort_by: SortOrder,
}

impl Default for FetchCommunitiesParams {
    fn default() -> Self {
        Self {
            search_string: String::new(),
            page_number: 1,
            page_size: DEFAULT_PER_PAGE,
            sort_by: SortOrder::Desc,
        }
    }
}

/// Community repository
pub struct CommunityRepo<'a> {
    db: &'a Database,
}

impl<'a> CommunityRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create a community owned by an existing user.
    ///
    /// The community is persisted before anything refers to it; the
    /// creator's community list includes it through `created_by`.
    /// Members start empty.
    #[instrument(skip_all, fields(community_id = %params.id, created_by = %params.created_by_id))]
    pub async fn create_community(&self, params: CreateCommunityParams) -> StoreResult<Community> {
        let name = required(&params.name, "name", MAX_NAME_LEN)?;
        let username = required(&params.username, "username", MAX_NAME_LEN)?;
        let pool = self.db.pool().await?;

        let community = sqlx::query_as::<_, Community>(&format!(
            r#"
            INSERT INTO communities (id, name, username, image, bio, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {COMMUNITY_COLUMNS}
            "#
        ))
        .bind(&params.id)
        .bind(&name)
        .bind(&username)
        .bind(&params.image)
        .bind(&params.bio)
        .bind(&params.created_by_id)
        .fetch_one(pool)
        .await
        .map_err(|e| match StoreError::from(e) {
            StoreError::NotFound { .. } => {
                StoreError::not_found("user", params.created_by_id.as_str())
            }
            other => other,
        })?;

        info!("Community created");
        Ok(community)
    }

    /// Get a community record by id.
    pub async fn fetch_community(&self, community_id: &str) -> StoreResult<Option<Community>> {
        let pool = self.db.pool().await?;

        let community = sqlx::query_as::<_, Community>(&format!(
            "SELECT {COMMUNITY_COLUMNS} FROM communities WHERE id = $1"
        ))
        .bind(community_id)
        .fetch_optional(pool)
        .await?;

        Ok(community)
    }

    async fn require_community(&self, community_id: &str) -> StoreResult<Community> {
        self.fetch_community(community_id)
            .await?
            .ok_or_else(|| StoreError::not_found("community", community_id))
    }

    async fn require_user(&self, user_id: &str) -> StoreResult<()> {
        let pool = self.db.pool().await?;

        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
                .bind(user_id)
                .fetch_one(pool)
                .await?;

        if exists {
            Ok(())
        } else {
            Err(StoreError::not_found("user", user_id))
        }
    }

    /// Add a user to a community's members.
    ///
    /// Fails with `AlreadyExists` when the user is already a member.
    #[instrument(skip(self))]
    pub async fn add_member_to_community(
        &self,
        community_id: &str,
        member_id: &str,
    ) -> StoreResult<Community> {
        let community = self.require_community(community_id).await?;
        self.require_user(member_id).await?;
        let pool = self.db.pool().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO community_members (community_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (community_id, user_id) DO NOTHING
            "#,
        )
        .bind(community_id)
        .bind(member_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists {
                resource: "membership",
                detail: format!("user '{member_id}' is already a member of '{community_id}'"),
            });
        }

        Ok(community)
    }

    /// Remove a user from a community. Returns whether a membership existed.
    #[instrument(skip(self))]
    pub async fn remove_user_from_community(
        &self,
        user_id: &str,
        community_id: &str,
    ) -> StoreResult<bool> {
        self.require_user(user_id).await?;
        self.require_community(community_id).await?;
        let pool = self.db.pool().await?;

        let result =
            sqlx::query("DELETE FROM community_members WHERE community_id = $1 AND user_id = $2")
                .bind(community_id)
                .bind(user_id)
                .execute(pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Update a community's name, handle and image.
    #[instrument(skip(self, image))]
    pub async fn update_community_info(
        &self,
        community_id: &str,
        name: &str,
        username: &str,
        image: &str,
    ) -> StoreResult<Community> {
        let name = required(name, "name", MAX_NAME_LEN)?;
        let username = required(username, "username", MAX_NAME_LEN)?;
        let pool = self.db.pool().await?;

        sqlx::query_as::<_, Community>(&format!(
            r#"
            UPDATE communities
            SET name = $2, username = $3, image = $4
            WHERE id = $1
            RETURNING {COMMUNITY_COLUMNS}
            "#
        ))
        .bind(community_id)
        .bind(&name)
        .bind(&username)
        .bind(image)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::not_found("community", community_id))
    }

    /// Community with creator and members populated.
    #[instrument(skip(self))]
    pub async fn fetch_community_details(
        &self,
        community_id: &str,
    ) -> StoreResult<Option<CommunityDetails>> {
        let Some(community) = self.fetch_community(community_id).await? else {
            return Ok(None);
        };
        let pool = self.db.pool().await?;

        let creator = sqlx::query_as::<_, MemberSummary>(
            "SELECT id, name, username, image FROM users WHERE id = $1",
        )
        .bind(&community.created_by)
        .fetch_one(pool)
        .await?;

        let mut members = self.members_of(&[community.id.clone()]).await?;
        let members = members.remove(&community.id).unwrap_or_default();

        Ok(Some(CommunityDetails {
            community,
            creator,
            members,
        }))
    }

    /// Community with its top-level threads, newest first, each with one
    /// level of replies.
    #[instrument(skip(self))]
    pub async fn fetch_community_posts(
        &self,
        community_id: &str,
    ) -> StoreResult<Option<CommunityPosts>> {
        let Some(community) = self.fetch_community(community_id).await? else {
            return Ok(None);
        };
        let pool = self.db.pool().await?;

        let rows = sqlx::query_as::<_, ThreadAuthorRow>(&format!(
            r#"
            SELECT {THREAD_WITH_AUTHOR_COLUMNS}
            FROM threads t
            JOIN users u ON u.id = t.author_id
            WHERE t.community_id = $1 AND t.parent_id IS NULL
            ORDER BY t.created_at DESC, t.id
            "#
        ))
        .bind(community_id)
        .fetch_all(pool)
        .await?;

        let threads = with_replies(pool, rows, LIST_REPLY_DEPTH).await?;
        Ok(Some(CommunityPosts { community, threads }))
    }

    /// List communities, optionally filtered by a case-insensitive substring
    /// of name or handle, each with its members.
    #[instrument(skip_all, fields(page = params.page_number, per_page = params.page_size))]
    pub async fn fetch_communities(
        &self,
        params: FetchCommunitiesParams,
    ) -> StoreResult<Paginated<CommunityWithMembers>> {
        let page = Pagination::new(params.page_number, params.page_size);
        let pattern = SearchTerm::parse(&params.search_string).map(|t| t.like_pattern());
        let pool = self.db.pool().await?;

        let rows = sqlx::query(&format!(
            r#"
            SELECT {COMMUNITY_COLUMNS}, COUNT(*) OVER() AS total
            FROM communities
            WHERE ($1::text IS NULL OR name ILIKE $1 OR username ILIKE $1)
            ORDER BY created_at {order}, id
            LIMIT $2 OFFSET $3
            "#,
            order = params.sort_by.as_sql(),
        ))
        .bind(pattern)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(pool)
        .await?;

        let (communities, total) = decode_counted::<Community>(&rows)?;
        let ids: Vec<String> = communities.iter().map(|c| c.id.clone()).collect();
        let mut members = self.members_of(&ids).await?;

        Ok(page.wrap(communities, total).map(|community| {
            let members = members.remove(&community.id).unwrap_or_default();
            CommunityWithMembers { community, members }
        }))
    }

    /// Delete a community. Its memberships and threads (with their replies)
    /// go with it.
    #[instrument(skip(self))]
    pub async fn delete_community(&self, community_id: &str) -> StoreResult<Community> {
        let pool = self.db.pool().await?;

        let community = sqlx::query_as::<_, Community>(&format!(
            "DELETE FROM communities WHERE id = $1 RETURNING {COMMUNITY_COLUMNS}"
        ))
        .bind(community_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::not_found("community", community_id))?;

        info!("Community deleted");
        Ok(community)
    }

    /// Members of each given community, in join order.
    async fn members_of(
        &self,
        community_ids: &[String],
    ) -> StoreResult<HashMap<String, Vec<MemberSummary>>> {
        let mut grouped: HashMap<String, Vec<MemberSummary>> = HashMap::new();
        if community_ids.is_empty() {
            return Ok(grouped);
        }
        let pool = self.db.pool().await?;

        let rows = sqlx::query_as::<_, MembershipRow>(
            r#"
            SELECT m.community_id, u.id, u.name, u.username, u.image
            FROM community_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.community_id = ANY($1)
            ORDER BY m.joined_at, u.id
            "#,
        )
        .bind(community_ids)
        .fetch_all(pool)
        .await?;

        for row in rows {
            grouped.entry(row.community_id).or_default().push(row.member);
        }
        Ok(grouped)
    }
}

//! Community records and populated community views

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::thread::ThreadWithReplies;
use super::user::MemberSummary;

/// Community record from database
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Community {
    pub id: String,
    pub name: String,
    pub username: String,
    pub image: String,
    pub bio: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Community with its creator and members populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityDetails {
    #[serde(flatten)]
    pub community: Community,
    pub creator: MemberSummary,
    pub members: Vec<MemberSummary>,
}

/// Community with its threads populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityPosts {
    #[serde(flatten)]
    pub community: Community,
    pub threads: Vec<ThreadWithReplies>,
}

/// Listing entry: community plus its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunityWithMembers {
    #[serde(flatten)]
    pub community: Community,
    pub members: Vec<MemberSummary>,
}

/// Member row tagged with the community it belongs to.
#[derive(Debug, Clone, FromRow)]
pub struct MembershipRow {
    pub community_id: String,
    #[sqlx(flatten)]
    pub member: MemberSummary,
}

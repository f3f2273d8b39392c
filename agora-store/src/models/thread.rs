//! Thread records, reply text validation and populated thread views

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::user::{AuthorSummary, UserSummary};
use super::validation::{required, ValidationError};

/// Maximum length for thread and reply bodies
const MAX_TEXT_LEN: usize = 5000;

/// Reply levels populated by `fetch_thread_by_id`
pub const DETAIL_REPLY_DEPTH: u32 = 2;

/// Reply levels populated by list views
pub const LIST_REPLY_DEPTH: u32 = 1;

/// Validated thread body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadText(String);

impl ThreadText {
    /// Create a thread body.
    ///
    /// # Rules
    /// - Non-empty (after trimming whitespace)
    /// - Max 5000 characters
    ///
    /// # Example
    /// ```
    /// use agora_store::models::ThreadText;
    ///
    /// assert!(ThreadText::new("hello world").is_ok());
    /// assert!(ThreadText::new("   ").is_err());
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        required(s, "text", MAX_TEXT_LEN).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ThreadText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Thread record from database. A reply is a thread with `parent_id` set.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Thread {
    pub id: Uuid,
    pub text: String,
    pub author_id: String,
    pub community_id: Option<String>,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Thread {
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Thread row joined with its author's summary fields.
#[derive(Debug, Clone, FromRow)]
pub struct ThreadAuthorRow {
    #[sqlx(flatten)]
    pub thread: Thread,
    pub author_username: String,
    pub author_name: String,
    pub author_image: String,
}

impl ThreadAuthorRow {
    pub fn into_parts(self) -> (Thread, UserSummary) {
        let author = UserSummary {
            id: self.thread.author_id.clone(),
            username: self.author_username,
            name: self.author_name,
            image: self.author_image,
        };
        (self.thread, author)
    }
}

/// Reply row from the recursive reply query.
#[derive(Debug, Clone, FromRow)]
pub struct ReplyRow {
    #[sqlx(flatten)]
    pub thread: Thread,
    pub author_name: String,
    pub author_image: String,
    /// Direct replies to this reply, populated or not
    pub reply_count: i64,
}

/// A reply with its author and, down to the populated depth, its own replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyNode {
    #[serde(flatten)]
    pub thread: Thread,
    pub author: AuthorSummary,
    pub reply_count: i64,
    pub children: Vec<ReplyNode>,
}

/// Thread with populated author and reply tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadWithReplies {
    #[serde(flatten)]
    pub thread: Thread,
    pub author: UserSummary,
    pub children: Vec<ReplyNode>,
}

/// Single-thread view: two reply levels populated.
pub type ThreadDetail = ThreadWithReplies;

/// A user's profile summary and their top-level threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileThreads {
    pub user: UserSummary,
    pub threads: Vec<ThreadWithReplies>,
}

/// A reply by someone else to one of the user's threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityItem {
    #[serde(flatten)]
    pub reply: Thread,
    pub author: AuthorSummary,
}

/// Reply row joined with author, for activity listings.
#[derive(Debug, Clone, FromRow)]
pub struct ActivityRow {
    #[sqlx(flatten)]
    pub reply: Thread,
    pub author_name: String,
    pub author_image: String,
}

impl From<ActivityRow> for ActivityItem {
    fn from(row: ActivityRow) -> Self {
        let author = AuthorSummary {
            id: row.reply.author_id.clone(),
            name: row.author_name,
            image: row.author_image,
        };
        Self {
            reply: row.reply,
            author,
        }
    }
}

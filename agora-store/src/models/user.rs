//! User records, profile projections and username validation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::validation::required;
use super::ValidationError;

/// Maximum length for usernames
const MAX_USERNAME_LEN: usize = 64;

/// Username, always stored lowercased
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    /// Create a new username, lowercasing it.
    ///
    /// # Rules
    /// - Non-empty after trimming
    /// - Max 64 characters
    ///
    /// Uniqueness is left to the database.
    ///
    /// # Example
    /// ```
    /// use agora_store::models::Username;
    ///
    /// assert_eq!(Username::new("Ada_L").unwrap().as_str(), "ada_l");
    /// assert_eq!(Username::new("José").unwrap().as_str(), "josé");
    /// assert!(Username::new("").is_err());
    /// ```
    pub fn new(s: &str) -> Result<Self, ValidationError> {
        required(&s.to_lowercase(), "username", MAX_USERNAME_LEN).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Full user profile.
///
/// `thread_ids` and `community_ids` are derived from the threads and
/// memberships tables; they are never written directly.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub name: String,
    pub bio: String,
    pub image: String,
    pub onboarded: bool,
    pub created_at: DateTime<Utc>,
    /// Top-level threads authored by this user, oldest first
    pub thread_ids: Vec<Uuid>,
    /// Communities joined or created by this user
    pub community_ids: Vec<String>,
}

/// Author projection used at the root of a thread.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
    pub name: String,
    pub image: String,
}

/// Minimal author projection used for replies.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: String,
    pub name: String,
    pub image: String,
}

/// Profile fields shown in member lists.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct MemberSummary {
    pub id: String,
    pub name: String,
    pub username: String,
    pub image: String,
}

impl From<UserSummary> for AuthorSummary {
    fn from(user: UserSummary) -> Self {
        Self {
            id: user.id,
            name: user.name,
            image: user.image,
        }
    }
}

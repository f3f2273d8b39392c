//! Schema migrations
//!
//! Every statement is idempotent, so `run` is safe on every startup.
//! Constraint names are table-prefixed; error classification relies on it.

use sqlx::PgPool;

use crate::error::StoreResult;

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL,
        name TEXT NOT NULL,
        bio TEXT NOT NULL DEFAULT '',
        image TEXT NOT NULL DEFAULT '',
        onboarded BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
        CONSTRAINT users_username_key UNIQUE (username)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS communities (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        username TEXT NOT NULL,
        image TEXT NOT NULL DEFAULT '',
        bio TEXT NOT NULL DEFAULT '',
        created_by TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
        CONSTRAINT communities_username_key UNIQUE (username)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS threads (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        text TEXT NOT NULL,
        author_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        community_id TEXT REFERENCES communities(id) ON DELETE CASCADE,
        parent_id UUID REFERENCES threads(id) ON DELETE CASCADE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS community_members (
        community_id TEXT NOT NULL REFERENCES communities(id) ON DELETE CASCADE,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        joined_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
        CONSTRAINT community_members_pkey PRIMARY KEY (community_id, user_id)
    )
    "#,
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_users_created ON users(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_communities_created ON communities(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_communities_created_by ON communities(created_by)",
    "CREATE INDEX IF NOT EXISTS idx_threads_parent ON threads(parent_id)",
    "CREATE INDEX IF NOT EXISTS idx_threads_author ON threads(author_id)",
    "CREATE INDEX IF NOT EXISTS idx_threads_community ON threads(community_id)",
    r#"
    CREATE INDEX IF NOT EXISTS idx_threads_top_level
        ON threads(created_at DESC) WHERE parent_id IS NULL
    "#,
    "CREATE INDEX IF NOT EXISTS idx_community_members_user ON community_members(user_id)",
];

/// Run all migrations
pub async fn run(pool: &PgPool) -> StoreResult<()> {
    tracing::info!("Running agora migrations...");

    for statement in TABLES.iter().chain(INDEXES) {
        sqlx::query(*statement).execute(pool).await?;
    }

    tracing::info!("Agora migrations complete");
    Ok(())
}

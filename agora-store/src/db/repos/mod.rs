//! Repository implementations for database access
//!
//! Each repository follows these patterns:
//! - Relations are read back from foreign keys, never stored twice
//! - Thread lists populate replies in one recursive query (no N+1)
//! - Duplicate inserts are caught by constraints, not check-then-insert
//! - Transactions where a write depends on a row staying put

mod populate;

pub mod communities;
pub mod threads;
pub mod users;

pub use communities::{CommunityRepo, CreateCommunityParams, FetchCommunitiesParams};
pub use threads::{CreateThreadParams, ThreadRepo};
pub use users::{FetchUsersParams, UpdateUserParams, UserRepo};

//! agora-store: data access for a threaded community forum
//!
//! Users, threads with nested replies, and communities with members, stored
//! in PostgreSQL. Page handlers go through [`Store`], which hands out one
//! repository per aggregate and signals stale routes through a
//! [`Revalidate`] implementation.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod revalidate;
pub mod store;

pub use config::{load_dotenv, ConfigError, StoreConfig};
pub use db::{
    CommunityRepo, CreateCommunityParams, CreateThreadParams, Database, FetchCommunitiesParams,
    FetchUsersParams, ThreadRepo, UpdateUserParams, UserRepo,
};
pub use error::{ErrorKind, StoreError, StoreResult};
pub use models::*;
pub use revalidate::{NoopRevalidator, RecordingRevalidator, Revalidate, TracingRevalidator};
pub use store::Store;

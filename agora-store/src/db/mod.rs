//! Database layer - connection lifecycle, schema and repositories
//!
//! # Design Principles
//!
//! - One lazily opened pool per [`Database`] (default 5 connections)
//! - Every relation has a single source of truth in the schema
//! - Rely on DB constraints and classify their violations
//! - Transactions for multi-step operations

pub mod migrations;
pub mod pool;
pub mod repos;

pub use pool::{create_pool, Database};
pub use repos::*;

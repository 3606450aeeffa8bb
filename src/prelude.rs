//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and traits,
//! allowing users to get started quickly with a single import.
//!
//! # Usage
//!
//! ```rust,ignore
//! use reactive_repository::prelude::*;
//! ```
//!
//! # What's Included
//!
//! ## Core Traits
//!
//! - [`Entity`] / [`Identifier`]: Persistable types and their keys
//! - [`ReactiveRepository`]: Base contract every repository trait extends
//! - [`ReactiveSession`]: Async accessor generated repositories delegate to
//! - [`FromSession`]: Single-dependency constructor of generated repositories
//!
//! ## Sessions
//!
//! - [`MemorySession`]: In-process session
//! - [`SledSession`]: sled-backed session (`sled` feature)
//!
//! ## Macros
//!
//! - `#[reactive_repositories]`: Generate implementations for every contract in a module
//! - `#[derive(Entity)]`: Implement [`Entity`] for a struct
//! - `#[repository]` / `#[query]`: Contract and declared-query markers

pub use crate::config::{MemoryConfig, SledConfig};
pub use crate::databases::MemorySession;
#[cfg(feature = "sled")]
pub use crate::databases::SledSession;
pub use crate::error::{SessionError, SessionResult};
pub use crate::query::{
    Comparator, Condition, Direction, Filter, Operand, Order, Pagination, Query, Sort,
};
pub use crate::traits::{
    Entity, FromSession, Identifier, ReactiveRepository, ReactiveSession, RepoFuture,
    RepositoryDescriptor,
};
pub use crate::value::Value;
pub use reactive_repository_macros::{Entity, query, reactive_repositories, repository};

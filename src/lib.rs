//! # Reactive Repository
//!
//! Repository traits in, async implementations out. Declare a repository
//! contract over an entity and let the build-time generator write the
//! implementation, wired to a [`ReactiveSession`](traits::session::ReactiveSession).
//! Nothing is discovered at runtime: every method is resolved, and every
//! unsupported declaration rejected, while the crate compiles.
//!
//! ## Features
//!
//! - **Baseline CRUD**: `find_by_id`, `save`, `delete_by_id`, `find_all` for every contract
//! - **Derived queries**: `find_by_email`, `count_by_age_greater_than`,
//!   `find_top_3_by_active_true_order_by_name_desc`, ...
//! - **Declared queries**: `#[query("last_name = :last_name order by first_name")]`
//! - **Sessions**: in-memory and sled-backed reference sessions
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use reactive_repository::prelude::*;
//!
//! #[reactive_repositories]
//! mod repositories {
//!     use super::*;
//!
//!     #[derive(Entity, Clone, Debug, serde::Serialize, serde::Deserialize)]
//!     pub struct User {
//!         #[id]
//!         pub id: Option<u64>,
//!         pub email: String,
//!     }
//!
//!     pub trait UserRepository: ReactiveRepository<User, u64> {
//!         fn find_by_email(&self, email: &str) -> RepoFuture<'_, Option<User>>;
//!     }
//! }
//!
//! use repositories::*;
//!
//! let users = UserRepositoryImpl::new(Arc::new(MemorySession::new()));
//! let saved = users.save(User { id: None, email: "a@example.com".into() }).await?;
//! let found = users.find_by_email("a@example.com").await?;
//! ```

extern crate self as reactive_repository;

pub mod config;
pub mod databases;
pub mod error;
pub mod prelude;
pub mod query;
pub mod traits;
pub mod value;

pub use error::{SessionError, SessionResult};
pub use reactive_repository_macros::{Entity, query, reactive_repositories, repository};
pub use traits::session;
pub use traits::{Entity, Identifier, ReactiveRepository, ReactiveSession, RepoFuture};

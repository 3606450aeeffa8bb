pub mod model;
pub mod repository;
pub mod session;

// Re-export commonly used types
pub use model::{Entity, Identifier};
pub use repository::{
    FromSession, OperationDescriptor, OperationKind, ReactiveRepository, RepoFuture,
    RepositoryDescriptor,
};
pub use session::ReactiveSession;

use std::sync::Arc;

use futures::future::BoxFuture;
use strum::{AsRefStr, Display};

use crate::error::SessionResult;
use crate::query::Query;
use crate::traits::model::{Entity, Identifier};

/// Future returned by every repository operation.
pub type RepoFuture<'a, T> = BoxFuture<'a, SessionResult<T>>;

/// Base contract every repository trait extends.
///
/// Declaring `trait UserRepository: ReactiveRepository<User, u64>` is what
/// makes a trait a repository contract. The first four required methods are
/// the baseline CRUD set; the generator implements them for every contract,
/// forwarding to the contract's own declaration when it redeclares one.
/// [`select`](Self::select) runs an ad-hoc [`Query`], which is how default
/// methods on a contract reach the session. The provided methods are built
/// on top of these.
pub trait ReactiveRepository<E, Id>: Send + Sync
where
    E: Entity<Id = Id>,
    Id: Identifier,
{
    fn find_by_id(&self, id: Id) -> RepoFuture<'_, Option<E>>;

    fn save(&self, entity: E) -> RepoFuture<'_, E>;

    fn delete_by_id(&self, id: Id) -> RepoFuture<'_, ()>;

    fn find_all(&self) -> RepoFuture<'_, Vec<E>>;

    fn select(&self, query: Query) -> RepoFuture<'_, Vec<E>>;

    /// First row of `query`, which is limited to one result.
    fn select_one(&self, query: Query) -> RepoFuture<'_, Option<E>> {
        let rows = self.select(query.with_limit(1));
        Box::pin(async move { SessionResult::Ok(rows.await?.into_iter().next()) })
    }

    fn entity_name(&self) -> &'static str {
        E::NAME
    }

    fn exists_by_id(&self, id: Id) -> RepoFuture<'_, bool> {
        let found = self.find_by_id(id);
        Box::pin(async move { SessionResult::Ok(found.await?.is_some()) })
    }

    /// `false` for entities that were never persisted.
    fn exists(&self, entity: &E) -> RepoFuture<'_, bool> {
        match entity.id() {
            Some(id) => self.exists_by_id(id),
            None => Box::pin(async { SessionResult::Ok(false) }),
        }
    }

    fn save_all(&self, entities: Vec<E>) -> RepoFuture<'_, Vec<E>> {
        Box::pin(async move {
            let mut saved = Vec::with_capacity(entities.len());
            for entity in entities {
                saved.push(self.save(entity).await?);
            }
            SessionResult::Ok(saved)
        })
    }

    fn delete(&self, entity: &E) -> RepoFuture<'_, ()> {
        match entity.id() {
            Some(id) => self.delete_by_id(id),
            None => Box::pin(async { SessionResult::Ok(()) }),
        }
    }

    fn delete_all(&self, entities: Vec<E>) -> RepoFuture<'_, ()> {
        Box::pin(async move {
            for id in entities.iter().filter_map(Entity::id) {
                self.delete_by_id(id).await?;
            }
            SessionResult::Ok(())
        })
    }
}

/// Single-dependency constructor implemented by every generated repository.
pub trait FromSession<S> {
    fn from_session(session: Arc<S>) -> Self;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum OperationKind {
    Baseline,
    PassThrough,
    Convention,
    Declared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub name: &'static str,
    pub kind: OperationKind,
}

/// Build-time facts about a generated repository.
pub trait RepositoryDescriptor {
    /// Name of the contract trait this type implements
    const CONTRACT: &'static str;

    /// Entity type name as written in the contract binding
    const ENTITY: &'static str;

    /// Resolved operations in emission order
    const OPERATIONS: &'static [OperationDescriptor];

    fn operation(name: &str) -> Option<&'static OperationDescriptor> {
        Self::OPERATIONS.iter().find(|op| op.name == name)
    }
}

//! The asynchronous session contract generated repositories delegate to.

use async_trait::async_trait;

use crate::error::SessionResult;
use crate::query::Query;
use crate::traits::model::Entity;

/// Asynchronous entity accessor.
///
/// Every generated repository holds one `Arc<S>` where `S: ReactiveSession`
/// and forwards each operation to the primitive below that produces its
/// return shape. Implementations decide their own persistence semantics;
/// the reference sessions assign identifiers to new entities and upsert
/// entities that already carry one.
///
/// A session is treated as exclusively owned per logical unit of work unless
/// the implementation documents otherwise. Both sessions shipped with this
/// crate are safe to share.
#[async_trait]
pub trait ReactiveSession: Send + Sync + 'static {
    /// Look up an entity by identifier. A missing entity is `Ok(None)`.
    async fn find<E: Entity>(&self, id: &E::Id) -> SessionResult<Option<E>>;

    /// Insert or update an entity, returning the stored state.
    async fn persist<E: Entity>(&self, entity: E) -> SessionResult<E>;

    /// Remove an entity by identifier, reporting whether it existed.
    async fn remove<E: Entity>(&self, id: &E::Id) -> SessionResult<bool>;

    /// Every stored entity of type `E`, in key order.
    async fn find_all<E: Entity>(&self) -> SessionResult<Vec<E>>;

    /// Entities matching `query`, ordered and paged as requested.
    async fn select<E: Entity>(&self, query: &Query) -> SessionResult<Vec<E>>;

    async fn count<E: Entity>(&self, query: &Query) -> SessionResult<u64> {
        Ok(self.select::<E>(query).await?.len() as u64)
    }

    async fn exists<E: Entity>(&self, query: &Query) -> SessionResult<bool> {
        let first = query.clone().with_limit(1);
        Ok(!self.select::<E>(&first).await?.is_empty())
    }

    /// Remove every entity matching `query`, returning how many were removed.
    async fn delete_where<E: Entity>(&self, query: &Query) -> SessionResult<u64> {
        let mut removed = 0;
        for entity in self.select::<E>(query).await? {
            if let Some(id) = entity.id()
                && self.remove::<E>(&id).await?
            {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn flush(&self) -> SessionResult<()> {
        Ok(())
    }
}

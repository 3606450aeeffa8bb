use std::path::Path;

use async_trait::async_trait;

use crate::config::SledConfig;
use crate::databases::codec;
use crate::error::{SessionError, SessionResult};
use crate::query::Query;
use crate::traits::model::{Entity, Identifier};
use crate::traits::session::ReactiveSession;

/// Session backed by a sled database.
///
/// Each entity type lives in its own tree named after [`Entity::NAME`]; keys
/// are [`Identifier::to_key`] bytes and values are bincode-encoded entities.
/// New identifiers come from sled's monotonic id generator, so they are
/// unique across entity types within one database.
pub struct SledSession {
    db: sled::Db,
    flush_on_write: bool,
}

impl SledSession {
    /// Open a SledSession at the given path
    pub fn new<P: AsRef<Path>>(path: P) -> SessionResult<Self> {
        Self::open(SledConfig::new(path.as_ref()))
    }

    pub fn open(config: SledConfig) -> SessionResult<Self> {
        let db = sled::Config::new()
            .path(&config.path)
            .temporary(config.temporary)
            .cache_capacity(config.cache_capacity_bytes)
            .flush_every_ms(config.flush_every_ms)
            .open()?;
        log::debug!("opened sled session at {}", config.path.display());
        Ok(Self {
            db,
            flush_on_write: config.flush_on_write,
        })
    }

    /// Create an in-memory SledSession (useful for testing)
    pub fn temp() -> SessionResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self {
            db,
            flush_on_write: false,
        })
    }

    /// Get direct access to the underlying sled database
    pub fn db(&self) -> &sled::Db {
        &self.db
    }

    fn tree<E: Entity>(&self) -> SessionResult<sled::Tree> {
        Ok(self.db.open_tree(E::NAME)?)
    }

    fn rows<E: Entity>(&self) -> SessionResult<Vec<E>> {
        self.tree::<E>()?
            .iter()
            .values()
            .map(|value| codec::decode(&value?))
            .collect()
    }

    async fn written(&self, tree: &sled::Tree) -> SessionResult<()> {
        if self.flush_on_write {
            tree.flush_async().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ReactiveSession for SledSession {
    async fn find<E: Entity>(&self, id: &E::Id) -> SessionResult<Option<E>> {
        match self.tree::<E>()?.get(id.to_key())? {
            Some(value) => Ok(Some(codec::decode(&value)?)),
            None => Ok(None),
        }
    }

    async fn persist<E: Entity>(&self, entity: E) -> SessionResult<E> {
        let mut entity = entity;
        let tree = self.tree::<E>()?;

        let key = match entity.id() {
            Some(id) => id.to_key(),
            None => {
                let id = loop {
                    let sequence = self.db.generate_id()? + 1;
                    let candidate = E::Id::from_sequence(sequence)
                        .ok_or(SessionError::IdentifierExhausted { entity: E::NAME })?;
                    if !tree.contains_key(candidate.to_key())? {
                        break candidate;
                    }
                };
                log::trace!("assigned {:?} to new {}", id, E::NAME);
                entity.assign_id(id.clone());
                id.to_key()
            }
        };

        tree.insert(key, codec::encode(&entity)?)?;
        self.written(&tree).await?;
        Ok(entity)
    }

    async fn remove<E: Entity>(&self, id: &E::Id) -> SessionResult<bool> {
        let tree = self.tree::<E>()?;
        let existed = tree.remove(id.to_key())?.is_some();
        if existed {
            self.written(&tree).await?;
        }
        Ok(existed)
    }

    async fn find_all<E: Entity>(&self) -> SessionResult<Vec<E>> {
        self.rows()
    }

    async fn select<E: Entity>(&self, query: &Query) -> SessionResult<Vec<E>> {
        Ok(query.apply(self.rows::<E>()?))
    }

    async fn flush(&self) -> SessionResult<()> {
        self.db.flush_async().await?;
        Ok(())
    }
}

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::config::MemoryConfig;
use crate::databases::codec;
use crate::error::{SessionError, SessionResult};
use crate::query::Query;
use crate::traits::model::{Entity, Identifier};
use crate::traits::session::ReactiveSession;

/// Rows of one entity type, keyed by [`Identifier::to_key`].
#[derive(Default)]
struct MemoryTable {
    rows: BTreeMap<Vec<u8>, Vec<u8>>,
    sequence: u64,
}

/// In-process session keeping every entity as encoded bytes.
///
/// Entities are stored by value, so mutating an entity after `persist` never
/// affects the stored copy. Useful for tests and prototyping.
pub struct MemorySession {
    tables: RwLock<HashMap<&'static str, MemoryTable>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::with_config(MemoryConfig::default())
    }

    pub fn with_config(config: MemoryConfig) -> Self {
        Self {
            tables: RwLock::new(HashMap::with_capacity(config.initial_capacity)),
        }
    }

    /// Number of stored entities of type `E`
    pub fn len<E: Entity>(&self) -> usize {
        self.tables
            .read()
            .get(E::NAME)
            .map_or(0, |table| table.rows.len())
    }

    pub fn is_empty<E: Entity>(&self) -> bool {
        self.len::<E>() == 0
    }

    /// Remove every entity of type `E`
    pub fn clear<E: Entity>(&self) {
        self.tables.write().remove(E::NAME);
    }

    fn rows<E: Entity>(&self) -> SessionResult<Vec<E>> {
        let tables = self.tables.read();
        match tables.get(E::NAME) {
            Some(table) => table.rows.values().map(|bytes| codec::decode(bytes)).collect(),
            None => Ok(Vec::new()),
        }
    }
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReactiveSession for MemorySession {
    async fn find<E: Entity>(&self, id: &E::Id) -> SessionResult<Option<E>> {
        let tables = self.tables.read();
        let bytes = tables
            .get(E::NAME)
            .and_then(|table| table.rows.get(&id.to_key()));
        bytes.map(|bytes| codec::decode(bytes)).transpose()
    }

    async fn persist<E: Entity>(&self, entity: E) -> SessionResult<E> {
        let mut entity = entity;
        let mut tables = self.tables.write();
        let table = tables.entry(E::NAME).or_default();

        let key = match entity.id() {
            Some(id) => id.to_key(),
            None => {
                let id = loop {
                    table.sequence += 1;
                    let candidate = E::Id::from_sequence(table.sequence)
                        .ok_or(SessionError::IdentifierExhausted { entity: E::NAME })?;
                    if !table.rows.contains_key(&candidate.to_key()) {
                        break candidate;
                    }
                };
                log::trace!("assigned {:?} to new {}", id, E::NAME);
                entity.assign_id(id.clone());
                id.to_key()
            }
        };

        table.rows.insert(key, codec::encode(&entity)?);
        Ok(entity)
    }

    async fn remove<E: Entity>(&self, id: &E::Id) -> SessionResult<bool> {
        let mut tables = self.tables.write();
        Ok(tables
            .get_mut(E::NAME)
            .and_then(|table| table.rows.remove(&id.to_key()))
            .is_some())
    }

    async fn find_all<E: Entity>(&self) -> SessionResult<Vec<E>> {
        self.rows()
    }

    async fn select<E: Entity>(&self, query: &Query) -> SessionResult<Vec<E>> {
        Ok(query.apply(self.rows::<E>()?))
    }
}

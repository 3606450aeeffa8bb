//! Entity (de)serialization shared by the bundled sessions.

use crate::error::SessionResult;
use crate::traits::model::Entity;

pub(crate) fn encode<E: Entity>(entity: &E) -> SessionResult<Vec<u8>> {
    Ok(bincode::serde::encode_to_vec(
        entity,
        bincode::config::standard(),
    )?)
}

pub(crate) fn decode<E: Entity>(bytes: &[u8]) -> SessionResult<E> {
    let (entity, _) = bincode::serde::decode_from_slice::<E, _>(bytes, bincode::config::standard())?;
    Ok(entity)
}

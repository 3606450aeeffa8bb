use std::fmt::Debug;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::value::Value;

/// Trait for user-defined entities that a session can persist.
///
/// This trait is normally derived via `#[derive(Entity)]`. Entities must have:
/// - An identifier field, marked with `#[id]` or simply named `id`
/// - `Clone` plus serde `Serialize`/`Deserialize`, used by sessions for storage
///
/// The identifier field may be declared as `Option<Id>`. An entity whose id is
/// `None` is new: persisting it asks the session to assign one.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// The identifier type of this entity
    type Id: Identifier;

    /// Storage name of the entity (used for tree/table names)
    const NAME: &'static str;

    /// Declared property names in field order
    const PROPERTIES: &'static [&'static str];

    /// Current identifier, `None` for entities that were never persisted
    fn id(&self) -> Option<Self::Id>;

    /// Store a session-assigned identifier on the entity
    fn assign_id(&mut self, id: Self::Id);

    /// Read a property by its declared name
    fn property(&self, name: &str) -> Option<Value>;
}

/// Identifier types usable as entity keys.
pub trait Identifier:
    Clone + Debug + PartialEq + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Order-preserving key bytes
    fn to_key(&self) -> Vec<u8>;

    /// Build an identifier from a session sequence number.
    ///
    /// Returns `None` when the sequence no longer fits the identifier type.
    fn from_sequence(sequence: u64) -> Option<Self>;
}

macro_rules! impl_unsigned_identifier {
    ($($ty:ty),*) => {
        $(
            impl Identifier for $ty {
                fn to_key(&self) -> Vec<u8> {
                    self.to_be_bytes().to_vec()
                }

                fn from_sequence(sequence: u64) -> Option<Self> {
                    <$ty>::try_from(sequence).ok()
                }
            }
        )*
    };
}

macro_rules! impl_signed_identifier {
    ($($ty:ty => $unsigned:ty),*) => {
        $(
            impl Identifier for $ty {
                fn to_key(&self) -> Vec<u8> {
                    // Flipping the sign bit keeps negative keys ordered before positive ones
                    ((*self as $unsigned) ^ (1 << (<$unsigned>::BITS - 1)))
                        .to_be_bytes()
                        .to_vec()
                }

                fn from_sequence(sequence: u64) -> Option<Self> {
                    <$ty>::try_from(sequence).ok()
                }
            }
        )*
    };
}

impl_unsigned_identifier!(u8, u16, u32, u64, u128);
impl_signed_identifier!(i8 => u8, i16 => u16, i32 => u32, i64 => u64, i128 => u128);

// Pointer-sized keys use the 64-bit encoding.
impl Identifier for usize {
    fn to_key(&self) -> Vec<u8> {
        (*self as u64).to_key()
    }

    fn from_sequence(sequence: u64) -> Option<Self> {
        usize::try_from(sequence).ok()
    }
}

impl Identifier for isize {
    fn to_key(&self) -> Vec<u8> {
        (*self as i64).to_key()
    }

    fn from_sequence(sequence: u64) -> Option<Self> {
        isize::try_from(sequence).ok()
    }
}

impl Identifier for String {
    fn to_key(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    fn from_sequence(sequence: u64) -> Option<Self> {
        Some(sequence.to_string())
    }
}

impl Identifier for uuid::Uuid {
    fn to_key(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    fn from_sequence(_sequence: u64) -> Option<Self> {
        Some(uuid::Uuid::new_v4())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_keys_preserve_order() {
        let keys: Vec<Vec<u8>> = [-5i64, -1, 0, 1, 42].iter().map(Identifier::to_key).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_sequence_overflow() {
        assert_eq!(u16::from_sequence(70_000), None);
        assert_eq!(u64::from_sequence(7), Some(7));
        assert_eq!(u8::from_sequence(255), Some(255));
        assert_eq!(u8::from_sequence(256), None);
        assert_eq!(i8::from_sequence(128), None);
        assert_eq!(usize::from_sequence(9), Some(9));
    }

    #[test]
    fn test_narrow_and_pointer_sized_keys_preserve_order() {
        fn assert_ordered<I: Identifier>(ids: &[I]) {
            let keys: Vec<Vec<u8>> = ids.iter().map(Identifier::to_key).collect();
            let mut sorted = keys.clone();
            sorted.sort();
            assert_eq!(keys, sorted, "{ids:?}");
        }
        assert_ordered(&[i8::MIN, -1, 0, 1, i8::MAX]);
        assert_ordered(&[i16::MIN, -300, 0, 300, i16::MAX]);
        assert_ordered(&[0u8, 7, u8::MAX]);
        assert_ordered(&[isize::MIN, -1, 0, isize::MAX]);
        assert_ordered(&[0usize, 256, usize::MAX]);
        assert_eq!(42usize.to_key(), 42u64.to_key());
    }
}

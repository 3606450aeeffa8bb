mod codec;

pub mod memory_session;

#[cfg(feature = "sled")]
pub mod sled_session;

pub use memory_session::MemorySession;

#[cfg(feature = "sled")]
pub use sled_session::SledSession;

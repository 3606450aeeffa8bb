//! Configuration for the bundled sessions.
//!
//! This module provides a consistent configuration API across the session
//! backends using the builder pattern via `typed-builder`.

use std::path::PathBuf;
use typed_builder::TypedBuilder;

/// Configuration for the sled-backed session.
///
/// # Examples
///
/// ```
/// use reactive_repository::config::SledConfig;
///
/// // Create with defaults
/// let config = SledConfig::builder()
///     .path("repository_db")
///     .build();
///
/// // Customize options
/// let config = SledConfig::builder()
///     .path("/data/repository_db")
///     .cache_capacity_bytes(512 * 1024 * 1024)
///     .flush_on_write(true)
///     .build();
/// assert!(config.flush_on_write);
/// ```
#[derive(Debug, Clone, TypedBuilder)]
#[builder(doc)]
pub struct SledConfig {
    /// Directory holding the sled database
    #[builder(setter(into))]
    pub path: PathBuf,

    /// Delete the database when the session is dropped
    #[builder(default = false)]
    pub temporary: bool,

    /// Page cache size in bytes
    #[builder(default = 64 * 1024 * 1024)]
    pub cache_capacity_bytes: u64,

    /// Background flush interval, `None` disables periodic flushing
    #[builder(default = Some(500))]
    pub flush_every_ms: Option<u64>,

    /// Await a flush after every write (durable but slower)
    #[builder(default = false)]
    pub flush_on_write: bool,
}

impl SledConfig {
    /// Create a basic configuration with just a path
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            temporary: false,
            cache_capacity_bytes: 64 * 1024 * 1024,
            flush_every_ms: Some(500),
            flush_on_write: false,
        }
    }

    /// Create configuration for a temporary database
    pub fn temp() -> Self {
        let temp_path =
            std::env::temp_dir().join(format!("reactive_repository_{}", uuid::Uuid::new_v4()));
        Self {
            temporary: true,
            ..Self::new(temp_path)
        }
    }
}

/// Configuration for the in-memory session.
///
/// # Examples
///
/// ```
/// use reactive_repository::config::MemoryConfig;
///
/// let config = MemoryConfig::builder()
///     .initial_capacity(16)
///     .build();
/// assert_eq!(config.initial_capacity, 16);
/// ```
#[derive(Debug, Clone, TypedBuilder)]
#[builder(doc)]
pub struct MemoryConfig {
    /// Number of entity tables to reserve space for
    #[builder(default = 8)]
    pub initial_capacity: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sled_config_builder() {
        let config = SledConfig::builder()
            .path(PathBuf::from("/tmp/test_db"))
            .cache_capacity_bytes(1024)
            .flush_every_ms(None)
            .build();

        assert_eq!(config.path, PathBuf::from("/tmp/test_db"));
        assert_eq!(config.cache_capacity_bytes, 1024);
        assert_eq!(config.flush_every_ms, None);
        assert!(!config.temporary);
    }

    #[test]
    fn test_sled_config_temp() {
        let a = SledConfig::temp();
        let b = SledConfig::temp();
        assert!(a.temporary);
        assert_ne!(a.path, b.path);
    }

    #[test]
    fn test_memory_config_default() {
        let config = MemoryConfig::default();
        assert_eq!(config.initial_capacity, 8);
    }
}

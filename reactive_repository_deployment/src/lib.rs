//! # Reactive Repository Deployment
//!
//! The build-time half of `reactive_repository`. It turns repository
//! contracts into implementations in four stages:
//!
//! 1. [`TypeIndex`]: snapshot of the declarations in a module, file or set of files
//! 2. [`ContractDiscoverer`]: classifies declarations and binds entity/identifier types
//! 3. [`MethodResolver`]: explicit, derived, declared and baseline operations
//! 4. [`CodeSynthesizer`]: one implementation type per contract
//!
//! [`Generator`] runs all four. The proc-macro crate calls it for
//! `#[reactive_repositories]` modules; build scripts call
//! [`Generator::write_to`] and `include!` the result. Nothing here is linked
//! into the runtime crate.

pub mod config;
pub mod discover;
pub mod error;
pub mod generator;
pub mod index;
pub mod naming;
pub mod resolve;
pub mod synthesize;

pub use config::GeneratorConfig;
pub use discover::{Classification, ContractDiscoverer, EntityModel, RepositoryContract};
pub use error::{GenerationError, GenerationResult};
pub use generator::Generator;
pub use index::TypeIndex;
pub use resolve::{MethodResolver, ResolvedOperation};
pub use synthesize::{CodeSynthesizer, GeneratedImplementation};

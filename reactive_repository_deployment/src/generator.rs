//! The full pipeline: index -> contracts -> operations -> implementations.

use std::path::Path;

use proc_macro2::TokenStream;
use quote::quote;

use crate::config::GeneratorConfig;
use crate::discover::ContractDiscoverer;
use crate::error::{GenerationError, GenerationResult};
use crate::index::TypeIndex;
use crate::resolve::MethodResolver;
use crate::synthesize::{CodeSynthesizer, GeneratedImplementation};

const HEADER: &str = "// @generated by reactive_repository_deployment. Do not edit.\n";

/// Runs every stage once over an immutable [`TypeIndex`].
///
/// # Example
///
/// ```
/// use reactive_repository_deployment::{Generator, TypeIndex};
///
/// let file: syn::File = syn::parse_quote! {
///     pub struct User { pub id: Option<u64>, pub email: String }
///     pub trait UserRepository: ReactiveRepository<User, u64> {}
/// };
/// let generator = Generator::default();
/// let generated = generator.generate(&TypeIndex::from_file(&file).unwrap()).unwrap();
/// assert_eq!(generated[0].ident, "UserRepositoryImpl");
/// assert_eq!(generated[0].operations.len(), 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Generator {
    config: GeneratorConfig,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// One implementation per contract, in index order. Stops at the first
    /// error; no partial output is returned.
    pub fn generate(&self, index: &TypeIndex) -> GenerationResult<Vec<GeneratedImplementation>> {
        let contracts = ContractDiscoverer::new(index, &self.config).discover()?;
        let resolver = MethodResolver::new(&self.config);
        let synthesizer = CodeSynthesizer::new(&self.config);
        contracts
            .iter()
            .map(|contract| synthesizer.synthesize(contract, resolver.resolve(contract)?))
            .collect()
    }

    /// Every generated item as one token stream.
    pub fn render(&self, index: &TypeIndex) -> GenerationResult<TokenStream> {
        let generated = self.generate(index)?;
        Ok(quote!(#(#generated)*))
    }

    /// Rendered source text, prefixed with a generated-file marker.
    pub fn render_source(&self, index: &TypeIndex) -> GenerationResult<String> {
        Ok(format!("{HEADER}{}\n", self.render(index)?))
    }

    /// Index `paths` and render them in one pass.
    pub fn generate_sources<P: AsRef<Path>>(&self, paths: &[P]) -> GenerationResult<String> {
        self.render_source(&TypeIndex::from_sources(paths)?)
    }

    /// Write the rendered source for `include!` from a build script.
    ///
    /// ```rust,ignore
    /// // build.rs
    /// let out = std::path::Path::new(&std::env::var("OUT_DIR")?).join("repositories.rs");
    /// let index = TypeIndex::from_sources(&["src/models.rs"])?;
    /// Generator::default().write_to(&index, &out)?;
    /// ```
    pub fn write_to<P: AsRef<Path>>(&self, index: &TypeIndex, path: P) -> GenerationResult<()> {
        let path = path.as_ref();
        let source = self.render_source(index)?;
        std::fs::write(path, source).map_err(|source| GenerationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("wrote generated repositories to {}", path.display());
        Ok(())
    }
}

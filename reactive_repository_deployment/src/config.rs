//! Generator configuration.
//!
//! Built with `typed-builder`; every field has a default so
//! `GeneratorConfig::default()` matches the runtime crate's own names.
//! The proc-macro front-end overrides fields from the module attribute:
//!
//! ```
//! use reactive_repository_deployment::config::GeneratorConfig;
//!
//! let config = GeneratorConfig::from_attribute_args(quote::quote!(runtime = crate)).unwrap();
//! assert!(config.runtime_path.is_ident("crate"));
//! assert_eq!(config.impl_suffix, "Impl");
//! ```

use proc_macro2::TokenStream;
use syn::{LitBool, LitStr, Path, meta::ParseNestedMeta, parse::Parser};
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, TypedBuilder)]
#[builder(doc)]
pub struct GeneratorConfig {
    /// Path generated code uses to reach the runtime crate
    #[builder(default = syn::parse_quote!(::reactive_repository))]
    pub runtime_path: Path,

    /// Supertrait names that make a trait a repository contract
    #[builder(default = vec!["ReactiveRepository".to_string()])]
    pub base_contracts: Vec<String>,

    /// Attribute marking a trait as a repository contract
    #[builder(default = "repository".to_string(), setter(into))]
    pub contract_marker: String,

    /// Attribute carrying declared query text on a method
    #[builder(default = "query".to_string(), setter(into))]
    pub query_marker: String,

    /// Appended to the contract name to form the implementation name
    #[builder(default = "Impl".to_string(), setter(into))]
    pub impl_suffix: String,

    /// Emit `RepositoryDescriptor` impls for generated types
    #[builder(default = true)]
    pub emit_descriptors: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl GeneratorConfig {
    /// Parse `runtime = path, suffix = "Impl", descriptors = false` style
    /// arguments on top of the defaults.
    pub fn from_attribute_args(args: TokenStream) -> syn::Result<Self> {
        let mut config = Self::default();
        if args.is_empty() {
            return Ok(config);
        }
        syn::meta::parser(|meta| config.apply_meta(meta)).parse2(args)?;
        Ok(config)
    }

    fn apply_meta(&mut self, meta: ParseNestedMeta) -> syn::Result<()> {
        if meta.path.is_ident("runtime") {
            self.runtime_path = meta.value()?.parse()?;
        } else if meta.path.is_ident("suffix") {
            let suffix: LitStr = meta.value()?.parse()?;
            self.impl_suffix = suffix.value();
        } else if meta.path.is_ident("descriptors") {
            let emit: LitBool = meta.value()?.parse()?;
            self.emit_descriptors = emit.value;
        } else if meta.path.is_ident("base") {
            let base: LitStr = meta.value()?.parse()?;
            self.base_contracts.push(base.value());
        } else {
            return Err(meta.error("expected `runtime`, `suffix`, `descriptors` or `base`"));
        }
        Ok(())
    }

    pub(crate) fn is_base_contract(&self, name: &str) -> bool {
        self.base_contracts.iter().any(|base| base == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::{ToTokens, quote};

    #[test]
    fn test_defaults() {
        let config = GeneratorConfig::default();
        assert_eq!(
            config.runtime_path.to_token_stream().to_string(),
            quote!(::reactive_repository).to_string()
        );
        assert!(config.is_base_contract("ReactiveRepository"));
        assert_eq!(config.contract_marker, "repository");
        assert_eq!(config.query_marker, "query");
        assert_eq!(config.impl_suffix, "Impl");
        assert!(config.emit_descriptors);
    }

    #[test]
    fn test_attribute_args_override_defaults() {
        let config = GeneratorConfig::from_attribute_args(quote! {
            runtime = crate, suffix = "Repo", descriptors = false, base = "Repository"
        })
        .unwrap();
        assert_eq!(config.runtime_path.to_token_stream().to_string(), "crate");
        assert_eq!(config.impl_suffix, "Repo");
        assert!(!config.emit_descriptors);
        assert!(config.is_base_contract("Repository"));
        assert!(config.is_base_contract("ReactiveRepository"));
    }

    #[test]
    fn test_unknown_attribute_arg_is_rejected() {
        assert!(GeneratorConfig::from_attribute_args(quote!(session = Memory)).is_err());
    }
}

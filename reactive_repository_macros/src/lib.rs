use proc_macro::TokenStream;
use quote::quote;
use reactive_repository_deployment::{Generator, GeneratorConfig, TypeIndex};
use syn::{DeriveInput, ItemMod, parse_macro_input, visit_mut::VisitMut};

use crate::markers::MarkerStripper;

mod entity;
mod markers;

/// Derives `reactive_repository::Entity` for a struct with named fields.
///
/// # Attributes
///
/// - `#[id]` - Marks the identifier field. Without it a field named `id` is used
/// - `#[entity(name = "...")]` - Storage name, defaults to the struct name
/// - `#[entity(runtime = path)]` - Path to the runtime crate, defaults to `::reactive_repository`
/// - `#[entity(skip)]` - On a field, hides it from queries
///
/// An identifier declared as `Option<Id>` makes `Id` the entity's identifier
/// type and lets sessions assign one on first save.
///
/// ```ignore
/// use reactive_repository::prelude::*;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Entity, Clone, Debug, Serialize, Deserialize)]
/// #[entity(name = "users")]
/// pub struct User {
///     #[id]
///     pub id: Option<u64>,
///     pub email: String,
/// }
///
/// assert_eq!(<User as Entity>::NAME, "users");
/// ```
#[proc_macro_derive(Entity, attributes(id, entity))]
pub fn entity_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::derive_entity(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Names the entity and identifier of a repository contract.
///
/// Only needed when the contract does not extend `ReactiveRepository<E, Id>`
/// directly. This is a pass-through attribute; `#[reactive_repositories]` and
/// the build-time generator read it.
///
/// ```ignore
/// #[repository(User, u64)]
/// pub trait UserRepository: ReactiveRepository<User, u64> {}
/// ```
#[proc_macro_attribute]
pub fn repository(_args: TokenStream, input: TokenStream) -> TokenStream {
    input
}

/// Attaches a declared query to a contract method.
///
/// ```ignore
/// #[query("email = :email and active = true")]
/// fn find_active(&self, email: String) -> RepoFuture<'_, Vec<User>>;
/// ```
#[proc_macro_attribute]
pub fn query(_args: TokenStream, input: TokenStream) -> TokenStream {
    input
}

/// Generates repository implementations for every contract in a module.
///
/// The module is indexed as written, each trait extending
/// `ReactiveRepository<E, Id>` becomes a contract, and one `{Contract}Impl<S>`
/// struct per contract is appended to the module. Generation errors are
/// reported at the offending declaration.
///
/// # Arguments
///
/// - `runtime = path` - Runtime crate path, defaults to `::reactive_repository`
/// - `suffix = "..."` - Implementation name suffix, defaults to `"Impl"`
/// - `descriptors = bool` - Emit `RepositoryDescriptor` impls, defaults to `true`
/// - `base = "..."` - Another trait name to treat as the base contract
///
/// # Example
///
/// ```ignore
/// use reactive_repository::prelude::*;
///
/// #[reactive_repositories]
/// mod store {
///     use reactive_repository::prelude::*;
///     use serde::{Deserialize, Serialize};
///
///     #[derive(Entity, Clone, Debug, Serialize, Deserialize)]
///     pub struct User {
///         pub id: Option<u64>,
///         pub email: String,
///     }
///
///     pub trait UserRepository: ReactiveRepository<User, u64> {
///         fn find_by_email(&self, email: String) -> RepoFuture<'_, Option<User>>;
///     }
/// }
///
/// use std::sync::Arc;
/// let repository = store::UserRepositoryImpl::new(Arc::new(MemorySession::new()));
/// assert_eq!(repository.entity_name(), "User");
/// ```
#[proc_macro_attribute]
pub fn reactive_repositories(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut module = parse_macro_input!(input as ItemMod);
    let config = match GeneratorConfig::from_attribute_args(args.into()) {
        Ok(config) => config,
        Err(e) => return e.into_compile_error().into(),
    };

    let generated = TypeIndex::from_module(&module)
        .and_then(|index| Generator::new(config.clone()).render(&index));

    MarkerStripper::new(&config).visit_item_mod_mut(&mut module);

    match generated {
        Ok(tokens) => {
            if let Some((_, items)) = &mut module.content {
                items.push(syn::Item::Verbatim(tokens));
            }
            quote!(#module).into()
        }
        Err(e) => {
            let error = e.to_syn_error().into_compile_error();
            quote! {
                #module
                #error
            }
            .into()
        }
    }
}

//! Code synthesis.
//!
//! For a contract `UserRepository: ReactiveRepository<User, u64>` this emits
//!
//! ```rust,ignore
//! pub struct UserRepositoryImpl<S> { session: Arc<S> }
//!
//! impl<S: ReactiveSession> UserRepositoryImpl<S> { pub fn new(session: Arc<S>) -> Self { .. } }
//! impl<S: ReactiveSession> FromSession<S> for UserRepositoryImpl<S> { .. }
//! impl<S> RepositoryDescriptor for UserRepositoryImpl<S> { .. }
//! impl<S: ReactiveSession> ReactiveRepository<User, u64> for UserRepositoryImpl<S> { .. }
//! impl<S: ReactiveSession> UserRepository for UserRepositoryImpl<S> { .. }
//! ```
//!
//! Every body returns a boxed future. Parameters are turned into an owned
//! query before the future is created, so futures only borrow `self`.

mod body;
mod query;

use proc_macro2::{Ident, TokenStream};
use quote::{ToTokens, quote};
use syn::{FnArg, Signature, Type};

use crate::config::GeneratorConfig;
use crate::discover::RepositoryContract;
use crate::error::{GenerationError, GenerationResult};
use crate::naming::implementation_ident;
use crate::resolve::{Crud, OperationKind, ResolvedOperation};
use body::BodyTokens;

/// The emitted implementation of one contract.
#[derive(Debug, Clone)]
pub struct GeneratedImplementation {
    pub ident: Ident,
    pub contract: String,
    pub entity_type: Type,
    pub id_type: Type,
    pub operations: Vec<ResolvedOperation>,
    pub tokens: TokenStream,
}

impl ToTokens for GeneratedImplementation {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        self.tokens.to_tokens(tokens);
    }
}

pub struct CodeSynthesizer<'c> {
    config: &'c GeneratorConfig,
}

impl<'c> CodeSynthesizer<'c> {
    pub fn new(config: &'c GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn synthesize(
        &self,
        contract: &RepositoryContract<'_>,
        operations: Vec<ResolvedOperation>,
    ) -> GenerationResult<GeneratedImplementation> {
        let rt = &self.config.runtime_path;
        let ident = implementation_ident(&contract.declaration.ident, &self.config.impl_suffix);
        let contract_path = &contract.declaration.path;
        let entity = &contract.entity.declaration.path;
        let id = &contract.id_type;
        let bodies = BodyTokens {
            runtime: rt,
            entity,
        };

        let doc = format!(
            "Generated implementation of [`{}`] over a shared session.",
            contract.name()
        );

        let baseline = Crud::canonical()
            .map(|crud| self.baseline_method(crud, &operations, &bodies, contract_path, entity, id))
            .collect::<Vec<_>>();
        let select = bodies.select();
        let explicit = operations
            .iter()
            .filter(|operation| operation.is_explicit())
            .map(|operation| self.explicit_method(contract, operation, &bodies))
            .collect::<GenerationResult<Vec<_>>>()?;
        let descriptor = self
            .config
            .emit_descriptors
            .then(|| self.descriptor(contract, &ident, &operations));

        let tokens = quote! {
            #[doc = #doc]
            pub struct #ident<S> {
                session: ::std::sync::Arc<S>,
            }

            impl<S: #rt::ReactiveSession> #ident<S> {
                pub fn new(session: ::std::sync::Arc<S>) -> Self {
                    Self { session }
                }

                pub fn session(&self) -> &::std::sync::Arc<S> {
                    &self.session
                }
            }

            impl<S> ::core::clone::Clone for #ident<S> {
                fn clone(&self) -> Self {
                    Self {
                        session: ::std::sync::Arc::clone(&self.session),
                    }
                }
            }

            impl<S: #rt::ReactiveSession> #rt::traits::FromSession<S> for #ident<S> {
                fn from_session(session: ::std::sync::Arc<S>) -> Self {
                    Self::new(session)
                }
            }

            #descriptor

            impl<S: #rt::ReactiveSession> #rt::ReactiveRepository<#entity, #id> for #ident<S> {
                #(#baseline)*

                fn select(
                    &self,
                    query: #rt::query::Query,
                ) -> #rt::RepoFuture<'_, ::std::vec::Vec<#entity>> {
                    #select
                }
            }

            impl<S: #rt::ReactiveSession> #contract_path for #ident<S> {
                #(#explicit)*
            }
        };

        log::info!(
            "generated {} for {} with {} operations",
            ident,
            contract.name(),
            operations.len()
        );
        Ok(GeneratedImplementation {
            ident,
            contract: contract.name(),
            entity_type: contract.entity_type.clone(),
            id_type: contract.id_type.clone(),
            operations,
            tokens,
        })
    }

    /// Implements one `ReactiveRepository` method: either the baseline body
    /// or a forward to the contract's own declaration.
    fn baseline_method(
        &self,
        crud: Crud,
        operations: &[ResolvedOperation],
        bodies: &BodyTokens<'_>,
        contract_path: &syn::Path,
        entity: &syn::Path,
        id: &Type,
    ) -> TokenStream {
        let rt = &self.config.runtime_path;
        let passed_through = operations
            .iter()
            .any(|operation| operation.kind == OperationKind::PassThrough(crud));
        let name = quote::format_ident!("{}", crud.name());
        let (signature, args) = match crud {
            Crud::FindById => (
                quote!(fn find_by_id(&self, id: #id) -> #rt::RepoFuture<'_, ::core::option::Option<#entity>>),
                quote!(id),
            ),
            Crud::Save => (
                quote!(fn save(&self, entity: #entity) -> #rt::RepoFuture<'_, #entity>),
                quote!(entity),
            ),
            Crud::DeleteById => (
                quote!(fn delete_by_id(&self, id: #id) -> #rt::RepoFuture<'_, ()>),
                quote!(id),
            ),
            Crud::FindAll => (
                quote!(fn find_all(&self) -> #rt::RepoFuture<'_, ::std::vec::Vec<#entity>>),
                TokenStream::new(),
            ),
        };
        let body = if passed_through {
            quote!(<Self as #contract_path>::#name(self, #args))
        } else {
            let param = match crud {
                Crud::FindAll => None,
                Crud::Save => Some(quote::format_ident!("entity")),
                _ => Some(quote::format_ident!("id")),
            };
            bodies.crud(crud, param.as_ref())
        };
        quote! {
            #signature {
                #body
            }
        }
    }

    fn explicit_method(
        &self,
        contract: &RepositoryContract<'_>,
        operation: &ResolvedOperation,
        bodies: &BodyTokens<'_>,
    ) -> GenerationResult<TokenStream> {
        let signature = implementation_signature(operation);
        let body = match &operation.kind {
            OperationKind::PassThrough(crud) | OperationKind::Baseline(crud) => {
                Some(bodies.crud(*crud, operation.params.first().map(|param| &param.name)))
            }
            OperationKind::Convention(query) => bodies.query(operation, query.subject, &query.plan),
            OperationKind::Declared(query) => bodies.query(operation, query.subject, &query.plan),
        };
        let body = body.ok_or_else(|| GenerationError::OperationSynthesis {
            contract: contract.name(),
            method: operation.name.to_string(),
            detail: format!("no session primitive produces a {:?} result", operation.shape),
            span: operation.span(),
        })?;
        Ok(quote! {
            #signature {
                #body
            }
        })
    }

    fn descriptor(
        &self,
        contract: &RepositoryContract<'_>,
        ident: &Ident,
        operations: &[ResolvedOperation],
    ) -> TokenStream {
        let rt = &self.config.runtime_path;
        let contract_name = contract.name();
        let entity_name = contract.entity.declaration.name();
        let entries = operations.iter().map(|operation| {
            let name = operation.name.to_string();
            let kind = quote::format_ident!("{}", operation.kind.runtime_variant());
            quote! {
                #rt::traits::OperationDescriptor {
                    name: #name,
                    kind: #rt::traits::OperationKind::#kind,
                }
            }
        });
        quote! {
            impl<S> #rt::traits::RepositoryDescriptor for #ident<S> {
                const CONTRACT: &'static str = #contract_name;
                const ENTITY: &'static str = #entity_name;
                const OPERATIONS: &'static [#rt::traits::OperationDescriptor] = &[#(#entries),*];
            }
        }
    }
}

/// The declared signature with every parameter bound to a plain identifier.
fn implementation_signature(operation: &ResolvedOperation) -> TokenStream {
    let Some(signature) = &operation.signature else {
        return TokenStream::new();
    };
    let mut signature: Signature = signature.clone();
    let typed = signature.inputs.iter_mut().filter_map(|input| match input {
        FnArg::Typed(typed) => Some(typed),
        FnArg::Receiver(_) => None,
    });
    for (typed, param) in typed.zip(&operation.params) {
        let name = &param.name;
        typed.attrs.clear();
        *typed.pat = syn::parse_quote!(#name);
    }
    signature.to_token_stream()
}

//! Method bodies delegating to the session.

use proc_macro2::{Ident, TokenStream};
use quote::{ToTokens, quote};
use syn::{Path, Type};

use super::query::QueryTokens;
use crate::resolve::{Crud, QueryPlan, ResolvedOperation, ReturnShape, Subject};

pub(crate) struct BodyTokens<'a> {
    pub runtime: &'a Path,
    pub entity: &'a Path,
}

impl BodyTokens<'_> {
    fn session_call(&self, primitive: &str, args: TokenStream) -> TokenStream {
        let rt = self.runtime;
        let entity = self.entity;
        let primitive = quote::format_ident!("{}", primitive);
        quote!(<S as #rt::ReactiveSession>::#primitive::<#entity>(session, #args))
    }

    fn boxed(&self, prelude: TokenStream, future: TokenStream) -> TokenStream {
        quote! {
            #prelude
            let session: &S = &self.session;
            ::std::boxed::Box::pin(async move { #future })
        }
    }

    /// Baseline CRUD body; `param` names the identifier or entity argument.
    pub(crate) fn crud(&self, crud: Crud, param: Option<&Ident>) -> TokenStream {
        let fallback = match crud {
            Crud::Save => quote::format_ident!("entity"),
            _ => quote::format_ident!("id"),
        };
        let param = param.unwrap_or(&fallback);
        let future = match crud {
            Crud::FindById => {
                let call = self.session_call("find", quote!(&#param));
                quote!(#call.await)
            }
            Crud::Save => {
                let call = self.session_call("persist", quote!(#param));
                quote!(#call.await)
            }
            Crud::DeleteById => {
                let call = self.session_call("remove", quote!(&#param));
                quote!(#call.await.map(|_| ()))
            }
            Crud::FindAll => {
                let call = self.session_call("find_all", TokenStream::new());
                quote!(#call.await)
            }
        };
        self.boxed(TokenStream::new(), future)
    }

    /// `ReactiveRepository::select` over a caller-built `query`.
    pub(crate) fn select(&self) -> TokenStream {
        let call = self.session_call("select", quote!(&query));
        self.boxed(TokenStream::new(), quote!(#call.await))
    }

    /// Body for a derived or declared query. Returns `None` when no session
    /// primitive produces the declared shape.
    pub(crate) fn query(
        &self,
        operation: &ResolvedOperation,
        subject: Subject,
        plan: &QueryPlan,
    ) -> Option<TokenStream> {
        let rt = self.runtime;
        let query = QueryTokens {
            runtime: self.runtime,
            params: &operation.params,
        };
        let limit = (operation.shape == ReturnShape::OptionalEntity).then_some(1);
        let built = query.build(plan, limit);
        let prelude = quote!(let query = #built;);

        let future = match (subject, &operation.shape) {
            (Subject::Find, ReturnShape::OptionalEntity) => {
                let call = self.session_call("select", quote!(&query));
                quote!(#rt::SessionResult::Ok(#call.await?.into_iter().next()))
            }
            (Subject::Find, ReturnShape::Collection) => {
                let call = self.session_call("select", quote!(&query));
                quote!(#call.await)
            }
            (Subject::Count, ReturnShape::Count) => {
                let call = self.session_call("count", quote!(&query));
                self.narrowed(call, operation.output.as_ref())
            }
            (Subject::Exists, ReturnShape::Exists) => {
                let call = self.session_call("exists", quote!(&query));
                quote!(#call.await)
            }
            (Subject::Delete, ReturnShape::Unit) => {
                let call = self.session_call("delete_where", quote!(&query));
                quote!(#call.await.map(|_| ()))
            }
            (Subject::Delete, ReturnShape::Count) => {
                let call = self.session_call("delete_where", quote!(&query));
                self.narrowed(call, operation.output.as_ref())
            }
            _ => return None,
        };
        Some(self.boxed(prelude, future))
    }

    /// Converts the `u64` a session counts into the declared integer type.
    fn narrowed(&self, call: TokenStream, output: Option<&Type>) -> TokenStream {
        let rt = self.runtime;
        let Some(ty) = output else {
            return quote!(#call.await);
        };
        let target = ty.to_token_stream().to_string();
        quote! {
            let value: u64 = #call.await?;
            <#ty as ::core::convert::TryFrom<u64>>::try_from(value).map_err(|_| {
                #rt::SessionError::ResultOutOfRange {
                    value,
                    target: #target,
                }
            })
        }
    }
}

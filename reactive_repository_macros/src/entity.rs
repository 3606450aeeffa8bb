//! `#[derive(Entity)]`

use proc_macro2::TokenStream;
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Fields, GenericArgument, LitStr, Path, PathArguments, Type,
};

/// Struct-level `#[entity(...)]` options.
struct EntityOptions {
    name: Option<String>,
    runtime: Path,
}

impl EntityOptions {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut options = Self {
            name: None,
            runtime: syn::parse_quote!(::reactive_repository),
        };
        for attribute in attrs.iter().filter(|a| a.path().is_ident("entity")) {
            attribute.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let name: LitStr = meta.value()?.parse()?;
                    options.name = Some(name.value());
                    Ok(())
                } else if meta.path.is_ident("runtime") {
                    options.runtime = meta.value()?.parse()?;
                    Ok(())
                } else {
                    Err(meta.error("expected `name = \"...\"` or `runtime = path`"))
                }
            })?;
        }
        Ok(options)
    }
}

fn is_skipped(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut skipped = false;
    for attribute in attrs.iter().filter(|a| a.path().is_ident("entity")) {
        attribute.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skipped = true;
                Ok(())
            } else {
                Err(meta.error("expected `skip`"))
            }
        })?;
    }
    Ok(skipped)
}

fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };
    match arguments.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

pub(crate) fn derive_entity(input: &DeriveInput) -> syn::Result<TokenStream> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Entity can only be derived for structs",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            "Entity requires named fields",
        ));
    };
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic structs",
        ));
    }

    let options = EntityOptions::parse(&input.attrs)?;
    let rt = &options.runtime;
    let ident = &input.ident;
    let entity_name = options.name.unwrap_or_else(|| ident.to_string());

    let mut properties = Vec::new();
    for field in &fields.named {
        if !is_skipped(&field.attrs)? {
            properties.push(field);
        }
    }

    let id_field = fields
        .named
        .iter()
        .find(|f| f.attrs.iter().any(|a| a.path().is_ident("id")))
        .or_else(|| fields.named.iter().find(|f| f.ident.as_ref().is_some_and(|i| i == "id")))
        .ok_or_else(|| {
            syn::Error::new_spanned(ident, "Entity needs an `#[id]` field or a field named `id`")
        })?;
    let id_name = &id_field.ident;

    let (id_type, id_getter, id_setter) = match option_inner(&id_field.ty) {
        Some(inner) => (
            inner,
            quote!(::core::clone::Clone::clone(&self.#id_name)),
            quote!(self.#id_name = ::core::option::Option::Some(id);),
        ),
        None => (
            &id_field.ty,
            quote!(::core::option::Option::Some(::core::clone::Clone::clone(&self.#id_name))),
            quote!(self.#id_name = id;),
        ),
    };

    let property_names: Vec<String> = properties
        .iter()
        .filter_map(|f| f.ident.as_ref().map(ToString::to_string))
        .collect();
    let property_arms = properties.iter().filter_map(|field| {
        let name = field.ident.as_ref()?;
        let key = name.to_string();
        Some(quote! {
            #key => ::core::option::Option::Some(
                #rt::value::Value::from(::core::clone::Clone::clone(&self.#name))
            ),
        })
    });

    Ok(quote! {
        impl #rt::traits::Entity for #ident {
            type Id = #id_type;

            const NAME: &'static str = #entity_name;

            const PROPERTIES: &'static [&'static str] = &[#(#property_names),*];

            fn id(&self) -> ::core::option::Option<Self::Id> {
                #id_getter
            }

            fn assign_id(&mut self, id: Self::Id) {
                #id_setter
            }

            fn property(&self, name: &str) -> ::core::option::Option<#rt::value::Value> {
                match name {
                    #(#property_arms)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn compact(tokens: TokenStream) -> String {
        tokens.to_string().replace(' ', "")
    }

    #[test]
    fn test_optional_identifier() {
        let input: DeriveInput = parse_quote! {
            #[entity(name = "users")]
            struct User {
                #[id]
                key: Option<u64>,
                email: String,
                #[entity(skip)]
                cache: Vec<u8>,
            }
        };
        let code = compact(derive_entity(&input).unwrap());
        assert!(code.contains("typeId=u64;"));
        assert!(code.contains("constNAME:&'staticstr=\"users\""));
        assert!(code.contains("&[\"key\",\"email\"]"));
        assert!(code.contains("self.key=::core::option::Option::Some(id);"));
        assert!(!code.contains("\"cache\"=>"));
    }

    #[test]
    fn test_plain_identifier_named_id() {
        let input: DeriveInput = parse_quote! {
            struct Tag {
                id: String,
                label: String,
            }
        };
        let code = compact(derive_entity(&input).unwrap());
        assert!(code.contains("typeId=String;"));
        assert!(code.contains("constNAME:&'staticstr=\"Tag\""));
        assert!(code.contains("self.id=id;"));
    }

    #[test]
    fn test_rejections() {
        let no_id: DeriveInput = parse_quote!(struct Note { body: String });
        assert!(derive_entity(&no_id).is_err());

        let tuple: DeriveInput = parse_quote!(struct Pair(u64, u64););
        assert!(derive_entity(&tuple).is_err());

        let enumeration: DeriveInput = parse_quote!(enum Kind { A, B });
        assert!(derive_entity(&enumeration).is_err());

        let unknown: DeriveInput = parse_quote! {
            #[entity(table = "x")]
            struct Note { id: u64 }
        };
        assert!(derive_entity(&unknown).is_err());
    }
}

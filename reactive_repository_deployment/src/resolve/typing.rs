//! Parameter and property type agreement.
//!
//! Types are compared by the kind of runtime value they convert into, so a
//! `u64` argument may filter a `u32` property but a `String` may not.

use quote::ToTokens;
use syn::{GenericArgument, PathArguments, Type};

use super::operation::{Comparator, Predicate};
use crate::discover::{generic_inner, option_inner};
use crate::index::ParamDeclaration;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Bool,
    Number,
    Text,
    Bytes,
    Timestamp,
    Uuid,
    /// A collection of the inner kind
    List(Box<Kind>),
    /// Anything else, by its rendered path
    Named(String),
}

const NUMBERS: &[&str] = &[
    "u8", "u16", "u32", "u64", "u128", "usize", "i8", "i16", "i32", "i64", "i128", "isize", "f32",
    "f64",
];

fn kind_of(ty: &Type) -> Kind {
    let ty = strip(ty);
    match ty {
        Type::Slice(slice) => return list_of(&slice.elem),
        Type::Array(array) => return list_of(&array.elem),
        _ => {}
    }
    if let Some(inner) = generic_inner(ty, "Vec") {
        return list_of(inner);
    }
    let Type::Path(path) = ty else {
        return Kind::Named(ty.to_token_stream().to_string());
    };
    let Some(segment) = path.path.segments.last() else {
        return Kind::Named(String::new());
    };
    let name = segment.ident.to_string();
    match name.as_str() {
        "bool" => Kind::Bool,
        "String" | "str" | "char" | "Cow" => Kind::Text,
        "DateTime" | "NaiveDateTime" => Kind::Timestamp,
        "Uuid" => Kind::Uuid,
        name if NUMBERS.contains(&name) => Kind::Number,
        _ => match &segment.arguments {
            PathArguments::None => Kind::Named(name),
            _ => Kind::Named(segment.to_token_stream().to_string()),
        },
    }
}

fn list_of(element: &Type) -> Kind {
    match kind_of(element) {
        Kind::Number if is_byte(element) => Kind::Bytes,
        inner => Kind::List(Box::new(inner)),
    }
}

fn is_byte(ty: &Type) -> bool {
    matches!(strip(ty), Type::Path(path) if path.path.is_ident("u8"))
}

/// Drops references, parentheses, `Option` and smart pointers.
fn strip(ty: &Type) -> &Type {
    match ty {
        Type::Reference(reference) => strip(&reference.elem),
        Type::Paren(paren) => strip(&paren.elem),
        Type::Group(group) => strip(&group.elem),
        _ => {
            if let Some(inner) = option_inner(ty) {
                return strip(inner);
            }
            for pointer in ["Box", "Arc", "Rc"] {
                if let Some(inner) = generic_inner(ty, pointer) {
                    return strip(inner);
                }
            }
            ty
        }
    }
}

fn render(ty: &Type) -> String {
    ty.to_token_stream().to_string().replace(' ', "")
}

/// Check that `predicate` can compare `property` against the parameters it
/// consumes.
pub(crate) fn check_predicate(
    predicate: &Predicate,
    property: &Type,
    params: &[ParamDeclaration],
) -> Result<(), String> {
    let property_kind = kind_of(property);
    let requires = |kind: Kind, what: &str| {
        if property_kind == kind {
            Ok(())
        } else {
            Err(format!(
                "`{:?}` needs a {what} property but `{}` is `{}`",
                predicate.comparator,
                predicate.property,
                render(property)
            ))
        }
    };
    match predicate.comparator {
        Comparator::IsTrue | Comparator::IsFalse => requires(Kind::Bool, "bool")?,
        Comparator::Like
        | Comparator::NotLike
        | Comparator::Containing
        | Comparator::NotContaining
        | Comparator::StartingWith
        | Comparator::EndingWith => requires(Kind::Text, "text")?,
        _ => {}
    }

    for &position in &predicate.params {
        let Some(param) = params.get(position) else {
            continue;
        };
        let param_kind = kind_of(&param.ty);
        let matches = if predicate.comparator.takes_list() {
            match &param_kind {
                Kind::List(element) => **element == property_kind,
                Kind::Bytes => property_kind == Kind::Number,
                _ => false,
            }
        } else {
            param_kind == property_kind
        };
        if !matches {
            let expected = if predicate.comparator.takes_list() {
                format!("a collection of `{}`", render(property))
            } else {
                format!("`{}`", render(property))
            };
            return Err(format!(
                "parameter `{}: {}` cannot be compared with property `{}`; expected {expected}",
                param.name,
                render(&param.ty),
                predicate.property
            ));
        }
    }
    Ok(())
}

/// Name of a plain path type behind any references, such as `Pagination`
/// for `&query::Pagination`.
pub(crate) fn last_segment_name(ty: &Type) -> Option<String> {
    let ty = match ty {
        Type::Reference(reference) => reference.elem.as_ref(),
        ty => ty,
    };
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    match &segment.arguments {
        PathArguments::None => Some(segment.ident.to_string()),
        PathArguments::AngleBracketed(arguments)
            if arguments
                .args
                .iter()
                .all(|argument| matches!(argument, GenericArgument::Lifetime(_))) =>
        {
            Some(segment.ident.to_string())
        }
        _ => None,
    }
}

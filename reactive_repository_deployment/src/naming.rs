//! Naming conventions shared by the resolver and the synthesizer.

use heck::ToSnakeCase;
use proc_macro2::Ident;
use quote::format_ident;

/// `UserRepository` + `Impl` -> `UserRepositoryImpl`
pub fn implementation_ident(contract: &Ident, suffix: &str) -> Ident {
    format_ident!("{}{}", contract, suffix)
}

/// Property names as stored on entities. Declared queries may spell them in
/// camelCase (`lastName`).
pub fn property_name(raw: &str) -> String {
    raw.to_snake_case()
}

/// Split a method name into convention tokens: `findTop3ByAge` and
/// `find_top_3_by_age` both yield `["find", "top", "3", "by", "age"]`.
pub fn method_tokens(name: &str) -> Vec<String> {
    name.to_snake_case()
        .split('_')
        .filter(|token| !token.is_empty())
        .flat_map(split_number)
        .collect()
}

/// `top3` -> `["top", "3"]`
fn split_number(token: &str) -> Vec<String> {
    match token.find(|c: char| c.is_ascii_digit()) {
        Some(at) if at > 0 && token[at..].chars().all(|c| c.is_ascii_digit()) => {
            vec![token[..at].to_string(), token[at..].to_string()]
        }
        _ => vec![token.to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_implementation_ident() {
        let contract = format_ident!("UserRepository");
        assert_eq!(implementation_ident(&contract, "Impl"), "UserRepositoryImpl");
    }

    #[test]
    fn test_property_name() {
        assert_eq!(property_name("lastName"), "last_name");
        assert_eq!(property_name("last_name"), "last_name");
        assert_eq!(property_name("ID"), "id");
    }

    #[test]
    fn test_method_tokens() {
        assert_eq!(
            method_tokens("find_top_3_by_age"),
            vec!["find", "top", "3", "by", "age"]
        );
        assert_eq!(
            method_tokens("findTop3ByAgeOrderByName"),
            vec!["find", "top", "3", "by", "age", "order", "by", "name"]
        );
        assert_eq!(method_tokens("find_by_email"), vec!["find", "by", "email"]);
    }
}

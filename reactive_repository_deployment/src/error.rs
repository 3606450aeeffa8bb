//! Errors raised by the generation pipeline.
//!
//! Every variant is fatal: the pipeline stops at the first error and never
//! returns partial output. [`GenerationError::to_syn_error`] turns any of
//! them into a spanned `syn::Error` so the proc-macro front-end can point
//! `compile_error!` at the offending declaration.

use std::path::PathBuf;

use proc_macro2::Span;
use thiserror::Error;

pub type GenerationResult<T> = Result<T, GenerationError>;

#[derive(Error, Debug)]
pub enum GenerationError {
    /// A contract's entity or identifier type could not be determined.
    #[error("cannot resolve the entity/identifier binding of `{contract}`: {detail}")]
    UnresolvedGenericBinding {
        contract: String,
        detail: String,
        span: Span,
    },

    /// A method name or declared query does not follow the query grammar.
    #[error("`{contract}::{method}` is not a supported query: {detail}")]
    UnsupportedQueryConvention {
        contract: String,
        method: String,
        detail: String,
        span: Span,
    },

    /// A resolved operation has no implementation strategy.
    #[error("cannot implement `{contract}::{method}`: {detail}")]
    OperationSynthesis {
        contract: String,
        method: String,
        detail: String,
        span: Span,
    },

    /// The repository marker was placed on something that is not a trait.
    #[error("`{name}` is marked as a repository but is not a trait")]
    InvalidContractTarget { name: String, span: Span },

    #[error("failed to parse source: {0}")]
    Parse(#[from] syn::Error),

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GenerationError {
    /// Span of the declaration the error refers to.
    pub fn span(&self) -> Span {
        match self {
            Self::UnresolvedGenericBinding { span, .. }
            | Self::UnsupportedQueryConvention { span, .. }
            | Self::OperationSynthesis { span, .. }
            | Self::InvalidContractTarget { span, .. } => *span,
            Self::Parse(error) => error.span(),
            Self::Io { .. } => Span::call_site(),
        }
    }

    pub fn to_syn_error(&self) -> syn::Error {
        match self {
            Self::Parse(error) => error.clone(),
            other => syn::Error::new(other.span(), other.to_string()),
        }
    }

    pub fn is_unsupported_query(&self) -> bool {
        matches!(self, Self::UnsupportedQueryConvention { .. })
    }
}

impl From<GenerationError> for syn::Error {
    fn from(error: GenerationError) -> Self {
        error.to_syn_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_declaration() {
        let error = GenerationError::UnsupportedQueryConvention {
            contract: "UserRepository".into(),
            method: "find_by_nickname".into(),
            detail: "unknown property `nickname`".into(),
            span: Span::call_site(),
        };
        let message = error.to_string();
        assert!(message.contains("UserRepository::find_by_nickname"));
        assert!(message.contains("nickname"));
        assert!(error.is_unsupported_query());
    }

    #[test]
    fn test_parse_errors_keep_their_message() {
        let parse = syn::parse_str::<syn::Type>("Vec<").unwrap_err();
        let expected = parse.to_string();
        let error = GenerationError::from(parse);
        assert_eq!(error.to_syn_error().to_string(), expected);
    }
}

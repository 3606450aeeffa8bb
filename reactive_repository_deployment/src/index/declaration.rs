//! Declarations recorded in the type index.

use proc_macro2::{Span, TokenStream};
use quote::ToTokens;
use strum::{AsRefStr, Display};
use syn::{Attribute, Ident, Meta, Path, Receiver, ReturnType, Signature, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TypeKind {
    Trait,
    Struct,
    Enum,
}

/// An attribute attached to a declaration, reduced to its last path segment
/// and raw arguments.
#[derive(Debug, Clone)]
pub struct Marker {
    pub name: String,
    pub args: TokenStream,
    pub span: Span,
}

impl Marker {
    pub(crate) fn from_attribute(attribute: &Attribute) -> Option<Self> {
        let name = attribute.path().segments.last()?.ident.to_string();
        let args = match &attribute.meta {
            Meta::Path(_) => TokenStream::new(),
            Meta::List(list) => list.tokens.clone(),
            Meta::NameValue(name_value) => name_value.value.to_token_stream(),
        };
        Some(Self {
            name,
            args,
            span: attribute.path().segments.last()?.ident.span(),
        })
    }

    pub(crate) fn collect(attributes: &[Attribute]) -> Vec<Self> {
        attributes
            .iter()
            .filter(|attribute| !attribute.path().is_ident("doc"))
            .filter_map(Self::from_attribute)
            .collect()
    }

    pub fn has_args(&self) -> bool {
        !self.args.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ParamDeclaration {
    pub name: Ident,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub struct MethodDeclaration {
    pub name: Ident,
    pub receiver: Option<Receiver>,
    pub params: Vec<ParamDeclaration>,
    pub output: ReturnType,
    pub has_default_body: bool,
    pub markers: Vec<Marker>,
    /// Signature as written, used to re-emit the method in generated impls
    pub signature: Signature,
}

impl MethodDeclaration {
    pub fn marker(&self, name: &str) -> Option<&Marker> {
        self.markers.iter().find(|marker| marker.name == name)
    }

    pub fn span(&self) -> Span {
        self.name.span()
    }
}

#[derive(Debug, Clone)]
pub struct FieldDeclaration {
    pub name: Ident,
    pub ty: Type,
    /// Carries `#[id]`
    pub is_id: bool,
    /// Carries `#[entity(skip)]`
    pub skipped: bool,
}

#[derive(Debug, Clone)]
pub struct TypeDeclaration {
    /// `module::path::Name`, rooted at the indexed module or file
    pub qualified_name: String,
    /// How generated code placed next to the indexed items names this type
    pub path: Path,
    pub ident: Ident,
    pub kind: TypeKind,
    pub methods: Vec<MethodDeclaration>,
    pub fields: Vec<FieldDeclaration>,
    pub generics: Vec<Ident>,
    pub markers: Vec<Marker>,
    pub supertraits: Vec<Path>,
}

impl TypeDeclaration {
    pub fn name(&self) -> String {
        self.ident.to_string()
    }

    pub fn marker(&self, name: &str) -> Option<&Marker> {
        self.markers.iter().find(|marker| marker.name == name)
    }

    pub fn is_trait(&self) -> bool {
        self.kind == TypeKind::Trait
    }

    pub fn span(&self) -> Span {
        self.ident.span()
    }

    /// Fields that take part in queries, in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = &FieldDeclaration> {
        self.fields.iter().filter(|field| !field.skipped)
    }
}

//! Collects type declarations from parsed items.

use quote::format_ident;
use syn::punctuated::Punctuated;
use syn::{
    Attribute, Fields, FnArg, GenericParam, Generics, ItemEnum, ItemFn, ItemImpl, ItemMod,
    ItemStruct, ItemTrait, Pat, TraitItem, TraitItemFn, TypeParamBound, visit::Visit,
};

use super::declaration::{
    FieldDeclaration, Marker, MethodDeclaration, ParamDeclaration, TypeDeclaration, TypeKind,
};

/// Walks items depth-first, tracking the module path so every declaration
/// gets a qualified name.
pub(crate) struct IndexVisitor {
    root: Vec<String>,
    emit_prefix: Vec<String>,
    module_path: Vec<String>,
    pub(crate) declarations: Vec<TypeDeclaration>,
    /// Malformed attributes, combined so all of them are reported.
    pub(crate) error: Option<syn::Error>,
}

impl IndexVisitor {
    /// `root` prefixes qualified names; `emit_prefix` prefixes the paths
    /// generated code uses.
    pub(crate) fn new(root: Vec<String>, emit_prefix: Vec<String>) -> Self {
        Self {
            root,
            emit_prefix,
            module_path: Vec::new(),
            declarations: Vec::new(),
            error: None,
        }
    }

    fn report(&mut self, error: syn::Error) {
        match &mut self.error {
            Some(existing) => existing.combine(error),
            None => self.error = Some(error),
        }
    }

    fn qualify(&self, name: &syn::Ident) -> String {
        let mut segments = self.root.clone();
        segments.extend(self.module_path.iter().cloned());
        segments.push(name.to_string());
        segments.join("::")
    }

    fn emit_path(&self, name: &syn::Ident) -> syn::Path {
        let mut path = syn::Path {
            leading_colon: None,
            segments: Punctuated::new(),
        };
        for segment in self.emit_prefix.iter().chain(&self.module_path) {
            path.segments.push(format_ident!("{}", segment).into());
        }
        path.segments.push(name.clone().into());
        path
    }

    fn declare(&self, ident: &syn::Ident, kind: TypeKind, attrs: &[Attribute]) -> TypeDeclaration {
        TypeDeclaration {
            qualified_name: self.qualify(ident),
            path: self.emit_path(ident),
            ident: ident.clone(),
            kind,
            methods: Vec::new(),
            fields: Vec::new(),
            generics: Vec::new(),
            markers: Marker::collect(attrs),
            supertraits: Vec::new(),
        }
    }

    fn generic_names(generics: &Generics) -> Vec<syn::Ident> {
        generics
            .params
            .iter()
            .filter_map(|param| match param {
                GenericParam::Type(ty) => Some(ty.ident.clone()),
                _ => None,
            })
            .collect()
    }

    fn fields(fields: &Fields) -> syn::Result<Vec<FieldDeclaration>> {
        let Fields::Named(named) = fields else {
            return Ok(Vec::new());
        };
        let mut declarations = Vec::new();
        for field in &named.named {
            let Some(name) = field.ident.clone() else {
                continue;
            };
            let mut skipped = false;
            for attribute in &field.attrs {
                skipped |= is_entity_skip(attribute)?;
            }
            declarations.push(FieldDeclaration {
                name,
                ty: field.ty.clone(),
                is_id: field.attrs.iter().any(|a| a.path().is_ident("id")),
                skipped,
            });
        }
        Ok(declarations)
    }

    fn method(method: &TraitItemFn) -> MethodDeclaration {
        let signature = &method.sig;
        let mut receiver = None;
        let mut params = Vec::new();
        for (position, input) in signature.inputs.iter().enumerate() {
            match input {
                FnArg::Receiver(r) => receiver = Some(r.clone()),
                FnArg::Typed(typed) => {
                    let name = match typed.pat.as_ref() {
                        Pat::Ident(pat) => pat.ident.clone(),
                        _ => format_ident!("arg{}", position),
                    };
                    params.push(ParamDeclaration {
                        name,
                        ty: (*typed.ty).clone(),
                    });
                }
            }
        }
        MethodDeclaration {
            name: signature.ident.clone(),
            receiver,
            params,
            output: signature.output.clone(),
            has_default_body: method.default.is_some(),
            markers: Marker::collect(&method.attrs),
            signature: signature.clone(),
        }
    }
}

/// `#[entity(skip)]`
fn is_entity_skip(attribute: &Attribute) -> syn::Result<bool> {
    if !attribute.path().is_ident("entity") {
        return Ok(false);
    }
    let mut skip = false;
    attribute.parse_nested_meta(|meta| {
        if meta.path.is_ident("skip") {
            skip = true;
            Ok(())
        } else {
            Err(meta.error("expected `skip`"))
        }
    })?;
    Ok(skip)
}

impl<'ast> Visit<'ast> for IndexVisitor {
    fn visit_item_struct(&mut self, item: &'ast ItemStruct) {
        let fields = Self::fields(&item.fields).unwrap_or_else(|error| {
            self.report(error);
            Vec::new()
        });
        self.declarations.push(TypeDeclaration {
            fields,
            generics: Self::generic_names(&item.generics),
            ..self.declare(&item.ident, TypeKind::Struct, &item.attrs)
        });
    }

    fn visit_item_enum(&mut self, item: &'ast ItemEnum) {
        self.declarations.push(TypeDeclaration {
            generics: Self::generic_names(&item.generics),
            ..self.declare(&item.ident, TypeKind::Enum, &item.attrs)
        });
    }

    fn visit_item_trait(&mut self, item: &'ast ItemTrait) {
        let methods = item
            .items
            .iter()
            .filter_map(|trait_item| match trait_item {
                TraitItem::Fn(method) => Some(Self::method(method)),
                _ => None,
            })
            .collect();
        let supertraits = item
            .supertraits
            .iter()
            .filter_map(|bound| match bound {
                TypeParamBound::Trait(bound) => Some(bound.path.clone()),
                _ => None,
            })
            .collect();
        self.declarations.push(TypeDeclaration {
            methods,
            generics: Self::generic_names(&item.generics),
            supertraits,
            ..self.declare(&item.ident, TypeKind::Trait, &item.attrs)
        });
    }

    fn visit_item_mod(&mut self, module: &'ast ItemMod) {
        self.module_path.push(module.ident.to_string());
        syn::visit::visit_item_mod(self, module);
        self.module_path.pop();
    }

    // Items nested in function bodies and impl blocks are not nameable
    // from generated code.
    fn visit_item_fn(&mut self, _item: &'ast ItemFn) {}

    fn visit_item_impl(&mut self, _item: &'ast ItemImpl) {}
}

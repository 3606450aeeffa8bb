//! Contract discovery.
//!
//! A declaration is a repository contract when it is a trait bound to an
//! entity and identifier type, either through a base supertrait
//! (`trait UserRepository: ReactiveRepository<User, u64>`) or through the
//! contract marker (`#[repository(User, u64)]`).

use proc_macro2::Span;
use quote::ToTokens;
use syn::{
    GenericArgument, Path, PathArguments, Token, Type, parse::Parser, punctuated::Punctuated,
};

use crate::config::GeneratorConfig;
use crate::error::{GenerationError, GenerationResult};
use crate::index::{FieldDeclaration, TypeDeclaration, TypeIndex, TypeKind};

/// The entity a contract is bound to, as declared in the index.
#[derive(Debug, Clone)]
pub struct EntityModel<'a> {
    pub declaration: &'a TypeDeclaration,
    pub id_property: &'a FieldDeclaration,
}

impl<'a> EntityModel<'a> {
    /// Queryable property names in declaration order.
    pub fn properties(&self) -> Vec<String> {
        self.declaration
            .properties()
            .map(|field| field.name.to_string())
            .collect()
    }

    pub fn property(&self, name: &str) -> Option<&'a FieldDeclaration> {
        self.declaration.properties().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct RepositoryContract<'a> {
    pub declaration: &'a TypeDeclaration,
    pub entity_type: Type,
    pub id_type: Type,
    pub entity: EntityModel<'a>,
}

impl RepositoryContract<'_> {
    pub fn name(&self) -> String {
        self.declaration.name()
    }

    pub fn span(&self) -> Span {
        self.declaration.span()
    }
}

#[derive(Debug, Clone)]
pub enum Classification<'a> {
    NotAContract,
    RepositoryContract(RepositoryContract<'a>),
}

impl<'a> Classification<'a> {
    pub fn is_contract(&self) -> bool {
        matches!(self, Self::RepositoryContract(_))
    }

    pub fn into_contract(self) -> Option<RepositoryContract<'a>> {
        match self {
            Self::RepositoryContract(contract) => Some(contract),
            Self::NotAContract => None,
        }
    }
}

pub struct ContractDiscoverer<'a, 'c> {
    index: &'a TypeIndex,
    config: &'c GeneratorConfig,
}

impl<'a, 'c> ContractDiscoverer<'a, 'c> {
    pub fn new(index: &'a TypeIndex, config: &'c GeneratorConfig) -> Self {
        Self { index, config }
    }

    /// Every contract in the index, in index order.
    pub fn discover(&self) -> GenerationResult<Vec<RepositoryContract<'a>>> {
        let mut contracts = Vec::new();
        for declaration in self.index.declarations() {
            if let Some(contract) = self.classify(declaration)?.into_contract() {
                log::debug!(
                    "discovered contract {} over {} keyed by {}",
                    declaration.qualified_name,
                    contract.entity_type.to_token_stream(),
                    contract.id_type.to_token_stream()
                );
                contracts.push(contract);
            }
        }
        Ok(contracts)
    }

    pub fn classify(&self, declaration: &'a TypeDeclaration) -> GenerationResult<Classification<'a>> {
        let marker = declaration.marker(&self.config.contract_marker);
        if declaration.kind != TypeKind::Trait {
            return match marker {
                Some(marker) => Err(GenerationError::InvalidContractTarget {
                    name: declaration.name(),
                    span: marker.span,
                }),
                None => Ok(Classification::NotAContract),
            };
        }

        let from_supertrait = match self.base_supertrait(declaration) {
            Some(base) => Some(supertrait_binding(declaration, base)?),
            None => None,
        };
        let from_marker = match marker.filter(|marker| marker.has_args()) {
            Some(marker) => Some(marker_binding(declaration, marker.args.clone())?),
            None => None,
        };

        let (entity_type, id_type) = match (from_supertrait, from_marker) {
            (None, None) if marker.is_some() => {
                return Err(unresolved(
                    declaration,
                    format!(
                        "`#[{}]` needs `(Entity, Id)` arguments or a `{}<Entity, Id>` supertrait",
                        self.config.contract_marker,
                        self.config.base_contracts.join("` / `")
                    ),
                ));
            }
            (None, None) => return Ok(Classification::NotAContract),
            (Some(binding), None) | (None, Some(binding)) => binding,
            (Some(supertrait), Some(marked)) => {
                if !same_type(&supertrait.0, &marked.0) || !same_type(&supertrait.1, &marked.1) {
                    return Err(unresolved(
                        declaration,
                        "marker arguments disagree with the supertrait binding",
                    ));
                }
                supertrait
            }
        };

        if !declaration.generics.is_empty() {
            return Err(unresolved(
                declaration,
                "generic contracts cannot be bound to a concrete entity",
            ));
        }

        let entity = self.entity_model(declaration, &entity_type, &id_type)?;
        Ok(Classification::RepositoryContract(RepositoryContract {
            declaration,
            entity_type,
            id_type,
            entity,
        }))
    }

    fn base_supertrait(&self, declaration: &'a TypeDeclaration) -> Option<&'a Path> {
        declaration.supertraits.iter().find(|path| {
            path.segments
                .last()
                .is_some_and(|segment| self.config.is_base_contract(&segment.ident.to_string()))
        })
    }

    fn entity_model(
        &self,
        declaration: &'a TypeDeclaration,
        entity_type: &Type,
        id_type: &Type,
    ) -> GenerationResult<EntityModel<'a>> {
        let entity_name = entity_type.to_token_stream().to_string();
        let Type::Path(entity_path) = entity_type else {
            return Err(unresolved(
                declaration,
                format!("entity `{entity_name}` is not a named type"),
            ));
        };
        let entity = self
            .index
            .resolve(&entity_path.path)
            .filter(|entity| entity.kind == TypeKind::Struct)
            .ok_or_else(|| {
                unresolved(
                    declaration,
                    format!("entity `{entity_name}` is not a struct visible to the generator"),
                )
            })?;

        let id_property = entity
            .fields
            .iter()
            .find(|field| field.is_id)
            .or_else(|| entity.fields.iter().find(|field| field.name == "id"))
            .ok_or_else(|| {
                unresolved(
                    declaration,
                    format!("entity `{entity_name}` has no `#[id]` field or field named `id`"),
                )
            })?;

        if !same_type(&id_property.ty, id_type)
            && !option_inner(&id_property.ty).is_some_and(|inner| same_type(inner, id_type))
        {
            return Err(unresolved(
                declaration,
                format!(
                    "identifier `{}.{}` is `{}`, but the contract binds `{}`",
                    entity_name,
                    id_property.name,
                    id_property.ty.to_token_stream(),
                    id_type.to_token_stream()
                ),
            ));
        }

        Ok(EntityModel {
            declaration: entity,
            id_property,
        })
    }
}

fn unresolved(declaration: &TypeDeclaration, detail: impl Into<String>) -> GenerationError {
    GenerationError::UnresolvedGenericBinding {
        contract: declaration.name(),
        detail: detail.into(),
        span: declaration.span(),
    }
}

fn supertrait_binding(declaration: &TypeDeclaration, base: &Path) -> GenerationResult<(Type, Type)> {
    let Some(segment) = base.segments.last() else {
        return Err(unresolved(declaration, "empty supertrait path"));
    };
    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return Err(unresolved(
            declaration,
            format!("`{}` is used without `<Entity, Id>` arguments", segment.ident),
        ));
    };
    let types: Vec<Type> = arguments
        .args
        .iter()
        .filter_map(|argument| match argument {
            GenericArgument::Type(ty) => Some(ty.clone()),
            _ => None,
        })
        .collect();
    match <[Type; 2]>::try_from(types) {
        Ok([entity, id]) => Ok((entity, id)),
        Err(types) => Err(unresolved(
            declaration,
            format!(
                "`{}` takes exactly two type arguments, found {}",
                segment.ident,
                types.len()
            ),
        )),
    }
}

fn marker_binding(
    declaration: &TypeDeclaration,
    args: proc_macro2::TokenStream,
) -> GenerationResult<(Type, Type)> {
    let types = Punctuated::<Type, Token![,]>::parse_terminated
        .parse2(args)
        .map_err(|error| unresolved(declaration, format!("invalid marker arguments: {error}")))?;
    match <[Type; 2]>::try_from(types.into_iter().collect::<Vec<_>>()) {
        Ok([entity, id]) => Ok((entity, id)),
        Err(types) => Err(unresolved(
            declaration,
            format!("marker takes `(Entity, Id)`, found {} arguments", types.len()),
        )),
    }
}

fn same_type(left: &Type, right: &Type) -> bool {
    left.to_token_stream().to_string() == right.to_token_stream().to_string()
}

/// `T` for `Option<T>`.
pub(crate) fn option_inner(ty: &Type) -> Option<&Type> {
    generic_inner(ty, "Option")
}

/// `T` for a single-argument generic type named `wrapper`.
pub(crate) fn generic_inner<'t>(ty: &'t Type, wrapper: &str) -> Option<&'t Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };
    match arguments.args.first()? {
        GenericArgument::Type(inner) if arguments.args.len() == 1 => Some(inner),
        _ => None,
    }
}

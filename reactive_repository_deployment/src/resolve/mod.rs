//! Method resolution.
//!
//! Turns one contract into its ordered operation set: explicit methods in
//! declaration order, then the baseline CRUD operations the contract does
//! not declare itself, in canonical order.

pub mod convention;
pub mod crud;
pub mod declared;
pub mod operation;
mod typing;

use std::collections::BTreeSet;

use quote::ToTokens;
use syn::{GenericArgument, LitStr, PathArguments, ReturnType, Type};

pub use convention::ConventionParser;
pub use declared::parse_declared;
pub use operation::{
    Comparator, ConventionQuery, Crud, DeclaredQuery, Direction, OperationKind, OrderKey,
    ParamRole, Predicate, QueryPlan, ResolvedOperation, ResolvedParam, ReturnShape, Subject,
};

use crate::config::GeneratorConfig;
use crate::discover::{RepositoryContract, generic_inner};
use crate::error::{GenerationError, GenerationResult};
use crate::index::MethodDeclaration;

const INTEGERS: &[&str] = &[
    "u8", "u16", "u32", "u64", "u128", "usize", "i8", "i16", "i32", "i64", "i128", "isize",
];

pub struct MethodResolver<'c> {
    config: &'c GeneratorConfig,
}

impl<'c> MethodResolver<'c> {
    pub fn new(config: &'c GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn resolve(&self, contract: &RepositoryContract<'_>) -> GenerationResult<Vec<ResolvedOperation>> {
        let properties = contract.entity.properties();
        let conventions = ConventionParser::new(properties.iter().cloned());

        let mut operations = Vec::new();
        let mut names = BTreeSet::new();
        let mut declared_crud = Vec::new();

        for method in &contract.declaration.methods {
            if method.has_default_body {
                if method.marker(&self.config.query_marker).is_some() {
                    return Err(synthesis(
                        contract,
                        method,
                        "a method with a default body cannot carry a declared query",
                    ));
                }
                continue;
            }
            let name = method.name.to_string();
            if !names.insert(name.clone()) {
                return Err(unsupported(contract, method, "declared more than once"));
            }

            let output = self.check_signature(contract, method)?;
            let shape = shape_of(&output, contract);
            let position = operations.len();
            let resolved = |kind, roles: Vec<ParamRole>| ResolvedOperation {
                name: method.name.clone(),
                params: method
                    .params
                    .iter()
                    .zip(roles)
                    .map(|(param, role)| ResolvedParam {
                        name: param.name.clone(),
                        ty: param.ty.clone(),
                        role,
                    })
                    .collect(),
                shape: shape.clone(),
                output: Some(output.clone()),
                kind,
                position,
                signature: Some(method.signature.clone()),
            };

            let operation = if let Some(crud) = Crud::named(&name) {
                if !is_structural_match(crud, method, &shape, contract) {
                    return Err(synthesis(
                        contract,
                        method,
                        format!(
                            "redeclares the baseline operation with a different signature; expected `{}`",
                            baseline_signature(crud, contract)
                        ),
                    ));
                }
                declared_crud.push(crud);
                resolved(OperationKind::PassThrough(crud), crud.roles())
            } else {
                let directives = directive_roles(contract, method)?;
                let filter_positions: Vec<usize> = (0..method.params.len())
                    .filter(|&position| directives[position].is_none())
                    .collect();

                let (mut kind, mut roles) = if let Some(marker) = method.marker(&self.config.query_marker) {
                    let text = syn::parse2::<LitStr>(marker.args.clone())
                        .map_err(|_| unsupported(contract, method, "expects a string literal query"))?
                        .value();
                    let params: Vec<String> = filter_positions
                        .iter()
                        .map(|&position| method.params[position].name.to_string())
                        .collect();
                    let plan = parse_declared(&text, &properties, &params)
                        .map_err(|detail| unsupported(contract, method, detail))?;
                    let subject = match shape {
                        ReturnShape::OptionalEntity | ReturnShape::Collection => Subject::Find,
                        ReturnShape::Count => Subject::Count,
                        ReturnShape::Exists => Subject::Exists,
                        ReturnShape::Unit => Subject::Delete,
                        _ => return Err(unproducible(contract, method, &output)),
                    };
                    let roles: Vec<ParamRole> =
                        params.into_iter().map(|name| ParamRole::Bound { name }).collect();
                    (OperationKind::Declared(DeclaredQuery { text, subject, plan }), roles)
                } else {
                    let query = conventions
                        .parse(&name, filter_positions.len())
                        .map_err(|detail| unsupported(contract, method, detail))?;
                    if !subject_produces(query.subject, &shape) {
                        return Err(unproducible(contract, method, &output));
                    }
                    let roles = filter_roles(&query.plan, filter_positions.len());
                    (OperationKind::Convention(query), roles)
                };

                if let Some((subject, plan)) = kind.query_mut() {
                    if subject != Subject::Find && directives.iter().any(Option::is_some) {
                        return Err(synthesis(
                            contract,
                            method,
                            "`Pagination` and `Sort` parameters only apply to find queries",
                        ));
                    }
                    // Positions so far count filter parameters only.
                    for predicate in plan.groups.iter_mut().flatten() {
                        for param in &mut predicate.params {
                            *param = filter_positions[*param];
                        }
                    }
                    for predicate in plan.predicates() {
                        if let Some(property) = contract.entity.property(&predicate.property) {
                            typing::check_predicate(predicate, &property.ty, &method.params)
                                .map_err(|detail| unsupported(contract, method, detail))?;
                        }
                    }
                }
                for (position, directive) in directives.into_iter().enumerate() {
                    if let Some(directive) = directive {
                        roles.insert(position, directive);
                    }
                }
                resolved(kind, roles)
            };
            log::debug!(
                "resolved {}::{} as {}",
                contract.name(),
                name,
                operation.kind.runtime_variant()
            );
            operations.push(operation);
        }

        for crud in Crud::canonical().filter(|crud| !declared_crud.contains(crud)) {
            log::debug!("injecting baseline {}::{}", contract.name(), crud);
            operations.push(crud.baseline(contract, operations.len()));
        }
        Ok(operations)
    }

    /// Check the method can be implemented and return the `T` of its
    /// `RepoFuture<'_, T>`.
    fn check_signature(
        &self,
        contract: &RepositoryContract<'_>,
        method: &MethodDeclaration,
    ) -> GenerationResult<Type> {
        let signature = &method.signature;
        let by_shared_ref = method
            .receiver
            .as_ref()
            .is_some_and(|r| r.reference.is_some() && r.mutability.is_none() && r.colon_token.is_none());
        if !by_shared_ref {
            return Err(synthesis(contract, method, "operations must take `&self`"));
        }
        if signature.asyncness.is_some() {
            return Err(synthesis(
                contract,
                method,
                "declare `fn ... -> RepoFuture<'_, T>` instead of `async fn`",
            ));
        }
        if !signature.generics.params.is_empty() {
            return Err(synthesis(contract, method, "generic operations are not supported"));
        }
        future_output(&method.output)
            .cloned()
            .ok_or_else(|| synthesis(contract, method, "operations must return `RepoFuture<'_, T>`"))
    }
}

/// `T` of `RepoFuture<'_, T>`
fn future_output(output: &ReturnType) -> Option<&Type> {
    let ReturnType::Type(_, ty) = output else {
        return None;
    };
    let Type::Path(path) = ty.as_ref() else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "RepoFuture" {
        return None;
    }
    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };
    let mut types = arguments.args.iter().filter_map(|argument| match argument {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    });
    let output = types.next()?;
    types.next().is_none().then_some(output)
}

pub(crate) fn is_entity(ty: &Type, contract: &RepositoryContract<'_>) -> bool {
    if same_tokens(ty, &contract.entity_type) {
        return true;
    }
    let Type::Path(path) = ty else {
        return false;
    };
    path.path.segments.last().is_some_and(|segment| {
        segment.ident == contract.entity.declaration.ident && segment.arguments.is_empty()
    })
}

fn same_tokens(left: &Type, right: &Type) -> bool {
    left.to_token_stream().to_string() == right.to_token_stream().to_string()
}

fn is_named(ty: &Type, names: &[&str]) -> bool {
    match ty {
        Type::Path(path) if path.qself.is_none() => path
            .path
            .get_ident()
            .is_some_and(|ident| names.iter().any(|name| ident == name)),
        _ => false,
    }
}

/// Classify the resolved value of an operation's future.
pub fn shape_of(ty: &Type, contract: &RepositoryContract<'_>) -> ReturnShape {
    if let Type::Tuple(tuple) = ty
        && tuple.elems.is_empty()
    {
        return ReturnShape::Unit;
    }
    if generic_inner(ty, "Option").is_some_and(|inner| is_entity(inner, contract)) {
        return ReturnShape::OptionalEntity;
    }
    if generic_inner(ty, "Vec").is_some_and(|inner| is_entity(inner, contract)) {
        return ReturnShape::Collection;
    }
    if is_entity(ty, contract) {
        return ReturnShape::Entity;
    }
    if is_named(ty, &["bool"]) {
        return ReturnShape::Exists;
    }
    if is_named(ty, INTEGERS) {
        return ReturnShape::Count;
    }
    ReturnShape::Unsupported(ty.to_token_stream().to_string())
}

fn param_role(ty: &Type, contract: &RepositoryContract<'_>) -> Option<ParamRole> {
    if same_tokens(ty, &contract.id_type) {
        Some(ParamRole::Identifier)
    } else if is_entity(ty, contract) {
        Some(ParamRole::Entity)
    } else if generic_inner(ty, "Vec").is_some_and(|inner| is_entity(inner, contract)) {
        Some(ParamRole::Entities)
    } else {
        None
    }
}

/// `Pagination` and `Sort` parameters by position; at most one of each.
fn directive_roles(
    contract: &RepositoryContract<'_>,
    method: &MethodDeclaration,
) -> GenerationResult<Vec<Option<ParamRole>>> {
    let roles: Vec<Option<ParamRole>> = method
        .params
        .iter()
        .map(|param| match typing::last_segment_name(&param.ty)?.as_str() {
            "Pagination" => Some(ParamRole::Page),
            "Sort" => Some(ParamRole::Sort),
            _ => None,
        })
        .collect();
    for (directive, type_name) in [(ParamRole::Page, "Pagination"), (ParamRole::Sort, "Sort")] {
        if roles.iter().filter(|role| role.as_ref() == Some(&directive)).count() > 1 {
            return Err(synthesis(
                contract,
                method,
                format!("at most one `{type_name}` parameter is allowed"),
            ));
        }
    }
    Ok(roles)
}

fn is_structural_match(
    crud: Crud,
    method: &MethodDeclaration,
    shape: &ReturnShape,
    contract: &RepositoryContract<'_>,
) -> bool {
    let roles: Vec<Option<ParamRole>> = method
        .params
        .iter()
        .map(|param| param_role(&param.ty, contract))
        .collect();
    let expected: Vec<Option<ParamRole>> = crud.roles().into_iter().map(Some).collect();
    *shape == crud.shape() && roles == expected
}

fn subject_produces(subject: Subject, shape: &ReturnShape) -> bool {
    matches!(
        (subject, shape),
        (Subject::Find, ReturnShape::OptionalEntity | ReturnShape::Collection)
            | (Subject::Count, ReturnShape::Count)
            | (Subject::Exists, ReturnShape::Exists)
            | (Subject::Delete, ReturnShape::Unit | ReturnShape::Count)
    )
}

/// Map each parameter position to the predicate consuming it.
fn filter_roles(plan: &QueryPlan, param_count: usize) -> Vec<ParamRole> {
    let mut roles = vec![ParamRole::Filter { index: 0 }; param_count];
    for (index, predicate) in plan.predicates().enumerate() {
        for &position in &predicate.params {
            if let Some(role) = roles.get_mut(position) {
                *role = ParamRole::Filter { index };
            }
        }
    }
    roles
}

fn baseline_signature(crud: Crud, contract: &RepositoryContract<'_>) -> String {
    let entity = contract.entity_type.to_token_stream().to_string();
    let id = contract.id_type.to_token_stream().to_string();
    match crud {
        Crud::FindById => format!("fn find_by_id(&self, id: {id}) -> RepoFuture<'_, Option<{entity}>>"),
        Crud::Save => format!("fn save(&self, entity: {entity}) -> RepoFuture<'_, {entity}>"),
        Crud::DeleteById => format!("fn delete_by_id(&self, id: {id}) -> RepoFuture<'_, ()>"),
        Crud::FindAll => format!("fn find_all(&self) -> RepoFuture<'_, Vec<{entity}>>"),
    }
}

fn unsupported(
    contract: &RepositoryContract<'_>,
    method: &MethodDeclaration,
    detail: impl Into<String>,
) -> GenerationError {
    GenerationError::UnsupportedQueryConvention {
        contract: contract.name(),
        method: method.name.to_string(),
        detail: detail.into(),
        span: method.span(),
    }
}

fn synthesis(
    contract: &RepositoryContract<'_>,
    method: &MethodDeclaration,
    detail: impl Into<String>,
) -> GenerationError {
    GenerationError::OperationSynthesis {
        contract: contract.name(),
        method: method.name.to_string(),
        detail: detail.into(),
        span: method.span(),
    }
}

fn unproducible(
    contract: &RepositoryContract<'_>,
    method: &MethodDeclaration,
    output: &Type,
) -> GenerationError {
    synthesis(
        contract,
        method,
        format!(
            "no session primitive produces `{}` for this query",
            output.to_token_stream()
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover::ContractDiscoverer;
    use crate::index::TypeIndex;
    use syn::{ItemMod, parse_quote};

    fn resolve_with(
        methods: proc_macro2::TokenStream,
    ) -> GenerationResult<Vec<ResolvedOperation>> {
        let module: ItemMod = parse_quote! {
            mod app {
                pub struct User {
                    #[id]
                    pub id: Option<u64>,
                    pub email: String,
                    pub age: u32,
                }
                pub trait UserRepository: ReactiveRepository<User, u64> {
                    #methods
                }
            }
        };
        let index = TypeIndex::from_module(&module).unwrap();
        let config = GeneratorConfig::default();
        let contracts = ContractDiscoverer::new(&index, &config).discover().unwrap();
        MethodResolver::new(&config).resolve(&contracts[0])
    }

    fn names(operations: &[ResolvedOperation]) -> Vec<String> {
        operations.iter().map(|op| op.name.to_string()).collect()
    }

    #[test]
    fn test_empty_contract_gets_the_baseline() {
        let operations = resolve_with(quote::quote!()).unwrap();
        assert_eq!(names(&operations), vec!["find_by_id", "save", "delete_by_id", "find_all"]);
        assert!(operations.iter().all(|op| matches!(op.kind, OperationKind::Baseline(_))));
        assert_eq!(operations[0].params[0].role, ParamRole::Identifier);
        assert_eq!(operations[1].params[0].role, ParamRole::Entity);
    }

    #[test]
    fn test_explicit_baseline_is_passed_through() {
        let operations = resolve_with(quote::quote! {
            fn count_by_age(&self, age: u32) -> RepoFuture<'_, u64>;
            fn save(&self, entity: User) -> RepoFuture<'_, User>;
        })
        .unwrap();
        assert_eq!(
            names(&operations),
            vec!["count_by_age", "save", "find_by_id", "delete_by_id", "find_all"]
        );
        assert_eq!(operations[1].kind, OperationKind::PassThrough(Crud::Save));
        assert!(operations[1].is_explicit());
    }

    #[test]
    fn test_convention_roles_and_shape() {
        let operations = resolve_with(quote::quote! {
            fn find_by_email(&self, email: &str) -> RepoFuture<'_, Option<User>>;
        })
        .unwrap();
        let find = &operations[0];
        assert_eq!(find.shape, ReturnShape::OptionalEntity);
        assert_eq!(find.params[0].role, ParamRole::Filter { index: 0 });
        let plan = find.kind.plan().unwrap();
        assert_eq!(plan.property_path(), vec!["email"]);
        assert_eq!(plan.groups[0][0].comparator, Comparator::Equals);
    }

    #[test]
    fn test_declared_query_binds_by_name() {
        let operations = resolve_with(quote::quote! {
            #[query("age > :min and email like :pattern")]
            fn search(&self, pattern: String, min: u32) -> RepoFuture<'_, Vec<User>>;
        })
        .unwrap();
        let OperationKind::Declared(query) = &operations[0].kind else {
            panic!("expected a declared query");
        };
        assert_eq!(query.subject, Subject::Find);
        assert_eq!(query.plan.groups[0][0].params, vec![1]);
        assert_eq!(query.plan.groups[0][1].params, vec![0]);
        assert_eq!(
            operations[0].params[0].role,
            ParamRole::Bound {
                name: "pattern".into()
            }
        );
    }

    #[test]
    fn test_default_methods_are_skipped() {
        let operations = resolve_with(quote::quote! {
            fn adults(&self) -> RepoFuture<'_, Vec<User>> {
                self.find_all()
            }
        })
        .unwrap();
        assert_eq!(operations.len(), 4);
    }

    #[test]
    fn test_default_method_with_declared_query_is_rejected() {
        let error = resolve_with(quote::quote! {
            #[query("age > :min")]
            fn older_than(&self, min: u32) -> RepoFuture<'_, Vec<User>> {
                self.find_all()
            }
        })
        .unwrap_err();
        let GenerationError::OperationSynthesis { method, detail, .. } = &error else {
            panic!("expected a synthesis error, got {error}");
        };
        assert_eq!(method, "older_than");
        assert!(detail.contains("default body"), "{detail}");
    }

    #[test]
    fn test_parameter_types_must_match_properties() {
        let error = resolve_with(quote::quote! {
            fn find_by_age(&self, age: String) -> RepoFuture<'_, Vec<User>>;
        })
        .unwrap_err();
        assert!(error.is_unsupported_query());
        assert!(error.to_string().contains("age: String"), "{error}");

        let error = resolve_with(quote::quote! {
            fn find_by_email_true(&self) -> RepoFuture<'_, Vec<User>>;
        })
        .unwrap_err();
        assert!(error.is_unsupported_query(), "{error}");

        let error = resolve_with(quote::quote! {
            #[query("age in :ages")]
            fn aged(&self, ages: u32) -> RepoFuture<'_, Vec<User>>;
        })
        .unwrap_err();
        assert!(error.is_unsupported_query(), "{error}");

        assert!(resolve_with(quote::quote! {
            fn find_by_age_greater_than(&self, age: u64) -> RepoFuture<'_, Vec<User>>;
            fn find_by_email_in(&self, emails: &[&str]) -> RepoFuture<'_, Vec<User>>;
        })
        .is_ok());
    }

    #[test]
    fn test_page_and_sort_parameters() {
        let operations = resolve_with(quote::quote! {
            fn find_by_age_greater_than(
                &self,
                page: Pagination,
                age: u32,
                sort: &query::Sort,
            ) -> RepoFuture<'_, Vec<User>>;

            #[query("email like :pattern")]
            fn matching(&self, pattern: String, page: Pagination) -> RepoFuture<'_, Vec<User>>;
        })
        .unwrap();

        let roles: Vec<&ParamRole> = operations[0].params.iter().map(|p| &p.role).collect();
        assert_eq!(
            roles,
            vec![&ParamRole::Page, &ParamRole::Filter { index: 0 }, &ParamRole::Sort]
        );
        assert_eq!(operations[0].kind.plan().unwrap().groups[0][0].params, vec![1]);

        assert_eq!(operations[1].params[1].role, ParamRole::Page);
        assert_eq!(operations[1].kind.plan().unwrap().groups[0][0].params, vec![0]);
    }

    #[test]
    fn test_page_parameters_only_apply_to_find() {
        let error = resolve_with(quote::quote! {
            fn count_by_age(&self, age: u32, page: Pagination) -> RepoFuture<'_, u64>;
        })
        .unwrap_err();
        assert!(matches!(error, GenerationError::OperationSynthesis { .. }), "{error}");

        let error = resolve_with(quote::quote! {
            fn find_by_age(&self, age: u32, first: Sort, second: Sort) -> RepoFuture<'_, Vec<User>>;
        })
        .unwrap_err();
        assert!(error.to_string().contains("at most one `Sort`"), "{error}");
    }

    #[test]
    fn test_unknown_property_is_unsupported() {
        let error = resolve_with(quote::quote! {
            fn find_by_nickname(&self, nickname: &str) -> RepoFuture<'_, Option<User>>;
        })
        .unwrap_err();
        assert!(error.is_unsupported_query());
    }

    #[test]
    fn test_shape_without_primitive_fails_synthesis() {
        let error = resolve_with(quote::quote! {
            fn count_by_age(&self, age: u32) -> RepoFuture<'_, Vec<User>>;
        })
        .unwrap_err();
        assert!(matches!(error, GenerationError::OperationSynthesis { .. }));

        let error = resolve_with(quote::quote! {
            fn find_by_email(&self, email: &str) -> RepoFuture<'_, String>;
        })
        .unwrap_err();
        assert!(matches!(error, GenerationError::OperationSynthesis { .. }));
    }

    #[test]
    fn test_signature_requirements() {
        for methods in [
            quote::quote!(fn find_by_age(&mut self, age: u32) -> RepoFuture<'_, Vec<User>>;),
            quote::quote!(async fn find_by_age(&self, age: u32) -> Vec<User>;),
            quote::quote!(fn find_by_age(&self, age: u32) -> Vec<User>;),
            quote::quote!(fn find_by_age<T>(&self, age: T) -> RepoFuture<'_, Vec<User>>;),
            quote::quote!(fn find_by_id(&self, id: String) -> RepoFuture<'_, Option<User>>;),
        ] {
            let error = resolve_with(methods).unwrap_err();
            assert!(matches!(error, GenerationError::OperationSynthesis { .. }), "{error}");
        }
    }
}

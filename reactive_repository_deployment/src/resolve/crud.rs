//! The baseline CRUD operations.

use quote::format_ident;
use strum::IntoEnumIterator;

use super::operation::{Crud, OperationKind, ParamRole, ResolvedOperation, ResolvedParam, ReturnShape};
use crate::discover::RepositoryContract;

impl Crud {
    /// Canonical order: `find_by_id`, `save`, `delete_by_id`, `find_all`.
    pub fn canonical() -> impl Iterator<Item = Crud> {
        Crud::iter()
    }

    pub fn named(name: &str) -> Option<Crud> {
        Crud::iter().find(|crud| crud.name() == name)
    }

    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn roles(self) -> Vec<ParamRole> {
        match self {
            Crud::FindById | Crud::DeleteById => vec![ParamRole::Identifier],
            Crud::Save => vec![ParamRole::Entity],
            Crud::FindAll => Vec::new(),
        }
    }

    pub fn shape(self) -> ReturnShape {
        match self {
            Crud::FindById => ReturnShape::OptionalEntity,
            Crud::Save => ReturnShape::Entity,
            Crud::DeleteById => ReturnShape::Unit,
            Crud::FindAll => ReturnShape::Collection,
        }
    }

    /// The operation injected when the contract does not declare it.
    pub(crate) fn baseline(self, contract: &RepositoryContract<'_>, position: usize) -> ResolvedOperation {
        let params = self
            .roles()
            .into_iter()
            .map(|role| match role {
                ParamRole::Entity => ResolvedParam {
                    name: format_ident!("entity"),
                    ty: contract.entity_type.clone(),
                    role,
                },
                _ => ResolvedParam {
                    name: format_ident!("id"),
                    ty: contract.id_type.clone(),
                    role,
                },
            })
            .collect();
        ResolvedOperation {
            name: format_ident!("{}", self.name(), span = contract.span()),
            params,
            shape: self.shape(),
            output: None,
            kind: OperationKind::Baseline(self),
            position,
            signature: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order() {
        let names: Vec<&str> = Crud::canonical().map(Crud::name).collect();
        assert_eq!(names, vec!["find_by_id", "save", "delete_by_id", "find_all"]);
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(Crud::named("delete_by_id"), Some(Crud::DeleteById));
        assert_eq!(Crud::named("delete"), None);
    }
}

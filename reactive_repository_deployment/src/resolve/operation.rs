//! Resolved operations and the query plans they carry.

use proc_macro2::{Ident, Span};
use strum::{AsRefStr, Display, EnumIter, IntoStaticStr};
use syn::{Signature, Type};

/// The baseline CRUD set every contract supports, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Crud {
    FindById,
    Save,
    DeleteById,
    FindAll,
}

/// What a parameter contributes to the operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamRole {
    Identifier,
    Entity,
    Entities,
    /// Operand of the predicate at `index` in a derived query
    Filter { index: usize },
    /// Bound by name into declared query text
    Bound { name: String },
    /// Call-time `Pagination` applied to a find query
    Page,
    /// Call-time `Sort` appended to a find query's order
    Sort,
}

impl ParamRole {
    /// Shapes the result rather than filtering it.
    pub fn is_directive(&self) -> bool {
        matches!(self, Self::Page | Self::Sort)
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedParam {
    pub name: Ident,
    pub ty: Type,
    pub role: ParamRole,
}

/// Shape of the value an operation's future resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnShape {
    OptionalEntity,
    Entity,
    Collection,
    Count,
    Exists,
    Unit,
    Unsupported(String),
}

/// What a derived or declared query does with the rows it selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Subject {
    Find,
    Count,
    Exists,
    Delete,
}

/// Mirrors the runtime comparator set; variant names are emitted verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr)]
pub enum Comparator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    Between,
    In,
    NotIn,
    Like,
    NotLike,
    Containing,
    NotContaining,
    StartingWith,
    EndingWith,
    IsNull,
    IsNotNull,
    IsTrue,
    IsFalse,
    IsEmpty,
    IsNotEmpty,
}

impl Comparator {
    /// Number of parameters the comparator consumes.
    pub fn arity(self) -> usize {
        match self {
            Self::IsNull
            | Self::IsNotNull
            | Self::IsTrue
            | Self::IsFalse
            | Self::IsEmpty
            | Self::IsNotEmpty => 0,
            Self::Between => 2,
            _ => 1,
        }
    }

    /// Takes a collection parameter.
    pub fn takes_list(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub property: String,
    pub comparator: Comparator,
    pub ignore_case: bool,
    /// Positions of the method parameters supplying the operand
    pub params: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    pub property: String,
    pub direction: Direction,
}

/// Filter in disjunctive normal form plus ordering and paging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryPlan {
    pub groups: Vec<Vec<Predicate>>,
    pub order: Vec<OrderKey>,
    pub limit: Option<usize>,
}

impl QueryPlan {
    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.groups.iter().flatten()
    }

    /// `["email"]` for `find_by_email`
    pub fn property_path(&self) -> Vec<&str> {
        self.predicates().map(|p| p.property.as_str()).collect()
    }
}

/// A query derived from the method name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionQuery {
    pub subject: Subject,
    pub distinct: bool,
    pub plan: QueryPlan,
}

/// A query parsed from `#[query("...")]` text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredQuery {
    pub text: String,
    pub subject: Subject,
    pub plan: QueryPlan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationKind {
    /// Injected because the contract does not declare it
    Baseline(Crud),
    /// Declared by the contract with the baseline signature
    PassThrough(Crud),
    Convention(ConventionQuery),
    Declared(DeclaredQuery),
}

impl OperationKind {
    /// Name of the matching runtime `OperationKind` variant.
    pub fn runtime_variant(&self) -> &'static str {
        match self {
            Self::Baseline(_) => "Baseline",
            Self::PassThrough(_) => "PassThrough",
            Self::Convention(_) => "Convention",
            Self::Declared(_) => "Declared",
        }
    }

    pub fn crud(&self) -> Option<Crud> {
        match self {
            Self::Baseline(crud) | Self::PassThrough(crud) => Some(*crud),
            _ => None,
        }
    }

    pub fn plan(&self) -> Option<&QueryPlan> {
        match self {
            Self::Convention(query) => Some(&query.plan),
            Self::Declared(query) => Some(&query.plan),
            _ => None,
        }
    }

    pub(crate) fn query_mut(&mut self) -> Option<(Subject, &mut QueryPlan)> {
        match self {
            Self::Convention(query) => Some((query.subject, &mut query.plan)),
            Self::Declared(query) => Some((query.subject, &mut query.plan)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedOperation {
    pub name: Ident,
    pub params: Vec<ResolvedParam>,
    pub shape: ReturnShape,
    /// `T` of `RepoFuture<'_, T>` as declared; `None` for injected baselines
    pub output: Option<Type>,
    pub kind: OperationKind,
    /// Declaration order among explicit methods, or canonical baseline order
    pub position: usize,
    /// Present for every explicitly declared operation
    pub signature: Option<Signature>,
}

impl ResolvedOperation {
    pub fn is_explicit(&self) -> bool {
        self.signature.is_some()
    }

    pub fn span(&self) -> Span {
        self.name.span()
    }
}

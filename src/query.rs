//! Filter, ordering and paging model shared by every session.
//!
//! A [`Query`] is what generated convention and declared-query methods hand to
//! [`ReactiveSession::select`](crate::traits::session::ReactiveSession::select).
//! Filters are kept in disjunctive normal form: a list of AND-groups joined by
//! OR, which is exactly the shape produced by `find_by_a_and_b_or_c` names.

use std::cmp::Ordering;

use strum::{AsRefStr, Display, EnumString};

use crate::traits::model::Entity;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
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

/// Right-hand side of a [`Condition`].
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    Single(Value),
    Range(Value, Value),
    List(Vec<Value>),
}

impl Operand {
    pub fn single(value: impl Into<Value>) -> Self {
        Operand::Single(value.into())
    }

    pub fn range(low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Operand::Range(low.into(), high.into())
    }

    pub fn list<I>(values: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Operand::List(values.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub property: &'static str,
    pub comparator: Comparator,
    pub operand: Operand,
    pub ignore_case: bool,
}

impl Condition {
    pub fn new(property: &'static str, comparator: Comparator, operand: Operand) -> Self {
        Self {
            property,
            comparator,
            operand,
            ignore_case: false,
        }
    }

    pub fn ignoring_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    /// Evaluate this condition against a single entity.
    ///
    /// Unknown properties read as `Null`. Comparisons between values of
    /// unrelated kinds never match.
    pub fn matches<E: Entity>(&self, entity: &E) -> bool {
        let actual = entity.property(self.property).unwrap_or(Value::Null);
        let fold = |v: &Value| if self.ignore_case { v.folded() } else { v.clone() };
        let actual = fold(&actual);

        match (&self.comparator, &self.operand) {
            (Comparator::IsNull, _) => actual.is_null(),
            (Comparator::IsNotNull, _) => !actual.is_null(),
            (Comparator::IsTrue, _) => actual.as_bool() == Some(true),
            (Comparator::IsFalse, _) => actual.as_bool() == Some(false),
            (Comparator::IsEmpty, _) => actual.is_empty(),
            (Comparator::IsNotEmpty, _) => !actual.is_empty(),
            (Comparator::Between, Operand::Range(low, high)) => {
                let low = fold(low);
                let high = fold(high);
                matches!(
                    actual.compare(&low),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(actual.compare(&high), Some(Ordering::Less | Ordering::Equal))
            }
            (Comparator::In, Operand::List(values)) => {
                values.iter().any(|v| actual.loosely_equals(&fold(v)))
            }
            (Comparator::NotIn, Operand::List(values)) => {
                !values.iter().any(|v| actual.loosely_equals(&fold(v)))
            }
            (comparator, Operand::Single(expected)) => {
                let expected = fold(expected);
                compare_single(*comparator, &actual, &expected)
            }
            _ => false,
        }
    }
}

fn compare_single(comparator: Comparator, actual: &Value, expected: &Value) -> bool {
    let ordering = actual.compare(expected);
    let texts = actual.as_text().zip(expected.as_text());
    match comparator {
        Comparator::Equals => ordering == Some(Ordering::Equal),
        Comparator::NotEquals => ordering != Some(Ordering::Equal),
        Comparator::GreaterThan => ordering == Some(Ordering::Greater),
        Comparator::GreaterThanEqual => {
            matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
        }
        Comparator::LessThan => ordering == Some(Ordering::Less),
        Comparator::LessThanEqual => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        Comparator::Like => texts.is_some_and(|(a, p)| like(a, p)),
        Comparator::NotLike => texts.is_some_and(|(a, p)| !like(a, p)),
        Comparator::Containing => texts.is_some_and(|(a, n)| a.contains(n)),
        Comparator::NotContaining => texts.is_some_and(|(a, n)| !a.contains(n)),
        Comparator::StartingWith => texts.is_some_and(|(a, p)| a.starts_with(p)),
        Comparator::EndingWith => texts.is_some_and(|(a, s)| a.ends_with(s)),
        _ => false,
    }
}

/// SQL `LIKE` matching: `%` matches any run of characters, `_` exactly one.
fn like(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    let (mut t, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('%') => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '_' || c == text[t] => {
                t += 1;
                p += 1;
            }
            _ => match backtrack {
                Some((bp, bt)) => {
                    p = bp + 1;
                    t = bt + 1;
                    backtrack = Some((bp, bt + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|c| *c == '%')
}

/// Conditions in disjunctive normal form.
///
/// An empty filter matches every entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    groups: Vec<Vec<Condition>>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    /// Add a condition to the current AND-group.
    pub fn and(mut self, condition: Condition) -> Self {
        match self.groups.last_mut() {
            Some(group) => group.push(condition),
            None => self.groups.push(vec![condition]),
        }
        self
    }

    /// Start a new AND-group with `condition`.
    pub fn or(mut self, condition: Condition) -> Self {
        self.groups.push(vec![condition]);
        self
    }

    pub fn groups(&self) -> &[Vec<Condition>] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn matches<E: Entity>(&self, entity: &E) -> bool {
        self.groups.is_empty()
            || self
                .groups
                .iter()
                .any(|group| group.iter().all(|c| c.matches(entity)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, AsRefStr, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub property: &'static str,
    pub direction: Direction,
}

impl Order {
    pub fn asc(property: &'static str) -> Self {
        Self {
            property,
            direction: Direction::Asc,
        }
    }

    pub fn desc(property: &'static str) -> Self {
        Self {
            property,
            direction: Direction::Desc,
        }
    }
}

/// Sort keys supplied at call time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sort {
    pub orders: Vec<Order>,
}

impl Sort {
    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn by(order: Order) -> Self {
        Self {
            orders: vec![order],
        }
    }

    /// Add a key compared after the existing ones.
    pub fn then(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Pagination {
    pub fn unpaged() -> Self {
        Self::default()
    }

    /// Page `number` (from zero) of `size` rows.
    ///
    /// # Example
    ///
    /// ```
    /// use reactive_repository::query::Pagination;
    ///
    /// let page = Pagination::page(2, 10);
    /// assert_eq!(page.offset, Some(20));
    /// assert_eq!(page.limit, Some(10));
    /// ```
    pub fn page(number: usize, size: usize) -> Self {
        Self {
            limit: Some(size),
            offset: Some(number.saturating_mul(size)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filter: Filter,
    pub order: Vec<Order>,
    pub pagination: Pagination,
}

impl Query {
    /// Create a query matching everything.
    ///
    /// # Example
    ///
    /// ```
    /// use reactive_repository::query::Query;
    ///
    /// let query = Query::new();
    /// assert!(query.filter.is_empty());
    /// assert_eq!(query.pagination.limit, None);
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filtered(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    /// Append a sort key.
    ///
    /// # Example
    ///
    /// ```
    /// use reactive_repository::query::{Direction, Order, Query};
    ///
    /// let query = Query::new().order_by(Order::desc("age"));
    /// assert_eq!(query.order[0].direction, Direction::Desc);
    /// ```
    pub fn order_by(mut self, order: Order) -> Self {
        self.order.push(order);
        self
    }

    /// Set a limit on the number of results.
    ///
    /// # Example
    ///
    /// ```
    /// use reactive_repository::query::Query;
    ///
    /// let query = Query::new().with_limit(10);
    /// assert_eq!(query.pagination.limit, Some(10));
    /// ```
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.pagination.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.pagination.offset = Some(offset);
        self
    }

    /// Append call-time sort keys after the ones already present.
    pub fn sorted(mut self, sort: Sort) -> Self {
        self.order.extend(sort.orders);
        self
    }

    /// Apply a call-time page. The offset replaces any existing one; the
    /// smaller of the two limits is kept.
    ///
    /// # Example
    ///
    /// ```
    /// use reactive_repository::query::{Pagination, Query};
    ///
    /// let query = Query::new().with_limit(3).paged(Pagination::page(1, 10));
    /// assert_eq!(query.pagination.limit, Some(3));
    /// assert_eq!(query.pagination.offset, Some(10));
    /// ```
    pub fn paged(mut self, page: Pagination) -> Self {
        self.pagination.limit = match (self.pagination.limit, page.limit) {
            (Some(own), Some(requested)) => Some(own.min(requested)),
            (own, requested) => own.or(requested),
        };
        if page.offset.is_some() {
            self.pagination.offset = page.offset;
        }
        self
    }

    /// Filter, sort and page `rows` in memory.
    pub fn apply<E: Entity>(&self, rows: impl IntoIterator<Item = E>) -> Vec<E> {
        let mut matched: Vec<E> = rows
            .into_iter()
            .filter(|row| self.filter.matches(row))
            .collect();

        if !self.order.is_empty() {
            matched.sort_by(|a, b| self.compare_rows(a, b));
        }

        let offset = self.pagination.offset.unwrap_or(0);
        let limit = self.pagination.limit.unwrap_or(usize::MAX);
        matched.into_iter().skip(offset).take(limit).collect()
    }

    fn compare_rows<E: Entity>(&self, a: &E, b: &E) -> Ordering {
        for order in &self.order {
            let left = a.property(order.property).unwrap_or(Value::Null);
            let right = b.property(order.property).unwrap_or(Value::Null);
            let ordering = match (left.is_null(), right.is_null()) {
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                _ => left.compare(&right).unwrap_or(Ordering::Equal),
            };
            let ordering = match order.direction {
                Direction::Asc => ordering,
                Direction::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_patterns() {
        assert!(like("alice@example.com", "%@example.com"));
        assert!(like("bob", "b_b"));
        assert!(like("bob", "%"));
        assert!(!like("bob", "b_"));
        assert!(like("abcabc", "%c%c"));
    }

    #[test]
    fn test_filter_groups() {
        let a = Condition::new("a", Comparator::IsTrue, Operand::None);
        let b = Condition::new("b", Comparator::IsTrue, Operand::None);
        let c = Condition::new("c", Comparator::IsTrue, Operand::None);
        let filter = Filter::all().and(a).and(b).or(c);
        assert_eq!(filter.groups().len(), 2);
        assert_eq!(filter.groups()[0].len(), 2);
        assert_eq!(filter.groups()[1].len(), 1);
    }

    #[test]
    fn test_call_time_sort_follows_static_keys() {
        let query = Query::new()
            .order_by(Order::asc("last_name"))
            .sorted(Sort::by(Order::desc("age")).then(Order::asc("email")));
        let keys: Vec<_> = query.order.iter().map(|o| (o.property, o.direction)).collect();
        assert_eq!(
            keys,
            vec![
                ("last_name", Direction::Asc),
                ("age", Direction::Desc),
                ("email", Direction::Asc),
            ]
        );
        assert_eq!(Query::new().sorted(Sort::unsorted()).order, Vec::new());
    }

    #[test]
    fn test_paging_keeps_the_tighter_limit() {
        let query = Query::new().with_limit(5).paged(Pagination::page(0, 2));
        assert_eq!(query.pagination, Pagination { limit: Some(2), offset: Some(0) });
        let query = Query::new().with_offset(4).paged(Pagination::unpaged());
        assert_eq!(query.pagination, Pagination { limit: None, offset: Some(4) });
    }

    #[test]
    fn test_comparator_names() {
        assert_eq!(Comparator::GreaterThanEqual.as_ref(), "greater_than_equal");
        assert_eq!("starting_with".parse::<Comparator>().ok(), Some(Comparator::StartingWith));
    }
}

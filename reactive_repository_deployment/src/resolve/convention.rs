//! Query derivation from method names.
//!
//! ```text
//! method     := prefix limit? "distinct"? "all"? ("by" criteria)? order?
//! prefix     := find | read | get | query | count | exists | delete | remove
//! limit      := (first | top) NUMBER?
//! criteria   := predicate ((and | or) predicate)*
//! predicate  := property qualifier? ("ignore" "case")?
//! order      := "order" "by" property (asc | desc)? ("and"? property (asc | desc)?)*
//! ```
//!
//! Properties are matched longest-first against the entity's declared
//! property names, so `find_by_first_name_and_last_name` splits correctly
//! even when both `first` and `first_name` are properties. When a parse
//! fails the error describes the furthest point any alternative reached.

use super::operation::{
    Comparator, ConventionQuery, Direction, OrderKey, Predicate, QueryPlan, Subject,
};
use crate::naming::method_tokens;

/// Qualifier token sequences, longest first within each family.
const QUALIFIERS: &[(&[&str], Comparator)] = &[
    (&["greater", "than", "equal"], Comparator::GreaterThanEqual),
    (&["less", "than", "equal"], Comparator::LessThanEqual),
    (&["not", "null"], Comparator::IsNotNull),
    (&["not", "empty"], Comparator::IsNotEmpty),
    (&["not", "in"], Comparator::NotIn),
    (&["not", "like"], Comparator::NotLike),
    (&["not", "containing"], Comparator::NotContaining),
    (&["starting", "with"], Comparator::StartingWith),
    (&["ending", "with"], Comparator::EndingWith),
    (&["greater", "than"], Comparator::GreaterThan),
    (&["less", "than"], Comparator::LessThan),
    (&["equals"], Comparator::Equals),
    (&["not"], Comparator::NotEquals),
    (&["after"], Comparator::GreaterThan),
    (&["before"], Comparator::LessThan),
    (&["between"], Comparator::Between),
    (&["in"], Comparator::In),
    (&["like"], Comparator::Like),
    (&["containing"], Comparator::Containing),
    (&["null"], Comparator::IsNull),
    (&["empty"], Comparator::IsEmpty),
    (&["true"], Comparator::IsTrue),
    (&["false"], Comparator::IsFalse),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connector {
    And,
    Or,
}

/// Furthest point a failed parse reached, with its explanation.
#[derive(Default)]
struct Failure {
    at: usize,
    detail: Option<String>,
}

impl Failure {
    fn record(&mut self, at: usize, detail: impl FnOnce() -> String) {
        if self.detail.is_none() || at > self.at {
            self.at = at;
            self.detail = Some(detail());
        }
    }
}

pub struct ConventionParser {
    /// `(tokens, name)`, longest token sequence first
    properties: Vec<(Vec<String>, String)>,
}

impl ConventionParser {
    pub fn new<I, P>(properties: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        let mut properties: Vec<(Vec<String>, String)> = properties
            .into_iter()
            .map(|name| {
                let name: String = name.into();
                (method_tokens(&name), name)
            })
            .collect();
        properties.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.1.cmp(&b.1)));
        Self { properties }
    }

    /// Parse `method` into a query consuming exactly `param_count` parameters.
    pub fn parse(&self, method: &str, param_count: usize) -> Result<ConventionQuery, String> {
        let tokens = method_tokens(method);
        let Some((prefix, mut rest)) = tokens.split_first() else {
            return Err("empty method name".to_string());
        };
        let subject = match prefix.as_str() {
            "find" | "read" | "get" | "query" => Subject::Find,
            "count" => Subject::Count,
            "exists" => Subject::Exists,
            "delete" | "remove" => Subject::Delete,
            other => {
                return Err(format!(
                    "prefix `{other}` is not one of find, read, get, query, count, exists, delete, remove"
                ));
            }
        };

        let mut limit = None;
        let mut qualified = false;
        if let Some(first) = rest.first()
            && matches!(first.as_str(), "first" | "top")
        {
            if subject != Subject::Find {
                return Err(format!("`{first}` only applies to find queries"));
            }
            rest = &rest[1..];
            limit = Some(1);
            if let Some(count) = rest.first().and_then(|t| t.parse::<usize>().ok()) {
                if count == 0 {
                    return Err("result limit must be at least 1".to_string());
                }
                limit = Some(count);
                rest = &rest[1..];
            }
            qualified = true;
        }
        let distinct = rest.first().is_some_and(|t| t == "distinct");
        if distinct {
            rest = &rest[1..];
            qualified = true;
        }
        if rest.first().is_some_and(|t| t == "all") {
            rest = &rest[1..];
            qualified = true;
        }

        let (groups, order) = match rest {
            [by, criteria @ ..] if by == "by" => {
                if criteria.is_empty() {
                    return Err("`by` must be followed by at least one property".to_string());
                }
                self.criteria_and_order(criteria)?
            }
            [order, by, keys @ ..] if order == "order" && by == "by" => {
                (Vec::new(), self.order(keys).map_err(|(_, detail)| detail)?)
            }
            [] if qualified => (Vec::new(), Vec::new()),
            [] => return Err(format!("expected `by` after `{prefix}`")),
            [other, ..] => return Err(format!("expected `by` after `{prefix}`, found `{other}`")),
        };

        let mut plan = QueryPlan {
            groups,
            order,
            limit,
        };
        let consumed = assign_params(&mut plan);
        if consumed != param_count {
            return Err(format!(
                "the derived query takes {consumed} parameter(s) but the method declares {param_count}"
            ));
        }

        Ok(ConventionQuery {
            subject,
            distinct,
            plan,
        })
    }

    /// Try every `order by` split left to right, then the whole tail as
    /// criteria; the first alternative that fully resolves wins. When none
    /// does, the failure that got furthest is reported.
    fn criteria_and_order(
        &self,
        tokens: &[String],
    ) -> Result<(Vec<Vec<Predicate>>, Vec<OrderKey>), String> {
        let mut failure = Failure::default();
        let splits = (1..tokens.len().saturating_sub(1))
            .filter(|&at| tokens[at] == "order" && tokens[at + 1] == "by");
        for at in splits {
            let attempt = self.criteria(&tokens[..at]).and_then(|groups| {
                let order = self
                    .order(&tokens[at + 2..])
                    .map_err(|(position, detail)| (at + 2 + position, detail))?;
                Ok((groups, order))
            });
            match attempt {
                Ok(parsed) => return Ok(parsed),
                Err((position, detail)) => failure.record(position, || detail),
            }
        }
        match self.criteria(tokens) {
            Ok(groups) => Ok((groups, Vec::new())),
            Err((position, detail)) => {
                failure.record(position, || detail);
                Err(failure
                    .detail
                    .unwrap_or_else(|| "criteria could not be parsed".to_string()))
            }
        }
    }

    /// Errors carry the token position the parse reached.
    fn criteria(&self, tokens: &[String]) -> Result<Vec<Vec<Predicate>>, (usize, String)> {
        let mut failure = Failure::default();
        let Some(chain) = self.predicates(tokens, 0, &mut failure) else {
            let detail = failure
                .detail
                .unwrap_or_else(|| "criteria could not be parsed".to_string());
            return Err((failure.at, detail));
        };
        let mut groups: Vec<Vec<Predicate>> = Vec::new();
        for (connector, predicate) in chain {
            match (connector, groups.last_mut()) {
                (Connector::And, Some(group)) => group.push(predicate),
                _ => groups.push(vec![predicate]),
            }
        }
        Ok(groups)
    }

    /// Parse predicates from `at` to the end, backtracking over property and
    /// qualifier alternatives.
    fn predicates(
        &self,
        tokens: &[String],
        at: usize,
        failure: &mut Failure,
    ) -> Option<Vec<(Connector, Predicate)>> {
        let properties = self.properties_at(tokens, at);
        if properties.is_empty() {
            failure.record(at, || {
                format!("no property of the entity matches `{}`", segment(tokens, at))
            });
            return None;
        }

        for (length, property) in properties {
            let after_property = at + length;
            for (consumed, comparator) in qualifiers_at(tokens, after_property) {
                let mut next = after_property + consumed;
                let ignore_case = starts_with_words(&tokens[next..], &["ignore", "case"]);
                if ignore_case {
                    next += 2;
                }
                let predicate = Predicate {
                    property: property.to_string(),
                    comparator,
                    ignore_case,
                    params: Vec::new(),
                };
                let connector = match tokens.get(next).map(String::as_str) {
                    None => return Some(vec![(Connector::And, predicate)]),
                    Some("and") => Connector::And,
                    Some("or") => Connector::Or,
                    Some(_) => {
                        failure.record(next, || {
                            format!(
                                "unrecognized qualifier `{}` after property `{property}`",
                                segment(tokens, next)
                            )
                        });
                        continue;
                    }
                };
                if let Some(mut tail) = self.predicates(tokens, next + 1, failure) {
                    if let Some(head) = tail.first_mut() {
                        head.0 = connector;
                    }
                    tail.insert(0, (Connector::And, predicate));
                    return Some(tail);
                }
            }
        }
        None
    }

    fn order(&self, tokens: &[String]) -> Result<Vec<OrderKey>, (usize, String)> {
        if tokens.is_empty() {
            return Err((0, "`order_by` must be followed by at least one property".to_string()));
        }
        let mut keys = Vec::new();
        let mut at = 0;
        while at < tokens.len() {
            let Some((length, property)) = self.properties_at(tokens, at).into_iter().next() else {
                return Err((
                    at,
                    format!(
                        "no property of the entity matches `{}` in the order clause",
                        segment(tokens, at)
                    ),
                ));
            };
            at += length;
            let direction = match tokens.get(at).map(String::as_str) {
                Some("desc") => {
                    at += 1;
                    Direction::Desc
                }
                Some("asc") => {
                    at += 1;
                    Direction::Asc
                }
                _ => Direction::Asc,
            };
            keys.push(OrderKey {
                property: property.to_string(),
                direction,
            });
            if tokens.get(at).is_some_and(|t| t == "and") && at + 1 < tokens.len() {
                at += 1;
            }
        }
        Ok(keys)
    }

    fn properties_at(&self, tokens: &[String], at: usize) -> Vec<(usize, &str)> {
        let rest = tokens.get(at..).unwrap_or_default();
        self.properties
            .iter()
            .filter(|(property_tokens, _)| rest.starts_with(property_tokens))
            .map(|(property_tokens, name)| (property_tokens.len(), name.as_str()))
            .collect()
    }
}

/// Qualifier alternatives at `at` as `(tokens consumed, comparator)`,
/// longest first. Always ends with the implicit equality.
fn qualifiers_at(tokens: &[String], at: usize) -> Vec<(usize, Comparator)> {
    let rest = tokens.get(at..).unwrap_or_default();
    let mut found = Vec::new();
    let has_is = rest.first().is_some_and(|t| t == "is");
    for offset in [usize::from(has_is), 0] {
        for (sequence, comparator) in QUALIFIERS {
            if starts_with_words(&rest[offset..], sequence) {
                found.push((offset + sequence.len(), *comparator));
            }
        }
        if offset == 0 {
            break;
        }
    }
    if has_is {
        found.push((1, Comparator::Equals));
    }
    found.sort_by(|a, b| b.0.cmp(&a.0));
    found.dedup();
    found.push((0, Comparator::Equals));
    found
}

fn starts_with_words(tokens: &[String], words: &[&str]) -> bool {
    tokens.len() >= words.len() && tokens.iter().zip(words).all(|(token, word)| token == word)
}

/// Give each predicate its parameter positions, returning how many were used.
fn assign_params(plan: &mut QueryPlan) -> usize {
    let mut next = 0;
    for predicate in plan.groups.iter_mut().flatten() {
        let arity = predicate.comparator.arity();
        predicate.params = (next..next + arity).collect();
        next += arity;
    }
    next
}

/// Tokens from `at` up to the next connector, for error messages.
fn segment(tokens: &[String], at: usize) -> String {
    let rest = tokens.get(at..).unwrap_or_default();
    let end = rest
        .iter()
        .position(|t| t == "and" || t == "or")
        .unwrap_or(rest.len());
    rest[..end].join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ConventionParser {
        ConventionParser::new([
            "id",
            "email",
            "first",
            "first_name",
            "last_name",
            "age",
            "active",
            "created_at",
            "nickname_hint",
        ])
    }

    fn predicate(property: &str, comparator: Comparator, params: Vec<usize>) -> Predicate {
        Predicate {
            property: property.to_string(),
            comparator,
            ignore_case: false,
            params,
        }
    }

    #[test]
    fn test_find_by_single_property() {
        let query = parser().parse("find_by_email", 1).unwrap();
        assert_eq!(query.subject, Subject::Find);
        assert_eq!(query.plan.property_path(), vec!["email"]);
        assert_eq!(
            query.plan.groups,
            vec![vec![predicate("email", Comparator::Equals, vec![0])]]
        );
    }

    #[test]
    fn test_longest_property_wins() {
        let query = parser().parse("find_by_first_name_and_last_name", 2).unwrap();
        assert_eq!(query.plan.property_path(), vec!["first_name", "last_name"]);
    }

    #[test]
    fn test_shorter_property_used_when_longer_fails() {
        // `first_name` does not match here, `first` does
        let query = parser().parse("find_by_first_is_null", 0).unwrap();
        assert_eq!(
            query.plan.groups,
            vec![vec![predicate("first", Comparator::IsNull, vec![])]]
        );
    }

    #[test]
    fn test_or_starts_a_new_group() {
        let query = parser()
            .parse("find_by_email_or_age_greater_than_and_active_true", 2)
            .unwrap();
        assert_eq!(
            query.plan.groups,
            vec![
                vec![predicate("email", Comparator::Equals, vec![0])],
                vec![
                    predicate("age", Comparator::GreaterThan, vec![1]),
                    predicate("active", Comparator::IsTrue, vec![]),
                ],
            ]
        );
    }

    #[test]
    fn test_qualifiers_and_arity() {
        let query = parser()
            .parse("count_by_age_between_and_created_at_is_not_null", 2)
            .unwrap();
        assert_eq!(query.subject, Subject::Count);
        assert_eq!(
            query.plan.groups[0],
            vec![
                predicate("age", Comparator::Between, vec![0, 1]),
                predicate("created_at", Comparator::IsNotNull, vec![]),
            ]
        );
    }

    #[test]
    fn test_ignore_case() {
        let query = parser()
            .parse("find_by_email_containing_ignore_case", 1)
            .unwrap();
        let first = &query.plan.groups[0][0];
        assert_eq!(first.comparator, Comparator::Containing);
        assert!(first.ignore_case);
    }

    #[test]
    fn test_limit_and_order() {
        let query = parser()
            .parse("find_top_3_by_active_true_order_by_age_desc_and_last_name", 0)
            .unwrap();
        assert_eq!(query.plan.limit, Some(3));
        assert_eq!(
            query.plan.order,
            vec![
                OrderKey {
                    property: "age".into(),
                    direction: Direction::Desc
                },
                OrderKey {
                    property: "last_name".into(),
                    direction: Direction::Asc
                },
            ]
        );
        let first = parser().parse("find_first_by_email", 1).unwrap();
        assert_eq!(first.plan.limit, Some(1));
    }

    #[test]
    fn test_order_without_criteria() {
        let query = parser().parse("find_all_order_by_created_at_desc", 0).unwrap();
        assert!(query.plan.groups.is_empty());
        assert_eq!(query.plan.order[0].property, "created_at");
        assert!(parser().parse("count_all", 0).unwrap().plan.groups.is_empty());
    }

    #[test]
    fn test_prefixes() {
        assert_eq!(parser().parse("read_by_id", 1).unwrap().subject, Subject::Find);
        assert_eq!(parser().parse("exists_by_email", 1).unwrap().subject, Subject::Exists);
        assert_eq!(parser().parse("remove_by_age_less_than", 1).unwrap().subject, Subject::Delete);
        assert!(parser().parse("fetch_by_email", 1).is_err());
        assert!(parser().parse("find", 0).is_err());
        assert!(parser().parse("count_top_3_by_age", 1).is_err());
    }

    #[test]
    fn test_unknown_property_is_reported() {
        let error = parser().parse("find_by_nickname", 1).unwrap_err();
        assert!(error.contains("nickname"), "{error}");
    }

    #[test]
    fn test_unknown_qualifier_is_reported() {
        let error = parser().parse("find_by_age_around", 1).unwrap_err();
        assert!(error.contains("unrecognized qualifier `around`"), "{error}");
    }

    #[test]
    fn test_parameter_count_must_match() {
        let error = parser().parse("find_by_email", 2).unwrap_err();
        assert!(error.contains("takes 1 parameter"), "{error}");
        assert!(parser().parse("find_by_active_true", 1).is_err());
    }

    #[test]
    fn test_bad_order_clause_is_reported() {
        let error = parser().parse("find_by_email_order_by_height", 1).unwrap_err();
        assert!(error.contains("height"), "{error}");
    }

    #[test]
    fn test_furthest_failure_across_splits_is_reported() {
        // The `order by` split fails at `order`; reading the whole tail as
        // criteria gets as far as `age_around`.
        let parser = ConventionParser::new(["email", "order_by_channel", "age"]);
        let error = parser
            .parse("find_by_email_and_order_by_channel_age_around", 2)
            .unwrap_err();
        assert!(error.contains("after property `order_by_channel`"), "{error}");
    }
}

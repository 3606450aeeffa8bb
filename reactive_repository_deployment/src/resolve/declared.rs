//! Parsing of declared query text.
//!
//! ```text
//! query     := (condition ((and | or) condition)*)? ("order" "by" key ("," key)*)? ("limit" NUMBER)?
//! condition := property op (":" param)?
//! op        := = | != | <> | > | >= | < | <= | like | not like | in | not in
//!            | is null | is not null
//! key       := property (asc | desc)?
//! ```
//!
//! Keywords are case-insensitive. Properties may be written in camelCase.
//! Parameters bind by method parameter name; each must be declared and used.

use std::collections::BTreeSet;

use super::operation::{Comparator, Direction, OrderKey, Predicate, QueryPlan};
use crate::naming::property_name;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    Param(String),
    Number(usize),
    Op(&'static str),
    Comma,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Word(word) => write!(f, "{word}"),
            Token::Param(name) => write!(f, ":{name}"),
            Token::Number(number) => write!(f, "{number}"),
            Token::Op(op) => write!(f, "{op}"),
            Token::Comma => write!(f, ","),
        }
    }
}

fn tokenize(text: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let take_word = |chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>| {
            let mut end = text.len();
            while let Some(&(at, c)) = chars.peek() {
                if !(c.is_alphanumeric() || c == '_') {
                    end = at;
                    break;
                }
                chars.next();
            }
            end
        };
        match c {
            ':' => {
                chars.next();
                let end = take_word(&mut chars);
                let name = &text[start + 1..end];
                if name.is_empty() {
                    return Err("`:` must be followed by a parameter name".to_string());
                }
                tokens.push(Token::Param(name.to_string()));
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '=' | '!' | '<' | '>' => {
                chars.next();
                let next = chars.peek().map(|&(_, c)| c);
                let op = match (c, next) {
                    ('!', Some('=')) => "!=",
                    ('<', Some('>')) => "<>",
                    ('<', Some('=')) => "<=",
                    ('>', Some('=')) => ">=",
                    ('=', _) => "=",
                    ('<', _) => "<",
                    ('>', _) => ">",
                    _ => return Err(format!("unexpected `{c}`")),
                };
                if op.len() == 2 {
                    chars.next();
                }
                tokens.push(Token::Op(op));
            }
            c if c.is_ascii_digit() => {
                let end = take_word(&mut chars);
                let number = text[start..end]
                    .parse()
                    .map_err(|_| format!("invalid number `{}`", &text[start..end]))?;
                tokens.push(Token::Number(number));
            }
            c if c.is_alphabetic() || c == '_' => {
                let end = take_word(&mut chars);
                tokens.push(Token::Word(text[start..end].to_string()));
            }
            other => return Err(format!("unexpected `{other}`")),
        }
    }
    Ok(tokens)
}

struct DeclaredParser<'q> {
    tokens: Vec<Token>,
    at: usize,
    properties: &'q [String],
    params: &'q [String],
    used: BTreeSet<usize>,
}

impl DeclaredParser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.at)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.at).cloned();
        self.at += 1;
        token
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(word)) if word.eq_ignore_ascii_case(keyword))
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let found = self.peek_keyword(keyword);
        if found {
            self.at += 1;
        }
        found
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), String> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(format!("expected `{keyword}`{}", self.found()))
        }
    }

    fn found(&self) -> String {
        match self.peek() {
            Some(token) => format!(", found `{token}`"),
            None => " at end of query".to_string(),
        }
    }

    fn property(&mut self) -> Result<String, String> {
        match self.next() {
            Some(Token::Word(word)) => {
                let name = property_name(&word);
                if self.properties.contains(&name) {
                    Ok(name)
                } else {
                    Err(format!("unknown property `{word}`"))
                }
            }
            Some(other) => Err(format!("expected a property, found `{other}`")),
            None => Err("expected a property at end of query".to_string()),
        }
    }

    fn param(&mut self, op: &str) -> Result<usize, String> {
        match self.next() {
            Some(Token::Param(name)) => {
                let index = self
                    .params
                    .iter()
                    .position(|param| *param == name)
                    .ok_or_else(|| format!("unknown parameter `:{name}`"))?;
                self.used.insert(index);
                Ok(index)
            }
            Some(other) => Err(format!("expected a `:parameter` after `{op}`, found `{other}`")),
            None => Err(format!("expected a `:parameter` after `{op}`")),
        }
    }

    fn comparator(&mut self) -> Result<Comparator, String> {
        let comparator = match self.next() {
            Some(Token::Op(op)) => match op {
                "=" => Comparator::Equals,
                "!=" | "<>" => Comparator::NotEquals,
                ">" => Comparator::GreaterThan,
                ">=" => Comparator::GreaterThanEqual,
                "<" => Comparator::LessThan,
                _ => Comparator::LessThanEqual,
            },
            Some(Token::Word(word)) => match word.to_ascii_lowercase().as_str() {
                "like" => Comparator::Like,
                "in" => Comparator::In,
                "not" if self.eat_keyword("like") => Comparator::NotLike,
                "not" if self.eat_keyword("in") => Comparator::NotIn,
                "is" => {
                    let negated = self.eat_keyword("not");
                    self.expect_keyword("null")?;
                    if negated {
                        Comparator::IsNotNull
                    } else {
                        Comparator::IsNull
                    }
                }
                _ => return Err(format!("unsupported operator `{word}`")),
            },
            Some(other) => return Err(format!("expected an operator, found `{other}`")),
            None => return Err("expected an operator at end of query".to_string()),
        };
        Ok(comparator)
    }

    fn condition(&mut self) -> Result<Predicate, String> {
        let property = self.property()?;
        let comparator = self.comparator()?;
        let params = if comparator.arity() == 0 {
            Vec::new()
        } else {
            vec![self.param(comparator.as_ref())?]
        };
        Ok(Predicate {
            property,
            comparator,
            ignore_case: false,
            params,
        })
    }

    fn query(&mut self) -> Result<QueryPlan, String> {
        let mut plan = QueryPlan::default();

        if self.peek().is_some() && !self.peek_keyword("order") && !self.peek_keyword("limit") {
            plan.groups.push(vec![self.condition()?]);
            loop {
                if self.eat_keyword("and") {
                    let predicate = self.condition()?;
                    if let Some(group) = plan.groups.last_mut() {
                        group.push(predicate);
                    }
                } else if self.eat_keyword("or") {
                    plan.groups.push(vec![self.condition()?]);
                } else {
                    break;
                }
            }
        }

        if self.eat_keyword("order") {
            self.expect_keyword("by")?;
            loop {
                let property = self.property()?;
                let direction = if self.eat_keyword("desc") {
                    Direction::Desc
                } else {
                    self.eat_keyword("asc");
                    Direction::Asc
                };
                plan.order.push(OrderKey {
                    property,
                    direction,
                });
                if self.peek() == Some(&Token::Comma) {
                    self.at += 1;
                } else {
                    break;
                }
            }
        }

        if self.eat_keyword("limit") {
            match self.next() {
                Some(Token::Number(limit)) if limit > 0 => plan.limit = Some(limit),
                _ => return Err("`limit` must be followed by a positive number".to_string()),
            }
        }

        if let Some(token) = self.peek() {
            return Err(format!("unexpected `{token}`"));
        }
        if let Some(unused) = (0..self.params.len()).find(|index| !self.used.contains(index)) {
            return Err(format!("parameter `{}` is not used by the query", self.params[unused]));
        }
        Ok(plan)
    }
}

/// Parse `text` against the entity's `properties`, binding `params` by name.
pub fn parse_declared(
    text: &str,
    properties: &[String],
    params: &[String],
) -> Result<QueryPlan, String> {
    let mut parser = DeclaredParser {
        tokens: tokenize(text)?,
        at: 0,
        properties,
        params,
        used: BTreeSet::new(),
    };
    parser.query()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties() -> Vec<String> {
        ["id", "first_name", "last_name", "age", "email"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn params(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_conditions_order_and_limit() {
        let plan = parse_declared(
            "lastName = :last_name and age >= :min_age or email like :pattern \
             order by first_name desc, age limit 5",
            &properties(),
            &params(&["last_name", "min_age", "pattern"]),
        )
        .unwrap();
        assert_eq!(plan.groups.len(), 2);
        assert_eq!(plan.groups[0][0].property, "last_name");
        assert_eq!(plan.groups[0][1].comparator, Comparator::GreaterThanEqual);
        assert_eq!(plan.groups[0][1].params, vec![1]);
        assert_eq!(plan.groups[1][0].comparator, Comparator::Like);
        assert_eq!(plan.order.len(), 2);
        assert_eq!(plan.order[0].direction, Direction::Desc);
        assert_eq!(plan.order[1].direction, Direction::Asc);
        assert_eq!(plan.limit, Some(5));
    }

    #[test]
    fn test_null_checks_and_lists() {
        let plan = parse_declared(
            "EMAIL IS NOT NULL AND age NOT IN :ages AND id <> :id",
            &properties(),
            &params(&["ages", "id"]),
        )
        .unwrap();
        let group = &plan.groups[0];
        assert_eq!(group[0].comparator, Comparator::IsNotNull);
        assert!(group[0].params.is_empty());
        assert_eq!(group[1].comparator, Comparator::NotIn);
        assert_eq!(group[2].comparator, Comparator::NotEquals);
    }

    #[test]
    fn test_order_only() {
        let plan = parse_declared("order by age", &properties(), &[]).unwrap();
        assert!(plan.groups.is_empty());
        assert_eq!(plan.order[0].property, "age");
    }

    #[test]
    fn test_rejections() {
        let props = properties();
        let error = parse_declared("nickname = :n", &props, &params(&["n"])).unwrap_err();
        assert!(error.contains("unknown property `nickname`"));

        let error = parse_declared("age = :years", &props, &params(&["age"])).unwrap_err();
        assert!(error.contains("unknown parameter `:years`"));

        let error = parse_declared("age = :age", &props, &params(&["age", "extra"])).unwrap_err();
        assert!(error.contains("`extra` is not used"));

        assert!(parse_declared("age = 5", &props, &[]).is_err());
        assert!(parse_declared("age ~ :age", &props, &params(&["age"])).is_err());
        assert!(parse_declared("age = :age limit 0", &props, &params(&["age"])).is_err());
        assert!(parse_declared("age = :age order age", &props, &params(&["age"])).is_err());
    }
}

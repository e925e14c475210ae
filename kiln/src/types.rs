use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structural shape of a type as classified by the extraction step.
///
/// The well-known wrapper shapes (`Lazy`, `Set`, `Map`, `Iterable`, tuples and
/// callables) are distinct variants, so the resolver never has to sniff names
/// to recognize them. In serialized models a type is written in a small
/// grammar:
///
/// ```text
/// Foo              Foo<Bar, Baz>      Lazy<Foo>       Iterable<Foo>
/// Set<Foo>         Map<string, Foo>   (string, Foo)   fn(Foo, Bar) -> Baz
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeExpr {
    Named { name: String, args: Vec<TypeExpr> },
    Lazy(Box<TypeExpr>),
    Set(Box<TypeExpr>),
    Map(Box<TypeExpr>, Box<TypeExpr>),
    Iterable(Box<TypeExpr>),
    Tuple(Vec<TypeExpr>),
    Function {
        params: Vec<TypeExpr>,
        ret: Box<TypeExpr>,
    },
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn set_of(element: TypeExpr) -> Self {
        Self::Set(Box::new(element))
    }

    pub fn map_of(key: TypeExpr, value: TypeExpr) -> Self {
        Self::Map(Box::new(key), Box::new(value))
    }

    /// Returns the name of a plain nominal type without type arguments.
    pub fn as_plain_name(&self) -> Option<&str> {
        match self {
            Self::Named { name, args } if args.is_empty() => Some(name),
            _ => None,
        }
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self, Self::Lazy(_))
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named { name, args } if args.is_empty() => write!(f, "{name}"),
            Self::Named { name, args } => write!(f, "{name}<{}>", join(args)),
            Self::Lazy(inner) => write!(f, "Lazy<{inner}>"),
            Self::Set(inner) => write!(f, "Set<{inner}>"),
            Self::Map(key, value) => write!(f, "Map<{key}, {value}>"),
            Self::Iterable(inner) => write!(f, "Iterable<{inner}>"),
            Self::Tuple(items) => write!(f, "({})", join(items)),
            Self::Function { params, ret } => write!(f, "fn({}) -> {ret}", join(params)),
        }
    }
}

fn join(items: &[TypeExpr]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed type `{input}`: {reason}")]
pub struct TypeParseError {
    pub input: String,
    pub reason: String,
}

impl FromStr for TypeExpr {
    type Err = TypeParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser { input, pos: 0 };
        let parsed = parser.parse_type().and_then(|ty| {
            parser.skip_whitespace();
            match parser.rest().chars().next() {
                None => Ok(ty),
                Some(c) => Err(format!("unexpected `{c}` at offset {}", parser.pos)),
            }
        });
        parsed.map_err(|reason| TypeParseError {
            input: input.to_string(),
            reason,
        })
    }
}

impl TryFrom<String> for TypeExpr {
    type Error = TypeParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeExpr> for String {
    fn from(value: TypeExpr) -> Self {
        value.to_string()
    }
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_whitespace();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Option<&'a str> {
        self.skip_whitespace();
        let rest = self.rest();
        let len = rest
            .char_indices()
            .find(|(_, c)| !(c.is_alphanumeric() || matches!(c, '_' | '$' | '.' | ':')))
            .map_or(rest.len(), |(i, _)| i);
        if len == 0 {
            return None;
        }
        self.pos += len;
        Some(&rest[..len])
    }

    fn parse_type(&mut self) -> Result<TypeExpr, String> {
        if self.eat("(") {
            let mut items = self.parse_list(")")?;
            return Ok(match items.len() {
                1 => items.remove(0),
                _ => TypeExpr::Tuple(items),
            });
        }
        let start = self.pos;
        let Some(name) = self.ident() else {
            return Err(format!("expected a type at offset {start}"));
        };
        if name == "fn" && self.eat("(") {
            let params = self.parse_list(")")?;
            if !self.eat("->") {
                return Err(format!("expected `->` at offset {}", self.pos));
            }
            let ret = self.parse_type()?;
            return Ok(TypeExpr::Function {
                params,
                ret: Box::new(ret),
            });
        }
        let mut args = if self.eat("<") {
            self.parse_list(">")?
        } else {
            Vec::new()
        };
        let arity = match name {
            "Lazy" | "Set" | "Iterable" => 1,
            "Map" => 2,
            _ => {
                return Ok(TypeExpr::Named {
                    name: name.to_string(),
                    args,
                });
            }
        };
        if args.len() != arity {
            return Err(format!(
                "{name} expects {arity} type argument(s), found {}",
                args.len()
            ));
        }
        let first = Box::new(args.remove(0));
        Ok(match name {
            "Lazy" => TypeExpr::Lazy(first),
            "Set" => TypeExpr::Set(first),
            "Iterable" => TypeExpr::Iterable(first),
            _ => TypeExpr::Map(first, Box::new(args.remove(0))),
        })
    }

    fn parse_list(&mut self, close: &str) -> Result<Vec<TypeExpr>, String> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.parse_type()?);
            if self.eat(",") {
                continue;
            }
            if self.eat(close) {
                return Ok(items);
            }
            return Err(format!("expected `,` or `{close}` at offset {}", self.pos));
        }
    }
}

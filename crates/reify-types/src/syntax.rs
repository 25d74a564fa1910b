//! Parser for Java-like type expressions (`List<Map<String, T>>[]`, `? extends T`, ...).
//!
//! Registration code and the TOML manifest describe field types as text; this module turns that
//! text into [`DeclaredType`] using the class's own type parameters and a [`ClassEnv`] for class
//! names.

use std::fmt;

use thiserror::Error;

use crate::{ClassEnv, ClassId, DeclaredType, PrimitiveType, WildcardBound};

/// Names visible while parsing a field type: the declaring class and its type parameters.
#[derive(Clone, Copy, Debug, Default)]
pub struct TypeScope<'a> {
    pub type_params: &'a [String],
    pub self_class: Option<(&'a str, ClassId)>,
}

impl<'a> TypeScope<'a> {
    /// No type variables; every name must be a registered class.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn for_class(name: &'a str, id: ClassId, type_params: &'a [String]) -> Self {
        Self {
            type_params,
            self_class: Some((name, id)),
        }
    }

    fn self_id(&self, name: &str) -> Option<ClassId> {
        let (self_name, id) = self.self_class?;
        let simple = self_name.rsplit('.').next().unwrap_or(self_name);
        (name == self_name || name == simple).then_some(id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseErrorKind {
    UnexpectedEnd,
    UnexpectedChar(char),
    UnknownType(String),
    PrimitiveTypeArgument(PrimitiveType),
    TypeArgumentsOnTypeVariable(String),
    TypeArgumentsOnPrimitive(PrimitiveType),
    EmptyTypeArguments,
    TrailingInput,
    TooDeep,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorKind::UnexpectedEnd => write!(f, "unexpected end of type expression"),
            ParseErrorKind::UnexpectedChar(ch) => write!(f, "unexpected character `{ch}`"),
            ParseErrorKind::UnknownType(name) => write!(f, "unknown type `{name}`"),
            ParseErrorKind::PrimitiveTypeArgument(prim) => {
                write!(f, "primitive `{}` cannot be a type argument", prim.keyword())
            }
            ParseErrorKind::TypeArgumentsOnTypeVariable(name) => {
                write!(f, "type variable `{name}` cannot take type arguments")
            }
            ParseErrorKind::TypeArgumentsOnPrimitive(prim) => {
                write!(f, "primitive `{}` cannot take type arguments", prim.keyword())
            }
            ParseErrorKind::EmptyTypeArguments => write!(f, "empty type argument list"),
            ParseErrorKind::TrailingInput => write!(f, "trailing input"),
            ParseErrorKind::TooDeep => write!(
                f,
                "type is nested more than {MAX_TYPE_DEPTH} levels deep"
            ),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind} at offset {offset}")]
pub struct ParseError {
    pub offset: usize,
    pub kind: ParseErrorKind,
}

/// Deepest type the parser builds, counting type-argument levels and array dimensions.
pub const MAX_TYPE_DEPTH: usize = 255;

pub fn parse_declared_type(
    env: &dyn ClassEnv,
    scope: &TypeScope<'_>,
    text: &str,
) -> Result<DeclaredType, ParseError> {
    let mut parser = Parser {
        env,
        scope,
        text,
        pos: 0,
        nesting: 0,
    };
    let (ty, _) = parser.parse_type()?;
    parser.skip_ws();
    if parser.pos != text.len() {
        return Err(parser.error(ParseErrorKind::TrailingInput));
    }
    Ok(ty)
}

struct Parser<'a> {
    env: &'a dyn ClassEnv,
    scope: &'a TypeScope<'a>,
    text: &'a str,
    pos: usize,
    /// Open `<` at the current position.
    nesting: usize,
}

impl Parser<'_> {
    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            offset: self.pos,
            kind,
        }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn skip_ws(&mut self) {
        while let Some(ch) = self.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.pos += ch.len_utf8();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        if self.eat(expected) {
            return Ok(());
        }
        Err(self.unexpected())
    }

    fn unexpected(&self) -> ParseError {
        match self.peek() {
            Some(ch) => self.error(ParseErrorKind::UnexpectedChar(ch)),
            None => self.error(ParseErrorKind::UnexpectedEnd),
        }
    }

    /// A (possibly dotted) Java identifier.
    fn ident(&mut self) -> Result<&str, ParseError> {
        self.skip_ws();
        let start = self.pos;
        let mut expect_start = true;
        while let Some(ch) = self.peek() {
            let ok = if expect_start {
                ch.is_alphabetic() || ch == '_' || ch == '$'
            } else {
                ch.is_alphanumeric() || ch == '_' || ch == '$' || ch == '.'
            };
            if !ok {
                break;
            }
            expect_start = ch == '.';
            self.pos += ch.len_utf8();
        }
        if self.pos == start || expect_start {
            return Err(self.unexpected());
        }
        Ok(&self.text[start..self.pos])
    }

    /// Parses one type and returns it with its depth.
    fn parse_type(&mut self) -> Result<(DeclaredType, usize), ParseError> {
        let (mut ty, mut depth) = self.parse_element()?;
        while self.eat('[') {
            self.expect(']')?;
            depth += 1;
            self.check_depth(depth)?;
            ty = DeclaredType::array(ty);
        }
        Ok((ty, depth))
    }

    fn check_depth(&self, depth: usize) -> Result<(), ParseError> {
        if depth > MAX_TYPE_DEPTH {
            return Err(self.error(ParseErrorKind::TooDeep));
        }
        Ok(())
    }

    fn parse_element(&mut self) -> Result<(DeclaredType, usize), ParseError> {
        self.skip_ws();
        let start = self.pos;
        let name = self.ident()?.to_string();
        let args = self.parse_type_args()?;
        let at_name = |kind| ParseError {
            offset: start,
            kind,
        };

        if let Some(prim) = PrimitiveType::from_keyword(&name) {
            return match args {
                Some(_) => Err(at_name(ParseErrorKind::TypeArgumentsOnPrimitive(prim))),
                None => Ok((DeclaredType::Primitive(prim), 1)),
            };
        }

        if self.scope.type_params.iter().any(|param| *param == name) {
            return match args {
                Some(_) => Err(at_name(ParseErrorKind::TypeArgumentsOnTypeVariable(name))),
                None => Ok((DeclaredType::TypeVar(name), 1)),
            };
        }

        let id = self
            .scope
            .self_id(&name)
            .or_else(|| self.env.lookup_class(&name))
            .ok_or_else(|| at_name(ParseErrorKind::UnknownType(name)))?;

        Ok(match args {
            Some((args, depth)) => (DeclaredType::parameterized(id, args), depth + 1),
            None => (DeclaredType::Class(id), 1),
        })
    }

    /// Type arguments plus the depth of the deepest one.
    fn parse_type_args(&mut self) -> Result<Option<(Vec<DeclaredType>, usize)>, ParseError> {
        if !self.eat('<') {
            return Ok(None);
        }
        if self.nesting >= MAX_TYPE_DEPTH {
            return Err(self.error(ParseErrorKind::TooDeep));
        }
        if self.eat('>') {
            return Err(self.error(ParseErrorKind::EmptyTypeArguments));
        }

        self.nesting += 1;
        let mut args = Vec::new();
        let mut deepest = 0;
        loop {
            let (arg, depth) = self.parse_type_arg()?;
            args.push(arg);
            deepest = deepest.max(depth);
            if self.eat(',') {
                continue;
            }
            self.expect('>')?;
            self.nesting -= 1;
            self.check_depth(deepest + 1)?;
            return Ok(Some((args, deepest)));
        }
    }

    fn parse_type_arg(&mut self) -> Result<(DeclaredType, usize), ParseError> {
        if self.eat('?') {
            self.skip_ws();
            let rest = &self.text[self.pos..];
            let (bound, depth) = if keyword_at(rest, "extends") {
                self.pos += "extends".len();
                let (ty, depth) = self.parse_reference_type()?;
                (WildcardBound::Extends(Box::new(ty)), depth + 1)
            } else if keyword_at(rest, "super") {
                self.pos += "super".len();
                let (ty, depth) = self.parse_reference_type()?;
                (WildcardBound::Super(Box::new(ty)), depth + 1)
            } else {
                (WildcardBound::Unbounded, 1)
            };
            self.check_depth(depth)?;
            return Ok((DeclaredType::Wildcard(bound), depth));
        }
        self.parse_reference_type()
    }

    /// Type arguments may be arrays of primitives but never bare primitives.
    fn parse_reference_type(&mut self) -> Result<(DeclaredType, usize), ParseError> {
        self.skip_ws();
        let start = self.pos;
        let (ty, depth) = self.parse_type()?;
        if let DeclaredType::Primitive(prim) = ty {
            return Err(ParseError {
                offset: start,
                kind: ParseErrorKind::PrimitiveTypeArgument(prim),
            });
        }
        Ok((ty, depth))
    }
}

fn keyword_at(rest: &str, keyword: &str) -> bool {
    rest.strip_prefix(keyword).is_some_and(|after| {
        after
            .chars()
            .next()
            .map_or(true, |ch| !(ch.is_alphanumeric() || ch == '_' || ch == '$'))
    })
}

//! Lexing and parsing of rename templates into [`Segment`]s.
//!
//! Grammar:
//!
//! ```text
//! template  := ( text | "{{" | "}}" | "{" pipeline "}" )*
//! pipeline  := operand ( "|" stage )*
//! stage     := name [ "(" args ")" ]
//! operand   := field | string | integer | name "(" args ")"
//! args      := [ pipeline ( "," pipeline )* ]
//! field     := [ "." ] Uppercase identifier
//! ```

use crate::error::TemplateError;

/// A compiled piece of a template.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment {
    Literal(String),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Field(Field),
    Str(String),
    Int(i64),
    Call { function: Function, args: Vec<Expr> },
}

/// Rename context fields addressable from a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    Name,
    Source,
    Index,
    Path,
    Method,
    OperationId,
    Tags,
    UsageType,
    StatusCode,
    ParamName,
    MediaType,
    PrimaryResource,
    AllPaths,
    AllMethods,
    AllOperationIds,
    AllTags,
    RefCount,
    IsShared,
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        let field = match name {
            "Name" => Self::Name,
            "Source" => Self::Source,
            "Index" => Self::Index,
            "Path" => Self::Path,
            "Method" => Self::Method,
            "OperationID" => Self::OperationId,
            "Tags" => Self::Tags,
            "UsageType" => Self::UsageType,
            "StatusCode" => Self::StatusCode,
            "ParamName" => Self::ParamName,
            "MediaType" => Self::MediaType,
            "PrimaryResource" => Self::PrimaryResource,
            "AllPaths" => Self::AllPaths,
            "AllMethods" => Self::AllMethods,
            "AllOperationIDs" => Self::AllOperationIds,
            "AllTags" => Self::AllTags,
            "RefCount" => Self::RefCount,
            "IsShared" => Self::IsShared,
            _ => return None,
        };
        Some(field)
    }
}

/// The closed set of template functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Function {
    PathSegment,
    PathResource,
    PathLast,
    PathClean,
    FirstTag,
    JoinTags,
    HasTag,
    PascalCase,
    CamelCase,
    SnakeCase,
    KebabCase,
    Default,
    Coalesce,
    Upper,
    Lower,
    TrimPrefix,
    TrimSuffix,
    Replace,
    Cond,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        let function = match name {
            "pathSegment" => Self::PathSegment,
            "pathResource" => Self::PathResource,
            "pathLast" => Self::PathLast,
            "pathClean" => Self::PathClean,
            "firstTag" => Self::FirstTag,
            "joinTags" => Self::JoinTags,
            "hasTag" => Self::HasTag,
            "pascalCase" => Self::PascalCase,
            "camelCase" => Self::CamelCase,
            "snakeCase" => Self::SnakeCase,
            "kebabCase" => Self::KebabCase,
            "default" => Self::Default,
            "coalesce" => Self::Coalesce,
            "upper" => Self::Upper,
            "lower" => Self::Lower,
            "trimPrefix" => Self::TrimPrefix,
            "trimSuffix" => Self::TrimSuffix,
            "replace" => Self::Replace,
            "cond" => Self::Cond,
            _ => return None,
        };
        Some(function)
    }

    /// Minimum and (if bounded) maximum argument count.
    fn arity(self) -> (usize, Option<usize>) {
        match self {
            Self::PathResource
            | Self::PathLast
            | Self::PathClean
            | Self::FirstTag
            | Self::PascalCase
            | Self::CamelCase
            | Self::SnakeCase
            | Self::KebabCase
            | Self::Upper
            | Self::Lower => (1, Some(1)),
            Self::PathSegment
            | Self::JoinTags
            | Self::HasTag
            | Self::Default
            | Self::TrimPrefix
            | Self::TrimSuffix => (2, Some(2)),
            Self::Replace | Self::Cond => (3, Some(3)),
            Self::Coalesce => (1, None),
        }
    }
}

/// Compiles template text into segments.
pub(crate) fn parse(template: &str) -> Result<Vec<Segment>, TemplateError> {
    Parser {
        template,
        pos: 0,
    }
    .parse_template()
}

struct Parser<'t> {
    template: &'t str,
    pos: usize,
}

impl<'t> Parser<'t> {
    fn parse_template(&mut self) -> Result<Vec<Segment>, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();

        while let Some(c) = self.peek() {
            match c {
                '{' if self.rest().starts_with("{{") => {
                    literal.push('{');
                    self.pos += 2;
                }
                '}' if self.rest().starts_with("}}") => {
                    literal.push('}');
                    self.pos += 2;
                }
                '{' => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    self.pos += 1;
                    self.skip_whitespace();
                    let expr = self.parse_pipeline()?;
                    self.skip_whitespace();
                    self.expect('}')?;
                    segments.push(Segment::Expr(expr));
                }
                '}' => return Err(self.syntax("unmatched '}' (use '}}' for a literal brace)")),
                _ => {
                    literal.push(c);
                    self.pos += c.len_utf8();
                }
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(segments)
    }

    fn parse_pipeline(&mut self) -> Result<Expr, TemplateError> {
        let mut expr = self.parse_operand()?;
        loop {
            self.skip_whitespace();
            if self.peek() != Some('|') {
                return Ok(expr);
            }
            self.pos += 1;
            self.skip_whitespace();

            let name = self.identifier();
            if name.is_empty() {
                return Err(self.syntax("expected a function name after '|'"));
            }
            let function = self.function(name)?;
            self.skip_whitespace();
            let mut args = vec![expr];
            if self.peek() == Some('(') {
                args.extend(self.parse_arguments()?);
            }
            expr = self.call(function, name, args)?;
        }
    }

    fn parse_operand(&mut self) -> Result<Expr, TemplateError> {
        match self.peek() {
            Some('"') => self.parse_string(),
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_integer(),
            Some('.') => {
                self.pos += 1;
                let name = self.identifier();
                if name.is_empty() {
                    return Err(self.syntax("expected a field name after '.'"));
                }
                self.field(name)
            }
            Some(c) if c.is_ascii_alphabetic() => {
                let name = self.identifier();
                if c.is_ascii_uppercase() {
                    return self.field(name);
                }
                let function = self.function(name)?;
                self.skip_whitespace();
                if self.peek() != Some('(') {
                    return Err(self.syntax(&format!("expected '(' after function '{name}'")));
                }
                let args = self.parse_arguments()?;
                self.call(function, name, args)
            }
            Some(c) => Err(self.syntax(&format!("unexpected character '{c}'"))),
            None => Err(self.syntax("unterminated expression")),
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expr>, TemplateError> {
        self.expect('(')?;
        let mut args = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(')') {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            self.skip_whitespace();
            args.push(self.parse_pipeline()?);
            self.skip_whitespace();
            match self.peek() {
                Some(',') => self.pos += 1,
                Some(')') => {
                    self.pos += 1;
                    return Ok(args);
                }
                _ => return Err(self.syntax("expected ',' or ')' in argument list")),
            }
        }
    }

    fn parse_string(&mut self) -> Result<Expr, TemplateError> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        while let Some(c) = self.peek() {
            self.pos += c.len_utf8();
            match c {
                '"' => return Ok(Expr::Str(value)),
                '\\' => match self.peek() {
                    Some(escaped @ ('"' | '\\')) => {
                        value.push(escaped);
                        self.pos += 1;
                    }
                    _ => value.push('\\'),
                },
                _ => value.push(c),
            }
        }
        self.pos = start;
        Err(self.syntax("unterminated string literal"))
    }

    fn parse_integer(&mut self) -> Result<Expr, TemplateError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let text = &self.template[start..self.pos];
        match text.parse::<i64>() {
            Ok(value) => Ok(Expr::Int(value)),
            Err(_) => {
                let message = format!("invalid integer literal '{text}'");
                self.pos = start;
                Err(self.syntax(&message))
            }
        }
    }

    fn field(&self, name: &str) -> Result<Expr, TemplateError> {
        Field::from_name(name)
            .map(Expr::Field)
            .ok_or_else(|| TemplateError::UnknownField {
                template: self.template.to_string(),
                name: name.to_string(),
            })
    }

    fn function(&self, name: &str) -> Result<Function, TemplateError> {
        Function::from_name(name).ok_or_else(|| TemplateError::UnknownFunction {
            template: self.template.to_string(),
            name: name.to_string(),
        })
    }

    fn call(&self, function: Function, name: &str, args: Vec<Expr>) -> Result<Expr, TemplateError> {
        let (min, max) = function.arity();
        if args.len() < min || max.is_some_and(|max| args.len() > max) {
            let expected = match max {
                Some(max) if max == min => min.to_string(),
                Some(max) => format!("{min} to {max}"),
                None => format!("at least {min}"),
            };
            return Err(TemplateError::Arity {
                template: self.template.to_string(),
                name: name.to_string(),
                expected,
                got: args.len(),
            });
        }
        Ok(Expr::Call { function, args })
    }

    fn identifier(&mut self) -> &'t str {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        &self.template[start..self.pos]
    }

    fn expect(&mut self, expected: char) -> Result<(), TemplateError> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.syntax(&format!("expected '{expected}'")))
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += self.peek().map_or(0, char::len_utf8);
        }
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn rest(&self) -> &'t str {
        &self.template[self.pos..]
    }

    fn syntax(&self, message: &str) -> TemplateError {
        TemplateError::Syntax {
            template: self.template.to_string(),
            offset: self.pos,
            message: message.to_string(),
        }
    }
}

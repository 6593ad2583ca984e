mod lex;
mod parse;
mod syntax;
mod template;

pub use parse::{tree, Parser, Scope};
pub use syntax::{Builder, Marker};
pub use template::Template;

use crate::{log::Error, Engine};
use std::fmt::Display;

/// Compile a [`Template`] from the given text.
///
/// Provides a shortcut to quickly compile a `Template` with default syntax
/// and options, without creating an [`Engine`] yourself.
///
/// # Examples
///
/// ```
/// use quill::compile;
///
/// let template = compile("{{ name }}");
/// assert!(template.is_ok())
/// ```
pub fn compile(text: &str) -> Result<Template, Error> {
    Engine::default().compile(text)
}

/// Keywords recognized by the Lexer and Parser.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Keyword {
    /// Enables negation in an "if" condition.
    Not,
    /// Beginning of an "if" block.
    If,
    /// Marks an additional branch in an "if" block.
    Elif,
    /// Marks the final, unconditional branch in an "if" block.
    Else,
    /// End of an "if" block.
    EndIf,
    /// Beginning of a loop.
    For,
    /// Divides the identifier from the keys in a loop.
    ///
    /// In this example, identifier refers to "person" while keys
    /// refers to "people":
    ///
    /// "for person in people"
    In,
    /// End of a loop.
    EndFor,
    /// Beginning of a named, overridable block.
    Block,
    /// End of a named block.
    EndBlock,
    /// Declares the parent of this template.
    Extends,
    /// Splices the parent template's body for the enclosing block.
    Super,
}

impl Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Keyword::Not => write!(f, "not"),
            Keyword::If => write!(f, "if"),
            Keyword::Elif => write!(f, "elif"),
            Keyword::Else => write!(f, "else"),
            Keyword::EndIf => write!(f, "endif"),
            Keyword::For => write!(f, "for"),
            Keyword::In => write!(f, "in"),
            Keyword::EndFor => write!(f, "endfor"),
            Keyword::Block => write!(f, "block"),
            Keyword::EndBlock => write!(f, "endblock"),
            Keyword::Extends => write!(f, "extends"),
            Keyword::Super => write!(f, "super"),
        }
    }
}

/// Comparison operators recognized by the Lexer and Parser.
#[derive(Debug, PartialEq, Copy, Clone)]
pub enum Operator {
    /// >
    Greater,
    /// <
    Lesser,
    /// ==
    Equal,
    /// !=
    NotEqual,
    /// >=
    GreaterOrEqual,
    /// <=
    LesserOrEqual,
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operator::Greater => write!(f, ">"),
            Operator::Lesser => write!(f, "<"),
            Operator::Equal => write!(f, "=="),
            Operator::NotEqual => write!(f, "!="),
            Operator::GreaterOrEqual => write!(f, ">="),
            Operator::LesserOrEqual => write!(f, "<="),
        }
    }
}

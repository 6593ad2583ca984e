use crate::compile::{Keyword, Operator};
use std::fmt::Display;

/// Types emitted by the Lexer.
///
/// An abstraction over raw text to make construction of Tree types easier.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Token {
    /// Raw text.
    Raw,
    /// Verbatim host code captured between code markers.
    Code,
    /// String literal within a tag.
    String,
    /// Number within a tag.
    Number,
    /// Identifier (unquoted string) within a tag.
    Identifier,
    /// Whitespace within a tag, or skipped text such as a comment.
    Whitespace,
    /// Beginning of an expression - {{ by default.
    BeginExpression,
    /// End of an expression - }} by default.
    EndExpression,
    /// Beginning of a control block - {% by default.
    BeginControl,
    /// End of a control block - %} by default.
    EndControl,
    /// .
    Period,
    /// |>
    Pipe,
    /// (
    LeftParen,
    /// )
    RightParen,
    /// A boolean true.
    True,
    /// A boolean false.
    False,
    /// A recognized keyword that begins or ends a certain type of block.
    Keyword(Keyword),
    /// Describes a comparison of two values.
    Operator(Operator),
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Raw => write!(f, "raw"),
            Token::Code => write!(f, "code"),
            Token::String => write!(f, "string"),
            Token::Number => write!(f, "number"),
            Token::Identifier => write!(f, "identifier"),
            Token::Whitespace => write!(f, "whitespace"),
            Token::BeginExpression => write!(f, "begin expression"),
            Token::EndExpression => write!(f, "end expression"),
            Token::BeginControl => write!(f, "begin control"),
            Token::EndControl => write!(f, "end control"),
            Token::Period => write!(f, "period (.)"),
            Token::Pipe => write!(f, "pipe (|>)"),
            Token::LeftParen => write!(f, "left paren"),
            Token::RightParen => write!(f, "right paren"),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Keyword(keyword) => write!(f, "keyword {keyword}"),
            Token::Operator(operator) => write!(f, "operator {operator}"),
        }
    }
}

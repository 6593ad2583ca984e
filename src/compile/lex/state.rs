use super::token::Token;

/// Describes the internal state of a `Lexer`.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum CursorState {
    /// The cursor is outside of any marker, reading raw text.
    Default,
    /// The cursor is inside an expression or control marker.
    Inside {
        /// The token that closes the surrounding marker.
        end: Token,
    },
}

pub mod token;

mod state;

use crate::{
    config::Config,
    log::{expected_operator, Error, INVALID_SYNTAX, UNEXPECTED_TOKEN},
    region::Region,
};

use super::{
    lex::{state::CursorState, token::Token},
    syntax::Marker,
    Keyword, Operator,
};

use morel::Finder;

pub type LexResult = Result<Option<(Token, Region)>, Error>;
pub type LexResultMust = Result<(Token, Region), Error>;

/// Provides methods to read a source string as [`Token`] instances.
pub struct Lexer<'source> {
    /// Reference to the source text.
    pub source: &'source str,
    /// Position within source.
    pub cursor: usize,
    /// Compiled [`Finder`] instance used to search for markers
    /// in the source text.
    finder: &'source Finder,
    /// Options in effect, consulted for the whitespace-trim rules and the
    /// literal close delimiters of code and comment markers.
    config: &'source Config,
    /// Tracks the [`Lexer`] state and determines the action taken
    /// when `.next` is called.
    state: CursorState,
    /// When true, one newline at the beginning of the following raw text
    /// will be removed.
    trim_newline: bool,
    /// Temporary storage for a [`Token`] that will be read
    /// on the following call to `.next`.
    buffer: Option<(Token, Region)>,
}

impl<'source> Lexer<'source> {
    /// Create a new [`Lexer`] over the given source, searching for the
    /// markers that the [`Finder`] was compiled with.
    #[inline]
    pub fn new(source: &'source str, finder: &'source Finder, config: &'source Config) -> Self {
        Self {
            source,
            cursor: 0,
            finder,
            config,
            state: CursorState::Default,
            trim_newline: false,
            buffer: None,
        }
    }

    /// Return the next [`Token`] and [`Region`].
    ///
    /// Any instance of [`Token::Whitespace`] is ignored, and raw text that
    /// the whitespace-trim rules reduce to nothing is skipped.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when an unexpected [`Token`] is found.
    pub fn next(&mut self) -> LexResult {
        loop {
            // Always prefer taking from the buffer when possible.
            if let Some(next) = self.buffer.take() {
                return Ok(Some(next));
            }
            if self.source[self.cursor..].is_empty() {
                return Ok(None);
            }

            let c = self.cursor;
            let result = match self.state {
                CursorState::Default => self.lex_default(c),
                CursorState::Inside { .. } => self.lex_tag(c),
            }?;

            return match result {
                Some((token, region)) => match token {
                    Token::Whitespace => continue,
                    _ => Ok(Some((token, region))),
                },
                None => Ok(None),
            };
        }
    }

    /// Return the next [`Token`] and [`Region`] in [`CursorState::Default`]
    /// configuration.
    ///
    /// Assumes the cursor is outside of any marker.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when a closing marker with no matching opening
    /// marker is found, or a code or comment marker is unterminated.
    fn lex_default(&mut self, from: usize) -> LexResult {
        match self.finder.next(self.source, from) {
            Some((id, marker_begin, marker_end)) => {
                let mut lstrip = false;
                let next = match Marker::from(id) {
                    Marker::BeginExpression => {
                        self.state = CursorState::Inside {
                            end: Token::EndExpression,
                        };
                        self.cursor = marker_end;

                        Some((Token::BeginExpression, (marker_begin..marker_end).into()))
                    }
                    Marker::BeginControl => {
                        self.state = CursorState::Inside {
                            end: Token::EndControl,
                        };
                        self.cursor = marker_end;
                        lstrip = self.config.lstrip_blocks;

                        Some((Token::BeginControl, (marker_begin..marker_end).into()))
                    }
                    Marker::BeginCode => {
                        let code = self.lex_enclosed(
                            marker_begin,
                            marker_end,
                            self.config.code.1.as_str(),
                            "code",
                        )?;

                        Some((Token::Code, code))
                    }
                    Marker::BeginComment => {
                        self.lex_enclosed(
                            marker_begin,
                            marker_end,
                            self.config.comment.1.as_str(),
                            "comment",
                        )?;

                        None
                    }
                    Marker::EndExpression
                    | Marker::EndControl
                    | Marker::EndCode
                    | Marker::EndComment => {
                        // Emit any preceding raw text first, so the next call
                        // lands on the dangling marker and reports it.
                        if let Some(raw) = self.trim_raw(from, marker_begin, false) {
                            self.cursor = marker_begin;
                            return Ok(Some(raw));
                        }

                        return Err(Error::build(UNEXPECTED_TOKEN)
                            .with_pointer(self.source, marker_begin..marker_end)
                            .with_help(
                                "expected the beginning of an expression, control, \
                                code or comment marker",
                            ));
                    }
                };

                match (self.trim_raw(from, marker_begin, lstrip), next) {
                    (Some(raw), next) => {
                        self.buffer = next;
                        Ok(Some(raw))
                    }
                    (None, Some(next)) => Ok(Some(next)),
                    // A skipped comment with no preceding raw text, reported
                    // as whitespace so `.next` moves on.
                    (None, None) => Ok(Some((Token::Whitespace, (marker_begin..self.cursor).into()))),
                }
            }
            None => {
                let end = self.source.len();
                let raw = self.trim_raw(from, end, false);
                self.cursor = end;

                Ok(raw)
            }
        }
    }

    /// Capture the text between an opening marker and the given literal
    /// close delimiter, and advance the cursor beyond the close delimiter.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the close delimiter does not appear before
    /// end of input.
    fn lex_enclosed(
        &mut self,
        marker_begin: usize,
        marker_end: usize,
        close: &str,
        which: &str,
    ) -> Result<Region, Error> {
        match self.source[marker_end..].find(close) {
            Some(offset) => {
                let inner = Region::from(marker_end..marker_end + offset);
                self.cursor = inner.end + close.len();

                Ok(inner)
            }
            None => Err(Error::build(INVALID_SYNTAX)
                .with_pointer(self.source, marker_begin..marker_end)
                .with_help(format!(
                    "this {which} block is unterminated, close it with `{close}`"
                ))),
        }
    }

    /// Apply the whitespace-trim rules to the raw text between `begin` and
    /// `end`, and return it as a [`Token::Raw`] unless nothing remains.
    ///
    /// `trim_blocks` removes one leading newline when the raw text directly
    /// follows a closing control marker. `lstrip` removes a whitespace-only
    /// line prefix directly before an opening control marker.
    fn trim_raw(&mut self, mut begin: usize, mut end: usize, lstrip: bool) -> Option<(Token, Region)> {
        if self.trim_newline {
            self.trim_newline = false;
            let text = &self.source[begin..end];
            if let Some(stripped) = text.strip_prefix("\r\n").or_else(|| text.strip_prefix('\n')) {
                begin = end - stripped.len();
            }
        }
        if lstrip {
            let text = &self.source[begin..end];
            let line = text.rfind('\n').map(|i| i + 1).unwrap_or(0);
            if (line > 0 || begin == 0)
                && text[line..].chars().all(|c| c == ' ' || c == '\t')
            {
                end = begin + line;
            }
        }

        (begin < end).then(|| (Token::Raw, (begin..end).into()))
    }

    /// Return the next [`Token`] and [`Region`] in [`CursorState::Inside`]
    /// configuration.
    ///
    /// Assumes the cursor is inside of an expression or control marker.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when an unexpected [`Token`] is found.
    fn lex_tag(&mut self, from: usize) -> LexResult {
        let end = match self.state {
            CursorState::Inside { end } => end,
            CursorState::Default => panic!("lexer must be in tag state"),
        };

        match self.finder.starts(self.source, from) {
            Some((id, length)) => {
                let token = match Marker::from(id) {
                    Marker::EndExpression => Token::EndExpression,
                    Marker::EndControl => Token::EndControl,
                    _ => {
                        return Err(Error::build(UNEXPECTED_TOKEN)
                            .with_pointer(self.source, from..length)
                            .with_help("did you close the previous expression or block?"));
                    }
                };

                if token == end {
                    if token == Token::EndControl {
                        self.trim_newline = self.config.trim_blocks;
                    }
                    self.state = CursorState::Default;
                    self.cursor = length;

                    Ok(Some((token, (from..length).into())))
                } else {
                    let which = if end == Token::EndExpression {
                        "expression"
                    } else {
                        "block"
                    };

                    Err(Error::build(UNEXPECTED_TOKEN)
                        .with_pointer(self.source, from..length)
                        .with_help(format!("did you close the previous {which}?")))
                }
            }
            None => {
                let mut advance = |length: usize, data: Token| {
                    self.cursor += length;

                    Ok(Some((data, (from..from + length).into())))
                };

                let mut iterator = self.source[from..]
                    .char_indices()
                    .map(|(d, c)| (from + d, c));
                let (index, char) = iterator
                    .next()
                    .expect("tag text is never empty when lexing continues");

                match char {
                    '.' => advance(1, Token::Period),
                    '(' => advance(1, Token::LeftParen),
                    ')' => advance(1, Token::RightParen),
                    '|' => match iterator.next() {
                        Some((_, '>')) => advance(2, Token::Pipe),
                        _ => Err(Error::build(UNEXPECTED_TOKEN)
                            .with_pointer(self.source, index..index + 1)
                            .with_help("filters are applied with `|>`")),
                    },
                    '"' => self.lex_string(iterator, index),
                    '=' | '!' | '>' | '<' => self.lex_operator(iterator, index, char),
                    '-' => Ok(Some(self.lex_digit(iterator, index))),
                    c if c.is_whitespace() => Ok(Some(self.lex_whitespace(iterator, index))),
                    c if c.is_ascii_digit() => Ok(Some(self.lex_digit(iterator, index))),
                    c if is_ident_start(c) => Ok(Some(self.lex_ident_or_keyword(iterator, index))),
                    _ => Err(Error::build(UNEXPECTED_TOKEN)
                        .with_pointer(self.source, index..index + char.len_utf8())
                        .with_help(
                            "expected one of `.`, `(`, `)`, `|>`, an operator, an identifier, \
                            an ascii digit, or beginning of a string literal marked with `\"`",
                        )),
                }
            }
        }
    }

    /// Return a [`Token`] and [`Region`] based on the previous character.
    ///
    /// Checks the next character via `.next` to ensure the correct `Token` is
    /// returned. All of these are recognized:
    ///
    /// `==`, `!=`, `>=`, `<=`, `>`, `<`
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when an unexpected [`Token`] is found.
    fn lex_operator<T>(&mut self, mut iter: T, from: usize, previous: char) -> LexResult
    where
        T: Iterator<Item = (usize, char)>,
    {
        let (position, token) = match (previous, iter.next()) {
            // Double:
            ('=', Some((index, '='))) => (index, Token::Operator(Operator::Equal)),
            ('!', Some((index, '='))) => (index, Token::Operator(Operator::NotEqual)),
            ('>', Some((index, '='))) => (index, Token::Operator(Operator::GreaterOrEqual)),
            ('<', Some((index, '='))) => (index, Token::Operator(Operator::LesserOrEqual)),
            // Single:
            ('>', _) => (from, Token::Operator(Operator::Greater)),
            ('<', _) => (from, Token::Operator(Operator::Lesser)),
            _ => {
                return Err(Error::build(UNEXPECTED_TOKEN)
                    .with_pointer(self.source, from..from + 1)
                    .with_help(expected_operator(previous)));
            }
        };
        let position = position + 1;
        self.cursor = position;

        Ok(Some((token, (from..position).into())))
    }

    /// Return a [`Token`] and [`Region`] containing [`Token::Number`].
    fn lex_digit<T>(&mut self, mut iter: T, from: usize) -> (Token, Region)
    where
        T: Iterator<Item = (usize, char)>,
    {
        loop {
            match iter.next() {
                Some((index, char)) if !is_number(char) => {
                    self.cursor = index;

                    break (Token::Number, (from..index).into());
                }
                Some((_, _)) => continue,
                None => {
                    self.cursor = self.source.len();

                    return (Token::Number, (from..self.source.len()).into());
                }
            }
        }
    }

    /// Return a [`Token`] and [`Region`] containing [`Token::Whitespace`].
    fn lex_whitespace<T>(&mut self, mut iter: T, from: usize) -> (Token, Region)
    where
        T: Iterator<Item = (usize, char)>,
    {
        loop {
            match iter.next() {
                Some((index, char)) if !char.is_whitespace() => {
                    self.cursor = index;

                    break (Token::Whitespace, (from..index).into());
                }
                Some((_, _)) => continue,
                None => {
                    self.cursor = self.source.len();

                    return (Token::Whitespace, (from..self.source.len()).into());
                }
            }
        }
    }

    /// Return a [`Token`] and [`Region`] containing [`Token::String`] using
    /// the given iterator.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the string literal is unterminated.
    fn lex_string<T>(&mut self, mut iter: T, from: usize) -> LexResult
    where
        T: Iterator<Item = (usize, char)>,
    {
        let mut previous = (from, '"');
        loop {
            match iter.next() {
                Some((index, '"')) if previous.1 != '\\' => {
                    // Accept a double quote as a signal to end the string,
                    // unless the previous character was an escape.
                    //
                    // Add one to the index of the character to comply with
                    // string slice semantics.
                    let to = index + 1;
                    self.cursor = to;

                    return Ok(Some((Token::String, (from..to).into())));
                }
                Some((index, char)) => {
                    previous = (index, char);
                }
                None => {
                    let take = if previous.0 - from > 10 {
                        from + 10
                    } else {
                        previous.0
                    };

                    return Err(Error::build(INVALID_SYNTAX)
                        .with_pointer(self.source, from..take)
                        .with_help(
                            "this might be an undelimited string, try closing it with `\"`",
                        ));
                }
            }
        }
    }

    /// Return a [`Token`] and [`Region`] from the given iterator.
    ///
    /// The `Token` will be [`Token::Identifier`] or [`Token::Keyword`].
    fn lex_ident_or_keyword<T>(&mut self, mut iter: T, from: usize) -> (Token, Region)
    where
        T: Iterator<Item = (usize, char)>,
    {
        let mut check_keyword = |to: usize| {
            let range_text = self
                .source
                .get(from..to)
                .expect("valid range is required to check keyword");

            let token = match range_text {
                "not" => Token::Keyword(Keyword::Not),
                "if" => Token::Keyword(Keyword::If),
                "elif" => Token::Keyword(Keyword::Elif),
                "else" => Token::Keyword(Keyword::Else),
                "endif" => Token::Keyword(Keyword::EndIf),
                "for" => Token::Keyword(Keyword::For),
                "in" => Token::Keyword(Keyword::In),
                "endfor" => Token::Keyword(Keyword::EndFor),
                "block" => Token::Keyword(Keyword::Block),
                "endblock" => Token::Keyword(Keyword::EndBlock),
                "extends" => Token::Keyword(Keyword::Extends),
                "super" => Token::Keyword(Keyword::Super),
                "true" => Token::True,
                "false" => Token::False,
                _ => Token::Identifier,
            };
            self.cursor = to;

            (token, (from..to).into())
        };

        loop {
            match iter.next() {
                Some((index, char)) if !is_ident_continue(char) => {
                    break check_keyword(index);
                }
                Some((_, _)) => continue,
                None => break check_keyword(self.source.len()),
            }
        }
    }
}

/// Return true if the given character is a recognized beginning identifier,
/// meaning '_' or an `xid_start`.
fn is_ident_start(c: char) -> bool {
    c == '_' || unicode_ident::is_xid_start(c)
}

/// Return true if the given character is a recognized continue identifier,
/// meaning an `xid_continue`.
fn is_ident_continue(c: char) -> bool {
    unicode_ident::is_xid_continue(c)
}

/// Return true if the given character is a number (0-9) or a period.
fn is_number(c: char) -> bool {
    matches!(c, '0'..='9' | '.')
}

#[cfg(test)]
mod tests {
    use super::{Lexer, Token};
    use crate::{
        compile::{syntax::Builder, Keyword, Operator},
        config::Config,
        region::Region,
    };
    use morel::Finder;

    #[test]
    fn test_lex_default_no_match() {
        let expect = vec![(Token::Raw, 0..11)];

        helper_lex_next_auto("lorem ipsum", expect)
    }

    #[test]
    fn test_lex_default_match() {
        let expect = vec![
            (Token::Raw, 0..12),
            (Token::BeginExpression, 12..14),
            (Token::Identifier, 15..20),
        ];

        helper_lex_next_auto("lorem ipsum {{ dolor", expect);
    }

    #[test]
    fn test_lex_digit() {
        let expect = vec![
            (Token::BeginExpression, 0..2),
            (Token::Number, 3..5),
            (Token::EndExpression, 6..8),
        ];

        helper_lex_next_auto("{{ 10 }}", expect);
    }

    #[test]
    fn test_lex_negative_digit() {
        let expect = vec![
            (Token::BeginExpression, 0..2),
            (Token::Number, 3..8),
            (Token::EndExpression, 9..11),
        ];

        helper_lex_next_auto("{{ -10.2 }}", expect);
    }

    #[test]
    fn test_lex_ident() {
        let expect = vec![
            (Token::BeginExpression, 0..2),
            (Token::Identifier, 3..8),
            (Token::EndExpression, 9..11),
        ];

        helper_lex_next_auto("{{ hello }}", expect);
    }

    #[test]
    fn test_lex_keyword() {
        let expect = vec![
            (Token::BeginControl, 0..2),
            (Token::Keyword(Keyword::If), 3..5),
            (Token::Identifier, 6..10),
            (Token::EndControl, 11..13),
        ];

        helper_lex_next_auto("{% if name %}", expect);
    }

    #[test]
    fn test_lex_filter_pipe() {
        let expect = vec![
            (Token::BeginExpression, 0..2),
            (Token::Identifier, 3..7),
            (Token::Pipe, 8..10),
            (Token::Identifier, 11..16),
            (Token::EndExpression, 17..19),
        ];

        helper_lex_next_auto("{{ name |> upper }}", expect);
    }

    #[test]
    fn test_lex_super_call() {
        let expect = vec![
            (Token::BeginExpression, 0..2),
            (Token::Keyword(Keyword::Super), 3..8),
            (Token::LeftParen, 8..9),
            (Token::RightParen, 9..10),
            (Token::EndExpression, 11..13),
        ];

        helper_lex_next_auto("{{ super() }}", expect);
    }

    #[test]
    fn test_lex_operator() {
        let expect = vec![
            (Token::BeginControl, 0..2),
            (Token::Keyword(Keyword::If), 3..5),
            (Token::Identifier, 6..10),
            (Token::Operator(Operator::Equal), 11..13),
            (Token::String, 14..22),
            (Token::EndControl, 23..25),
        ];

        helper_lex_next_auto("{% if name == \"taylor\" %}", expect);
    }

    #[test]
    fn test_lex_string_escape() {
        let expect = vec![
            (Token::BeginExpression, 0..2),
            (Token::String, 3..13),
            (Token::EndExpression, 14..16),
        ];

        helper_lex_next_auto(r#"{{ "\"name\"" }}"#, expect);
    }

    #[test]
    fn test_lex_code() {
        let expect = vec![
            (Token::Raw, 0..6),
            (Token::Code, 8..21),
            (Token::Raw, 23..29),
        ];

        helper_lex_next_auto("lorem {< print hello >} ipsum", expect);
    }

    #[test]
    fn test_lex_comment_discarded() {
        let expect = vec![(Token::Raw, 0..6), (Token::Raw, 19..25)];

        helper_lex_next_auto("lorem {# ignored #} ipsum", expect);
    }

    #[test]
    fn test_lex_unterminated_code() {
        let (finder, config) = helper_syntax();
        let mut lexer = Lexer::new("before {< code", &finder, &config);

        assert!(lexer.next().is_ok());
        assert!(lexer.next().is_err());
    }

    #[test]
    fn test_lex_trim_blocks() {
        let (finder, mut config) = helper_syntax();
        config.trim_blocks = true;
        let source = "{% if x %}\nhello\n{% endif %}";
        let mut lexer = Lexer::new(source, &finder, &config);

        let mut tokens = vec![];
        while let Some((token, region)) = lexer.next().unwrap() {
            tokens.push((token, region));
        }

        // The newline after each closing control marker is gone.
        assert!(tokens.contains(&(Token::Raw, Region::new(11..17))));
    }

    #[test]
    fn test_lex_lstrip_blocks() {
        let (finder, mut config) = helper_syntax();
        config.lstrip_blocks = true;
        let source = "hello\n   {% if x %}";
        let mut lexer = Lexer::new(source, &finder, &config);

        assert_eq!(
            lexer.next(),
            Ok(Some((Token::Raw, Region::new(0..6))))
        );
        assert_eq!(
            lexer.next(),
            Ok(Some((Token::BeginControl, Region::new(9..11))))
        );
    }

    #[test]
    fn test_error_multiple_opening_tags() {
        let expect = vec![
            (Token::Raw, 0..6),
            (Token::BeginExpression, 6..8),
            (Token::Identifier, 9..13),
        ];

        let (finder, config) = helper_syntax();
        let mut lexer = Lexer::new("hello {{ name {{ }}", &finder, &config);
        for (token, range) in expect {
            assert_eq!(lexer.next(), Ok(Some((token, range.into()))))
        }

        assert!(lexer.next().is_err())
    }

    #[test]
    fn test_error_dangling_close_marker() {
        let (finder, config) = helper_syntax();
        let mut lexer = Lexer::new("hello %} there", &finder, &config);

        assert_eq!(lexer.next(), Ok(Some((Token::Raw, (0..6).into()))));
        assert!(lexer.next().is_err())
    }

    /// Return a Finder and Config with the default syntax.
    fn helper_syntax() -> (Finder, Config) {
        (Finder::new(Builder::new().to_syntax()), Config::default())
    }

    /// Helper function which takes in a source string, creates a lexer on that
    /// string and iterates [expect.len()] amount of times and compares the result
    /// against [lexer.next()].
    fn helper_lex_next_auto<T>(source: &str, expect: Vec<(Token, T)>)
    where
        T: Into<Region>,
    {
        let (finder, config) = helper_syntax();
        let mut lexer = Lexer::new(source, &finder, &config);
        for (token, region) in expect {
            assert_eq!(lexer.next(), Ok(Some((token, region.into()))))
        }

        assert_eq!(lexer.next(), Ok(None));
        assert_eq!(lexer.next(), Ok(None));
        assert_eq!(lexer.next(), Ok(None));
    }
}

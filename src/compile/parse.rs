//! Template parser.
//!
//! Pulls tokens from a [`Lexer`] and assembles a [`Template`] containing the
//! abstract syntax tree, the preamble, and the inheritance metadata.
pub mod tree;

mod scope;
mod state;

pub use scope::Scope;

use crate::{
    compile::{
        lex::{token::Token, LexResult, LexResultMust, Lexer},
        parse::{
            state::State,
            tree::{
                Base, Block, Branch, Comparison, For, Identifier, If, Literal, Output, Tree,
                Variable,
            },
        },
        Keyword, Template,
    },
    config::Config,
    log::{
        error_eof, expected_keyword, Error, INVALID_SYNTAX, UNEXPECTED_KEYWORD, UNEXPECTED_TOKEN,
    },
    region::Region,
};
use morel::Finder;
use serde_json::{Number, Value};
use std::collections::HashMap;

pub struct Parser<'source> {
    /// Lexer used to pull from source as tokens instead of raw text.
    lexer: Lexer<'source>,
    /// Store peeked tokens.
    ///
    /// Double option is used to remember when the next token is None.
    buffer: Option<Option<(Token, Region)>>,
}

impl<'source> Parser<'source> {
    /// Create a new [`Parser`] from the given string.
    #[inline]
    pub fn new(source: &'source str, finder: &'source Finder, config: &'source Config) -> Self {
        Self {
            lexer: Lexer::new(source, finder, config),
            buffer: None,
        }
    }

    /// Compile the template.
    ///
    /// Returns a new [`Template`], which can be executed with some
    /// [`Store`][`crate::Store`] data to receive output.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the source is malformed, for example an
    /// unclosed block, a misplaced `extends` tag, or a `super()` call outside
    /// of a block.
    pub fn compile(mut self, name: Option<&str>) -> Result<Template, Error> {
        // Temporary storage for fragments of larger blocks.
        let mut states: Vec<State> = vec![];

        // Contains the distinct Tree instances within a specific area of the
        // source.
        //
        // Used to remember what belongs to the "if" branch and what belongs
        // to the "else" branch in an "if" block, for example.
        let mut scopes: Vec<Scope> = vec![Scope::new()];

        // Inheritance metadata, gathered as the tags are seen.
        let mut extends: Option<String> = None;
        let mut blocks: HashMap<String, Scope> = HashMap::new();
        let mut preamble: Vec<Region> = vec![];

        // True once anything other than whitespace or a code block has been
        // parsed. Code blocks before that point belong to the preamble, and
        // an `extends` tag after that point is an error.
        let mut seen_content = false;

        while let Some(next) = self.next()? {
            let tree = match next {
                (Token::Raw, region) => {
                    let text = region.literal(self.lexer.source)?;
                    if !text.chars().all(char::is_whitespace) {
                        seen_content = true;
                    }

                    Some(Tree::Raw(region))
                }
                (Token::Code, region) => {
                    if !seen_content && states.is_empty() {
                        preamble.push(region);

                        None
                    } else {
                        seen_content = true;

                        Some(Tree::Code(region))
                    }
                }
                (Token::BeginExpression, region) => {
                    seen_content = true;

                    if self.next_is(Token::Keyword(Keyword::Super))? {
                        Some(self.parse_super(region, &states)?)
                    } else {
                        Some(self.parse_output(region)?)
                    }
                }
                (Token::BeginControl, region) => {
                    let tree = self.parse_control(
                        region,
                        &mut states,
                        &mut scopes,
                        &mut blocks,
                        &mut extends,
                        seen_content,
                    )?;
                    seen_content = true;

                    tree
                }
                (token, region) => {
                    return Err(Error::build(UNEXPECTED_TOKEN)
                        .with_pointer(self.lexer.source, region)
                        .with_help(format!("unexpected `{token}` outside of any marker")));
                }
            };

            if let Some(tree) = tree {
                scopes
                    .last_mut()
                    .expect("parser must always have a scope")
                    .data
                    .push(tree);
            }
        }

        if let Some(open) = states.first() {
            return Err(Error::build(INVALID_SYNTAX)
                .with_pointer(self.lexer.source, open.region())
                .with_help(format!(
                    "did you close this block with `{}`?",
                    open.closer()
                )));
        }

        assert!(
            scopes.len() == 1,
            "parser should never have >1 scope after compilation"
        );

        Ok(Template {
            name: name.map(str::to_owned),
            source: self.lexer.source.to_owned(),
            scope: scopes.remove(0),
            preamble,
            blocks,
            extends,
            superior: None,
        })
    }

    /// Parse the contents of a control marker and update the parser state.
    ///
    /// Opening tags such as "if" and "for" push a [`State`] and a fresh
    /// [`Scope`], while closing tags pop them and produce a finished [`Tree`].
    fn parse_control(
        &mut self,
        begin: Region,
        states: &mut Vec<State>,
        scopes: &mut Vec<Scope>,
        blocks: &mut HashMap<String, Scope>,
        extends: &mut Option<String>,
        seen_content: bool,
    ) -> Result<Option<Tree>, Error> {
        let (keyword, keyword_region) = self.parse_keyword()?;

        match keyword {
            Keyword::If => {
                let condition = self.parse_comparison()?;
                let (_, end) = self.next_must(Token::EndControl)?;

                states.push(State::If {
                    arms: vec![],
                    pending: Some(condition),
                    else_taken: false,
                    region: begin.combine(end),
                });
                scopes.push(Scope::new());

                Ok(None)
            }
            Keyword::Elif => {
                let condition = self.parse_comparison()?;
                self.next_must(Token::EndControl)?;
                let body = scopes
                    .pop()
                    .expect("parser must always have a scope");

                match states.last_mut() {
                    Some(State::If {
                        arms,
                        pending,
                        else_taken: false,
                        ..
                    }) => {
                        let finished = pending
                            .take()
                            .expect("open branch must have a condition");
                        arms.push(Branch {
                            condition: finished,
                            body,
                        });
                        *pending = Some(condition);
                    }
                    _ => {
                        return Err(Error::build(UNEXPECTED_KEYWORD)
                            .with_pointer(self.lexer.source, keyword_region)
                            .with_help("`elif` is only valid after an `if` or `elif` tag"));
                    }
                }
                scopes.push(Scope::new());

                Ok(None)
            }
            Keyword::Else => {
                self.next_must(Token::EndControl)?;
                let body = scopes
                    .pop()
                    .expect("parser must always have a scope");

                match states.last_mut() {
                    Some(State::If {
                        arms,
                        pending,
                        else_taken,
                        ..
                    }) if !*else_taken => {
                        let finished = pending
                            .take()
                            .expect("open branch must have a condition");
                        arms.push(Branch {
                            condition: finished,
                            body,
                        });
                        *else_taken = true;
                    }
                    _ => {
                        return Err(Error::build(UNEXPECTED_KEYWORD)
                            .with_pointer(self.lexer.source, keyword_region)
                            .with_help("`else` is only valid once, after an `if` or `elif` tag"));
                    }
                }
                scopes.push(Scope::new());

                Ok(None)
            }
            Keyword::EndIf => {
                self.next_must(Token::EndControl)?;
                let body = scopes
                    .pop()
                    .expect("parser must always have a scope");

                match states.pop() {
                    Some(State::If {
                        mut arms,
                        pending,
                        else_taken,
                        region,
                    }) => {
                        let else_branch = if else_taken {
                            Some(body)
                        } else {
                            let finished = pending
                                .expect("open branch must have a condition");
                            arms.push(Branch {
                                condition: finished,
                                body,
                            });

                            None
                        };

                        Ok(Some(Tree::If(If {
                            branches: arms,
                            else_branch,
                            region,
                        })))
                    }
                    _ => Err(Error::build(UNEXPECTED_KEYWORD)
                        .with_pointer(self.lexer.source, keyword_region)
                        .with_help("`endif` has no matching `if`")),
                }
            }
            Keyword::For => {
                let variable = self.parse_ident()?;
                self.next_must(Token::Keyword(Keyword::In))?;
                let iterable = self.parse_base()?;
                let (_, end) = self.next_must(Token::EndControl)?;

                states.push(State::For {
                    variable,
                    iterable,
                    region: begin.combine(end),
                });
                scopes.push(Scope::new());

                Ok(None)
            }
            Keyword::EndFor => {
                self.next_must(Token::EndControl)?;
                let body = scopes
                    .pop()
                    .expect("parser must always have a scope");

                match states.pop() {
                    Some(State::For {
                        variable,
                        iterable,
                        region,
                    }) => Ok(Some(Tree::For(For {
                        variable,
                        iterable,
                        body,
                        region,
                    }))),
                    _ => Err(Error::build(UNEXPECTED_KEYWORD)
                        .with_pointer(self.lexer.source, keyword_region)
                        .with_help("`endfor` has no matching `for`")),
                }
            }
            Keyword::Block => {
                let name_ident = self.parse_ident()?;
                let name = name_ident.region.literal(self.lexer.source)?.to_owned();
                let (_, end) = self.next_must(Token::EndControl)?;

                let open = states
                    .iter()
                    .any(|state| matches!(state, State::Block { name: above, .. } if *above == name));
                if open || blocks.contains_key(&name) {
                    return Err(Error::build(INVALID_SYNTAX)
                        .with_pointer(self.lexer.source, name_ident.region)
                        .with_help(format!(
                            "a block named `{name}` already exists in this template"
                        )));
                }

                states.push(State::Block {
                    name,
                    region: begin.combine(end),
                });
                scopes.push(Scope::new());

                Ok(None)
            }
            Keyword::EndBlock => {
                self.next_must(Token::EndControl)?;
                let body = scopes
                    .pop()
                    .expect("parser must always have a scope");

                match states.pop() {
                    Some(State::Block { name, region }) => {
                        blocks.insert(name.clone(), body.clone());

                        Ok(Some(Tree::Block(Block { name, region, body })))
                    }
                    _ => Err(Error::build(UNEXPECTED_KEYWORD)
                        .with_pointer(self.lexer.source, keyword_region)
                        .with_help("`endblock` has no matching `block`")),
                }
            }
            Keyword::Extends => {
                let (_, name_region) = self.next_must(Token::String)?;
                let parent = self.parse_string(name_region)?;
                self.next_must(Token::EndControl)?;

                if seen_content || extends.is_some() || !states.is_empty() {
                    return Err(Error::build(INVALID_SYNTAX)
                        .with_pointer(self.lexer.source, begin.combine(keyword_region))
                        .with_help(
                            "`extends` must be the first tag in a template, \
                            and may only appear once",
                        ));
                }
                *extends = Some(parent);

                Ok(None)
            }
            Keyword::Super => Err(Error::build(UNEXPECTED_KEYWORD)
                .with_pointer(self.lexer.source, keyword_region)
                .with_help("`super` is an expression, write it as `{{ super() }}`")),
            Keyword::Not | Keyword::In => Err(Error::build(UNEXPECTED_KEYWORD)
                .with_pointer(self.lexer.source, keyword_region)
                .with_help(expected_keyword(keyword))),
        }
    }

    /// Parse a `super()` call.
    ///
    /// Assumes the opening expression marker is already consumed, and the
    /// `super` keyword is next.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the call does not appear within a block, or
    /// the parentheses are missing.
    fn parse_super(&mut self, begin: Region, states: &[State]) -> Result<Tree, Error> {
        let (_, keyword_region) = self.next_must(Token::Keyword(Keyword::Super))?;
        self.next_must(Token::LeftParen)?;
        self.next_must(Token::RightParen)?;
        let (_, end) = self.next_must(Token::EndExpression)?;

        if !states.iter().any(|state| matches!(state, State::Block { .. })) {
            return Err(Error::build(INVALID_SYNTAX)
                .with_pointer(self.lexer.source, keyword_region)
                .with_help("`super()` is only valid inside of a `block`"));
        }

        Ok(Tree::Super(begin.combine(end)))
    }

    /// Parse an expression.
    ///
    /// An expression renders a value, and may pipe that value through one or
    /// more filters with the `|>` operator.
    fn parse_output(&mut self, begin: Region) -> Result<Tree, Error> {
        // {{ name |> upper |> escape }}
        // |                           |
        // from                        to
        let base = self.parse_base()?;

        let mut filters = vec![];
        while self.next_is(Token::Pipe)? {
            self.next_must(Token::Pipe)?;
            filters.push(self.parse_ident()?);
        }
        let (_, end) = self.next_must(Token::EndExpression)?;

        Ok(Tree::Output(Output {
            base,
            filters,
            region: begin.combine(end),
        }))
    }

    /// Parse a [`Comparison`].
    ///
    /// Input variants:
    ///
    /// ```text
    /// this %}
    /// not this %}
    /// this == that %}
    /// not this == that %}
    /// ```
    fn parse_comparison(&mut self) -> Result<Comparison, Error> {
        let negate = if self.next_is(Token::Keyword(Keyword::Not))? {
            self.next_must(Token::Keyword(Keyword::Not))?;

            true
        } else {
            false
        };
        let left = self.parse_base()?;

        let (operator, right) = match self.peek()? {
            Some((Token::Operator(operator), _)) => {
                self.next()?;
                let right = self.parse_base()?;

                (Some(operator), Some(right))
            }
            _ => (None, None),
        };

        let mut region = left.get_region();
        if let Some(right) = &right {
            region = region.combine(right.get_region());
        }

        Ok(Comparison {
            negate,
            left,
            operator,
            right,
            region,
        })
    }

    /// Parse a [`Keyword`].
    ///
    /// # Errors
    ///
    /// Returns an error if the next token is not a `Keyword`.
    fn parse_keyword(&mut self) -> Result<(Keyword, Region), Error> {
        match self.next_any_must()? {
            (Token::Keyword(keyword), region) => Ok((keyword, region)),
            (token, region) => Err(Error::build(UNEXPECTED_TOKEN)
                .with_pointer(self.lexer.source, region)
                .with_help(expected_keyword(token))),
        }
    }

    /// Parse an [`Identifier`].
    ///
    /// # Errors
    ///
    /// Propagates an error from `next_must` if the next token is not an
    /// `Identifier`.
    fn parse_ident(&mut self) -> Result<Identifier, Error> {
        let (_, region) = self.next_must(Token::Identifier)?;

        Ok(Identifier { region })
    }

    /// Parse a [`Base`].
    ///
    /// A `Base` may be returned as a [`Literal`] or [`Variable`] based on the
    /// value.
    ///
    /// ## Literal
    ///
    /// `"hello world"`, `-1000`, `10.2`, `true`
    ///
    /// ## Variable
    ///
    /// `person.name`
    fn parse_base(&mut self) -> Result<Base, Error> {
        let base = match self.next_any_must()? {
            (Token::True, region) => Base::Literal(Literal {
                value: Value::Bool(true),
                region,
            }),
            (Token::False, region) => Base::Literal(Literal {
                value: Value::Bool(false),
                region,
            }),
            (Token::Number, region) => {
                let literal =
                    self.parse_number_literal(region.literal(self.lexer.source)?, region)?;

                Base::Literal(literal)
            }
            (Token::String, region) => {
                let value = Value::String(self.parse_string(region)?);

                Base::Literal(Literal { value, region })
            }
            (Token::Identifier, region) => {
                let mut path = vec![Identifier { region }];

                // Keep chaining keys as long as we see a period.
                while self.next_is(Token::Period)? {
                    self.next_must(Token::Period)?;
                    path.push(self.parse_ident()?);
                }

                Base::Variable(Variable::new(path))
            }
            (_, region) => {
                return Err(Error::build(UNEXPECTED_TOKEN)
                    .with_pointer(self.lexer.source, region)
                    .with_help("expected a literal or an identifier"));
            }
        };

        Ok(base)
    }

    /// Parse a [`String`] from the literal value of the given [`Region`].
    ///
    /// The region is expected to include the surrounding quotes.
    ///
    /// # Errors
    ///
    /// Returns an error if an unrecognized escape character is found.
    fn parse_string(&self, region: Region) -> Result<String, Error> {
        let window = region.literal(self.lexer.source)?;

        let string = if window.contains('\\') {
            let mut iter = window.char_indices();
            let mut string = String::new();

            while let Some((_, c)) = iter.next() {
                match c {
                    '"' => continue,
                    '\\' => {
                        let c = match iter.next() {
                            Some((_, 'n')) => '\n',
                            Some((_, 'r')) => '\r',
                            Some((_, 't')) => '\t',
                            Some((_, '\\')) => '\\',
                            Some((_, '"')) => '"',
                            _ => {
                                return Err(Error::build("unexpected escape character")
                                    .with_pointer(self.lexer.source, region));
                            }
                        };
                        string.push(c);
                    }
                    c => string.push(c),
                }
            }

            string
        } else {
            window[1..window.len() - 1].to_owned()
        };

        Ok(string)
    }

    /// Parse a [`Literal`] containing a `Value::Number` from the given
    /// [`Region`].
    ///
    /// # Errors
    ///
    /// Returns an error if the literal value of the `Region` cannot be
    /// converted to a `Value::Number`.
    fn parse_number_literal(&self, window: &str, region: Region) -> Result<Literal, Error> {
        let as_number: Number = window.parse().map_err(|_| {
            Error::build("unrecognizable number")
                .with_pointer(self.lexer.source, region)
                .with_help(
                    "numbers may begin with `-` to indicate a negative \
                    number and must not end with a decimal",
                )
        })?;

        Ok(Literal {
            value: Value::Number(as_number),
            region,
        })
    }

    /// Peek the next token.
    ///
    /// # Errors
    ///
    /// Propagates any error reported by the underlying Lexer.
    fn peek(&mut self) -> LexResult {
        if let o @ None = &mut self.buffer {
            *o = Some(self.lexer.next()?);
        }

        Ok(self.buffer.unwrap())
    }

    /// Get the next token.
    ///
    /// Prefers to pull a token from the internal buffer first, but will pull
    /// from the lexer when the buffer is empty.
    fn next(&mut self) -> LexResult {
        match self.buffer.take() {
            Some(t) => Ok(t),
            None => self.lexer.next(),
        }
    }

    /// Returns true if the given token matches the upcoming token.
    ///
    /// # Errors
    ///
    /// Propagates any errors reported by the underlying lexer.
    fn next_is(&mut self, expect: Token) -> Result<bool, Error> {
        Ok(self
            .peek()?
            .map(|(token, _)| token == expect)
            .unwrap_or(false))
    }

    /// Get the next token, and compare it to the given token.
    ///
    /// # Errors
    ///
    /// An error is returned if the next token does not match the given token,
    /// or no tokens are left.
    fn next_must(&mut self, expect: Token) -> LexResultMust {
        match self.next()? {
            Some((token, region)) => {
                if token == expect {
                    Ok((token, region))
                } else {
                    Err(Error::build(UNEXPECTED_TOKEN)
                        .with_pointer(self.lexer.source, region)
                        .with_help(format!("expected `{expect}`, found `{token}`")))
                }
            }
            None => Err(error_eof(self.lexer.source).with_help(format!("expected `{expect}`"))),
        }
    }

    /// Get the next token.
    ///
    /// Similar to `next` but requires that a token is returned.
    ///
    /// # Errors
    ///
    /// An error is returned if no more tokens are left.
    fn next_any_must(&mut self) -> LexResultMust {
        match self.next()? {
            Some((token, region)) => Ok((token, region)),
            None => Err(error_eof(self.lexer.source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{tree::Tree, Parser};
    use crate::{
        compile::{lex::token::Token, syntax::Builder, Template},
        config::Config,
        log::Error,
    };
    use morel::Finder;

    #[test]
    fn test_parser_lexer_integration() {
        let (finder, config) = helper_syntax();
        let mut parser = Parser::new("hello", &finder, &config);

        assert_eq!(parser.next(), Ok(Some((Token::Raw, (0..5).into()))));
        assert_eq!(parser.next(), Ok(None));
    }

    #[test]
    fn test_peek_multiple() {
        let (finder, config) = helper_syntax();
        let mut parser = Parser::new("{{ one two", &finder, &config);

        assert!(parser.next().is_ok());
        assert_eq!(parser.peek(), Ok(Some((Token::Identifier, (3..6).into()))));
        assert_eq!(parser.peek(), Ok(Some((Token::Identifier, (3..6).into()))));
    }

    #[test]
    fn test_parse_filtered_expression() {
        let template = helper_compile("hello {{ name |> upper |> escape }}").unwrap();

        match &template.scope.data[1] {
            Tree::Output(output) => assert_eq!(output.filters.len(), 2),
            tree => panic!("expected output, found {tree:?}"),
        }
    }

    #[test]
    fn test_parse_if_elif_else() {
        let source = "{% if a %}1{% elif b %}2{% elif c %}3{% else %}4{% endif %}";
        let template = helper_compile(source).unwrap();

        match &template.scope.data[0] {
            Tree::If(tree) => {
                assert_eq!(tree.branches.len(), 3);
                assert!(tree.else_branch.is_some());
            }
            tree => panic!("expected if, found {tree:?}"),
        }
    }

    #[test]
    fn test_parse_for() {
        let template = helper_compile("{% for item in items %}x{% endfor %}").unwrap();

        assert!(matches!(&template.scope.data[0], Tree::For(_)));
    }

    #[test]
    fn test_parse_block_registered() {
        let template = helper_compile("{% block title %}default{% endblock %}").unwrap();

        assert!(template.blocks.contains_key("title"));
        assert!(matches!(&template.scope.data[0], Tree::Block(_)));
    }

    #[test]
    fn test_parse_duplicate_block() {
        let source = "{% block a %}{% endblock %}{% block a %}{% endblock %}";

        assert!(helper_compile(source).is_err());
    }

    #[test]
    fn test_parse_duplicate_block_nested() {
        let source = "{% block a %}{% block a %}{% endblock %}{% endblock %}";

        assert!(helper_compile(source).is_err());
    }

    #[test]
    fn test_parse_nested_blocks() {
        let source = "{% block a %}{% block b %}{% endblock %}{% endblock %}";
        let template = helper_compile(source).unwrap();

        assert!(template.blocks.contains_key("a"));
        assert!(template.blocks.contains_key("b"));
    }

    #[test]
    fn test_parse_extends_first() {
        let template = helper_compile("{% extends \"base.html\" %}rest").unwrap();

        assert_eq!(template.extends.as_deref(), Some("base.html"));
    }

    #[test]
    fn test_parse_extends_after_content() {
        assert!(helper_compile("hello {% extends \"base.html\" %}").is_err());
    }

    #[test]
    fn test_parse_extends_after_whitespace() {
        // Leading whitespace does not count as content.
        let template = helper_compile("  \n{% extends \"base.html\" %}").unwrap();

        assert_eq!(template.extends.as_deref(), Some("base.html"));
    }

    #[test]
    fn test_parse_super_outside_block() {
        assert!(helper_compile("{{ super() }}").is_err());
    }

    #[test]
    fn test_parse_super_inside_block() {
        let source = "{% block a %}{{ super() }}{% endblock %}";

        assert!(helper_compile(source).is_ok());
    }

    #[test]
    fn test_parse_super_as_control() {
        assert!(helper_compile("{% block a %}{% super %}{% endblock %}").is_err());
    }

    #[test]
    fn test_parse_unclosed_block() {
        assert!(helper_compile("{% if name %}hello").is_err());
    }

    #[test]
    fn test_parse_mismatched_close() {
        assert!(helper_compile("{% for x in y %}{% endif %}").is_err());
    }

    #[test]
    fn test_parse_preamble() {
        let source = "{< setup one >}\n{< setup two >}\nhello {< run >}";
        let template = helper_compile(source).unwrap();

        assert_eq!(template.preamble.len(), 2);
        // The third code block comes after content, so it stays in the tree.
        assert!(template
            .scope
            .data
            .iter()
            .any(|tree| matches!(tree, Tree::Code(_))));
    }

    #[test]
    fn test_parse_comparison_negated() {
        let source = "{% if not person.is_admin %}no{% endif %}";
        let template = helper_compile(source).unwrap();

        match &template.scope.data[0] {
            Tree::If(tree) => assert!(tree.branches[0].condition.negate),
            tree => panic!("expected if, found {tree:?}"),
        }
    }

    /// Return a Finder and Config with the default syntax.
    fn helper_syntax() -> (Finder, Config) {
        (Finder::new(Builder::new().to_syntax()), Config::default())
    }

    /// Compile the given source with default syntax and options.
    fn helper_compile(source: &str) -> Result<Template, Error> {
        let (finder, config) = helper_syntax();

        Parser::new(source, &finder, &config).compile(None)
    }
}

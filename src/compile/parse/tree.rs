use crate::{compile::Operator, region::Region, Scope};
use serde_json::Value;

/// Node in the abstract syntax tree of a compiled template.
#[derive(Debug, Clone)]
pub enum Tree {
    /// Raw text emitted verbatim.
    Raw(Region),
    /// Render a value after applying any filters.
    Output(Output),
    /// An "if" block with one or more conditional branches.
    If(If),
    /// A "for" loop over an iterable value.
    For(For),
    /// A host-code block executed when the template is rendered.
    Code(Region),
    /// A named, overridable block.
    Block(Block),
    /// A `super()` call, splicing in the overridden block body.
    Super(Region),
}

/// Value to be rendered, and the filters it passes through first.
#[derive(Debug, Clone)]
pub struct Output {
    /// The underlying value being rendered.
    pub base: Base,
    /// Filters to apply, in source order.
    pub filters: Vec<Identifier>,
    /// Area encompassing the full expression.
    pub region: Region,
}

/// An "if" block.
#[derive(Debug, Clone)]
pub struct If {
    /// Conditional branches, in source order. The first branch whose
    /// condition holds is rendered.
    pub branches: Vec<Branch>,
    /// Body of the "else" branch, if one exists.
    pub else_branch: Option<Scope>,
    /// Area encompassing the opening tag.
    pub region: Region,
}

/// One conditional branch within an "if" block.
#[derive(Debug, Clone)]
pub struct Branch {
    /// Condition that gates this branch.
    pub condition: Comparison,
    /// Scope rendered when the condition holds.
    pub body: Scope,
}

/// Condition within an "if" or "elif" tag.
///
/// When `operator` and `right` are absent, the truthiness of `left` alone
/// decides the outcome.
#[derive(Debug, Clone)]
pub struct Comparison {
    /// True if the result is negated with "not".
    pub negate: bool,
    /// Left side of the comparison.
    pub left: Base,
    /// Operator dividing the two sides.
    pub operator: Option<Operator>,
    /// Right side of the comparison.
    pub right: Option<Base>,
    /// Area encompassing the condition.
    pub region: Region,
}

/// A "for" loop.
#[derive(Debug, Clone)]
pub struct For {
    /// Name bound to each element of the iterable.
    pub variable: Identifier,
    /// Value being iterated.
    pub iterable: Base,
    /// Scope rendered once per element.
    pub body: Scope,
    /// Area encompassing the opening tag.
    pub region: Region,
}

/// A named block, overridable by extending templates.
#[derive(Debug, Clone)]
pub struct Block {
    /// Name of the block.
    pub name: String,
    /// Area encompassing the opening tag.
    pub region: Region,
    /// Default body of the block.
    pub body: Scope,
}

/// Variable or literal appearing within a tag.
#[derive(Debug, Clone)]
pub enum Base {
    /// A value to be looked up when the template is rendered.
    Variable(Variable),
    /// A value known at compile time.
    Literal(Literal),
}

impl Base {
    /// Return the [`Region`] from the underlying kind.
    pub fn get_region(&self) -> Region {
        match self {
            Base::Variable(variable) => variable.get_region(),
            Base::Literal(literal) => literal.region,
        }
    }
}

/// Period-separated path leading to a value, such as `person.name`.
#[derive(Debug, Clone)]
pub struct Variable {
    /// Keys that make up the path, in source order.
    pub path: Vec<Identifier>,
}

impl Variable {
    /// Create a new [`Variable`] from the given path.
    pub fn new(path: Vec<Identifier>) -> Self {
        Self { path }
    }

    /// Return a [`Region`] spanning the full path.
    pub fn get_region(&self) -> Region {
        let begin = self
            .path
            .first()
            .expect("variable path must not be empty")
            .region;
        match self.path.last() {
            Some(last) => begin.combine(last.region),
            None => begin,
        }
    }
}

/// Area of the source text that holds the name of a value.
#[derive(Debug, Clone, Copy)]
pub struct Identifier {
    /// Position of the identifier in the source text.
    pub region: Region,
}

/// Literal value parsed from the source text.
#[derive(Debug, Clone)]
pub struct Literal {
    /// The value itself.
    pub value: Value,
    /// Position of the literal in the source text.
    pub region: Region,
}

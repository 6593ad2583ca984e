use super::tree::{Branch, Comparison, Identifier};
use crate::region::Region;

/// Describes a block that the [`Parser`][`crate::compile::Parser`] has
/// opened but not yet closed.
#[derive(Debug)]
pub enum State {
    /// An "if" block awaiting "endif".
    If {
        /// Completed branches, each holding its own body.
        arms: Vec<Branch>,
        /// Condition of the branch currently being collected.
        pending: Option<Comparison>,
        /// True once the "else" tag has been seen.
        else_taken: bool,
        /// Area encompassing the opening tag.
        region: Region,
    },
    /// A "for" loop awaiting "endfor".
    For {
        /// Name bound to each element.
        variable: Identifier,
        /// Value being iterated.
        iterable: super::tree::Base,
        /// Area encompassing the opening tag.
        region: Region,
    },
    /// A named block awaiting "endblock".
    Block {
        /// Name of the block.
        name: String,
        /// Area encompassing the opening tag.
        region: Region,
    },
}

impl State {
    /// Return the name of the closing tag for this [`State`].
    pub fn closer(&self) -> &'static str {
        match self {
            State::If { .. } => "endif",
            State::For { .. } => "endfor",
            State::Block { .. } => "endblock",
        }
    }

    /// Return the [`Region`] of the opening tag for this [`State`].
    pub fn region(&self) -> Region {
        match self {
            State::If { region, .. } => *region,
            State::For { region, .. } => *region,
            State::Block { region, .. } => *region,
        }
    }
}

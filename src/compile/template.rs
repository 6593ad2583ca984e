use crate::{region::Region, Scope};
use std::collections::HashMap;

/// A compiled template, ready to be rendered with some
/// [`Store`][`crate::Store`] data.
///
/// Owns its source text, so the [`Region`] instances within the syntax tree
/// always resolve against the text they were compiled from.
#[derive(Debug, Clone)]
pub struct Template {
    /// The name of the template, if one was assigned.
    pub(crate) name: Option<String>,
    /// The source text that the template was compiled from.
    pub(crate) source: String,
    /// The root scope of the abstract syntax tree.
    pub(crate) scope: Scope,
    /// Host-code fragments found before any content, executed once per
    /// render with output discarded.
    pub(crate) preamble: Vec<Region>,
    /// Named blocks declared in this template, by name.
    pub(crate) blocks: HashMap<String, Scope>,
    /// The name given in the `extends` tag, if one exists.
    pub(crate) extends: Option<String>,
    /// The compiled parent template, linked when an `extends` tag exists.
    pub(crate) superior: Option<Box<Template>>,
}

impl Template {
    /// Return the name of the template.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Return the source text of the template.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Return the name of the parent template, if this template extends
    /// another.
    pub fn extends(&self) -> Option<&str> {
        self.extends.as_deref()
    }
}

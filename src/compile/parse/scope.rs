use super::tree::Tree;

/// A contiguous sequence of [`Tree`] instances.
#[derive(Debug, Clone)]
pub struct Scope {
    pub data: Vec<Tree>,
}

impl Scope {
    /// Create a new, empty [`Scope`].
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

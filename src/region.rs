use crate::log::Error;
use std::{
    cmp::{max, min},
    ops::Range,
};

/// A byte span within source text.
///
/// Trees hold a `Region` rather than the text itself, so a compiled
/// [`Template`][`crate::Template`] stores its source exactly once.
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Region {
    /// The beginning of the span, inclusive.
    pub begin: usize,
    /// The ending of the span, exclusive.
    pub end: usize,
}

impl Region {
    /// Create a new Region from the given range.
    pub fn new(position: Range<usize>) -> Self {
        Self {
            begin: position.start,
            end: position.end,
        }
    }

    /// Return the smallest [`Region`] covering both this one and the given
    /// one.
    pub fn combine(self, other: Self) -> Self {
        Self {
            begin: min(self.begin, other.begin),
            end: max(self.end, other.end),
        }
    }

    /// Resolve the [`Region`] against the given source text.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if the `Region` is out of bounds or does not fall
    /// on character boundaries in the given source text.
    pub fn literal<'source>(&self, source: &'source str) -> Result<&'source str, Error> {
        source.get(self.begin..self.end).ok_or_else(|| {
            Error::render(format!(
                "region {}..{} is out of bounds in source of length {}",
                self.begin,
                self.end,
                source.len()
            ))
        })
    }
}

impl From<Range<usize>> for Region {
    fn from(value: Range<usize>) -> Self {
        Self {
            begin: value.start,
            end: value.end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Region;

    #[test]
    fn test_combine() {
        let combined = Region::new(5..10).combine(Region::new(8..15));

        assert_eq!(combined.begin, 5);
        assert_eq!(combined.end, 15);
    }

    #[test]
    fn test_combine_disjoint() {
        let combined = Region::new(12..14).combine(Region::new(0..3));

        assert_eq!(combined, Region::new(0..14));
    }

    #[test]
    fn test_literal() {
        let source = "Hello, Taylor!";

        assert_eq!(Region::new(7..13).literal(source).unwrap(), "Taylor");
    }

    #[test]
    fn test_literal_out_of_bounds() {
        let source = "Hello, Taylor!";

        assert!(Region::new(7..15).literal(source).is_err());
    }
}

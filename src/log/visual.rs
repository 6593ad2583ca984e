mod pointer;

pub use pointer::Pointer;

use std::fmt::{Debug, Formatter, Result};

/// Describes a type that can be associated with an Error and used
/// to print a visualization.
pub trait Visual: Debug {
    /// Display the visualization by writing to the given Formatter.
    fn display(
        &self,
        formatter: &mut Formatter<'_>,
        template: Option<&str>,
        help: Option<&str>,
    ) -> Result;
}

/// Locate the line holding the given byte offset within the source.
///
/// Returns the zero indexed line number, the display width of the text
/// before the offset on that line, and the full text of the line.
fn locate(source: &str, offset: usize) -> (usize, usize, &str) {
    let offset = offset.min(source.len());
    let begin = source[..offset].rfind('\n').map_or(0, |at| at + 1);
    let end = source[offset..]
        .find('\n')
        .map_or(source.len(), |at| offset + at);
    let line = source[..begin].matches('\n').count();

    (line, get_width(&source[begin..offset]), &source[begin..end])
}

/// Display width of the given text.
fn get_width(text: &str) -> usize {
    unicode_width::UnicodeWidthStr::width(text)
}

#[cfg(test)]
mod tests {
    use super::locate;

    #[test]
    fn test_locate() {
        let source = "one\ntwo three\nfour";

        assert_eq!(locate(source, 0), (0, 0, "one"));
        assert_eq!(locate(source, 8), (1, 4, "two three"));
        assert_eq!(locate(source, source.len()), (2, 4, "four"));
    }
}

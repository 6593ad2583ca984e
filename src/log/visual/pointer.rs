use super::{
    super::{RESET, YELLOW},
    {get_width, locate, Visual},
};
use crate::region::Region;
use std::fmt::{Formatter, Result};

/// A type of `Visual` that points to a specific location within source text.
#[derive(Debug, PartialEq)]
pub struct Pointer {
    /// Zero indexed line number of the highlighted text.
    line: usize,
    /// Display width of the text on the line before the highlight.
    column: usize,
    /// Display width of the highlighted text, at least one column.
    length: usize,
    /// Text of the line holding the highlight.
    text: String,
}

impl Pointer {
    /// Create a new Visual over the given source text and Region.
    pub fn new(source: &str, region: Region) -> Self {
        let (line, column, text) = locate(source, region.begin);
        let highlighted = source.get(region.begin..region.end).unwrap_or("");

        Self {
            line,
            column,
            length: get_width(highlighted).max(1),
            text: text.to_string(),
        }
    }
}

impl Visual for Pointer {
    fn display(
        &self,
        formatter: &mut Formatter<'_>,
        template: Option<&str>,
        help: Option<&str>,
    ) -> Result {
        let number = (self.line + 1).to_string();
        let gutter = get_width(&number);
        let name = template.unwrap_or("?");
        let underline = "^".repeat(self.length);
        let align = self.column + self.length;

        writeln!(formatter)?;
        writeln!(
            formatter,
            " {:gutter$}--> {name}:{number}:{}",
            "",
            self.column + 1
        )?;
        writeln!(formatter, " {:gutter$} |", "")?;
        writeln!(formatter, " {number} | {}", self.text)?;
        writeln!(
            formatter,
            " {:gutter$} | {YELLOW}{underline:>align$}{RESET}",
            ""
        )?;
        writeln!(formatter, " {:gutter$} |", "")?;

        if let Some(help) = help {
            writeln!(formatter, "{:gutter$} = help: {help}", "")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Pointer;
    use crate::region::Region;

    #[test]
    fn test_pointer_position() {
        let source = "first line\n{% blok title %}";
        let pointer = Pointer::new(source, Region::new(14..18));

        assert_eq!(pointer.line, 1);
        assert_eq!(pointer.column, 3);
        assert_eq!(pointer.length, 4);
        assert_eq!(pointer.text, "{% blok title %}");
    }

    #[test]
    fn test_pointer_empty_region_is_visible() {
        let pointer = Pointer::new("hello", Region::new(2..2));

        assert_eq!(pointer.length, 1);
    }
}

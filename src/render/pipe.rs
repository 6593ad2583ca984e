use crate::log::{error_write, Error};
use serde_json::{Map, Value};
use std::fmt::{Arguments, Display, Result, Write};

/// Wraps some underlying buffer by providing methods that write to it
/// in different formats.
pub struct Pipe<'buffer> {
    buffer: &'buffer mut (dyn Write + 'buffer),
}

impl<'buffer> Pipe<'buffer> {
    /// Create a new [`Pipe`] that writes to the given buffer.
    pub fn new(buffer: &'buffer mut String) -> Self {
        Self { buffer }
    }

    /// Write the given [`Value`] to the [`Pipe`] buffer.
    ///
    /// The `Pipe` will handle formatting the value.
    ///
    /// # Errors
    ///
    /// The `Pipe` supports all `Value` types, so the only error that will
    /// be returned is propagated from the [`write!`] macro itself.
    pub fn write_value(&mut self, value: &Value) -> Result {
        match value {
            Value::Null => self.write_str("null"),
            Value::String(string) => self.write_str(string),
            Value::Array(array) => self.write_array(array),
            Value::Object(object) => self.write_object(object),
            _ => self.write_display(value),
        }
    }

    /// Write the value to the buffer using the Display implementation.
    fn write_display(&mut self, value: impl Display) -> Result {
        write!(self.buffer, "{}", value)
    }

    /// Write the value to the buffer as a comma separated list surrounded
    /// by square brackets.
    fn write_array(&mut self, value: &[Value]) -> Result {
        write!(self.buffer, "[")?;
        let mut iter = value.iter();
        if let Some(item) = iter.next() {
            self.write_value(item)?;
            for item in iter {
                write!(self.buffer, ", ")?;
                self.write_value(item)?;
            }
        }
        write!(self.buffer, "]")
    }

    /// Write the value to the buffer as key/value pairs surrounded by
    /// curly braces.
    fn write_object(&mut self, value: &Map<String, Value>) -> Result {
        write!(self.buffer, "{{")?;
        let mut iter = value.iter();
        if let Some((key, item)) = iter.next() {
            write!(self.buffer, "{}: ", key)?;
            self.write_value(item)?;
            for (key, item) in iter {
                write!(self.buffer, ", {}: ", key)?;
                self.write_value(item)?;
            }
        }
        write!(self.buffer, "}}")
    }
}

impl Write for Pipe<'_> {
    #[inline]
    fn write_str(&mut self, s: &str) -> Result {
        Write::write_str(self.buffer, s)
    }

    #[inline]
    fn write_char(&mut self, c: char) -> Result {
        Write::write_char(self.buffer, c)
    }

    #[inline]
    fn write_fmt(&mut self, args: Arguments<'_>) -> Result {
        Write::write_fmt(self.buffer, args)
    }
}

/// Return the given [`Value`] as text, formatted the same way [`Pipe`]
/// writes it.
pub fn stringify(value: &Value) -> std::result::Result<String, Error> {
    let mut text = String::new();
    Pipe::new(&mut text)
        .write_value(value)
        .map_err(|_| error_write())?;

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::stringify;
    use serde_json::json;

    #[test]
    fn test_stringify_scalar() {
        assert_eq!(stringify(&json!("taylor")).unwrap(), "taylor");
        assert_eq!(stringify(&json!(10)).unwrap(), "10");
        assert_eq!(stringify(&json!(true)).unwrap(), "true");
        assert_eq!(stringify(&json!(null)).unwrap(), "null");
    }

    #[test]
    fn test_stringify_collections() {
        assert_eq!(stringify(&json!(["a", 1])).unwrap(), "[a, 1]");
        assert_eq!(
            stringify(&json!({"one": 1, "two": [2]})).unwrap(),
            "{one: 1, two: [2]}"
        );
    }
}

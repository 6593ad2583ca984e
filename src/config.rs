use crate::log::{error_config, Error};
use serde_json::Value;
use std::{collections::HashMap, path::PathBuf};

/// The set of options recognized by an [`Engine`][`crate::Engine`].
///
/// A `Config` is resolved once, before any template is compiled, and is
/// read-only afterward. Every option has a default, so `Config::default()`
/// is always a valid starting point.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Delimiters surrounding an expression - `{{ name }}` by default.
    pub expression: (String, String),
    /// Delimiters surrounding a control block - `{% if .. %}` by default.
    pub control: (String, String),
    /// Delimiters surrounding a host-code block - `{< .. >}` by default.
    pub code: (String, String),
    /// Delimiters surrounding a comment - `{# .. #}` by default.
    pub comment: (String, String),
    /// When true, every rendered expression is passed through the built-in
    /// escape filter unless its filter chain already ends with it.
    pub autoescape: bool,
    /// When true, whitespace runs at the edges of raw text adjacent to a
    /// marker are collapsed to a single space.
    pub autospace: bool,
    /// When true, whitespace-only line prefixes before an opening control
    /// delimiter are removed.
    pub lstrip_blocks: bool,
    /// When true, the single newline directly after a closing control
    /// delimiter is removed.
    pub trim_blocks: bool,
    /// Base directory used to resolve relative template references found in
    /// `extends` statements, and the working directory for the default
    /// host-code executor.
    pub directory: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            expression: ("{{".into(), "}}".into()),
            control: ("{%".into(), "%}".into()),
            code: ("{<".into(), ">}".into()),
            comment: ("{#".into(), "#}".into()),
            autoescape: false,
            autospace: false,
            lstrip_blocks: false,
            trim_blocks: false,
            directory: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Create a new [`Config`] with default options.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new [`Config`] from the defaults overlaid with the given
    /// option map.
    ///
    /// Recognized keys are `expression`, `control`, `code` and `comment`
    /// (two-element string arrays), `autoescape`, `autospace`,
    /// `lstrip_blocks` and `trim_blocks` (booleans), and `directory`
    /// (string).
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the map contains an unrecognized key, or a
    /// recognized key with a value of the wrong shape.
    ///
    /// # Examples
    ///
    /// ```
    /// use quill::Config;
    /// use serde_json::json;
    /// use std::collections::HashMap;
    ///
    /// let mut options = HashMap::new();
    /// options.insert("autoescape".to_string(), json!(true));
    /// options.insert("expression".to_string(), json!(["((", "))"]));
    ///
    /// let config = Config::from_map(&options).unwrap();
    /// assert!(config.autoescape);
    /// assert_eq!(config.expression.0, "((");
    /// ```
    pub fn from_map(options: &HashMap<String, Value>) -> Result<Self, Error> {
        let mut config = Config::default();

        for (key, value) in options {
            match key.as_str() {
                "expression" => config.expression = as_pair(key, value)?,
                "control" => config.control = as_pair(key, value)?,
                "code" => config.code = as_pair(key, value)?,
                "comment" => config.comment = as_pair(key, value)?,
                "autoescape" => config.autoescape = as_bool(key, value)?,
                "autospace" => config.autospace = as_bool(key, value)?,
                "lstrip_blocks" => config.lstrip_blocks = as_bool(key, value)?,
                "trim_blocks" => config.trim_blocks = as_bool(key, value)?,
                "directory" => config.directory = PathBuf::from(as_str(key, value)?),
                _ => {
                    return Err(error_config(format!(
                        "option `{key}` is not recognized, expected one of `expression`, \
                        `control`, `code`, `comment`, `autoescape`, `autospace`, \
                        `lstrip_blocks`, `trim_blocks`, `directory`"
                    )))
                }
            }
        }

        Ok(config)
    }
}

/// Interpret the given value as a boolean.
fn as_bool(key: &str, value: &Value) -> Result<bool, Error> {
    value
        .as_bool()
        .ok_or_else(|| error_config(format!("option `{key}` expects a boolean value")))
}

/// Interpret the given value as a string.
fn as_str(key: &str, value: &Value) -> Result<String, Error> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| error_config(format!("option `{key}` expects a string value")))
}

/// Interpret the given value as a pair of non-empty delimiter strings.
fn as_pair(key: &str, value: &Value) -> Result<(String, String), Error> {
    let items = value
        .as_array()
        .filter(|array| array.len() == 2)
        .ok_or_else(|| {
            error_config(format!(
                "option `{key}` expects an array of two strings, such as `[\"((\", \"))\"]`"
            ))
        })?;

    match (items[0].as_str(), items[1].as_str()) {
        (Some(begin), Some(end)) if !begin.is_empty() && !end.is_empty() => {
            Ok((begin.to_owned(), end.to_owned()))
        }
        _ => Err(error_config(format!(
            "option `{key}` expects two non-empty delimiter strings"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::Config;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.expression.0, "{{");
        assert_eq!(config.control.1, "%}");
        assert_eq!(config.code.0, "{<");
        assert_eq!(config.comment.1, "#}");
        assert!(!config.autoescape);
        assert!(!config.trim_blocks);
    }

    #[test]
    fn test_from_map() {
        let mut options = HashMap::new();
        options.insert("control".to_string(), json!(["<%", "%>"]));
        options.insert("trim_blocks".to_string(), json!(true));
        options.insert("directory".to_string(), json!("templates"));

        let config = Config::from_map(&options).unwrap();
        assert_eq!(config.control, ("<%".to_string(), "%>".to_string()));
        assert!(config.trim_blocks);
        assert_eq!(config.directory.to_str().unwrap(), "templates");
    }

    #[test]
    fn test_unknown_key() {
        let mut options = HashMap::new();
        options.insert("autoscape".to_string(), json!(true));

        assert!(Config::from_map(&options).is_err());
    }

    #[test]
    fn test_bad_shape() {
        let mut options = HashMap::new();
        options.insert("expression".to_string(), json!("{{"));
        assert!(Config::from_map(&options).is_err());

        let mut options = HashMap::new();
        options.insert("expression".to_string(), json!(["{{", ""]));
        assert!(Config::from_map(&options).is_err());

        let mut options = HashMap::new();
        options.insert("autoescape".to_string(), json!("yes"));
        assert!(Config::from_map(&options).is_err());
    }
}

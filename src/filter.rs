//! Contains the [`Filter`] trait and the [`Registry`] that stores filters.
//!
//! A `Filter` is a unary text transform that can be applied to the rendered
//! value of an expression with the `|>` operator. Any struct implementing the
//! [`Filter`] trait, or function matching the [`apply`][`Filter::apply`]
//! method, can be registered on an [`Engine`][`crate::Engine`], and becomes
//! available in every template rendered by that engine.
//!
//! Given this expression:
//!
//! ```html
//! {{ name |> upper |> escape }}
//! ```
//!
//! The "name" value is looked up in the [`Store`][`crate::Store`],
//! stringified, and piped through `upper` and then `escape`, left to right.
//!
//! ## Examples
//!
//! We'll create a filter exposing the
//! [`trim`](https://doc.rust-lang.org/std/primitive.str.html#method.trim)
//! function from the standard library. A plain function matching the trait
//! signature is enough:
//!
//! ```
//! use quill::{filter::Error, Store};
//!
//! fn trim(input: &str) -> Result<String, Error> {
//!     Ok(input.trim().to_owned())
//! }
//!
//! let engine = quill::default().with_filter_must("trim", trim);
//! let template = engine.compile("{{ name |> trim }}!").unwrap();
//! let result = engine.render(&template, &Store::new().with_must("name", "  taylor  "));
//!
//! assert_eq!(result.unwrap(), "taylor!");
//! ```
//!
//! ## Built-in filters
//!
//! Every [`Registry`] is seeded with `escape` (aliased as `e`), `upper` and
//! `lower`. Built-ins may be shadowed by registering another filter under the
//! same name, but they cannot be removed, and the autoescape rule recognizes
//! the built-in escape filter by identity rather than by name: a user filter
//! registered as `"escape"` does not suppress autoescaping.

pub mod serde {
    //! Contains types from `serde_json`.
    pub use serde_json::*;
}
pub mod visual {
    //! Contains the `Visual` trait and types that implement `Visual`.
    pub use crate::log::{Pointer, Visual};
}

pub use crate::{log::Error, region::Region};

use std::{collections::HashMap, sync::Arc};

/// Describes a type that can be used to transform the rendered text of an
/// expression.
pub trait Filter: Sync + Send {
    /// Apply the [`Filter`] to the given input text and return the
    /// transformed text.
    ///
    /// # Errors
    ///
    /// May return an [`Error`] to abort template rendering.
    fn apply(&self, input: &str) -> Result<String, Error>;
}

/// Allows any function with a matching signature to be registered as a
/// [`Filter`].
impl<F> Filter for F
where
    F: Fn(&str) -> Result<String, Error> + Sync + Send,
{
    fn apply(&self, input: &str) -> Result<String, Error> {
        self(input)
    }
}

/// Provides storage for [`Filter`] instances, indexed by case-sensitive name.
pub struct Registry {
    /// Registered filters. The most recent registration under a name wins.
    filters: HashMap<String, Arc<dyn Filter>>,
    /// The built-in escape filter, held separately so it stays reachable and
    /// identifiable even when the `escape` name is shadowed.
    escape: Arc<dyn Filter>,
}

impl Registry {
    /// Create a new [`Registry`] seeded with the built-in filters.
    pub fn new() -> Self {
        let escape: Arc<dyn Filter> = Arc::new(escape as fn(&str) -> Result<String, Error>);

        let mut filters: HashMap<String, Arc<dyn Filter>> = HashMap::new();
        filters.insert("escape".to_string(), Arc::clone(&escape));
        filters.insert("e".to_string(), Arc::clone(&escape));
        filters.insert(
            "upper".to_string(),
            Arc::new(upper as fn(&str) -> Result<String, Error>),
        );
        filters.insert(
            "lower".to_string(),
            Arc::new(lower as fn(&str) -> Result<String, Error>),
        );

        Self { filters, escape }
    }

    /// Insert the [`Filter`] under the given name.
    ///
    /// Any existing filter under that name, built-in or not, is shadowed.
    pub fn insert<T>(&mut self, name: &str, filter: T)
    where
        T: Filter + 'static,
    {
        self.filters.insert(name.to_string(), Arc::new(filter));
    }

    /// Return the [`Filter`] with the given name, if one is registered.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Filter>> {
        self.filters.get(name).map(Arc::clone)
    }

    /// Return true if a [`Filter`] with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Return the built-in escape filter.
    pub fn escape(&self) -> Arc<dyn Filter> {
        Arc::clone(&self.escape)
    }

    /// Return true if the given [`Filter`] is identically the built-in
    /// escape filter.
    ///
    /// Identity, not name, drives the autoescape suppression rule.
    pub fn is_escape(&self, filter: &Arc<dyn Filter>) -> bool {
        Arc::ptr_eq(filter, &self.escape)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// HTML-escape the characters `&`, `<`, `>`, `"` and `'`.
fn escape(input: &str) -> Result<String, Error> {
    let mut output = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#x27;"),
            c => output.push(c),
        }
    }

    Ok(output)
}

/// Uppercase the input.
fn upper(input: &str) -> Result<String, Error> {
    Ok(input.to_uppercase())
}

/// Lowercase the input.
fn lower(input: &str) -> Result<String, Error> {
    Ok(input.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::{Error, Registry};

    #[test]
    fn test_builtin_names() {
        let registry = Registry::new();

        assert!(registry.contains("escape"));
        assert!(registry.contains("e"));
        assert!(registry.contains("upper"));
        assert!(registry.contains("lower"));
        assert!(!registry.contains("ghost"));
    }

    #[test]
    fn test_escape() {
        let registry = Registry::new();
        let escape = registry.get("escape").unwrap();

        assert_eq!(
            escape.apply("<a href=\"x\">&'</a>").unwrap(),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_alias_identity() {
        let registry = Registry::new();
        let escape = registry.get("escape").unwrap();
        let alias = registry.get("e").unwrap();

        assert!(registry.is_escape(&escape));
        assert!(registry.is_escape(&alias));
    }

    #[test]
    fn test_shadowed_escape_is_not_builtin() {
        let mut registry = Registry::new();
        registry.insert("escape", |input: &str| -> Result<String, Error> {
            Ok(input.to_owned())
        });

        let shadowed = registry.get("escape").unwrap();
        assert!(!registry.is_escape(&shadowed));
        // The true built-in stays reachable.
        assert!(registry.is_escape(&registry.escape()));
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = Registry::new();
        registry.insert("case", |input: &str| -> Result<String, Error> {
            Ok(input.to_uppercase())
        });
        registry.insert("case", |input: &str| -> Result<String, Error> {
            Ok(input.to_lowercase())
        });

        assert_eq!(registry.get("case").unwrap().apply("Taylor").unwrap(), "taylor");
    }
}

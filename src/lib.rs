//! A small template engine with inheritance, filters, and host-code blocks.
//!
//! Four kinds of markers may appear in a template:
//!
//! ```text
//! Expressions: {{ name |> upper }}
//! Control: {% if logged_in %} ... {% endif %}
//! Host code: {< date -u >}
//! Comments: {# not rendered #}
//! ```
//!
//! # Usage
//!
//! Compile a template and render it against a [`Store`]:
//!
//! ```
//! use quill::{compile, render, Store};
//!
//! let template = compile("hello, {{ name }}!").unwrap();
//! let output = render(&template, &Store::new().with_must("name", "taylor"));
//!
//! assert_eq!(output.unwrap(), "hello, taylor!");
//! ```
//!
//! Create an [`Engine`] instead when you want custom delimiters or options,
//! your own filters, named templates, or a different host-code executor:
//!
//! ```
//! use quill::{Config, Engine, Store};
//!
//! let mut config = Config::new();
//! config.autoescape = true;
//!
//! let engine = Engine::new(config);
//! let template = engine.compile_must("{{ body }}");
//! let result = engine.render(&template, &Store::new().with_must("body", "<b>hi</b>"));
//!
//! assert_eq!(result.unwrap(), "&lt;b&gt;hi&lt;/b&gt;");
//! ```
//!
//! # Inheritance
//!
//! A template that begins with `{% extends "name" %}` takes its structure
//! from the named parent, and overrides the named blocks it redefines.
//! Inside an overriding block, `{{ super() }}` splices in the body being
//! overridden:
//!
//! ```
//! use quill::{Engine, Store};
//!
//! let mut engine = Engine::default();
//! engine
//!     .add_template("base", "<title>{% block title %}home{% endblock %}</title>")
//!     .unwrap();
//! engine
//!     .add_template(
//!         "child",
//!         "{% extends \"base\" %}{% block title %}{{ super() }} - news{% endblock %}",
//!     )
//!     .unwrap();
//!
//! let result = engine.render_named("child", &Store::new());
//! assert_eq!(result.unwrap(), "<title>home - news</title>");
//! ```
//!
//! # Host code
//!
//! Text inside `{< .. >}` is not template grammar. It is handed to the
//! engine's [`CodeExecutor`] during rendering, together with the bindings in
//! scope, and the returned text is spliced into the output. The default
//! executor pipes the fragment through `sh`. See the [`exec`] module for
//! details and for running something else.
mod compile;
mod config;
mod engine;
mod log;
mod region;
mod render;
mod store;

pub mod exec;
pub mod filter;

pub use compile::{compile, Builder, Marker, Parser, Scope, Template};
pub use config::Config;
pub use engine::Engine;
pub use exec::{CodeExecutor, ShellExecutor};
pub use log::{Error, ErrorKind, Pointer, Visual};
pub use region::Region;
pub use render::{render, Renderer};
pub use store::Store;

/// Create a new [`Engine`] with default options.
///
/// # Examples
///
/// ```
/// use quill::Store;
///
/// let engine = quill::default();
/// let template = engine.compile_must("hello, {{ name }}!");
/// let result = engine.render(&template, &Store::new().with_must("name", "taylor"));
///
/// assert_eq!(result.unwrap(), "hello, taylor!");
/// ```
#[inline]
pub fn default() -> Engine {
    Engine::default()
}

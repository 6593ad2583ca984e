use super::{Pointer, RED, RESET};
use crate::{log::Visual, region::Region};
use std::fmt::{Debug, Display, Formatter, Result};

/// Classifies an [`Error`] by the phase and cause that produced it.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ErrorKind {
    /// The template source is malformed and could not be compiled.
    Parse,
    /// A configuration option is unrecognized or has the wrong shape.
    Config,
    /// Rendering failed for a general reason, such as an incompatible
    /// comparison or an unresolvable `super()`.
    Render,
    /// An expression referenced a name that has no binding.
    UndefinedVariable,
    /// An expression used a filter that is not registered.
    FilterNotFound,
    /// A host-code fragment failed to execute.
    HostCode,
}

/// Describes an error, and allows adding contextual help text and a
/// visualization.
///
/// # Examples
///
/// Creating an [`Error`] that includes a [`Visual`] of type [`Pointer`]:
///
/// ```
/// use quill::filter::{Error, Region};
///
/// Error::build("unexpected keyword")
///     .with_pointer("{% repeat name %}", Region::new(3..9))
///     .with_name("template.txt")
///     .with_help(r#"expected one of "if", "for", "block""#);
/// ```
///
/// When printed with `println!("{:#}", error)` the [`Error`] produces this
/// output:
///
/// ```text
/// error: unexpected keyword
///   --> template.txt:1:4
///    |
///  1 | {% repeat name %}
///    |    ^^^^^^
///    |
///   = help: expected one of "if", "for", "block"
/// ```
pub struct Error {
    /// The category of the [`Error`].
    kind: ErrorKind,
    /// Describes the cause of the [`Error`].
    reason: String,
    /// A visualization to help illustrate the [`Error`].
    visual: Option<Box<dyn Visual>>,
    /// Additional information to display with the [`Error`].
    help: Option<String>,
    /// The name of the Template that the [`Error`] comes from.
    name: Option<String>,
}

impl Error {
    /// Create a new [`Error`] of kind [`ErrorKind::Parse`] with the given
    /// reason text.
    ///
    /// The additional fields may be populated using the various methods
    /// defined on `Error`.
    ///
    /// # Examples
    ///
    /// ```
    /// use quill::filter::Error;
    ///
    /// Error::build("unexpected keyword")
    ///     .with_help("expected `if`, `for` or `block`, found `...`");
    /// ```
    pub fn build<T>(reason: T) -> Self
    where
        T: Into<String>,
    {
        Error {
            kind: ErrorKind::Parse,
            reason: reason.into(),
            name: None,
            visual: None,
            help: None,
        }
    }

    /// Create a new [`Error`] of kind [`ErrorKind::Render`] with the given
    /// reason text.
    pub fn render<T>(reason: T) -> Self
    where
        T: Into<String>,
    {
        Self::build(reason).with_kind(ErrorKind::Render)
    }

    /// Set the [`ErrorKind`], which classifies the [`Error`].
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;

        self
    }

    /// Set the reason text, which is a short summary of the [`Error`].
    pub fn with_reason<T>(mut self, text: T) -> Self
    where
        T: Into<String>,
    {
        self.reason = text.into();

        self
    }

    /// Set the name text, which is the name of the template that the
    /// [`Error`] is related to.
    pub fn with_name<T>(mut self, text: T) -> Self
    where
        T: Into<String>,
    {
        self.name = Some(text.into());

        self
    }

    /// Set the [`Visual`], which is a visualization that helps illustrate the
    /// cause of the error.
    pub fn with_visual(mut self, visual: impl Visual + 'static) -> Self {
        self.visual = Some(Box::new(visual));

        self
    }

    /// Set the visualization to a new [`Pointer`] with the given source text
    /// and [`Region`].
    ///
    /// This is a shortcut for creating a `Pointer` yourself and passing it to
    /// [`with_visual`][`Error::with_visual`].
    pub fn with_pointer<T>(mut self, source: &str, region: T) -> Self
    where
        T: Into<Region>,
    {
        self.visual = Some(Box::new(Pointer::new(source, region.into())));

        self
    }

    /// Set the help text, which is contextual information to accompany the
    /// reason text.
    pub fn with_help<T>(mut self, text: T) -> Self
    where
        T: Into<String>,
    {
        self.help = Some(text.into());

        self
    }

    /// Return the [`ErrorKind`] of the error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Return true if the error was produced while rendering, as opposed to
    /// compiling a template or building a configuration.
    pub fn is_render(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Render
                | ErrorKind::UndefinedVariable
                | ErrorKind::FilterNotFound
                | ErrorKind::HostCode
        )
    }

    /// Return the name of the template that the error is related to.
    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if !f.alternate() {
            writeln!(f, "{self:#}")?;
        }
        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("reason", &self.reason)
            .field("name", &self.name)
            .field("visual", &self.visual)
            .field("help", &self.help)
            .finish()?;

        Ok(())
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let header = format!("{RED}error{RESET}");
        write!(f, "{header}: {}", self.reason)?;

        if let (Some(visual), true) = (self.visual.as_ref(), f.alternate()) {
            return visual.display(f, self.name.as_deref(), self.help.as_deref());
        }

        Ok(())
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.reason == other.reason
            && self.help == other.help
            && self.name == other.name
    }
}

use crate::config::Config;
use morel::Syntax;

/// Markers that identify expressions, control blocks, host-code blocks and
/// comments within text.
pub enum Marker {
    /// Beginning of an expression, which outputs content and may pass the
    /// value through filters.
    BeginExpression = 0,
    /// End of an expression.
    EndExpression = 1,
    /// Beginning of a control block, which allows for logical constructs
    /// such as "if", "for" and "block".
    BeginControl = 2,
    /// End of a control block.
    EndControl = 3,
    /// Beginning of a host-code block.
    BeginCode = 4,
    /// End of a host-code block.
    EndCode = 5,
    /// Beginning of a comment.
    BeginComment = 6,
    /// End of a comment.
    EndComment = 7,
}

impl From<usize> for Marker {
    fn from(value: usize) -> Self {
        match value {
            0 => Self::BeginExpression,
            1 => Self::EndExpression,
            2 => Self::BeginControl,
            3 => Self::EndControl,
            4 => Self::BeginCode,
            5 => Self::EndCode,
            6 => Self::BeginComment,
            7 => Self::EndComment,
            _ => unreachable!(),
        }
    }
}

impl From<Marker> for usize {
    fn from(k: Marker) -> Self {
        k as usize
    }
}

/// Provides methods to build a `Syntax`.
///
/// # Example
///
/// ```
/// use quill::Builder;
///
/// let syntax = Builder::new()
///     .with_expression("((", "))")
///     .with_control("(*", "*)")
///     .to_syntax();
/// ```
pub struct Builder<'marker> {
    expression: (&'marker str, &'marker str),
    control: (&'marker str, &'marker str),
    code: (&'marker str, &'marker str),
    comment: (&'marker str, &'marker str),
}

impl<'marker> Builder<'marker> {
    /// Create a new [`Builder`].
    ///
    /// The `Builder` has default markers:
    ///
    /// ```text
    /// Expressions: {{ name }}
    /// Control: {% if ... %}
    /// Host code: {< ... >}
    /// Comments: {# ... #}
    /// ```
    ///
    /// To proceed with these defaults, you may immediately call `to_syntax`
    /// to receive the `Syntax` instance.
    #[inline]
    pub fn new() -> Self {
        Self {
            expression: ("{{", "}}"),
            control: ("{%", "%}"),
            code: ("{<", ">}"),
            comment: ("{#", "#}"),
        }
    }

    /// Set the expression markers.
    #[inline]
    pub fn with_expression(mut self, begin: &'marker str, end: &'marker str) -> Self {
        self.expression = (begin, end);

        self
    }

    /// Set the control markers.
    #[inline]
    pub fn with_control(mut self, begin: &'marker str, end: &'marker str) -> Self {
        self.control = (begin, end);

        self
    }

    /// Set the host-code markers.
    #[inline]
    pub fn with_code(mut self, begin: &'marker str, end: &'marker str) -> Self {
        self.code = (begin, end);

        self
    }

    /// Set the comment markers.
    #[inline]
    pub fn with_comment(mut self, begin: &'marker str, end: &'marker str) -> Self {
        self.comment = (begin, end);

        self
    }

    /// Return a Syntax instance from the markers in this [`Builder`].
    pub fn to_syntax(self) -> Syntax {
        let mut markers = Vec::new();
        let (begin_expression, end_expression) = self.expression;
        let (begin_control, end_control) = self.control;
        let (begin_code, end_code) = self.code;
        let (begin_comment, end_comment) = self.comment;

        markers.push((Marker::BeginExpression.into(), begin_expression.into()));
        markers.push((Marker::EndExpression.into(), end_expression.into()));
        markers.push((Marker::BeginControl.into(), begin_control.into()));
        markers.push((Marker::EndControl.into(), end_control.into()));
        markers.push((Marker::BeginCode.into(), begin_code.into()));
        markers.push((Marker::EndCode.into(), end_code.into()));
        markers.push((Marker::BeginComment.into(), begin_comment.into()));
        markers.push((Marker::EndComment.into(), end_comment.into()));

        Syntax::new(markers)
    }
}

impl<'marker> From<&'marker Config> for Builder<'marker> {
    /// Create a [`Builder`] carrying the delimiters of the given [`Config`].
    fn from(config: &'marker Config) -> Self {
        Builder::new()
            .with_expression(&config.expression.0, &config.expression.1)
            .with_control(&config.control.0, &config.control.1)
            .with_code(&config.code.0, &config.code.1)
            .with_comment(&config.comment.0, &config.comment.1)
    }
}

impl Default for Builder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

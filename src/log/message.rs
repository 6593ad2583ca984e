use super::{Error, ErrorKind};
use std::fmt::Display;

pub const UNEXPECTED_TOKEN: &str = "unexpected token";
pub const UNEXPECTED_KEYWORD: &str = "unexpected keyword";
pub const UNEXPECTED_EOF: &str = "unexpected eof";
pub const INVALID_SYNTAX: &str = "invalid syntax";
pub const INVALID_FILTER: &str = "invalid filter";
pub const INVALID_CONFIG: &str = "invalid configuration";
pub const INCOMPATIBLE_TYPES: &str = "incompatible types";
pub const UNDEFINED_VARIABLE: &str = "undefined variable";
pub const HOST_CODE_FAILURE: &str = "host code failure";

/// Return an [`Error`] explaining that the end of source was not expected.
pub fn error_eof(source: &str) -> Error {
    let source_len = source.len();
    Error::build(UNEXPECTED_EOF)
        .with_pointer(source, source_len..source_len)
        .with_help("expected additional tokens, did you close all blocks and expressions?")
}

/// Return an [`Error`] explaining that the write operation failed.
///
/// This is likely caused by a failure during a `write!` macro operation.
pub fn error_write() -> Error {
    Error::render("write failure")
        .with_help("failed to write result of render, are you low on memory?")
}

/// Return an [`Error`] describing a missing template.
pub fn error_missing_template(name: &str) -> Error {
    Error::render("missing template").with_help(format!(
        "template `{}` not found in engine, add it with `.add_template`",
        name
    ))
}

/// Return an [`Error`] describing an unrecognized configuration option.
pub fn error_config<T>(help: T) -> Error
where
    T: Into<String>,
{
    Error::build(INVALID_CONFIG)
        .with_kind(ErrorKind::Config)
        .with_help(help)
}

/// Return an [`Error`] describing an expression that references a name with
/// no binding.
pub fn error_undefined_variable(name: &str) -> Error {
    Error::build(UNDEFINED_VARIABLE)
        .with_kind(ErrorKind::UndefinedVariable)
        .with_help(format!(
            "the template references `{name}`, but no value with that name exists in the store"
        ))
}

/// Return an [`Error`] describing an expression that uses an unregistered
/// filter.
pub fn error_missing_filter(name: &str) -> Error {
    Error::build(INVALID_FILTER)
        .with_kind(ErrorKind::FilterNotFound)
        .with_help(format!(
            "template wants to use the `{name}` filter, but a filter with that name \
            was not found in this engine, did you add the filter to the engine with \
            `.add_filter` or `.add_filter_must`?"
        ))
}

/// Return an [`Error`] describing a host-code fragment that failed to execute.
pub fn error_host_code<T>(help: T) -> Error
where
    T: Into<String>,
{
    Error::build(HOST_CODE_FAILURE)
        .with_kind(ErrorKind::HostCode)
        .with_help(help)
}

/// Return a string describing an unexpected operator.
pub fn expected_operator<T>(received: T) -> String
where
    T: Display,
{
    format!(
        "expected operator like `==`, `!=`, `>`, `<`, `>=`, `<=`, found `{}`",
        received
    )
}

/// Return a string describing an unexpected keyword.
pub fn expected_keyword<T>(received: T) -> String
where
    T: Display,
{
    format!(
        "expected keyword like `if`, `for`, `block` or `extends`, found `{}`",
        received
    )
}

//! Contains the [`CodeExecutor`] trait and the default [`ShellExecutor`].
//!
//! A host-code block such as `{< date -u >}` contains a fragment of code
//! that is not part of the template grammar. During rendering, the engine
//! hands the fragment to its `CodeExecutor` together with the bindings in
//! scope, and splices the returned text into the output.
//!
//! The engine is agnostic about how the code runs. The default
//! [`ShellExecutor`] pipes the fragment through a shell, but a closure
//! matching the [`execute`][`CodeExecutor::execute`] signature works too,
//! which keeps tests hermetic:
//!
//! ```
//! use quill::{filter::serde::Value, Error, Store};
//! use std::collections::HashMap;
//!
//! let engine = quill::default().with_executor(
//!     |code: &str, _: &HashMap<String, Value>| -> Result<String, Error> {
//!         Ok(code.trim().to_uppercase())
//!     },
//! );
//!
//! let template = engine.compile("a {< bc >} d").unwrap();
//! assert_eq!(engine.render(&template, &Store::new()).unwrap(), "a BC d");
//! ```

use crate::log::{error_host_code, Error};
use serde_json::Value;
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    process::Command,
};

/// Describes a type that can execute a host-code fragment and return its
/// textual result.
pub trait CodeExecutor: Sync + Send {
    /// Execute the code fragment with the given bindings and return the text
    /// to splice into the rendered output.
    ///
    /// Execution is synchronous; the render call blocks until it returns.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when execution fails. The error aborts the whole
    /// render call, so no partial output escapes.
    fn execute(&self, code: &str, bindings: &HashMap<String, Value>) -> Result<String, Error>;
}

/// Allows any function with a matching signature to be used as a
/// [`CodeExecutor`].
impl<F> CodeExecutor for F
where
    F: Fn(&str, &HashMap<String, Value>) -> Result<String, Error> + Sync + Send,
{
    fn execute(&self, code: &str, bindings: &HashMap<String, Value>) -> Result<String, Error> {
        self(code, bindings)
    }
}

/// Executes host-code fragments by piping them through a shell.
///
/// Bindings are exported to the child process as environment variables, with
/// non-string values serialized as JSON. Standard output becomes the spliced
/// text, with one trailing newline removed. A non-zero exit status is
/// reported as a host-code error carrying the standard error text.
pub struct ShellExecutor {
    /// The shell binary to invoke with `-c`.
    shell: String,
    /// Working directory for the child process.
    directory: PathBuf,
}

impl ShellExecutor {
    /// Create a new [`ShellExecutor`] that runs `sh` in the given directory.
    pub fn new<T>(directory: T) -> Self
    where
        T: AsRef<Path>,
    {
        Self {
            shell: "sh".to_string(),
            directory: directory.as_ref().to_path_buf(),
        }
    }

    /// Set the shell binary.
    ///
    /// Returns the [`ShellExecutor`], so additional methods may be chained.
    pub fn with_shell<T>(mut self, shell: T) -> Self
    where
        T: Into<String>,
    {
        self.shell = shell.into();
        self
    }
}

impl CodeExecutor for ShellExecutor {
    fn execute(&self, code: &str, bindings: &HashMap<String, Value>) -> Result<String, Error> {
        let mut command = Command::new(&self.shell);
        command.arg("-c").arg(code).current_dir(&self.directory);
        for (key, value) in bindings {
            command.env(key, env_text(value));
        }

        let output = command.output().map_err(|err| {
            error_host_code(format!("unable to spawn `{}`: {err}", self.shell))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(error_host_code(format!(
                "host code exited with {}: {}",
                output.status,
                stderr.trim_end()
            )));
        }

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        if text.ends_with('\n') {
            text.pop();
            if text.ends_with('\r') {
                text.pop();
            }
        }

        Ok(text)
    }
}

/// Return the environment-variable representation of the given value.
///
/// Strings are passed through unquoted, everything else is JSON.
fn env_text(value: &Value) -> String {
    match value {
        Value::String(string) => string.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{CodeExecutor, ShellExecutor};
    use crate::log::ErrorKind;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_stdout_captured() {
        let executor = ShellExecutor::new(".");
        let result = executor.execute("printf 'hello'", &HashMap::new());

        assert_eq!(result.unwrap(), "hello");
    }

    #[test]
    fn test_trailing_newline_stripped() {
        let executor = ShellExecutor::new(".");
        let result = executor.execute("echo hello", &HashMap::new());

        assert_eq!(result.unwrap(), "hello");
    }

    #[test]
    fn test_bindings_exported() {
        let executor = ShellExecutor::new(".");
        let mut bindings = HashMap::new();
        bindings.insert("name".to_string(), json!("taylor"));
        let result = executor.execute("printf '%s' \"$name\"", &bindings);

        assert_eq!(result.unwrap(), "taylor");
    }

    #[test]
    fn test_nonzero_exit() {
        let executor = ShellExecutor::new(".");
        let result = executor.execute("exit 3", &HashMap::new());

        assert!(result.is_err_and(|err| err.kind() == ErrorKind::HostCode));
    }
}

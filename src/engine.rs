use crate::{
    compile::{tree::Tree, Builder, Parser, Scope, Template},
    config::Config,
    exec::{CodeExecutor, ShellExecutor},
    filter::{Filter, Registry},
    log::{error_missing_template, Error, INVALID_FILTER, INVALID_SYNTAX},
    render::Renderer,
    Store,
};
use morel::Finder;
use std::{collections::HashMap, fs, sync::Arc};

/// Facilitates compiling and rendering templates, and provides storage
/// for filters and named templates.
///
/// The [`Config`] given at construction decides the delimiters and the
/// whitespace and escaping behavior of every template the engine touches.
pub struct Engine {
    /// Options in effect for every template.
    config: Config,
    /// Compiled marker search, built from the delimiters in the config.
    finder: Finder,
    /// Filters that this engine is aware of.
    filters: Registry,
    /// Templates that this engine is aware of.
    templates: HashMap<String, Template>,
    /// Executor handling host-code blocks.
    executor: Box<dyn CodeExecutor>,
}

impl Engine {
    /// Create a new instance of [`Engine`] with the given [`Config`].
    ///
    /// # Examples
    ///
    /// ```
    /// use quill::{Config, Engine};
    ///
    /// let mut config = Config::new();
    /// config.expression = ("((".into(), "))".into());
    ///
    /// let engine = Engine::new(config);
    /// let template = engine.compile("hello, (( name ))!");
    /// assert!(template.is_ok());
    /// ```
    pub fn new(config: Config) -> Self {
        let finder = Finder::new(Builder::from(&config).to_syntax());
        let executor = Box::new(ShellExecutor::new(config.directory.clone()));

        Self {
            config,
            finder,
            filters: Registry::new(),
            templates: HashMap::new(),
            executor,
        }
    }

    /// Compile a new [`Template`].
    ///
    /// When the text begins with an `extends` tag, the whole inheritance
    /// chain is resolved now, against the registered templates first and the
    /// configured directory second.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when compilation fails, which most likely means
    /// the source contains invalid syntax, or a parent template cannot be
    /// found.
    ///
    /// # Examples
    ///
    /// ```
    /// use quill::Engine;
    ///
    /// let engine = Engine::default();
    /// let template = engine.compile("hello, {{ name }}!");
    /// assert!(template.is_ok());
    /// ```
    pub fn compile(&self, text: &str) -> Result<Template, Error> {
        let mut template = Parser::new(text, &self.finder, &self.config).compile(None)?;
        self.link(&mut template)?;

        Ok(template)
    }

    /// Compile a new [`Template`].
    ///
    /// # Panics
    ///
    /// Panics when compilation fails, which most likely means the source
    /// contains invalid syntax.
    ///
    /// # Examples
    ///
    /// ```
    /// use quill::Engine;
    ///
    /// let engine = Engine::default();
    /// let template = engine.compile_must("hello, {{ name }}!");
    /// ```
    #[inline]
    pub fn compile_must(&self, text: &str) -> Template {
        self.compile(text).unwrap()
    }

    /// Render a [`Template`] with the given [`Store`].
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if rendering fails, which may happen when a
    /// [`Filter`] returns an `Error` itself, a variable has no binding, or a
    /// host-code block fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use quill::{Engine, Store};
    ///
    /// let engine = Engine::default();
    /// let template = engine.compile_must("hello, {{ name }}!");
    /// let result = engine.render(&template, &Store::new().with_must("name", "taylor"));
    ///
    /// assert_eq!(result.unwrap(), "hello, taylor!")
    /// ```
    #[inline]
    pub fn render(&self, template: &Template, store: &Store) -> Result<String, Error> {
        Renderer::new(self, template, store).render()
    }

    /// Render the [`Template`] registered under the given name.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when no template with that name is registered,
    /// or rendering it fails.
    pub fn render_named(&self, name: &str, store: &Store) -> Result<String, Error> {
        match self.get_template(name) {
            Some(template) => self.render(template, store),
            None => Err(error_missing_template(name)),
        }
    }

    /// Compile and store a new [`Template`] with the given name.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when a `Template` with the given name already
    /// exists, or when compilation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use quill::Engine;
    ///
    /// let mut engine = Engine::default();
    /// let result = engine.add_template("template_name", "hello, {{ name }}!");
    /// assert!(result.is_ok());
    ///
    /// let second = engine.add_template("template_name", "hello again");
    /// assert!(second.is_err());
    /// ```
    pub fn add_template(&mut self, name: &str, text: &str) -> Result<(), Error> {
        if self.templates.contains_key(name) {
            return Err(Error::build(format!(
                "template with name `{name}` already exists in engine, \
                overwrite it with `.add_template_must`"
            )));
        }

        self.add_template_must(name, text)
    }

    /// Compile and store a new [`Template`] with the given name.
    ///
    /// If a `Template` with the given name already exists in the [`Engine`],
    /// it is overwritten.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when compilation fails.
    pub fn add_template_must(&mut self, name: &str, text: &str) -> Result<(), Error> {
        let mut template = Parser::new(text, &self.finder, &self.config)
            .compile(Some(name))
            .map_err(|err| err.with_name(name))?;
        self.link(&mut template)?;

        self.templates.insert(name.to_owned(), template);

        Ok(())
    }

    /// Return the named [`Template`].
    ///
    /// # Examples
    ///
    /// ```
    /// use quill::Engine;
    ///
    /// let mut engine = Engine::default();
    /// engine.add_template_must("template_name", "hello, {{ name }}!").unwrap();
    ///
    /// let template = engine.get_template("template_name");
    /// assert!(template.is_some());
    /// ```
    pub fn get_template(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    /// Add a [`Filter`].
    ///
    /// # Errors
    ///
    /// If a `Filter` with the given name already exists in the engine, an
    /// [`Error`] is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use quill::{filter::Error, Engine};
    ///
    /// fn reverse(input: &str) -> Result<String, Error> {
    ///     Ok(input.chars().rev().collect())
    /// }
    ///
    /// let mut engine = Engine::default();
    /// let result = engine.add_filter("reverse", reverse);
    ///
    /// assert!(result.is_ok());
    /// ```
    pub fn add_filter<T>(&mut self, name: &str, filter: T) -> Result<(), Error>
    where
        T: Filter + 'static,
    {
        if self.filters.contains(name) {
            return Err(Error::build(INVALID_FILTER).with_help(format!(
                "filter with name `{name}` already exists in engine, \
                overwrite it with `.add_filter_must`"
            )));
        }
        self.filters.insert(name, filter);

        Ok(())
    }

    /// Add a [`Filter`].
    ///
    /// If a `Filter` with the given name already exists in the [`Engine`],
    /// it is overwritten.
    #[inline]
    pub fn add_filter_must<T>(&mut self, name: &str, filter: T)
    where
        T: Filter + 'static,
    {
        self.filters.insert(name, filter);
    }

    /// Add a [`Filter`].
    ///
    /// Returns the [`Engine`], so additional methods may be chained.
    ///
    /// # Errors
    ///
    /// If a `Filter` with the given name already exists in the engine, an
    /// [`Error`] is returned.
    #[inline]
    pub fn with_filter<T>(mut self, name: &str, filter: T) -> Result<Self, Error>
    where
        T: Filter + 'static,
    {
        self.add_filter(name, filter)?;

        Ok(self)
    }

    /// Add a [`Filter`].
    ///
    /// Returns the [`Engine`], so additional methods may be chained.
    ///
    /// If a `Filter` with the given name already exists in the engine, it is
    /// overwritten.
    ///
    /// # Examples
    ///
    /// ```
    /// use quill::{filter::Error, Engine, Store};
    ///
    /// fn reverse(input: &str) -> Result<String, Error> {
    ///     Ok(input.chars().rev().collect())
    /// }
    ///
    /// let engine = Engine::default().with_filter_must("reverse", reverse);
    /// let template = engine.compile_must("{{ name |> reverse }}");
    /// let result = engine.render(&template, &Store::new().with_must("name", "rolyat"));
    ///
    /// assert_eq!(result.unwrap(), "taylor");
    /// ```
    #[inline]
    pub fn with_filter_must<T>(mut self, name: &str, filter: T) -> Self
    where
        T: Filter + 'static,
    {
        self.add_filter_must(name, filter);

        self
    }

    /// Return the filter with the given name, if it exists in the [`Engine`].
    #[inline]
    pub fn get_filter(&self, name: &str) -> Option<Arc<dyn Filter>> {
        self.filters.get(name)
    }

    /// Set the [`CodeExecutor`] that handles host-code blocks.
    pub fn set_executor<T>(&mut self, executor: T)
    where
        T: CodeExecutor + 'static,
    {
        self.executor = Box::new(executor);
    }

    /// Set the [`CodeExecutor`] that handles host-code blocks.
    ///
    /// Returns the [`Engine`], so additional methods may be chained.
    #[inline]
    pub fn with_executor<T>(mut self, executor: T) -> Self
    where
        T: CodeExecutor + 'static,
    {
        self.set_executor(executor);

        self
    }

    /// Return the [`Config`] in effect.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Return the filter [`Registry`].
    #[inline]
    pub fn filters(&self) -> &Registry {
        &self.filters
    }

    /// Return the [`CodeExecutor`] handling host-code blocks.
    #[inline]
    pub fn executor(&self) -> &dyn CodeExecutor {
        self.executor.as_ref()
    }

    /// Resolve the inheritance chain of the given [`Template`].
    ///
    /// Every `extends` reference is looked up among the registered templates
    /// first, and read from the configured directory when not registered.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when a parent cannot be found or compiled, the
    /// chain loops back on itself, or a `super()` call in the chain has no
    /// parent body to splice in.
    fn link(&self, template: &mut Template) -> Result<(), Error> {
        let mut seen: Vec<String> = template.name.iter().cloned().collect();
        let mut current = &mut *template;

        loop {
            let parent_name = match &current.extends {
                Some(name) => name.clone(),
                None => break,
            };

            if seen.iter().any(|name| name == &parent_name) {
                return Err(Error::build(INVALID_SYNTAX).with_help(format!(
                    "template `{parent_name}` appears twice in its own inheritance \
                    chain, `extends` must not form a cycle"
                )));
            }
            seen.push(parent_name.clone());

            if current.superior.is_none() {
                let parent = self.resolve(&parent_name)?;
                current.superior = Some(Box::new(parent));
            }
            current = current
                .superior
                .as_mut()
                .expect("parent was linked above");
        }

        Self::check_supers(template)
    }

    /// Check that every `super()` call in the inheritance chain has an
    /// ancestor body to splice in.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] pointing at the first `super()` call that
    /// resolves to nothing.
    fn check_supers(template: &Template) -> Result<(), Error> {
        let mut chain = vec![template];
        let mut current = template;
        while let Some(parent) = current.superior.as_deref() {
            chain.push(parent);
            current = parent;
        }

        for (at, template) in chain.iter().copied().enumerate() {
            let mut open = vec![];
            Self::check_scope(template, &template.scope, &mut open, &chain[at + 1..])?;
        }

        Ok(())
    }

    /// Walk the given [`Scope`], checking each `super()` call against the
    /// block tables of the given ancestor templates.
    fn check_scope<'source>(
        template: &'source Template,
        scope: &'source Scope,
        open: &mut Vec<&'source str>,
        ancestors: &[&Template],
    ) -> Result<(), Error> {
        for next in scope.data.iter() {
            match next {
                Tree::Block(block) => {
                    open.push(block.name.as_str());
                    Self::check_scope(template, &block.body, open, ancestors)?;
                    open.pop();
                }
                Tree::If(tree) => {
                    for branch in tree.branches.iter() {
                        Self::check_scope(template, &branch.body, open, ancestors)?;
                    }
                    if let Some(body) = &tree.else_branch {
                        Self::check_scope(template, body, open, ancestors)?;
                    }
                }
                Tree::For(tree) => {
                    Self::check_scope(template, &tree.body, open, ancestors)?;
                }
                Tree::Super(region) => {
                    let name = open
                        .last()
                        .expect("parser rejects `super()` outside a block");
                    if !ancestors.iter().any(|above| above.blocks.contains_key(*name)) {
                        let error = Error::build("missing parent block")
                            .with_pointer(&template.source, *region)
                            .with_help(format!(
                                "no parent template provides a `{name}` block for \
                                `super()` to splice in"
                            ));
                        return Err(match &template.name {
                            Some(name) => error.with_name(name),
                            None => error,
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Return the [`Template`] with the given name, from the registered
    /// templates or the configured directory.
    fn resolve(&self, name: &str) -> Result<Template, Error> {
        if let Some(registered) = self.templates.get(name) {
            return Ok(registered.clone());
        }

        let path = self.config.directory.join(name);
        let source = fs::read_to_string(&path).map_err(|err| {
            Error::build("missing template").with_help(format!(
                "template `{name}` is not registered in the engine, and reading \
                `{}` failed: {err}",
                path.display()
            ))
        })?;

        Parser::new(&source, &self.finder, &self.config)
            .compile(Some(name))
            .map_err(|err| err.with_name(name))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::Engine;
    use crate::{
        filter::Error,
        log::{error_host_code, ErrorKind},
        Config, Store,
    };
    use serde_json::{json, Value};
    use std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
    };

    #[test]
    fn test_add_filter() {
        let mut engine = Engine::default();
        engine.add_filter_must("faux", faux_filter_a);

        assert!(engine.get_filter("faux").is_some());
        assert!(engine.get_filter("ghost").is_none())
    }

    #[test]
    fn test_add_filter_fluent() {
        assert!(Engine::default()
            .with_filter("faux", faux_filter_a)
            .unwrap()
            .get_filter("faux")
            .is_some());
        assert!(Engine::default().get_filter("ghost").is_none());
    }

    #[test]
    fn test_add_filter_duplicate() {
        assert!(Engine::default()
            .with_filter_must("faux", faux_filter_a)
            .with_filter("faux", faux_filter_a)
            .is_err())
    }

    #[test]
    fn test_add_filter_overwrite() {
        let mut engine = Engine::default().with_filter_must("faux", faux_filter_a);
        assert!(engine
            .get_filter("faux")
            .is_some_and(|f| f.apply("").is_ok_and(|v| v == "a")));

        engine.add_filter_must("faux", faux_filter_b);
        assert!(engine
            .get_filter("faux")
            .is_some_and(|f| f.apply("").is_ok_and(|v| v == "b")));
    }

    #[test]
    fn test_add_template_duplicate() {
        let mut engine = Engine::default();
        engine.add_template("greeting", "hello").unwrap();

        assert!(engine.add_template("greeting", "hi").is_err());
        assert!(engine.add_template_must("greeting", "hi").is_ok());
    }

    #[test]
    fn test_render_named() {
        let mut engine = Engine::default();
        engine.add_template("greeting", "hello, {{ name }}!").unwrap();

        let store = Store::new().with_must("name", "taylor");
        assert_eq!(
            engine.render_named("greeting", &store).unwrap(),
            "hello, taylor!"
        );
        assert!(engine.render_named("ghost", &store).is_err());
    }

    #[test]
    fn test_link_registered_parent() {
        let mut engine = Engine::default();
        engine
            .add_template("base", "a{% block x %}b{% endblock %}c")
            .unwrap();
        engine
            .add_template(
                "child",
                "{% extends \"base\" %}{% block x %}B{% endblock %}",
            )
            .unwrap();

        let child = engine.get_template("child").unwrap();
        assert_eq!(child.extends(), Some("base"));

        let result = engine.render_named("child", &Store::new());
        assert_eq!(result.unwrap(), "aBc");
    }

    #[test]
    fn test_link_missing_parent() {
        let engine = Engine::default();

        assert!(engine.compile("{% extends \"ghost.html\" %}").is_err());
    }

    #[test]
    fn test_link_cycle() {
        let mut engine = Engine::default();
        assert!(engine
            .add_template("loop", "{% extends \"loop\" %}")
            .is_err());

        engine.add_template("b", "base").unwrap();
        engine.add_template_must("a", "{% extends \"b\" %}").unwrap();
        // Re-registering `b` to extend `a` would close the loop.
        assert!(engine
            .add_template_must("b", "{% extends \"a\" %}")
            .is_err());
    }

    #[test]
    fn test_inheritance_super_depth() {
        let mut engine = Engine::default();
        engine
            .add_template("root", "{% block x %}P{% endblock %}")
            .unwrap();
        engine
            .add_template(
                "mid",
                "{% extends \"root\" %}{% block x %}{{ super() }}X{% endblock %}",
            )
            .unwrap();
        engine
            .add_template(
                "leaf",
                "{% extends \"mid\" %}{% block x %}{{ super() }}Y{% endblock %}",
            )
            .unwrap();

        assert_eq!(engine.render_named("mid", &Store::new()).unwrap(), "PX");
        assert_eq!(engine.render_named("leaf", &Store::new()).unwrap(), "PXY");
    }

    #[test]
    fn test_inheritance_unoverridden_block() {
        let mut engine = Engine::default();
        engine
            .add_template("base", "a{% block x %}b{% endblock %}c")
            .unwrap();
        engine
            .add_template("child", "{% extends \"base\" %}")
            .unwrap();

        assert_eq!(engine.render_named("child", &Store::new()).unwrap(), "abc");
    }

    #[test]
    fn test_super_without_parent() {
        let mut engine = Engine::default();

        // Rejected while compiling, before the template is ever rendered.
        assert!(engine
            .add_template("base", "{% block x %}{{ super() }}{% endblock %}")
            .is_err());
        assert!(engine.get_template("base").is_none());
    }

    #[test]
    fn test_super_checked_in_nested_scopes() {
        let engine = Engine::default();
        let source = "{% block x %}{% if true %}{{ super() }}{% endif %}{% endblock %}";

        assert!(engine.compile(source).is_err());
    }

    #[test]
    fn test_autoescape() {
        let mut config = Config::new();
        config.autoescape = true;

        let engine = Engine::new(config);
        let template = engine.compile_must("{{ x }} & {{ x |> escape }} {{ x |> e }}");
        let store = Store::new().with_must("x", "<b>");

        // Raw text is untouched, and an explicit escape is not doubled.
        assert_eq!(
            engine.render(&template, &store).unwrap(),
            "&lt;b&gt; & &lt;b&gt; &lt;b&gt;"
        );
    }

    #[test]
    fn test_autoescape_after_trailing_filter() {
        let mut config = Config::new();
        config.autoescape = true;

        let engine = Engine::new(config);
        let template = engine.compile_must("{{ x |> escape |> upper }}");
        let store = Store::new().with_must("x", "<a>");

        // Only a chain ending in the escape filter suppresses the final pass.
        assert_eq!(
            engine.render(&template, &store).unwrap(),
            "&amp;LT;A&amp;GT;"
        );
    }

    #[test]
    fn test_autoescape_shadowed_filter_does_not_suppress() {
        let mut config = Config::new();
        config.autoescape = true;

        let engine = Engine::new(config).with_filter_must(
            "escape",
            |input: &str| -> Result<String, Error> { Ok(input.to_owned()) },
        );
        let template = engine.compile_must("{{ x |> escape }}");
        let store = Store::new().with_must("x", "<b>");

        assert_eq!(engine.render(&template, &store).unwrap(), "&lt;b&gt;");
    }

    #[test]
    fn test_custom_delimiters() {
        let mut config = Config::new();
        config.expression = ("((".into(), "))".into());
        config.control = ("(*".into(), "*)".into());

        let engine = Engine::new(config);
        let template = engine.compile_must("(* if yes *)(( name ))(* endif *){{ ignored }}");
        let store = Store::new().with_must("yes", true).with_must("name", "t");

        assert_eq!(engine.render(&template, &store).unwrap(), "t{{ ignored }}");
    }

    #[test]
    fn test_trim_and_lstrip_blocks() {
        let mut config = Config::new();
        config.trim_blocks = true;
        config.lstrip_blocks = true;

        let engine = Engine::new(config);
        let template = engine.compile_must(
            "<ul>\n  {% for x in items %}\n  <li>{{ x }}</li>\n  {% endfor %}\n</ul>",
        );
        let store = Store::new().with_must("items", json!(["a", "b"]));

        assert_eq!(
            engine.render(&template, &store).unwrap(),
            "<ul>\n  <li>a</li>\n  <li>b</li>\n</ul>"
        );
    }

    #[test]
    fn test_autospace() {
        let mut config = Config::new();
        config.autospace = true;

        let engine = Engine::new(config);
        let template = engine.compile_must("a   {{ x }}   b");
        let store = Store::new().with_must("x", "x");

        assert_eq!(engine.render(&template, &store).unwrap(), "a x b");
    }

    #[test]
    fn test_preamble_runs_once_discarded() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let engine = Engine::default().with_executor(
            move |code: &str, _: &HashMap<String, Value>| -> Result<String, Error> {
                seen.fetch_add(1, Ordering::SeqCst);
                Ok(format!("[{}]", code.trim()))
            },
        );

        let template = engine.compile_must("{< setup >}\nhello {< run >}");
        let result = engine.render(&template, &Store::new()).unwrap();

        // The preamble fragment ran, but its output was discarded.
        assert_eq!(result, "\nhello [run]");
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_host_code_error_aborts() {
        let engine = Engine::default().with_executor(
            |_: &str, _: &HashMap<String, Value>| -> Result<String, Error> {
                Err(error_host_code("boom"))
            },
        );
        let template = engine.compile_must("a {< x >} b");
        let result = engine.render(&template, &Store::new());

        assert!(result.is_err_and(|err| err.kind() == ErrorKind::HostCode));
    }

    #[test]
    fn test_code_sees_loop_bindings() {
        let engine = Engine::default().with_executor(
            |_: &str, bindings: &HashMap<String, Value>| -> Result<String, Error> {
                Ok(bindings
                    .get("item")
                    .and_then(Value::as_str)
                    .unwrap_or("?")
                    .to_owned())
            },
        );
        let template = engine.compile_must("{% for item in items %}{< emit >}{% endfor %}");
        let store = Store::new().with_must("items", json!(["a", "b"]));

        assert_eq!(engine.render(&template, &store).unwrap(), "ab");
    }

    /// A Filter used to test Engine.
    fn faux_filter_a(_: &str) -> Result<String, Error> {
        Ok("a".into())
    }

    /// A Filter used to test Engine.
    fn faux_filter_b(_: &str) -> Result<String, Error> {
        Ok("b".into())
    }
}

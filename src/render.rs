mod compare;
mod pipe;

use crate::{
    compile::{
        tree::{Base, Comparison, For, Identifier, Output, Tree},
        Scope, Template,
    },
    log::{
        error_missing_filter, error_undefined_variable, error_write, Error, INCOMPATIBLE_TYPES,
    },
    region::Region,
    Engine, Store,
};
use serde_json::Value;
use std::{borrow::Cow, collections::HashMap, fmt::Write};

use self::{
    compare::{compare_values, is_truthy},
    pipe::{stringify, Pipe},
};

/// Render a [`Template`].
///
/// Provides a shortcut to quickly render a `Template` when no custom filters,
/// options or executors are needed.
///
/// # Examples
///
/// ```
/// use quill::{compile, render, Store};
///
/// let template = compile("hello, {{ name }}!");
/// assert!(template.is_ok());
///
/// let output = render(&template.unwrap(), &Store::new().with_must("name", "taylor"));
/// assert_eq!(output.unwrap(), "hello, taylor!");
/// ```
pub fn render(template: &Template, store: &Store) -> Result<String, Error> {
    Renderer::new(&Engine::default(), template, store).render()
}

pub struct Renderer<'source, 'store> {
    /// An engine containing the registered filters, the options, and the
    /// host-code executor.
    engine: &'source Engine,
    /// The template being rendered.
    template: &'source Template,
    /// The Store that the Template is rendered with.
    store: &'store Store,
    /// Block bodies gathered from the whole inheritance chain, most derived
    /// first.
    blocks: HashMap<&'source str, Vec<(&'source Template, &'source Scope)>>,
    /// Loop frames, innermost last. Bindings here shadow the Store.
    frames: Vec<HashMap<String, Value>>,
    /// Blocks currently being rendered, with the index of the body in use.
    ///
    /// A `super()` call splices in the next body for the block on top.
    block_stack: Vec<(&'source str, usize)>,
}

impl<'source, 'store> Renderer<'source, 'store> {
    /// Create a new Renderer.
    pub fn new(
        engine: &'source Engine,
        template: &'source Template,
        store: &'store Store,
    ) -> Self {
        Renderer {
            engine,
            template,
            store,
            blocks: HashMap::new(),
            frames: vec![],
            block_stack: vec![],
        }
    }

    /// Render the [`Template`] stored inside the [`Renderer`].
    ///
    /// When the template extends another, the root of the inheritance chain
    /// provides the structure, and block bodies are taken from the most
    /// derived template that defines them.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if rendering any of the [`Tree`] instances within
    /// the `Template` fails, or writing the rendered `Tree` to the buffer
    /// fails.
    pub fn render(&mut self) -> Result<String, Error> {
        let mut chain: Vec<&'source Template> = vec![self.template];
        let mut current = self.template;
        while let Some(parent) = current.superior.as_deref() {
            chain.push(parent);
            current = parent;
        }

        // Most derived first, so index 0 is always the body to render and
        // index n + 1 is the one `super()` reaches for.
        for template in chain.iter().copied() {
            for (name, scope) in &template.blocks {
                self.blocks
                    .entry(name.as_str())
                    .or_default()
                    .push((template, scope));
            }
        }

        // Preambles run root first, output discarded.
        for template in chain.iter().rev().copied() {
            for region in &template.preamble {
                let code = region.literal(&template.source)?;
                self.engine
                    .executor()
                    .execute(code, &self.bindings())
                    .map_err(|err| self.located(err, template, *region))?;
            }
        }

        let root = *chain.last().expect("chain always contains the template");
        let mut buffer = String::with_capacity(root.source.len());
        let mut pipe = Pipe::new(&mut buffer);

        self.render_scope(root, &root.scope, &mut pipe)?;

        Ok(buffer)
    }

    /// Render the given [`Scope`].
    ///
    /// The [`Region`] instances in the scope resolve against the source of
    /// the template that owns it, which is not necessarily the template that
    /// rendering started from.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if any of the [`Tree`] instances in the `Scope`
    /// cannot be rendered.
    fn render_scope(
        &mut self,
        template: &'source Template,
        scope: &'source Scope,
        pipe: &mut Pipe,
    ) -> Result<(), Error> {
        for next in scope.data.iter() {
            match next {
                Tree::Raw(region) => {
                    let text = region.literal(&template.source)?;
                    if self.engine.config().autospace {
                        self.write_spaced(template, *region, text, pipe)?;
                    } else {
                        pipe.write_str(text).map_err(|_| error_write())?;
                    }
                }
                Tree::Output(output) => {
                    let text = self.evaluate_output(template, output)?;
                    pipe.write_str(&text).map_err(|_| error_write())?;
                }
                Tree::If(tree) => {
                    let mut taken = false;
                    for branch in tree.branches.iter() {
                        if self.evaluate_condition(template, &branch.condition)? {
                            self.render_scope(template, &branch.body, pipe)?;
                            taken = true;
                            break;
                        }
                    }
                    if !taken {
                        if let Some(body) = &tree.else_branch {
                            self.render_scope(template, body, pipe)?;
                        }
                    }
                }
                Tree::For(tree) => self.render_for(template, tree, pipe)?,
                Tree::Code(region) => {
                    let code = region.literal(&template.source)?;
                    let output = self
                        .engine
                        .executor()
                        .execute(code, &self.bindings())
                        .map_err(|err| self.located(err, template, *region))?;
                    pipe.write_str(&output).map_err(|_| error_write())?;
                }
                Tree::Block(block) => {
                    // The most derived body wins. The block always appears in
                    // the merged map, because the declaring template itself
                    // registers a body for it.
                    let (owner, body) = match self.blocks.get(block.name.as_str()) {
                        Some(bodies) => bodies[0],
                        None => (template, &block.body),
                    };

                    self.block_stack.push((block.name.as_str(), 0));
                    let result = self.render_scope(owner, body, pipe);
                    self.block_stack.pop();
                    result?;
                }
                Tree::Super(region) => self.render_super(template, *region, pipe)?,
            }
        }

        Ok(())
    }

    /// Render the parent body of the block currently on top of the block
    /// stack.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when no overridden body exists above the one
    /// being rendered.
    fn render_super(
        &mut self,
        template: &'source Template,
        region: Region,
        pipe: &mut Pipe,
    ) -> Result<(), Error> {
        let (name, depth) = match self.block_stack.last() {
            Some(top) => *top,
            None => {
                return Err(Error::render("misplaced super")
                    .with_pointer(&template.source, region)
                    .with_help("`super()` is only valid inside of a `block`"));
            }
        };

        let parent = self
            .blocks
            .get(name)
            .and_then(|bodies| bodies.get(depth + 1))
            .copied();

        match parent {
            Some((owner, body)) => {
                self.block_stack.push((name, depth + 1));
                let result = self.render_scope(owner, body, pipe);
                self.block_stack.pop();

                result
            }
            None => Err(Error::render("missing parent block")
                .with_pointer(&template.source, region)
                .with_help(format!(
                    "no template above this one overrides the `{name}` block, \
                    so `super()` has nothing to splice in"
                ))),
        }
    }

    /// Render the body of the loop once per element of the iterable.
    ///
    /// Arrays yield their elements, objects yield their keys.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the iterable is not an array or an object.
    fn render_for(
        &mut self,
        template: &'source Template,
        tree: &'source For,
        pipe: &mut Pipe,
    ) -> Result<(), Error> {
        let value = self.evaluate_base(template, &tree.iterable)?.into_owned();
        let name = tree.variable.region.literal(&template.source)?.to_owned();

        let items: Vec<Value> = match value {
            Value::Array(items) => items,
            Value::Object(map) => map.keys().cloned().map(Value::String).collect(),
            other => {
                return Err(Error::render(INCOMPATIBLE_TYPES)
                    .with_pointer(&template.source, tree.iterable.get_region())
                    .with_help(format!(
                        "`{other}` is not iterable, expected an array or an object"
                    )));
            }
        };

        for item in items {
            let mut frame = HashMap::new();
            frame.insert(name.clone(), item);
            self.frames.push(frame);

            let result = self.render_scope(template, &tree.body, pipe);
            self.frames.pop();
            result?;
        }

        Ok(())
    }

    /// Write raw text with whitespace runs at marker boundaries collapsed to
    /// a single space.
    ///
    /// The very beginning and end of the source are not marker boundaries,
    /// so whitespace there is kept as written.
    fn write_spaced(
        &self,
        template: &Template,
        region: Region,
        text: &str,
        pipe: &mut Pipe,
    ) -> Result<(), Error> {
        let mut text = Cow::Borrowed(text);
        if region.begin > 0 {
            let trimmed = text.trim_start();
            if trimmed.len() < text.len() {
                text = Cow::Owned(format!(" {trimmed}"));
            }
        }
        if region.end < template.source.len() {
            let trimmed = text.trim_end();
            if trimmed.len() < text.len() {
                text = Cow::Owned(format!("{trimmed} "));
            }
        }

        pipe.write_str(&text).map_err(|_| error_write())
    }

    /// Evaluate the [`Comparison`] and return its outcome.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if evaluating a [`Base`] fails, or the two sides
    /// cannot be compared.
    fn evaluate_condition(
        &self,
        template: &Template,
        condition: &Comparison,
    ) -> Result<bool, Error> {
        let left = self.evaluate_base(template, &condition.left)?;

        let result = match &condition.right {
            Some(base) => {
                let right = self.evaluate_base(template, base)?;
                let operator = condition
                    .operator
                    .expect("if condition.right is some, operator must exist");

                compare_values(&left, operator, &right)
                    .map_err(|err| self.located(err, template, condition.region))?
            }
            None => is_truthy(&left),
        };

        Ok(if condition.negate { !result } else { result })
    }

    /// Evaluate an [`Output`] to return the text it renders as.
    ///
    /// The value is stringified and then piped through the filters, left to
    /// right. When autoescaping is on and the last-applied filter is not the
    /// built-in escape filter, it is applied last.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] if the value cannot be resolved, a filter is not
    /// registered, or a filter fails.
    fn evaluate_output(&self, template: &Template, output: &Output) -> Result<String, Error> {
        let value = self.evaluate_base(template, &output.base)?;
        let mut text = stringify(&value)?;

        let mut escaped = false;
        for ident in &output.filters {
            let name = ident.region.literal(&template.source)?;
            let filter = self
                .engine
                .get_filter(name)
                .ok_or_else(|| self.located(error_missing_filter(name), template, ident.region))?;

            text = filter
                .apply(&text)
                .map_err(|err| self.located(err, template, ident.region))?;
            escaped = self.engine.filters().is_escape(&filter);
        }

        if self.engine.config().autoescape && !escaped {
            text = self
                .engine
                .filters()
                .escape()
                .apply(&text)
                .map_err(|err| self.located(err, template, output.region))?;
        }

        Ok(text)
    }

    /// Evaluate a [`Base`] to return a [`Value`].
    ///
    /// # Errors
    ///
    /// Returns an error if the `Base` is a variable with no binding.
    fn evaluate_base<'value>(
        &'value self,
        template: &Template,
        base: &'value Base,
    ) -> Result<Cow<'value, Value>, Error> {
        match base {
            Base::Variable(variable) => self.evaluate_keys(template, &variable.path),
            Base::Literal(literal) => Ok(Cow::Borrowed(&literal.value)),
        }
    }

    /// Evaluate a chain of [`Identifier`] instances to return a [`Value`].
    ///
    /// The first identifier is resolved against the loop frames, innermost
    /// first, and then the [`Store`]. The remaining identifiers index into
    /// objects.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when any step of the path has no binding.
    fn evaluate_keys(
        &self,
        template: &Template,
        keys: &[Identifier],
    ) -> Result<Cow<Value>, Error> {
        let first = keys
            .first()
            .expect("variable path should always have at least one key");
        let first_name = first.region.literal(&template.source)?;

        let mut value: Cow<Value> = match self.lookup(first_name) {
            Some(value) => Cow::Borrowed(value),
            None => {
                return Err(self.located(
                    error_undefined_variable(first_name),
                    template,
                    first.region,
                ));
            }
        };

        for key in keys.iter().skip(1) {
            let key_name = key.region.literal(&template.source)?;
            let next = value
                .as_object()
                .and_then(|object| object.get(key_name))
                .cloned();

            value = match next {
                Some(next) => Cow::Owned(next),
                None => {
                    return Err(self.located(
                        error_undefined_variable(key_name),
                        template,
                        key.region,
                    ));
                }
            };
        }

        Ok(value)
    }

    /// Resolve a name against the loop frames, innermost first, and then the
    /// [`Store`].
    fn lookup(&self, name: &str) -> Option<&Value> {
        for frame in self.frames.iter().rev() {
            if let Some(value) = frame.get(name) {
                return Some(value);
            }
        }

        self.store.get(name)
    }

    /// Collect the bindings visible at this point of the render, for handing
    /// to the host-code executor.
    fn bindings(&self) -> HashMap<String, Value> {
        let mut map: HashMap<String, Value> = self
            .store
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        for frame in &self.frames {
            for (key, value) in frame {
                map.insert(key.clone(), value.clone());
            }
        }

        map
    }

    /// Attach a pointer into the given template, and the template name, to
    /// the [`Error`].
    fn located(&self, error: Error, template: &Template, region: Region) -> Error {
        let error = error.with_pointer(&template.source, region);
        match &template.name {
            Some(name) => error.with_name(name),
            None => error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{render, Renderer};
    use crate::{compile, log::ErrorKind, Engine, Store};
    use serde_json::json;

    #[test]
    fn test_render_raw() {
        let template = compile("hello there").unwrap();
        let result = render(&template, &Store::new());

        assert_eq!(result.unwrap(), "hello there");
    }

    #[test]
    fn test_render_output() {
        let template = compile("hello there, {{ name }}!").unwrap();
        let result = render(&template, &Store::new().with_must("name", "taylor"));

        assert_eq!(result.unwrap(), "hello there, taylor!");
    }

    #[test]
    fn test_render_nested_path() {
        let template = compile("{{ person.name }}").unwrap();
        let store = Store::new().with_must("person", json!({"name": "taylor"}));

        assert_eq!(render(&template, &store).unwrap(), "taylor");
    }

    #[test]
    fn test_render_undefined_variable() {
        let template = compile("{{ ghost }}").unwrap();
        let result = render(&template, &Store::new());

        assert!(result.is_err_and(|err| err.kind() == ErrorKind::UndefinedVariable));
    }

    #[test]
    fn test_render_undefined_key() {
        let template = compile("{{ person.age }}").unwrap();
        let store = Store::new().with_must("person", json!({"name": "taylor"}));
        let result = render(&template, &store);

        assert!(result.is_err_and(|err| err.kind() == ErrorKind::UndefinedVariable));
    }

    #[test]
    fn test_render_if() {
        let template = compile(
            "{% if left > 300 %}a\
            {% elif name == \"taylor\" %}b\
            {% elif not false %}c\
            {% else %}d\
            {% endif %}",
        )
        .unwrap();
        let store = Store::new().with_must("left", 101).with_must("name", "");

        assert_eq!(render(&template, &store).unwrap(), "c");
    }

    #[test]
    fn test_render_if_truthy_only() {
        let template = compile("{% if name %}yes{% else %}no{% endif %}").unwrap();

        let store = Store::new().with_must("name", "taylor");
        assert_eq!(render(&template, &store).unwrap(), "yes");

        let store = Store::new().with_must("name", "");
        assert_eq!(render(&template, &store).unwrap(), "no");
    }

    #[test]
    fn test_render_for_array() {
        let template = compile("{% for item in items %}{{ item }},{% endfor %}").unwrap();
        let store = Store::new().with_must("items", json!(["a", "b", "c"]));

        assert_eq!(render(&template, &store).unwrap(), "a,b,c,");
    }

    #[test]
    fn test_render_for_object_keys() {
        let template = compile("{% for key in person %}{{ key }};{% endfor %}").unwrap();
        let store = Store::new().with_must("person", json!({"age": 30, "name": "t"}));

        assert_eq!(render(&template, &store).unwrap(), "age;name;");
    }

    #[test]
    fn test_render_for_scalar_is_error() {
        let template = compile("{% for x in n %}{% endfor %}").unwrap();
        let store = Store::new().with_must("n", 10);

        assert!(render(&template, &store).is_err());
    }

    #[test]
    fn test_render_loop_shadowing() {
        let template = compile("{{ name }}|{% for name in names %}{{ name }}{% endfor %}|{{ name }}")
            .unwrap();
        let store = Store::new()
            .with_must("name", "outer")
            .with_must("names", json!(["a", "b"]));

        assert_eq!(render(&template, &store).unwrap(), "outer|ab|outer");
    }

    #[test]
    fn test_render_filters_in_order() {
        let engine = Engine::default();
        let template = engine.compile("{{ x |> upper |> escape }}").unwrap();
        let store = Store::new().with_must("x", "<a>");

        assert_eq!(engine.render(&template, &store).unwrap(), "&lt;A&gt;");
    }

    #[test]
    fn test_render_missing_filter() {
        let engine = Engine::default();
        let template = engine.compile("{{ x |> ghost }}").unwrap();
        let store = Store::new().with_must("x", "a");
        let result = engine.render(&template, &store);

        assert!(result.is_err_and(|err| err.kind() == ErrorKind::FilterNotFound));
    }

    #[test]
    fn test_render_block_default_body() {
        let template = compile("a{% block x %}b{% endblock %}c").unwrap();

        assert_eq!(render(&template, &Store::new()).unwrap(), "abc");
    }

    #[test]
    fn test_renderer_reusable() {
        let engine = Engine::default();
        let template = engine.compile("{{ n }}").unwrap();
        let store = Store::new().with_must("n", 1);

        let first = Renderer::new(&engine, &template, &store).render();
        let second = Renderer::new(&engine, &template, &store).render();

        assert_eq!(first.unwrap(), second.unwrap());
    }
}

//! Instance
//!
//! An [`Instance`] is the owning context of a set of watchers. It holds the
//! root data record, computed properties (lazy watchers), methods, filters
//! and slot content, and once mounted it owns the render watcher that keeps
//! [`Instance::vnode`] up to date.
//!
//! # Lookup Order
//!
//! Names read by getters and render procedures resolve through computed
//! properties, then props, then root data, then methods.
//!
//! # Props
//!
//! Props are the values a parent passes down. Their keys are reactive, but
//! the values themselves are not observed: a record passed as a prop stays
//! as observed (or unobserved) as its owner left it. The parent replaces a
//! value with [`Instance::set_prop`]; writing a prop from inside the
//! instance warns, since the next update from the parent overwrites it.
//!
//! # Lifecycle
//!
//! `new` → `mount` → (`before_update` → re-render → `updated`)* → `destroy`.
//! Update hooks only fire for a mounted, not yet destroyed instance.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use super::context::{untracked, ReactiveContext};
use super::observer::{observe, set_property, toggle_observing};
use super::runtime::Runtime;
use super::watcher::{GetterFn, WatchCallback, WatchSource, Watcher, WatcherOptions};
use super::{Record, SubscriberId};
use crate::compiler::RenderProgram;
use crate::error::{EvalError, ReactiveError};
use crate::render::{mark_static, VNode};
use crate::util::{camelize, capitalize};
use crate::value::{Callable, Value};

static NEXT_UID: AtomicU64 = AtomicU64::new(1);

/// A lifecycle hook.
pub type Hook = Rc<dyn Fn(&Instance)>;

/// A computed setter, called when the computed property is assigned to.
pub type SetterFn = Rc<dyn Fn(&Instance, Value) -> Result<(), EvalError>>;

/// A method body. Methods receive their instance explicitly.
pub type MethodFn = Rc<dyn Fn(&Instance, &[Value]) -> Result<Value, EvalError>>;

/// Options for [`Instance::watch`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WatchOptions {
    pub deep: bool,
    pub sync: bool,
    /// Invoke the callback once right away with the initial value.
    pub immediate: bool,
}

impl WatchOptions {
    pub fn deep(mut self) -> Self {
        self.deep = true;
        self
    }

    pub fn sync(mut self) -> Self {
        self.sync = true;
        self
    }

    pub fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }
}

/// Builder for [`Instance::new`].
#[derive(Default)]
pub struct InstanceOptions {
    name: Option<String>,
    data: Option<Record>,
    props: Vec<(String, Value)>,
    computed: Vec<(String, GetterFn, Option<SetterFn>)>,
    methods: Vec<(String, MethodFn)>,
    filters: Vec<(String, Value)>,
    watch: Vec<(WatchSource, WatchCallback, WatchOptions)>,
    slots: Vec<(String, Value)>,
    scoped_slots: Vec<(String, Value)>,
    before_update: Vec<Hook>,
    updated: Vec<Hook>,
}

impl InstanceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The root data. It is observed as root data when the instance is
    /// created.
    pub fn data(mut self, data: Record) -> Self {
        self.data = Some(data);
        self
    }

    /// A prop and the value the parent passes for it.
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.push((name.into(), value.into()));
        self
    }

    /// Every key of `values` as a prop.
    pub fn props(mut self, values: &Record) -> Self {
        for key in values.keys() {
            let value = values.get_untracked(&key);
            self.props.push((key, value));
        }
        self
    }

    pub fn computed<F>(mut self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&Instance) -> Result<Value, EvalError> + 'static,
    {
        self.computed.push((name.into(), Rc::new(getter), None));
        self
    }

    /// A computed property that can also be assigned to.
    pub fn computed_with_setter<G, S>(mut self, name: impl Into<String>, getter: G, setter: S) -> Self
    where
        G: Fn(&Instance) -> Result<Value, EvalError> + 'static,
        S: Fn(&Instance, Value) -> Result<(), EvalError> + 'static,
    {
        self.computed
            .push((name.into(), Rc::new(getter), Some(Rc::new(setter))));
        self
    }

    pub fn method<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&Instance, &[Value]) -> Result<Value, EvalError> + 'static,
    {
        self.methods.push((name.into(), Rc::new(body)));
        self
    }

    pub fn filter<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + 'static,
    {
        let name = name.into();
        self.filters.push((name.clone(), Value::function(name, body)));
        self
    }

    pub fn watch<F>(mut self, source: impl Into<WatchSource>, callback: F, options: WatchOptions) -> Self
    where
        F: Fn(&Instance, &Value, &Value) -> Result<(), EvalError> + 'static,
    {
        self.watch.push((source.into(), Rc::new(callback), options));
        self
    }

    /// Static slot content: a node or a sequence of nodes.
    pub fn slot(mut self, name: impl Into<String>, content: impl Into<Value>) -> Self {
        self.slots.push((name.into(), content.into()));
        self
    }

    /// A scoped slot receives the slot props record and returns its nodes.
    pub fn scoped_slot<F>(mut self, name: impl Into<String>, render: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, EvalError> + 'static,
    {
        let name = name.into();
        let slot = Value::function(name.clone(), move |args| {
            render(args.first().unwrap_or(&Value::Undefined))
        });
        self.scoped_slots.push((name, slot));
        self
    }

    pub fn before_update<F: Fn(&Instance) + 'static>(mut self, hook: F) -> Self {
        self.before_update.push(Rc::new(hook));
        self
    }

    pub fn updated<F: Fn(&Instance) + 'static>(mut self, hook: F) -> Self {
        self.updated.push(Rc::new(hook));
        self
    }
}

struct InstanceInner {
    uid: u64,
    name: String,
    data: Record,
    props: Record,
    computed: RefCell<IndexMap<String, Watcher>>,
    computed_setters: HashMap<String, SetterFn>,
    methods: IndexMap<String, Value>,
    filters: HashMap<String, Value>,
    slots: IndexMap<String, Value>,
    scoped_slots: IndexMap<String, Value>,
    before_update: Vec<Hook>,
    updated: Vec<Hook>,

    watchers: RefCell<Vec<Watcher>>,
    render_watcher: RefCell<Option<Watcher>>,
    program: RefCell<Option<Arc<RenderProgram>>>,
    vnode: RefCell<Option<Rc<VNode>>>,
    static_trees: RefCell<Vec<Option<Value>>>,

    mounted: Cell<bool>,
    being_destroyed: Cell<bool>,
    destroyed: Cell<bool>,
}

/// A handle to an instance. Clones share the instance.
#[derive(Clone)]
pub struct Instance(Rc<InstanceInner>);

/// A non-owning handle, held by watchers and closures created during
/// render.
#[derive(Clone, Default)]
pub struct WeakInstance(Weak<InstanceInner>);

impl WeakInstance {
    pub fn upgrade(&self) -> Option<Instance> {
        self.0.upgrade().map(Instance)
    }
}

/// A method bound to its instance.
struct BoundMethod {
    name: String,
    body: MethodFn,
    vm: Weak<InstanceInner>,
}

impl Callable for BoundMethod {
    fn call(&self, args: &[Value]) -> Result<Value, EvalError> {
        let vm = self.vm.upgrade().map(Instance).ok_or(EvalError::InstanceGone)?;
        (self.body)(&vm, args)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Instance {
    /// Create an instance: define the props, observe the data as root
    /// data, set up computed properties, then the declared watchers.
    pub fn new(options: InstanceOptions) -> Result<Self, ReactiveError> {
        let InstanceOptions {
            name,
            data,
            props: prop_values,
            computed,
            methods,
            filters,
            watch,
            slots,
            scoped_slots,
            before_update,
            updated,
        } = options;

        let props = Record::new();
        if !prop_values.is_empty() {
            toggle_observing(false);
            for (key, value) in prop_values {
                props.define_reactive(&key, value);
            }
            toggle_observing(true);
        }

        let data = data.unwrap_or_default();
        for key in data.keys() {
            if props.has(&key) {
                Runtime::warn(&format!(
                    "The data property \"{key}\" is already declared as a prop. Use prop default value instead."
                ));
            }
        }
        observe(&Value::Record(data.clone()), true);

        let mut computed_setters = HashMap::new();
        let computed: Vec<(String, GetterFn)> = computed
            .into_iter()
            .map(|(name, getter, setter)| {
                if let Some(setter) = setter {
                    computed_setters.insert(name.clone(), setter);
                }
                (name, getter)
            })
            .collect();

        let inner = Rc::new_cyclic(|this: &Weak<InstanceInner>| {
            let methods = methods
                .into_iter()
                .map(|(name, body)| {
                    let bound = BoundMethod {
                        name: name.clone(),
                        body,
                        vm: this.clone(),
                    };
                    (name, Value::Function(Rc::new(bound)))
                })
                .collect();
            InstanceInner {
                uid: NEXT_UID.fetch_add(1, Ordering::Relaxed),
                name: name.unwrap_or_else(|| "<Anonymous>".to_string()),
                data,
                props,
                computed: RefCell::new(IndexMap::new()),
                computed_setters,
                methods,
                filters: filters.into_iter().collect(),
                slots: slots.into_iter().collect(),
                scoped_slots: scoped_slots.into_iter().collect(),
                before_update,
                updated,
                watchers: RefCell::new(Vec::new()),
                render_watcher: RefCell::new(None),
                program: RefCell::new(None),
                vnode: RefCell::new(None),
                static_trees: RefCell::new(Vec::new()),
                mounted: Cell::new(false),
                being_destroyed: Cell::new(false),
                destroyed: Cell::new(false),
            }
        });
        let vm = Instance(inner);

        for name in vm.0.methods.keys() {
            if vm.0.data.has(name) {
                Runtime::warn(&format!(
                    "Method \"{name}\" has already been defined as a data property."
                ));
            }
            if vm.0.props.has(name) {
                Runtime::warn(&format!(
                    "Method \"{name}\" has already been defined as a prop."
                ));
            }
        }

        for (name, getter) in computed {
            if vm.0.data.has(&name) {
                Runtime::warn(&format!(
                    "The computed property \"{name}\" is already defined in data."
                ));
                continue;
            }
            if vm.0.props.has(&name) {
                Runtime::warn(&format!(
                    "The computed property \"{name}\" is already defined as a prop."
                ));
                continue;
            }
            let source = WatchSource::Getter {
                label: name.clone(),
                getter,
            };
            let watcher = Watcher::new(&vm, source, None, WatcherOptions::default().lazy(), false)?;
            vm.0.computed.borrow_mut().insert(name, watcher);
        }

        for (source, callback, options) in watch {
            vm.watch_with(source, callback, options)?;
        }

        debug!(uid = vm.0.uid, name = %vm.0.name, "instance created");
        Ok(vm)
    }

    pub fn uid(&self) -> u64 {
        self.0.uid
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn data(&self) -> Record {
        self.0.data.clone()
    }

    pub fn props(&self) -> Record {
        self.0.props.clone()
    }

    /// Pass a new value for prop `key`, as the parent does on re-render.
    /// The value is not observed.
    pub fn set_prop(&self, key: &str, value: Value) {
        if !self.0.props.has(key) {
            Runtime::warn(&format!("\"{key}\" is not a declared prop of <{}>.", self.0.name));
            return;
        }
        toggle_observing(false);
        self.0.props.set(key, value);
        toggle_observing(true);
    }

    pub fn downgrade(&self) -> WeakInstance {
        WeakInstance(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Resolve `key` against computed properties, props, data and methods. Reads
    /// are tracked by the active watcher. `None` means the name is unknown.
    pub(crate) fn lookup(&self, key: &str) -> Result<Option<Value>, EvalError> {
        let computed = self.0.computed.borrow().get(key).cloned();
        if let Some(watcher) = computed {
            if watcher.is_dirty() {
                watcher.evaluate().map_err(ReactiveError::into_eval)?;
            }
            if ReactiveContext::is_active() {
                watcher.depend();
            }
            return Ok(Some(watcher.value()));
        }
        if self.0.props.has(key) {
            return Ok(Some(self.0.props.get(key)));
        }
        if self.0.data.has(key) {
            return Ok(Some(self.0.data.get(key)));
        }
        Ok(self.0.methods.get(key).cloned())
    }

    /// Read a property. Errors from computed getters are routed to the
    /// error channel and read as `undefined`.
    pub fn get(&self, key: &str) -> Value {
        match self.lookup(key) {
            Ok(value) => value.unwrap_or_default(),
            Err(err) => {
                Runtime::handle_error(ReactiveError::evaluation(
                    format!("getter for computed \"{key}\""),
                    err,
                ));
                Value::Undefined
            }
        }
    }

    /// Write a property. A computed property runs its setter, or warns
    /// when it has none. Props are written with a warning.
    pub fn set(&self, key: &str, value: Value) {
        if self.0.computed.borrow().contains_key(key) {
            match self.0.computed_setters.get(key).cloned() {
                Some(setter) => {
                    if let Err(err) = setter(self, value) {
                        Runtime::handle_error(ReactiveError::evaluation(
                            format!("setter for computed \"{key}\""),
                            err,
                        ));
                    }
                }
                None => Runtime::warn(&format!(
                    "Computed property \"{key}\" was assigned to but it has no setter."
                )),
            }
            return;
        }
        if self.0.props.has(key) {
            Runtime::warn(&format!(
                "Avoid mutating a prop directly since the value will be overwritten whenever the parent component re-renders. Prop being mutated: \"{key}\""
            ));
            toggle_observing(false);
            self.0.props.set(key, value);
            toggle_observing(true);
            return;
        }
        if self.0.data.has(key) {
            self.0.data.set(key, value);
        } else {
            set_property(&Value::Record(self.0.data.clone()), key, value);
        }
    }

    /// Call a method by name.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, EvalError> {
        match self.lookup(name)? {
            Some(callee) => callee.call(args),
            None => Err(EvalError::NotCallable(name.to_string())),
        }
    }

    /// Watch a path or getter. The callback runs after the next flush, or
    /// inline for `sync` watchers.
    pub fn watch<F>(
        &self,
        source: impl Into<WatchSource>,
        callback: F,
        options: WatchOptions,
    ) -> Result<Watcher, ReactiveError>
    where
        F: Fn(&Instance, &Value, &Value) -> Result<(), EvalError> + 'static,
    {
        self.watch_with(source.into(), Rc::new(callback), options)
    }

    fn watch_with(
        &self,
        source: WatchSource,
        callback: WatchCallback,
        options: WatchOptions,
    ) -> Result<Watcher, ReactiveError> {
        let watcher_options = WatcherOptions {
            deep: options.deep,
            sync: options.sync,
            user: true,
            ..WatcherOptions::default()
        };
        let watcher = Watcher::new(self, source, Some(callback.clone()), watcher_options, false)?;

        if options.immediate {
            let value = watcher.value();
            let result = untracked(|| callback(self, &value, &Value::Undefined));
            if let Err(err) = result {
                Runtime::handle_error(ReactiveError::evaluation(
                    format!("callback for immediate watcher \"{}\"", watcher.expression()),
                    err,
                ));
            }
        }
        Ok(watcher)
    }

    /// Install `program` and create the render watcher, which renders once
    /// right away. Mounting again replaces the previous render watcher.
    pub fn mount(&self, program: Arc<RenderProgram>) -> Result<(), ReactiveError> {
        if let Some(previous) = self.render_watcher() {
            previous.teardown();
            self.0.vnode.borrow_mut().take();
        }
        *self.0.program.borrow_mut() = Some(program);
        self.0.static_trees.borrow_mut().clear();

        let weak = self.downgrade();
        let options = WatcherOptions::default().before(move || {
            if let Some(vm) = weak.upgrade() {
                if vm.is_mounted() && !vm.is_destroyed() {
                    for hook in &vm.0.before_update {
                        hook(&vm);
                    }
                }
            }
        });
        let getter = WatchSource::getter("render", |vm: &Instance| {
            vm.update();
            Ok(Value::Undefined)
        });
        Watcher::new(self, getter, None, options, true)?;

        self.0.mounted.set(true);
        debug!(uid = self.0.uid, "instance mounted");
        Ok(())
    }

    /// Run the render procedure and return the root node.
    pub fn render(&self) -> Result<Rc<VNode>, ReactiveError> {
        let program = self
            .0
            .program
            .borrow()
            .clone()
            .ok_or_else(|| ReactiveError::MissingRenderProgram(self.0.name.clone()))?;
        let result = program
            .render
            .call(self)
            .map_err(|err| ReactiveError::evaluation("render", err))?;

        match result {
            Value::Node(node) => Ok(node),
            Value::Sequence(seq) if seq.len() == 1 => match seq.get(0) {
                Value::Node(node) => Ok(node),
                other => Err(ReactiveError::InvalidRenderResult(other.type_of().to_string())),
            },
            Value::Sequence(_) => Err(ReactiveError::InvalidRenderResult(
                "multiple root nodes".to_string(),
            )),
            other => Err(ReactiveError::InvalidRenderResult(other.type_of().to_string())),
        }
    }

    /// Render and store the new tree. A failed render keeps the previous
    /// tree; an invalid root is replaced by an empty node.
    fn update(&self) {
        let vnode = match self.render() {
            Ok(vnode) => vnode,
            Err(ReactiveError::InvalidRenderResult(what)) => {
                Runtime::warn(&format!(
                    "Render procedure should return a single root node, got {what}."
                ));
                Rc::new(VNode::empty(""))
            }
            Err(err) => {
                Runtime::handle_error(err);
                match self.vnode() {
                    Some(previous) => previous,
                    None => Rc::new(VNode::empty("")),
                }
            }
        };
        *self.0.vnode.borrow_mut() = Some(vnode);
    }

    /// The tree produced by the latest render.
    pub fn vnode(&self) -> Option<Rc<VNode>> {
        self.0.vnode.borrow().clone()
    }

    /// Render static tree `index`. The tree is cached and reused unless it
    /// sits inside a `v-for`, where every iteration needs a fresh copy.
    pub(crate) fn render_static(&self, index: usize, in_for: bool) -> Result<Value, EvalError> {
        if !in_for {
            if let Some(Some(tree)) = self.0.static_trees.borrow().get(index) {
                return Ok(tree.clone());
            }
        }

        let program = self.0.program.borrow().clone();
        let procedure = program
            .as_ref()
            .and_then(|p| p.static_render_fns.get(index).cloned())
            .ok_or_else(|| EvalError::Unsupported(format!("no static render procedure {index}")))?;
        let tree = mark_static(&procedure.call(self)?, &format!("__static__{index}"), false);

        let mut cache = self.0.static_trees.borrow_mut();
        if cache.len() <= index {
            cache.resize(index + 1, None);
        }
        cache[index] = Some(tree.clone());
        Ok(tree)
    }

    /// Resolve a filter by id, then its camelized and capitalized forms.
    pub fn filter(&self, id: &str) -> Option<Value> {
        let filters = &self.0.filters;
        if let Some(found) = filters.get(id) {
            return Some(found.clone());
        }
        let camel = camelize(id);
        filters
            .get(&camel)
            .or_else(|| filters.get(&capitalize(&camel)))
            .cloned()
    }

    pub fn slot(&self, name: &str) -> Option<Value> {
        self.0.slots.get(name).cloned()
    }

    pub fn scoped_slot(&self, name: &str) -> Option<Value> {
        self.0.scoped_slots.get(name).cloned()
    }

    pub(crate) fn register_watcher(&self, watcher: &Watcher) {
        if watcher.is_render_watcher() {
            *self.0.render_watcher.borrow_mut() = Some(watcher.clone());
        }
        self.0.watchers.borrow_mut().push(watcher.clone());
    }

    pub(crate) fn remove_watcher(&self, id: SubscriberId) {
        self.0.watchers.borrow_mut().retain(|w| w.id() != id);
        let mut render = self.0.render_watcher.borrow_mut();
        if render.as_ref().is_some_and(|w| w.id() == id) {
            *render = None;
        }
    }

    pub fn render_watcher(&self) -> Option<Watcher> {
        self.0.render_watcher.borrow().clone()
    }

    /// Every live watcher, in creation order.
    pub fn watchers(&self) -> Vec<Watcher> {
        self.0.watchers.borrow().clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.0.mounted.get()
    }

    pub fn is_being_destroyed(&self) -> bool {
        self.0.being_destroyed.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.0.destroyed.get()
    }

    pub(crate) fn call_updated_hooks(&self) {
        for hook in &self.0.updated {
            hook(self);
        }
    }

    /// Tear down every watcher and release the root data.
    pub fn destroy(&self) {
        if self.0.being_destroyed.get() {
            return;
        }
        self.0.being_destroyed.set(true);

        let watchers = std::mem::take(&mut *self.0.watchers.borrow_mut());
        for watcher in &watchers {
            watcher.teardown();
        }
        self.0.render_watcher.borrow_mut().take();
        if let Some(observer) = self.0.data.observer() {
            observer.release_root();
        }

        self.0.destroyed.set(true);
        self.0.vnode.borrow_mut().take();
        debug!(uid = self.0.uid, torn_down = watchers.len(), "instance destroyed");
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("uid", &self.0.uid)
            .field("name", &self.0.name)
            .field("mounted", &self.0.mounted.get())
            .field("destroyed", &self.0.destroyed.get())
            .finish()
    }
}

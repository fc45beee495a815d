//! Watcher Implementation
//!
//! A Watcher is the unit of reactive computation. It evaluates a getter while
//! collecting the dependency nodes the getter reads, and it is re-run when any
//! of them notifies.
//!
//! # Kinds
//!
//! One type covers three roles, selected by [`WatcherOptions`]:
//!
//! - **render watchers** re-render an instance's tree;
//! - **user watchers** (`user`) call a callback with the new and old value,
//!   and route their errors to [`Runtime::handle_error`] instead of failing;
//! - **computed properties** (`lazy`) only mark themselves dirty on update
//!   and recompute on the next read ([`Watcher::evaluate`]).
//!
//! # Dependency Bookkeeping
//!
//! Every evaluation collects a fresh set of deps. Afterwards
//! [`cleanup_deps`](Watcher::cleanup_deps) unsubscribes from deps that were
//! not read this time and swaps the fresh set in as the confirmed set, so
//! conditional branches never leave stale subscriptions behind.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use tracing::debug;

use super::context::ReactiveContext;
use super::dep::DepId;
use super::instance::{Instance, WeakInstance};
use super::runtime::Runtime;
use super::scheduler::Scheduler;
use super::traverse::traverse;
use super::{Dep, Subscriber, SubscriberId};
use crate::error::{EvalError, ReactiveError};
use crate::value::Value;

/// A getter evaluated against the owning instance.
pub type GetterFn = Rc<dyn Fn(&Instance) -> Result<Value, EvalError>>;

/// Callback of a user watcher: `(instance, new_value, old_value)`.
pub type WatchCallback = Rc<dyn Fn(&Instance, &Value, &Value) -> Result<(), EvalError>>;

/// What a watcher evaluates.
#[derive(Clone)]
pub enum WatchSource {
    /// A dot-delimited path read from the instance, such as `"user.name"`.
    Path(String),
    /// An arbitrary getter. The label is used in diagnostics.
    Getter { label: String, getter: GetterFn },
}

impl WatchSource {
    pub fn getter<F>(label: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&Instance) -> Result<Value, EvalError> + 'static,
    {
        Self::Getter {
            label: label.into(),
            getter: Rc::new(getter),
        }
    }
}

impl From<&str> for WatchSource {
    fn from(path: &str) -> Self {
        Self::Path(path.to_string())
    }
}

/// Options for constructing a watcher.
#[derive(Clone, Default)]
pub struct WatcherOptions {
    pub deep: bool,
    pub user: bool,
    pub lazy: bool,
    pub sync: bool,
    /// Runs right before the watcher is re-run by a flush.
    pub before: Option<Rc<dyn Fn()>>,
}

impl WatcherOptions {
    pub fn deep(mut self) -> Self {
        self.deep = true;
        self
    }

    pub fn user(mut self) -> Self {
        self.user = true;
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn sync(mut self) -> Self {
        self.sync = true;
        self
    }

    pub fn before<F: Fn() + 'static>(mut self, hook: F) -> Self {
        self.before = Some(Rc::new(hook));
        self
    }
}

enum Getter {
    Path(Vec<String>),
    Func(GetterFn),
    Noop,
}

struct WatcherInner {
    id: SubscriberId,
    this: Weak<WatcherInner>,
    owner: WeakInstance,
    expression: String,
    getter: Getter,
    callback: Option<WatchCallback>,
    options: WatcherOptions,
    is_render: bool,

    active: Cell<bool>,
    dirty: Cell<bool>,
    value: RefCell<Value>,
    run_count: Cell<usize>,

    deps: RefCell<Vec<Dep>>,
    dep_ids: RefCell<HashSet<DepId>>,
    new_deps: RefCell<Vec<Dep>>,
    new_dep_ids: RefCell<HashSet<DepId>>,
}

/// A handle to a watcher. Clones share the watcher.
#[derive(Clone)]
pub struct Watcher(Rc<WatcherInner>);

impl Watcher {
    /// Create a watcher owned by `owner` and evaluate it once, unless it is
    /// lazy.
    ///
    /// A path that is not a simple dot-delimited path produces a warning and
    /// a getter that always yields `undefined`.
    pub fn new(
        owner: &Instance,
        source: WatchSource,
        callback: Option<WatchCallback>,
        options: WatcherOptions,
        is_render: bool,
    ) -> Result<Self, ReactiveError> {
        let (expression, getter) = match source {
            WatchSource::Path(path) => {
                let getter = match parse_path(&path) {
                    Some(segments) => Getter::Path(segments),
                    None => {
                        Runtime::warn(&format!(
                            "Failed watching path: \"{path}\" Watcher only accepts simple dot-delimited paths. For full control, use a function instead."
                        ));
                        Getter::Noop
                    }
                };
                (path, getter)
            }
            WatchSource::Getter { label, getter } => (label, Getter::Func(getter)),
        };

        let lazy = options.lazy;
        let inner = Rc::new_cyclic(|this| WatcherInner {
            id: SubscriberId::new(),
            this: this.clone(),
            owner: owner.downgrade(),
            expression,
            getter,
            callback,
            options,
            is_render,
            active: Cell::new(true),
            dirty: Cell::new(lazy),
            value: RefCell::new(Value::Undefined),
            run_count: Cell::new(0),
            deps: RefCell::new(Vec::new()),
            dep_ids: RefCell::new(HashSet::new()),
            new_deps: RefCell::new(Vec::new()),
            new_dep_ids: RefCell::new(HashSet::new()),
        });
        let watcher = Watcher(inner);

        owner.register_watcher(&watcher);
        debug!(id = watcher.id().as_u64(), expression = %watcher.expression(), "watcher created");

        if !lazy {
            let value = watcher.get()?;
            *watcher.0.value.borrow_mut() = value;
        }
        Ok(watcher)
    }

    pub fn id(&self) -> SubscriberId {
        self.0.id
    }

    pub fn expression(&self) -> &str {
        &self.0.expression
    }

    /// The cached value from the last evaluation.
    pub fn value(&self) -> Value {
        self.0.value.borrow().clone()
    }

    pub fn owner(&self) -> Option<Instance> {
        self.0.owner.upgrade()
    }

    pub fn is_render_watcher(&self) -> bool {
        self.0.is_render
    }

    pub fn is_user(&self) -> bool {
        self.0.options.user
    }

    pub fn is_lazy(&self) -> bool {
        self.0.options.lazy
    }

    pub fn is_dirty(&self) -> bool {
        self.0.dirty.get()
    }

    pub fn is_active(&self) -> bool {
        self.0.active.get()
    }

    /// How many times the watcher was re-run by [`run`](Self::run).
    pub fn run_count(&self) -> usize {
        self.0.run_count.get()
    }

    /// Ids of the confirmed dependencies.
    pub fn dep_ids(&self) -> Vec<DepId> {
        self.0.deps.borrow().iter().map(Dep::id).collect()
    }

    pub fn dep_count(&self) -> usize {
        self.0.deps.borrow().len()
    }

    /// Evaluate the getter and re-collect dependencies.
    ///
    /// Errors from user watchers are routed to the error channel and yield
    /// `undefined`; errors from internal watchers are returned.
    pub fn get(&self) -> Result<Value, ReactiveError> {
        let Some(vm) = self.owner() else {
            return Ok(Value::Undefined);
        };
        let target: Rc<dyn Subscriber> = self.0.clone();

        let result = {
            let _ctx = ReactiveContext::enter(Some(target));
            let result = match self.call_getter(&vm) {
                Ok(value) => Ok(value),
                Err(err) => {
                    let err = ReactiveError::evaluation(
                        format!("getter for watcher \"{}\"", self.0.expression),
                        err,
                    );
                    if self.0.options.user {
                        Runtime::handle_error(err);
                        Ok(Value::Undefined)
                    } else {
                        Err(err)
                    }
                }
            };
            if self.0.options.deep {
                if let Ok(value) = &result {
                    traverse(value);
                }
            }
            result
        };

        self.cleanup_deps();
        result
    }

    fn call_getter(&self, vm: &Instance) -> Result<Value, EvalError> {
        match &self.0.getter {
            Getter::Noop => Ok(Value::Undefined),
            Getter::Func(getter) => getter(vm),
            Getter::Path(segments) => {
                let mut value = Value::Undefined;
                for (i, segment) in segments.iter().enumerate() {
                    if i == 0 {
                        value = vm.lookup(segment)?.unwrap_or_default();
                    } else if !value.is_truthy() {
                        return Ok(Value::Undefined);
                    } else {
                        value = value.get_member(segment)?;
                    }
                }
                Ok(value)
            }
        }
    }

    /// Record a dependency read during the current evaluation.
    pub fn add_dep(&self, dep: &Dep) {
        self.0.record_dep(dep);
    }

    /// Unsubscribe from deps not read by the last evaluation and promote the
    /// freshly collected set.
    pub fn cleanup_deps(&self) {
        let inner = &self.0;
        {
            let new_ids = inner.new_dep_ids.borrow();
            for dep in inner.deps.borrow().iter() {
                if !new_ids.contains(&dep.id()) {
                    dep.remove_sub(inner.id);
                }
            }
        }

        std::mem::swap(
            &mut *inner.dep_ids.borrow_mut(),
            &mut *inner.new_dep_ids.borrow_mut(),
        );
        inner.new_dep_ids.borrow_mut().clear();

        std::mem::swap(
            &mut *inner.deps.borrow_mut(),
            &mut *inner.new_deps.borrow_mut(),
        );
        inner.new_deps.borrow_mut().clear();
    }

    /// React to a dependency change.
    pub fn update(&self) {
        if self.0.options.lazy {
            self.0.dirty.set(true);
        } else if self.0.options.sync {
            if let Err(err) = self.run() {
                Runtime::handle_error(err);
            }
        } else {
            Scheduler::queue_watcher(self.clone());
        }
    }

    /// Re-evaluate and invoke the callback when the value changed, or
    /// unconditionally for object values and deep watchers.
    pub fn run(&self) -> Result<(), ReactiveError> {
        if !self.0.active.get() {
            return Ok(());
        }

        let value = self.get()?;
        self.0.run_count.set(self.0.run_count.get() + 1);

        let changed = {
            let old = self.0.value.borrow();
            !value.strict_eq(&old) || value.is_object() || self.0.options.deep
        };
        if !changed {
            return Ok(());
        }

        let old = self.0.value.replace(value.clone());
        if let (Some(callback), Some(vm)) = (&self.0.callback, self.owner()) {
            if let Err(err) = callback(&vm, &value, &old) {
                let err = ReactiveError::evaluation(
                    format!("callback for watcher \"{}\"", self.0.expression),
                    err,
                );
                if self.0.options.user {
                    Runtime::handle_error(err);
                } else {
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    /// Recompute a lazy watcher's value and clear its dirty flag.
    pub fn evaluate(&self) -> Result<(), ReactiveError> {
        let value = self.get()?;
        *self.0.value.borrow_mut() = value;
        self.0.dirty.set(false);
        Ok(())
    }

    /// Make the currently evaluating watcher depend on everything this one
    /// depends on.
    pub fn depend(&self) {
        let deps = self.0.deps.borrow().clone();
        for dep in deps {
            dep.depend();
        }
    }

    /// Run the `before` hook, if any.
    pub fn run_before(&self) {
        if let Some(before) = &self.0.options.before {
            before();
        }
    }

    /// Unsubscribe from every dependency. The watcher never runs again.
    pub fn teardown(&self) {
        if !self.0.active.get() {
            return;
        }
        if let Some(vm) = self.owner() {
            if !vm.is_being_destroyed() {
                vm.remove_watcher(self.id());
            }
        }
        let deps = self.0.deps.borrow().clone();
        for dep in deps {
            dep.remove_sub(self.0.id);
        }
        self.0.active.set(false);
        debug!(id = self.0.id.as_u64(), "watcher torn down");
    }
}

impl WatcherInner {
    fn record_dep(&self, dep: &Dep) {
        let id = dep.id();
        if !self.new_dep_ids.borrow_mut().insert(id) {
            return;
        }
        self.new_deps.borrow_mut().push(dep.clone());
        if !self.dep_ids.borrow().contains(&id) {
            let weak: Weak<dyn Subscriber> = self.this.clone();
            dep.add_sub(self.id, weak);
        }
    }
}

impl Subscriber for WatcherInner {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn add_dep(&self, dep: &Dep) {
        self.record_dep(dep);
    }

    fn update(&self) {
        if let Some(inner) = self.this.upgrade() {
            Watcher(inner).update();
        }
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.0.id)
            .field("expression", &self.0.expression)
            .field("active", &self.0.active.get())
            .field("dirty", &self.0.dirty.get())
            .finish()
    }
}

/// Split a watch path into segments. Only word characters, `$` and dots are
/// accepted.
fn parse_path(path: &str) -> Option<Vec<String>> {
    let valid = path
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == '.');
    if !valid || path.is_empty() {
        return None;
    }
    Some(path.split('.').map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{InstanceOptions, Record};

    fn instance(data: Record) -> Instance {
        Instance::new(InstanceOptions::new().data(data)).unwrap()
    }

    fn sync_user() -> WatcherOptions {
        WatcherOptions::default().user().sync()
    }

    fn recorder() -> (Rc<RefCell<Vec<(Value, Value)>>>, WatchCallback) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let sink = calls.clone();
        let cb: WatchCallback = Rc::new(move |_vm, new, old| {
            sink.borrow_mut().push((new.clone(), old.clone()));
            Ok(())
        });
        (calls, cb)
    }

    #[test]
    fn path_watcher_reads_nested_values() {
        let data = Record::new().with("user", Record::new().with("name", "ada"));
        let vm = instance(data);
        let w = Watcher::new(&vm, "user.name".into(), None, sync_user(), false).unwrap();
        assert_eq!(w.value(), Value::from("ada"));
    }

    #[test]
    fn callback_receives_new_and_old_values() {
        let data = Record::new().with("a", 1);
        let vm = instance(data.clone());
        let (calls, cb) = recorder();
        let _w = Watcher::new(&vm, "a".into(), Some(cb), sync_user(), false).unwrap();

        data.set("a", Value::from(2));
        assert_eq!(*calls.borrow(), vec![(Value::from(2), Value::from(1))]);
    }

    #[test]
    fn invalid_path_yields_noop_getter() {
        let vm = instance(Record::new());
        let w = Watcher::new(&vm, "a[0]".into(), None, sync_user(), false).unwrap();
        assert!(w.value().is_undefined());
        assert_eq!(w.dep_count(), 0);
    }

    #[test]
    fn stale_dependencies_are_dropped() {
        let data = Record::new().with("flag", true).with("a", 1).with("b", 2);
        let vm = instance(data.clone());
        let getter = WatchSource::getter("branch", |vm| {
            Ok(if vm.get("flag").is_truthy() {
                vm.get("a")
            } else {
                vm.get("b")
            })
        });
        let w = Watcher::new(&vm, getter, None, sync_user(), false).unwrap();
        let a_dep = data.dep_of("a").unwrap();
        let b_dep = data.dep_of("b").unwrap();
        assert!(a_dep.subscriber_ids().contains(&w.id()));

        data.set("flag", Value::from(false));
        assert!(!a_dep.subscriber_ids().contains(&w.id()));
        assert!(b_dep.subscriber_ids().contains(&w.id()));
        assert_eq!(w.value(), Value::from(2));
    }

    #[test]
    fn lazy_watcher_only_marks_dirty() {
        let data = Record::new().with("a", 1);
        let vm = instance(data.clone());
        let getter = WatchSource::getter("double", |vm| {
            Ok(Value::from(vm.get("a").to_number() * 2.0))
        });
        let w = Watcher::new(&vm, getter, None, WatcherOptions::default().lazy(), false).unwrap();
        assert!(w.is_dirty());
        assert!(w.value().is_undefined());

        w.evaluate().unwrap();
        assert_eq!(w.value(), Value::from(2));
        assert!(!w.is_dirty());

        data.set("a", Value::from(5));
        assert!(w.is_dirty());
        assert_eq!(w.value(), Value::from(2));
    }

    #[test]
    fn deep_watcher_sees_nested_mutation() {
        let nested = Record::new().with("x", 1);
        let data = Record::new().with("obj", nested.clone());
        let vm = instance(data);
        let (calls, cb) = recorder();
        let _w = Watcher::new(&vm, "obj".into(), Some(cb), sync_user().deep(), false).unwrap();

        nested.set("x", Value::from(2));
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn user_getter_errors_are_routed() {
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        Runtime::set_error_handler(move |err| sink.borrow_mut().push(err.to_string()));

        let vm = instance(Record::new());
        let getter = WatchSource::getter("boom", |_| Err(EvalError::thrown("boom")));
        let w = Watcher::new(&vm, getter, None, sync_user(), false).unwrap();

        assert!(w.value().is_undefined());
        assert_eq!(errors.borrow().len(), 1);
        assert!(errors.borrow()[0].contains("getter for watcher \"boom\""));
        Runtime::clear_handlers();
    }

    #[test]
    fn internal_getter_errors_are_returned() {
        let vm = instance(Record::new());
        let getter = WatchSource::getter("internal", |_| Err(EvalError::thrown("bad")));
        let err = Watcher::new(&vm, getter, None, WatcherOptions::default(), false).unwrap_err();
        assert!(matches!(err, ReactiveError::Evaluation { .. }));
    }

    #[test]
    fn teardown_unsubscribes_everywhere() {
        let data = Record::new().with("a", 1);
        let vm = instance(data.clone());
        let (calls, cb) = recorder();
        let w = Watcher::new(&vm, "a".into(), Some(cb), sync_user(), false).unwrap();

        w.teardown();
        assert!(!w.is_active());
        assert_eq!(data.dep_of("a").unwrap().subscriber_count(), 0);

        data.set("a", Value::from(2));
        assert!(calls.borrow().is_empty());
    }
}

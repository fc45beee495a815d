//! Integration Tests
//!
//! These tests drive the public API end to end: observed data, watchers and
//! the scheduler, and templates compiled and mounted on an instance.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use trellis_core::compiler::{compile, parse, Compiler, CompilerOptions, Diagnostics};
use trellis_core::reactive::{
    delete_property, observe, set_property, Instance, InstanceOptions, Record, Runtime, Sequence,
    WatchOptions, WatchSource,
};
use trellis_core::value::Value;

fn instance(data: Record) -> Instance {
    Instance::new(InstanceOptions::new().data(data)).unwrap()
}

fn counter() -> (Rc<Cell<usize>>, Rc<Cell<usize>>) {
    let count = Rc::new(Cell::new(0));
    (count.clone(), count)
}

/// Observing the same container twice yields the same observer.
#[test]
fn observe_is_idempotent() {
    let record = Value::Record(Record::new().with("a", 1));
    let first = observe(&record, false).unwrap();
    let second = observe(&record, false).unwrap();
    assert!(Rc::ptr_eq(&first, &second));

    let seq: Sequence = vec![Value::from(1)].into_iter().collect();
    let seq = Value::Sequence(seq);
    assert!(Rc::ptr_eq(
        &observe(&seq, false).unwrap(),
        &observe(&seq, false).unwrap()
    ));
}

/// A mutation re-runs the watchers that read the property and no others.
#[test]
fn only_dependent_watchers_rerun() {
    let data = Record::new().with("a", 1).with("b", 1);
    let vm = instance(data.clone());
    let (on_a, seen_a) = counter();
    let (on_b, seen_b) = counter();
    vm.watch(
        "a",
        move |_, _, _| {
            on_a.set(on_a.get() + 1);
            Ok(())
        },
        WatchOptions::default().sync(),
    )
    .unwrap();
    vm.watch(
        "b",
        move |_, _, _| {
            on_b.set(on_b.get() + 1);
            Ok(())
        },
        WatchOptions::default().sync(),
    )
    .unwrap();

    data.set("a", Value::from(2));
    assert_eq!(seen_a.get(), 1);
    assert_eq!(seen_b.get(), 0);
}

/// Replacing a container triggers a shallow watcher; mutating a grandchild
/// it never read does not.
#[test]
fn shallow_watchers_track_only_what_they_read() {
    let inner = Record::new().with("x", 1);
    let obj = Record::new().with("inner", inner.clone());
    let vm = instance(Record::new().with("obj", obj));
    let (hits, seen) = counter();
    vm.watch(
        "obj",
        move |_, _, _| {
            hits.set(hits.get() + 1);
            Ok(())
        },
        WatchOptions::default().sync(),
    )
    .unwrap();

    inner.set("x", Value::from(2));
    assert_eq!(seen.get(), 0);

    vm.set("obj", Value::Record(Record::new().with("inner", Record::new())));
    assert_eq!(seen.get(), 1);
}

/// Deep watchers see the grandchild mutation that shallow ones miss.
#[test]
fn deep_watchers_track_nested_mutations() {
    let inner = Record::new().with("x", 1);
    let vm = instance(Record::new().with("obj", Record::new().with("inner", inner.clone())));
    let (hits, seen) = counter();
    vm.watch(
        "obj",
        move |_, _, _| {
            hits.set(hits.get() + 1);
            Ok(())
        },
        WatchOptions::default().sync().deep(),
    )
    .unwrap();

    inner.set("x", Value::from(2));
    assert_eq!(seen.get(), 1);
}

/// Switching a conditional branch drops the dependencies of the branch no
/// longer taken.
#[test]
fn dependencies_follow_the_active_branch() {
    let data = Record::new().with("flag", true).with("a", 1).with("b", 10);
    let vm = instance(data.clone());
    let (runs, evaluated) = counter();
    let source = WatchSource::getter("branch", move |vm: &Instance| {
        runs.set(runs.get() + 1);
        Ok(if vm.get("flag").is_truthy() {
            vm.get("a")
        } else {
            vm.get("b")
        })
    });
    vm.watch(source, |_, _, _| Ok(()), WatchOptions::default().sync())
        .unwrap();
    assert_eq!(evaluated.get(), 1);

    data.set("b", Value::from(11));
    assert_eq!(evaluated.get(), 1);

    data.set("flag", Value::from(false));
    assert_eq!(evaluated.get(), 2);

    data.set("a", Value::from(2));
    assert_eq!(evaluated.get(), 2);
    data.set("b", Value::from(12));
    assert_eq!(evaluated.get(), 3);
}

/// Several mutations in one tick produce one re-run, after the tick.
#[test]
fn mutations_within_a_tick_are_batched() {
    let data = Record::new().with("n", 0);
    let vm = instance(data.clone());
    let calls = Rc::new(RefCell::new(Vec::new()));
    let sink = calls.clone();
    vm.watch(
        "n",
        move |_, new, old| {
            sink.borrow_mut().push((new.clone(), old.clone()));
            Ok(())
        },
        WatchOptions::default(),
    )
    .unwrap();

    for i in 1..=3 {
        data.set("n", Value::from(i));
    }
    assert!(calls.borrow().is_empty());

    Runtime::tick();
    assert_eq!(*calls.borrow(), vec![(Value::from(3), Value::from(0))]);
}

/// `set_property` and `delete_property` each notify once and toggle
/// reactivity of the key.
#[test]
fn explicit_set_and_delete_notify_once() {
    let obj = Record::new().with("a", 1);
    let vm = instance(Record::new().with("obj", obj.clone()));
    let (hits, seen) = counter();
    vm.watch(
        "obj",
        move |_, _, _| {
            hits.set(hits.get() + 1);
            Ok(())
        },
        WatchOptions::default().sync(),
    )
    .unwrap();

    let target = Value::Record(obj.clone());
    set_property(&target, "b", Value::from(2));
    assert_eq!(seen.get(), 1);
    assert!(obj.is_reactive("b"));

    delete_property(&target, "b");
    assert_eq!(seen.get(), 2);
    assert!(!obj.has("b"));

    set_property(&target, "b", Value::from(3));
    assert_eq!(seen.get(), 3);
    assert!(obj.is_reactive("b"));
}

/// A compiled template renders data and re-renders after a mutation.
#[test]
fn mounted_template_renders_and_updates() {
    let data = Record::new().with("msg", "hi");
    let vm = instance(data.clone());
    let program = Compiler::web().compile_to_functions("<div>{{ msg }}</div>", &CompilerOptions::default());
    assert!(program.errors.is_empty());

    vm.mount(program).unwrap();
    assert_eq!(vm.vnode().unwrap().text_content(), "hi");

    data.set("msg", Value::from("bye"));
    assert_eq!(vm.vnode().unwrap().text_content(), "hi");
    Runtime::tick();
    assert_eq!(vm.vnode().unwrap().text_content(), "bye");
}

/// Lists, filters and event handlers work through the render procedure.
#[test]
fn lists_filters_and_handlers() {
    let items: Sequence = vec![Value::from("a"), Value::from("b")].into_iter().collect();
    let data = Record::new().with("items", items.clone()).with("count", 0);
    let vm = Instance::new(
        InstanceOptions::new()
            .data(data.clone())
            .filter("upper", |args| Ok(Value::from(args[0].to_js_string().to_uppercase()))),
    )
    .unwrap();
    let template = "<div>\
        <ul><li v-for=\"item in items\">{{ item | upper }}</li></ul>\
        <button @click=\"count++\">{{ count }}</button>\
        </div>";
    let program = Compiler::web().compile_to_functions(template, &CompilerOptions::default());
    assert!(program.errors.is_empty(), "{:?}", program.errors);
    vm.mount(program).unwrap();

    let root = vm.vnode().unwrap();
    let lis = root.find_all("li");
    assert_eq!(lis.len(), 2);
    assert_eq!(lis[1].text_content(), "B");

    items.push(Value::from("c"));
    Runtime::tick();
    assert_eq!(vm.vnode().unwrap().find_all("li").len(), 3);

    let button = vm.vnode().unwrap().find_all("button").remove(0);
    button.listener("click").unwrap().call(&[Value::Undefined]).unwrap();
    assert_eq!(data.get("count"), Value::from(1));
    Runtime::tick();
    assert_eq!(vm.vnode().unwrap().find_all("button")[0].text_content(), "1");
}

/// A mismatched close tag is reported and parsing still yields the root.
#[test]
fn mismatched_close_tag_is_reported() {
    let result = compile("<div><span></div>", &CompilerOptions::default());
    assert!(result
        .errors
        .iter()
        .any(|e| e.message.contains("tag <span> has no matching end tag.")));
    assert_eq!(result.ast.unwrap().tag, "div");
}

/// Markup without bindings is hoisted; an interpolation keeps the root
/// dynamic.
#[test]
fn static_markup_is_marked() {
    let result = compile("<div><p>static</p></div>", &CompilerOptions::default());
    let root = result.ast.unwrap();
    assert!(root.is_static);
    assert!(root.static_root);
    assert!(root.element_children().all(|p| p.is_static));

    let result = compile("<div>{{ msg }}</div>", &CompilerOptions::default());
    assert!(!result.ast.unwrap().is_static);
}

/// `v-for` exposes alias, source and iterators on the element.
#[test]
fn v_for_parses_alias_and_iterators() {
    let options = CompilerOptions::web();
    let root = parse(
        "<ul><li v-for=\"item in list\"></li><li v-for=\"(item, idx) in list\"></li></ul>",
        &options,
        &mut Diagnostics::default(),
    )
    .unwrap();
    let mut lis = root.element_children();

    let simple = lis.next().unwrap();
    assert_eq!(simple.for_exp.as_deref(), Some("list"));
    assert_eq!(simple.alias.as_deref(), Some("item"));
    assert_eq!(simple.iterator1, None);

    let indexed = lis.next().unwrap();
    assert_eq!(indexed.alias.as_deref(), Some("item"));
    assert_eq!(indexed.iterator1.as_deref(), Some("idx"));
}

/// Template literals render through the compiled procedure.
#[test]
fn template_literals_interpolate() {
    let data = Record::new().with("b", "z");
    let vm = instance(data.clone());
    let program = Compiler::web().compile_to_functions("<p>{{ `a${b}` }}</p>", &CompilerOptions::default());
    assert!(program.errors.is_empty(), "{:?}", program.errors);
    vm.mount(program).unwrap();
    assert_eq!(vm.vnode().unwrap().text_content(), "az");

    data.set("b", Value::from("y"));
    Runtime::tick();
    assert_eq!(vm.vnode().unwrap().text_content(), "ay");
}

/// Named character references decode against the full HTML set.
#[test]
fn named_entities_render_decoded() {
    let vm = instance(Record::new());
    let program = Compiler::web().compile_to_functions(
        "<p>&alpha;&hearts;&Omega;&le;&nbsp;x</p>",
        &CompilerOptions::default(),
    );
    vm.mount(program).unwrap();
    assert_eq!(vm.vnode().unwrap().text_content(), "α♥Ω≤\u{a0}x");
}

/// A sort comparator that reads the list it is sorting.
#[test]
fn handler_sorts_with_a_comparator_reading_the_list() {
    let list: Sequence = [3, 1, 2].into_iter().map(Value::from).collect();
    let vm = instance(Record::new().with("list", list.clone()));
    let template = "<button @click=\"list.sort((a, b) => a - b + list.length * 0)\">{{ list.join(',') }}</button>";
    let program = Compiler::web().compile_to_functions(template, &CompilerOptions::default());
    assert!(program.errors.is_empty(), "{:?}", program.errors);
    vm.mount(program).unwrap();
    assert_eq!(vm.vnode().unwrap().text_content(), "3,1,2");

    let button = vm.vnode().unwrap();
    button.listener("click").unwrap().call(&[Value::Undefined]).unwrap();
    assert_eq!(list.to_vec(), vec![Value::from(1), Value::from(2), Value::from(3)]);
    Runtime::tick();
    assert_eq!(vm.vnode().unwrap().text_content(), "1,2,3");
}

fn hook_log(
    name: &'static str,
    log: &Rc<RefCell<Vec<String>>>,
    data: Record,
    template: &str,
) -> Instance {
    let before = log.clone();
    let after = log.clone();
    let vm = Instance::new(
        InstanceOptions::new()
            .name(name)
            .data(data)
            .before_update(move |vm| before.borrow_mut().push(format!("before:{}", vm.name())))
            .updated(move |vm| after.borrow_mut().push(format!("updated:{}", vm.name()))),
    )
    .unwrap();
    vm.mount(Compiler::web().compile_to_functions(template, &CompilerOptions::default()))
        .unwrap();
    vm
}

/// `before_update` runs parent first; `updated` runs child first.
#[test]
fn update_hooks_run_parent_then_child_and_back() {
    let shared = Record::new().with("n", 0);
    let log = Rc::new(RefCell::new(Vec::new()));
    let parent = hook_log("Parent", &log, Record::new().with("shared", shared.clone()), "<div>{{ shared.n }}</div>");
    let child = hook_log("Child", &log, Record::new().with("shared", shared.clone()), "<span>{{ shared.n }}</span>");
    assert!(log.borrow().is_empty());

    shared.set("n", Value::from(1));
    Runtime::tick();
    assert_eq!(
        *log.borrow(),
        vec!["before:Parent", "before:Child", "updated:Child", "updated:Parent"]
    );
    assert_eq!(child.vnode().unwrap().text_content(), "1");
    assert_eq!(parent.vnode().unwrap().text_content(), "1");
}

/// A destroyed instance never runs its update hooks again.
#[test]
fn destroyed_instances_skip_update_hooks() {
    let shared = Record::new().with("n", 0);
    let log = Rc::new(RefCell::new(Vec::new()));
    let parent = hook_log("Parent", &log, Record::new().with("shared", shared.clone()), "<div>{{ shared.n }}</div>");
    let child = hook_log("Child", &log, Record::new().with("shared", shared.clone()), "<span>{{ shared.n }}</span>");

    child.destroy();
    shared.set("n", Value::from(1));
    Runtime::tick();
    assert_eq!(*log.borrow(), vec!["before:Parent", "updated:Parent"]);

    parent.destroy();
    shared.set("n", Value::from(2));
    Runtime::tick();
    assert_eq!(log.borrow().len(), 2);
    assert!(child.vnode().is_none());
}

/// An input with a bound type switches between the checkbox, radio and
/// plain model branches as the type changes.
#[test]
fn bound_input_type_selects_the_model_branch() {
    let data = Record::new().with("kind", "text").with("val", true);
    let vm = instance(data.clone());
    let program = Compiler::web().compile_to_functions(
        "<div><input v-model=\"val\" :type=\"kind\"></div>",
        &CompilerOptions::default(),
    );
    assert!(program.errors.is_empty(), "{:?}", program.errors);
    vm.mount(program).unwrap();

    let input = |vm: &Instance| vm.vnode().unwrap().find_all("input").remove(0);
    assert_eq!(input(&vm).data_entry("attrs", "type"), Some(Value::from("text")));

    data.set("kind", Value::from("checkbox"));
    Runtime::tick();
    let checkbox = input(&vm);
    assert_eq!(checkbox.data_entry("attrs", "type"), Some(Value::from("checkbox")));
    assert_eq!(checkbox.data_entry("domProps", "checked"), Some(Value::from(true)));
}

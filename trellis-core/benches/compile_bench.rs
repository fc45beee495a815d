//! Benchmarks for the template compiler and the render loop.
//!
//! Run with: `cargo bench --package trellis-core --bench compile_bench`

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use trellis_core::compiler::{compile, Compiler, CompilerOptions};
use trellis_core::reactive::{Instance, InstanceOptions, Record, Runtime, Sequence};
use trellis_core::value::Value;

const ROW: &str = "<li v-for=\"item in items\" :key=\"item.id\" :class=\"{ done: item.done }\">\
    <input type=\"checkbox\" v-model=\"item.done\">\
    <span @click=\"select(item)\">{{ item.title | upper }}</span>\
    <p class=\"note\"><b>static</b> text</p>\
    </li>";

/// A list template with `sections` sibling lists.
fn template(sections: usize) -> String {
    let mut out = String::from("<div id=\"app\">");
    for i in 0..sections {
        out.push_str(&format!("<section v-if=\"show{i}\"><h2>Section {i}</h2><ul>{ROW}</ul></section>"));
    }
    out.push_str("</div>");
    out
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    let options = CompilerOptions::default();
    for sections in [1, 10, 50] {
        let source = template(sections);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(sections), &source, |b, source| {
            b.iter(|| compile(black_box(source), &options));
        });
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let program = Compiler::web().compile_to_functions(
        "<ul><li v-for=\"item in items\" :key=\"item\">{{ item }}</li></ul>",
        &CompilerOptions::default(),
    );
    for len in [10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("list", len), &len, |b, &len| {
            let items: Sequence = (0..len).map(Value::from).collect();
            let vm = Instance::new(InstanceOptions::new().data(Record::new().with("items", items.clone())))
                .unwrap();
            vm.mount(program.clone()).unwrap();
            b.iter(|| {
                items.push(Value::from(len));
                items.pop();
                Runtime::tick();
                black_box(vm.vnode());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_compile, bench_render);
criterion_main!(benches);

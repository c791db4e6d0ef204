//! Benchmarks for the translation pipeline.
//!
//! Run with: cargo bench --bench translate_bench
//!
//! These benchmarks help track:
//! - Parse time for various input shapes
//! - Full translate time (parse + replace + assembly)
//! - The cost of heavy desugaring (classes, destructuring, templates)

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use jsdown::{ParseOptions, TranslateOptions, parse, translate};

/// Small source with light syntax
const SMALL_SOURCE: &str = r#"
let x = 42;
const y = "hello";
function add(a, b) {
    return a + b;
}
"#;

/// Medium source exercising classes, arrows, and templates
const MEDIUM_SOURCE: &str = r#"
import { fetch } from "net";

class UserService {
    constructor() {
        this.users = [];
    }

    add(user) {
        this.users.push(user);
    }

    find(id) {
        return this.users.filter(u => u.id === id)[0];
    }

    describe(id) {
        let { name, email = "unknown" } = this.find(id);
        return `${name} <${email}>`;
    }

    async load(id) {
        let response = await fetch(`/api/users/${id}`);
        return response.json();
    }
}

export var service = new UserService();
"#;

/// Desugaring-heavy source: every construct the replacer rewrites
const HEAVY_SOURCE: &str = r#"
let pairs = [for (x of xs) if (x.ok) [x.key, x.value]];
for (let [k, v] of pairs) {
    log(`entry ${k} = ${v}`);
}
class Node extends Base {
    constructor(tag, ...children) {
        super(tag);
        this.children = children;
    }
    render() {
        return this.children.map(c => c.render());
    }
}
let make = (tag, ...kids) => new Node(tag, ...kids);
"#;

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for (name, source) in [
        ("small", SMALL_SOURCE),
        ("medium", MEDIUM_SOURCE),
        ("heavy", HEAVY_SOURCE),
    ] {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, source| {
            let options = if name == "medium" {
                ParseOptions {
                    module: true,
                    ..ParseOptions::default()
                }
            } else {
                ParseOptions::default()
            };
            b.iter(|| parse(black_box(source), options).unwrap());
        });
    }
    group.finish();
}

fn bench_translate(c: &mut Criterion) {
    let mut group = c.benchmark_group("translate");
    for (name, source) in [
        ("small", SMALL_SOURCE),
        ("medium", MEDIUM_SOURCE),
        ("heavy", HEAVY_SOURCE),
    ] {
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, source| {
            let options = TranslateOptions {
                module: name == "medium",
                ..TranslateOptions::default()
            };
            b.iter(|| translate(black_box(source), &options).unwrap());
        });
    }
    group.finish();
}

fn bench_translate_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("translate_scaling");
    for repeat in [10usize, 100, 1_000] {
        let source = MEDIUM_SOURCE
            .replace("import { fetch } from \"net\";", "")
            .replace("export var service = new UserService();", "")
            .repeat(repeat)
            .replace("class UserService", "class UserService0");
        // Each repetition must declare a distinct class name
        let source: String = source
            .split("class UserService0")
            .enumerate()
            .map(|(i, part)| {
                if i == 0 {
                    part.to_string()
                } else {
                    format!("class UserService{i}{part}")
                }
            })
            .collect();
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(repeat),
            &source,
            |b, source| {
                b.iter(|| translate(black_box(source), &TranslateOptions::default()).unwrap());
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_translate, bench_translate_scaling);
criterion_main!(benches);

// Copyright 2026 The Bowtie Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Layout throughput on the sample bowtie and on a wide synthetic one.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};

use bowtie_engine::datamodel::{Diagram, Edge, Node, NodeType};
use bowtie_engine::layout::layered::compute_layered_layout;
use bowtie_engine::layout::{LayoutConfig, compute_simple_layout};
use bowtie_engine::scenarios::sample_diagram;

/// `lanes` threats and consequences, each with `depth` barriers.
fn wide_bowtie(lanes: usize, depth: usize) -> Diagram {
    let mut d = Diagram::new("bench", "Synthetic bowtie");
    d.nodes.push(Node::new("h", NodeType::Hazard, "Hazard"));
    d.nodes.push(Node::new("te", NodeType::TopEvent, "Top event"));
    d.edges.push(Edge::new("h-te", "h", "te"));

    for i in 0..lanes {
        let threat = format!("t{i}");
        d.nodes.push(Node::new(&threat, NodeType::Threat, &format!("Threat {i}")));
        let mut prev = threat;
        for j in 0..depth {
            let barrier = format!("pb{i}-{j}");
            d.nodes.push(Node::new(
                &barrier,
                NodeType::PreventionBarrier,
                &format!("PB-{i}.{j} Prevention barrier"),
            ));
            d.edges.push(Edge::new(&format!("{prev}>{barrier}"), &prev, &barrier));
            prev = barrier;
        }
        d.edges.push(Edge::new(&format!("{prev}>te"), &prev, "te"));

        let mut prev = "te".to_string();
        for j in 0..depth {
            let barrier = format!("mb{i}-{j}");
            d.nodes.push(Node::new(
                &barrier,
                NodeType::MitigationBarrier,
                &format!("MB-{i}.{j} Mitigation barrier"),
            ));
            d.edges.push(Edge::new(&format!("{prev}>{barrier}"), &prev, &barrier));
            prev = barrier;
        }
        let consequence = format!("c{i}");
        d.nodes.push(Node::new(
            &consequence,
            NodeType::Consequence,
            &format!("Consequence {i}"),
        ));
        d.edges.push(Edge::new(&format!("{prev}>{consequence}"), &prev, &consequence));
    }
    d
}

fn bench_sample(c: &mut Criterion) {
    let d = sample_diagram();
    c.bench_function("layout/sample", |b| {
        b.iter(|| compute_simple_layout(black_box(&d)));
    });
}

fn bench_wide(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout/wide");
    for lanes in [4, 16, 64] {
        let d = wide_bowtie(lanes, 4);
        group.bench_with_input(BenchmarkId::new("lanes", lanes), &d, |b, d| {
            b.iter(|| compute_simple_layout(black_box(d)));
        });
        group.bench_with_input(BenchmarkId::new("layered", lanes), &d, |b, d| {
            b.iter(|| compute_layered_layout(black_box(d), &LayoutConfig::default()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sample, bench_wide);
criterion_main!(benches);

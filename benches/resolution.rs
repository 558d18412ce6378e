// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 Mcbridge Team

//! Resolution pipeline benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mcbridge::convert::find_identical_surfaces;
use mcbridge::record::{CellRecord, RawSpec, SurfaceRecord};
use mcbridge::{resolve, resolve_with_options, ConvertOptions, ModelRecords};

/// A deck with `pins` pin cells, every surface written twice so the
/// canonicalizer has real work to do.
fn duplicated_pin_deck(pins: u32) -> ModelRecords {
    let mut surfaces = Vec::new();
    let mut cells = Vec::new();
    for i in 0..pins {
        let radius = 0.4 + 0.01 * f64::from(i);
        let inner = 2 * i + 1;
        let outer = 2 * i + 2;
        surfaces.push(SurfaceRecord::new(inner, "cz", vec![radius]));
        surfaces.push(SurfaceRecord::new(outer, "cz", vec![radius]));
        cells.push(CellRecord::new(
            i + 1,
            1,
            -10.0,
            &format!("-{inner}:-{outer}"),
        ));
    }
    ModelRecords {
        surfaces,
        cells,
        transforms: Default::default(),
    }
}

/// A lattice problem shaped like a small assembly.
fn assembly_deck(n: usize) -> ModelRecords {
    let half = 0.63 * n as f64;
    let surfaces = vec![
        SurfaceRecord::new(1, "cz", vec![0.4]),
        SurfaceRecord::new(2, "cz", vec![0.46]),
        SurfaceRecord::new(3, "px", vec![0.63]),
        SurfaceRecord::new(4, "px", vec![-0.63]),
        SurfaceRecord::new(5, "py", vec![0.63]),
        SurfaceRecord::new(6, "py", vec![-0.63]),
        SurfaceRecord::new(10, "rpp", vec![-half, half, -half, half, -half, half]),
    ];
    let mut ids = format!("0:{} 0:{} 0:0", n - 1, n - 1);
    for _ in 0..n * n {
        ids.push_str(" 2");
    }
    let fuel = {
        let mut record = CellRecord::new(1, 1, -10.4, "-1");
        record.parameters.universe = Some(2);
        record
    };
    let clad = {
        let mut record = CellRecord::new(2, 2, -6.5, "1 -2");
        record.parameters.universe = Some(2);
        record
    };
    let water = {
        let mut record = CellRecord::new(3, 3, -0.7, "2");
        record.parameters.universe = Some(2);
        record
    };
    let lattice = {
        let mut record = CellRecord::new(4, 0, 0.0, "-3 4 -5 6");
        record.parameters.universe = Some(1);
        record.parameters.lattice = Some(1);
        record.parameters.fill = Some(RawSpec::new(&ids));
        record
    };
    let core = {
        let mut record = CellRecord::new(5, 0, 0.0, "-10");
        record.parameters.fill = Some(RawSpec::new("1"));
        record
    };
    let outside = {
        let mut record = CellRecord::new(6, 0, 0.0, "10");
        record.parameters.importance = Some(0.0);
        record
    };
    ModelRecords {
        surfaces,
        cells: vec![fuel, clad, water, lattice, core, outside],
        transforms: Default::default(),
    }
}

fn bench_canonicalizer(c: &mut Criterion) {
    let mut group = c.benchmark_group("canonicalizer");

    let keep_duplicates = ConvertOptions {
        merge_surfaces: false,
    };
    for pins in [64, 512] {
        let deck = duplicated_pin_deck(pins);
        let model = resolve_with_options(&deck, &keep_duplicates).unwrap();
        group.bench_with_input(BenchmarkId::new("scan", pins), &model.surfaces, |b, table| {
            b.iter(|| find_identical_surfaces(black_box(table)));
        });
    }

    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve");

    let deck = duplicated_pin_deck(256);
    group.bench_function("duplicated_pins", |b| {
        b.iter(|| resolve(black_box(&deck)).unwrap());
    });
    let no_merge = ConvertOptions {
        merge_surfaces: false,
    };
    group.bench_function("duplicated_pins_no_merge", |b| {
        b.iter(|| resolve_with_options(black_box(&deck), &no_merge).unwrap());
    });

    let assembly = assembly_deck(17);
    group.bench_function("assembly_17x17", |b| {
        b.iter(|| resolve(black_box(&assembly)).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_canonicalizer, bench_resolve);
criterion_main!(benches);

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use itertools::iproduct;
use ramses_octree::io::AmrFileBuilder;
use ramses_octree::selector::SphereSelector;
use ramses_octree::snapshot::{Snapshot, SnapshotParameters};
use ramses_octree::types::LoadOptions;
use std::path::Path;

/// Write a snapshot of `ncpu` domains over an `n^3` coarse grid, each domain holding a
/// slab of root octs, one refined child per root oct and a ghost layer of its neighbours.
fn write_snapshot(dir: &Path, ncpu: usize, n: usize) -> SnapshotParameters {
    let parameters = SnapshotParameters::new(dir.join("info_00001.txt"), ncpu, 1.0);
    let w = 1.0 / n as f64;
    let slabs = (0..ncpu)
        .map(|cpu| {
            iproduct!(cpu * n / ncpu..(cpu + 1) * n / ncpu, 0..n, 0..n)
                .map(|(k, j, i)| {
                    [
                        (i as f64 + 0.5) * w,
                        (j as f64 + 0.5) * w,
                        (k as f64 + 0.5) * w,
                    ]
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
    for (cpu, slab) in slabs.iter().enumerate() {
        let mut amr = AmrFileBuilder::new(ncpu, 2).with_nx([n, n, n]);
        amr.add_grids(cpu, 0, slab);
        let children = slab.iter().map(|c| c.map(|x| x - 0.25 * w)).collect::<Vec<_>>();
        amr.add_grids(cpu, 1, &children);
        for neighbour in [cpu.wrapping_sub(1), cpu + 1] {
            if let Some(ghosts) = slabs.get(neighbour) {
                amr.add_grids(neighbour, 0, &ghosts[..n * n]);
            }
        }
        amr.write_to_path(parameters.domain_file("amr", cpu + 1).unwrap())
            .unwrap();
    }
    parameters
}

pub fn assembly_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("assembly");
    group.sample_size(20);

    let dir = tempfile::tempdir().unwrap();
    let parameters = write_snapshot(dir.path(), 8, 32);

    for parallel in [false, true] {
        let options = LoadOptions {
            parallel,
            ..Default::default()
        };
        group.bench_function(
            format!("Load 8 domains of a 32^3 grid (parallel: {parallel})"),
            |b| {
                b.iter(|| black_box(<Snapshot>::load(parameters.clone(), options).unwrap()))
            },
        );
    }

    let snapshot: Snapshot = Snapshot::load(parameters.clone(), LoadOptions::default()).unwrap();
    let sphere = SphereSelector::new([0.5; 3], 0.25);
    group.bench_function("Resolve a sphere selection", |b| {
        b.iter(|| black_box(snapshot.handler().resolve_selection(&sphere)))
    });
    group.finish();
}

criterion_group!(benches, assembly_benchmark);
criterion_main!(benches);

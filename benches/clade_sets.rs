use criterion::{
    BenchmarkId, Criterion, Throughput, criterion_group, criterion_main,
};
use monophyly::{
    LeafIdResolver, SplitOptions, TaxaBlock, TreesToSplits, Tree,
    build_clade_sets, parse_newick,
};
use std::hint::black_box;

fn balanced_newick(depth: usize) -> String {
    fn subtree(counter: &mut i64, depth: usize) -> String {
        if depth == 0 {
            *counter += 1;
            format!("t{}_ott{}", counter, counter)
        } else {
            format!(
                "({},{})",
                subtree(counter, depth - 1),
                subtree(counter, depth - 1)
            )
        }
    }
    let mut counter: i64 = 0;
    format!("{};", subtree(&mut counter, depth))
}

fn prepare_tree(depth: usize) -> (Tree, TaxaBlock) {
    let mut tree = parse_newick(&balanced_newick(depth))
        .expect("generated tree parses")
        .remove(0);
    let mut taxa = TaxaBlock::new();
    taxa.index_tree(&mut tree);
    (tree, taxa)
}

fn bench_clade_sets(c: &mut Criterion) {
    let mut group = c.benchmark_group("clade_sets");
    let _ = group.sample_size(30);

    for depth in [8, 12] {
        let (tree, taxa) = prepare_tree(depth);
        let _ = group.throughput(Throughput::Elements(
            tree.tip_count_all() as u64,
        ));
        let _ = group.bench_with_input(
            BenchmarkId::from_parameter(tree.tip_count_all()),
            &tree,
            |b, tree| {
                let resolver = LeafIdResolver::new(&taxa);
                b.iter(|| {
                    build_clade_sets(black_box(tree), &resolver)
                        .expect("clade sets build")
                });
            },
        );
    }

    group.finish();
}

fn bench_split_accumulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("split_accumulation");
    let _ = group.sample_size(30);

    for depth in [8, 12] {
        let (tree, taxa) = prepare_tree(depth);
        let options = SplitOptions {
            track_freq: true,
            track_occurrence: true,
            ..SplitOptions::default()
        };
        let _ = group.throughput(Throughput::Elements(
            tree.tip_count_all() as u64,
        ));
        let _ = group.bench_with_input(
            BenchmarkId::from_parameter(tree.tip_count_all()),
            &tree,
            |b, tree| {
                b.iter(|| {
                    let mut tts = TreesToSplits::new(options);
                    tts.record_tree(0, black_box(tree), &taxa)
                        .expect("record");
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_clade_sets, bench_split_accumulation);
criterion_main!(benches);

use monophyly::{
    AnalysisError, Split, SplitOptions, TaxaBlock, TreesToSplits, Tree,
    parse_newick,
};

fn indexed_tree(s: &str, taxa: &mut TaxaBlock) -> Tree {
    let mut tree = parse_newick(s).expect("parse").remove(0);
    taxa.index_tree(&mut tree);
    tree
}

fn key(n_tax: usize, indices: &[usize]) -> Split {
    let mut split = Split::new(n_tax);
    for &index in indices {
        split.set_index(index);
    }
    split
}

#[test]
fn test_shared_bipartition_counting_and_inclusion() {
    let mut taxa = TaxaBlock::new();
    let t1 = indexed_tree("((A,B),(C,D));", &mut taxa);
    let t2 = indexed_tree("((A,B),(C,D));", &mut taxa);
    let t3 = indexed_tree("((A,C),(B,D));", &mut taxa);

    let mut tts = TreesToSplits::new(SplitOptions {
        track_freq: true,
        track_occurrence: true,
        treat_as_rooted: true,
        ..SplitOptions::default()
    });
    for tree in [&t1, &t2, &t3] {
        tts.record_tree(0, tree, &taxa).expect("record");
    }
    assert_eq!(tts.tree_count(0), 3);

    let splits = tts.splits(0).expect("block 0 exists");
    assert_eq!(splits.len(), 4, "Two splits per tree shape, two shapes");

    // {A,B} occurs in trees 0 and 1, not in tree 2.
    let info = splits.get(&key(4, &[0, 1])).expect("{A,B} was recorded");
    assert_eq!(info.n_times, 2);
    assert_eq!(
        info.inclusion.iter().copied().collect::<Vec<usize>>(),
        vec![0, 1]
    );

    let info = splits.get(&key(4, &[0, 2])).expect("{A,C} was recorded");
    assert_eq!(info.n_times, 1);
    assert_eq!(
        info.inclusion.iter().copied().collect::<Vec<usize>>(),
        vec![2]
    );
}

#[test]
fn test_canonical_keys_are_identical_across_rootings() {
    let mut taxa = TaxaBlock::new();
    let t1 = indexed_tree("((A,B),(C,D));", &mut taxa);
    let t2 = indexed_tree("((C,D),(A,B));", &mut taxa);

    let mut tts = TreesToSplits::new(SplitOptions {
        track_freq: true,
        track_occurrence: true,
        ..SplitOptions::default()
    });
    tts.record_tree(0, &t1, &taxa).expect("record");
    tts.record_tree(0, &t2, &taxa).expect("record");

    let splits = tts.splits(0).expect("block 0 exists");
    assert_eq!(
        splits.len(),
        1,
        "Unrooted, {{A,B}} and {{C,D}} canonicalize to the same key"
    );
    let info = splits.get(&key(4, &[2, 3])).expect("canonical key");
    assert_eq!(info.n_times, 4, "Both edges of both trees fold together");
    assert_eq!(
        info.inclusion.iter().copied().collect::<Vec<usize>>(),
        vec![0, 1]
    );
    assert!(
        !splits.contains_key(&key(4, &[0, 1])),
        "The bit-0 side is never a canonical representative"
    );
}

#[test]
fn test_inversion_is_idempotent_and_joins_complements() {
    let mut with_bit0 = key(5, &[0, 2]);
    let complement = key(5, &[1, 3, 4]);

    with_bit0.invert_if_needed();
    assert_eq!(
        with_bit0, complement,
        "A split containing taxon 0 canonicalizes to its complement"
    );

    let once = with_bit0.clone();
    with_bit0.invert_if_needed();
    assert_eq!(with_bit0, once, "Canonicalization is idempotent");

    let mut without_bit0 = key(5, &[1, 3]);
    let original = without_bit0.clone();
    without_bit0.invert_if_needed();
    assert_eq!(without_bit0, original, "Bit 0 clear means no inversion");
}

#[test]
fn test_trivial_splits_only_on_request() {
    let mut taxa = TaxaBlock::new();
    let tree = indexed_tree("((A,B),(C,D));", &mut taxa);

    let mut quiet = TreesToSplits::new(SplitOptions {
        track_freq: true,
        treat_as_rooted: true,
        ..SplitOptions::default()
    });
    quiet.record_tree(0, &tree, &taxa).expect("record");
    assert_eq!(quiet.splits(0).expect("block").len(), 2);
    for split in quiet.splits(0).expect("block").keys() {
        assert!(!split.is_trivial(), "No trivial splits unless requested");
    }

    let mut verbose = TreesToSplits::new(SplitOptions {
        track_freq: true,
        treat_as_rooted: true,
        track_trivial: true,
        ..SplitOptions::default()
    });
    verbose.record_tree(0, &tree, &taxa).expect("record");
    let splits = verbose.splits(0).expect("block");
    assert_eq!(splits.len(), 6, "Four tip splits join the two internals");
    assert!(splits.contains_key(&key(4, &[0])));
}

#[test]
fn test_edge_length_and_height_summaries() {
    let mut taxa = TaxaBlock::new();
    let t1 = indexed_tree("((A:1,B:2):3,(C:1,D:1):1);", &mut taxa);
    let t2 = indexed_tree("((A:1,B:2):5,(C:1,D:1):1);", &mut taxa);
    assert!((t1.height() - 5.0).abs() < 1e-9);

    let mut tts = TreesToSplits::new(SplitOptions {
        track_freq: true,
        track_edge_len_summary: true,
        track_height_summary: true,
        treat_as_rooted: true,
        ..SplitOptions::default()
    });
    tts.record_tree(0, &t1, &taxa).expect("record");
    tts.record_tree(0, &t2, &taxa).expect("record");

    let splits = tts.splits(0).expect("block");
    let ab = splits.get(&key(4, &[0, 1])).expect("{A,B}");
    assert_eq!(ab.n_times, 2);
    assert!((ab.mean_edge_length().expect("mean") - 4.0).abs() < 1e-9);
    assert!(
        (ab.edge_length_variance().expect("variance") - 2.0).abs() < 1e-9,
        "Sample variance of 3 and 5 is 2"
    );
    assert!(
        (ab.mean_height().expect("mean height") - 2.0).abs() < 1e-9,
        "Height of the (A,B) node is its longer tip path"
    );

    let cd = splits.get(&key(4, &[2, 3])).expect("{C,D}");
    assert!((cd.mean_edge_length().expect("mean") - 1.0).abs() < 1e-9);
    assert!((cd.mean_height().expect("mean height") - 1.0).abs() < 1e-9);
}

#[test]
fn test_raw_lists_instead_of_summaries() {
    let mut taxa = TaxaBlock::new();
    let tree = indexed_tree("((A:1,B:2):3,(C:1,D:1):1);", &mut taxa);

    let mut tts = TreesToSplits::new(SplitOptions {
        track_edge_len: true,
        treat_as_rooted: true,
        ..SplitOptions::default()
    });
    tts.record_tree(0, &tree, &taxa).expect("record");

    let splits = tts.splits(0).expect("block");
    let ab = splits.get(&key(4, &[0, 1])).expect("{A,B}");
    assert_eq!(ab.edge_lengths, vec![3.0]);
    assert_eq!(ab.edge_len_sum, 0.0, "Summary fields stay untouched");
}

#[test]
fn test_taxa_block_scopes_are_separate() {
    let mut taxa4 = TaxaBlock::new();
    let small = indexed_tree("((A,B),(C,D));", &mut taxa4);
    let mut taxa5 = TaxaBlock::new();
    let large = indexed_tree("((A,B),(C,D,E));", &mut taxa5);

    let mut tts = TreesToSplits::new(SplitOptions {
        track_freq: true,
        treat_as_rooted: true,
        ..SplitOptions::default()
    });
    tts.record_tree(0, &small, &taxa4).expect("record");
    tts.record_tree(1, &large, &taxa5).expect("record");

    assert_eq!(tts.tree_count(0), 1);
    assert_eq!(tts.tree_count(1), 1);
    for split in tts.splits(0).expect("block 0").keys() {
        assert_eq!(split.n_tax(), 4);
    }
    for split in tts.splits(1).expect("block 1").keys() {
        assert_eq!(split.n_tax(), 5);
    }
}

#[test]
fn test_unindexed_tip_is_an_error() {
    let mut taxa = TaxaBlock::new();
    let tree = indexed_tree("(A,B,);", &mut taxa);

    let mut tts = TreesToSplits::new(SplitOptions {
        track_freq: true,
        treat_as_rooted: true,
        ..SplitOptions::default()
    });
    let result = tts.record_tree(0, &tree, &taxa);
    assert!(
        matches!(result, Err(AnalysisError::MissingTaxonIndex(_))),
        "A tip outside the taxa block cannot be encoded"
    );
}

#[test]
fn test_report_rendering() {
    let mut taxa = TaxaBlock::new();
    let tree = indexed_tree("((A,B),(C,D));", &mut taxa);

    let mut tts = TreesToSplits::new(SplitOptions {
        track_freq: true,
        treat_as_rooted: true,
        ..SplitOptions::default()
    });
    tts.record_tree(0, &tree, &taxa).expect("record");

    let report = tts.report(0, &taxa).expect("block 0 exists");
    assert!(report.contains("TRANSLATE"), "{report}");
    assert!(report.contains("        1 A,"), "{report}");
    assert!(report.contains("Tree star = [&R] (1,2,3,4);"), "{report}");
    assert!(report.contains("Tree split_1 = [&R] [&W 1] ((1,2),3,4);"), "{report}");
}

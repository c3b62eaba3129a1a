use monophyly::{
    LeafId, LeafIdError, LeafIdResolver, TaxaBlock, leaf_id_from_label,
    parse_newick,
};
use rustc_hash::FxHashMap;

#[test]
fn test_trailing_digit_run_extraction() {
    let test_cases = vec![
        ("Homo_sapiens_ott770315", 770315),
        ("ott42", 42),
        ("770315", 770315),
        ("x9", 9),
        ("a1b2", 2),
    ];

    for (label, expected) in test_cases {
        let id = leaf_id_from_label(label)
            .unwrap_or_else(|err| panic!("{label} should resolve: {err}"));
        assert_eq!(id.value(), expected, "Wrong id for {label}");
    }
}

#[test]
fn test_extraction_failures_are_distinct() {
    assert_eq!(leaf_id_from_label(""), Err(LeafIdError::Absent));
    assert_eq!(leaf_id_from_label("unlabeled"), Err(LeafIdError::NotNumeric));
    assert_eq!(leaf_id_from_label("ott12x"), Err(LeafIdError::NotNumeric));
}

#[test]
fn test_display_uses_ott_prefix() {
    let id = LeafId::new(770315).expect("non-negative");
    assert_eq!(id.to_string(), "ott770315");
    assert!(LeafId::new(-1).is_none(), "Negative values are not ids");
}

#[test]
fn test_resolver_falls_back_to_taxon_labels() {
    // Two unnamed tips; the first gets a taxon index into the block.
    let mut trees = parse_newick("(,);").expect("Should parse");
    let mut tree = trees.remove(0);
    let tips = tree.tip_node_ids_all();
    assert_eq!(tips.len(), 2);

    let mut taxa = TaxaBlock::new();
    let index = taxa.intern("ott42");
    assert_eq!(taxa.index_of("ott42"), Some(index));
    assert_eq!(taxa.len(), 1);
    tree.set_taxon_index(tips[0], Some(index));

    let resolver = LeafIdResolver::new(&taxa);
    let id = resolver.resolve(&tree, tips[0]).expect("taxon label resolves");
    assert_eq!(id.value(), 42);
    assert_eq!(resolver.resolve(&tree, tips[1]), Err(LeafIdError::Absent));
}

#[test]
fn test_resolver_override_wins() {
    let mut trees = parse_newick("(ott7,ott8);").expect("Should parse");
    let tree = trees.remove(0);
    let tips = tree.tip_node_ids_all();

    let taxa = TaxaBlock::new();
    let mut overrides: FxHashMap<_, _> = FxHashMap::default();
    overrides.insert(tips[0], LeafId::new(99).expect("valid"));

    let resolver = LeafIdResolver::new(&taxa).with_overrides(&overrides);
    assert_eq!(resolver.resolve(&tree, tips[0]).expect("override").value(), 99);
    assert_eq!(resolver.resolve(&tree, tips[1]).expect("name").value(), 8);
}

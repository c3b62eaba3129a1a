use monophyly::{
    AnalysisError, CladeSet, LeafId, LeafIdResolver, TaxaBlock, Taxonomy,
    build_clade_sets, expand_tip_taxa, parse_newick,
};

const TAX: &str = "((ott6,ott7,ott8)ott5,ott9)ott4;";

fn ids(values: &[i64]) -> CladeSet {
    values.iter().map(|&v| LeafId::new(v).expect("non-negative")).collect()
}

fn id(value: i64) -> LeafId {
    LeafId::new(value).expect("non-negative")
}

fn taxonomy() -> (Taxonomy, TaxaBlock) {
    let taxa = TaxaBlock::new();
    let tree = parse_newick(TAX).expect("parse taxonomy").remove(0);
    let taxonomy = Taxonomy::build(tree, &taxa).expect("build taxonomy");
    (taxonomy, taxa)
}

#[test]
fn test_taxonomy_classifies_terminal_and_higher_taxa() {
    let (taxonomy, _taxa) = taxonomy();
    assert!(taxonomy.is_leaf_taxon(id(6)));
    assert!(taxonomy.is_leaf_taxon(id(9)));
    assert!(!taxonomy.is_leaf_taxon(id(5)), "ott5 is a higher taxon");
    assert!(!taxonomy.is_leaf_taxon(id(4)), "the root is a higher taxon");
    assert_eq!(
        taxonomy.tip_descendants(id(5)).expect("descendants"),
        ids(&[6, 7, 8])
    );
    assert_eq!(
        taxonomy.tip_descendants(id(4)).expect("descendants"),
        ids(&[6, 7, 8, 9])
    );
}

#[test]
fn test_higher_taxon_tip_becomes_star_polytomy() {
    let (taxonomy, taxa) = taxonomy();
    let mut source = parse_newick("(ott5,ott9);").expect("parse").remove(0);

    let expansion =
        expand_tip_taxa(&mut source, &taxonomy, &taxa).expect("expand");

    let expanded_id =
        source.node_id_by_label("ott5").expect("node kept its name");
    assert_eq!(
        source.child_count(&expanded_id),
        3,
        "ott5 must gain one child per terminal descendant"
    );
    assert_eq!(expansion.overrides.len(), 3);
    assert_eq!(
        expansion.taboo.keys().copied().collect::<CladeSet>(),
        ids(&[6, 7, 8])
    );

    // Leaf-set preservation: the expanded node subtends exactly the
    // taxonomy's terminal descendants, and no id occurs twice.
    let resolver =
        LeafIdResolver::new(&taxa).with_overrides(&expansion.overrides);
    let clades = build_clade_sets(&source, &resolver).expect("clade sets");
    assert_eq!(clades.get(expanded_id), Some(&ids(&[6, 7, 8])));
    let root = source.first_node_id().expect("root");
    let root_clade = clades.get(root).expect("root clade");
    assert_eq!(root_clade, &ids(&[6, 7, 8, 9]));
    assert_eq!(
        source.tip_node_ids_all().len(),
        root_clade.len(),
        "One tip per id; no duplicates anywhere in the expanded tree"
    );
}

#[test]
fn test_terminal_tips_are_left_alone() {
    let (taxonomy, taxa) = taxonomy();
    let mut source = parse_newick("(ott6,ott9);").expect("parse").remove(0);
    let expansion =
        expand_tip_taxa(&mut source, &taxonomy, &taxa).expect("expand");
    assert!(expansion.overrides.is_empty());
    assert!(expansion.taboo.is_empty());
    assert_eq!(source.tip_count_all(), 2);
}

#[test]
fn test_unknown_taxon_is_fatal() {
    let (taxonomy, taxa) = taxonomy();
    let mut source = parse_newick("(ott99,ott9);").expect("parse").remove(0);
    let result = expand_tip_taxa(&mut source, &taxonomy, &taxa);
    match result {
        Err(AnalysisError::NotInTaxonomy(id)) => assert_eq!(id.value(), 99),
        other => panic!("Expected NotInTaxonomy, got {other:?}"),
    }
}

use monophyly::{
    AnalysisError, CladeSet, LeafId, LeafIdResolver, TaxaBlock,
    build_clade_sets, parse_newick,
};

fn ids(values: &[i64]) -> CladeSet {
    values.iter().map(|&v| LeafId::new(v).expect("non-negative")).collect()
}

#[test]
fn test_clade_sets_are_exact_child_unions() {
    let trees = parse_newick("((ott1,ott2,ott3),((ott4,ott5),ott6));")
        .expect("Should parse");
    let tree = &trees[0];
    let taxa = TaxaBlock::new();
    let resolver = LeafIdResolver::new(&taxa);
    let clades = build_clade_sets(tree, &resolver).expect("Should build");

    for node_id in tree.preorder_node_ids() {
        let clade = clades.get(node_id).expect("Every node has a clade set");
        if tree.child_count(&node_id) == 0 {
            assert_eq!(clade.len(), 1, "Leaf clade sets are singletons");
            continue;
        }
        let mut union = CladeSet::new();
        for child_id in tree.child_ids(&node_id) {
            let child_clade = clades.get(*child_id).expect("child present");
            assert!(
                clade.is_superset(child_clade),
                "Parent clade must contain each child clade"
            );
            union.extend(child_clade.iter().copied());
        }
        assert_eq!(
            clade, &union,
            "Internal clade must equal the union of child clades exactly"
        );
    }

    let root = tree.first_node_id().expect("root");
    assert_eq!(clades.get(root), Some(&ids(&[1, 2, 3, 4, 5, 6])));
}

#[test]
fn test_leaf_singletons() {
    let trees = parse_newick("(ott10,ott20);").expect("Should parse");
    let tree = &trees[0];
    let taxa = TaxaBlock::new();
    let resolver = LeafIdResolver::new(&taxa);
    let clades = build_clade_sets(tree, &resolver).expect("Should build");

    let tips = tree.tip_node_ids_all();
    assert_eq!(clades.get(tips[0]), Some(&ids(&[10])));
    assert_eq!(clades.get(tips[1]), Some(&ids(&[20])));
}

#[test]
fn test_unresolvable_leaf_is_fatal() {
    let trees = parse_newick("(alpha,beta);").expect("Should parse");
    let tree = &trees[0];
    let taxa = TaxaBlock::new();
    let resolver = LeafIdResolver::new(&taxa);
    let result = build_clade_sets(tree, &resolver);
    assert!(
        matches!(result, Err(AnalysisError::UnresolvedLeaf { .. })),
        "A leaf without an identifier must abort the pass"
    );
}

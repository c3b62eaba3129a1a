use monophyly::{
    MatchPolicy, SupportAnalysis, TaxaBlock, check_named_nodes, parse_newick,
};

fn setup(ref_str: &str, tax_str: &str) -> (SupportAnalysis, TaxaBlock) {
    let taxa = TaxaBlock::new();
    let mut analysis = SupportAnalysis::new();
    let ref_tree = parse_newick(ref_str).expect("parse reference").remove(0);
    analysis.process_tree(ref_tree, &taxa).expect("reference accepted");
    let tax_tree = parse_newick(tax_str).expect("parse taxonomy").remove(0);
    analysis.process_tree(tax_tree, &taxa).expect("taxonomy accepted");
    (analysis, taxa)
}

#[test]
fn test_matching_named_node_passes_quietly() {
    let (analysis, taxa) = setup(
        "((ott1,ott2)ott10,(ott3,ott4));",
        "((ott1,ott2)ott10,(ott3,ott4)ott11)ott12;",
    );
    let report = check_named_nodes(&analysis, &taxa, MatchPolicy::Exact)
        .expect("check runs");
    assert_eq!(report.mismatches, 0);
    assert!(report.text.is_empty(), "{}", report.text);
}

#[test]
fn test_exact_policy_reports_leaf_set_difference() {
    let (analysis, taxa) = setup(
        "((ott1,ott2,ott3)ott10,ott4);",
        "(((ott1,ott2)ott10,ott3)ott11,ott4)ott12;",
    );
    let report = check_named_nodes(&analysis, &taxa, MatchPolicy::Exact)
        .expect("check runs");
    assert_eq!(report.mismatches, 1);
    assert!(report.text.contains("ott10 incorrect:"), "{}", report.text);
    assert!(
        report.text.contains("ott3 is in synth but not taxonomy"),
        "{}",
        report.text
    );
    assert!(
        report.text.contains("Could not find the leaf set"),
        "{}",
        report.text
    );
}

#[test]
fn test_climb_and_retry_policy_finds_superset_ancestor() {
    let (analysis, taxa) = setup(
        "((ott1,ott2,ott3)ott10,ott4);",
        "(((ott1,ott2)ott10,ott3)ott11,ott4)ott12;",
    );
    let report =
        check_named_nodes(&analysis, &taxa, MatchPolicy::ClimbAndRetry)
            .expect("check runs");
    assert_eq!(
        report.mismatches, 0,
        "Climbing the taxonomy reaches the identical leaf set"
    );
    assert!(
        report.text.contains("Found identical leaf sets"),
        "{}",
        report.text
    );
    assert!(
        report.text.contains("\"ott11\""),
        "The match is the climbed-to ancestor:\n{}",
        report.text
    );
}

#[test]
fn test_reference_side_climb() {
    // The reference's ott10 holds a subset of the taxonomy's; climbing the
    // reference side reaches the full set.
    let (analysis, taxa) = setup(
        "(((ott1,ott2)ott10,ott3),ott4);",
        "((ott1,ott2,ott3)ott10,ott4)ott12;",
    );

    let exact = check_named_nodes(&analysis, &taxa, MatchPolicy::Exact)
        .expect("check runs");
    assert_eq!(exact.mismatches, 1);

    let climbed =
        check_named_nodes(&analysis, &taxa, MatchPolicy::ClimbAndRetry)
            .expect("check runs");
    assert_eq!(climbed.mismatches, 0);
}

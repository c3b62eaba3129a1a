use crate::analysis::AnalysisError;
use crate::analysis::clades::{CladeSet, build_clade_sets};
use crate::analysis::leaf_id::{LeafId, LeafIdResolver};
use crate::analysis::support::SupportAnalysis;
use crate::phylo::node::NodeId;
use crate::phylo::taxa::TaxaBlock;
use crate::phylo::tree::Tree;
use slotmap::SecondaryMap;

/// How a named reference node's leaf set is matched against the taxonomy
/// node of the same identifier.
///
/// `Exact` is the baseline: only leaf-set equality counts. `ClimbAndRetry`
/// additionally climbs to the parent on whichever side currently holds the
/// proper subset, retrying until the subset relation breaks. The two policies
/// answer different questions, so the choice is explicit rather than baked
/// in.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum MatchPolicy {
    #[default]
    Exact,
    ClimbAndRetry,
}

#[derive(Debug, Clone)]
pub struct TaxonCheckReport {
    /// Named reference nodes whose leaf set could not be matched.
    pub mismatches: usize,
    pub text: String,
}

/// Verifies every identifier-carrying internal node of the reference tree
/// against the taxonomy: the reference's clade for `ott<N>` should contain
/// exactly the leaves the taxonomy puts under `ott<N>`. Also reports any
/// difference between the two trees' overall leaf sets.
pub fn check_named_nodes(
    analysis: &SupportAnalysis,
    taxa: &TaxaBlock,
    policy: MatchPolicy,
) -> Result<TaxonCheckReport, AnalysisError> {
    let Some(reference) = analysis.reference() else {
        return Err(AnalysisError::Corrupt(
            "taxonomy check requires the reference tree".to_string(),
        ));
    };
    let Some(taxonomy) = analysis.taxonomy() else {
        return Err(AnalysisError::Corrupt(
            "taxonomy check requires the taxonomy tree".to_string(),
        ));
    };

    let resolver = LeafIdResolver::new(taxa);
    let ref_clades = build_clade_sets(reference.tree(), &resolver)?;
    let tax_clades = build_clade_sets(taxonomy.tree(), &resolver)?;

    let climb = policy == MatchPolicy::ClimbAndRetry;
    let mut text = String::new();
    let mut mismatches: usize = 0;

    for &(node_id, id) in reference.named_nodes() {
        let tax_node_id =
            taxonomy.node_of(id).ok_or(AnalysisError::NotInTaxonomy(id))?;
        let matched = check_equivalent(
            &mut text,
            id,
            reference.tree(),
            node_id,
            &ref_clades,
            taxonomy.tree(),
            tax_node_id,
            &tax_clades,
            true,
            climb,
            climb,
        )?;
        if !matched {
            mismatches += 1;
            text.push_str(&format!(
                "        Could not find the leaf set of \"{id}\" in any taxonomic node.\n"
            ));
        }
    }

    let ref_leaf_set = root_clade(reference.tree(), &ref_clades)?;
    let tax_leaf_set = root_clade(taxonomy.tree(), &tax_clades)?;
    if ref_leaf_set != tax_leaf_set {
        write_set_diff(
            &mut text,
            "",
            ref_leaf_set,
            "synth",
            tax_leaf_set,
            "taxonomy",
        );
    }

    Ok(TaxonCheckReport { mismatches, text })
}

fn root_clade<'a>(
    tree: &Tree,
    clades: &'a SecondaryMap<NodeId, CladeSet>,
) -> Result<&'a CladeSet, AnalysisError> {
    let root = tree.first_node_id().ok_or_else(|| {
        AnalysisError::Corrupt("tree has no root node".to_string())
    })?;
    clades.get(root).ok_or_else(|| {
        AnalysisError::Corrupt("root node has no clade set".to_string())
    })
}

#[allow(clippy::too_many_arguments)]
fn check_equivalent(
    out: &mut String,
    id: LeafId,
    ref_tree: &Tree,
    ref_node_id: NodeId,
    ref_clades: &SecondaryMap<NodeId, CladeSet>,
    tax_tree: &Tree,
    tax_node_id: NodeId,
    tax_clades: &SecondaryMap<NodeId, CladeSet>,
    top_level: bool,
    climb_ref: bool,
    climb_tax: bool,
) -> Result<bool, AnalysisError> {
    let ref_set = ref_clades.get(ref_node_id).ok_or_else(|| {
        AnalysisError::Corrupt("reference node has no clade set".to_string())
    })?;
    let tax_set = tax_clades.get(tax_node_id).ok_or_else(|| {
        AnalysisError::Corrupt("taxonomy node has no clade set".to_string())
    })?;

    if ref_set == tax_set {
        if !top_level {
            out.push_str(&format!(
                "        Found identical leaf sets for the synthetic node \"{}\" and the taxonomic node \"{}\".\n",
                label_or_blank(ref_tree, ref_node_id),
                label_or_blank(tax_tree, tax_node_id),
            ));
        }
        return Ok(true);
    }

    if top_level {
        out.push_str(&format!("{id} incorrect:\n"));
        write_set_diff(out, "    ", ref_set, "synth", tax_set, "taxonomy");
    }
    if climb_ref && is_proper_subset(ref_set, tax_set) {
        if let Some(parent_id) = ref_tree.parent_id(&ref_node_id) {
            return check_equivalent(
                out, id, ref_tree, *parent_id, ref_clades, tax_tree,
                tax_node_id, tax_clades, false, true, false,
            );
        }
    } else if climb_tax && is_proper_subset(tax_set, ref_set) {
        if let Some(parent_id) = tax_tree.parent_id(&tax_node_id) {
            return check_equivalent(
                out, id, ref_tree, ref_node_id, ref_clades, tax_tree,
                *parent_id, tax_clades, false, false, true,
            );
        }
    }
    Ok(false)
}

fn label_or_blank(tree: &Tree, node_id: NodeId) -> String {
    tree.label(&node_id).map(|name| name.to_string()).unwrap_or_default()
}

fn is_proper_subset(small: &CladeSet, big: &CladeSet) -> bool {
    small.len() < big.len() && small.iter().all(|id| big.contains(id))
}

fn write_set_diff(
    out: &mut String,
    indent: &str,
    first: &CladeSet,
    first_name: &str,
    second: &CladeSet,
    second_name: &str,
) {
    for id in first {
        if !second.contains(id) {
            out.push_str(&format!(
                "{indent}{id} is in {first_name} but not {second_name}\n"
            ));
        }
    }
    for id in second {
        if !first.contains(id) {
            out.push_str(&format!(
                "{indent}{id} is in {second_name} but not {first_name}\n"
            ));
        }
    }
}

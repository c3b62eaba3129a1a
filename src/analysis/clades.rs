use crate::analysis::AnalysisError;
use crate::analysis::leaf_id::{LeafId, LeafIdResolver};
use crate::phylo::node::NodeId;
use crate::phylo::tree::Tree;
use slotmap::SecondaryMap;
use std::collections::BTreeSet;

/// The set of leaf identifiers reachable below a node.
pub type CladeSet = BTreeSet<LeafId>;

/// Labels every node of `tree` with the [`CladeSet`] of its subtree.
///
/// Single reverse-preorder pass: leaves become singletons, internal nodes the
/// union of their children's already-computed sets. A leaf that does not
/// resolve to an identifier makes the whole pass fail, since every downstream
/// comparison is meaningless with an incomplete leaf universe. The returned
/// map is valid only for this `tree` instance; node identities are never
/// shared across trees.
pub fn build_clade_sets(
    tree: &Tree,
    resolver: &LeafIdResolver,
) -> Result<SecondaryMap<NodeId, CladeSet>, AnalysisError> {
    let mut clades: SecondaryMap<NodeId, CladeSet> = SecondaryMap::new();
    let preorder = tree.preorder_node_ids();
    for &node_id in preorder.iter().rev() {
        if tree.child_count(&node_id) == 0 {
            let id = resolver.resolve(tree, node_id).map_err(|source| {
                AnalysisError::UnresolvedLeaf {
                    label: resolver.display_label(tree, node_id),
                    source,
                }
            })?;
            clades.insert(node_id, CladeSet::from([id]));
        } else {
            let mut clade = CladeSet::new();
            for child_id in tree.child_ids(&node_id) {
                let child_clade = clades.get(*child_id).ok_or_else(|| {
                    AnalysisError::Corrupt(
                        "child clade set missing during bottom-up pass"
                            .to_string(),
                    )
                })?;
                clade.extend(child_clade.iter().copied());
            }
            clades.insert(node_id, clade);
        }
    }
    Ok(clades)
}

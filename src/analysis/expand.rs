use crate::analysis::AnalysisError;
use crate::analysis::clades::CladeSet;
use crate::analysis::leaf_id::{LeafId, LeafIdResolver};
use crate::phylo::node::NodeId;
use crate::phylo::taxa::TaxaBlock;
use crate::phylo::tree::Tree;
use rustc_hash::FxHashMap;
use slotmap::SecondaryMap;
use std::collections::BTreeSet;

/// The taxonomy tree with its identifier indexes. Every node of a taxonomy
/// must carry an identifier, and identifiers are unique; both are enforced at
/// build time.
#[derive(Debug)]
pub struct Taxonomy {
    tree: Tree,
    id_to_node: FxHashMap<LeafId, NodeId>,
    node_to_id: SecondaryMap<NodeId, LeafId>,
    leaf_ids: BTreeSet<LeafId>,
}

impl Taxonomy {
    pub fn build(tree: Tree, taxa: &TaxaBlock) -> Result<Self, AnalysisError> {
        let resolver = LeafIdResolver::new(taxa);
        let mut id_to_node: FxHashMap<LeafId, NodeId> = FxHashMap::default();
        let mut node_to_id: SecondaryMap<NodeId, LeafId> = SecondaryMap::new();
        let mut leaf_ids: BTreeSet<LeafId> = BTreeSet::new();

        for node_id in tree.preorder_node_ids() {
            let id = resolver.resolve(&tree, node_id).map_err(|source| {
                AnalysisError::UnresolvedLeaf {
                    label: resolver.display_label(&tree, node_id),
                    source,
                }
            })?;
            if id_to_node.insert(id, node_id).is_some() {
                return Err(AnalysisError::DuplicateId(id));
            }
            node_to_id.insert(node_id, id);
            if tree.child_count(&node_id) == 0 {
                leaf_ids.insert(id);
            }
        }

        Ok(Self { tree, id_to_node, node_to_id, leaf_ids })
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn contains(&self, id: LeafId) -> bool {
        self.id_to_node.contains_key(&id)
    }

    /// Whether `id` names a terminal taxon (a leaf of the taxonomy tree).
    pub fn is_leaf_taxon(&self, id: LeafId) -> bool {
        self.leaf_ids.contains(&id)
    }

    pub fn leaf_ids(&self) -> &BTreeSet<LeafId> {
        &self.leaf_ids
    }

    pub fn node_of(&self, id: LeafId) -> Option<NodeId> {
        self.id_to_node.get(&id).copied()
    }

    pub fn id_of(&self, node_id: NodeId) -> Option<LeafId> {
        self.node_to_id.get(node_id).copied()
    }

    /// The full set of terminal-taxon ids below `id` in the taxonomy.
    pub fn tip_descendants(
        &self,
        id: LeafId,
    ) -> Result<CladeSet, AnalysisError> {
        let mut tips = CladeSet::new();
        self.fill_tip_ids(id, &mut tips)?;
        Ok(tips)
    }

    fn fill_tip_ids(
        &self,
        id: LeafId,
        tips: &mut CladeSet,
    ) -> Result<(), AnalysisError> {
        let node_id = self
            .id_to_node
            .get(&id)
            .copied()
            .ok_or(AnalysisError::NotInTaxonomy(id))?;
        if self.tree.child_count(&node_id) == 0 {
            tips.insert(id);
        } else {
            for child_id in self.tree.child_ids(&node_id) {
                let child_tax_id =
                    self.node_to_id.get(*child_id).copied().ok_or_else(|| {
                        AnalysisError::Corrupt(
                            "taxonomy node without an identifier".to_string(),
                        )
                    })?;
                self.fill_tip_ids(child_tax_id, tips)?;
            }
        }
        Ok(())
    }
}

/// The bookkeeping left behind by [`expand_tip_taxa`].
///
/// `overrides` maps each synthetic leaf to the identifier it stands for
/// (synthetic nodes have neither a name nor a taxon index, so identifier
/// resolution consults this map first). `taboo` maps each of those
/// identifiers back to its synthetic node; encountering the same identifier
/// on any *other* leaf of the expanded tree means the tree lists a taxon
/// both directly and inside an expanded higher taxon.
#[derive(Debug, Default)]
pub struct Expansion {
    pub overrides: FxHashMap<NodeId, LeafId>,
    pub taboo: FxHashMap<LeafId, NodeId>,
}

/// Rewrites `tree` in place so that every leaf standing for a higher
/// (non-terminal) taxon becomes an internal node with one freshly grafted
/// leaf child per terminal descendant of that taxon.
///
/// Leaf sets are preserved exactly: the union of the grafted children's ids
/// equals the taxonomy's terminal descendant set of the replaced leaf, which
/// is what makes clade comparison against the taxonomy meaningful. Mutation
/// is deferred until the traversal is complete.
pub fn expand_tip_taxa(
    tree: &mut Tree,
    taxonomy: &Taxonomy,
    taxa: &TaxaBlock,
) -> Result<Expansion, AnalysisError> {
    let resolver = LeafIdResolver::new(taxa);
    let mut replacements: Vec<(NodeId, CladeSet)> = Vec::new();

    for &node_id in tree.preorder_node_ids().iter().rev() {
        if tree.child_count(&node_id) > 0 {
            continue;
        }
        let id = resolver.resolve(tree, node_id).map_err(|source| {
            AnalysisError::UnresolvedLeaf {
                label: resolver.display_label(tree, node_id),
                source,
            }
        })?;
        if !taxonomy.contains(id) {
            return Err(AnalysisError::NotInTaxonomy(id));
        }
        if !taxonomy.is_leaf_taxon(id) {
            replacements.push((node_id, taxonomy.tip_descendants(id)?));
        }
    }

    let mut expansion = Expansion::default();
    for (old_node_id, tip_ids) in replacements {
        if tip_ids.is_empty() {
            return Err(AnalysisError::Corrupt(
                "internal taxon with no terminal descendants".to_string(),
            ));
        }
        // The node stops standing for a taxon itself.
        tree.set_taxon_index(old_node_id, None);
        for id in tip_ids {
            let new_node_id = tree.add_new_node(None, None, Some(old_node_id))?;
            expansion.overrides.insert(new_node_id, id);
            if expansion.taboo.insert(id, new_node_id).is_some() {
                return Err(AnalysisError::DuplicateId(id));
            }
        }
    }

    if !expansion.overrides.is_empty() {
        tree.validate()?;
    }

    Ok(expansion)
}

use super::tree::Tree;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// The read side of an external taxa table: a dense list of taxon labels,
/// addressed by the `taxon_index` stored on tree tips.
///
/// One block spans every tree of one analysis run. Reusing a single block is
/// what guarantees identical index assignment across trees, the precondition
/// the split accumulator relies on for bit-for-bit split equality.
#[derive(Debug, Default, Clone)]
pub struct TaxaBlock {
    labels: Vec<Arc<str>>,
    index_by_label: FxHashMap<Arc<str>, usize>,
}

impl TaxaBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(|label| &**label)
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.index_by_label.get(label).copied()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|label| &**label)
    }

    /// Returns the index of `label`, adding it to the block if it has not
    /// been seen yet.
    pub fn intern(&mut self, label: &str) -> usize {
        if let Some(index) = self.index_by_label.get(label) {
            return *index;
        }
        let label: Arc<str> = label.into();
        let index = self.labels.len();
        self.labels.push(label.clone());
        self.index_by_label.insert(label, index);
        index
    }

    /// Assigns a `taxon_index` to every named tip of `tree`, interning new
    /// labels in encounter (preorder) order. Tips without a name keep no
    /// index; downstream stages that require one report that as an error.
    pub fn index_tree(&mut self, tree: &mut Tree) {
        for node_id in tree.preorder_node_ids() {
            if tree.child_count(&node_id) > 0 {
                continue;
            }
            if let Some(label) = tree.label(&node_id) {
                let index = self.intern(&label);
                tree.set_taxon_index(node_id, Some(index));
            }
        }
    }
}

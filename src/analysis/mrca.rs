use crate::analysis::AnalysisError;
use crate::analysis::clades::CladeSet;
use crate::analysis::leaf_id::LeafId;
use crate::phylo::node::NodeId;
use crate::phylo::tree::Tree;
use rustc_hash::FxHashMap;
use slotmap::SecondaryMap;

/// Finds the most recent common ancestor of `targets` in `tree`.
///
/// Every target's root-ward path increments a per-node visit counter; the
/// first ancestor of the target with the shortest root path whose counter
/// equals `targets.len()` is the lowest node all paths share. Targets missing
/// from `leaf_index` are an input error; failing to find a common ancestor
/// after that means the tree is not connected, which is a bug.
pub fn find_mrca(
    tree: &Tree,
    leaf_index: &FxHashMap<LeafId, NodeId>,
    targets: &CladeSet,
) -> Result<NodeId, AnalysisError> {
    if targets.is_empty() {
        return Err(AnalysisError::Corrupt(
            "find_mrca called with an empty target set".to_string(),
        ));
    }

    let mut visits: SecondaryMap<NodeId, usize> = SecondaryMap::new();
    let mut shortest: Option<(usize, NodeId)> = None;

    for id in targets {
        let start = *leaf_index
            .get(id)
            .ok_or(AnalysisError::NotInReference(*id))?;
        let mut current = Some(start);
        let mut path_len: usize = 0;
        while let Some(node_id) = current {
            let count = visits.get(node_id).copied().unwrap_or(0);
            visits.insert(node_id, count + 1);
            path_len += 1;
            current = tree.parent_id(&node_id).copied();
        }
        match shortest {
            Some((len, _)) if len <= path_len => {}
            _ => shortest = Some((path_len, start)),
        }
    }

    let n_targets = targets.len();
    let mut current = shortest.map(|(_, node_id)| node_id);
    while let Some(node_id) = current {
        if visits.get(node_id).copied().unwrap_or(0) == n_targets {
            return Ok(node_id);
        }
        current = tree.parent_id(&node_id).copied();
    }

    Err(AnalysisError::Corrupt(
        "no common ancestor found; tree is not connected".to_string(),
    ))
}

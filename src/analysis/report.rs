use crate::analysis::AnalysisError;
use crate::analysis::clades::CladeSet;
use crate::analysis::leaf_id::LeafIdResolver;
use crate::parsers::newick::quote_label;
use crate::phylo::node::NodeId;
use crate::phylo::taxa::TaxaBlock;
use crate::phylo::tree::Tree;
use rustc_hash::FxHashSet;
use slotmap::SecondaryMap;
use std::sync::Arc;

/// One unsupported reference-tree node, with its rendered description and,
/// when it was pre-registered as a suspect, the designators that defined it.
#[derive(Debug, Clone)]
pub struct UnsupportedNode {
    pub node_id: NodeId,
    pub description: String,
    pub designators: Option<CladeSet>,
}

/// Collects every reportable unsupported node of `tree`, in preorder,
/// skipping the root.
///
/// A node is reportable when it is internal, unsupported, not a redundant
/// chain around a single tip, not an out-degree-1 node whose chain reaches a
/// supported or named node (when `trust_named_nodes` is set), and carries no
/// name of its own; named nodes are vetted against the taxonomy elsewhere.
pub fn unsupported_nodes(
    tree: &Tree,
    supported: &FxHashSet<NodeId>,
    tip_names: &SecondaryMap<NodeId, Arc<str>>,
    suspects: &SecondaryMap<NodeId, CladeSet>,
    trust_named_nodes: bool,
) -> Vec<UnsupportedNode> {
    let mut records: Vec<UnsupportedNode> = Vec::new();
    for &node_id in tree.preorder_node_ids().iter().skip(1) {
        let out_degree = tree.child_count(&node_id);
        if out_degree == 0 || supported.contains(&node_id) {
            continue;
        }
        if is_redundant_around_tip(tree, node_id) {
            continue;
        }
        if out_degree == 1
            && trust_named_nodes
            && single_des_supported_or_named(tree, supported, node_id)
        {
            continue;
        }
        if tree.label(&node_id).is_none() {
            records.push(UnsupportedNode {
                node_id,
                description: describe_unnamed_node(
                    tree, tip_names, node_id, 0,
                ),
                designators: suspects.get(node_id).cloned(),
            });
        }
    }
    records
}

/// Renders a human-readable position for an unnamed node: the count of
/// redundant ancestors skipped, then either the nearest name below or the
/// leftmost/rightmost named descendants bounding the clade.
pub fn describe_unnamed_node(
    tree: &Tree,
    tip_names: &SecondaryMap<NodeId, Arc<str>>,
    node_id: NodeId,
    anc: usize,
) -> String {
    if let Some(name) = tree.label(&node_id) {
        return format!("ancestor {anc} node(s) before \"{name}\"");
    }
    let child_ids = tree.child_ids(&node_id);
    match child_ids.len() {
        0 => {
            let name = tip_name(tip_names, node_id);
            format!("ancestor {anc} node(s) before \"{name}\"")
        }
        1 => describe_unnamed_node(tree, tip_names, child_ids[0], anc + 1),
        out_degree => {
            let left = leftmost_des_name(tree, tip_names, child_ids[0]);
            let right = rightmost_des_name(
                tree,
                tip_names,
                child_ids[out_degree - 1],
            );
            format!(
                "ancestor {anc} node(s) before MRCA of \"{left}\" and \"{right}\""
            )
        }
    }
}

fn tip_name(
    tip_names: &SecondaryMap<NodeId, Arc<str>>,
    node_id: NodeId,
) -> String {
    tip_names.get(node_id).map(|name| name.to_string()).unwrap_or_default()
}

fn leftmost_des_name(
    tree: &Tree,
    tip_names: &SecondaryMap<NodeId, Arc<str>>,
    node_id: NodeId,
) -> String {
    if let Some(name) = tree.label(&node_id) {
        return name.to_string();
    }
    match tree.first_child_id(&node_id) {
        Some(child_id) => leftmost_des_name(tree, tip_names, *child_id),
        None => tip_name(tip_names, node_id),
    }
}

fn rightmost_des_name(
    tree: &Tree,
    tip_names: &SecondaryMap<NodeId, Arc<str>>,
    node_id: NodeId,
) -> String {
    if let Some(name) = tree.label(&node_id) {
        return name.to_string();
    }
    match tree.last_child_id(&node_id) {
        Some(child_id) => rightmost_des_name(tree, tip_names, *child_id),
        None => tip_name(tip_names, node_id),
    }
}

/// A maximal out-degree-1 chain ending at a tip carries no grouping
/// information; such nodes are never reported.
fn is_redundant_around_tip(tree: &Tree, node_id: NodeId) -> bool {
    let child_ids = tree.child_ids(&node_id);
    match child_ids.len() {
        0 => true,
        1 => is_redundant_around_tip(tree, child_ids[0]),
        _ => false,
    }
}

fn single_des_supported_or_named(
    tree: &Tree,
    supported: &FxHashSet<NodeId>,
    node_id: NodeId,
) -> bool {
    if supported.contains(&node_id) {
        return true;
    }
    let child_ids = tree.child_ids(&node_id);
    if child_ids.len() == 1 {
        if tree.label(&node_id).is_some() {
            return true;
        }
        return single_des_supported_or_named(tree, supported, child_ids[0]);
    }
    false
}

pub(crate) fn join_ids(clade: &CladeSet) -> String {
    clade
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<String>>()
        .join(" ")
}

/// Renders the nodes of `tree` that carry an entry in `marked` as a Newick
/// string of `ott<N>` tokens, collapsing runs of nodes that subtend the same
/// marked leaf set. Used to emit the pruned reference/source comparison
/// trees.
pub fn newick_of_marked(
    tree: &Tree,
    marked: &SecondaryMap<NodeId, CladeSet>,
) -> Result<String, AnalysisError> {
    let root = tree.first_node_id().ok_or_else(|| {
        AnalysisError::Corrupt("tree has no root node".to_string())
    })?;
    let mut out = String::new();
    write_subtree_marked(&mut out, tree, marked, root)?;
    out.push(';');
    Ok(out)
}

fn write_subtree_marked(
    out: &mut String,
    tree: &Tree,
    marked: &SecondaryMap<NodeId, CladeSet>,
    node_id: NodeId,
) -> Result<(), AnalysisError> {
    let clade = marked.get(node_id).ok_or_else(|| {
        AnalysisError::Corrupt("unmarked node in marked-subtree walk".to_string())
    })?;
    if clade.len() == 1 {
        let id = clade.iter().next().ok_or_else(|| {
            AnalysisError::Corrupt("empty clade set".to_string())
        })?;
        out.push_str(&id.to_string());
        return Ok(());
    }
    let significant = next_significant_node(tree, marked, node_id)?;
    out.push('(');
    let mut written: usize = 0;
    for child_id in tree.child_ids(&significant) {
        if marked.contains_key(*child_id) {
            if written > 0 {
                out.push(',');
            }
            write_subtree_marked(out, tree, marked, *child_id)?;
            written += 1;
        }
    }
    if written < 2 {
        return Err(AnalysisError::Corrupt(
            "significant node with fewer than two marked children".to_string(),
        ));
    }
    out.push(')');
    Ok(())
}

/// Descends through out-degree-1 runs (under the marked restriction) to the
/// first node where the marked leaf set actually splits.
fn next_significant_node(
    tree: &Tree,
    marked: &SecondaryMap<NodeId, CladeSet>,
    node_id: NodeId,
) -> Result<NodeId, AnalysisError> {
    let mut current = node_id;
    loop {
        let clade = marked.get(current).ok_or_else(|| {
            AnalysisError::Corrupt(
                "unmarked node in marked-subtree walk".to_string(),
            )
        })?;
        let mut single_child: Option<NodeId> = None;
        for child_id in tree.child_ids(&current) {
            if marked.contains_key(*child_id) {
                if single_child.is_some() {
                    // More than one marked child: the set splits here.
                    return Ok(current);
                }
                single_child = Some(*child_id);
            }
        }
        let Some(child_id) = single_child else {
            return Err(AnalysisError::Corrupt(
                "marked node with no marked children".to_string(),
            ));
        };
        let child_clade = marked.get(child_id).ok_or_else(|| {
            AnalysisError::Corrupt(
                "unmarked node in marked-subtree walk".to_string(),
            )
        })?;
        if child_clade != clade {
            return Err(AnalysisError::Corrupt(
                "marked leaf set changed along an out-degree-1 run"
                    .to_string(),
            ));
        }
        current = child_id;
    }
}

/// Renders the subtree of `tree` spanned by the MRCA of `designators`, using
/// tip labels. The whole subtree below the MRCA is written, not only the
/// designated leaves.
pub fn mrca_subtree(
    tree: &Tree,
    taxa: &TaxaBlock,
    designators: &CladeSet,
) -> Result<String, AnalysisError> {
    if designators.len() < 2 {
        return Err(AnalysisError::Corrupt(
            "mrca_subtree needs two or more designators".to_string(),
        ));
    }
    let resolver = LeafIdResolver::new(taxa);
    let mut marked: SecondaryMap<NodeId, CladeSet> = SecondaryMap::new();
    let mut leaf_names: SecondaryMap<NodeId, String> = SecondaryMap::new();
    let mut remaining = designators.clone();

    let preorder = tree.preorder_node_ids();
    for &node_id in preorder.iter().rev() {
        if tree.child_count(&node_id) == 0 {
            let id = resolver.resolve(tree, node_id).map_err(|source| {
                AnalysisError::UnresolvedLeaf {
                    label: resolver.display_label(tree, node_id),
                    source,
                }
            })?;
            leaf_names.insert(node_id, resolver.display_label(tree, node_id));
            if designators.contains(&id) {
                remaining.remove(&id);
                marked.insert(node_id, CladeSet::from([id]));
            }
        } else {
            let mut clade = CladeSet::new();
            for child_id in tree.child_ids(&node_id) {
                if let Some(child_clade) = marked.get(*child_id) {
                    clade.extend(child_clade.iter().copied());
                }
            }
            if clade.len() == designators.len() {
                let mut out = String::new();
                write_newick_subtree(&mut out, tree, node_id, &leaf_names);
                out.push(';');
                return Ok(out);
            }
            if !clade.is_empty() {
                marked.insert(node_id, clade);
            }
        }
    }

    if remaining.is_empty() {
        Err(AnalysisError::Corrupt(
            "all designators found but no common ancestor spans them"
                .to_string(),
        ))
    } else {
        Err(AnalysisError::DesignatorsNotFound(join_ids(&remaining)))
    }
}

fn write_newick_subtree(
    out: &mut String,
    tree: &Tree,
    node_id: NodeId,
    leaf_names: &SecondaryMap<NodeId, String>,
) {
    let child_ids = tree.child_ids(&node_id);
    if child_ids.is_empty() {
        let name = leaf_names.get(node_id).cloned().unwrap_or_default();
        out.push_str(&quote_label(&name));
        return;
    }
    out.push('(');
    for (i, child_id) in child_ids.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_newick_subtree(out, tree, *child_id, leaf_names);
    }
    out.push(')');
}

/// Tab-delimited `<id>\t<label>` rows, one per resolvable tip, in preorder.
pub fn id_name_table(tree: &Tree, taxa: &TaxaBlock) -> String {
    let resolver = LeafIdResolver::new(taxa);
    let mut out = String::new();
    for node_id in tree.preorder_node_ids() {
        if tree.child_count(&node_id) > 0 {
            continue;
        }
        if let Ok(id) = resolver.resolve(tree, node_id) {
            out.push_str(&format!(
                "{}\t{}\n",
                id.value(),
                resolver.display_label(tree, node_id)
            ));
        }
    }
    out
}

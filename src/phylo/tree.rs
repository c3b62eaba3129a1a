use super::TreeFloat;
use super::node::{Node, NodeId, NodeType};
use rayon::prelude::*;
use slotmap::SlotMap;
use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;

/// A rooted tree over slotmap-allocated nodes. Construction happens through
/// [`Tree::add_node`]-family calls followed by [`Tree::validate`], which
/// assigns node types, locates the single first/root node and refreshes the
/// cached counts. Mutating structure invalidates those caches until the next
/// `validate` call.
#[derive(Debug, Default, Clone)]
pub struct Tree {
    nodes: SlotMap<NodeId, Node>,
    first_node_id: Option<NodeId>,
    tip_count_all: usize,
    internal_node_count_all: usize,
    node_count_all: usize,
    has_branch_lengths: bool,
}

#[derive(Debug, Error)]
pub enum TreeError {
    #[error("Parent node with NodeId: {0} does not exist.")]
    ParentNodeDoesNotExist(NodeId),
    #[error("Tree validation failed: {0}.")]
    InvalidTree(String),
}

impl Tree {
    // =========================================================================
    // Construction & Validation
    // =========================================================================

    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_new_node(
        &mut self,
        name: Option<&str>,
        branch_length: Option<TreeFloat>,
        parent_node_id: Option<NodeId>,
    ) -> Result<NodeId, TreeError> {
        let mut node: Node = Node::default();
        node.set_name(name);
        node.set_branch_length(branch_length);
        self.add_node(node, parent_node_id)
    }

    pub fn add_node(
        &mut self,
        node: Node,
        parent_node_id: Option<NodeId>,
    ) -> Result<NodeId, TreeError> {
        let node_ids = self.add_nodes(vec![node], parent_node_id)?;
        Ok(node_ids[0])
    }

    pub fn add_nodes(
        &mut self,
        nodes: Vec<Node>,
        parent_node_id: Option<NodeId>,
    ) -> Result<Vec<NodeId>, TreeError> {
        let mut nodes = nodes;

        if let Some(parent_node_id_value) = parent_node_id {
            if self.node_exists(parent_node_id) {
                for node in &mut nodes {
                    node.set_parent_id(parent_node_id);
                }
            } else {
                return Err(TreeError::ParentNodeDoesNotExist(
                    parent_node_id_value,
                ));
            }
        }

        let mut node_ids: Vec<NodeId> = Vec::new();

        for mut node in nodes {
            let node_id = self.nodes.insert_with_key(|node_id| {
                node.set_node_id(node_id);
                node
            });

            node_ids.push(node_id);

            if let Some(parent_node) = self.node_mut(parent_node_id) {
                parent_node.add_child_id(node_id);
            }
        }

        Ok(node_ids)
    }

    pub fn validate(&mut self) -> Result<NodeId, TreeError> {
        let mut count_of_tip: usize = 0;
        let mut count_of_internal: usize = 0;
        let mut count_of_first: usize = 0;
        let mut count_of_root: usize = 0;

        let mut has_branch_lengths: bool = false;

        for node in self.nodes.values_mut() {
            match node.set_node_type() {
                NodeType::Unset => {}
                NodeType::Tip => count_of_tip += 1,
                NodeType::Internal => count_of_internal += 1,
                NodeType::FirstNode => {
                    count_of_first += 1;
                    if let Some(node_id) = node.node_id() {
                        self.first_node_id = Some(*node_id);
                    }
                }
                NodeType::Root => {
                    count_of_root += 1;
                    if let Some(node_id) = node.node_id() {
                        self.first_node_id = Some(*node_id);
                    }
                }
            };

            if node.node_type() != NodeType::FirstNode
                && node.node_type() != NodeType::Root
                && node.branch_length().is_some()
            {
                has_branch_lengths = true;
            }
        }

        if count_of_first + count_of_root != 1 {
            return Err(TreeError::InvalidTree(format!(
                "count_of_first({count_of_first}) + count_of_root({count_of_root}) should equal 1."
            )));
        }

        self.tip_count_all = count_of_tip;
        self.internal_node_count_all =
            count_of_internal + count_of_first + count_of_root;
        self.node_count_all = self.tip_count_all + self.internal_node_count_all;

        self.has_branch_lengths = has_branch_lengths;

        if let Some(node) = self.node_mut(self.first_node_id) {
            node.set_branch_length(None);
        }

        match self.first_node_id {
            Some(first_node_id) => Ok(first_node_id),
            None => Err(TreeError::InvalidTree(
                "no first node was found".to_string(),
            )),
        }
    }

    // =========================================================================
    // Tree Properties
    // =========================================================================

    pub fn has_branch_lengths(&self) -> bool {
        self.has_branch_lengths
    }

    pub fn tip_count_all(&self) -> usize {
        self.tip_count_all
    }

    pub fn internal_node_count_all(&self) -> usize {
        self.internal_node_count_all
    }

    pub fn node_count_all(&self) -> usize {
        self.node_count_all
    }

    pub fn is_rooted(&self) -> bool {
        if let Some(node) = self.node(self.first_node_id()) {
            return node.node_type() == NodeType::Root;
        }
        false
    }

    pub fn tip_heights(&self) -> Vec<(NodeId, TreeFloat)> {
        if let Some(first_node_id) = self.first_node_id {
            let tip_nodes = self.tip_node_ids_all();

            if tip_nodes.len() > 100 {
                tip_nodes
                    .par_iter()
                    .map(|&node_id| {
                        (node_id, self.distance(&first_node_id, &node_id))
                    })
                    .collect()
            } else {
                tip_nodes
                    .iter()
                    .map(|&node_id| {
                        (node_id, self.distance(&first_node_id, &node_id))
                    })
                    .collect()
            }
        } else {
            Vec::new()
        }
    }

    pub fn height(&self) -> TreeFloat {
        if let Some(id) = &self.first_node_id {
            let tip_ids = self.tip_node_ids_all();

            if tip_ids.len() > 100 {
                tip_ids
                    .par_iter()
                    .map(|right| self.distance(id, right))
                    .reduce(|| 0.0, TreeFloat::max)
            } else {
                tip_ids
                    .iter()
                    .map(|right| self.distance(id, right))
                    .fold(0.0, TreeFloat::max)
            }
        } else {
            0.0
        }
    }

    /// Path length from `left_node_id` down to its descendant `right_node_id`
    /// in branch-length units; unset branch lengths count as zero.
    pub fn distance(
        &self,
        left_node_id: &NodeId,
        right_node_id: &NodeId,
    ) -> TreeFloat {
        if left_node_id == right_node_id {
            return 0.0;
        }

        let mut total_distance: TreeFloat =
            self.branch_length(*right_node_id).unwrap_or(0.0);

        if let Some(parent_node_id) = self.parent_id(right_node_id)
            && parent_node_id != left_node_id
        {
            total_distance += self.distance(left_node_id, parent_node_id);
        }

        total_distance
    }

    // =========================================================================
    // Node Access
    // =========================================================================

    pub fn node(&self, node_id: Option<NodeId>) -> Option<&Node> {
        if let Some(node_id) = node_id { self.nodes.get(node_id) } else { None }
    }

    pub fn node_mut(&mut self, node_id: Option<NodeId>) -> Option<&mut Node> {
        if let Some(node_id) = node_id {
            self.nodes.get_mut(node_id)
        } else {
            None
        }
    }

    pub fn node_exists(&self, node_id: Option<NodeId>) -> bool {
        self.node(node_id).is_some()
    }

    pub fn first_node_id(&self) -> Option<NodeId> {
        self.first_node_id
    }

    pub fn node_id_by_label(&self, label: &str) -> Option<NodeId> {
        self.nodes.iter().find_map(|(node_id, node)| {
            match node.name() {
                Some(node_label) if &*node_label == label => Some(node_id),
                _ => None,
            }
        })
    }

    pub fn label(&self, node_id: &NodeId) -> Option<Arc<str>> {
        self.nodes[*node_id].name()
    }

    pub fn branch_length(&self, node_id: NodeId) -> Option<TreeFloat> {
        self.nodes[node_id].branch_length()
    }

    pub fn taxon_index(&self, node_id: &NodeId) -> Option<usize> {
        self.nodes[*node_id].taxon_index()
    }

    pub fn set_taxon_index(
        &mut self,
        node_id: NodeId,
        taxon_index: Option<usize>,
    ) {
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.set_taxon_index(taxon_index);
        }
    }

    // =========================================================================
    // Tree Traversal
    // =========================================================================

    pub fn parent_id(&self, node_id: &NodeId) -> Option<&NodeId> {
        self.nodes[*node_id].parent_id()
    }

    pub fn child_ids(&self, node_id: &NodeId) -> &[NodeId] {
        self.nodes[*node_id].child_ids()
    }

    pub fn first_child_id(&self, node_id: &NodeId) -> Option<&NodeId> {
        self.child_ids(node_id).first()
    }

    pub fn last_child_id(&self, node_id: &NodeId) -> Option<&NodeId> {
        self.child_ids(node_id).last()
    }

    pub fn child_count(&self, node_id: &NodeId) -> usize {
        self.nodes[*node_id].child_node_count()
    }

    pub fn is_tip(&self, node_id: &NodeId) -> bool {
        self.nodes[*node_id].is_tip()
    }

    /// Every node id, root first, each node after its parent. Reversing the
    /// returned list gives a children-before-parent order, which is what all
    /// bottom-up passes over the tree iterate.
    pub fn preorder_node_ids(&self) -> Vec<NodeId> {
        let mut result = Vec::with_capacity(self.nodes.len());
        if let Some(first_node_id) = self.first_node_id {
            self.collect_preorder_recursive(first_node_id, &mut result);
        }
        result
    }

    fn collect_preorder_recursive(
        &self,
        node_id: NodeId,
        result: &mut Vec<NodeId>,
    ) {
        result.push(node_id);
        for child_id in self.child_ids(&node_id) {
            self.collect_preorder_recursive(*child_id, result);
        }
    }

    pub fn tip_node_ids(&self, node_id: &NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        self.collect_tip_ids_recursive(*node_id, &mut result);
        result
    }

    fn collect_tip_ids_recursive(
        &self,
        node_id: NodeId,
        result: &mut Vec<NodeId>,
    ) {
        if self.child_count(&node_id) == 0 {
            result.push(node_id);
        } else {
            for child_id in self.child_ids(&node_id) {
                self.collect_tip_ids_recursive(*child_id, result);
            }
        }
    }

    pub fn tip_node_ids_all(&self) -> Vec<NodeId> {
        if let Some(id) = self.first_node_id {
            self.tip_node_ids(&id)
        } else {
            Vec::new()
        }
    }

    // =========================================================================
    // Display
    // =========================================================================

    fn print_tree(&self) -> String {
        let mut result: String = String::new();
        result.push_str(&format!(
            "Internal Nodes: {}\nTips: {}\nAll Nodes: {}\n{}\nBranch lengths: {}\n\n",
            self.internal_node_count_all,
            self.tip_count_all,
            self.node_count_all,
            match self.is_rooted() {
                true => "Rooted",
                false => "Unrooted",
            },
            self.has_branch_lengths()
        ));

        if let Some(node) = self.node(self.first_node_id) {
            result.push_str(&self.print_node(node, 0));
        }

        result
    }

    fn print_node(&self, node: &Node, level: usize) -> String {
        let mut result: String = String::new();
        result.push_str(&format!(
            "{}- {} | {} | {:<5.3} | {}\n",
            " ".repeat(level * 4),
            if let Some(node_id) = node.node_id() {
                node_id.to_string()
            } else {
                "None".to_string()
            },
            if let Some(label) = &node.name() {
                label.to_string()
            } else {
                "None".to_string()
            },
            if let Some(branch_length) = node.branch_length() {
                branch_length
            } else {
                TreeFloat::NAN
            },
            node.node_type(),
        ));

        for &child_node_id in node.child_ids() {
            result
                .push_str(&self.print_node(&self.nodes[child_node_id], level + 1));
        }

        result
    }
}

impl Display for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.print_tree())
    }
}

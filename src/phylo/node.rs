use super::TreeFloat;
use slotmap::new_key_type;
use std::{fmt::Display, sync::Arc};

new_key_type! { pub struct NodeId; }

#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd, Ord, Eq)]
pub enum NodeType {
    #[default]
    Unset,
    Tip,
    Internal,
    FirstNode,
    Root,
}

/// A single node of a rooted tree. Ancestry is stored as ids into the owning
/// [`Tree`](super::tree::Tree); nodes never outlive the tree that allocated
/// them.
///
/// `taxon_index` is an index into the [`TaxaBlock`](super::taxa::TaxaBlock)
/// the tree was read with; `None` means the node does not stand for a taxon
/// (internal nodes, or tips that were expanded into higher taxa).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Node {
    node_id: Option<NodeId>,
    parent_id: Option<NodeId>,
    child_ids: Vec<NodeId>,
    branch_length: Option<TreeFloat>,
    name: Option<Arc<str>>,
    taxon_index: Option<usize>,
    node_type: NodeType,
}

impl Node {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_tip(&self) -> bool {
        self.node_type == NodeType::Tip
    }

    pub fn child_ids(&self) -> &[NodeId] {
        &self.child_ids
    }

    pub fn child_node_count(&self) -> usize {
        self.child_ids.len()
    }

    pub fn add_child_id(&mut self, node_id: NodeId) {
        self.child_ids.push(node_id)
    }

    pub fn node_id(&self) -> Option<&NodeId> {
        self.node_id.as_ref()
    }

    pub fn set_node_id(&mut self, node_id: NodeId) {
        self.node_id = Some(node_id);
    }

    pub fn parent_id(&self) -> Option<&NodeId> {
        self.parent_id.as_ref()
    }

    pub fn set_parent_id(&mut self, node_id: Option<NodeId>) {
        self.parent_id = node_id;
    }

    pub fn branch_length(&self) -> Option<TreeFloat> {
        self.branch_length
    }

    pub fn set_branch_length(&mut self, branch_length: Option<TreeFloat>) {
        self.branch_length = branch_length;
    }

    pub fn name(&self) -> Option<Arc<str>> {
        self.name.clone()
    }

    pub fn set_name(&mut self, name: Option<&str>) {
        self.name = name.map(|name| name.into());
    }

    pub fn taxon_index(&self) -> Option<usize> {
        self.taxon_index
    }

    pub fn set_taxon_index(&mut self, taxon_index: Option<usize>) {
        self.taxon_index = taxon_index;
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn set_node_type(&mut self) -> NodeType {
        if !self.child_ids.is_empty() && self.parent_id.is_some() {
            self.node_type = NodeType::Internal
        } else if self.child_ids.is_empty() && self.parent_id.is_some() {
            self.node_type = NodeType::Tip
        } else if self.child_ids.len() == 2 && self.parent_id.is_none() {
            self.node_type = NodeType::Root
        } else if !self.child_ids.is_empty() && self.parent_id.is_none() {
            self.node_type = NodeType::FirstNode
        }
        self.node_type
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let disp = format!("{self:?}");
        write!(f, "{}", &disp[7..disp.len() - 1])
    }
}

impl Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                NodeType::Unset => "Unset",
                NodeType::Tip => "Tip",
                NodeType::Internal => "Internal",
                NodeType::Root => "Root",
                NodeType::FirstNode => "FirstNode",
            }
        )
    }
}

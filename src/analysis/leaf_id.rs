use crate::TreeInt;
use crate::phylo::node::NodeId;
use crate::phylo::taxa::TaxaBlock;
use crate::phylo::tree::Tree;
use rustc_hash::FxHashMap;
use std::fmt::Display;
use thiserror::Error;

/// A stable numeric taxon identifier, extracted from the trailing digit run
/// of a node name or taxon label (`Homo_sapiens_ott770315` -> `770315`).
/// Always non-negative once constructed; the failure modes of extraction are
/// carried by [`LeafIdError`] instead of sentinel values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LeafId(TreeInt);

impl LeafId {
    pub fn new(value: TreeInt) -> Option<Self> {
        if value >= 0 { Some(Self(value)) } else { None }
    }

    pub fn value(&self) -> TreeInt {
        self.0
    }
}

impl Display for LeafId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ott{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeafIdError {
    /// Neither a name nor a taxon label was available.
    #[error("no name or taxon label is available")]
    Absent,
    /// A name was present but does not end in a digit run.
    #[error("label does not end in digits")]
    NotNumeric,
}

/// Extracts the maximal trailing digit run of `label`.
pub fn leaf_id_from_label(label: &str) -> Result<LeafId, LeafIdError> {
    if label.is_empty() {
        return Err(LeafIdError::Absent);
    }
    let bytes = label.as_bytes();
    if !bytes[bytes.len() - 1].is_ascii_digit() {
        return Err(LeafIdError::NotNumeric);
    }
    let start = bytes
        .iter()
        .rposition(|b| !b.is_ascii_digit())
        .map_or(0, |i| i + 1);
    let value: TreeInt =
        label[start..].parse().map_err(|_| LeafIdError::NotNumeric)?;
    LeafId::new(value).ok_or(LeafIdError::NotNumeric)
}

/// Resolves tree nodes to [`LeafId`]s. Lookup order: the expansion override
/// map (synthetic nodes grafted by taxonomy expansion carry their id there,
/// first match wins), then the node's own name, then the node's taxon label.
pub struct LeafIdResolver<'a> {
    taxa: &'a TaxaBlock,
    overrides: Option<&'a FxHashMap<NodeId, LeafId>>,
}

impl<'a> LeafIdResolver<'a> {
    pub fn new(taxa: &'a TaxaBlock) -> Self {
        Self { taxa, overrides: None }
    }

    pub fn with_overrides(
        mut self,
        overrides: &'a FxHashMap<NodeId, LeafId>,
    ) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn resolve(
        &self,
        tree: &Tree,
        node_id: NodeId,
    ) -> Result<LeafId, LeafIdError> {
        if let Some(overrides) = self.overrides
            && let Some(id) = overrides.get(&node_id)
        {
            return Ok(*id);
        }
        match tree.label(&node_id) {
            Some(name) => leaf_id_from_label(&name),
            None => match tree
                .taxon_index(&node_id)
                .and_then(|index| self.taxa.label(index))
            {
                Some(label) => leaf_id_from_label(label),
                None => Err(LeafIdError::Absent),
            },
        }
    }

    /// The display label of a node: its own name if set, its taxon label
    /// otherwise. Used for error messages and tip naming.
    pub fn display_label(&self, tree: &Tree, node_id: NodeId) -> String {
        match tree.label(&node_id) {
            Some(name) => name.to_string(),
            None => tree
                .taxon_index(&node_id)
                .and_then(|index| self.taxa.label(index))
                .unwrap_or_default()
                .to_string(),
        }
    }
}

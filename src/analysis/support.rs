use crate::analysis::AnalysisError;
use crate::analysis::clades::{CladeSet, build_clade_sets};
use crate::analysis::expand::{Taxonomy, expand_tip_taxa};
use crate::analysis::leaf_id::{LeafId, LeafIdError, LeafIdResolver};
use crate::analysis::mrca::find_mrca;
use crate::analysis::report::{self, newick_of_marked};
use crate::phylo::node::NodeId;
use crate::phylo::taxa::TaxaBlock;
use crate::phylo::tree::Tree;
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SecondaryMap;
use std::collections::BTreeSet;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SupportConfig {
    /// Trust named out-degree-1 chains: an unnamed redundant node whose chain
    /// reaches a supported or named node is not reported as unsupported.
    pub trust_named_nodes: bool,
}

impl Default for SupportConfig {
    fn default() -> Self {
        Self { trust_named_nodes: true }
    }
}

/// An a-priori "expected unsupported" clade that turned out to be attested by
/// a source tree. A finding, not an error; the run carries on.
#[derive(Debug, Clone)]
pub struct Refutation {
    /// The designator ids that defined the suspect node.
    pub designators: CladeSet,
    /// The leaf set (restricted to the source tree's leaves) that matched.
    pub matched: CladeSet,
}

/// Per-source-tree outcome of one [`SupportAnalysis::process_tree`] call.
#[derive(Debug, Clone)]
pub struct SourceTreeReport {
    /// 0-based index of this source tree within the run.
    pub index: usize,
    /// Reference nodes newly marked supported by this tree.
    pub newly_supported: usize,
    /// Identifiers of the leaves present in this source tree, after
    /// expansion.
    pub leaf_ids: CladeSet,
    /// The reference tree pruned to this tree's leaf set, as `ott<N>` Newick.
    pub pruned_reference: String,
    /// The source tree itself in the same rendering.
    pub pruned_source: String,
    /// Suspect clades this tree refuted.
    pub refutations: Vec<Refutation>,
}

/// Final counts of a run. `exit_code` follows the convention that a driver
/// exits with the number of unsupported nodes, zero meaning fully supported.
#[derive(Debug, Clone)]
pub struct AnalysisSummary {
    pub named_internal_nodes: usize,
    pub supported_internal_nodes: usize,
    pub supported_named: usize,
    pub supported_unnamed: usize,
    pub unsupported: usize,
    pub refutation_count: usize,
    /// Human-readable description of every unsupported node and every
    /// suspect-clade check.
    pub report: String,
}

impl AnalysisSummary {
    pub fn exit_code(&self) -> i32 {
        self.unsupported as i32
    }
}

/// The reference ("synthetic") tree with the lookups every later stage needs:
/// identifier-to-node, per-tip display names, and the internal nodes that
/// carry identifiers of their own.
#[derive(Debug)]
pub struct ReferenceTree {
    tree: Tree,
    leaf_index: FxHashMap<LeafId, NodeId>,
    tip_names: SecondaryMap<NodeId, Arc<str>>,
    named_nodes: Vec<(NodeId, LeafId)>,
    named_internal_count: usize,
}

impl ReferenceTree {
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn leaf_index(&self) -> &FxHashMap<LeafId, NodeId> {
        &self.leaf_index
    }

    pub fn tip_names(&self) -> &SecondaryMap<NodeId, Arc<str>> {
        &self.tip_names
    }

    /// Internal nodes whose name resolves to an identifier.
    pub fn named_nodes(&self) -> &[(NodeId, LeafId)] {
        &self.named_nodes
    }

    pub fn named_internal_count(&self) -> usize {
        self.named_internal_count
    }
}

/// One clade-support run: reference tree, then taxonomy tree, then any number
/// of source trees, all fed through [`SupportAnalysis::process_tree`] in
/// file-arrival order. All cross-tree state of the run lives here; nothing is
/// process-global, so independent runs coexist in one process.
#[derive(Debug, Default)]
pub struct SupportAnalysis {
    config: SupportConfig,
    reference: Option<ReferenceTree>,
    taxonomy: Option<Taxonomy>,
    supported: FxHashSet<NodeId>,
    suspects: SecondaryMap<NodeId, CladeSet>,
    refutations: Vec<Refutation>,
    source_trees_seen: usize,
}

impl SupportAnalysis {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SupportConfig) -> Self {
        Self { config, ..Self::default() }
    }

    pub fn reference(&self) -> Option<&ReferenceTree> {
        self.reference.as_ref()
    }

    pub fn taxonomy(&self) -> Option<&Taxonomy> {
        self.taxonomy.as_ref()
    }

    /// Reference-tree nodes currently marked supported. Grows monotonically
    /// over a run; nothing ever un-supports a node.
    pub fn supported(&self) -> &FxHashSet<NodeId> {
        &self.supported
    }

    pub fn is_supported(&self, node_id: NodeId) -> bool {
        self.supported.contains(&node_id)
    }

    pub fn refutations(&self) -> &[Refutation] {
        &self.refutations
    }

    /// The per-tree hook. The first tree becomes the reference, the second
    /// the taxonomy, every following tree is a source tree whose clades are
    /// matched against the reference. Source trees yield a report; the two
    /// setup trees yield `None`.
    pub fn process_tree(
        &mut self,
        tree: Tree,
        taxa: &TaxaBlock,
    ) -> Result<Option<SourceTreeReport>, AnalysisError> {
        if self.reference.is_none() {
            self.process_reference_tree(tree, taxa)?;
            Ok(None)
        } else if self.taxonomy.is_none() {
            self.process_taxonomy_tree(tree, taxa)?;
            Ok(None)
        } else {
            Ok(Some(self.process_source_tree(tree, taxa)?))
        }
    }

    fn process_reference_tree(
        &mut self,
        tree: Tree,
        taxa: &TaxaBlock,
    ) -> Result<(), AnalysisError> {
        let resolver = LeafIdResolver::new(taxa);
        let mut leaf_index: FxHashMap<LeafId, NodeId> = FxHashMap::default();
        let mut tip_names: SecondaryMap<NodeId, Arc<str>> = SecondaryMap::new();
        let mut named_nodes: Vec<(NodeId, LeafId)> = Vec::new();
        let mut named_internal_count: usize = 0;

        for node_id in tree.preorder_node_ids() {
            let resolved = resolver.resolve(&tree, node_id).ok();
            if tree.child_count(&node_id) == 0 {
                let label = resolver.display_label(&tree, node_id);
                if label.is_empty() {
                    return Err(AnalysisError::UnresolvedLeaf {
                        label,
                        source: LeafIdError::Absent,
                    });
                }
                tip_names.insert(node_id, label.into());
            } else if tree.label(&node_id).is_some() {
                named_internal_count += 1;
                if let Some(id) = resolved
                    && id.value() > 0
                {
                    named_nodes.push((node_id, id));
                }
            }
            if let Some(id) = resolved
                && leaf_index.insert(id, node_id).is_some()
            {
                return Err(AnalysisError::DuplicateId(id));
            }
        }

        self.reference = Some(ReferenceTree {
            tree,
            leaf_index,
            tip_names,
            named_nodes,
            named_internal_count,
        });
        Ok(())
    }

    fn process_taxonomy_tree(
        &mut self,
        tree: Tree,
        taxa: &TaxaBlock,
    ) -> Result<(), AnalysisError> {
        let taxonomy = Taxonomy::build(tree, taxa)?;
        let Some(reference) = self.reference.as_ref() else {
            return Err(AnalysisError::Corrupt(
                "taxonomy processed before the reference tree".to_string(),
            ));
        };
        // Every terminal taxon must be a leaf of the reference, and every
        // identifier the reference uses must exist in the taxonomy.
        for id in taxonomy.leaf_ids() {
            if !reference.leaf_index.contains_key(id) {
                return Err(AnalysisError::NotInReference(*id));
            }
        }
        for id in reference.leaf_index.keys() {
            if !taxonomy.contains(*id) {
                return Err(AnalysisError::NotInTaxonomy(*id));
            }
        }
        self.taxonomy = Some(taxonomy);
        Ok(())
    }

    /// Registers a-priori suspect clades. Each non-empty line of `text` holds
    /// two or more numeric designators; their MRCA in the reference tree is
    /// asserted to be unsupported. Returns the number of suspects added.
    pub fn add_suspect_clades(
        &mut self,
        text: &str,
    ) -> Result<usize, AnalysisError> {
        let Some(reference) = self.reference.as_ref() else {
            return Err(AnalysisError::DesignatorsBeforeReference);
        };
        let mut added: usize = 0;
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut designators = CladeSet::new();
            for word in line.split_whitespace() {
                let id = word
                    .parse::<crate::TreeInt>()
                    .ok()
                    .and_then(LeafId::new)
                    .ok_or_else(|| {
                        AnalysisError::BadDesignatorLine(line.to_string())
                    })?;
                designators.insert(id);
            }
            if designators.len() < 2 {
                return Err(AnalysisError::BadDesignatorLine(line.to_string()));
            }
            let mrca = find_mrca(
                &reference.tree,
                &reference.leaf_index,
                &designators,
            )?;
            if reference.tree.label(&mrca).is_some() {
                return Err(AnalysisError::SuspectResolvesToNamed(
                    line.to_string(),
                ));
            }
            self.suspects.insert(mrca, designators);
            added += 1;
        }
        Ok(added)
    }

    fn process_source_tree(
        &mut self,
        mut tree: Tree,
        taxa: &TaxaBlock,
    ) -> Result<SourceTreeReport, AnalysisError> {
        let Some(reference) = self.reference.as_ref() else {
            return Err(AnalysisError::Corrupt(
                "source tree processed before the reference tree".to_string(),
            ));
        };
        let Some(taxonomy) = self.taxonomy.as_ref() else {
            return Err(AnalysisError::Corrupt(
                "source tree processed before the taxonomy tree".to_string(),
            ));
        };

        let expansion = expand_tip_taxa(&mut tree, taxonomy, taxa)?;
        let resolver =
            LeafIdResolver::new(taxa).with_overrides(&expansion.overrides);
        let src_clades = build_clade_sets(&tree, &resolver)?;

        // Walk root-ward from every source leaf, restricting the reference
        // tree to this tree's leaf universe as we go.
        let mut ref_restricted: SecondaryMap<NodeId, CladeSet> =
            SecondaryMap::new();
        let mut leaf_ids = CladeSet::new();
        for tip_id in tree.tip_node_ids_all() {
            let clade = src_clades.get(tip_id).ok_or_else(|| {
                AnalysisError::Corrupt(
                    "source tip without a clade set".to_string(),
                )
            })?;
            let id = *clade.iter().next().ok_or_else(|| {
                AnalysisError::Corrupt("empty tip clade set".to_string())
            })?;
            if let Some(&taboo_node) = expansion.taboo.get(&id)
                && taboo_node != tip_id
            {
                // The taxon occurs both directly and inside an expansion.
                return Err(AnalysisError::DuplicateId(id));
            }
            if !taxonomy.contains(id) {
                return Err(AnalysisError::NotInTaxonomy(id));
            }
            leaf_ids.insert(id);
            let mut current = Some(
                *reference
                    .leaf_index
                    .get(&id)
                    .ok_or(AnalysisError::NotInReference(id))?,
            );
            while let Some(ref_node_id) = current {
                if !ref_restricted.contains_key(ref_node_id) {
                    ref_restricted.insert(ref_node_id, CladeSet::new());
                }
                ref_restricted[ref_node_id].insert(id);
                current = reference.tree.parent_id(&ref_node_id).copied();
            }
        }

        // Every non-root clade the source tree attests.
        let mut source_clades: BTreeSet<CladeSet> = BTreeSet::new();
        for (node_id, clade) in src_clades.iter() {
            if tree.parent_id(&node_id).is_some() {
                source_clades.insert(clade.clone());
            }
        }

        let mut newly_supported: usize = 0;
        let mut refutations: Vec<Refutation> = Vec::new();
        for (ref_node_id, clade) in ref_restricted.iter() {
            if reference.tree.parent_id(&ref_node_id).is_none() {
                continue;
            }
            if !is_resolved_here(&reference.tree, &ref_restricted, ref_node_id)
            {
                continue;
            }
            if !source_clades.contains(clade) {
                continue;
            }
            if let Some(designators) = self.suspects.get(ref_node_id) {
                refutations.push(Refutation {
                    designators: designators.clone(),
                    matched: clade.clone(),
                });
            }
            if self.supported.insert(ref_node_id) {
                newly_supported += 1;
            }
        }
        self.refutations.extend(refutations.iter().cloned());

        let pruned_reference =
            newick_of_marked(&reference.tree, &ref_restricted)?;
        let pruned_source = newick_of_marked(&tree, &src_clades)?;

        let index = self.source_trees_seen;
        self.source_trees_seen += 1;

        Ok(SourceTreeReport {
            index,
            newly_supported,
            leaf_ids,
            pruned_reference,
            pruned_source,
            refutations,
        })
    }

    /// Extends support through out-degree-1 chains: a redundant node whose
    /// single child is supported inherits that support. Reverse-preorder
    /// order makes one pass sufficient, and re-running it changes nothing.
    pub fn extend_supported_to_redundant_nodes(&mut self) {
        let Some(reference) = self.reference.as_ref() else {
            return;
        };
        for &node_id in reference.tree.preorder_node_ids().iter().rev() {
            let child_ids = reference.tree.child_ids(&node_id);
            if child_ids.len() == 1 && self.supported.contains(&child_ids[0]) {
                self.supported.insert(node_id);
            }
        }
    }

    /// Runs the redundant-node closure, renders every unsupported node and
    /// every suspect-clade verdict, and returns the final counts.
    pub fn summarize(&mut self) -> Result<AnalysisSummary, AnalysisError> {
        self.extend_supported_to_redundant_nodes();
        let Some(reference) = self.reference.as_ref() else {
            return Err(AnalysisError::Corrupt(
                "summarize called before the reference tree was read"
                    .to_string(),
            ));
        };

        let records = report::unsupported_nodes(
            &reference.tree,
            &self.supported,
            &reference.tip_names,
            &self.suspects,
            self.config.trust_named_nodes,
        );

        let mut text = String::new();
        for record in &records {
            match &record.designators {
                None if self.suspects.is_empty() => {
                    text.push_str("Unsupported node ")
                }
                None => text.push_str("Novel unsupported node "),
                Some(designators) => text.push_str(&format!(
                    "Confirmation of unsupported node (designators = {}) ",
                    report::join_ids(designators)
                )),
            }
            text.push_str(&record.description);
            text.push('\n');
        }

        if !self.suspects.is_empty() {
            text.push_str(&format!(
                "Checking {} a priori suspected problem(s):\n",
                self.suspects.len()
            ));
            for (node_id, designators) in self.suspects.iter() {
                text.push_str(&format!(
                    "check for {}\n",
                    report::join_ids(designators)
                ));
                if self.supported.contains(&node_id) {
                    text.push_str(
                        "refuted: an input tree supports this node.\n",
                    );
                } else {
                    text.push_str(
                        "not supported. Look for this description:\n",
                    );
                    text.push_str(&report::describe_unnamed_node(
                        &reference.tree,
                        &reference.tip_names,
                        node_id,
                        0,
                    ));
                    text.push('\n');
                }
            }
        }

        let mut supported_internal_nodes: usize = 0;
        let mut supported_named: usize = 0;
        for node_id in &self.supported {
            if reference.tree.child_count(node_id) == 0 {
                continue;
            }
            supported_internal_nodes += 1;
            if reference.tree.label(node_id).is_some() {
                supported_named += 1;
            }
        }
        let supported_unnamed = supported_internal_nodes - supported_named;
        let unsupported = records.len();

        text.push_str(&format!(
            "{} internal nodes were named in the reference tree. These were not rigorously checked against the taxonomy.\n",
            reference.named_internal_count
        ));
        text.push_str(&format!(
            "{supported_internal_nodes} internal nodes were flagged as being supported by an input tree.\n"
        ));
        text.push_str(&format!("    {supported_named} of these were named.\n"));
        text.push_str(&format!(
            "    {supported_unnamed} of these were unnamed.\n"
        ));
        text.push_str(&format!("{unsupported} unsupported nodes.\n"));

        Ok(AnalysisSummary {
            named_internal_nodes: reference.named_internal_count,
            supported_internal_nodes,
            supported_named,
            supported_unnamed,
            unsupported,
            refutation_count: self.refutations.len(),
            report: text,
        })
    }
}

/// Whether `node_id` denotes a resolved bipartition under the current leaf
/// restriction: at least two of its children subtend leaves of the restricted
/// set. Out-degree-1 chains and nodes with a single informative child can
/// never be resolved and are skipped by the support test.
fn is_resolved_here(
    tree: &Tree,
    restricted: &SecondaryMap<NodeId, CladeSet>,
    node_id: NodeId,
) -> bool {
    let mut informative_children: usize = 0;
    for child_id in tree.child_ids(&node_id) {
        if restricted.contains_key(*child_id) {
            informative_children += 1;
            if informative_children > 1 {
                return true;
            }
        }
    }
    false
}

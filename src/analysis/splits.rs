use crate::TreeFloat;
use crate::analysis::AnalysisError;
use crate::analysis::leaf_id::LeafIdResolver;
use crate::parsers::newick::quote_label;
use crate::phylo::node::NodeId;
use crate::phylo::taxa::TaxaBlock;
use crate::phylo::tree::Tree;
use slotmap::SecondaryMap;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Word width is an implementation constant; any width works as long as the
/// final partial word is masked consistently.
type SplitWord = u64;
const WORD_BITS: usize = SplitWord::BITS as usize;

/// One side of a bipartition of the taxon universe, as a fixed-width bit
/// vector indexed by taxon position.
///
/// Two structurally identical bipartitions compare bit-for-bit equal
/// regardless of which tree produced them, provided taxon index assignment
/// was identical across those trees; callers guarantee that by reusing one
/// [`TaxaBlock`] per accumulation scope. For unrooted use,
/// [`Split::invert_if_needed`] canonicalizes a split and its complement to
/// the representative with bit 0 clear; rooted accumulation skips that and
/// keeps descendant sets verbatim.
#[derive(Debug, Clone)]
pub struct Split {
    words: Vec<SplitWord>,
    n_tax: usize,
    last_mask: SplitWord,
}

impl Split {
    pub fn new(n_tax: usize) -> Self {
        debug_assert!(n_tax > 0);
        let n_words = n_tax.div_ceil(WORD_BITS);
        let bits_in_last = (n_tax - 1) % WORD_BITS + 1;
        let last_mask: SplitWord = if bits_in_last == WORD_BITS {
            SplitWord::MAX
        } else {
            (1 << bits_in_last) - 1
        };
        Self { words: vec![0; n_words], n_tax, last_mask }
    }

    pub fn n_tax(&self) -> usize {
        self.n_tax
    }

    pub fn set_index(&mut self, index: usize) {
        debug_assert!(index < self.n_tax);
        self.words[index / WORD_BITS] |= 1 << (index % WORD_BITS);
    }

    pub fn contains(&self, index: usize) -> bool {
        if index >= self.n_tax {
            return false;
        }
        (self.words[index / WORD_BITS] & (1 << (index % WORD_BITS))) != 0
    }

    pub fn set_to_union(&mut self, other: &Split) {
        debug_assert_eq!(self.words.len(), other.words.len());
        for (word, other_word) in self.words.iter_mut().zip(&other.words) {
            *word |= *other_word;
        }
    }

    /// Canonicalizes complementary splits to one representative: if bit 0 is
    /// set, every bit is flipped and the final partial word re-masked.
    /// Applying it twice restores the original pattern.
    pub fn invert_if_needed(&mut self) {
        if (self.words[0] & 1) != 0 {
            for word in self.words.iter_mut() {
                *word = !*word;
            }
            if let Some(last_word) = self.words.last_mut() {
                *last_word &= self.last_mask;
            }
        }
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// A trivial split separates a single taxon from the rest.
    pub fn is_trivial(&self) -> bool {
        let ones = self.count_ones();
        ones == 1 || ones + 1 == self.n_tax
    }

    /// The 0-based taxon indices on each side: (included, excluded).
    pub fn partition(&self) -> (Vec<usize>, Vec<usize>) {
        let mut included: Vec<usize> = Vec::new();
        let mut excluded: Vec<usize> = Vec::new();
        for index in 0..self.n_tax {
            if self.contains(index) {
                included.push(index);
            } else {
                excluded.push(index);
            }
        }
        (included, excluded)
    }

    /// Renders the split as `((i1,i2,...),e1,e2,...)` with 1-based taxon
    /// numbers. Returns `None` for trivial splits unless `even_if_trivial`.
    pub fn newick(&self, even_if_trivial: bool) -> Option<String> {
        self.newick_rendering(None, even_if_trivial)
    }

    /// Like [`Split::newick`], attaching `edge_length` to the included side.
    pub fn newick_with_edge_length(
        &self,
        edge_length: TreeFloat,
        even_if_trivial: bool,
    ) -> Option<String> {
        self.newick_rendering(Some(edge_length), even_if_trivial)
    }

    fn newick_rendering(
        &self,
        edge_length: Option<TreeFloat>,
        even_if_trivial: bool,
    ) -> Option<String> {
        let (included, excluded) = self.partition();
        if !even_if_trivial && (included.len() == 1 || excluded.len() == 1) {
            return None;
        }
        let mut out = String::from("(");
        if !included.is_empty() {
            out.push('(');
            for (i, index) in included.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&(index + 1).to_string());
            }
            out.push(')');
            if let Some(edge_length) = edge_length {
                out.push_str(&format!(":{edge_length}"));
            }
        }
        for index in excluded {
            out.push(',');
            out.push_str(&(index + 1).to_string());
        }
        out.push(')');
        Some(out)
    }
}

// Word-count-first ordering; within equal widths the word vectors compare
// lexicographically. Keeps splits from differently sized universes apart in
// one map without ever mixing their bits.
impl Ord for Split {
    fn cmp(&self, other: &Self) -> Ordering {
        self.words
            .len()
            .cmp(&other.words.len())
            .then_with(|| self.words.cmp(&other.words))
            .then_with(|| self.n_tax.cmp(&other.n_tax))
    }
}

impl PartialOrd for Split {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Split {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Split {}

/// Aggregate statistics for one split within one accumulation scope. Which
/// fields fill in depends on the [`SplitOptions`] flags; raw lists and
/// summary accumulators are alternatives, as in the option pairs below.
#[derive(Debug, Default, Clone)]
pub struct SplitInfo {
    pub n_times: usize,
    pub edge_lengths: Vec<TreeFloat>,
    pub heights: Vec<TreeFloat>,
    pub inclusion: BTreeSet<usize>,
    pub edge_len_sum: TreeFloat,
    pub edge_len_sum_sq: TreeFloat,
    pub height_sum: TreeFloat,
    pub height_sum_sq: TreeFloat,
}

impl SplitInfo {
    pub fn mean_edge_length(&self) -> Option<TreeFloat> {
        if !self.edge_lengths.is_empty() {
            let n = self.edge_lengths.len() as TreeFloat;
            return Some(self.edge_lengths.iter().sum::<TreeFloat>() / n);
        }
        if self.n_times > 0 {
            return Some(self.edge_len_sum / self.n_times as TreeFloat);
        }
        None
    }

    /// Sample variance of the edge lengths; `None` below two observations.
    pub fn edge_length_variance(&self) -> Option<TreeFloat> {
        let (n, sum, sum_sq) = if !self.edge_lengths.is_empty() {
            let sum: TreeFloat = self.edge_lengths.iter().sum();
            let sum_sq: TreeFloat =
                self.edge_lengths.iter().map(|len| len * len).sum();
            (self.edge_lengths.len(), sum, sum_sq)
        } else {
            (self.n_times, self.edge_len_sum, self.edge_len_sum_sq)
        };
        if n < 2 {
            return None;
        }
        let n = n as TreeFloat;
        Some((sum_sq - sum * sum / n) / (n - 1.0))
    }

    pub fn mean_height(&self) -> Option<TreeFloat> {
        if !self.heights.is_empty() {
            let n = self.heights.len() as TreeFloat;
            return Some(self.heights.iter().sum::<TreeFloat>() / n);
        }
        if self.n_times > 0 {
            return Some(self.height_sum / self.n_times as TreeFloat);
        }
        None
    }
}

/// What to track per split. The `*_summary` flags keep running sums and sums
/// of squares instead of raw per-occurrence lists and win when both are set.
#[derive(Debug, Default, Clone, Copy)]
pub struct SplitOptions {
    /// Record single-taxon splits too.
    pub track_trivial: bool,
    /// Keep descendant sets verbatim instead of canonicalizing complements.
    pub treat_as_rooted: bool,
    pub track_freq: bool,
    /// Record which trees (0-based indices) each split occurred in.
    pub track_occurrence: bool,
    pub track_edge_len: bool,
    pub track_edge_len_summary: bool,
    pub track_height: bool,
    pub track_height_summary: bool,
}

#[derive(Debug, Default)]
struct SplitsBlock {
    n_trees: usize,
    splits: BTreeMap<Split, SplitInfo>,
}

/// Accumulates the splits of every recorded tree into deduplicating maps,
/// one per caller-chosen taxa-block scope. Trees recorded into one scope must
/// share the taxa block that assigned their tip indices.
#[derive(Debug, Default)]
pub struct TreesToSplits {
    options: SplitOptions,
    blocks: BTreeMap<usize, SplitsBlock>,
}

impl TreesToSplits {
    pub fn new(options: SplitOptions) -> Self {
        Self { options, blocks: BTreeMap::new() }
    }

    pub fn options(&self) -> &SplitOptions {
        &self.options
    }

    pub fn tree_count(&self, block: usize) -> usize {
        self.blocks.get(&block).map(|b| b.n_trees).unwrap_or(0)
    }

    pub fn splits(&self, block: usize) -> Option<&BTreeMap<Split, SplitInfo>> {
        self.blocks.get(&block).map(|b| &b.splits)
    }

    /// Encodes every non-root clade of `tree` and folds it into `block`'s
    /// map. Bottom-up pass over an explicit per-tree scratch map; the root is
    /// skipped because its split is the trivial everything-set. Scratch holds
    /// the uninverted descendant split of each node so that parent unions
    /// stay correct; canonical inversion is applied to the recorded key only.
    pub fn record_tree(
        &mut self,
        block: usize,
        tree: &Tree,
        taxa: &TaxaBlock,
    ) -> Result<(), AnalysisError> {
        let block_entry = self.blocks.entry(block).or_default();
        let tree_index = block_entry.n_trees;

        let preorder = tree.preorder_node_ids();
        if preorder.len() > 1 {
            let n_tax = taxa.len();
            if n_tax == 0 {
                return Err(AnalysisError::MissingTaxonIndex(String::new()));
            }
            let track_height = self.options.track_height
                || self.options.track_height_summary;
            let mut scratch: SecondaryMap<NodeId, (Split, TreeFloat)> =
                SecondaryMap::new();

            for &node_id in preorder.iter().rev().take(preorder.len() - 1) {
                let mut split = Split::new(n_tax);
                let mut height: TreeFloat = 0.0;
                let is_leaf = tree.child_count(&node_id) == 0;
                if is_leaf {
                    let Some(index) = tree.taxon_index(&node_id) else {
                        let resolver = LeafIdResolver::new(taxa);
                        return Err(AnalysisError::MissingTaxonIndex(
                            resolver.display_label(tree, node_id),
                        ));
                    };
                    if index >= n_tax {
                        return Err(AnalysisError::Corrupt(format!(
                            "taxon index {index} is outside the {n_tax}-taxon universe"
                        )));
                    }
                    split.set_index(index);
                } else {
                    for child_id in tree.child_ids(&node_id) {
                        let (child_split, child_height) =
                            scratch.get(*child_id).ok_or_else(|| {
                                AnalysisError::Corrupt(
                                    "child split missing during bottom-up pass"
                                        .to_string(),
                                )
                            })?;
                        split.set_to_union(child_split);
                        if track_height {
                            let child_brlen = tree
                                .branch_length(*child_id)
                                .unwrap_or(0.0);
                            height = height.max(child_height + child_brlen);
                        }
                    }
                }

                let mut key = split.clone();
                if !self.options.treat_as_rooted {
                    key.invert_if_needed();
                }
                scratch.insert(node_id, (split, height));

                if !is_leaf || self.options.track_trivial {
                    let edge_length =
                        tree.branch_length(node_id).unwrap_or(0.0);
                    record_split(
                        &self.options,
                        &mut block_entry.splits,
                        key,
                        edge_length,
                        height,
                        tree_index,
                    );
                }
            }
        }

        block_entry.n_trees += 1;
        Ok(())
    }

    /// Renders one scope's accumulated splits in the NEXUS-flavored form the
    /// original tool family emits: a TRANSLATE table, a star tree over the
    /// full universe, then one `Tree split_<n>` line per split with weight
    /// and mean-height comments where tracked.
    pub fn report(&self, block: usize, taxa: &TaxaBlock) -> Option<String> {
        let block_entry = self.blocks.get(&block)?;
        let rooted_flag = if self.options.treat_as_rooted { 'R' } else { 'U' };

        let mut out = String::from("    TRANSLATE\n");
        let n_tax = taxa.len();
        for (i, label) in taxa.labels().enumerate() {
            out.push_str(&format!("        {} {}", i + 1, quote_label(label)));
            out.push_str(if i + 1 < n_tax { ",\n" } else { "" });
        }
        out.push_str(";\n");

        out.push_str(&format!("Tree star = [&{rooted_flag}] (1"));
        for i in 1..n_tax {
            out.push_str(&format!(",{}", i + 1));
        }
        out.push_str(");\n");

        let track_weight = self.options.track_freq
            || self.options.track_edge_len_summary
            || self.options.track_edge_len;
        for (n, (split, info)) in block_entry.splits.iter().enumerate() {
            out.push_str(&format!("Tree split_{} = [&{rooted_flag}] ", n + 1));
            if track_weight && block_entry.n_trees > 0 {
                out.push_str(&format!(
                    "[&W {}] ",
                    info.n_times as TreeFloat / block_entry.n_trees as TreeFloat
                ));
            }
            if self.options.track_height_summary
                && let Some(mean_height) = info.mean_height()
            {
                out.push_str(&format!("[meanH = {mean_height}] "));
            }
            let rendering = if self.options.track_edge_len_summary {
                match info.mean_edge_length() {
                    Some(mean_len) => {
                        split.newick_with_edge_length(mean_len, true)
                    }
                    None => split.newick(true),
                }
            } else {
                split.newick(true)
            };
            out.push_str(&rendering.unwrap_or_default());
            out.push_str(";\n");
        }

        Some(out)
    }
}

fn record_split(
    options: &SplitOptions,
    splits: &mut BTreeMap<Split, SplitInfo>,
    split: Split,
    edge_length: TreeFloat,
    height: TreeFloat,
    tree_index: usize,
) {
    let info = splits.entry(split).or_default();
    if options.track_freq
        || options.track_edge_len_summary
        || options.track_edge_len
    {
        info.n_times += 1;
    }
    if options.track_occurrence {
        info.inclusion.insert(tree_index);
    }
    if options.track_edge_len_summary {
        info.edge_len_sum += edge_length;
        info.edge_len_sum_sq += edge_length * edge_length;
    } else if options.track_edge_len {
        info.edge_lengths.push(edge_length);
    }
    if options.track_height_summary {
        info.height_sum += height;
        info.height_sum_sq += height * height;
    } else if options.track_height {
        info.heights.push(height);
    }
}

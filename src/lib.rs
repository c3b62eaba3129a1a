mod analysis;
mod parsers;
mod phylo;

pub type TreeFloat = f64;
pub type TreeInt = i64;

pub use analysis::AnalysisError;
pub use analysis::check::MatchPolicy;
pub use analysis::check::TaxonCheckReport;
pub use analysis::check::check_named_nodes;
pub use analysis::clades::CladeSet;
pub use analysis::clades::build_clade_sets;
pub use analysis::expand::Expansion;
pub use analysis::expand::Taxonomy;
pub use analysis::expand::expand_tip_taxa;
pub use analysis::leaf_id::LeafId;
pub use analysis::leaf_id::LeafIdError;
pub use analysis::leaf_id::LeafIdResolver;
pub use analysis::leaf_id::leaf_id_from_label;
pub use analysis::mrca::find_mrca;
pub use analysis::report::UnsupportedNode;
pub use analysis::report::describe_unnamed_node;
pub use analysis::report::id_name_table;
pub use analysis::report::mrca_subtree;
pub use analysis::report::newick_of_marked;
pub use analysis::report::unsupported_nodes;
pub use analysis::splits::Split;
pub use analysis::splits::SplitInfo;
pub use analysis::splits::SplitOptions;
pub use analysis::splits::TreesToSplits;
pub use analysis::support::AnalysisSummary;
pub use analysis::support::ReferenceTree;
pub use analysis::support::Refutation;
pub use analysis::support::SourceTreeReport;
pub use analysis::support::SupportAnalysis;
pub use analysis::support::SupportConfig;
pub use parsers::TreeParseError;
pub use parsers::newick::parse_newick;
pub use parsers::newick::write_newick;
pub use phylo::node::Node;
pub use phylo::node::NodeId;
pub use phylo::node::NodeType;
pub use phylo::taxa::TaxaBlock;
pub use phylo::tree::Tree;
pub use phylo::tree::TreeError;

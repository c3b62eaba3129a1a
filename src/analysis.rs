pub mod check;
pub mod clades;
pub mod expand;
pub mod leaf_id;
pub mod mrca;
pub mod report;
pub mod splits;
pub mod support;

use crate::phylo::tree::TreeError;
use self::leaf_id::{LeafId, LeafIdError};
use thiserror::Error;

/// Errors reported by the analysis passes.
///
/// Two classes share this enum. Operator-input errors (`UnresolvedLeaf`,
/// `DuplicateId`, `NotInTaxonomy`, `NotInReference`, `BadDesignatorLine`,
/// `MissingTaxonIndex`, ...) mean the supplied trees or designator lines are
/// inconsistent and name the offending identifier; fixing the input fixes the
/// run. `Corrupt` means a structural invariant the algorithms rely on was
/// violated mid-run, which is a bug, not bad input.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("leaf \"{label}\" does not resolve to an identifier: {source}")]
    UnresolvedLeaf {
        label: String,
        #[source]
        source: LeafIdError,
    },
    #[error("{0} is assigned to more than one node in the same tree")]
    DuplicateId(LeafId),
    #[error("{0} is not present in the taxonomy")]
    NotInTaxonomy(LeafId),
    #[error("{0} is not a node of the reference tree")]
    NotInReference(LeafId),
    #[error("designator line \"{0}\": expected two or more numeric identifiers")]
    BadDesignatorLine(String),
    #[error("designators must be registered after the reference tree is read")]
    DesignatorsBeforeReference,
    #[error("designators \"{0}\" resolve to a named node")]
    SuspectResolvesToNamed(String),
    #[error("designator(s) not found among the leaves: {0}")]
    DesignatorsNotFound(String),
    #[error("tip \"{0}\" has no taxon index and cannot be encoded as a split")]
    MissingTaxonIndex(String),
    #[error("internal invariant violated: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Tree(#[from] TreeError),
}

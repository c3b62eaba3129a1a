pub mod newick;

use crate::phylo::tree::TreeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TreeParseError {
    #[error("unexpected character '{found}' at byte {at} in tree string")]
    Unexpected { found: char, at: usize },
    #[error("expected a number at byte {0} in tree string")]
    BadNumber(usize),
    #[error("tree string ended before the tree was complete")]
    UnexpectedEnd,
    #[error("tree string contains no trees")]
    Empty,
    #[error(transparent)]
    Tree(#[from] TreeError),
}

/*!
Invertible document transforms.

Edits are expressed as [`Step`]s, each an atomic range replacement that can
be applied, inverted against the document it applied to, and mapped through
other changes. A [`Transaction`] strings steps together, applying each to
the document produced by the previous one and accumulating a [`Mapping`]
for position bookkeeping. The [`structure`] module holds the grammar-aware
predicates that decide whether a join, split, or lift is possible before any
step is built.
*/

use thiserror::Error;

use crate::model::{ReplaceError, ResolveError};

pub mod map;
pub mod step;
pub mod structure;
pub mod transaction;

pub use map::{Assoc, MapResult, Mapping, StepMap};
pub use step::Step;
pub use structure::{can_join, can_split, lift_target, TypesAfter};
pub use transaction::Transaction;

#[derive(Debug, Error, PartialEq)]
pub enum TransformError {
    #[error(transparent)]
    Replace(#[from] ReplaceError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("structure replace would overwrite content")]
    WouldOverwriteContent,
    #[error("gap is not a flat range")]
    NonFlatGap,
    #[error("content does not fit in gap")]
    GapContentMismatch,
    #[error("split depth exceeds position depth")]
    SplitTooDeep,
}

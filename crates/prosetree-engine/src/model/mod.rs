/*!
Document model: immutable node trees, positions, and range replacement.

A document is a tree of [`Node`] values. Child sequences are [`Fragment`]s
backed by shared storage, so edits rebuild only the spine from the changed
node to the root. Integer positions count node boundaries and text
characters; [`ResolvedPos`] expands a position into its ancestor chain, and
[`replace`] materializes edits as slice splices validated against the
per-type content grammar in [`content`].

[`replace`]: Node::replace
*/

pub mod content;
pub mod fragment;
pub mod node;
pub mod replace;
pub mod resolved;

pub use content::ContentMatch;
pub use fragment::Fragment;
pub use node::{Mark, ModelError, Node, NodeKind, NodeType};
pub use replace::{ReplaceError, Slice};
pub use resolved::{NodeRange, ResolveError, ResolvedPos};

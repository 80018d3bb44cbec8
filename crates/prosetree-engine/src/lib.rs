/*!
Structural editing engine for tree-shaped rich documents.

A document is an immutable tree of typed nodes ([`model`]), edits are
expressed as invertible steps grouped into transactions ([`transform`]),
and editor gestures are pure commands that either decline, consume the
gesture, or produce a transaction ([`commands`]).
*/

pub mod commands;
pub mod model;
pub mod transform;

pub use commands::{
    backspace_with_reset, chain, join_backward, lift_list_item, lift_out_of_list, sink_list_item,
    Command, CommandInput, Resolution, Selection,
};
pub use model::{
    ContentMatch, Fragment, Mark, ModelError, Node, NodeKind, NodeRange, NodeType, ReplaceError,
    ResolveError, ResolvedPos, Slice,
};
pub use transform::{
    can_join, can_split, lift_target, Assoc, MapResult, Mapping, Step, StepMap, Transaction,
    TransformError,
};

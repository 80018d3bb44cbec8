/*!
Structural queries over a document.

These predicates answer, without building anything, whether a structural
edit would leave the tree grammar-valid. The editing commands probe with
them before constructing steps, so a command that cannot apply declines
instead of failing halfway through.
*/

use crate::model::{Fragment, Node, NodeRange, NodeType};
use crate::transform::TransformError;

/// Whether the range `[from, to)` covers any actual content, as opposed to
/// only node boundaries. Structure steps refuse ranges where this is true.
pub(crate) fn content_between(doc: &Node, from: usize, to: usize) -> Result<bool, TransformError> {
    let rfrom = doc.resolve(from)?;
    let mut depth = rfrom.depth();
    let mut dist = to - from;
    while dist > 0 && depth > 0 && rfrom.index_after(depth) == rfrom.node(depth).child_count() {
        depth -= 1;
        dist -= 1;
    }
    if dist > 0 {
        let mut next = rfrom
            .node(depth)
            .maybe_child(rfrom.index_after(depth))
            .cloned();
        while dist > 0 {
            match next {
                Some(node) if !node.is_leaf() => {
                    next = node.first_child().cloned();
                    dist -= 1;
                }
                _ => return Ok(true),
            }
        }
    }
    Ok(false)
}

fn joinable(before: Option<&Node>, after: Option<&Node>) -> bool {
    match (before, after) {
        (Some(before), Some(after)) => !before.is_leaf() && before.can_append(after),
        _ => false,
    }
}

/// Whether the nodes on either side of the given position can be joined
/// into one.
pub fn can_join(doc: &Node, pos: usize) -> Result<bool, TransformError> {
    let rpos = doc.resolve(pos)?;
    let index = rpos.index(rpos.depth());
    if index == 0 {
        return Ok(false);
    }
    Ok(
        joinable(rpos.node_before().as_ref(), rpos.node_after().as_ref())
            && rpos
                .parent()
                .can_replace(index, index + 1, &Fragment::empty()),
    )
}

/// Replacement types for the nodes above a split point, outermost first.
/// `None` entries keep the existing node's type.
pub type TypesAfter<'a> = Option<&'a [Option<NodeType>]>;

/// Whether the node stack around the given position can be split `depth`
/// levels up, optionally changing the types of the nodes after the split.
pub fn can_split(
    doc: &Node,
    pos: usize,
    depth: usize,
    types_after: TypesAfter,
) -> Result<bool, TransformError> {
    let rpos = doc.resolve(pos)?;
    let (Some(base), true) = (rpos.depth().checked_sub(depth), depth > 0) else {
        return Ok(false);
    };
    let inner_type = types_after
        .and_then(|types| types.last().copied().flatten())
        .unwrap_or(rpos.parent().node_type());
    let rest = rpos
        .parent()
        .content()
        .cut_by_index(rpos.index(rpos.depth()), rpos.parent().child_count());
    if rpos.parent().isolating()
        || !rpos.parent().can_replace(
            rpos.index(rpos.depth()),
            rpos.parent().child_count(),
            &Fragment::empty(),
        )
        || !inner_type.valid_content(&rest)
    {
        return Ok(false);
    }
    for d in ((base + 1)..rpos.depth()).rev() {
        let i = d - base - 1;
        let node = rpos.node(d);
        let index = rpos.index(d);
        if node.isolating() {
            return Ok(false);
        }
        let mut rest = node.content().cut_by_index(index, node.child_count());
        let override_child = types_after
            .and_then(|types| types.get(i + 1))
            .copied()
            .flatten();
        if let (Some(ty), Some(first)) = (override_child, rest.first_child()) {
            rest = rest.replace_child(0, ty.create(first.content().clone()));
        }
        let after_type = types_after
            .and_then(|types| types.get(i))
            .copied()
            .flatten()
            .unwrap_or(node.node_type());
        if !node.can_replace(index + 1, node.child_count(), &Fragment::empty())
            || !after_type.valid_content(&rest)
        {
            return Ok(false);
        }
    }
    let index = rpos.index_after(base);
    let base_type = types_after
        .and_then(|types| types.first())
        .copied()
        .flatten();
    let ty = base_type.unwrap_or_else(|| rpos.node(base + 1).node_type());
    Ok(rpos.node(base).can_replace_with(index, index, ty))
}

fn can_cut(node: &Node, start: usize, end: usize) -> bool {
    (start == 0 || node.can_replace(start, node.child_count(), &Fragment::empty()))
        && (end == node.child_count()
            || node.can_replace(end, node.child_count(), &Fragment::empty()))
}

/// The shallowest ancestor depth the content of the given range can be
/// lifted to, or `None` when no ancestor admits it.
pub fn lift_target(range: &NodeRange) -> Option<usize> {
    let parent = range.parent();
    let content = parent
        .content()
        .cut_by_index(range.start_index(), range.end_index());
    let mut depth = range.depth();
    loop {
        let node = range.from().node(depth);
        let index = range.from().index(depth);
        let end_index = range.to().index_after(depth);
        if depth < range.depth() && node.can_replace(index, end_index, &content) {
            return Some(depth);
        }
        if depth == 0 || node.isolating() || !can_cut(node, index, end_index) {
            return None;
        }
        depth -= 1;
    }
}

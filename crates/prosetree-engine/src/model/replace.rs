/*!
Slices and the replace operation.

Replacing a range means deleting what sits between two resolved positions and
splicing in a [`Slice`]: a fragment whose first and last children may be
"open", i.e. cut through rather than complete, with the open depths recording
how many node boundaries each edge is missing. The algorithm walks down the
shared ancestry of the two positions, joins the cut-open nodes on each side
with the slice's open edges, and validates every rebuilt node against the
content grammar before stitching it into the new tree.
*/

use thiserror::Error;

use crate::model::fragment::Fragment;
use crate::model::node::{Node, NodeType};
use crate::model::resolved::{ResolveError, ResolvedPos};

#[derive(Debug, Error, PartialEq)]
pub enum ReplaceError {
    #[error("inserted content deeper than insertion position")]
    TooDeep,
    #[error("inconsistent open depths")]
    InconsistentOpenDepths,
    #[error("replace range is inverted")]
    InvertedRange,
    #[error("cannot join {0:?} onto {1:?}")]
    CannotJoin(NodeType, NodeType),
    #[error("invalid content for {0:?} node")]
    InvalidContent(NodeType),
    #[error("range to remove is not flat")]
    NonFlatRange,
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// A piece of a document: a fragment plus how deeply each edge is cut open.
///
/// `open_start` counts unclosed node boundaries at the start, `open_end` at
/// the end. A slice with both open depths zero is just a sequence of complete
/// nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Slice {
    content: Fragment,
    open_start: usize,
    open_end: usize,
}

impl Slice {
    pub fn new(content: Fragment, open_start: usize, open_end: usize) -> Slice {
        Slice {
            content,
            open_start,
            open_end,
        }
    }

    pub fn empty() -> Slice {
        Slice::default()
    }

    pub fn content(&self) -> &Fragment {
        &self.content
    }

    pub fn open_start(&self) -> usize {
        self.open_start
    }

    pub fn open_end(&self) -> usize {
        self.open_end
    }

    /// Number of positions this slice covers once inserted.
    pub fn size(&self) -> usize {
        self.content.size() - self.open_start - self.open_end
    }

    /// Insert a fragment at a distance into this slice's content, walking
    /// through open nodes. `None` when the insertion point's parent grammar
    /// rejects the fragment or no valid insertion point exists at `pos`.
    pub fn insert_at(&self, pos: usize, fragment: &Fragment) -> Option<Slice> {
        let content = insert_into(&self.content, pos + self.open_start, fragment, None)?;
        Some(Slice::new(content, self.open_start, self.open_end))
    }

    /// Remove a flat sub-range from this slice's content.
    pub fn remove_between(&self, from: usize, to: usize) -> Result<Slice, ReplaceError> {
        let content = remove_range(
            &self.content,
            from + self.open_start,
            to + self.open_start,
        )?;
        Ok(Slice::new(content, self.open_start, self.open_end))
    }
}

fn insert_into(
    content: &Fragment,
    dist: usize,
    insert: &Fragment,
    parent: Option<&Node>,
) -> Option<Fragment> {
    let (index, offset) = content.find_index(dist);
    let child = content.maybe_child(index);
    if offset == dist || child.is_some_and(Node::is_text) {
        if let Some(parent) = parent {
            if !parent.can_replace(index, index, insert) {
                return None;
            }
        }
        return Some(
            content
                .cut(0, dist)
                .append(insert)
                .append(&content.cut(dist, content.size())),
        );
    }
    let child = child?;
    let inner = insert_into(child.content(), dist - offset - 1, insert, Some(child))?;
    Some(content.replace_child(index, child.copy(inner)))
}

fn remove_range(content: &Fragment, from: usize, to: usize) -> Result<Fragment, ReplaceError> {
    let (index, offset) = content.find_index(from);
    let child = content.maybe_child(index);
    let (index_to, offset_to) = content.find_index(to);
    if offset == from || child.is_some_and(Node::is_text) {
        if offset_to != to && !content.child(index_to).is_text() {
            return Err(ReplaceError::NonFlatRange);
        }
        return Ok(content.cut(0, from).append(&content.cut(to, content.size())));
    }
    let child = child.ok_or(ReplaceError::NonFlatRange)?;
    if index != index_to {
        return Err(ReplaceError::NonFlatRange);
    }
    let inner = remove_range(child.content(), from - offset - 1, to - offset - 1)?;
    Ok(content.replace_child(index, child.copy(inner)))
}

/// Replace the range between two resolved positions with a slice.
pub(crate) fn replace(
    rfrom: &ResolvedPos,
    rto: &ResolvedPos,
    slice: &Slice,
) -> Result<Node, ReplaceError> {
    if rfrom.pos() > rto.pos() {
        return Err(ReplaceError::InvertedRange);
    }
    if slice.open_start > rfrom.depth() {
        return Err(ReplaceError::TooDeep);
    }
    if rfrom.depth() - slice.open_start != rto.depth() - slice.open_end {
        return Err(ReplaceError::InconsistentOpenDepths);
    }
    replace_outer(rfrom, rto, slice, 0)
}

fn replace_outer(
    rfrom: &ResolvedPos,
    rto: &ResolvedPos,
    slice: &Slice,
    depth: usize,
) -> Result<Node, ReplaceError> {
    let index = rfrom.index(depth);
    let node = rfrom.node(depth);
    if index == rto.index(depth) && depth < rfrom.depth() - slice.open_start {
        // both edges still inside the same child; recurse without rebuilding
        let inner = replace_outer(rfrom, rto, slice, depth + 1)?;
        Ok(node.copy(node.content().replace_child(index, inner)))
    } else if slice.content.is_empty() {
        close(node, replace_two_way(rfrom, rto, depth)?)
    } else if slice.open_start == 0
        && slice.open_end == 0
        && rfrom.depth() == depth
        && rto.depth() == depth
    {
        // flat case: splice the slice between the cut content halves
        let parent = rfrom.parent();
        let content = parent.content();
        let new_content = content
            .cut(0, rfrom.parent_offset())
            .append(&slice.content)
            .append(&content.cut(rto.parent_offset(), content.size()));
        close(parent, new_content)
    } else {
        let (start, end) = prepare_slice_for_replace(slice, rfrom)?;
        close(node, replace_three_way(rfrom, &start, &end, rto, depth)?)
    }
}

fn check_join(main: &Node, sub: &Node) -> Result<(), ReplaceError> {
    if !sub.compatible_content(main) {
        return Err(ReplaceError::CannotJoin(sub.node_type(), main.node_type()));
    }
    Ok(())
}

fn joinable<'a>(
    before: &'a ResolvedPos,
    after: &ResolvedPos,
    depth: usize,
) -> Result<&'a Node, ReplaceError> {
    let node = before.node(depth);
    check_join(node, after.node(depth))?;
    Ok(node)
}

fn add_node(child: Node, target: &mut Vec<Node>) {
    match target.last_mut() {
        Some(last) if child.is_text() && child.same_markup(last) => {
            *last = last.with_text(format!("{}{}", last.text_str(), child.text_str()));
        }
        _ => target.push(child),
    }
}

fn add_range(
    start: Option<&ResolvedPos>,
    end: Option<&ResolvedPos>,
    depth: usize,
    target: &mut Vec<Node>,
) {
    let Some(at) = end.or(start) else {
        return;
    };
    let node = at.node(depth);
    let mut start_index = 0;
    let end_index = match end {
        Some(end) => end.index(depth),
        None => node.child_count(),
    };
    if let Some(start) = start {
        start_index = start.index(depth);
        if start.depth() > depth {
            start_index += 1;
        } else if start.text_offset() > 0 {
            if let Some(after) = start.node_after() {
                add_node(after, target);
            }
            start_index += 1;
        }
    }
    for i in start_index..end_index {
        add_node(node.child(i).clone(), target);
    }
    if let Some(end) = end {
        if end.depth() == depth && end.text_offset() > 0 {
            if let Some(before) = end.node_before() {
                add_node(before, target);
            }
        }
    }
}

fn close(node: &Node, content: Fragment) -> Result<Node, ReplaceError> {
    if !node.node_type().valid_content(&content) {
        return Err(ReplaceError::InvalidContent(node.node_type()));
    }
    Ok(node.copy(content))
}

fn replace_three_way(
    rfrom: &ResolvedPos,
    rstart: &ResolvedPos,
    rend: &ResolvedPos,
    rto: &ResolvedPos,
    depth: usize,
) -> Result<Fragment, ReplaceError> {
    let open_start = if rfrom.depth() > depth {
        Some(joinable(rfrom, rstart, depth + 1)?.clone())
    } else {
        None
    };
    let open_end = if rto.depth() > depth {
        Some(joinable(rend, rto, depth + 1)?.clone())
    } else {
        None
    };
    let mut content = Vec::new();
    add_range(None, Some(rfrom), depth, &mut content);
    match (&open_start, &open_end) {
        (Some(os), Some(oe)) if rstart.index(depth) == rend.index(depth) => {
            check_join(os, oe)?;
            let inner = replace_three_way(rfrom, rstart, rend, rto, depth + 1)?;
            add_node(close(os, inner)?, &mut content);
        }
        _ => {
            if let Some(os) = &open_start {
                add_node(close(os, replace_two_way(rfrom, rstart, depth + 1)?)?, &mut content);
            }
            add_range(Some(rstart), Some(rend), depth, &mut content);
            if let Some(oe) = &open_end {
                add_node(close(oe, replace_two_way(rend, rto, depth + 1)?)?, &mut content);
            }
        }
    }
    add_range(Some(rto), None, depth, &mut content);
    Ok(Fragment::from(content))
}

fn replace_two_way(
    rfrom: &ResolvedPos,
    rto: &ResolvedPos,
    depth: usize,
) -> Result<Fragment, ReplaceError> {
    let mut content = Vec::new();
    add_range(None, Some(rfrom), depth, &mut content);
    if rfrom.depth() > depth {
        let node = joinable(rfrom, rto, depth + 1)?.clone();
        let inner = replace_two_way(rfrom, rto, depth + 1)?;
        add_node(close(&node, inner)?, &mut content);
    }
    add_range(Some(rto), None, depth, &mut content);
    Ok(Fragment::from(content))
}

fn prepare_slice_for_replace(
    slice: &Slice,
    along: &ResolvedPos,
) -> Result<(ResolvedPos, ResolvedPos), ReplaceError> {
    let extra = along.depth() - slice.open_start;
    let parent = along.node(extra);
    let mut node = parent.copy(slice.content.clone());
    for depth in (0..extra).rev() {
        node = along.node(depth).copy(Fragment::from_node(node));
    }
    let start = node.resolve(slice.open_start + extra)?;
    let end = node.resolve(node.content_size() - slice.open_end - extra)?;
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(text: &str) -> Node {
        Node::paragraph(vec![Node::text(text)])
    }

    // ===== Flat replace =====

    #[test]
    fn test_delete_text_range() {
        // doc(p("abcd")): delete "bc"
        let doc = Node::doc(vec![p("abcd")]);
        let out = doc.replace(2, 4, &Slice::empty()).unwrap();
        assert_eq!(out, Node::doc(vec![p("ad")]));
    }

    #[test]
    fn test_insert_text_slice() {
        let doc = Node::doc(vec![p("ad")]);
        let slice = Slice::new(Fragment::from(vec![Node::text("bc")]), 0, 0);
        let out = doc.replace(2, 2, &slice).unwrap();
        assert_eq!(out, Node::doc(vec![p("abcd")]));
    }

    // ===== Cross-block replace =====

    #[test]
    fn test_delete_across_paragraphs_joins_them() {
        // doc(p("ab"), p("cd")): delete from after "a" to before "d"
        let doc = Node::doc(vec![p("ab"), p("cd")]);
        let out = doc.replace(2, 6, &Slice::empty()).unwrap();
        assert_eq!(out, Node::doc(vec![p("ad")]));
    }

    #[test]
    fn test_replace_with_open_slice() {
        // paste p("xy"), p("z") with both edges open over a text range
        let doc = Node::doc(vec![p("ab"), p("cd")]);
        let slice = Slice::new(Fragment::from(vec![p("xy"), p("z")]), 1, 1);
        let out = doc.replace(2, 6, &slice).unwrap();
        assert_eq!(out, Node::doc(vec![p("axy"), p("zd")]));
    }

    #[test]
    fn test_replace_rejects_incompatible_join() {
        // deleting from inside a paragraph into a bullet list's item level
        // cannot join a paragraph onto a list
        let doc = Node::doc(vec![
            p("ab"),
            Node::bullet_list(vec![Node::list_item(vec![p("cd")])]),
        ]);
        // from inside "ab" (pos 2) to directly inside the list (pos 5)
        let err = doc.replace(2, 5, &Slice::empty()).unwrap_err();
        assert!(matches!(err, ReplaceError::CannotJoin(..)), "{err:?}");
    }

    #[test]
    fn test_replace_reports_grammar_violation() {
        // dropping a list item's lead paragraph as a flat child delete
        // leaves the item starting with a blockquote, which the item
        // grammar rejects
        let doc = Node::doc(vec![Node::bullet_list(vec![Node::list_item(vec![
            p("a"),
            Node::blockquote(vec![p("b")]),
        ])])]);
        let err = doc.replace(2, 5, &Slice::empty()).unwrap_err();
        assert_eq!(err, ReplaceError::InvalidContent(NodeType::ListItem));
    }

    #[test]
    fn test_open_depth_checks() {
        let doc = Node::doc(vec![p("ab")]);
        let too_deep = Slice::new(Fragment::from(vec![p("x")]), 2, 0);
        assert_eq!(doc.replace(0, 0, &too_deep).unwrap_err(), ReplaceError::TooDeep);

        let lopsided = Slice::new(Fragment::from(vec![p("x")]), 1, 0);
        assert_eq!(
            doc.replace(1, 1, &lopsided).unwrap_err(),
            ReplaceError::InconsistentOpenDepths
        );
    }

    // ===== Slice helpers =====

    #[test]
    fn test_slice_size_subtracts_open_depths() {
        let slice = Slice::new(Fragment::from(vec![p("ab"), p("cd")]), 1, 1);
        assert_eq!(slice.content().size(), 8);
        assert_eq!(slice.size(), 6);
    }

    #[test]
    fn test_insert_at_walks_open_nodes() {
        // open list item slice, insert a paragraph after its lead paragraph
        let item = Node::list_item(vec![p("a")]);
        let slice = Slice::new(Fragment::from_node(item), 0, 0);
        let inserted = slice
            .insert_at(4, &Fragment::from_node(p("b")))
            .unwrap();
        assert_eq!(
            inserted.content().child(0),
            &Node::list_item(vec![p("a"), p("b")])
        );
    }

    #[test]
    fn test_insert_at_rejects_grammar_breakage() {
        // a paragraph cannot take a block child
        let slice = Slice::new(Fragment::from_node(p("ab")), 0, 0);
        assert!(slice.insert_at(2, &Fragment::from_node(p("x"))).is_none());
    }

    #[test]
    fn test_doc_slice_open_depths() {
        let doc = Node::doc(vec![p("ab"), p("cd")]);
        let slice = doc.slice(2, 6).unwrap();
        assert_eq!(slice.open_start(), 1);
        assert_eq!(slice.open_end(), 1);
        assert_eq!(slice.size(), 4);
        assert_eq!(slice.content().child(0), &p("b"));
        assert_eq!(slice.content().child(1), &p("c"));
    }
}

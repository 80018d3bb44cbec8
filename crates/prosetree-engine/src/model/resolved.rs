use thiserror::Error;

use crate::model::node::Node;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("position {pos} outside document of size {max}")]
    OutOfRange { pos: usize, max: usize },
}

#[derive(Debug, Clone, PartialEq)]
struct PathEntry {
    node: Node,
    index: usize,
    /// Absolute position just before the child at `index`.
    before: usize,
}

/// An integer position expanded into its chain of ancestors.
///
/// Entry `d` of the path holds the ancestor node at depth `d` together with
/// the child index the position points into and that child's absolute start.
/// Depth 0 is the document itself. Resolution walks [`Fragment::find_index`]
/// downward, so a position on a node boundary belongs to the parent rather
/// than either sibling.
///
/// [`Fragment::find_index`]: crate::model::fragment::Fragment::find_index
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPos {
    pos: usize,
    path: Vec<PathEntry>,
    parent_offset: usize,
}

impl ResolvedPos {
    pub fn resolve(doc: &Node, pos: usize) -> Result<ResolvedPos, ResolveError> {
        if pos > doc.content_size() {
            return Err(ResolveError::OutOfRange {
                pos,
                max: doc.content_size(),
            });
        }
        let mut path = Vec::new();
        let mut start = 0;
        let mut parent_offset = pos;
        let mut node = doc.clone();
        loop {
            let (index, offset) = node.content().find_index(parent_offset);
            let rem = parent_offset - offset;
            path.push(PathEntry {
                node: node.clone(),
                index,
                before: start + offset,
            });
            if rem == 0 {
                break;
            }
            let child = node.child(index).clone();
            if child.is_text() {
                break;
            }
            node = child;
            parent_offset = rem - 1;
            start += offset + 1;
        }
        Ok(ResolvedPos {
            pos,
            path,
            parent_offset,
        })
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Number of ancestors above the deepest node containing this position.
    pub fn depth(&self) -> usize {
        self.path.len() - 1
    }

    /// The ancestor node at the given depth (0 is the document).
    pub fn node(&self, depth: usize) -> &Node {
        &self.path[depth].node
    }

    /// The direct parent of the position.
    pub fn parent(&self) -> &Node {
        &self.path[self.depth()].node
    }

    pub fn doc(&self) -> &Node {
        &self.path[0].node
    }

    /// Offset of this position into its parent's content.
    pub fn parent_offset(&self) -> usize {
        self.parent_offset
    }

    /// Child index this position points into at the given depth.
    pub fn index(&self, depth: usize) -> usize {
        self.path[depth].index
    }

    /// Like [`ResolvedPos::index`], but a position on a child boundary counts
    /// the child before it as passed.
    pub fn index_after(&self, depth: usize) -> usize {
        let index = self.index(depth);
        if depth == self.depth() && self.text_offset() == 0 {
            index
        } else {
            index + 1
        }
    }

    /// Distance into the text node the position sits in, 0 when it does not
    /// sit inside one.
    pub fn text_offset(&self) -> usize {
        self.pos - self.path[self.depth()].before
    }

    /// Absolute position at the start of the ancestor's content.
    pub fn start(&self, depth: usize) -> usize {
        if depth == 0 {
            0
        } else {
            self.path[depth - 1].before + 1
        }
    }

    /// Absolute position at the end of the ancestor's content.
    pub fn end(&self, depth: usize) -> usize {
        self.start(depth) + self.node(depth).content_size()
    }

    /// Absolute position just before the ancestor at the given depth.
    /// Depth must be at least 1.
    pub fn before(&self, depth: usize) -> usize {
        self.path[depth - 1].before
    }

    /// Absolute position just after the ancestor at the given depth.
    /// Depth must be at least 1.
    pub fn after(&self, depth: usize) -> usize {
        self.before(depth) + self.node(depth).node_size()
    }

    /// Node directly after the position, cut at the position when the
    /// position sits inside a text node.
    pub fn node_after(&self) -> Option<Node> {
        let parent = self.parent();
        let index = self.index(self.depth());
        let child = parent.maybe_child(index)?;
        let off = self.text_offset();
        if off > 0 {
            Some(child.cut(off, child.node_size()))
        } else {
            Some(child.clone())
        }
    }

    /// Node directly before the position, cut at the position when the
    /// position sits inside a text node.
    pub fn node_before(&self) -> Option<Node> {
        let index = self.index(self.depth());
        let off = self.text_offset();
        if off > 0 {
            Some(self.parent().child(index).cut(0, off))
        } else if index == 0 {
            None
        } else {
            Some(self.parent().child(index - 1).clone())
        }
    }

    /// Deepest depth at which this position and `pos` fall inside the same
    /// ancestor's content.
    pub fn shared_depth(&self, pos: usize) -> usize {
        for depth in (1..=self.depth()).rev() {
            if self.start(depth) <= pos && self.end(depth) >= pos {
                return depth;
            }
        }
        0
    }

    /// The smallest node range around this position and `other` whose parent
    /// satisfies `pred`. Walks ancestors outward from the deepest candidate.
    pub fn block_range(
        &self,
        other: &ResolvedPos,
        pred: impl Fn(&Node) -> bool,
    ) -> Option<NodeRange> {
        if other.pos < self.pos {
            return other.block_range(self, pred);
        }
        let skip = if self.parent().is_textblock() || self.pos == other.pos {
            1
        } else {
            0
        };
        let top = self.depth().checked_sub(skip)?;
        for depth in (0..=top).rev() {
            if other.pos <= self.end(depth) && pred(self.node(depth)) {
                return Some(NodeRange::new(self.clone(), other.clone(), depth));
            }
        }
        None
    }
}

/// A range of sibling nodes: the children of the node at `depth` that sit
/// between the two resolved positions.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRange {
    from: ResolvedPos,
    to: ResolvedPos,
    depth: usize,
}

impl NodeRange {
    pub fn new(from: ResolvedPos, to: ResolvedPos, depth: usize) -> NodeRange {
        NodeRange { from, to, depth }
    }

    pub fn from(&self) -> &ResolvedPos {
        &self.from
    }

    pub fn to(&self) -> &ResolvedPos {
        &self.to
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Position before the first node in the range.
    pub fn start(&self) -> usize {
        self.from.before(self.depth + 1)
    }

    /// Position after the last node in the range.
    pub fn end(&self) -> usize {
        self.to.after(self.depth + 1)
    }

    pub fn parent(&self) -> &Node {
        self.from.node(self.depth)
    }

    pub fn start_index(&self) -> usize {
        self.from.index(self.depth)
    }

    pub fn end_index(&self) -> usize {
        self.to.index_after(self.depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // doc(paragraph("ab"), blockquote(paragraph("cd")))
    //     0 1  2  3      4 5         6  7 8       9 10
    fn doc() -> Node {
        Node::doc(vec![
            Node::paragraph(vec![Node::text("ab")]),
            Node::blockquote(vec![Node::paragraph(vec![Node::text("cd")])]),
        ])
    }

    #[test]
    fn test_resolve_inside_text() {
        let d = doc();
        let r = d.resolve(2).unwrap();
        assert_eq!(r.depth(), 1);
        assert_eq!(r.parent().node_type(), crate::model::node::NodeType::Paragraph);
        assert_eq!(r.parent_offset(), 1);
        assert_eq!(r.text_offset(), 1);
        assert_eq!(r.start(1), 1);
        assert_eq!(r.end(1), 3);
        assert_eq!(r.before(1), 0);
        assert_eq!(r.after(1), 4);
    }

    #[test]
    fn test_resolve_nested() {
        let d = doc();
        let r = d.resolve(7).unwrap();
        assert_eq!(r.depth(), 2);
        assert_eq!(r.start(1), 5);
        assert_eq!(r.start(2), 6);
        assert_eq!(r.end(2), 8);
        assert_eq!(r.before(2), 5);
        assert_eq!(r.after(2), 9);
        assert_eq!(r.text_offset(), 1);
    }

    #[test]
    fn test_resolve_on_boundary_belongs_to_parent() {
        let d = doc();
        let r = d.resolve(4).unwrap();
        assert_eq!(r.depth(), 0);
        assert_eq!(r.index(0), 1);
        assert_eq!(r.index_after(0), 1);
        assert_eq!(r.text_offset(), 0);
    }

    #[test]
    fn test_resolve_out_of_range() {
        let d = doc();
        assert_eq!(
            d.resolve(11),
            Err(ResolveError::OutOfRange { pos: 11, max: 10 })
        );
        assert!(d.resolve(10).is_ok());
    }

    #[test]
    fn test_node_before_and_after_cut_text() {
        let d = doc();
        let r = d.resolve(2).unwrap();
        assert_eq!(r.node_before(), Some(Node::text("a")));
        assert_eq!(r.node_after(), Some(Node::text("b")));

        let start = d.resolve(1).unwrap();
        assert_eq!(start.node_before(), None);
        assert_eq!(start.node_after(), Some(Node::text("ab")));
    }

    #[test]
    fn test_shared_depth() {
        let d = doc();
        let r = d.resolve(7).unwrap();
        assert_eq!(r.shared_depth(7), 2);
        assert_eq!(r.shared_depth(6), 2);
        assert_eq!(r.shared_depth(5), 1);
        assert_eq!(r.shared_depth(2), 0);
    }

    #[test]
    fn test_block_range_around_cursor() {
        let d = doc();
        let r = d.resolve(2).unwrap();
        let range = r.block_range(&r, |_| true).unwrap();
        assert_eq!(range.depth(), 0);
        assert_eq!(range.start(), 0);
        assert_eq!(range.end(), 4);
        assert_eq!(range.start_index(), 0);
        assert_eq!(range.end_index(), 1);
    }

    #[test]
    fn test_block_range_with_predicate() {
        let list = Node::doc(vec![Node::bullet_list(vec![Node::list_item(vec![
            Node::paragraph(vec![Node::text("a")]),
        ])])]);
        // cursor inside "a": doc 0, ul 0..7, li 1..6, p 2..5, text 3..4
        let r = list.resolve(3).unwrap();
        let range = r
            .block_range(&r, |n| {
                n.node_type() == crate::model::node::NodeType::BulletList
            })
            .unwrap();
        assert_eq!(range.depth(), 1);
        assert_eq!(range.start(), 1);
        assert_eq!(range.end(), 6);
    }
}

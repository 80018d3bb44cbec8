use std::fmt;
use std::sync::Arc;

use serde::de::{SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::model::node::Node;

/// An immutable sequence of sibling nodes.
///
/// The children live behind an `Arc` slice so copying a fragment, and with it
/// the untouched parts of a tree during an edit, is a pointer bump. The total
/// size in position tokens is computed once at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    children: Arc<[Node]>,
    size: usize,
}

impl Fragment {
    pub fn empty() -> Fragment {
        Fragment {
            children: Arc::from(Vec::new()),
            size: 0,
        }
    }

    pub fn from_node(node: Node) -> Fragment {
        Fragment::from(vec![node])
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn count(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn child(&self, index: usize) -> &Node {
        &self.children[index]
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.children.first()
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.children.last()
    }

    /// Locate the child under the given offset into this fragment.
    ///
    /// Returns `(index, offset_of_child_start)`. An offset that falls exactly
    /// on a child boundary resolves to the child after it, so `pos == size`
    /// yields `(count, size)`.
    ///
    /// Caller must ensure `pos <= self.size()`.
    pub fn find_index(&self, pos: usize) -> (usize, usize) {
        if pos == 0 {
            return (0, 0);
        }
        let mut cur = 0;
        for (i, child) in self.children.iter().enumerate() {
            let end = cur + child.node_size();
            if end >= pos {
                return if end == pos { (i + 1, end) } else { (i, cur) };
            }
            cur = end;
        }
        (self.children.len(), self.size)
    }

    /// Sub-fragment between two offsets, cutting into children that straddle
    /// a boundary.
    pub fn cut(&self, from: usize, to: usize) -> Fragment {
        if from == 0 && to == self.size {
            return self.clone();
        }
        let mut result = Vec::new();
        let mut size = 0;
        if to > from {
            let mut pos = 0;
            for child in self.children.iter() {
                if pos >= to {
                    break;
                }
                let end = pos + child.node_size();
                if end > from {
                    let cut = if pos < from || end > to {
                        if child.is_text() {
                            child.cut(from.saturating_sub(pos), (to - pos).min(child.node_size()))
                        } else {
                            child.cut(
                                from.saturating_sub(pos + 1),
                                (to - pos - 1).min(child.content_size()),
                            )
                        }
                    } else {
                        child.clone()
                    };
                    size += cut.node_size();
                    result.push(cut);
                }
                pos = end;
            }
        }
        Fragment {
            children: result.into(),
            size,
        }
    }

    /// Sub-fragment by child index range.
    pub fn cut_by_index(&self, from: usize, to: usize) -> Fragment {
        Fragment::from(self.children[from..to].to_vec())
    }

    /// Concatenate two fragments, merging a trailing and leading text node
    /// when their markup matches.
    pub fn append(&self, other: &Fragment) -> Fragment {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }
        let mut children: Vec<Node> = self.children.to_vec();
        let mut skip = 0;
        if let (Some(last), Some(first)) = (children.last_mut(), other.first_child()) {
            if last.is_text() && last.same_markup(first) {
                *last = last.with_text(format!("{}{}", last.text_str(), first.text_str()));
                skip = 1;
            }
        }
        children.extend(other.children.iter().skip(skip).cloned());
        Fragment {
            children: children.into(),
            size: self.size + other.size,
        }
    }

    /// Fragment with one child swapped out.
    pub fn replace_child(&self, index: usize, node: Node) -> Fragment {
        if self.children[index] == node {
            return self.clone();
        }
        let mut children: Vec<Node> = self.children.to_vec();
        let size = self.size + node.node_size() - children[index].node_size();
        children[index] = node;
        Fragment {
            children: children.into(),
            size,
        }
    }

    /// Fragment with a node appended.
    pub fn add_to_end(&self, node: Node) -> Fragment {
        let size = self.size + node.node_size();
        let mut children: Vec<Node> = self.children.to_vec();
        children.push(node);
        Fragment {
            children: children.into(),
            size,
        }
    }
}

impl Default for Fragment {
    fn default() -> Self {
        Fragment::empty()
    }
}

impl From<Vec<Node>> for Fragment {
    fn from(children: Vec<Node>) -> Self {
        let size = children.iter().map(Node::node_size).sum();
        Fragment {
            children: children.into(),
            size,
        }
    }
}

impl Serialize for Fragment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.children.len()))?;
        for child in self.children.iter() {
            seq.serialize_element(child)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Fragment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FragmentVisitor;

        impl<'de> Visitor<'de> for FragmentVisitor {
            type Value = Fragment;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a sequence of nodes")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Fragment, A::Error> {
                let mut children = Vec::with_capacity(seq.size_hint().unwrap_or(0));
                while let Some(node) = seq.next_element::<Node>()? {
                    children.push(node);
                }
                Ok(Fragment::from(children))
            }
        }

        deserializer.deserialize_seq(FragmentVisitor)
    }
}

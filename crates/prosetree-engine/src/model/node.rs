use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::content::ContentMatch;
use crate::model::fragment::Fragment;
use crate::model::replace::{replace, ReplaceError, Slice};
use crate::model::resolved::{ResolveError, ResolvedPos};

/// Inline annotation attached to a run of text.
///
/// Mark sets are order-insensitive for equality but keep insertion order so a
/// serializer can emit delimiters deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mark {
    Emphasis,
    Strong,
    Code,
    Link {
        href: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
}

/// The type tag of a node, without its attributes or content.
///
/// Declaration order inside each class below is semantic: it is the tie-break
/// order for the grammar's wrapping search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Doc,
    Paragraph,
    Heading,
    Blockquote,
    CodeBlock,
    BulletList,
    OrderedList,
    ListItem,
    HorizontalRule,
    Text,
    Image,
    HardBreak,
}

impl NodeType {
    /// Block-class types in declaration order.
    pub const BLOCKS: [NodeType; 7] = [
        NodeType::Paragraph,
        NodeType::Heading,
        NodeType::Blockquote,
        NodeType::CodeBlock,
        NodeType::BulletList,
        NodeType::OrderedList,
        NodeType::HorizontalRule,
    ];

    /// Inline-class types in declaration order.
    pub const INLINES: [NodeType; 3] = [NodeType::Text, NodeType::Image, NodeType::HardBreak];

    pub fn is_block(self) -> bool {
        NodeType::BLOCKS.contains(&self)
    }

    pub fn is_inline(self) -> bool {
        NodeType::INLINES.contains(&self)
    }

    /// A textblock holds inline content directly (paragraph, heading, code).
    pub fn is_textblock(self) -> bool {
        matches!(
            self,
            NodeType::Paragraph | NodeType::Heading | NodeType::CodeBlock
        )
    }

    /// Leaf types own no content sequence at all.
    pub fn is_leaf(self) -> bool {
        matches!(
            self,
            NodeType::HorizontalRule | NodeType::Text | NodeType::Image | NodeType::HardBreak
        )
    }

    /// Isolating nodes never merge or split across their boundary.
    pub fn isolating(self) -> bool {
        matches!(self, NodeType::CodeBlock)
    }

    /// Create a node of this type with default attributes and the given
    /// content. Used by the wrapping search, which only ever creates
    /// non-leaf wrapper nodes.
    pub fn create(self, content: Fragment) -> Node {
        let kind = match self {
            NodeType::Doc => NodeKind::Doc,
            NodeType::Paragraph => NodeKind::Paragraph,
            NodeType::Heading => NodeKind::Heading { level: 1 },
            NodeType::Blockquote => NodeKind::Blockquote,
            NodeType::CodeBlock => NodeKind::CodeBlock {
                info: String::new(),
            },
            NodeType::BulletList => NodeKind::BulletList,
            NodeType::OrderedList => NodeKind::OrderedList { start: 1 },
            NodeType::ListItem => NodeKind::ListItem,
            NodeType::HorizontalRule => NodeKind::HorizontalRule,
            NodeType::Text => NodeKind::Text {
                text: String::new(),
                marks: Vec::new(),
            },
            NodeType::Image => NodeKind::Image {
                src: String::new(),
                title: None,
                alt: String::new(),
            },
            NodeType::HardBreak => NodeKind::HardBreak,
        };
        Node { kind, content }
    }

    /// Start state of this type's content grammar.
    pub fn content_match(self) -> ContentMatch {
        ContentMatch::start(self)
    }

    /// Whether `content` is a complete, valid child sequence for this type.
    pub fn valid_content(self, content: &Fragment) -> bool {
        match self.content_match().match_fragment(content, 0, content.count()) {
            Some(m) => m.valid_end(),
            None => false,
        }
    }
}

/// Node variant with its attributes. Content lives on [`Node`] so tree
/// algorithms can treat all non-leaf kinds uniformly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    Doc,
    Paragraph,
    Heading {
        level: u8,
    },
    Blockquote,
    CodeBlock {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        info: String,
    },
    BulletList,
    OrderedList {
        start: u32,
    },
    ListItem,
    HorizontalRule,
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        marks: Vec<Mark>,
    },
    Image {
        src: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        alt: String,
    },
    HardBreak,
}

impl NodeKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Doc => NodeType::Doc,
            NodeKind::Paragraph => NodeType::Paragraph,
            NodeKind::Heading { .. } => NodeType::Heading,
            NodeKind::Blockquote => NodeType::Blockquote,
            NodeKind::CodeBlock { .. } => NodeType::CodeBlock,
            NodeKind::BulletList => NodeType::BulletList,
            NodeKind::OrderedList { .. } => NodeType::OrderedList,
            NodeKind::ListItem => NodeType::ListItem,
            NodeKind::HorizontalRule => NodeType::HorizontalRule,
            NodeKind::Text { .. } => NodeType::Text,
            NodeKind::Image { .. } => NodeType::Image,
            NodeKind::HardBreak => NodeType::HardBreak,
        }
    }
}

/// Errors raised by whole-tree validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid content for {0:?} node")]
    InvalidContent(NodeType),
    #[error("{0:?} node may not carry content")]
    ContentOnLeaf(NodeType),
    #[error("{0:?} mark not allowed in {1:?} node")]
    DisallowedMark(Mark, NodeType),
}

/// One node in the document tree.
///
/// Nodes are immutable values: every edit builds new nodes around shared,
/// unchanged subtrees (the child sequence is an `Arc` slice inside
/// [`Fragment`]). Position arithmetic counts one token for each non-leaf
/// node's opening and closing boundary, one token per leaf node, and one per
/// `char` of text, which is what makes integer offsets meaningful across the
/// whole tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(flatten)]
    kind: NodeKind,
    #[serde(default, skip_serializing_if = "Fragment::is_empty")]
    content: Fragment,
}

impl Node {
    pub fn new(kind: NodeKind, content: Fragment) -> Self {
        Node { kind, content }
    }

    // ===== Constructors (the API the external parser targets) =====

    pub fn doc(children: Vec<Node>) -> Node {
        Node::new(NodeKind::Doc, Fragment::from(children))
    }

    pub fn paragraph(children: Vec<Node>) -> Node {
        Node::new(NodeKind::Paragraph, Fragment::from(children))
    }

    pub fn heading(level: u8, children: Vec<Node>) -> Node {
        Node::new(NodeKind::Heading { level }, Fragment::from(children))
    }

    pub fn blockquote(children: Vec<Node>) -> Node {
        Node::new(NodeKind::Blockquote, Fragment::from(children))
    }

    pub fn code_block(info: &str, children: Vec<Node>) -> Node {
        Node::new(
            NodeKind::CodeBlock {
                info: info.to_string(),
            },
            Fragment::from(children),
        )
    }

    pub fn bullet_list(children: Vec<Node>) -> Node {
        Node::new(NodeKind::BulletList, Fragment::from(children))
    }

    pub fn ordered_list(start: u32, children: Vec<Node>) -> Node {
        Node::new(NodeKind::OrderedList { start }, Fragment::from(children))
    }

    pub fn list_item(children: Vec<Node>) -> Node {
        Node::new(NodeKind::ListItem, Fragment::from(children))
    }

    pub fn horizontal_rule() -> Node {
        Node::new(NodeKind::HorizontalRule, Fragment::empty())
    }

    pub fn image(src: &str, title: Option<&str>, alt: &str) -> Node {
        Node::new(
            NodeKind::Image {
                src: src.to_string(),
                title: title.map(str::to_string),
                alt: alt.to_string(),
            },
            Fragment::empty(),
        )
    }

    pub fn hard_break() -> Node {
        Node::new(NodeKind::HardBreak, Fragment::empty())
    }

    pub fn text(text: &str) -> Node {
        Node::text_with_marks(text, Vec::new())
    }

    pub fn text_with_marks(text: &str, marks: Vec<Mark>) -> Node {
        Node::new(
            NodeKind::Text {
                text: text.to_string(),
                marks,
            },
            Fragment::empty(),
        )
    }

    // ===== Accessors =====

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    pub fn content(&self) -> &Fragment {
        &self.content
    }

    pub fn child_count(&self) -> usize {
        self.content.count()
    }

    pub fn child(&self, index: usize) -> &Node {
        self.content.child(index)
    }

    pub fn maybe_child(&self, index: usize) -> Option<&Node> {
        self.content.maybe_child(index)
    }

    pub fn first_child(&self) -> Option<&Node> {
        self.content.maybe_child(0)
    }

    pub fn last_child(&self) -> Option<&Node> {
        self.child_count()
            .checked_sub(1)
            .map(|i| self.content.child(i))
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text { .. })
    }

    pub fn is_leaf(&self) -> bool {
        self.node_type().is_leaf()
    }

    pub fn is_block(&self) -> bool {
        self.node_type().is_block()
    }

    pub fn is_inline(&self) -> bool {
        self.node_type().is_inline()
    }

    pub fn is_textblock(&self) -> bool {
        self.node_type().is_textblock()
    }

    pub fn isolating(&self) -> bool {
        self.node_type().isolating()
    }

    /// Marks on a text node; empty for every other kind.
    pub fn marks(&self) -> &[Mark] {
        match &self.kind {
            NodeKind::Text { marks, .. } => marks,
            _ => &[],
        }
    }

    /// Text of a text node; empty for every other kind.
    pub fn text_str(&self) -> &str {
        match &self.kind {
            NodeKind::Text { text, .. } => text,
            _ => "",
        }
    }

    /// Size of this node in position tokens.
    pub fn node_size(&self) -> usize {
        match &self.kind {
            NodeKind::Text { text, .. } => text.chars().count(),
            _ if self.is_leaf() => 1,
            _ => self.content.size() + 2,
        }
    }

    pub fn content_size(&self) -> usize {
        self.content.size()
    }

    /// Concatenated text of all text descendants, in document order.
    pub fn text_content(&self) -> String {
        match &self.kind {
            NodeKind::Text { text, .. } => text.clone(),
            _ => self
                .content
                .children()
                .iter()
                .map(Node::text_content)
                .collect(),
        }
    }

    /// New node of the same kind around different content.
    pub fn copy(&self, content: Fragment) -> Node {
        Node {
            kind: self.kind.clone(),
            content,
        }
    }

    /// Text node with the same marks around different text.
    pub fn with_text(&self, text: String) -> Node {
        match &self.kind {
            NodeKind::Text { marks, .. } => Node::new(
                NodeKind::Text {
                    text,
                    marks: marks.clone(),
                },
                Fragment::empty(),
            ),
            _ => self.clone(),
        }
    }

    /// Same kind and, for text, the same mark set (order-insensitive).
    pub fn same_markup(&self, other: &Node) -> bool {
        match (&self.kind, &other.kind) {
            (NodeKind::Text { marks: a, .. }, NodeKind::Text { marks: b, .. }) => marks_eq(a, b),
            (a, b) => a == b,
        }
    }

    /// Cut out a sub-range of this node's content (text nodes cut by chars,
    /// others recursively through [`Fragment::cut`]).
    pub fn cut(&self, from: usize, to: usize) -> Node {
        match &self.kind {
            NodeKind::Text { text, .. } => {
                let sliced: String = text.chars().skip(from).take(to.saturating_sub(from)).collect();
                self.with_text(sliced)
            }
            _ => {
                if from == 0 && to == self.content.size() {
                    self.clone()
                } else {
                    self.copy(self.content.cut(from, to))
                }
            }
        }
    }

    // ===== Position model =====

    /// Expand an integer offset into its ancestor chain. Fails only when the
    /// offset lies outside `[0, content_size]` of this (root) node.
    pub fn resolve(&self, pos: usize) -> Result<ResolvedPos, ResolveError> {
        ResolvedPos::resolve(self, pos)
    }

    /// The content between two positions as a [`Slice`], with open depths
    /// describing how far each edge cuts into the tree.
    pub fn slice(&self, from: usize, to: usize) -> Result<Slice, ResolveError> {
        if from == to {
            return Ok(Slice::default());
        }
        let rfrom = self.resolve(from)?;
        let rto = self.resolve(to)?;
        let depth = rfrom.shared_depth(to).min(rto.depth());
        let start = rfrom.start(depth);
        let content = rfrom.node(depth).content().cut(from - start, to - start);
        Ok(Slice::new(content, rfrom.depth() - depth, rto.depth() - depth))
    }

    /// Replace `[from, to)` with a slice, producing a new tree.
    pub fn replace(&self, from: usize, to: usize, slice: &Slice) -> Result<Node, ReplaceError> {
        let rfrom = self.resolve(from).map_err(ReplaceError::Resolve)?;
        let rto = self.resolve(to).map_err(ReplaceError::Resolve)?;
        replace(&rfrom, &rto, slice)
    }

    // ===== Grammar queries =====

    /// Grammar state after matching children `0..index` of this node.
    /// `None` means the existing children already violate the grammar.
    pub fn content_match_at(&self, index: usize) -> Option<ContentMatch> {
        self.node_type()
            .content_match()
            .match_fragment(&self.content, 0, index)
    }

    /// Whether splicing `replacement` over child indices `[from, to)` keeps
    /// this node's child sequence grammar-valid. Pure query.
    pub fn can_replace(&self, from: usize, to: usize, replacement: &Fragment) -> bool {
        let Some(one) = self
            .content_match_at(from)
            .and_then(|m| m.match_fragment(replacement, 0, replacement.count()))
        else {
            return false;
        };
        match one.match_fragment(&self.content, to, self.content.count()) {
            Some(two) => two.valid_end(),
            None => false,
        }
    }

    /// Like [`Node::can_replace`] with a single node of the given type.
    pub fn can_replace_with(&self, from: usize, to: usize, ty: NodeType) -> bool {
        let Some(one) = self.content_match_at(from).and_then(|m| m.match_type(ty)) else {
            return false;
        };
        match one.match_fragment(&self.content, to, self.content.count()) {
            Some(two) => two.valid_end(),
            None => false,
        }
    }

    /// Whether `other`'s children could follow this node's children under
    /// this node's grammar (the join precondition).
    pub fn can_append(&self, other: &Node) -> bool {
        if other.content_size() > 0 {
            self.can_replace(self.child_count(), self.child_count(), &other.content)
        } else {
            self.compatible_content(other)
        }
    }

    /// Whether the two nodes' grammars admit a shared child type, i.e. their
    /// child sequences could in principle be concatenated.
    pub fn compatible_content(&self, other: &Node) -> bool {
        self.node_type()
            .content_match()
            .compatible(other.node_type().content_match())
    }

    /// Validate this node and every descendant against the grammar.
    pub fn check(&self) -> Result<(), ModelError> {
        let ty = self.node_type();
        if ty.is_leaf() {
            if self.content.count() > 0 {
                return Err(ModelError::ContentOnLeaf(ty));
            }
            return Ok(());
        }
        if !ty.valid_content(&self.content) {
            return Err(ModelError::InvalidContent(ty));
        }
        for child in self.content.children() {
            child.check()?;
        }
        Ok(())
    }

    // ===== Serialization boundary =====

    /// Parse a node tree from the JSON form the external parser produces.
    pub fn from_json(json: &str) -> Result<Node, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize this tree for the external serializer.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Order-insensitive mark set equality.
pub(crate) fn marks_eq(a: &[Mark], b: &[Mark]) -> bool {
    a.len() == b.len() && a.iter().all(|m| b.contains(m))
}

/*!
Content grammar for the fixed schema.

Each node type constrains its child sequence with one of a small set of
expression shapes (`block+`, `inline*`, `text*`, `list_item+`, and the
list item's `paragraph block*`). A [`ContentMatch`] is a state in the
matching automaton for one of those expressions: the expression plus a flag
recording whether anything has been consumed yet, which is all these shapes
need to distinguish their states.
*/

use crate::model::fragment::Fragment;
use crate::model::node::NodeType;

/// A set of node types a grammar position accepts, with a fixed candidate
/// order used wherever the engine has to pick one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Block,
    Inline,
    OnlyText,
    OnlyListItem,
    OnlyParagraph,
}

impl Class {
    fn members(self) -> &'static [NodeType] {
        match self {
            Class::Block => &NodeType::BLOCKS,
            Class::Inline => &NodeType::INLINES,
            Class::OnlyText => &[NodeType::Text],
            Class::OnlyListItem => &[NodeType::ListItem],
            Class::OnlyParagraph => &[NodeType::Paragraph],
        }
    }

    fn contains(self, ty: NodeType) -> bool {
        self.members().contains(&ty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expr {
    /// No children allowed.
    Empty,
    ZeroOrMore(Class),
    OneOrMore(Class),
    /// Exactly one of the first class, then zero or more of the second.
    LeadThen(Class, Class),
}

fn expr_for(ty: NodeType) -> Expr {
    match ty {
        NodeType::Doc | NodeType::Blockquote => Expr::OneOrMore(Class::Block),
        NodeType::Paragraph | NodeType::Heading => Expr::ZeroOrMore(Class::Inline),
        NodeType::CodeBlock => Expr::ZeroOrMore(Class::OnlyText),
        NodeType::BulletList | NodeType::OrderedList => Expr::OneOrMore(Class::OnlyListItem),
        NodeType::ListItem => Expr::LeadThen(Class::OnlyParagraph, Class::Block),
        NodeType::HorizontalRule | NodeType::Text | NodeType::Image | NodeType::HardBreak => {
            Expr::Empty
        }
    }
}

/// A state in a node type's content automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentMatch {
    expr: Expr,
    consumed: bool,
}

impl ContentMatch {
    /// The start state for a node type's grammar.
    pub fn start(ty: NodeType) -> ContentMatch {
        ContentMatch {
            expr: expr_for(ty),
            consumed: false,
        }
    }

    /// Consume one child of the given type, if the grammar allows it here.
    pub fn match_type(self, ty: NodeType) -> Option<ContentMatch> {
        let ok = match self.expr {
            Expr::Empty => false,
            Expr::ZeroOrMore(c) | Expr::OneOrMore(c) => c.contains(ty),
            Expr::LeadThen(first, rest) => {
                if self.consumed {
                    rest.contains(ty)
                } else {
                    first.contains(ty)
                }
            }
        };
        ok.then_some(ContentMatch {
            expr: self.expr,
            consumed: true,
        })
    }

    /// Consume children `[from, to)` of a fragment in order.
    pub fn match_fragment(self, frag: &Fragment, from: usize, to: usize) -> Option<ContentMatch> {
        let mut state = self;
        for child in &frag.children()[from..to] {
            state = state.match_type(child.node_type())?;
        }
        Some(state)
    }

    /// Whether stopping here yields a complete child sequence.
    pub fn valid_end(self) -> bool {
        match self.expr {
            Expr::Empty | Expr::ZeroOrMore(_) => true,
            Expr::OneOrMore(_) | Expr::LeadThen(..) => self.consumed,
        }
    }

    /// The node types this state accepts next, in candidate order.
    pub fn next_types(self) -> &'static [NodeType] {
        match self.expr {
            Expr::Empty => &[],
            Expr::ZeroOrMore(c) | Expr::OneOrMore(c) => c.members(),
            Expr::LeadThen(first, rest) => {
                if self.consumed {
                    rest.members()
                } else {
                    first.members()
                }
            }
        }
    }

    /// First acceptable type at this state, used to synthesize filler nodes.
    pub fn default_type(self) -> Option<NodeType> {
        self.next_types().first().copied()
    }

    /// Whether the two states accept any type in common, which is the
    /// precondition for merging their nodes' child sequences.
    pub fn compatible(self, other: ContentMatch) -> bool {
        self.next_types()
            .iter()
            .any(|ty| other.next_types().contains(ty))
    }

    /// Breadth-first search for a chain of wrapper types such that `target`
    /// fits inside the innermost wrapper and the chain fits at this state.
    /// Candidate order follows type declaration order, so the shortest and
    /// earliest-declared chain wins.
    pub fn find_wrapping(self, target: NodeType) -> Option<Vec<NodeType>> {
        let mut seen: Vec<NodeType> = Vec::new();
        let mut active: Vec<(ContentMatch, Vec<NodeType>)> = vec![(self, Vec::new())];
        let mut at = 0;
        while at < active.len() {
            let (state, path) = active[at].clone();
            at += 1;
            if state.match_type(target).is_some() {
                return Some(path);
            }
            for &ty in state.next_types() {
                if ty.is_leaf() || seen.contains(&ty) {
                    continue;
                }
                // Entering a wrapper below the root must leave the outer
                // sequence completable.
                let enterable = match state.match_type(ty) {
                    Some(after) => path.is_empty() || after.valid_end(),
                    None => false,
                };
                if enterable {
                    seen.push(ty);
                    let mut next_path = path.clone();
                    next_path.push(ty);
                    active.push((ContentMatch::start(ty), next_path));
                }
            }
        }
        None
    }
}

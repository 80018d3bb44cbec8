use crate::model::{Fragment, Node, NodeRange, NodeType, Slice};
use crate::transform::map::Mapping;
use crate::transform::step::Step;
use crate::transform::structure::TypesAfter;
use crate::transform::TransformError;

/// An ordered list of steps applied to a document.
///
/// The transaction owns the current document, every intermediate document,
/// and the accumulated [`Mapping`], so positions captured before any step can
/// be carried to the latest document. Steps either apply fully or leave the
/// transaction untouched.
#[derive(Debug, Clone)]
pub struct Transaction {
    doc: Node,
    steps: Vec<Step>,
    docs: Vec<Node>,
    mapping: Mapping,
}

impl Transaction {
    pub fn new(doc: Node) -> Transaction {
        Transaction {
            doc,
            steps: Vec::new(),
            docs: Vec::new(),
            mapping: Mapping::new(),
        }
    }

    /// The document as of the latest step.
    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// The document the transaction started from.
    pub fn before(&self) -> &Node {
        self.docs.first().unwrap_or(&self.doc)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Whether any step has been applied.
    pub fn changed(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Apply one step. On failure the transaction is left as it was.
    pub fn step(&mut self, step: Step) -> Result<(), TransformError> {
        let new_doc = step.apply(&self.doc)?;
        self.mapping.append_map(step.step_map());
        self.docs.push(std::mem::replace(&mut self.doc, new_doc));
        self.steps.push(step);
        Ok(())
    }

    /// Delete the given range.
    pub fn delete(&mut self, from: usize, to: usize) -> Result<(), TransformError> {
        self.step(Step::replace(from, to, Slice::empty()))
    }

    /// Replace the given range with a slice.
    pub fn replace(&mut self, from: usize, to: usize, slice: Slice) -> Result<(), TransformError> {
        self.step(Step::replace(from, to, slice))
    }

    /// Join the nodes around `pos`, erasing `depth` levels of boundary.
    pub fn join(&mut self, pos: usize, depth: usize) -> Result<(), TransformError> {
        self.step(Step::Replace {
            from: pos - depth,
            to: pos + depth,
            slice: Slice::empty(),
            structure: true,
        })
    }

    /// Split the node stack at `pos`, `depth` levels up. `types_after` may
    /// override the types of the nodes created after the split point,
    /// outermost first.
    pub fn split(
        &mut self,
        pos: usize,
        depth: usize,
        types_after: TypesAfter,
    ) -> Result<(), TransformError> {
        let rpos = self.doc.resolve(pos)?;
        let Some(end) = rpos.depth().checked_sub(depth) else {
            return Err(TransformError::SplitTooDeep);
        };
        let mut before = Fragment::empty();
        let mut after = Fragment::empty();
        let mut d = rpos.depth();
        let mut i = depth;
        while d > end {
            i -= 1;
            before = Fragment::from_node(rpos.node(d).copy(before));
            let after_type: Option<NodeType> = types_after
                .and_then(|types| types.get(i))
                .copied()
                .flatten();
            after = Fragment::from_node(match after_type {
                Some(ty) => ty.create(after),
                None => rpos.node(d).copy(after),
            });
            d -= 1;
        }
        self.step(Step::Replace {
            from: pos,
            to: pos,
            slice: Slice::new(before.append(&after), depth, depth),
            structure: true,
        })
    }

    /// Lift the nodes in `range` out of their parent, to the ancestor at
    /// depth `target` (as found by [`lift_target`]).
    ///
    /// [`lift_target`]: crate::transform::structure::lift_target
    pub fn lift(&mut self, range: &NodeRange, target: usize) -> Result<(), TransformError> {
        let rfrom = range.from();
        let rto = range.to();
        let depth = range.depth();
        let gap_start = rfrom.before(depth + 1);
        let gap_end = rto.after(depth + 1);
        let mut start = gap_start;
        let mut end = gap_end;

        let mut before = Fragment::empty();
        let mut open_start = 0;
        let mut splitting = false;
        for d in ((target + 1)..=depth).rev() {
            if splitting || rfrom.index(d) > 0 {
                splitting = true;
                before = Fragment::from_node(rfrom.node(d).copy(before));
                open_start += 1;
            } else {
                start -= 1;
            }
        }
        let mut after = Fragment::empty();
        let mut open_end = 0;
        let mut splitting = false;
        for d in ((target + 1)..=depth).rev() {
            if splitting || rto.after(d + 1) < rto.end(d) {
                splitting = true;
                after = Fragment::from_node(rto.node(d).copy(after));
                open_end += 1;
            } else {
                end += 1;
            }
        }

        let insert = before.size() - open_start;
        self.step(Step::ReplaceAround {
            from: start,
            to: end,
            gap_from: gap_start,
            gap_to: gap_end,
            slice: Slice::new(before.append(&after), open_start, open_end),
            insert,
            structure: true,
        })
    }
}

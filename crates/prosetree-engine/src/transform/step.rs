use crate::model::{Node, Slice};
use crate::transform::map::{Assoc, Mapping, StepMap};
use crate::transform::structure::content_between;
use crate::transform::TransformError;

/// One atomic, invertible document change.
///
/// Both variants are expressed as range replacement, which keeps position
/// mapping uniform. `ReplaceAround` replaces an outer range while moving the
/// content of an inner gap into the inserted slice, which is how wrapping
/// and unwrapping edits preserve the wrapped content.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Replace {
        from: usize,
        to: usize,
        slice: Slice,
        /// Refuse to apply when the replaced range covers actual content
        /// rather than just node boundaries.
        structure: bool,
    },
    ReplaceAround {
        from: usize,
        to: usize,
        gap_from: usize,
        gap_to: usize,
        slice: Slice,
        /// Offset into the slice where the gap content is re-inserted.
        insert: usize,
        structure: bool,
    },
}

impl Step {
    pub fn replace(from: usize, to: usize, slice: Slice) -> Step {
        Step::Replace {
            from,
            to,
            slice,
            structure: false,
        }
    }

    pub fn apply(&self, doc: &Node) -> Result<Node, TransformError> {
        match self {
            Step::Replace {
                from,
                to,
                slice,
                structure,
            } => {
                if *structure && content_between(doc, *from, *to)? {
                    return Err(TransformError::WouldOverwriteContent);
                }
                Ok(doc.replace(*from, *to, slice)?)
            }
            Step::ReplaceAround {
                from,
                to,
                gap_from,
                gap_to,
                slice,
                insert,
                structure,
            } => {
                if *structure
                    && (content_between(doc, *from, *gap_from)?
                        || content_between(doc, *gap_to, *to)?)
                {
                    return Err(TransformError::WouldOverwriteContent);
                }
                let gap = doc.slice(*gap_from, *gap_to)?;
                if gap.open_start() > 0 || gap.open_end() > 0 {
                    return Err(TransformError::NonFlatGap);
                }
                let inserted = slice
                    .insert_at(*insert, gap.content())
                    .ok_or(TransformError::GapContentMismatch)?;
                Ok(doc.replace(*from, *to, &inserted)?)
            }
        }
    }

    /// The step that undoes this one, given the document it applied to.
    pub fn invert(&self, doc: &Node) -> Result<Step, TransformError> {
        match self {
            Step::Replace { from, to, slice, .. } => Ok(Step::Replace {
                from: *from,
                to: from + slice.size(),
                slice: doc.slice(*from, *to)?,
                structure: false,
            }),
            Step::ReplaceAround {
                from,
                to,
                gap_from,
                gap_to,
                slice,
                insert,
                structure,
            } => {
                let gap = gap_to - gap_from;
                let inverted_slice = doc
                    .slice(*from, *to)?
                    .remove_between(gap_from - from, gap_to - from)?;
                Ok(Step::ReplaceAround {
                    from: *from,
                    to: from + slice.size() + gap,
                    gap_from: from + insert,
                    gap_to: from + insert + gap,
                    slice: inverted_slice,
                    insert: gap_from - from,
                    structure: *structure,
                })
            }
        }
    }

    /// Rebase this step across other changes. `None` when the content it
    /// addressed was deleted.
    ///
    /// Deletion is judged by [`MapResult::deleted`](crate::transform::MapResult),
    /// which flags positions
    /// strictly inside a replaced range. A step whose endpoints both sit
    /// exactly on the edges of a deletion therefore survives remapping as an
    /// empty-range step rather than being dropped.
    pub fn map(&self, mapping: &Mapping) -> Option<Step> {
        match self {
            Step::Replace {
                from,
                to,
                slice,
                structure,
            } => {
                let from = mapping.map_result(*from, Assoc::After);
                let to = mapping.map_result(*to, Assoc::Before);
                if from.deleted && to.deleted {
                    return None;
                }
                Some(Step::Replace {
                    from: from.pos,
                    to: to.pos.max(from.pos),
                    slice: slice.clone(),
                    structure: *structure,
                })
            }
            Step::ReplaceAround {
                from,
                to,
                gap_from,
                gap_to,
                slice,
                insert,
                structure,
            } => {
                let mapped_from = mapping.map_result(*from, Assoc::After);
                let mapped_to = mapping.map_result(*to, Assoc::Before);
                let mapped_gap_from = if gap_from == from {
                    mapped_from.pos
                } else {
                    mapping.map(*gap_from, Assoc::Before)
                };
                let mapped_gap_to = if gap_to == to {
                    mapped_to.pos
                } else {
                    mapping.map(*gap_to, Assoc::After)
                };
                if (mapped_from.deleted && mapped_to.deleted)
                    || mapped_gap_from < mapped_from.pos
                    || mapped_gap_to > mapped_to.pos
                {
                    return None;
                }
                Some(Step::ReplaceAround {
                    from: mapped_from.pos,
                    to: mapped_to.pos,
                    gap_from: mapped_gap_from,
                    gap_to: mapped_gap_to,
                    slice: slice.clone(),
                    insert: *insert,
                    structure: *structure,
                })
            }
        }
    }

    /// The position map this step produces.
    pub fn step_map(&self) -> StepMap {
        match self {
            Step::Replace { from, to, slice, .. } => {
                StepMap::new([(*from, to - from, slice.size())])
            }
            Step::ReplaceAround {
                from,
                to,
                gap_from,
                gap_to,
                slice,
                insert,
                ..
            } => StepMap::new([
                (*from, gap_from - from, *insert),
                (*gap_to, to - gap_to, slice.size() - insert),
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Fragment;

    fn p(text: &str) -> Node {
        Node::paragraph(vec![Node::text(text)])
    }

    // ===== Replace =====

    #[test]
    fn test_replace_step_apply_and_invert() {
        let doc = Node::doc(vec![p("abcd")]);
        let step = Step::replace(2, 4, Slice::empty());
        let applied = step.apply(&doc).unwrap();
        assert_eq!(applied, Node::doc(vec![p("ad")]));

        let inverse = step.invert(&doc).unwrap();
        assert_eq!(inverse.apply(&applied).unwrap(), doc);
    }

    #[test]
    fn test_structure_flag_blocks_content_overwrite() {
        let doc = Node::doc(vec![p("ab"), p("cd")]);
        // joining the paragraphs across their boundary is pure structure
        let join = Step::Replace {
            from: 3,
            to: 5,
            slice: Slice::empty(),
            structure: true,
        };
        assert!(join.apply(&doc).is_ok());

        // a range that swallows the "b" is not
        let bad = Step::Replace {
            from: 2,
            to: 5,
            slice: Slice::empty(),
            structure: true,
        };
        assert_eq!(bad.apply(&doc), Err(TransformError::WouldOverwriteContent));
    }

    // ===== ReplaceAround =====

    #[test]
    fn test_replace_around_wraps_paragraph() {
        // wrap p("ab") in a blockquote
        let doc = Node::doc(vec![p("ab")]);
        let wrapper = Node::blockquote(vec![]);
        let step = Step::ReplaceAround {
            from: 0,
            to: 4,
            gap_from: 0,
            gap_to: 4,
            slice: Slice::new(Fragment::from_node(wrapper), 0, 0),
            insert: 1,
            structure: true,
        };
        let applied = step.apply(&doc).unwrap();
        assert_eq!(applied, Node::doc(vec![Node::blockquote(vec![p("ab")])]));

        let inverse = step.invert(&doc).unwrap();
        assert_eq!(inverse.apply(&applied).unwrap(), doc);
    }

    #[test]
    fn test_replace_around_rejects_non_flat_gap() {
        let doc = Node::doc(vec![p("ab"), p("cd")]);
        let step = Step::ReplaceAround {
            from: 0,
            to: 8,
            gap_from: 2,
            gap_to: 6,
            slice: Slice::new(Fragment::from_node(Node::blockquote(vec![])), 0, 0),
            insert: 1,
            structure: false,
        };
        assert_eq!(step.apply(&doc), Err(TransformError::NonFlatGap));
    }

    // ===== Mapping =====

    #[test]
    fn test_step_map_shapes() {
        let replace = Step::replace(2, 5, Slice::new(Fragment::from(vec![Node::text("x")]), 0, 0));
        assert_eq!(replace.step_map(), StepMap::new([(2, 3, 1)]));

        let around = Step::ReplaceAround {
            from: 0,
            to: 8,
            gap_from: 1,
            gap_to: 7,
            slice: Slice::new(Fragment::from_node(Node::blockquote(vec![])), 0, 0),
            insert: 1,
            structure: true,
        };
        assert_eq!(around.step_map(), StepMap::new([(0, 1, 1), (7, 1, 1)]));
    }

    #[test]
    fn test_step_map_through_earlier_insert() {
        let step = Step::replace(4, 6, Slice::empty());
        let mut mapping = Mapping::new();
        mapping.append_map(StepMap::new([(0, 0, 3)]));
        let mapped = step.map(&mapping).unwrap();
        assert_eq!(
            mapped,
            Step::Replace {
                from: 7,
                to: 9,
                slice: Slice::empty(),
                structure: false
            }
        );
    }

    #[test]
    fn test_step_dropped_when_target_deleted() {
        let step = Step::replace(4, 5, Slice::empty());
        let mut mapping = Mapping::new();
        mapping.append_map(StepMap::new([(2, 6, 0)]));
        assert!(step.map(&mapping).is_none());
    }

    #[test]
    fn test_step_on_deletion_edges_survives_as_empty_range() {
        // endpoints sitting exactly on the edges of a deletion are not
        // strictly inside it, so the step collapses instead of dropping
        let step = Step::replace(2, 4, Slice::empty());
        let mut mapping = Mapping::new();
        mapping.append_map(StepMap::new([(2, 2, 0)]));
        let mapped = step.map(&mapping).unwrap();
        assert_eq!(
            mapped,
            Step::Replace {
                from: 2,
                to: 2,
                slice: Slice::empty(),
                structure: false
            }
        );
    }
}

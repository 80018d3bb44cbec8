/*!
List item editing: outdent, indent, and the list-aware backspace.

All three gestures resolve a [`NodeRange`] over the selected items of the
nearest list container and turn it into one or two structure steps. The
shared policy for multi-paragraph items: indent and outdent refuse to act
when the cursor sits in a later paragraph of an item (acting would detach
the earlier paragraphs), while backspace first splits the item at the
paragraph boundary and then lifts only the freshly split item out.
*/

use crate::commands::{CommandInput, Resolution};
use crate::model::{Fragment, Node, NodeRange, NodeType, ResolvedPos, Slice};
use crate::transform::{can_join, can_split, lift_target, Assoc, Step, Transaction, TransformError};

fn is_list_container(node: &Node) -> bool {
    node.child_count() > 0
        && node
            .first_child()
            .is_some_and(|child| child.node_type() == NodeType::ListItem)
}

/// Child index of the cursor's block within its nearest list item ancestor.
fn paragraph_index_in_item(rpos: &ResolvedPos) -> Option<usize> {
    (0..rpos.depth())
        .rev()
        .find(|&d| rpos.node(d).node_type() == NodeType::ListItem)
        .map(|d| rpos.index(d))
}

/// Whether the range sits directly inside another list item, which forces
/// lifting one level instead of out of the list entirely.
fn nested_under_item(rpos: &ResolvedPos, range: &NodeRange) -> bool {
    range.depth() >= 1 && rpos.node(range.depth() - 1).node_type() == NodeType::ListItem
}

/// Outdent the selected list items.
pub fn lift_list_item(input: &CommandInput) -> Resolution {
    match try_lift_list_item(input) {
        Ok(Some(tr)) => Resolution::Applied(tr),
        _ => Resolution::Declined,
    }
}

fn try_lift_list_item(input: &CommandInput) -> Result<Option<Transaction>, TransformError> {
    let rfrom = input.doc.resolve(input.selection.from())?;
    if paragraph_index_in_item(&rfrom).is_some_and(|index| index > 0) {
        return Ok(None);
    }
    let rto = input.doc.resolve(input.selection.to())?;
    let Some(range) = rfrom.block_range(&rto, is_list_container) else {
        return Ok(None);
    };
    let mut tr = Transaction::new(input.doc.clone());
    let ok = if nested_under_item(&rfrom, &range) {
        lift_to_outer(&mut tr, range)?
    } else {
        lift_out(&mut tr, &range)?
    };
    Ok(ok.then_some(tr))
}

/// Lift the selected items out of their list entirely.
pub fn lift_out_of_list(input: &CommandInput) -> Resolution {
    match try_lift_out_of_list(input) {
        Ok(Some(tr)) => Resolution::Applied(tr),
        _ => Resolution::Declined,
    }
}

fn try_lift_out_of_list(input: &CommandInput) -> Result<Option<Transaction>, TransformError> {
    let rfrom = input.doc.resolve(input.selection.from())?;
    let rto = input.doc.resolve(input.selection.to())?;
    let Some(range) = rfrom.block_range(&rto, is_list_container) else {
        return Ok(None);
    };
    let mut tr = Transaction::new(input.doc.clone());
    Ok(lift_out(&mut tr, &range)?.then_some(tr))
}

/// Indent the selected items into the item before them.
pub fn sink_list_item(input: &CommandInput) -> Resolution {
    match try_sink_list_item(input) {
        Ok(Some(tr)) => Resolution::Applied(tr),
        _ => Resolution::Declined,
    }
}

fn try_sink_list_item(input: &CommandInput) -> Result<Option<Transaction>, TransformError> {
    let rfrom = input.doc.resolve(input.selection.from())?;
    if paragraph_index_in_item(&rfrom).is_some_and(|index| index > 0) {
        return Ok(None);
    }
    let rto = input.doc.resolve(input.selection.to())?;
    let Some(range) = rfrom.block_range(&rto, is_list_container) else {
        return Ok(None);
    };
    let start_index = range.start_index();
    if start_index == 0 {
        return Ok(None);
    }
    let parent = range.parent();
    let node_before = parent.child(start_index - 1);
    if node_before.node_type() != NodeType::ListItem {
        return Ok(None);
    }
    // when the previous item already ends in a list of the same kind, the
    // sunk items append to it instead of opening a fresh nested list
    let nested_before = node_before
        .last_child()
        .is_some_and(|child| child.node_type() == parent.node_type());
    let inner = if nested_before {
        Fragment::from_node(NodeType::ListItem.create(Fragment::empty()))
    } else {
        Fragment::empty()
    };
    let slice = Slice::new(
        Fragment::from_node(NodeType::ListItem.create(Fragment::from_node(parent.copy(inner)))),
        if nested_before { 3 } else { 1 },
        0,
    );
    let before = range.start();
    let after = range.end();
    let mut tr = Transaction::new(input.doc.clone());
    tr.step(Step::ReplaceAround {
        from: before - if nested_before { 3 } else { 1 },
        to: after,
        gap_from: before,
        gap_to: after,
        slice,
        insert: 1,
        structure: true,
    })?;
    Ok(Some(tr))
}

/// List-aware backspace. In a later paragraph of a multi-paragraph item it
/// splits the item first and lifts the split-off item out; in the first
/// paragraph it lifts the whole item. A split that cannot be made valid
/// swallows the keypress instead of letting fallbacks run against an
/// unexpected shape.
pub fn backspace_with_reset(input: &CommandInput) -> Resolution {
    if !input.selection.is_cursor() || !input.at_textblock_start {
        return Resolution::Declined;
    }
    match try_backspace_with_reset(input) {
        Ok(resolution) => resolution,
        Err(_) => Resolution::Declined,
    }
}

fn try_backspace_with_reset(input: &CommandInput) -> Result<Resolution, TransformError> {
    let rpos = input.doc.resolve(input.selection.head)?;
    let Some(item_depth) = (0..rpos.depth())
        .rev()
        .find(|&d| rpos.node(d).node_type() == NodeType::ListItem)
    else {
        return Ok(Resolution::Declined);
    };
    let para_index = rpos.index(item_depth);

    if para_index == 0 {
        let Some(range) = rpos.block_range(&rpos, is_list_container) else {
            return Ok(Resolution::Declined);
        };
        let mut tr = Transaction::new(input.doc.clone());
        let ok = if nested_under_item(&rpos, &range) {
            lift_to_outer(&mut tr, range)?
        } else {
            lift_out(&mut tr, &range)?
        };
        return Ok(if ok {
            Resolution::Applied(tr)
        } else {
            Resolution::Declined
        });
    }

    // later paragraph: split the item just before the cursor's block
    let split_pos = rpos.before(item_depth + 1);
    if !can_split(input.doc, split_pos, 1, None)? {
        return Ok(Resolution::Handled);
    }
    let mut tr = Transaction::new(input.doc.clone());
    tr.split(split_pos, 1, None)?;
    // the cursor's block now leads a fresh single-block item
    let mapped = tr.mapping().map(input.selection.head, Assoc::After);
    let rnew = tr.doc().resolve(mapped)?;
    let Some(range) = rnew.block_range(&rnew, is_list_container) else {
        return Ok(Resolution::Handled);
    };
    let ok = if nested_under_item(&rnew, &range) {
        lift_to_outer(&mut tr, range)?
    } else {
        lift_out(&mut tr, &range)?
    };
    Ok(if ok {
        Resolution::Applied(tr)
    } else {
        Resolution::Handled
    })
}

/// Merge the items of `range` into one and strip the list wrapper around
/// it, keeping trimmed copies of the wrapper on sides where siblings
/// remain. Returns false without touching `tr`'s outcome validity when the
/// structure does not admit the lift.
fn lift_out(tr: &mut Transaction, range: &NodeRange) -> Result<bool, TransformError> {
    let steps_before = tr.steps().len();
    let list = range.parent().clone();
    // erase the boundaries between the selected items back to front, so
    // earlier positions stay valid while deleting
    let mut pos = range.end();
    for i in ((range.start_index() + 1)..range.end_index()).rev() {
        pos -= list.child(i).node_size();
        tr.delete(pos - 1, pos + 1)?;
    }
    let rstart = tr.doc().resolve(range.start())?;
    let Some(item) = rstart.node_after() else {
        return Ok(false);
    };
    if item.node_type() != NodeType::ListItem {
        return Ok(false);
    }
    // the merges must have produced exactly one item covering the range
    let mapped_end = tr
        .mapping()
        .slice_from(steps_before)
        .map(range.end(), Assoc::After);
    if mapped_end != range.start() + item.node_size() {
        return Ok(false);
    }
    let at_start = range.start_index() == 0;
    let at_end = range.end_index() == list.child_count();
    let depth = rstart.depth();
    if depth == 0 {
        return Ok(false);
    }
    let parent = rstart.node(depth - 1);
    let index_before = rstart.index(depth - 1);
    let trailing = if at_end {
        Fragment::empty()
    } else {
        Fragment::from_node(list.copy(Fragment::empty()))
    };
    if !parent.can_replace(
        index_before + if at_start { 0 } else { 1 },
        index_before + 1,
        &item.content().append(&trailing),
    ) {
        return Ok(false);
    }
    let start = rstart.pos();
    let end = start + item.node_size();
    // keep an empty copy of the list on the sides where siblings remain
    let mut shell = Fragment::empty();
    if !at_start {
        shell = Fragment::from_node(list.copy(Fragment::empty()));
    }
    if !at_end {
        shell = shell.append(&Fragment::from_node(list.copy(Fragment::empty())));
    }
    tr.step(Step::ReplaceAround {
        from: start - if at_start { 1 } else { 0 },
        to: end + if at_end { 1 } else { 0 },
        gap_from: start + 1,
        gap_to: end - 1,
        slice: Slice::new(shell, if at_start { 0 } else { 1 }, if at_end { 0 } else { 1 }),
        insert: if at_start { 0 } else { 1 },
        structure: false,
    })?;
    Ok(true)
}

/// Lift a nested item one list level up. Trailing siblings in the inner
/// list are first re-parented under the lifted item so they stay enclosed.
fn lift_to_outer(tr: &mut Transaction, range: NodeRange) -> Result<bool, TransformError> {
    let steps_before = tr.steps().len();
    let end = range.end();
    let end_of_list = range.to().end(range.depth());
    let mut range = range;
    if end < end_of_list {
        tr.step(Step::ReplaceAround {
            from: end - 1,
            to: end_of_list,
            gap_from: end,
            gap_to: end_of_list,
            slice: Slice::new(
                Fragment::from_node(NodeType::ListItem.create(Fragment::from_node(
                    range.parent().copy(Fragment::empty()),
                ))),
                1,
                0,
            ),
            insert: 1,
            structure: true,
        })?;
        range = NodeRange::new(
            tr.doc().resolve(range.from().pos())?,
            tr.doc().resolve(end_of_list)?,
            range.depth(),
        );
    }
    let Some(target) = lift_target(&range) else {
        return Ok(false);
    };
    tr.lift(&range, target)?;
    let after_pos = tr
        .mapping()
        .slice_from(steps_before)
        .map(end, Assoc::Before)
        - 1;
    let rafter = tr.doc().resolve(after_pos)?;
    let same_type = match (rafter.node_before(), rafter.node_after()) {
        (Some(before), Some(after)) => before.node_type() == after.node_type(),
        _ => false,
    };
    if same_type && can_join(tr.doc(), after_pos)? {
        tr.join(after_pos, 1)?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Selection;

    fn p(text: &str) -> Node {
        Node::paragraph(vec![Node::text(text)])
    }

    fn li(children: Vec<Node>) -> Node {
        Node::list_item(children)
    }

    fn ul(children: Vec<Node>) -> Node {
        Node::bullet_list(children)
    }

    fn applied_doc(resolution: Resolution) -> Node {
        match resolution {
            Resolution::Applied(tr) => tr.doc().clone(),
            other => panic!("expected applied, got {other:?}"),
        }
    }

    // ===== lift_out_of_list =====

    #[test]
    fn test_lift_middle_item_splits_list() {
        let doc = Node::doc(vec![ul(vec![
            li(vec![p("a")]),
            li(vec![p("b")]),
            li(vec![p("c")]),
        ])]);
        // cursor inside "b"
        let input = CommandInput::new(&doc, Selection::cursor(8));
        let out = applied_doc(lift_out_of_list(&input));
        assert_eq!(
            out,
            Node::doc(vec![
                ul(vec![li(vec![p("a")])]),
                p("b"),
                ul(vec![li(vec![p("c")])]),
            ])
        );
        assert_eq!(out.check(), Ok(()));
    }

    #[test]
    fn test_lift_only_item_removes_list() {
        let doc = Node::doc(vec![ul(vec![li(vec![p("a")])])]);
        let input = CommandInput::new(&doc, Selection::cursor(3));
        assert_eq!(
            applied_doc(lift_out_of_list(&input)),
            Node::doc(vec![p("a")])
        );
    }

    #[test]
    fn test_lift_declines_outside_list() {
        let doc = Node::doc(vec![p("a")]);
        let input = CommandInput::new(&doc, Selection::cursor(1));
        assert!(!lift_out_of_list(&input).is_applicable());
    }

    // ===== lift_list_item =====

    #[test]
    fn test_outdent_nested_item_one_level() {
        let doc = Node::doc(vec![ul(vec![li(vec![
            p("a"),
            ul(vec![li(vec![p("b")])]),
        ])])]);
        // cursor inside "b"
        let input = CommandInput::new(&doc, Selection::cursor(9));
        let out = applied_doc(lift_list_item(&input));
        assert_eq!(
            out,
            Node::doc(vec![ul(vec![li(vec![p("a")]), li(vec![p("b")])])])
        );
        assert_eq!(out.check(), Ok(()));
    }

    #[test]
    fn test_outdent_reparents_trailing_siblings() {
        let doc = Node::doc(vec![ul(vec![li(vec![
            p("a"),
            ul(vec![li(vec![p("b")]), li(vec![p("c")])]),
        ])])]);
        let input = CommandInput::new(&doc, Selection::cursor(9));
        let out = applied_doc(lift_list_item(&input));
        assert_eq!(
            out,
            Node::doc(vec![ul(vec![
                li(vec![p("a")]),
                li(vec![p("b"), ul(vec![li(vec![p("c")])])]),
            ])])
        );
        assert_eq!(out.check(), Ok(()));
    }

    #[test]
    fn test_outdent_declines_in_later_paragraph() {
        let doc = Node::doc(vec![ul(vec![li(vec![p("first"), p("second")])])]);
        // cursor inside "second"
        let input = CommandInput::new(&doc, Selection::cursor(11));
        assert!(!lift_list_item(&input).is_applicable());
    }

    // ===== sink_list_item =====

    #[test]
    fn test_sink_item_under_previous() {
        let doc = Node::doc(vec![ul(vec![li(vec![p("a")]), li(vec![p("b")])])]);
        // cursor inside "b"
        let input = CommandInput::new(&doc, Selection::cursor(8));
        let out = applied_doc(sink_list_item(&input));
        assert_eq!(
            out,
            Node::doc(vec![ul(vec![li(vec![
                p("a"),
                ul(vec![li(vec![p("b")])]),
            ])])])
        );
        assert_eq!(out.check(), Ok(()));
    }

    #[test]
    fn test_sink_appends_to_existing_nested_list() {
        let doc = Node::doc(vec![ul(vec![
            li(vec![p("a"), ul(vec![li(vec![p("x")])])]),
            li(vec![p("b")]),
        ])]);
        // cursor inside "b"
        let input = CommandInput::new(&doc, Selection::cursor(15));
        let out = applied_doc(sink_list_item(&input));
        assert_eq!(
            out,
            Node::doc(vec![ul(vec![li(vec![
                p("a"),
                ul(vec![li(vec![p("x")]), li(vec![p("b")])]),
            ])])])
        );
        assert_eq!(out.check(), Ok(()));
    }

    #[test]
    fn test_sink_declines_for_first_item() {
        let doc = Node::doc(vec![ul(vec![li(vec![p("a")]), li(vec![p("b")])])]);
        let input = CommandInput::new(&doc, Selection::cursor(3));
        assert!(!sink_list_item(&input).is_applicable());
    }

    #[test]
    fn test_sink_declines_in_later_paragraph() {
        let doc = Node::doc(vec![ul(vec![
            li(vec![p("a")]),
            li(vec![p("first"), p("second")]),
        ])]);
        // cursor inside "second" of the second item
        let input = CommandInput::new(&doc, Selection::cursor(16));
        assert!(!sink_list_item(&input).is_applicable());
    }

    // ===== backspace_with_reset =====

    #[test]
    fn test_backspace_splits_then_lifts_later_paragraph() {
        let doc = Node::doc(vec![ul(vec![li(vec![p("first"), p("second")])])]);
        // cursor at the start of "second"
        let input = CommandInput::at_block_start(&doc, 10);
        let out = applied_doc(backspace_with_reset(&input));
        assert_eq!(
            out,
            Node::doc(vec![ul(vec![li(vec![p("first")])]), p("second")])
        );
        assert_eq!(out.check(), Ok(()));
    }

    #[test]
    fn test_backspace_lifts_first_paragraph_item() {
        let doc = Node::doc(vec![ul(vec![li(vec![p("a")]), li(vec![p("b")])])]);
        // cursor at the start of "b"
        let input = CommandInput::at_block_start(&doc, 8);
        let out = applied_doc(backspace_with_reset(&input));
        assert_eq!(
            out,
            Node::doc(vec![ul(vec![li(vec![p("a")])]), p("b")])
        );
        assert_eq!(out.check(), Ok(()));
    }

    #[test]
    fn test_backspace_swallows_invalid_split() {
        // the block after the paragraph is a code block; splitting the item
        // before it would leave an item led by a non-paragraph
        let doc = Node::doc(vec![ul(vec![li(vec![
            p("a"),
            Node::code_block("", vec![Node::text("x")]),
        ])])]);
        // cursor at the start of the code block's text
        let input = CommandInput::at_block_start(&doc, 6);
        assert!(matches!(
            backspace_with_reset(&input),
            Resolution::Handled
        ));
    }

    #[test]
    fn test_backspace_declines_outside_lists() {
        let doc = Node::doc(vec![p("a"), p("b")]);
        let input = CommandInput::at_block_start(&doc, 4);
        assert!(!backspace_with_reset(&input).is_applicable());
    }
}

/*!
Backspace at the start of a textblock.

The gesture walks up from the cursor to find the nearest boundary with a
real node before it (the cut), then decides between three outcomes: decline
(isolating barrier or no cut), a plain join when the two sides' grammars
are directly compatible, or a wrap-and-merge that nests the node after the
cut into the node before it through a discovered chain of wrapper types.
After a wrap, adjacent nodes at the seam are coalesced inward while their
grammars allow, so merging never leaves redundant empty wrapper shells.
*/

use crate::commands::{CommandInput, Resolution};
use crate::model::{Fragment, Node, ResolvedPos, Slice};
use crate::transform::{can_join, Step, Transaction, TransformError};

pub fn join_backward(input: &CommandInput) -> Resolution {
    if !input.selection.is_cursor() || !input.at_textblock_start {
        return Resolution::Declined;
    }
    match try_join_backward(input) {
        Ok(Some(tr)) => Resolution::Applied(tr),
        _ => Resolution::Declined,
    }
}

fn try_join_backward(input: &CommandInput) -> Result<Option<Transaction>, TransformError> {
    let rpos = input.doc.resolve(input.selection.head)?;
    let Some(cut) = find_cut_before(&rpos)? else {
        return Ok(None);
    };
    delete_barrier(input.doc, &cut)
}

/// Walk the ancestor chain upward looking for a boundary with a node before
/// it. Stops at isolating ancestors.
fn find_cut_before(rpos: &ResolvedPos) -> Result<Option<ResolvedPos>, TransformError> {
    if rpos.parent().isolating() {
        return Ok(None);
    }
    for depth in (0..rpos.depth()).rev() {
        if rpos.index(depth) > 0 {
            return Ok(Some(rpos.doc().resolve(rpos.before(depth + 1))?));
        }
        if rpos.node(depth).isolating() {
            break;
        }
    }
    Ok(None)
}

/// Directly compatible sides join as-is; an empty `before` is deleted
/// instead of joined into.
fn join_maybe_clear(
    doc: &Node,
    cut: &ResolvedPos,
) -> Result<Option<Transaction>, TransformError> {
    let (Some(before), Some(after)) = (cut.node_before(), cut.node_after()) else {
        return Ok(None);
    };
    if !before.compatible_content(&after) {
        return Ok(None);
    }
    let index = cut.index(cut.depth());
    if before.content_size() == 0
        && cut
            .parent()
            .can_replace(index - 1, index, &Fragment::empty())
    {
        let mut tr = Transaction::new(doc.clone());
        tr.delete(cut.pos() - before.node_size(), cut.pos())?;
        return Ok(Some(tr));
    }
    if !cut
        .parent()
        .can_replace(index, index + 1, &Fragment::empty())
        || !(after.is_textblock() || can_join(doc, cut.pos())?)
    {
        return Ok(None);
    }
    let mut tr = Transaction::new(doc.clone());
    tr.join(cut.pos(), 1)?;
    Ok(Some(tr))
}

fn delete_barrier(doc: &Node, cut: &ResolvedPos) -> Result<Option<Transaction>, TransformError> {
    let (Some(before), Some(after)) = (cut.node_before(), cut.node_after()) else {
        return Ok(None);
    };
    if before.isolating() || after.isolating() {
        return Ok(None);
    }
    if let Some(tr) = join_maybe_clear(doc, cut)? {
        return Ok(Some(tr));
    }

    let index = cut.index(cut.depth());
    let can_del_after = cut
        .parent()
        .can_replace(index, index + 1, &Fragment::empty());
    let Some(trail) = before.content_match_at(before.child_count()) else {
        return Ok(None);
    };
    let Some(conn) = trail.find_wrapping(after.node_type()) else {
        return Ok(None);
    };
    // appending the wrapper chain must leave `before` completable
    let head = conn.first().copied().unwrap_or(after.node_type());
    let completable = trail.match_type(head).is_some_and(|m| m.valid_end());
    if !can_del_after || !completable {
        return Ok(None);
    }

    let end = cut.pos() + after.node_size();
    let mut wrap = Fragment::empty();
    for ty in conn.iter().rev() {
        wrap = Fragment::from_node(ty.create(wrap));
    }
    wrap = Fragment::from_node(before.copy(wrap));
    let mut tr = Transaction::new(doc.clone());
    tr.step(Step::ReplaceAround {
        from: cut.pos() - 1,
        to: end,
        gap_from: cut.pos(),
        gap_to: end,
        slice: Slice::new(wrap, 1, 0),
        insert: conn.len(),
        structure: true,
    })?;

    // coalesce inward: the seam between the old trailing child and the
    // wrapped content moves one position left with every erased boundary
    let mut seam = cut.pos() - 1;
    loop {
        let rseam = tr.doc().resolve(seam)?;
        let (Some(b), Some(a)) = (rseam.node_before(), rseam.node_after()) else {
            break;
        };
        if b.is_leaf()
            || a.is_leaf()
            || b.isolating()
            || a.isolating()
            || !b.compatible_content(&a)
            || !can_join(tr.doc(), seam)?
        {
            break;
        }
        tr.join(seam, 1)?;
        seam -= 1;
    }

    // collapse a trailing sibling of the same type as the merged node
    let before_start = cut.pos() - before.node_size();
    let rstart = tr.doc().resolve(before_start)?;
    if let Some(merged) = rstart.node_after() {
        let join_at = before_start + merged.node_size();
        if join_at <= tr.doc().content_size() {
            let rjoin = tr.doc().resolve(join_at)?;
            if rjoin.node_after().map(|n| n.node_type()) == Some(before.node_type())
                && can_join(tr.doc(), join_at)?
            {
                tr.join(join_at, 1)?;
            }
        }
    }
    Ok(Some(tr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Selection;

    fn p(text: &str) -> Node {
        Node::paragraph(vec![Node::text(text)])
    }

    fn applied(doc: &Node, pos: usize) -> Node {
        let input = CommandInput::at_block_start(doc, pos);
        match join_backward(&input) {
            Resolution::Applied(tr) => tr.doc().clone(),
            other => panic!("expected applied, got {other:?}"),
        }
    }

    // ===== Plain joins =====

    #[test]
    fn test_joins_adjacent_paragraphs() {
        let doc = Node::doc(vec![p("a"), p("b")]);
        assert_eq!(applied(&doc, 4), Node::doc(vec![p("ab")]));
    }

    #[test]
    fn test_deletes_empty_paragraph_before() {
        let doc = Node::doc(vec![Node::paragraph(vec![]), p("b")]);
        assert_eq!(applied(&doc, 3), Node::doc(vec![p("b")]));
    }

    #[test]
    fn test_declines_without_block_start_flag() {
        let doc = Node::doc(vec![p("a"), p("b")]);
        let mut input = CommandInput::new(&doc, Selection::cursor(4));
        input.at_textblock_start = false;
        assert!(!join_backward(&input).is_applicable());
    }

    #[test]
    fn test_declines_for_range_selection() {
        let doc = Node::doc(vec![p("a"), p("b")]);
        let mut input = CommandInput::new(&doc, Selection::new(2, 4));
        input.at_textblock_start = true;
        assert!(!join_backward(&input).is_applicable());
    }

    #[test]
    fn test_declines_at_document_start() {
        let doc = Node::doc(vec![p("a")]);
        let input = CommandInput::at_block_start(&doc, 1);
        assert!(!join_backward(&input).is_applicable());
    }

    // ===== Isolating barriers =====

    #[test]
    fn test_declines_after_code_block() {
        let doc = Node::doc(vec![
            Node::code_block("", vec![Node::text("x")]),
            p("a"),
        ]);
        let input = CommandInput::at_block_start(&doc, 4);
        assert!(!join_backward(&input).is_applicable());
    }

    // ===== Wrap-and-merge =====

    #[test]
    fn test_merges_paragraph_into_preceding_list() {
        // backspace at the start of the paragraph after a list pulls it
        // into the last item, then coalesces down to the text level
        let doc = Node::doc(vec![
            Node::bullet_list(vec![Node::list_item(vec![p("ab")])]),
            p("c"),
        ]);
        assert_eq!(
            applied(&doc, 9),
            Node::doc(vec![Node::bullet_list(vec![Node::list_item(vec![p(
                "abc"
            )])])])
        );
    }

    #[test]
    fn test_merge_collapses_trailing_same_type_list() {
        // a list directly after the merged one is absorbed as well
        let doc = Node::doc(vec![
            Node::bullet_list(vec![Node::list_item(vec![p("a")])]),
            p("b"),
            Node::bullet_list(vec![Node::list_item(vec![p("c")])]),
        ]);
        let input = CommandInput::at_block_start(&doc, 8);
        let Resolution::Applied(tr) = join_backward(&input) else {
            panic!("expected applied");
        };
        assert_eq!(
            tr.doc(),
            &Node::doc(vec![Node::bullet_list(vec![
                Node::list_item(vec![p("ab")]),
                Node::list_item(vec![p("c")]),
            ])])
        );
    }

    // ===== Round trip =====

    #[test]
    fn test_join_then_join_again_declines() {
        let doc = Node::doc(vec![p("a"), p("b")]);
        let joined = applied(&doc, 4);
        // the new cursor would sit inside the merged paragraph, where no
        // cut exists anymore
        let input = CommandInput::at_block_start(&joined, 2);
        assert!(!join_backward(&input).is_applicable());
    }
}

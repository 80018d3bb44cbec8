/*!
Editing commands.

A command is a pure function from a [`CommandInput`] to a [`Resolution`]. It
never mutates anything: it either declines, reports the gesture as handled
with no document change, or returns a built [`Transaction`] for the caller to
apply. Because commands are pure, the same call serves both the dry-run
(UI enablement) and the commit (keypress) phases, and the two can never
disagree.

Fallback behavior is an ordered list of commands evaluated by [`chain`]; the
first non-declined resolution wins.
*/

use crate::model::Node;
use crate::transform::{Assoc, Mapping, Transaction};

pub mod join_backward;
pub mod list;

pub use join_backward::join_backward;
pub use list::{backspace_with_reset, lift_list_item, lift_out_of_list, sink_list_item};

/// A selection as a pair of positions. `anchor == head` is a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn cursor(pos: usize) -> Selection {
        Selection {
            anchor: pos,
            head: pos,
        }
    }

    pub fn new(anchor: usize, head: usize) -> Selection {
        Selection { anchor, head }
    }

    pub fn is_cursor(&self) -> bool {
        self.anchor == self.head
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    /// Carry the selection through a transaction's mapping, biased toward
    /// staying before inserted content.
    pub fn map(&self, mapping: &Mapping) -> Selection {
        Selection {
            anchor: mapping.map(self.anchor, Assoc::Before),
            head: mapping.map(self.head, Assoc::Before),
        }
    }
}

/// Everything a command may consult: the document, the selection, and the
/// one signal the engine cannot compute itself, whether the cursor sits
/// visually at the start of its textblock (soft line wraps make this
/// different from structural offset zero).
#[derive(Debug, Clone, Copy)]
pub struct CommandInput<'a> {
    pub doc: &'a Node,
    pub selection: Selection,
    pub at_textblock_start: bool,
}

impl<'a> CommandInput<'a> {
    pub fn new(doc: &'a Node, selection: Selection) -> CommandInput<'a> {
        CommandInput {
            doc,
            selection,
            at_textblock_start: false,
        }
    }

    pub fn at_block_start(doc: &'a Node, pos: usize) -> CommandInput<'a> {
        CommandInput {
            doc,
            selection: Selection::cursor(pos),
            at_textblock_start: true,
        }
    }
}

/// The three-way outcome of a command.
#[derive(Debug)]
pub enum Resolution {
    /// Preconditions not met; the caller moves on to the next fallback.
    Declined,
    /// The gesture is consumed with no document change. Fallbacks must not
    /// run.
    Handled,
    /// The gesture produced this transaction.
    Applied(Transaction),
}

impl Resolution {
    /// Whether the command would consume the gesture (the dry-run answer).
    pub fn is_applicable(&self) -> bool {
        !matches!(self, Resolution::Declined)
    }

    pub fn into_transaction(self) -> Option<Transaction> {
        match self {
            Resolution::Applied(tr) => Some(tr),
            _ => None,
        }
    }
}

pub type Command = fn(&CommandInput) -> Resolution;

/// Evaluate commands in order and return the first non-declined resolution.
pub fn chain(commands: &[Command], input: &CommandInput) -> Resolution {
    for command in commands {
        match command(input) {
            Resolution::Declined => continue,
            resolution => return resolution,
        }
    }
    Resolution::Declined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::StepMap;

    fn decline(_: &CommandInput) -> Resolution {
        Resolution::Declined
    }

    fn handle(_: &CommandInput) -> Resolution {
        Resolution::Handled
    }

    #[test]
    fn test_chain_returns_first_non_declined() {
        let doc = Node::doc(vec![Node::paragraph(vec![])]);
        let input = CommandInput::new(&doc, Selection::cursor(1));
        assert!(matches!(
            chain(&[decline, handle, decline], &input),
            Resolution::Handled
        ));
        assert!(matches!(chain(&[decline], &input), Resolution::Declined));
        assert!(matches!(chain(&[], &input), Resolution::Declined));
    }

    #[test]
    fn test_selection_maps_through_mapping() {
        let mut mapping = Mapping::new();
        mapping.append_map(StepMap::new([(1, 0, 2)]));
        let sel = Selection::new(1, 4);
        let mapped = sel.map(&mapping);
        // anchor sits exactly at the insertion and stays before it
        assert_eq!(mapped, Selection::new(1, 6));
    }
}

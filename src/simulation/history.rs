//! Undo/redo for sandbox editing
//!
//! Every mutation made through the sandbox API records an [`Action`]
//! carrying enough state to reverse or re-apply it. The stack itself is a
//! plain cursor over a bounded buffer: entries before the cursor are
//! undoable, entries after it are redoable, and a new action discards the
//! redo tail. The sandbox owns applying/reverting the returned action.
//!
//! Organic events (fragmentation, annihilation, lifetime expiry) are
//! deliberately not recorded; only editing operations are.

use crate::simulation::arena::BodyId;
use crate::simulation::barriers::SolidBarrier;
use crate::simulation::bonds::ElasticBond;
use crate::simulation::formula::FieldFormula;
use crate::simulation::states::{Body, System};
use crate::simulation::zones::AnyZone;

/// Maximum number of actions retained. Oldest entries drop off first.
const MAX_HISTORY_SIZE: usize = 50;

/// One reversible editing operation.
///
/// Removal variants keep the original list index so undo restores ordering,
/// and body removal keeps the bonds that were cascaded away with it.
#[derive(Debug, Clone)]
pub enum Action {
    AddBody {
        id: BodyId,
        body: Body,
    },
    RemoveBody {
        id: BodyId,
        body: Body,
        bonds: Vec<(usize, ElasticBond)>,
    },
    EditBody {
        id: BodyId,
        before: Body,
        after: Body,
    },
    AddZone {
        zone: AnyZone,
    },
    RemoveZone {
        zone: AnyZone,
        index: usize,
    },
    AddBond {
        bond: ElasticBond,
    },
    RemoveBond {
        bond: ElasticBond,
        index: usize,
    },
    AddBarrier {
        barrier: SolidBarrier,
    },
    RemoveBarrier {
        barrier: SolidBarrier,
        index: usize,
    },
    AddField {
        field: FieldFormula,
    },
    RemoveField {
        field: FieldFormula,
        index: usize,
    },
    /// One grouped edit over many bodies (e.g. "heat selection"), undone
    /// and redone as a unit.
    BulkEdit {
        label: String,
        edits: Vec<(BodyId, Body, Body)>, // (id, before, after)
        removed: Vec<(BodyId, Body, Vec<(usize, ElasticBond)>)>,
    },
    /// Whole-world swap, used by reset and scenario clears.
    ResetWorld {
        before: Box<System>,
        after: Box<System>,
    },
}

/// A bounded undo/redo stack over [`Action`]s.
#[derive(Debug, Default)]
pub struct ActionHistory {
    actions: Vec<Action>,
    /// Next action index. `[0..cursor]` is undoable, `[cursor..len]` redoable.
    cursor: usize,
}

impl ActionHistory {
    pub fn new() -> Self {
        Self {
            actions: Vec::with_capacity(MAX_HISTORY_SIZE),
            cursor: 0,
        }
    }

    /// Record a new action, discarding any redo tail and enforcing the
    /// size bound by dropping the oldest entries.
    pub fn push(&mut self, action: Action) {
        self.actions.truncate(self.cursor);
        self.actions.push(action);
        self.cursor = self.actions.len();

        if self.actions.len() > MAX_HISTORY_SIZE {
            let excess = self.actions.len() - MAX_HISTORY_SIZE;
            self.actions.drain(0..excess);
            self.cursor = self.actions.len();
        }
    }

    /// Step the cursor back and hand out the action to reverse.
    pub fn undo(&mut self) -> Option<&Action> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(&self.actions[self.cursor])
    }

    /// Step the cursor forward and hand out the action to re-apply.
    pub fn redo(&mut self) -> Option<&Action> {
        if self.cursor >= self.actions.len() {
            return None;
        }
        let action = &self.actions[self.cursor];
        self.cursor += 1;
        Some(action)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.actions.len()
    }

    pub fn undo_count(&self) -> usize {
        self.cursor
    }

    pub fn redo_count(&self) -> usize {
        self.actions.len() - self.cursor
    }

    pub fn clear(&mut self) {
        self.actions.clear();
        self.cursor = 0;
    }
}

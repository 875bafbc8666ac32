//! Selection state over stock entry ids.
//!
//! Clients drive per-entry checkboxes and a per-variant group checkbox;
//! the group checkbox reflects whether all, some, or none of its
//! children are selected, and toggling it sets every child to the
//! opposite of "all selected".

use std::collections::HashSet;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Derived state of a group checkbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SelectionState {
    All,
    Some,
    None,
}

/// An owned set of selected stock entry ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    selected: HashSet<Uuid>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.selected.contains(&id)
    }

    pub fn insert(&mut self, id: Uuid) {
        self.selected.insert(id);
    }

    pub fn remove(&mut self, id: Uuid) {
        self.selected.remove(&id);
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Flips one entry and returns its new selected state.
    pub fn toggle(&mut self, id: Uuid) -> bool {
        if self.selected.remove(&id) {
            false
        } else {
            self.selected.insert(id);
            true
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.selected.iter().copied()
    }

    /// The tri-state a group checkbox shows for the given children.
    pub fn group_state(&self, group: &[Uuid]) -> SelectionState {
        let selected = group.iter().filter(|id| self.selected.contains(id)).count();
        if group.is_empty() || selected == 0 {
            SelectionState::None
        } else if selected == group.len() {
            SelectionState::All
        } else {
            SelectionState::Some
        }
    }

    /// Sets every child to the opposite of "all selected": a fully
    /// selected group clears, anything else selects all.
    pub fn toggle_group(&mut self, group: &[Uuid]) {
        if self.group_state(group) == SelectionState::All {
            for id in group {
                self.selected.remove(id);
            }
        } else {
            self.selected.extend(group.iter().copied());
        }
    }
}

impl FromIterator<Uuid> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = Uuid>>(iter: I) -> Self {
        Self {
            selected: iter.into_iter().collect(),
        }
    }
}

//! Bounded, order-preserving selection over the loaded list.
//!
//! Entries are keyed by index into the loader's list. That is only sound
//! because the list grows by appending; a reload replaces the list and the
//! selection is reset with it.

use std::ops::Range;

use tracing::{debug, warn};

use crate::source::Asset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectMode {
    /// Selecting another item evicts the current one.
    Single,
    Multi { maximum: usize },
}

impl SelectMode {
    pub fn capacity(&self) -> usize {
        match self {
            SelectMode::Single => 1,
            SelectMode::Multi { maximum } => *maximum,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Selected,
    Deselected,
    /// Multi mode is full; the selection was left as it was.
    LimitReached,
}

#[derive(Debug, Default)]
struct SelectionState {
    indices: Vec<usize>,
    assets: Vec<Asset>,
    /// Initial-selection assets not yet seen in the loaded list.
    unresolved: Vec<Asset>,
}

impl SelectionState {
    fn len(&self) -> usize {
        self.indices.len() + self.unresolved.len()
    }
}

enum SelectionMsg<'a> {
    Toggle(usize, Asset),
    ResetTo(Vec<Asset>),
    Bind(&'a [Asset], Range<usize>),
}

#[derive(Debug)]
pub struct SelectionController {
    state: SelectionState,
    mode: SelectMode,
    initial: Vec<Asset>,
}

impl SelectionController {
    pub fn new(mode: SelectMode, initial: Vec<Asset>) -> Self {
        let initial = clamp_initial(mode, initial);
        let mut controller = Self {
            state: SelectionState::default(),
            mode,
            initial,
        };
        controller.reset();
        controller
    }

    /// Select `index` if it isn't selected, deselect it if it is.
    pub fn toggle(&mut self, index: usize, asset: Asset) -> ToggleOutcome {
        match self.update(SelectionMsg::Toggle(index, asset)) {
            Some(outcome) => outcome,
            None => unreachable!("toggle always yields an outcome"),
        }
    }

    /// Go back to the configured initial selection.
    pub fn reset(&mut self) {
        self.update(SelectionMsg::ResetTo(self.initial.clone()));
    }

    pub fn reset_to(&mut self, initial: Vec<Asset>) {
        let initial = clamp_initial(self.mode, initial);
        self.update(SelectionMsg::ResetTo(initial));
    }

    /// Bind unresolved initial selections to the newly loaded `items[range]`.
    pub fn bind_loaded(&mut self, items: &[Asset], range: Range<usize>) {
        self.update(SelectionMsg::Bind(items, range));
    }

    fn update(&mut self, msg: SelectionMsg<'_>) -> Option<ToggleOutcome> {
        match msg {
            SelectionMsg::Toggle(index, asset) => Some(self.apply_toggle(index, asset)),
            SelectionMsg::ResetTo(initial) => {
                self.state = SelectionState {
                    unresolved: initial,
                    ..SelectionState::default()
                };
                None
            }
            SelectionMsg::Bind(items, range) => {
                if self.state.unresolved.is_empty() {
                    return None;
                }
                for (index, item) in items.iter().enumerate().skip(range.start).take(range.len()) {
                    if self.state.indices.contains(&index) {
                        continue;
                    }
                    if let Some(pos) = self.state.unresolved.iter().position(|a| a.uri == item.uri) {
                        self.state.unresolved.remove(pos);
                        self.state.indices.push(index);
                        self.state.assets.push(item.clone());
                        debug!(index, uri = %item.uri, "Bound initial selection");
                    }
                }
                None
            }
        }
    }

    fn apply_toggle(&mut self, index: usize, asset: Asset) -> ToggleOutcome {
        if let Some(pos) = self.state.indices.iter().position(|&i| i == index) {
            self.state.indices.remove(pos);
            let asset_pos = self
                .state
                .assets
                .iter()
                .position(|a| a.uri == asset.uri)
                .unwrap_or(pos);
            self.state.assets.remove(asset_pos);
            return ToggleOutcome::Deselected;
        }

        match self.mode {
            SelectMode::Single => {
                self.state = SelectionState {
                    indices: vec![index],
                    assets: vec![asset],
                    unresolved: Vec::new(),
                };
                ToggleOutcome::Selected
            }
            SelectMode::Multi { maximum } => {
                if self.state.len() < maximum {
                    self.state.indices.push(index);
                    self.state.assets.push(asset);
                    ToggleOutcome::Selected
                } else {
                    ToggleOutcome::LimitReached
                }
            }
        }
    }

    pub fn selected_indices(&self) -> &[usize] {
        &self.state.indices
    }

    pub fn selected_assets(&self) -> &[Asset] {
        &self.state.assets
    }

    pub fn unresolved(&self) -> &[Asset] {
        &self.state.unresolved
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.state.indices.contains(&index)
    }

    /// Bound plus unresolved entries.
    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.len() == 0
    }

    pub fn mode(&self) -> SelectMode {
        self.mode
    }
}

fn clamp_initial(mode: SelectMode, mut initial: Vec<Asset>) -> Vec<Asset> {
    let capacity = mode.capacity();
    if initial.len() > capacity {
        warn!(
            given = initial.len(),
            capacity, "Initial selection exceeds the selection limit, truncating"
        );
        initial.truncate(capacity);
    }
    initial
}

use crate::error::PickerError;
use crate::loader::DEFAULT_PAGE_SIZE;
use crate::selection::SelectMode;
use crate::source::{Asset, Scope};

/// Default cap on the number of selected assets.
pub const DEFAULT_MAXIMUM: usize = 15;

/// Immutable picker configuration, fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PickerConfig {
    /// Assets requested per fetch.
    pub page_size: usize,
    /// Selection cap in multi mode. Ignored in single mode.
    pub maximum: usize,
    pub select_single_item: bool,
    /// Assets selected before anything is loaded, bound to list positions as
    /// they show up.
    pub initial_selection: Vec<Asset>,
    pub scope: Scope,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            maximum: DEFAULT_MAXIMUM,
            select_single_item: false,
            initial_selection: Vec::new(),
            scope: Scope::default(),
        }
    }
}

impl PickerConfig {
    pub fn select_mode(&self) -> SelectMode {
        if self.select_single_item {
            SelectMode::Single
        } else {
            SelectMode::Multi {
                maximum: self.maximum,
            }
        }
    }

    pub fn validate(&self) -> Result<(), PickerError> {
        if self.page_size == 0 {
            return Err(PickerError::InvalidConfig(
                "page size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

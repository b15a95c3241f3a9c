use thiserror::Error;

/// Errors reported by the picker controllers.
///
/// None of these leave the controller in an unusable state: a failed fetch
/// clears the in-flight flag so the next `load_next()` can try again, and a
/// denied permission simply means loading never started.
#[derive(Debug, Error)]
pub enum PickerError {
    #[error("Fetching assets after item {offset} (scope generation {generation}) failed: {source}")]
    FetchFailed {
        generation: u64,
        offset: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("Library access not granted: {0}")]
    PermissionDenied(String),

    #[error("Invalid picker configuration: {0}")]
    InvalidConfig(String),

    #[error("Index {index} is outside the loaded list ({len} items)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Asset {uri} is not the item at index {index}")]
    AssetMismatch { index: usize, uri: String },
}

impl PickerError {
    /// Whether a caller retrying the same operation could succeed.
    ///
    /// Only source failures qualify; everything else needs a change of
    /// configuration or user action first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PickerError::FetchFailed { .. })
    }
}

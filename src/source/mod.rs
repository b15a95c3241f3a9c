//! Asset source abstraction: the paginated query the picker pages through.
//!
//! A source answers one kind of request, "give me up to `first` assets after
//! this cursor within this scope", and reports where the next page starts.

mod local;

pub use local::LocalLibrary;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AssetType, GroupType, MediaKind};

/// One library item as reported by the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub uri: String,
    pub group_name: Option<String>,
    pub kind: MediaKind,
    pub filename: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub timestamp: Option<DateTime<Utc>>,
    /// Seconds; only reported for videos.
    pub playable_duration: Option<f64>,
}

impl Asset {
    /// Minimal photo asset with no metadata besides its album.
    pub fn photo(uri: impl Into<String>, group_name: Option<&str>) -> Self {
        Self {
            uri: uri.into(),
            group_name: group_name.map(str::to_owned),
            kind: MediaKind::Photo,
            filename: None,
            width: None,
            height: None,
            timestamp: None,
            playable_duration: None,
        }
    }
}

/// Opaque continuation token handed back by the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor(pub String);

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Logical query scope. Changing it invalidates any cursor obtained under
/// the previous scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub group_name: Option<String>,
    pub group_types: GroupType,
    pub asset_type: AssetType,
}

/// Parameters of a single page query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub first: usize,
    pub after: Option<Cursor>,
    pub group_name: Option<String>,
    /// `None` when the source cannot filter by group type.
    pub group_types: Option<GroupType>,
    pub asset_type: AssetType,
}

impl PageRequest {
    pub fn new(first: usize, after: Option<Cursor>, scope: &Scope) -> Self {
        Self {
            first,
            after,
            group_name: scope.group_name.clone(),
            group_types: Some(scope.group_types),
            asset_type: scope.asset_type,
        }
    }
}

/// Result of one fetch call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub assets: Vec<Asset>,
    pub end_cursor: Option<Cursor>,
    pub has_next_page: bool,
}

/// Paginated asset-listing service consumed by the picker.
#[async_trait::async_trait]
pub trait AssetSource: Send + Sync {
    async fn get_photos(&self, request: &PageRequest) -> anyhow::Result<Page>;

    /// Whether `PageRequest::group_types` is honoured. Sources that answer
    /// `false` receive requests with the group type stripped.
    fn supports_group_types(&self) -> bool {
        true
    }
}

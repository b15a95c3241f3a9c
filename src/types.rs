use serde::{Deserialize, Serialize};

/// Which collections of the library a query covers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, clap::ValueEnum, Serialize, Deserialize,
)]
pub enum GroupType {
    Album,
    All,
    Event,
    Faces,
    Library,
    PhotoStream,
    #[default]
    SavedPhotos,
}

impl GroupType {
    pub fn as_str(&self) -> &str {
        match self {
            GroupType::Album => "Album",
            GroupType::All => "All",
            GroupType::Event => "Event",
            GroupType::Faces => "Faces",
            GroupType::Library => "Library",
            GroupType::PhotoStream => "PhotoStream",
            GroupType::SavedPhotos => "SavedPhotos",
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, clap::ValueEnum, Serialize, Deserialize,
)]
pub enum AssetType {
    #[default]
    Photos,
    Videos,
    All,
}

impl AssetType {
    /// Whether an asset of the given kind passes this filter.
    pub fn admits(&self, kind: MediaKind) -> bool {
        match self {
            AssetType::Photos => kind == MediaKind::Photo,
            AssetType::Videos => kind == MediaKind::Video,
            AssetType::All => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(&self) -> &str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;
use walkdir::WalkDir;

use super::{Asset, AssetSource, Cursor, Page, PageRequest};
use crate::types::{AssetType, MediaKind};

const PHOTO_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "heic", "heif", "webp", "bmp", "tif", "tiff",
];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v", "avi", "mkv", "webm", "3gp"];

/// Directory-backed library: every photo or video file under `root` is an
/// asset, and the name of its parent directory is its album.
///
/// The listing is re-scanned on every request and sorted by path, so the
/// offset cursors stay stable as long as the directory doesn't change.
#[derive(Debug, Clone)]
pub struct LocalLibrary {
    root: PathBuf,
}

impl LocalLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait::async_trait]
impl AssetSource for LocalLibrary {
    async fn get_photos(&self, request: &PageRequest) -> anyhow::Result<Page> {
        let offset = match &request.after {
            Some(cursor) => parse_cursor(cursor)?,
            None => 0,
        };
        let root = self.root.clone();
        let group_name = request.group_name.clone();
        let asset_type = request.asset_type;
        let assets = tokio::task::spawn_blocking(move || {
            scan(&root, group_name.as_deref(), asset_type)
        })
        .await??;

        let end = offset.saturating_add(request.first).min(assets.len());
        let page_assets = assets.get(offset..end).map(<[Asset]>::to_vec).unwrap_or_default();
        debug!(
            offset,
            returned = page_assets.len(),
            total = assets.len(),
            "Local library page"
        );

        let end_cursor = if page_assets.is_empty() {
            None
        } else {
            Some(Cursor(end.to_string()))
        };
        Ok(Page {
            assets: page_assets,
            end_cursor,
            has_next_page: end < assets.len(),
        })
    }

    // Directories have no notion of smart groups like "Faces" or "PhotoStream".
    fn supports_group_types(&self) -> bool {
        false
    }
}

fn parse_cursor(cursor: &Cursor) -> anyhow::Result<usize> {
    cursor
        .0
        .parse::<usize>()
        .map_err(|_| anyhow::anyhow!("Malformed local library cursor '{}'", cursor))
}

fn classify(path: &Path) -> Option<MediaKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if PHOTO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Photo)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

fn scan(root: &Path, group_name: Option<&str>, asset_type: AssetType) -> anyhow::Result<Vec<Asset>> {
    if !root.is_dir() {
        anyhow::bail!("Library root {} is not a directory", root.display());
    }

    let mut assets = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(kind) = classify(path) else {
            continue;
        };
        if !asset_type.admits(kind) {
            continue;
        }

        let album = path
            .parent()
            .filter(|p| *p != root)
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned());
        if let Some(wanted) = group_name {
            if album.as_deref() != Some(wanted) {
                continue;
            }
        }

        let timestamp = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from);

        assets.push(Asset {
            uri: format!("file://{}", path.display()),
            group_name: album,
            kind,
            filename: path.file_name().map(|n| n.to_string_lossy().into_owned()),
            width: None,
            height: None,
            timestamp,
            playable_duration: None,
        });
    }
    Ok(assets)
}

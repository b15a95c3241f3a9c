//! roll-picker — the core of a photo/video library picker.
//!
//! A [`Picker`] pages through an [`AssetSource`] with a cursor, accumulating
//! assets into one growing list, and keeps a bounded, ordered selection over
//! that list. Rendering, gestures and permission prompts stay with the
//! caller; the picker only tracks state and reports what happened through
//! [`PickerEvent`]s.

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod loader;
pub mod permission;
pub mod picker;
pub mod retry;
pub mod selection;
pub mod source;
pub mod types;

pub use config::PickerConfig;
pub use error::PickerError;
pub use loader::{Completion, FetchTicket, PageLoader};
pub use permission::{AlwaysGranted, DirectoryAccess, PermissionGate};
pub use picker::{Completed, Picker, PickerEvent};
pub use selection::{SelectMode, SelectionController, ToggleOutcome};
pub use source::{Asset, AssetSource, Cursor, LocalLibrary, Page, PageRequest, Scope};
pub use types::{AssetType, GroupType, MediaKind};

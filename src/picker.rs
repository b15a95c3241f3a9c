//! The picker controller: a [`PageLoader`] and a [`SelectionController`]
//! driven together against one [`AssetSource`].
//!
//! Everything the presentation layer needs to react to is published on an
//! unbounded event channel handed out by [`Picker::new`].

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::PickerConfig;
use crate::error::PickerError;
use crate::loader::{Completion, FetchTicket, PageLoader};
use crate::permission::{ensure_access, PermissionGate};
use crate::selection::{SelectMode, SelectionController, ToggleOutcome};
use crate::source::{Asset, AssetSource, Page, Scope};

const PERMISSION_DENIED_REASON: &str =
    "Without access to the photo library no photos can be selected";

#[derive(Debug, Clone, PartialEq)]
pub enum PickerEvent {
    /// The very first page since construction has been applied.
    FirstPageReady { count: usize },
    SelectionChanged { assets: Vec<Asset>, toggled: Asset },
    SelectionLimitReached { maximum: usize, rejected: Asset },
    FetchFailed { message: String, retryable: bool },
    PermissionDenied { reason: String },
}

/// A fetch that has run but not been applied yet.
#[derive(Debug)]
pub struct Completed {
    ticket: FetchTicket,
    result: anyhow::Result<Page>,
}

pub struct Picker {
    source: Arc<dyn AssetSource>,
    loader: PageLoader,
    selection: SelectionController,
    events: mpsc::UnboundedSender<PickerEvent>,
}

impl std::fmt::Debug for Picker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Picker")
            .field("loader", &self.loader)
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

impl Picker {
    pub fn new(
        config: PickerConfig,
        source: Arc<dyn AssetSource>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<PickerEvent>), PickerError> {
        config.validate()?;
        let (events, rx) = mpsc::unbounded_channel();
        let loader = PageLoader::new(
            config.page_size,
            config.scope.clone(),
            source.supports_group_types(),
        );
        let selection =
            SelectionController::new(config.select_mode(), config.initial_selection.clone());
        Ok((
            Self {
                source,
                loader,
                selection,
                events,
            },
            rx,
        ))
    }

    /// Ask for library access, then load the first page.
    ///
    /// On denial nothing is fetched and a `PermissionDenied` event is sent.
    pub async fn start(&mut self, gate: &dyn PermissionGate) -> Result<(), PickerError> {
        if !ensure_access(gate).await {
            warn!("Library access denied, not loading");
            self.emit(PickerEvent::PermissionDenied {
                reason: PERMISSION_DENIED_REASON.to_string(),
            });
            return Err(PickerError::PermissionDenied(
                PERMISSION_DENIED_REASON.to_string(),
            ));
        }
        info!(page_size = self.loader.page_size(), scope = ?self.loader.scope(), "Starting picker");
        self.load_next().await.map(|_| ())
    }

    /// Fetch and apply the next page. Returns `false` when nothing was
    /// applied: a fetch was already in flight or the source is exhausted.
    pub async fn load_next(&mut self) -> Result<bool, PickerError> {
        let Some(ticket) = self.begin_load_next() else {
            return Ok(false);
        };
        let completed = self.fetch(ticket).await;
        self.complete(completed)
    }

    /// Trigger for the presentation layer's "scrolled near the end" signal.
    pub async fn on_end_reached(&mut self) -> Result<bool, PickerError> {
        if self.no_more() {
            return Ok(false);
        }
        self.load_next().await
    }

    /// Switch to a new scope: drop the list, reset the selection and load
    /// the first page of `scope`.
    pub async fn reload(&mut self, scope: Scope) -> Result<(), PickerError> {
        let ticket = self.begin_reload(scope);
        let completed = self.fetch(ticket).await;
        self.complete(completed).map(|_| ())
    }

    pub fn begin_load_next(&mut self) -> Option<FetchTicket> {
        self.loader.begin_next()
    }

    pub fn begin_reload(&mut self, scope: Scope) -> FetchTicket {
        let ticket = self.loader.begin_reload(scope);
        self.selection.reset();
        debug!(generation = self.loader.generation(), "Selection reset for new scope");
        ticket
    }

    /// Run the request for `ticket` on the current task.
    pub async fn fetch(&self, ticket: FetchTicket) -> Completed {
        let result = self.source.get_photos(ticket.request()).await;
        Completed { ticket, result }
    }

    /// Run the request for `ticket` on a spawned task so the caller can keep
    /// going; hand the handle to [`Picker::join`], or the joined value to
    /// [`Picker::complete`].
    pub fn dispatch(&self, ticket: FetchTicket) -> JoinHandle<Completed> {
        debug!(generation = ticket.generation(), after = ?ticket.request().after, "Dispatching fetch");
        let source = Arc::clone(&self.source);
        tokio::spawn(async move {
            let result = source.get_photos(ticket.request()).await;
            Completed { ticket, result }
        })
    }

    /// Await a dispatched fetch and apply it. A task that was aborted or
    /// panicked is reported like a failed fetch.
    pub async fn join(&mut self, handle: JoinHandle<Completed>) -> Result<bool, PickerError> {
        match handle.await {
            Ok(completed) => self.complete(completed),
            Err(e) => {
                let completion = self.loader.abandon(anyhow::Error::new(e));
                self.settle(completion)
            }
        }
    }

    /// Apply a finished fetch. Returns whether the list changed.
    pub fn complete(&mut self, completed: Completed) -> Result<bool, PickerError> {
        let completion = self.loader.complete(completed.ticket, completed.result);
        self.settle(completion)
    }

    fn settle(&mut self, completion: Completion) -> Result<bool, PickerError> {
        match completion {
            Completion::Applied {
                appended,
                first_page,
            } => {
                self.selection.bind_loaded(self.loader.items(), appended);
                if first_page {
                    self.emit(PickerEvent::FirstPageReady {
                        count: self.loader.items().len(),
                    });
                }
                Ok(true)
            }
            Completion::Stale => Ok(false),
            Completion::Failed(e) => {
                self.emit(PickerEvent::FetchFailed {
                    message: e.to_string(),
                    retryable: e.is_retryable(),
                });
                Err(e)
            }
        }
    }

    /// Toggle the item at `index`, which must be `asset`.
    pub fn toggle(&mut self, index: usize, asset: Asset) -> Result<ToggleOutcome, PickerError> {
        let items = self.loader.items();
        let Some(item) = items.get(index) else {
            return Err(PickerError::IndexOutOfRange {
                index,
                len: items.len(),
            });
        };
        if item.uri != asset.uri {
            return Err(PickerError::AssetMismatch {
                index,
                uri: asset.uri,
            });
        }

        let outcome = self.selection.toggle(index, asset.clone());
        debug!(index, ?outcome, "Toggled");
        match outcome {
            ToggleOutcome::Selected | ToggleOutcome::Deselected => {
                self.emit(PickerEvent::SelectionChanged {
                    assets: self.selection.selected_assets().to_vec(),
                    toggled: asset,
                });
            }
            ToggleOutcome::LimitReached => {
                self.emit(PickerEvent::SelectionLimitReached {
                    maximum: self.selection.mode().capacity(),
                    rejected: asset,
                });
            }
        }
        Ok(outcome)
    }

    fn emit(&self, event: PickerEvent) {
        if self.events.send(event).is_err() {
            debug!("Picker event dropped, no listener");
        }
    }

    pub fn items(&self) -> &[Asset] {
        self.loader.items()
    }

    pub fn selected_assets(&self) -> &[Asset] {
        self.selection.selected_assets()
    }

    pub fn selected_indices(&self) -> &[usize] {
        self.selection.selected_indices()
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selection.is_selected(index)
    }

    /// Initial selections that have not shown up in the list yet.
    pub fn unresolved_selection(&self) -> &[Asset] {
        self.selection.unresolved()
    }

    pub fn select_mode(&self) -> SelectMode {
        self.selection.mode()
    }

    pub fn initial_loading(&self) -> bool {
        self.loader.initial_loading()
    }

    pub fn loading_more(&self) -> bool {
        self.loader.loading_more()
    }

    pub fn no_more(&self) -> bool {
        self.loader.is_exhausted()
    }

    pub fn scope(&self) -> &Scope {
        self.loader.scope()
    }

    /// Distinct album names among the loaded items, in first-seen order.
    pub fn group_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for name in self.loader.items().iter().filter_map(|a| a.group_name.as_deref()) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

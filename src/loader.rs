//! Cursor-based incremental loader.
//!
//! The loader never talks to the source itself. Starting a fetch hands out a
//! [`FetchTicket`] describing the request; whoever runs the request feeds the
//! ticket and the outcome back through [`PageLoader::complete`]. Tickets carry
//! the scope generation they were issued under, so a page that arrives after
//! a `reload` is recognised as stale and dropped instead of being appended to
//! the new list.
//!
//! A ticket that is dropped without being completed (its future cancelled,
//! its task aborted or panicked) releases the in-flight flag, so the next
//! `begin_next` issues the request again.

use std::ops::Range;
use std::sync::{Arc, Weak};

use tracing::{debug, warn};

use crate::error::PickerError;
use crate::source::{Asset, Cursor, Page, PageRequest, Scope};

/// Default number of assets requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// An issued, not yet completed, page request.
#[derive(Debug)]
pub struct FetchTicket {
    generation: u64,
    replace: bool,
    offset: usize,
    request: PageRequest,
    /// Upgraded by nobody; the loader only watches whether it is dropped.
    _live: Arc<()>,
}

impl FetchTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn request(&self) -> &PageRequest {
        &self.request
    }

    /// Whether the result replaces the list instead of extending it.
    pub fn is_reload(&self) -> bool {
        self.replace
    }
}

/// What applying a finished fetch did to the loader.
#[derive(Debug)]
pub enum Completion {
    /// The page was applied; `appended` is the range of new indices.
    Applied {
        appended: Range<usize>,
        first_page: bool,
    },
    /// Issued under a scope that has since been reloaded; nothing changed.
    Stale,
    /// The source failed. Only the in-flight flag was cleared.
    Failed(PickerError),
}

#[derive(Debug)]
struct InFlight {
    generation: u64,
    offset: usize,
    ticket: Weak<()>,
}

impl InFlight {
    /// The ticket was dropped without reaching `complete`.
    fn is_lost(&self) -> bool {
        self.ticket.strong_count() == 0
    }
}

#[derive(Debug, Default)]
struct LoaderState {
    items: Vec<Asset>,
    cursor: Option<Cursor>,
    exhausted: bool,
    pending: Option<InFlight>,
    loaded: bool,
}

enum LoaderMsg {
    Next,
    Reload(Scope),
    Done(FetchTicket, anyhow::Result<Page>),
    Lost(anyhow::Error),
}

enum LoaderEffect {
    Issue(FetchTicket),
    Skipped,
    Completed(Completion),
}

#[derive(Debug)]
pub struct PageLoader {
    state: LoaderState,
    page_size: usize,
    scope: Scope,
    send_group_types: bool,
    generation: u64,
    first_page_fired: bool,
}

impl PageLoader {
    pub fn new(page_size: usize, scope: Scope, send_group_types: bool) -> Self {
        Self {
            state: LoaderState::default(),
            page_size,
            scope,
            send_group_types,
            generation: 0,
            first_page_fired: false,
        }
    }

    /// Start fetching the next page. Returns `None` while a fetch is in
    /// flight or once the source is exhausted.
    pub fn begin_next(&mut self) -> Option<FetchTicket> {
        match self.update(LoaderMsg::Next) {
            LoaderEffect::Issue(ticket) => Some(ticket),
            _ => None,
        }
    }

    /// Discard everything loaded so far and start fetching the first page of
    /// `scope`. Any fetch still in flight becomes stale.
    pub fn begin_reload(&mut self, scope: Scope) -> FetchTicket {
        match self.update(LoaderMsg::Reload(scope)) {
            LoaderEffect::Issue(ticket) => ticket,
            _ => unreachable!("reload always issues a fetch"),
        }
    }

    /// Apply the outcome of a fetch started by `begin_next` or `begin_reload`.
    pub fn complete(&mut self, ticket: FetchTicket, result: anyhow::Result<Page>) -> Completion {
        match self.update(LoaderMsg::Done(ticket, result)) {
            LoaderEffect::Completed(completion) => completion,
            _ => unreachable!("completion always yields a completion"),
        }
    }

    /// Settle a fetch whose ticket never came back, e.g. because the task
    /// running it was aborted. If the in-flight fetch of the current scope
    /// lost its ticket, it is reported as failed with `cause`; otherwise
    /// nothing changes and `Stale` is returned.
    pub fn abandon(&mut self, cause: anyhow::Error) -> Completion {
        match self.update(LoaderMsg::Lost(cause)) {
            LoaderEffect::Completed(completion) => completion,
            _ => unreachable!("abandon always yields a completion"),
        }
    }

    fn update(&mut self, msg: LoaderMsg) -> LoaderEffect {
        match msg {
            LoaderMsg::Next => {
                self.release_lost();
                if self.state.pending.is_some() || self.state.exhausted {
                    debug!(
                        pending = self.state.pending.is_some(),
                        exhausted = self.state.exhausted,
                        "Skipping load"
                    );
                    return LoaderEffect::Skipped;
                }
                LoaderEffect::Issue(self.issue(false))
            }
            LoaderMsg::Reload(scope) => {
                self.generation += 1;
                self.scope = scope;
                self.state = LoaderState::default();
                debug!(generation = self.generation, scope = ?self.scope, "Reloading");
                LoaderEffect::Issue(self.issue(true))
            }
            LoaderMsg::Done(ticket, result) => LoaderEffect::Completed(self.apply(ticket, result)),
            LoaderMsg::Lost(cause) => {
                let Some(lost) = self.release_lost() else {
                    debug!("No lost fetch to settle: {}", cause);
                    return LoaderEffect::Completed(Completion::Stale);
                };
                LoaderEffect::Completed(Completion::Failed(PickerError::FetchFailed {
                    generation: lost.generation,
                    offset: lost.offset,
                    source: cause,
                }))
            }
        }
    }

    /// Clear the in-flight flag if its ticket is gone.
    fn release_lost(&mut self) -> Option<InFlight> {
        if !self.state.pending.as_ref().is_some_and(InFlight::is_lost) {
            return None;
        }
        let lost = self.state.pending.take()?;
        warn!(
            generation = lost.generation,
            offset = lost.offset,
            "Fetch dropped before completing, releasing it"
        );
        Some(lost)
    }

    fn issue(&mut self, replace: bool) -> FetchTicket {
        let live = Arc::new(());
        let offset = self.state.items.len();
        self.state.pending = Some(InFlight {
            generation: self.generation,
            offset,
            ticket: Arc::downgrade(&live),
        });
        let mut request = PageRequest::new(self.page_size, self.state.cursor.clone(), &self.scope);
        if !self.send_group_types {
            request.group_types = None;
        }
        FetchTicket {
            generation: self.generation,
            replace,
            offset,
            request,
            _live: live,
        }
    }

    fn apply(&mut self, ticket: FetchTicket, result: anyhow::Result<Page>) -> Completion {
        if ticket.generation != self.generation {
            warn!(
                ticket = ticket.generation,
                current = self.generation,
                "Discarding page from a superseded scope"
            );
            return Completion::Stale;
        }
        self.state.pending = None;

        let page = match result {
            Ok(page) => page,
            Err(source) => {
                warn!(generation = ticket.generation, offset = ticket.offset, "Page fetch failed: {}", source);
                return Completion::Failed(PickerError::FetchFailed {
                    generation: ticket.generation,
                    offset: ticket.offset,
                    source,
                });
            }
        };

        // An empty page without a cursor can never lead anywhere, whatever
        // `has_next_page` claims.
        let exhausted =
            !page.has_next_page || (page.assets.is_empty() && page.end_cursor.is_none());
        let first_page =
            !ticket.replace && !self.first_page_fired && self.state.items.is_empty();

        let start = if ticket.replace {
            self.state.items = page.assets;
            0
        } else {
            let start = self.state.items.len();
            self.state.items.extend(page.assets);
            start
        };

        if exhausted {
            self.state.cursor = None;
        } else if let Some(cursor) = page.end_cursor {
            self.state.cursor = Some(cursor);
        }
        self.state.exhausted = exhausted;
        self.state.loaded = true;
        if first_page {
            self.first_page_fired = true;
        }

        debug!(
            generation = ticket.generation,
            added = self.state.items.len() - start,
            total = self.state.items.len(),
            exhausted,
            "Applied page"
        );
        Completion::Applied {
            appended: start..self.state.items.len(),
            first_page,
        }
    }

    pub fn items(&self) -> &[Asset] {
        &self.state.items
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.state.cursor.as_ref()
    }

    pub fn is_exhausted(&self) -> bool {
        self.state.exhausted
    }

    /// A fetch is in flight and its ticket is still held somewhere.
    pub fn is_pending(&self) -> bool {
        self.state.pending.as_ref().is_some_and(|p| !p.is_lost())
    }

    /// No fetch has succeeded since construction or the last reload.
    pub fn initial_loading(&self) -> bool {
        !self.state.loaded
    }

    /// A follow-up page is in flight behind an already rendered list.
    pub fn loading_more(&self) -> bool {
        self.state.loaded && self.is_pending()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::testing::page;
    use crate::types::GroupType;

    fn uris(loader: &PageLoader) -> Vec<&str> {
        loader.items().iter().map(|a| a.uri.as_str()).collect()
    }

    fn loader(page_size: usize) -> PageLoader {
        PageLoader::new(page_size, Scope::default(), true)
    }

    #[test]
    fn test_two_pages_then_noop() {
        let mut l = loader(2);
        assert!(l.initial_loading());

        let t = l.begin_next().unwrap();
        assert_eq!(t.request().first, 2);
        assert_eq!(t.request().after, None);
        l.complete(t, Ok(page(&["A", "B"], Some("c1"), true)));
        assert_eq!(uris(&l), ["A", "B"]);
        assert!(!l.initial_loading());

        let t = l.begin_next().unwrap();
        assert_eq!(t.request().after, Some(Cursor("c1".into())));
        l.complete(t, Ok(page(&["C"], None, false)));
        assert_eq!(uris(&l), ["A", "B", "C"]);
        assert!(l.is_exhausted());
        assert!(l.cursor().is_none());

        assert!(l.begin_next().is_none());
        assert_eq!(uris(&l), ["A", "B", "C"]);
    }

    #[test]
    fn test_no_second_fetch_while_pending() {
        let mut l = loader(10);
        let t = l.begin_next().unwrap();
        assert!(l.is_pending());
        assert!(!l.loading_more());
        assert!(l.begin_next().is_none());
        assert!(l.begin_next().is_none());
        l.complete(t, Ok(page(&["A"], Some("c1"), true)));
        assert!(!l.is_pending());

        let t = l.begin_next().unwrap();
        assert!(l.loading_more());
        l.complete(t, Ok(page(&["B"], Some("c2"), true)));
    }

    #[test]
    fn test_failure_clears_pending_only() {
        let mut l = loader(10);
        let t = l.begin_next().unwrap();
        l.complete(t, Ok(page(&["A"], Some("c1"), true)));

        let t = l.begin_next().unwrap();
        let completion = l.complete(t, Err(anyhow::anyhow!("network down")));
        match completion {
            Completion::Failed(e) => {
                assert!(e.is_retryable());
                assert!(matches!(e, PickerError::FetchFailed { offset: 1, .. }));
            }
            other => panic!("unexpected completion: {other:?}"),
        }
        assert!(!l.is_pending());
        assert!(!l.is_exhausted());
        assert_eq!(uris(&l), ["A"]);
        assert_eq!(l.cursor(), Some(&Cursor("c1".into())));

        // A manual retry resumes from the same cursor.
        let t = l.begin_next().unwrap();
        assert_eq!(t.request().after, Some(Cursor("c1".into())));
    }

    #[test]
    fn test_empty_page_with_cursor_is_not_exhaustion() {
        let mut l = loader(10);
        let t = l.begin_next().unwrap();
        l.complete(t, Ok(page(&[], Some("c1"), true)));
        assert!(!l.is_exhausted());
        assert!(!l.is_pending());
        assert!(l.items().is_empty());
        let t = l.begin_next().unwrap();
        assert_eq!(t.request().after, Some(Cursor("c1".into())));
    }

    #[test]
    fn test_empty_page_without_cursor_is_exhaustion() {
        let mut l = loader(10);
        let t = l.begin_next().unwrap();
        l.complete(t, Ok(page(&[], None, true)));
        assert!(l.is_exhausted());
        assert!(l.begin_next().is_none());
    }

    #[test]
    fn test_items_grow_by_each_page() {
        let mut l = loader(3);
        let pages = [
            page(&["a", "b", "c"], Some("1"), true),
            page(&[], Some("2"), true),
            page(&["d"], Some("3"), true),
            page(&["e", "f"], None, false),
        ];
        let mut expected = 0;
        for p in pages {
            let before = l.items().len();
            expected += p.assets.len();
            let t = l.begin_next().unwrap();
            l.complete(t, Ok(p));
            assert!(l.items().len() >= before);
            assert_eq!(l.items().len(), expected);
        }
        assert!(l.is_exhausted());
    }

    #[test]
    fn test_items_after_reload_count_only_new_pages() {
        let mut l = loader(2);
        for p in [
            page(&["a", "b"], Some("1"), true),
            page(&["c", "d"], Some("2"), true),
        ] {
            let t = l.begin_next().unwrap();
            l.complete(t, Ok(p));
        }
        assert_eq!(l.items().len(), 4);

        let t = l.begin_reload(Scope::default());
        assert!(l.items().is_empty());
        l.complete(t, Ok(page(&["x", "y"], Some("x1"), true)));
        assert_eq!(l.items().len(), 2);

        let mut expected = 2;
        for p in [
            page(&["z"], Some("x2"), true),
            page(&["w", "v"], None, false),
        ] {
            expected += p.assets.len();
            let t = l.begin_next().unwrap();
            l.complete(t, Ok(p));
            assert_eq!(l.items().len(), expected);
        }
        assert_eq!(uris(&l), ["x", "y", "z", "w", "v"]);
        assert!(l.is_exhausted());
    }

    #[test]
    fn test_reload_replaces_items() {
        let mut l = loader(2);
        let t = l.begin_next().unwrap();
        l.complete(t, Ok(page(&["A", "B"], Some("c1"), true)));

        let scope = Scope {
            group_name: Some("Trips".into()),
            ..Scope::default()
        };
        let t = l.begin_reload(scope.clone());
        assert!(t.is_reload());
        assert_eq!(t.request().after, None);
        assert_eq!(t.request().group_name.as_deref(), Some("Trips"));
        assert!(l.items().is_empty());
        assert!(l.initial_loading());

        match l.complete(t, Ok(page(&["X"], Some("x1"), true))) {
            Completion::Applied { appended, first_page } => {
                assert_eq!(appended, 0..1);
                assert!(!first_page);
            }
            other => panic!("unexpected completion: {other:?}"),
        }
        assert_eq!(uris(&l), ["X"]);
        assert_eq!(l.scope(), &scope);
    }

    #[test]
    fn test_reload_after_exhaustion_fetches_again() {
        let mut l = loader(2);
        let t = l.begin_next().unwrap();
        l.complete(t, Ok(page(&["A"], None, false)));
        assert!(l.is_exhausted());

        let t = l.begin_reload(Scope::default());
        assert!(!l.is_exhausted());
        l.complete(t, Ok(page(&["A"], None, false)));
        assert_eq!(uris(&l), ["A"]);
    }

    #[test]
    fn test_stale_page_after_reload_is_discarded() {
        let mut l = loader(2);
        let t = l.begin_next().unwrap();
        l.complete(t, Ok(page(&["A", "B"], Some("c1"), true)));

        let old = l.begin_next().unwrap();
        let new = l.begin_reload(Scope {
            group_name: Some("Trips".into()),
            ..Scope::default()
        });

        assert!(matches!(
            l.complete(old, Ok(page(&["C"], Some("c2"), true))),
            Completion::Stale
        ));
        assert!(l.items().is_empty());
        assert!(l.is_pending());

        l.complete(new, Ok(page(&["X", "Y"], Some("x1"), true)));
        assert_eq!(uris(&l), ["X", "Y"]);
        assert!(!l.is_pending());
    }

    #[test]
    fn test_stale_page_after_new_scope_resolved() {
        let mut l = loader(2);
        let old = l.begin_next().unwrap();
        let new = l.begin_reload(Scope::default());
        l.complete(new, Ok(page(&["X"], Some("x1"), true)));
        assert!(matches!(
            l.complete(old, Err(anyhow::anyhow!("late failure"))),
            Completion::Stale
        ));
        assert_eq!(uris(&l), ["X"]);
        assert!(!l.is_pending());
    }

    #[test]
    fn test_first_page_fires_once() {
        let mut l = loader(1);
        let t = l.begin_next().unwrap();
        assert!(matches!(
            l.complete(t, Ok(page(&["A"], Some("c1"), true))),
            Completion::Applied { first_page: true, .. }
        ));
        let t = l.begin_next().unwrap();
        assert!(matches!(
            l.complete(t, Ok(page(&["B"], Some("c2"), true))),
            Completion::Applied { first_page: false, .. }
        ));

        let t = l.begin_reload(Scope::default());
        l.complete(t, Ok(page(&[], Some("c1"), true)));
        let t = l.begin_next().unwrap();
        assert!(matches!(
            l.complete(t, Ok(page(&["A"], Some("c2"), true))),
            Completion::Applied { first_page: false, .. }
        ));
    }

    #[test]
    fn test_first_page_not_fired_by_reload() {
        let mut l = loader(1);
        let t = l.begin_reload(Scope::default());
        assert!(matches!(
            l.complete(t, Ok(page(&["A"], Some("c1"), true))),
            Completion::Applied { first_page: false, .. }
        ));
    }

    #[test]
    fn test_group_types_stripped_when_unsupported() {
        let scope = Scope {
            group_types: GroupType::Album,
            ..Scope::default()
        };
        let mut l = PageLoader::new(5, scope.clone(), false);
        let t = l.begin_next().unwrap();
        assert_eq!(t.request().group_types, None);

        let mut l = PageLoader::new(5, scope, true);
        let t = l.begin_next().unwrap();
        assert_eq!(t.request().group_types, Some(GroupType::Album));
    }

    #[test]
    fn test_dropped_ticket_releases_pending() {
        let mut l = loader(2);
        let t = l.begin_next().unwrap();
        l.complete(t, Ok(page(&["A", "B"], Some("c1"), true)));

        let t = l.begin_next().unwrap();
        assert!(l.loading_more());
        drop(t);
        assert!(!l.is_pending());
        assert!(!l.loading_more());

        let t = l.begin_next().unwrap();
        assert_eq!(t.request().after, Some(Cursor("c1".into())));
        l.complete(t, Ok(page(&["C"], None, false)));
        assert_eq!(uris(&l), ["A", "B", "C"]);
    }

    #[test]
    fn test_dropped_stale_ticket_keeps_new_fetch_pending() {
        let mut l = loader(2);
        let old = l.begin_next().unwrap();
        let new = l.begin_reload(Scope::default());
        drop(old);
        assert!(l.is_pending());
        assert!(l.begin_next().is_none());
        assert!(matches!(
            l.abandon(anyhow::anyhow!("task aborted")),
            Completion::Stale
        ));
        assert!(l.is_pending());

        l.complete(new, Ok(page(&["X"], None, false)));
        assert_eq!(uris(&l), ["X"]);
    }

    #[test]
    fn test_abandon_reports_lost_fetch_once() {
        let mut l = loader(2);
        let t = l.begin_next().unwrap();
        l.complete(t, Ok(page(&["A"], Some("c1"), true)));

        let t = l.begin_next().unwrap();
        // Still held: nothing to settle.
        assert!(matches!(l.abandon(anyhow::anyhow!("early")), Completion::Stale));
        drop(t);
        match l.abandon(anyhow::anyhow!("task panicked")) {
            Completion::Failed(PickerError::FetchFailed { offset, source, .. }) => {
                assert_eq!(offset, 1);
                assert!(source.to_string().contains("task panicked"));
            }
            other => panic!("unexpected completion: {other:?}"),
        }
        assert!(matches!(l.abandon(anyhow::anyhow!("again")), Completion::Stale));
        assert!(l.begin_next().is_some());
    }
}

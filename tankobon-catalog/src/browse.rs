//! Browse session state: filter mutations, fetch generations and
//! per-cycle outcomes.
//!
//! Every fetch cycle runs idle, fetching, then loaded or failed. Each
//! cycle carries a generation ticket issued when it starts; a cycle
//! whose generation has been superseded by a filter or page change is
//! dropped on arrival, so a slow response can never overwrite the state
//! of a newer one.

use tracing::debug;

use crate::client::{BrowsePage, ClientTrait};
use crate::error::CatalogClientError;
use crate::filter::{FilterState, PageSize, StatusFilter};
use crate::types::{CatalogEntry, TagId};
use crate::urlstate::BrowseLocation;

/// Ticket tying a fetch to the session generation it was started under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

/// Resolved result of one fetch cycle.
///
/// A failed fetch and an empty page are distinct outcomes, even for a
/// renderer that chooses to draw them alike.
#[derive(Debug)]
pub enum BrowseOutcome {
    Loaded(BrowsePage),
    Failed(CatalogClientError),
}

impl BrowseOutcome {
    pub fn entries(&self) -> &[CatalogEntry] {
        match self {
            BrowseOutcome::Loaded(page) => &page.entries,
            BrowseOutcome::Failed(_) => &[],
        }
    }

    pub fn error(&self) -> Option<&CatalogClientError> {
        match self {
            BrowseOutcome::Loaded(_) => None,
            BrowseOutcome::Failed(error) => Some(error),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error().is_some()
    }
}

/// The single owner of browse state: filters, page, and the outcome of
/// the latest fetch cycle.
#[derive(Debug)]
pub struct BrowseSession {
    filter: FilterState,
    page: u32,
    generation: u64,
    fetching: bool,
    outcome: Option<BrowseOutcome>,
}

impl BrowseSession {
    pub fn new() -> Self {
        Self::at(BrowseLocation::default())
    }

    /// Start a session at a restored location, e.g. one parsed from a
    /// shared link.
    pub fn at(location: BrowseLocation) -> Self {
        BrowseSession {
            filter: location.filter,
            page: location.page.max(1),
            generation: 0,
            fetching: false,
            outcome: None,
        }
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    /// The current position in shareable form.
    pub fn location(&self) -> BrowseLocation {
        BrowseLocation {
            filter: self.filter.clone(),
            page: self.page,
        }
    }

    pub fn outcome(&self) -> Option<&BrowseOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_fetching(&self) -> bool {
        self.fetching
    }

    // A filter change redefines the result set, so any page number held
    // against the old set is meaningless; everything except explicit
    // navigation snaps back to page 1.
    fn invalidate(&mut self, reset_page: bool) {
        if reset_page {
            self.page = 1;
        }
        self.generation += 1;
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.filter.search_text = text.into();
        self.invalidate(true);
    }

    pub fn set_status(&mut self, status: StatusFilter) {
        self.filter.status = status;
        self.invalidate(true);
    }

    /// Select the tag if absent, deselect it if present.
    pub fn toggle_tag(&mut self, tag: impl Into<TagId>) {
        let tag = tag.into();
        if !self.filter.tags.remove(&tag) {
            self.filter.tags.insert(tag);
        }
        self.invalidate(true);
    }

    /// Select the tag, leaving it selected if it already was. Only a
    /// new selection invalidates the current results.
    pub fn select_tag(&mut self, tag: impl Into<TagId>) {
        if self.filter.tags.insert(tag.into()) {
            self.invalidate(true);
        }
    }

    pub fn clear_tags(&mut self) {
        self.filter.tags.clear();
        self.invalidate(true);
    }

    /// Returns false, changing nothing, for sizes off the allowed list.
    pub fn set_items_per_page(&mut self, value: u32) -> bool {
        match PageSize::new(value) {
            Some(size) => {
                self.filter.items_per_page = size;
                self.invalidate(true);
                true
            },
            None => false,
        }
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
        self.invalidate(false);
    }

    /// Mark a fetch cycle as started and issue its ticket.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.fetching = true;
        FetchTicket(self.generation)
    }

    /// Apply the outcome of a fetch cycle. Returns false, dropping the
    /// outcome, if the session has moved to a newer generation since the
    /// ticket was issued.
    pub fn apply(&mut self, ticket: FetchTicket, outcome: BrowseOutcome) -> bool {
        if ticket.0 != self.generation {
            debug!(
                ticket = ticket.0,
                generation = self.generation,
                "dropping superseded fetch outcome"
            );
            return false;
        }
        self.fetching = false;
        self.outcome = Some(outcome);
        true
    }

    /// Run one full fetch cycle against `client` and return the outcome.
    pub async fn refresh(&mut self, client: &impl ClientTrait) -> &BrowseOutcome {
        let ticket = self.begin_fetch();
        let outcome = match client.browse(&self.filter, self.page).await {
            Ok(page) => BrowseOutcome::Loaded(page),
            Err(error) => BrowseOutcome::Failed(error),
        };
        // No mutation can interleave while we hold &mut self, so the
        // ticket is always current here.
        self.apply(ticket, outcome);
        match &self.outcome {
            Some(outcome) => outcome,
            None => unreachable!("refresh always applies an outcome"),
        }
    }
}

impl Default for BrowseSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use pretty_assertions::assert_eq;
    use reqwest::StatusCode;

    use super::*;
    use crate::client::BrowsePage;
    use crate::envelope::PageMetadata;
    use crate::error::CatalogClientError;
    use crate::types::{ChapterDetail, ChapterSummary, MangaDetail, Tag};

    fn page_of(n_entries: usize, current_page: u32) -> BrowsePage {
        let entries = (0..n_entries)
            .map(|i| CatalogEntry {
                id: format!("m{i}"),
                title: [("en", format!("Title {i}"))].into_iter().collect(),
                status: None,
                content_rating: None,
                cover: None,
                tag_ids: vec![],
                year: None,
                last_chapter: None,
                updated_at: None,
            })
            .collect();
        BrowsePage {
            entries,
            page: PageMetadata {
                current_page,
                total_pages: 10,
                total_items: 240,
                items_per_page: 24,
            },
        }
    }

    /// Client returning canned browse results in order.
    struct StubClient {
        results: RefCell<VecDeque<Result<BrowsePage, CatalogClientError>>>,
    }

    impl StubClient {
        fn with(results: Vec<Result<BrowsePage, CatalogClientError>>) -> Self {
            StubClient {
                results: RefCell::new(results.into()),
            }
        }
    }

    impl ClientTrait for StubClient {
        async fn browse(
            &self,
            _filter: &FilterState,
            _page: u32,
        ) -> Result<BrowsePage, CatalogClientError> {
            self.results
                .borrow_mut()
                .pop_front()
                .expect("stub ran out of canned results")
        }

        async fn manga(&self, _id: &str) -> Result<MangaDetail, CatalogClientError> {
            unimplemented!()
        }

        async fn chapters(
            &self,
            _manga_id: &str,
            _language: Option<&str>,
        ) -> Result<Vec<ChapterSummary>, CatalogClientError> {
            unimplemented!()
        }

        async fn chapter(&self, _id: &str) -> Result<ChapterDetail, CatalogClientError> {
            unimplemented!()
        }

        async fn all_tags(&self) -> Result<Vec<Tag>, CatalogClientError> {
            unimplemented!()
        }
    }

    #[test]
    fn filter_mutations_reset_the_page() {
        let mut session = BrowseSession::new();
        session.set_page(5);
        assert_eq!(session.page(), 5);
        session.set_search_text("dragon");
        assert_eq!(session.page(), 1);

        session.set_page(3);
        session.toggle_tag("t1");
        assert_eq!(session.page(), 1);

        session.set_page(3);
        session.set_status(StatusFilter::Completed);
        assert_eq!(session.page(), 1);

        session.set_page(3);
        assert!(session.set_items_per_page(48));
        assert_eq!(session.page(), 1);
    }

    #[test]
    fn toggle_tag_flips_membership() {
        let mut session = BrowseSession::new();
        session.toggle_tag("t1");
        assert!(session.filter().tags.contains("t1"));
        session.toggle_tag("t1");
        assert!(session.filter().tags.is_empty());
    }

    #[test]
    fn repeated_tag_selection_stays_selected() {
        let mut session = BrowseSession::new();
        session.select_tag("t1");
        session.select_tag("t1");
        assert!(session.filter().tags.contains("t1"));

        // reselecting is a no-op, so explicit navigation survives it
        session.set_page(4);
        session.select_tag("t1");
        assert_eq!(session.page(), 4);

        session.select_tag("t2");
        assert_eq!(session.page(), 1);
        assert!(session.filter().tags.contains("t2"));
    }

    #[test]
    fn invalid_page_size_changes_nothing() {
        let mut session = BrowseSession::new();
        session.set_page(4);
        assert!(!session.set_items_per_page(50));
        assert_eq!(session.filter().items_per_page, PageSize::default());
        // a rejected mutation doesn't reset the page either
        assert_eq!(session.page(), 4);
    }

    #[test]
    fn superseded_outcome_is_dropped() {
        let mut session = BrowseSession::new();
        let stale = session.begin_fetch();

        // mutation before the response lands
        session.set_page(2);
        let current = session.begin_fetch();

        assert!(session.apply(current, BrowseOutcome::Loaded(page_of(3, 2))));
        assert!(!session.apply(stale, BrowseOutcome::Loaded(page_of(24, 1))));

        let outcome = session.outcome().unwrap();
        assert_eq!(outcome.entries().len(), 3);
    }

    #[test]
    fn stale_failure_cannot_clobber_a_newer_success() {
        let mut session = BrowseSession::new();
        let stale = session.begin_fetch();
        session.set_search_text("dragon");
        let current = session.begin_fetch();

        assert!(session.apply(current, BrowseOutcome::Loaded(page_of(1, 1))));
        let error = CatalogClientError::UnexpectedResponse(StatusCode::BAD_GATEWAY);
        assert!(!session.apply(stale, BrowseOutcome::Failed(error)));
        assert!(!session.outcome().unwrap().is_failure());
    }

    #[tokio::test]
    async fn refresh_runs_a_full_cycle() {
        let client = StubClient::with(vec![Ok(page_of(2, 1))]);
        let mut session = BrowseSession::new();
        assert!(session.outcome().is_none());

        let outcome = session.refresh(&client).await;
        assert_eq!(outcome.entries().len(), 2);
        assert!(!session.is_fetching());
    }

    #[tokio::test]
    async fn failed_fetch_is_distinct_from_an_empty_page() {
        let error = CatalogClientError::UnexpectedResponse(StatusCode::INTERNAL_SERVER_ERROR);
        let client = StubClient::with(vec![Err(error), Ok(page_of(0, 1))]);
        let mut session = BrowseSession::new();

        session.refresh(&client).await;
        let failed = session.outcome().unwrap();
        assert!(failed.is_failure());
        assert_eq!(failed.entries().len(), 0);

        session.refresh(&client).await;
        let empty = session.outcome().unwrap();
        assert!(!empty.is_failure());
        assert_eq!(empty.entries().len(), 0);
    }

    #[test]
    fn session_restores_from_a_location() {
        let location = BrowseLocation::parse("page=3&search=dragon&itemsPerPage=96");
        let session = BrowseSession::at(location);
        assert_eq!(session.page(), 3);
        assert_eq!(session.filter().search_text, "dragon");
        assert_eq!(session.filter().items_per_page, PageSize::new(96).unwrap());
        assert_eq!(session.location().encode(), "page=3&search=dragon&itemsPerPage=96");
    }
}

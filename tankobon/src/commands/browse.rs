use std::fmt::Display;

use anyhow::Result;
use bpaf::Bpaf;
use indoc::indoc;
use tankobon_catalog::{
    BrowseLocation,
    BrowseOutcome,
    BrowseSession,
    PageSize,
    StatusFilter,
    ALLOWED_PAGE_SIZES,
};
use tracing::{debug, instrument};

use crate::commands::catalog_client;
use crate::config::Config;
use crate::utils::message;

/// Browse the published catalog
#[derive(Debug, Bpaf, Clone)]
pub struct Browse {
    /// Restore a view from a previously printed query string
    #[bpaf(long("from-query"), argument("QUERY"))]
    from_query: Option<String>,

    /// Full text search over titles
    #[bpaf(short, long, argument("TEXT"))]
    search: Option<String>,

    /// Constrain the view: all, ongoing, completed or safe
    #[bpaf(short, long, argument("FILTER"))]
    filter: Option<StatusFilter>,

    /// Select a tag; may be given multiple times, duplicates are ignored
    #[bpaf(short, long("tag"), argument("TAG-ID"), many)]
    tags: Vec<String>,

    /// Page to show
    #[bpaf(short, long, argument("N"))]
    page: Option<u32>,

    /// Results per page (12, 24, 48 or 96)
    #[bpaf(long("items-per-page"), argument("N"))]
    items_per_page: Option<u32>,

    /// Display results as JSON
    #[bpaf(long)]
    json: bool,
}

impl Browse {
    #[instrument(name = "browse", skip_all)]
    pub async fn handle(self, config: Config) -> Result<()> {
        let (client, _session) = catalog_client(&config)?;

        let mut location = match &self.from_query {
            Some(query) => BrowseLocation::parse(query),
            None => BrowseLocation::default(),
        };

        // Configured default page size applies beneath explicit flags
        // and restored query strings.
        if self.from_query.is_none() {
            if let Some(size) = config.tankobon.items_per_page {
                match PageSize::new(size) {
                    Some(size) => location.filter.items_per_page = size,
                    None => message::warning(format!(
                        "Ignoring configured items_per_page {size}; allowed values are {ALLOWED_PAGE_SIZES:?}"
                    )),
                }
            }
        }

        let mut session = BrowseSession::at(location);
        if let Some(search) = self.search {
            session.set_search_text(search);
        }
        if let Some(filter) = self.filter {
            session.set_status(filter);
        }
        for tag in self.tags {
            session.select_tag(tag);
        }
        if let Some(size) = self.items_per_page {
            if !session.set_items_per_page(size) {
                message::warning(format!(
                    "Ignoring --items-per-page {size}; allowed values are {ALLOWED_PAGE_SIZES:?}"
                ));
            }
        }
        if let Some(page) = self.page {
            session.set_page(page);
        }

        // The canonical, shareable form of this view.
        let query = session.location().encode();

        let outcome = session.refresh(&client).await;
        if let Some(error) = outcome.error() {
            // A failed fetch renders like an empty result; the cause
            // only goes to the log.
            debug!(%error, "browse fetch failed");
        }

        if self.json {
            let payload = match outcome {
                BrowseOutcome::Loaded(page) if !page.entries.is_empty() => serde_json::json!({
                    "entries": page.entries,
                    "page": page.page,
                    "query": query,
                }),
                _ => serde_json::json!({ "entries": [], "query": query }),
            };
            println!("{}", serde_json::to_string_pretty(&payload)?);
            return Ok(());
        }

        println!("{}", DisplayBrowseResults::new(outcome, &query));
        Ok(())
    }
}

const NO_RESULTS: &str = indoc! {"
    No titles found.

    Try a different search, or drop some filters.
"};

/// User facing rendering of one fetch outcome.
///
/// A failed fetch and an empty page draw the same panel; the
/// distinction only matters to the log.
pub(crate) struct DisplayBrowseResults<'a> {
    outcome: &'a BrowseOutcome,
    query: &'a str,
}

impl<'a> DisplayBrowseResults<'a> {
    pub(crate) fn new(outcome: &'a BrowseOutcome, query: &'a str) -> Self {
        DisplayBrowseResults { outcome, query }
    }
}

impl Display for DisplayBrowseResults<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let page = match self.outcome {
            BrowseOutcome::Loaded(page) if !page.entries.is_empty() => page,
            _ => return f.write_str(NO_RESULTS),
        };

        for entry in &page.entries {
            let status = entry
                .status
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| "-".to_string());
            writeln!(f, "{:<40}  {:<12}  {}", entry.id, status, entry.display_title())?;
        }
        writeln!(f)?;
        write!(
            f,
            "Page {current}/{total} · {items} titles",
            current = page.page.current_page,
            total = page.page.total_pages,
            items = page.page.total_items,
        )?;
        if !self.query.is_empty() {
            write!(f, "\nView query: {}", self.query)?;
        }
        Ok(())
    }
}
